use std::collections::{BTreeMap, HashMap};

pub type Millis = u64;

pub const SECOND_MS: Millis = 1_000;
pub const INSTRUMENTS_PERIOD_MS: Millis = 2_000;
pub const ALARM_POLL_PERIOD_MS: Millis = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueTask<E> {
    pub id: TaskId,
    pub due: Millis,
    pub event: E,
}

#[derive(Debug)]
struct TaskEntry<E> {
    key: (Millis, u64),
    period: Option<Millis>,
    event: E,
}

/// Cancellable one-shot and periodic tasks ordered by due time, ties broken by
/// scheduling order.
#[derive(Debug)]
pub struct Timeline<E> {
    order: BTreeMap<(Millis, u64), TaskId>,
    tasks: HashMap<TaskId, TaskEntry<E>>,
    next_seq: u64,
    next_id: u64,
}

impl<E> Default for Timeline<E> {
    fn default() -> Self {
        Self {
            order: BTreeMap::new(),
            tasks: HashMap::new(),
            next_seq: 0,
            next_id: 1,
        }
    }
}

impl<E: Clone> Timeline<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule_once(&mut self, due: Millis, event: E) -> TaskId {
        self.insert(due, None, event)
    }

    /// First run lands one full period after `now`.
    pub fn schedule_every(&mut self, now: Millis, period: Millis, event: E) -> TaskId {
        let period = period.max(1);
        self.insert(now.saturating_add(period), Some(period), event)
    }

    pub fn cancel(&mut self, id: TaskId) -> bool {
        match self.tasks.remove(&id) {
            Some(entry) => {
                self.order.remove(&entry.key);
                true
            }
            None => false,
        }
    }

    pub fn cancel_all<I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = TaskId>,
    {
        ids.into_iter().filter(|id| self.cancel(*id)).count()
    }

    pub fn is_pending(&self, id: TaskId) -> bool {
        self.tasks.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn next_due(&self) -> Option<Millis> {
        self.order.keys().next().map(|(due, _)| *due)
    }

    /// Pops the earliest task due at or before `now`. Periodic tasks are
    /// re-queued one period after their previous due time and keep their id.
    pub fn pop_due(&mut self, now: Millis) -> Option<DueTask<E>> {
        let (&key, &id) = self.order.iter().next()?;
        if key.0 > now {
            return None;
        }
        self.order.remove(&key);
        let entry = self.tasks.remove(&id)?;
        let due = key.0;
        if let Some(period) = entry.period {
            let next_key = (due.saturating_add(period), self.bump_seq());
            self.order.insert(next_key, id);
            self.tasks.insert(
                id,
                TaskEntry {
                    key: next_key,
                    period: Some(period),
                    event: entry.event.clone(),
                },
            );
        }
        Some(DueTask {
            id,
            due,
            event: entry.event,
        })
    }

    fn insert(&mut self, due: Millis, period: Option<Millis>, event: E) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        let key = (due, self.bump_seq());
        self.order.insert(key, id);
        self.tasks.insert(id, TaskEntry { key, period, event });
        id
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TickKind {
    Clock,
    Stopwatch,
    Timer,
    Instruments,
    AlarmPoll,
}

/// Periodic drivers of the watch. Stopwatch and timer intervals only exist
/// while their counter runs.
#[derive(Debug, Default)]
pub struct TickScheduler {
    timeline: Timeline<TickKind>,
    handles: HashMap<TickKind, TaskId>,
}

impl TickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn period_of(kind: TickKind) -> Millis {
        match kind {
            TickKind::Clock | TickKind::Stopwatch | TickKind::Timer => SECOND_MS,
            TickKind::Instruments => INSTRUMENTS_PERIOD_MS,
            TickKind::AlarmPoll => ALARM_POLL_PERIOD_MS,
        }
    }

    /// Restarting an already running interval re-anchors it at `now`.
    pub fn start(&mut self, kind: TickKind, now: Millis) {
        self.stop(kind);
        let id = self
            .timeline
            .schedule_every(now, Self::period_of(kind), kind);
        self.handles.insert(kind, id);
    }

    pub fn stop(&mut self, kind: TickKind) -> bool {
        match self.handles.remove(&kind) {
            Some(id) => self.timeline.cancel(id),
            None => false,
        }
    }

    pub fn is_running(&self, kind: TickKind) -> bool {
        self.handles.contains_key(&kind)
    }

    pub fn next_due(&self) -> Option<Millis> {
        self.timeline.next_due()
    }

    pub fn pop_due(&mut self, now: Millis) -> Option<DueTask<TickKind>> {
        self.timeline.pop_due(now)
    }
}
