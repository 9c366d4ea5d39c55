use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
#[cfg(test)]
use std::sync::Mutex;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use tracing::{debug, info, warn};

use crate::bridge::messages::{
    BridgeReply, BridgeRequest, NOTIFICATION_TAG, Notification, NotificationAction, WORKER_VERSION,
};
use crate::format::format_minutes_of_day;
use crate::time_provider::HostClock;

pub const SNOOZE_MINUTES: u16 = 5;
const MINUTES_PER_DAY: u16 = 24 * 60;

pub trait Notifier: Send {
    fn show(&mut self, notification: &Notification);
}

/// Writes notifications to the log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn show(&mut self, notification: &Notification) {
        warn!(
            title = %notification.title,
            body = %notification.body,
            alarm_id = %notification.alarm_id,
            "notification"
        );
    }
}

/// Keeps every notification it is handed; clones share the same list.
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct CollectingNotifier {
    shown: Arc<Mutex<Vec<Notification>>>,
}

#[cfg(test)]
impl CollectingNotifier {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn shown(&self) -> Vec<Notification> {
        self.shown
            .lock()
            .map(|shown| shown.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
impl Notifier for CollectingNotifier {
    fn show(&mut self, notification: &Notification) {
        if let Ok(mut shown) = self.shown.lock() {
            shown.push(notification.clone());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledAlarm {
    pub time: u16,
    pub sound: String,
    pub armed_on: NaiveDate,
    pub triggered: bool,
    pub one_shot: bool,
}

/// The worker's own view of the alarms. Nothing here is shared with the
/// watch; it only changes through requests.
#[derive(Debug, Default)]
pub struct AlarmBook {
    alarms: HashMap<String, ScheduledAlarm>,
}

impl AlarmBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, alarm_id: &str) -> Option<&ScheduledAlarm> {
        self.alarms.get(alarm_id)
    }

    pub fn len(&self) -> usize {
        self.alarms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alarms.is_empty()
    }

    pub fn handle(
        &mut self,
        request: &BridgeRequest,
        now: NaiveDateTime,
        notifier: &mut dyn Notifier,
    ) -> BridgeReply {
        match request {
            BridgeRequest::ScheduleAlarm {
                alarm_id,
                time,
                sound,
                enabled,
            } => {
                if *enabled {
                    self.alarms.insert(
                        alarm_id.clone(),
                        ScheduledAlarm {
                            time: *time % MINUTES_PER_DAY,
                            sound: sound.clone(),
                            armed_on: now.date(),
                            triggered: false,
                            one_shot: false,
                        },
                    );
                    info!(alarm_id = %alarm_id, at = %format_minutes_of_day(*time), "worker alarm scheduled");
                } else if self.alarms.remove(alarm_id).is_some() {
                    info!(alarm_id = %alarm_id, "worker alarm removed");
                }
                BridgeReply::Ack { success: true }
            }
            BridgeRequest::CancelAlarm { alarm_id } => {
                if self.alarms.remove(alarm_id).is_some() {
                    info!(alarm_id = %alarm_id, "worker alarm cancelled");
                }
                BridgeReply::Ack { success: true }
            }
            BridgeRequest::GetVersion => BridgeReply::Version {
                version: WORKER_VERSION.to_string(),
            },
            BridgeRequest::CheckAlarms => {
                let fired = self.check(now, notifier);
                debug!(fired, "alarm check requested");
                BridgeReply::Ack { success: true }
            }
            BridgeRequest::NotificationClick { alarm_id, action } => {
                self.click(alarm_id, *action, now);
                BridgeReply::Ack { success: true }
            }
        }
    }

    /// Fires every alarm whose minute is `now`, once per day each.
    pub fn check(&mut self, now: NaiveDateTime, notifier: &mut dyn Notifier) -> usize {
        let today = now.date();
        let minute = (now.hour() * 60 + now.minute()) as u16;
        let mut fired = Vec::new();
        for (alarm_id, alarm) in &mut self.alarms {
            if alarm.triggered && alarm.armed_on < today {
                alarm.triggered = false;
                alarm.armed_on = today;
            }
            if alarm.time == minute && !alarm.triggered {
                alarm.triggered = true;
                fired.push((alarm_id.clone(), alarm.time, alarm.sound.clone()));
            }
        }
        for (alarm_id, time, sound) in &fired {
            notifier.show(&alarm_notification(alarm_id, *time, sound));
        }
        self.alarms
            .retain(|_, alarm| !(alarm.one_shot && alarm.triggered));
        fired.len()
    }

    fn click(&mut self, alarm_id: &str, action: NotificationAction, now: NaiveDateTime) {
        match action {
            NotificationAction::Dismiss => debug!(alarm_id = %alarm_id, "notification dismissed"),
            NotificationAction::Snooze => {
                let minute = (now.hour() * 60 + now.minute()) as u16;
                let time = (minute + SNOOZE_MINUTES) % MINUTES_PER_DAY;
                let sound = self
                    .alarms
                    .get(alarm_id)
                    .map(|alarm| alarm.sound.clone())
                    .unwrap_or_else(|| "beep".to_string());
                let snooze_id = format!("{alarm_id}-snooze");
                info!(alarm_id = %alarm_id, until = %format_minutes_of_day(time), "alarm snoozed");
                self.alarms.insert(
                    snooze_id,
                    ScheduledAlarm {
                        time,
                        sound,
                        armed_on: now.date(),
                        triggered: false,
                        one_shot: true,
                    },
                );
            }
        }
    }
}

pub fn alarm_notification(alarm_id: &str, time: u16, sound: &str) -> Notification {
    Notification {
        title: "Cockpit Watch alarm".to_string(),
        body: format!("Alarm set for {}", format_minutes_of_day(time)),
        tag: NOTIFICATION_TAG.to_string(),
        require_interaction: true,
        actions: vec![NotificationAction::Dismiss, NotificationAction::Snooze],
        alarm_id: alarm_id.to_string(),
        sound: sound.to_string(),
    }
}

pub struct Envelope {
    pub request: BridgeRequest,
    pub reply: Sender<BridgeReply>,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub check_every: Duration,
    pub poll_slice: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            check_every: Duration::from_secs(60),
            poll_slice: Duration::from_millis(200),
        }
    }
}

pub struct BackgroundWorker {
    sender: Sender<Envelope>,
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl BackgroundWorker {
    pub fn start(
        config: WorkerConfig,
        clock: Arc<dyn HostClock>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        let (sender, receiver) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_for_thread = Arc::clone(&stop);
        let join = thread::spawn(move || {
            run_worker_loop(receiver, config, clock, notifier, stop_for_thread)
        });
        info!(version = WORKER_VERSION, "background worker started");
        Self {
            sender,
            stop,
            join: Some(join),
        }
    }

    pub fn sender(&self) -> Sender<Envelope> {
        self.sender.clone()
    }
}

impl Drop for BackgroundWorker {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

fn run_worker_loop(
    receiver: Receiver<Envelope>,
    config: WorkerConfig,
    clock: Arc<dyn HostClock>,
    mut notifier: Box<dyn Notifier>,
    stop: Arc<AtomicBool>,
) {
    let mut book = AlarmBook::new();
    let mut last_check = Instant::now();
    while !stop.load(Ordering::Relaxed) {
        match receiver.recv_timeout(config.poll_slice) {
            Ok(envelope) => {
                let now = clock.wall_now().naive_local();
                let reply = book.handle(&envelope.request, now, notifier.as_mut());
                if envelope.reply.send(reply).is_err() {
                    debug!(kind = envelope.request.kind(), "requester went away before reply");
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        if last_check.elapsed() >= config.check_every {
            last_check = Instant::now();
            book.check(clock.wall_now().naive_local(), notifier.as_mut());
        }
    }
    debug!("background worker stopped");
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, day)
            .expect("date")
            .and_hms_opt(hour, minute, 0)
            .expect("time")
    }

    fn schedule(time: u16, enabled: bool) -> BridgeRequest {
        BridgeRequest::ScheduleAlarm {
            alarm_id: "main-alarm".to_string(),
            time,
            sound: "terrain".to_string(),
            enabled,
        }
    }

    #[test]
    fn schedule_overwrites_and_disable_removes() {
        let mut book = AlarmBook::new();
        let mut notifier = CollectingNotifier::new();
        book.handle(&schedule(420, true), at(9, 6, 0), &mut notifier);
        book.handle(&schedule(430, true), at(9, 6, 1), &mut notifier);
        assert_eq!(book.len(), 1);
        assert_eq!(book.get("main-alarm").map(|alarm| alarm.time), Some(430));

        let reply = book.handle(&schedule(430, false), at(9, 6, 2), &mut notifier);
        assert_eq!(reply, BridgeReply::Ack { success: true });
        assert!(book.is_empty());
    }

    #[test]
    fn alarm_notifies_once_per_minute_and_rearms_next_day() {
        let mut book = AlarmBook::new();
        let mut notifier = CollectingNotifier::new();
        book.handle(&schedule(420, true), at(9, 6, 0), &mut notifier);

        assert_eq!(book.check(at(9, 6, 59), &mut notifier), 0);
        assert_eq!(book.check(at(9, 7, 0), &mut notifier), 1);
        assert_eq!(book.check(at(9, 7, 0), &mut notifier), 0);
        assert_eq!(book.check(at(10, 7, 0), &mut notifier), 1);

        let shown = notifier.shown();
        assert_eq!(shown.len(), 2);
        assert_eq!(shown[0].body, "Alarm set for 07:00");
        assert_eq!(shown[0].sound, "terrain");
        assert_eq!(
            shown[0].actions,
            vec![NotificationAction::Dismiss, NotificationAction::Snooze]
        );
    }

    #[test]
    fn check_request_fires_through_handle() {
        let mut book = AlarmBook::new();
        let mut notifier = CollectingNotifier::new();
        book.handle(&schedule(420, true), at(9, 6, 0), &mut notifier);
        book.handle(&BridgeRequest::CheckAlarms, at(9, 7, 0), &mut notifier);
        assert_eq!(notifier.shown().len(), 1);
    }

    #[test]
    fn snooze_adds_one_shot_five_minutes_later() {
        let mut book = AlarmBook::new();
        let mut notifier = CollectingNotifier::new();
        book.handle(&schedule(420, true), at(9, 6, 0), &mut notifier);
        book.check(at(9, 7, 0), &mut notifier);
        book.handle(
            &BridgeRequest::NotificationClick {
                alarm_id: "main-alarm".to_string(),
                action: NotificationAction::Snooze,
            },
            at(9, 7, 1),
            &mut notifier,
        );
        let snoozed = book.get("main-alarm-snooze").expect("snooze entry");
        assert_eq!(snoozed.time, 426);
        assert!(snoozed.one_shot);

        assert_eq!(book.check(at(9, 7, 6), &mut notifier), 1);
        assert!(book.get("main-alarm-snooze").is_none());
        assert!(book.get("main-alarm").is_some());
    }

    #[test]
    fn snooze_wraps_past_midnight() {
        let mut book = AlarmBook::new();
        let mut notifier = CollectingNotifier::new();
        book.handle(
            &BridgeRequest::NotificationClick {
                alarm_id: "late".to_string(),
                action: NotificationAction::Snooze,
            },
            at(9, 23, 58),
            &mut notifier,
        );
        assert_eq!(book.get("late-snooze").map(|alarm| alarm.time), Some(3));
    }

    #[test]
    fn version_reply_names_the_worker() {
        let mut book = AlarmBook::new();
        let mut notifier = CollectingNotifier::new();
        assert_eq!(
            book.handle(&BridgeRequest::GetVersion, at(9, 0, 0), &mut notifier),
            BridgeReply::Version {
                version: WORKER_VERSION.to_string()
            }
        );
    }
}
