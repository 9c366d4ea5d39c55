use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

use tracing::{debug, warn};

use crate::bridge::messages::{BridgeReply, BridgeRequest};
use crate::bridge::worker::Envelope;
use crate::error::{WatchError, WatchResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyState {
    Waiting,
    Ready(BridgeReply),
    Lost,
}

/// One outstanding request; its reply arrives on a channel of its own.
pub struct PendingReply {
    kind: &'static str,
    receiver: Receiver<BridgeReply>,
}

impl PendingReply {
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn try_reply(&self) -> ReplyState {
        match self.receiver.try_recv() {
            Ok(reply) => ReplyState::Ready(reply),
            Err(TryRecvError::Empty) => ReplyState::Waiting,
            Err(TryRecvError::Disconnected) => ReplyState::Lost,
        }
    }

    /// Blocks up to `timeout`; only the CLI edges use this.
    pub fn wait(self, timeout: Duration) -> WatchResult<BridgeReply> {
        self.receiver.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => WatchError::BackgroundUnavailable(format!(
                "no reply to {} within {timeout:?}",
                self.kind
            )),
            RecvTimeoutError::Disconnected => {
                WatchError::BackgroundUnavailable(format!("worker dropped {}", self.kind))
            }
        })
    }
}

/// Watch-side end of the bridge. Without a worker every send reports
/// `BackgroundUnavailable` and callers take their in-process path.
#[derive(Default)]
pub struct BridgeClient {
    sender: Option<Sender<Envelope>>,
    in_flight: Vec<PendingReply>,
}

impl BridgeClient {
    pub fn connected(sender: Sender<Envelope>) -> Self {
        Self {
            sender: Some(sender),
            in_flight: Vec::new(),
        }
    }

    pub fn offline() -> Self {
        Self::default()
    }

    pub fn is_available(&self) -> bool {
        self.sender.is_some()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn request(&mut self, request: BridgeRequest) -> WatchResult<PendingReply> {
        let kind = request.kind();
        let Some(sender) = self.sender.as_ref() else {
            return Err(WatchError::BackgroundUnavailable(format!(
                "no worker for {kind}"
            )));
        };
        let (reply, receiver) = mpsc::channel();
        if sender.send(Envelope { request, reply }).is_err() {
            warn!(kind, "background worker gone, switching to in-process checks");
            self.sender = None;
            return Err(WatchError::BackgroundUnavailable(format!(
                "worker stopped before {kind}"
            )));
        }
        debug!(kind, "bridge request sent");
        Ok(PendingReply { kind, receiver })
    }

    /// Fire-and-forget send; the reply is collected later by `poll_replies`.
    pub fn post(&mut self, request: BridgeRequest) -> WatchResult<()> {
        let pending = self.request(request)?;
        self.in_flight.push(pending);
        Ok(())
    }

    pub fn schedule_alarm(
        &mut self,
        alarm_id: &str,
        time: u16,
        sound: &str,
        enabled: bool,
    ) -> WatchResult<()> {
        self.post(BridgeRequest::ScheduleAlarm {
            alarm_id: alarm_id.to_string(),
            time,
            sound: sound.to_string(),
            enabled,
        })
    }

    pub fn cancel_alarm(&mut self, alarm_id: &str) -> WatchResult<()> {
        self.post(BridgeRequest::CancelAlarm {
            alarm_id: alarm_id.to_string(),
        })
    }

    pub fn check_alarms(&mut self) -> WatchResult<()> {
        self.post(BridgeRequest::CheckAlarms)
    }

    /// Drains whatever replies have arrived without waiting for the rest.
    pub fn poll_replies(&mut self) -> Vec<(&'static str, BridgeReply)> {
        let mut arrived = Vec::new();
        self.in_flight.retain(|pending| match pending.try_reply() {
            ReplyState::Waiting => true,
            ReplyState::Ready(reply) => {
                arrived.push((pending.kind(), reply));
                false
            }
            ReplyState::Lost => {
                debug!(kind = pending.kind(), "reply channel closed without answer");
                false
            }
        });
        for (kind, reply) in &arrived {
            if matches!(reply, BridgeReply::Ack { success: false }) {
                warn!(kind, "worker refused request");
            }
        }
        arrived
    }
}
