pub mod client;
pub mod messages;
pub mod worker;

pub use client::{BridgeClient, PendingReply, ReplyState};
pub use messages::{BridgeReply, BridgeRequest, MAIN_ALARM_ID, Notification, NotificationAction};
pub use worker::{AlarmBook, BackgroundWorker, LogNotifier, Notifier, WorkerConfig};
