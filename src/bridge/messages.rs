use serde::{Deserialize, Serialize};

pub const WORKER_VERSION: &str = "cockpit-watch-v1.0.0";
pub const MAIN_ALARM_ID: &str = "main-alarm";
pub const NOTIFICATION_TAG: &str = "cockpit-alarm";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BridgeRequest {
    #[serde(rename_all = "camelCase")]
    ScheduleAlarm {
        alarm_id: String,
        /// Minutes since local midnight.
        time: u16,
        sound: String,
        enabled: bool,
    },
    #[serde(rename_all = "camelCase")]
    CancelAlarm { alarm_id: String },
    GetVersion,
    CheckAlarms,
    #[serde(rename_all = "camelCase")]
    NotificationClick {
        alarm_id: String,
        action: NotificationAction,
    },
}

impl BridgeRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeRequest::ScheduleAlarm { .. } => "SCHEDULE_ALARM",
            BridgeRequest::CancelAlarm { .. } => "CANCEL_ALARM",
            BridgeRequest::GetVersion => "GET_VERSION",
            BridgeRequest::CheckAlarms => "CHECK_ALARMS",
            BridgeRequest::NotificationClick { .. } => "NOTIFICATION_CLICK",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BridgeReply {
    Ack { success: bool },
    Version { version: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationAction {
    Dismiss,
    Snooze,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub tag: String,
    pub require_interaction: bool,
    pub actions: Vec<NotificationAction>,
    pub alarm_id: String,
    pub sound: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn schedule_alarm_uses_wire_names() {
        let request = BridgeRequest::ScheduleAlarm {
            alarm_id: MAIN_ALARM_ID.to_string(),
            time: 420,
            sound: "beep".to_string(),
            enabled: true,
        };
        let value = serde_json::to_value(&request).expect("encode");
        assert_eq!(
            value,
            json!({
                "type": "SCHEDULE_ALARM",
                "alarmId": "main-alarm",
                "time": 420,
                "sound": "beep",
                "enabled": true
            })
        );
    }

    #[test]
    fn unit_requests_parse_from_type_alone() {
        assert_eq!(
            serde_json::from_str::<BridgeRequest>(r#"{"type":"GET_VERSION"}"#).expect("parse"),
            BridgeRequest::GetVersion
        );
        assert_eq!(
            serde_json::from_str::<BridgeRequest>(r#"{"type":"CANCEL_ALARM","alarmId":"main-alarm"}"#)
                .expect("parse"),
            BridgeRequest::CancelAlarm {
                alarm_id: "main-alarm".to_string()
            }
        );
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(serde_json::from_str::<BridgeRequest>(r#"{"type":"SKIP_WAITING"}"#).is_err());
    }

    #[test]
    fn replies_serialize_flat() {
        assert_eq!(
            serde_json::to_string(&BridgeReply::Ack { success: true }).expect("encode"),
            r#"{"success":true}"#
        );
        assert_eq!(
            serde_json::to_string(&BridgeReply::Version {
                version: WORKER_VERSION.to_string()
            })
            .expect("encode"),
            r#"{"version":"cockpit-watch-v1.0.0"}"#
        );
    }
}
