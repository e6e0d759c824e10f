// File: ledgerbot-common/src/models/notification.rs

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::models::request::RequestKind;

/// A best-effort message for one recipient, optionally with buttons.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<NotificationAction>,
}

impl Notification {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), actions: Vec::new() }
    }

    /// Message carrying the approve/reject pair for a pending request.
    pub fn with_review(text: impl Into<String>, kind: RequestKind, request_id: i64) -> Self {
        Self {
            text: text.into(),
            actions: vec![
                NotificationAction::Approve { kind, request_id },
                NotificationAction::Reject { kind, request_id },
            ],
        }
    }
}

/// Admin affordance bound to a specific request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NotificationAction {
    Approve { kind: RequestKind, request_id: i64 },
    Reject { kind: RequestKind, request_id: i64 },
}

impl NotificationAction {
    pub fn label(&self) -> &'static str {
        match self {
            NotificationAction::Approve { .. } => "✅ Approve",
            NotificationAction::Reject { .. } => "❌ Reject",
        }
    }
}

/// Callback payload form: `approve:deposit:42`.
impl fmt::Display for NotificationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationAction::Approve { kind, request_id } => write!(f, "approve:{}:{}", kind, request_id),
            NotificationAction::Reject { kind, request_id } => write!(f, "reject:{}:{}", kind, request_id),
        }
    }
}

impl FromStr for NotificationAction {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let verb = parts.next().unwrap_or_default();
        let kind: RequestKind = parts
            .next()
            .ok_or_else(|| format!("Missing request kind in '{}'", s))?
            .parse()?;
        let request_id: i64 = parts
            .next()
            .ok_or_else(|| format!("Missing request id in '{}'", s))?
            .parse()
            .map_err(|e| format!("Bad request id in '{}': {}", s, e))?;
        match verb {
            "approve" => Ok(NotificationAction::Approve { kind, request_id }),
            "reject" => Ok(NotificationAction::Reject { kind, request_id }),
            other => Err(format!("Unknown action '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_payload_parses_back() {
        let action = NotificationAction::Reject { kind: RequestKind::Withdrawal, request_id: 17 };
        assert_eq!(action.to_string(), "reject:withdrawal:17");
        assert_eq!("reject:withdrawal:17".parse::<NotificationAction>().unwrap(), action);
        assert!("approve:deposit".parse::<NotificationAction>().is_err());
        assert!("delete:deposit:1".parse::<NotificationAction>().is_err());
    }
}
