//! Engine-to-client event record

use serde::{Deserialize, Serialize};

use crate::validate::FieldError;

/// Terminal status labels used on the wire. Kept literal for client
/// compatibility.
pub const STATUS_PROCESSING: &str = "processing";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_BROKED: &str = "broked";

/// One structured status event, delivered to the session channel and
/// mirrored into the deploy log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsEvent {
    /// Task name this event belongs to, or a flow marker
    /// (`check_password`, `finish`, `Alert`)
    pub task: String,
    /// Outcome flag
    pub result: bool,
    /// Free-text status or structured validation errors
    pub status: StatusPayload,
    /// Interface names discovered during credential verification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interfaces: Option<Vec<String>>,
}

/// Status field payload: plain text for task lifecycle events, an error
/// list for alerts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusPayload {
    Text(String),
    Errors(Vec<FieldError>),
}

impl StatusPayload {
    /// Text form used for the deploy log line
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            StatusPayload::Text(text) => text.clone(),
            StatusPayload::Errors(errors) => errors
                .iter()
                .map(|e| format!("{}: {}", e.loc, e.msg))
                .collect::<Vec<_>>()
                .join("; "),
        }
    }
}

impl WsEvent {
    /// Task has been dispatched and is about to execute
    #[must_use]
    pub fn processing(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            result: true,
            status: StatusPayload::Text(STATUS_PROCESSING.to_string()),
            interfaces: None,
        }
    }

    /// Terminal event for a single task
    #[must_use]
    pub fn task_outcome(task: impl Into<String>, succeeded: bool) -> Self {
        let status = if succeeded {
            STATUS_COMPLETED
        } else {
            STATUS_BROKED
        };
        Self {
            task: task.into(),
            result: succeeded,
            status: StatusPayload::Text(status.to_string()),
            interfaces: None,
        }
    }

    /// Credential check resolution. The interface list rides along only
    /// when access was granted; the field is omitted otherwise.
    #[must_use]
    pub fn check_password(granted: bool, interfaces: Vec<String>) -> Self {
        let status = if granted { "correct" } else { "incorrect" };
        Self {
            task: "check_password".to_string(),
            result: granted,
            status: StatusPayload::Text(status.to_string()),
            interfaces: granted.then_some(interfaces),
        }
    }

    /// Validation or connection failure surfaced to the client
    #[must_use]
    pub fn alert(errors: Vec<FieldError>) -> Self {
        Self {
            task: "Alert".to_string(),
            result: false,
            status: StatusPayload::Errors(errors),
            interfaces: None,
        }
    }

    /// Single terminal event for a whole deployment batch
    #[must_use]
    pub fn finish() -> Self {
        Self {
            task: "finish".to_string(),
            result: true,
            status: StatusPayload::Text(
                "Installation finished, check failed points and reboot the server".to_string(),
            ),
            interfaces: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_outcome_serializes_flat() {
        let event = WsEvent::task_outcome("nginx", true);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["task"], "nginx");
        assert_eq!(json["result"], true);
        assert_eq!(json["status"], "completed");
        assert!(json.get("interfaces").is_none());
    }

    #[test]
    fn alert_carries_error_list() {
        let errors = vec![FieldError::new("client_ip", "field cannot be empty")];
        let event = WsEvent::alert(errors);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["task"], "Alert");
        assert_eq!(json["status"][0]["loc"], "client_ip");
        assert_eq!(json["status"][0]["type"], "value_error");
    }

    #[test]
    fn check_password_includes_interfaces() {
        let event = WsEvent::check_password(true, vec!["eth0".into(), "lo".into()]);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["status"], "correct");
        assert_eq!(json["interfaces"][0], "eth0");
    }

    #[test]
    fn denied_check_password_omits_interfaces() {
        let event = WsEvent::check_password(false, Vec::new());
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["result"], false);
        assert_eq!(json["status"], "incorrect");
        assert!(json.get("interfaces").is_none());
    }
}
