use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Unknown,
    Up,
    Down,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceState::Unknown => write!(f, "unknown"),
            ServiceState::Up => write!(f, "up"),
            ServiceState::Down => write!(f, "down"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Failure,
    Recovery,
}

/// Emitted by the tracker when an observation flips the service state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionEvent {
    pub kind: NotificationKind,
    pub from: ServiceState,
    pub to: ServiceState,
}

/// Outcome of a single probe attempt.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub success: bool,
    pub http_status: Option<u16>,
    pub error_detail: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ProbeResult {
    pub fn ok(http_status: u16) -> Self {
        Self {
            success: true,
            http_status: Some(http_status),
            error_detail: None,
            timestamp: Utc::now(),
        }
    }

    pub fn bad_status(http_status: u16) -> Self {
        Self {
            success: false,
            http_status: Some(http_status),
            error_detail: Some(format!("unexpected HTTP status {}", http_status)),
            timestamp: Utc::now(),
        }
    }

    pub fn transport_error(detail: String) -> Self {
        Self {
            success: false,
            http_status: None,
            error_detail: Some(detail),
            timestamp: Utc::now(),
        }
    }
}
