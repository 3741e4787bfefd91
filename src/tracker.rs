use tracing::{error, info};

use crate::models::{NotificationKind, ServiceState, TransitionEvent};

/// Tracks the last-known service state across check cycles and decides
/// when a probe outcome constitutes a genuine state transition.
///
/// Notifications are edge-triggered: an observation matching the current
/// state never emits, so a service that stays down produces exactly one
/// `Failure` event no matter how often it is probed. The very first
/// observation leaves `Unknown`: `Unknown -> Down` emits `Failure`,
/// `Unknown -> Up` stays silent.
#[derive(Debug)]
pub struct StatusTracker {
    current: ServiceState,
    consecutive_successes: u32,
    consecutive_failures: u32,
    last_notification: Option<NotificationKind>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self {
            current: ServiceState::Unknown,
            consecutive_successes: 0,
            consecutive_failures: 0,
            last_notification: None,
        }
    }

    /// Record one check outcome and return the transition it caused, if any.
    pub fn update(&mut self, success: bool) -> Option<TransitionEvent> {
        if success {
            self.consecutive_failures = 0;
            self.consecutive_successes += 1;

            if self.current == ServiceState::Up {
                return None;
            }

            let from = self.current;
            self.current = ServiceState::Up;
            info!("Service is now UP (was {})", from);

            if from != ServiceState::Down {
                return None;
            }

            self.last_notification = Some(NotificationKind::Recovery);
            Some(TransitionEvent {
                kind: NotificationKind::Recovery,
                from,
                to: ServiceState::Up,
            })
        } else {
            self.consecutive_successes = 0;
            self.consecutive_failures += 1;

            if self.current == ServiceState::Down {
                return None;
            }

            let from = self.current;
            self.current = ServiceState::Down;
            error!("Service is now DOWN (was {})", from);

            self.last_notification = Some(NotificationKind::Failure);
            Some(TransitionEvent {
                kind: NotificationKind::Failure,
                from,
                to: ServiceState::Down,
            })
        }
    }

    pub fn current(&self) -> ServiceState {
        self.current
    }

    pub fn consecutive_successes(&self) -> u32 {
        self.consecutive_successes
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn last_notification(&self) -> Option<NotificationKind> {
        self.last_notification
    }
}

impl Default for StatusTracker {
    fn default() -> Self {
        Self::new()
    }
}
