//! Notification status enumeration and transition rules.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a notification record.
///
/// Transitions are monotonic forward, with one exception: an operator retry
/// moves a failed record back to `Queued` and resets its attempt counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    /// Record created, not yet handed to the queue.
    Pending,
    /// Accepted by the queue, awaiting a dispatch verdict.
    Queued,
    /// Broadcast to at least one connected session.
    Delivered,
    /// Enqueue failed, or all delivery attempts exhausted.
    Failed,
}

impl NotificationStatus {
    /// Check if the record is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Failed)
    }

    /// Check if an operator may retry the record.
    pub fn can_retry(&self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Check if `next` is a legal transition from this status.
    pub fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Queued)
                | (Self::Pending, Self::Failed)
                | (Self::Queued, Self::Delivered)
                | (Self::Queued, Self::Failed)
                | (Self::Failed, Self::Queued)
        )
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Queued => "queued",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions_are_legal() {
        assert!(NotificationStatus::Pending.can_transition_to(NotificationStatus::Queued));
        assert!(NotificationStatus::Pending.can_transition_to(NotificationStatus::Failed));
        assert!(NotificationStatus::Queued.can_transition_to(NotificationStatus::Delivered));
        assert!(NotificationStatus::Queued.can_transition_to(NotificationStatus::Failed));
    }

    #[test]
    fn retry_is_the_only_backward_transition() {
        assert!(NotificationStatus::Failed.can_transition_to(NotificationStatus::Queued));
        assert!(!NotificationStatus::Delivered.can_transition_to(NotificationStatus::Queued));
        assert!(!NotificationStatus::Queued.can_transition_to(NotificationStatus::Pending));
        assert!(!NotificationStatus::Delivered.can_transition_to(NotificationStatus::Pending));
    }

    #[test]
    fn terminal_states() {
        assert!(NotificationStatus::Delivered.is_terminal());
        assert!(NotificationStatus::Failed.is_terminal());
        assert!(!NotificationStatus::Pending.is_terminal());
        assert!(!NotificationStatus::Queued.is_terminal());
        assert!(NotificationStatus::Failed.can_retry());
        assert!(!NotificationStatus::Delivered.can_retry());
    }
}
