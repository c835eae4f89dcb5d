//! Enumerations and field types for task tracking.
//!
//! This module defines the task status values as they appear in the task sheet,
//! the notification kinds a card can be built for, and the failure policy used
//! by the reminder sweep.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Task progress status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[default]
    NotStarted,
    InProgress,
    Done,
    PendingReview,
}

impl Status {
    /// The label written into the status column of the task sheet.
    pub fn label(self) -> &'static str {
        match self {
            Status::NotStarted => "⚪️ 未着手",
            Status::InProgress => "🔵 進行中",
            Status::Done => "🟢 完了",
            Status::PendingReview => "🟡 確認待ち",
        }
    }

    /// Parse a status cell. Accepts sheet labels, English names and kebab-case names.
    pub fn from_label(s: &str) -> Option<Status> {
        let s = s.trim();
        for status in [Status::NotStarted, Status::InProgress, Status::Done, Status::PendingReview] {
            if s == status.label() {
                return Some(status);
            }
        }
        match s.to_lowercase().replace([' ', '_'], "-").as_str() {
            "not-started" | "notstarted" | "open" => Some(Status::NotStarted),
            "in-progress" | "inprogress" => Some(Status::InProgress),
            "done" | "complete" | "completed" => Some(Status::Done),
            "pending-review" | "pendingreview" | "review" => Some(Status::PendingReview),
            _ => None,
        }
    }
}

/// The kind of notification a card is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationType {
    /// A one-off notification raised from the task's notify flag.
    Normal,
    /// The due date has passed.
    Delayed,
    DueToday,
    DueTomorrow,
}

impl NotificationType {
    /// Short display name used in listings and logs.
    pub fn name(self) -> &'static str {
        match self {
            NotificationType::Normal => "NORMAL",
            NotificationType::Delayed => "DELAYED",
            NotificationType::DueToday => "DUE_TODAY",
            NotificationType::DueTomorrow => "DUE_TOMORROW",
        }
    }
}

/// What the reminder sweep does when a send fails.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Stop at the first failed send and return its error.
    #[default]
    Abort,
    /// Keep sending and report every failure at the end.
    Continue,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels_round_trip() {
        for status in [Status::NotStarted, Status::InProgress, Status::Done, Status::PendingReview] {
            assert_eq!(Status::from_label(status.label()), Some(status));
        }
    }

    #[test]
    fn test_status_accepts_english_names() {
        assert_eq!(Status::from_label("Done"), Some(Status::Done));
        assert_eq!(Status::from_label("in progress"), Some(Status::InProgress));
        assert_eq!(Status::from_label("pending_review"), Some(Status::PendingReview));
        assert_eq!(Status::from_label("???"), None);
    }

    #[test]
    fn test_failure_policy_from_toml_name() {
        #[derive(Deserialize)]
        struct Wrapper {
            policy: FailurePolicy,
        }
        let w: Wrapper = toml::from_str("policy = \"continue\"").unwrap();
        assert_eq!(w.policy, FailurePolicy::Continue);
    }
}
