use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// When the container deletes a message after handing it to the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeletionPolicy {
    /// Delete only when the handler succeeds.
    OnSuccess,
    /// Delete whatever the outcome.
    Always,
    /// Never delete; the handler acknowledges through [`Acknowledgment`](crate::message::Acknowledgment).
    Never,
    /// Delete on success, and on failure only if the queue has no redrive
    /// policy to move the message to a dead-letter queue.
    #[default]
    NoRedrive,
}

/// Result of handing one message to the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

impl DeletionPolicy {
    pub fn should_delete(self, outcome: Outcome, has_redrive_policy: bool) -> bool {
        match (self, outcome) {
            (DeletionPolicy::OnSuccess, Outcome::Success) => true,
            (DeletionPolicy::OnSuccess, Outcome::Failure) => false,
            (DeletionPolicy::Always, _) => true,
            (DeletionPolicy::Never, _) => false,
            (DeletionPolicy::NoRedrive, Outcome::Success) => true,
            (DeletionPolicy::NoRedrive, Outcome::Failure) => !has_redrive_policy,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeletionPolicy::OnSuccess => "ON_SUCCESS",
            DeletionPolicy::Always => "ALWAYS",
            DeletionPolicy::Never => "NEVER",
            DeletionPolicy::NoRedrive => "NO_REDRIVE",
        }
    }
}

impl fmt::Display for DeletionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeletionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ON_SUCCESS" => Ok(DeletionPolicy::OnSuccess),
            "ALWAYS" => Ok(DeletionPolicy::Always),
            "NEVER" => Ok(DeletionPolicy::Never),
            "NO_REDRIVE" => Ok(DeletionPolicy::NoRedrive),
            other => Err(format!("unknown deletion policy '{other}'")),
        }
    }
}
