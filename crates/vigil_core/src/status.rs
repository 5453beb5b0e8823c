//! Session lifecycle states and termination reasons.

use crate::channel::ViolationChannel;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of one exam attempt.
///
/// ```text
/// Active ──> Submitting ──> Completed
///                      └──> Terminated
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionStatus {
    /// Exam in progress.
    Active,
    /// Submission decided, result not yet computed.
    Submitting,
    /// Ended by a violation limit.
    Terminated,
    /// Ended by the timer or by the candidate.
    Completed,
}

impl SessionStatus {
    /// Returns true once no further transition out of `Active` is possible.
    #[must_use]
    pub const fn is_closed(self) -> bool {
        !matches!(self, Self::Active)
    }

    /// Returns true for `Completed` and `Terminated`.
    #[must_use]
    pub const fn is_final(self) -> bool {
        matches!(self, Self::Completed | Self::Terminated)
    }
}

/// Why submission started.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "reason", content = "channel")]
pub enum TerminationReason {
    /// The countdown reached zero.
    TimeExpired,
    /// The candidate pressed submit.
    CandidateRequested,
    /// The increment on `channel` crossed its rule's limit.
    ViolationLimit(ViolationChannel),
}

impl TerminationReason {
    /// Returns true if this reason ends the exam as `Terminated`.
    #[must_use]
    pub const fn is_violation(self) -> bool {
        matches!(self, Self::ViolationLimit(_))
    }

    /// Status reached after finalize.
    #[must_use]
    pub const fn final_status(self) -> SessionStatus {
        if self.is_violation() {
            SessionStatus::Terminated
        } else {
            SessionStatus::Completed
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimeExpired => f.write_str("time expired"),
            Self::CandidateRequested => f.write_str("submitted by candidate"),
            Self::ViolationLimit(channel) => write!(f, "violation limit reached on {channel}"),
        }
    }
}
