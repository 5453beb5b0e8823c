//! # Vigil Core - The Violation Engine
//!
//! Deterministic heart of the exam proctor: independent monitors report
//! discrete events, the [`Aggregator`] counts them against a [`Policy`],
//! logs every one of them and decides when the exam ends.
//!
//! ## Architecture
//!
//! ```text
//! MONITORS / TIMER / HOST              AGGREGATOR
//!     │                                    │
//!     │─── Signal ───────────────────────►│ count, log
//!     │                                    │
//!     │◄── Effect (Warning) ──────────────┤
//!     │◄── Effect (SubmissionStarted) ────┤ Active -> Submitting
//!     │                                    │
//!     │─── finalize(answers) ────────────►│ -> Completed | Terminated
//!     │                                    │
//!     │                             ┌──────────────┐
//!     │                             │  Audit Log   │
//!     │                             │  (binary)    │
//!     │                             └──────────────┘
//! ```
//!
//! Nothing in this crate touches a platform API or a clock, so every
//! session can be replayed from its exported log.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod aggregator;
pub mod answers;
pub mod channel;
pub mod config;
pub mod error;
pub mod log;
pub mod policy;
pub mod signal;
pub mod status;
pub mod timer;
pub mod warning;

pub use aggregator::{replay, Aggregator, Effect, ExamResult};
pub use answers::{score_percent, AnswerSheet, AnswerStore};
pub use channel::{MonitorEvent, RestrictedAction, ViolationChannel};
pub use config::{CaptureConstraints, Facing, ProctorConfig};
pub use error::{CoreError, CoreResult};
pub use log::{EntryKind, EventLog, LogEntry, LogHeader};
pub use policy::{Policy, ThresholdRule};
pub use signal::{Clock, ManualClock, MonitorFault, Signal, SignalSink, SystemClock};
pub use status::{SessionStatus, TerminationReason};
pub use timer::{ExamTimer, Urgency};
pub use warning::{Warning, WarningState};
