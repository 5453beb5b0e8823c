//! # Vigil
//!
//! Session host for proctored exams, integrating the violation engine with
//! the monitors.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           PROCTOR                               │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │  Visibility  │   │   Lockdown   │   │   Presence   │◄── driver│
//! │  └──────┬───────┘   └──────┬───────┘   └──────┬───────┘ (sample)│
//! │         │                  │                  │                 │
//! │         └──────────────────┼──────────────────┘                 │
//! │                            ▼                                    │
//! │                   ┌─────────────────┐                           │
//! │   driver (tick) ─►│  SessionHandle  │── listeners ──► host      │
//! │                   │  inbox + pump   │                           │
//! │                   │   Aggregator    │                           │
//! │                   └─────────────────┘                           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `session`: inbox, listeners, queries, audit export
//! - `proctor`: monitor wiring and teardown
//! - `driver`: tokio countdown and presence sampling

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod driver;
pub mod error;
pub mod proctor;
pub mod session;

// Re-export the engine and the monitors
pub use vigil_core as core;
pub use vigil_monitors as monitors;

pub use driver::{DriverExit, DriverReport, ProctorDriver, ShutdownHandle};
pub use error::{SessionError, SessionResult};
pub use proctor::{Platform, Proctor};
pub use session::{create_session, SessionBuilder, SessionHandle};
