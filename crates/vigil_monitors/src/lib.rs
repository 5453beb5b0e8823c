//! # Vigil Monitors - The Watchers
//!
//! Three independent monitors, each turning platform signals into
//! [`vigil_core::MonitorEvent`]s:
//!
//! - [`VisibilityMonitor`] - tab/window focus loss, devtools shortcuts
//! - [`LockdownMonitor`] - fullscreen enforcement, restricted input paths
//! - [`PresenceMonitor`] - camera sampling, face counting
//!
//! ```text
//! PLATFORM                MONITOR                  SINK (session inbox)
//!    │                       │                          │
//!    │── PageSignal ───────►│                          │
//!    │◄── Disposition ──────┤── Signal::Monitor ─────►│
//!    │                       │                          │
//!    │   (start failure)     │── Signal::Fault ───────►│
//! ```
//!
//! Monitors never decide anything about the exam. `stop` is idempotent,
//! may be called from inside the sink, and nothing is emitted after it
//! returns. Platform resources are held by guards and released on drop.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod classifier;
pub mod emitter;
pub mod error;
pub mod input;
pub mod lockdown;
pub mod platform;
pub mod presence;
pub mod simulation;
pub mod visibility;

pub use classifier::{FaceClassifier, ScriptedClassifier, StubClassifier};
pub use emitter::Emitter;
pub use error::{DeviceAcquisitionError, FullscreenRequestError, InterceptionFailure};
pub use input::{Disposition, Key, KeyCombo, Modifiers};
pub use lockdown::{InterceptionGuard, LockdownMonitor, LockdownSignal};
pub use platform::{CaptureDevice, CaptureStream, DisplayControl, Frame, InputInterceptor};
pub use presence::{PresenceMonitor, StreamLease};
pub use visibility::{PageSignal, VisibilityMonitor};
