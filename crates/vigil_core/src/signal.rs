//! # Signals
//!
//! Every input to the aggregator is a [`Signal`] delivered through one
//! ordered inbox. Monitors, the exam timer and the host all speak this
//! vocabulary; none of them call into the aggregator directly.
//!
//! ```text
//! Visibility ─┐
//! Lockdown  ──┼──> SignalSink ──> inbox ──> Aggregator::apply ──> Effects
//! Presence  ──┤
//! Timer     ──┘
//! ```

use crate::channel::MonitorEvent;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Non-fatal monitor failure. The session continues in degraded mode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MonitorFault {
    /// The camera stream could not be acquired.
    CaptureUnavailable(String),
    /// Fullscreen was refused by the platform.
    FullscreenRefused(String),
    /// The platform refused to install an input interceptor.
    InterceptionRefused(String),
}

impl fmt::Display for MonitorFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CaptureUnavailable(detail) => write!(f, "presence monitoring unavailable: {detail}"),
            Self::FullscreenRefused(detail) => write!(f, "fullscreen refused: {detail}"),
            Self::InterceptionRefused(detail) => write!(f, "input interception refused: {detail}"),
        }
    }
}

/// Aggregator input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Signal {
    /// A monitor observed something.
    Monitor {
        /// What was observed.
        event: MonitorEvent,
        /// Wall-clock time (Unix epoch ms).
        at_ms: u64,
    },
    /// The exam timer advanced.
    TimerTick {
        /// Seconds left after this tick.
        remaining_secs: u32,
        /// Wall-clock time (Unix epoch ms).
        at_ms: u64,
    },
    /// The candidate asked to submit.
    SubmitRequested {
        /// Wall-clock time (Unix epoch ms).
        at_ms: u64,
    },
    /// A monitor degraded.
    Fault {
        /// What failed.
        fault: MonitorFault,
        /// Wall-clock time (Unix epoch ms).
        at_ms: u64,
    },
}

impl Signal {
    /// Wall-clock time carried by the signal.
    #[must_use]
    pub const fn at_ms(&self) -> u64 {
        match self {
            Self::Monitor { at_ms, .. }
            | Self::TimerTick { at_ms, .. }
            | Self::SubmitRequested { at_ms }
            | Self::Fault { at_ms, .. } => *at_ms,
        }
    }
}

/// Destination for signals.
///
/// Implementations must not call back into the poster synchronously while
/// holding a lock the poster might need.
pub trait SignalSink: Send + Sync {
    /// Delivers one signal.
    fn post(&self, signal: Signal);
}

impl SignalSink for crossbeam_channel::Sender<Signal> {
    fn post(&self, signal: Signal) {
        if self.send(signal).is_err() {
            tracing::debug!("signal dropped: inbox closed");
        }
    }
}

/// Source of wall-clock timestamps.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;
}

/// Clock backed by `SystemTime`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }
}

/// Manually advanced clock for tests and replays.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    /// Creates a clock reading `start_ms`.
    #[must_use]
    pub const fn new(start_ms: u64) -> Self {
        Self { now_ms: AtomicU64::new(start_ms) }
    }

    /// Moves the clock forward.
    pub fn advance(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::Relaxed);
    }

    /// Sets the clock.
    pub fn set(&self, ms: u64) {
        self.now_ms.store(ms, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_sink_delivers_in_order() {
        let (tx, rx) = crossbeam_channel::unbounded();
        tx.post(Signal::SubmitRequested { at_ms: 1 });
        tx.post(Signal::TimerTick { remaining_secs: 9, at_ms: 2 });

        assert_eq!(rx.try_recv().unwrap().at_ms(), 1);
        assert_eq!(rx.try_recv().unwrap().at_ms(), 2);
    }

    #[test]
    fn test_closed_inbox_does_not_panic() {
        let (tx, rx) = crossbeam_channel::unbounded::<Signal>();
        drop(rx);
        tx.post(Signal::SubmitRequested { at_ms: 1 });
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(1_000);
        clock.advance(250);
        assert_eq!(clock.now_ms(), 1_250);
        clock.set(5);
        assert_eq!(clock.now_ms(), 5);
    }
}
