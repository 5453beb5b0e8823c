//! # Exam Timer
//!
//! One-second countdown from the exam duration to zero. The timer knows
//! nothing about violations; it only produces [`Signal::TimerTick`]s and
//! the aggregator turns the zero tick into a `TimeExpired` submission.

use crate::signal::Signal;
use std::fmt;

/// Remaining-time band used for display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Urgency {
    /// More than 15 minutes left.
    Normal,
    /// Less than 15 minutes left.
    Warning,
    /// Less than 5 minutes left.
    Danger,
}

/// Countdown controller.
#[derive(Clone, Debug)]
pub struct ExamTimer {
    /// Configured duration.
    duration_secs: u32,
    /// Seconds left.
    remaining_secs: u32,
    /// Zero tick already produced.
    expired: bool,
}

impl ExamTimer {
    /// Below this the timer is in the warning band.
    pub const WARNING_SECS: u32 = 900;
    /// Below this the timer is in the danger band.
    pub const DANGER_SECS: u32 = 300;

    /// Creates a timer.
    #[must_use]
    pub const fn new(duration_secs: u32) -> Self {
        Self {
            duration_secs,
            remaining_secs: duration_secs,
            expired: false,
        }
    }

    /// Advances one second. Returns the seconds left, or `None` once the
    /// zero tick has already been produced.
    pub fn tick(&mut self) -> Option<u32> {
        if self.expired {
            return None;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.expired = true;
        }
        Some(self.remaining_secs)
    }

    /// Advances one second and wraps the result as a signal.
    pub fn tick_signal(&mut self, at_ms: u64) -> Option<Signal> {
        self.tick().map(|remaining_secs| Signal::TimerTick { remaining_secs, at_ms })
    }

    /// Seconds left.
    #[must_use]
    pub const fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    /// Seconds elapsed.
    #[must_use]
    pub const fn elapsed_secs(&self) -> u32 {
        self.duration_secs - self.remaining_secs
    }

    /// Configured duration.
    #[must_use]
    pub const fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    /// Returns true once the zero tick was produced.
    #[must_use]
    pub const fn is_expired(&self) -> bool {
        self.expired
    }

    /// Display band.
    #[must_use]
    pub const fn urgency(&self) -> Urgency {
        if self.remaining_secs < Self::DANGER_SECS {
            Urgency::Danger
        } else if self.remaining_secs < Self::WARNING_SECS {
            Urgency::Warning
        } else {
            Urgency::Normal
        }
    }
}

impl fmt::Display for ExamTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.remaining_secs;
        write!(f, "{:02}:{:02}:{:02}", s / 3600, (s % 3600) / 60, s % 60)
    }
}
