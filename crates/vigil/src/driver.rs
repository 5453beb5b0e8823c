//! # Proctor Driver
//!
//! Tokio loop for the two periodic sources: the one-second exam countdown
//! and presence sampling. Both post into the session inbox; the driver
//! itself decides nothing.
//!
//! The loop ends when the session leaves `Active`, when it is destroyed, or
//! when [`ShutdownHandle::shutdown`] is called.

use crate::proctor::Proctor;
use crate::session::SessionHandle;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use vigil_core::ExamTimer;
use vigil_monitors::PresenceMonitor;

/// Why the driver loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverExit {
    /// The session left `Active`.
    SessionClosed,
    /// The session was destroyed.
    Destroyed,
    /// Shutdown was requested.
    Shutdown,
}

/// Counters from one driver run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverReport {
    /// Why the loop ended.
    pub exit: DriverExit,
    /// Timer ticks posted.
    pub ticks: u32,
    /// Presence samples taken.
    pub samples: u64,
}

/// Requests a running driver to stop.
#[derive(Clone, Debug)]
pub struct ShutdownHandle {
    notify: Arc<Notify>,
}

impl ShutdownHandle {
    /// Stops the driver at its next wake-up. Safe to call before `run`.
    pub fn shutdown(&self) {
        self.notify.notify_one();
    }
}

/// Periodic driver for one proctored session.
pub struct ProctorDriver {
    session: SessionHandle,
    presence: Option<Arc<PresenceMonitor>>,
    timer: ExamTimer,
    tick_period: Duration,
    sample_period: Duration,
    shutdown: Arc<Notify>,
}

impl ProctorDriver {
    /// Driver for a proctor: countdown plus presence sampling.
    #[must_use]
    pub fn new(proctor: &Proctor) -> Self {
        let mut driver = Self::timer_only(proctor.session().clone());
        driver.presence = Some(proctor.presence());
        driver
    }

    /// Driver that only runs the countdown.
    #[must_use]
    pub fn timer_only(session: SessionHandle) -> Self {
        let config = session.config();
        let tick_period = Duration::from_millis(config.timer.tick_ms);
        let sample_period = Duration::from_millis(config.presence.sample_period_ms);
        let timer = ExamTimer::new(session.duration_secs());
        Self {
            session,
            presence: None,
            timer,
            tick_period,
            sample_period,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Handle for stopping the loop from elsewhere.
    #[must_use]
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle { notify: Arc::clone(&self.shutdown) }
    }

    /// Runs until the session closes, is destroyed, or shutdown is requested.
    pub async fn run(mut self) -> DriverReport {
        // First tick one period from now, not immediately.
        let mut countdown = interval_at(Instant::now() + self.tick_period, self.tick_period);
        countdown.set_missed_tick_behavior(MissedTickBehavior::Burst);
        let mut sampling = interval_at(Instant::now() + self.sample_period, self.sample_period);
        sampling.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut ticks = 0u32;
        let mut samples = 0u64;

        tracing::info!(
            exam_id = self.session.exam_id(),
            tick_ms = u64::try_from(self.tick_period.as_millis()).unwrap_or(u64::MAX),
            presence = self.presence.is_some(),
            "proctor driver started"
        );

        let exit = loop {
            if let Some(exit) = self.finished() {
                break exit;
            }

            let sampling_enabled = self.presence.as_ref().is_some_and(|p| p.is_running());

            tokio::select! {
                _ = countdown.tick() => {
                    if let Some(signal) = self.timer.tick_signal(self.session.now_ms()) {
                        ticks += 1;
                        self.session.post(signal);
                    }
                }
                _ = sampling.tick(), if sampling_enabled => {
                    if let Some(presence) = &self.presence {
                        if presence.sample().is_some() {
                            samples += 1;
                        }
                    }
                }
                () = self.shutdown.notified() => break DriverExit::Shutdown,
            }
        };

        tracing::info!(?exit, ticks, samples, "proctor driver stopped");
        DriverReport { exit, ticks, samples }
    }

    fn finished(&self) -> Option<DriverExit> {
        if self.session.is_destroyed() {
            Some(DriverExit::Destroyed)
        } else if self.session.status().is_closed() {
            Some(DriverExit::SessionClosed)
        } else {
            None
        }
    }
}
