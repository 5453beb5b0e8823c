//! # Session Handle
//!
//! The host's view of one exam attempt.
//!
//! ## Architecture
//!
//! ```text
//! monitors / driver / host ──post──► inbox ──► pump ──► Aggregator::apply
//!                                                  │
//!                                   listeners ◄────┘ (effects, in order)
//! ```
//!
//! Every signal goes through one ordered inbox. Draining is single-entry:
//! a signal posted while the inbox is being drained (from a listener, from a
//! monitor stopped inside a listener, from another thread) is queued and
//! handled after the current one, never re-entrantly. Locks are released
//! before any listener runs.

use crate::error::{SessionError, SessionResult};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use vigil_core::{
    Aggregator, AnswerSheet, AnswerStore, Clock, Effect, EventLog, ExamResult, MonitorFault,
    ProctorConfig, SessionStatus, Signal, SignalSink, SystemClock, TerminationReason,
    ViolationChannel, Warning, WarningState,
};

/// Called once per counted violation.
pub type WarningListener = Arc<dyn Fn(&Warning) + Send + Sync>;
/// Called when time runs out or a violation limit is reached.
pub type TerminatedListener = Arc<dyn Fn(TerminationReason, &str) + Send + Sync>;
/// Called once with the final result.
pub type CompletedListener = Arc<dyn Fn(&ExamResult) + Send + Sync>;
/// Called when a monitor degrades.
pub type DegradedListener = Arc<dyn Fn(&MonitorFault) + Send + Sync>;
/// Called when the session leaves `Active`, for any reason.
pub type ClosingListener = Arc<dyn Fn(TerminationReason) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    warning: Vec<WarningListener>,
    terminated: Vec<TerminatedListener>,
    completed: Vec<CompletedListener>,
    degraded: Vec<DegradedListener>,
    closing: Vec<ClosingListener>,
}

struct SessionInner {
    exam_id: String,
    config: ProctorConfig,
    // Unbounded: signals are never dropped.
    tx: Sender<Signal>,
    rx: Receiver<Signal>,
    aggregator: Mutex<Aggregator>,
    listeners: Mutex<Listeners>,
    result: Mutex<Option<ExamResult>>,
    draining: AtomicBool,
    destroyed: AtomicBool,
    answers: Arc<dyn AnswerStore>,
    clock: Arc<dyn Clock>,
}

/// Builder for a [`SessionHandle`].
pub struct SessionBuilder {
    exam_id: String,
    duration_secs: u32,
    config: ProctorConfig,
    answers: Option<Arc<dyn AnswerStore>>,
    clock: Option<Arc<dyn Clock>>,
}

impl SessionBuilder {
    /// Starts a builder with the default configuration.
    #[must_use]
    pub fn new(exam_id: &str, duration_secs: u32) -> Self {
        Self {
            exam_id: exam_id.to_owned(),
            duration_secs,
            config: ProctorConfig::default(),
            answers: None,
            clock: None,
        }
    }

    /// Uses `config` for the policy and monitor settings.
    #[must_use]
    pub fn config(mut self, config: ProctorConfig) -> Self {
        self.config = config;
        self
    }

    /// Reads the score from `answers` at finalize time.
    #[must_use]
    pub fn answers(mut self, answers: Arc<dyn AnswerStore>) -> Self {
        self.answers = Some(answers);
        self
    }

    /// Timestamps signals with `clock` instead of the system clock.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Validates the configuration and creates the session.
    ///
    /// # Errors
    /// Returns [`crate::SessionError::Core`] if the configuration is invalid.
    pub fn build(self) -> SessionResult<SessionHandle> {
        self.config.validate()?;
        Ok(SessionHandle::assemble(self))
    }
}

/// Creates a session with the default policy, no answer store and the
/// system clock.
#[must_use]
pub fn create_session(exam_id: &str, duration_secs: u32) -> SessionHandle {
    SessionHandle::assemble(SessionBuilder::new(exam_id, duration_secs))
}

/// Shared handle to a running session. Cheap to clone.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<SessionInner>,
}

impl SessionHandle {
    fn assemble(builder: SessionBuilder) -> Self {
        let clock = builder.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let answers = builder.answers.unwrap_or_else(|| Arc::new(AnswerSheet::new(0)));
        let (tx, rx) = crossbeam_channel::unbounded();
        let aggregator = Aggregator::new(
            &builder.exam_id,
            builder.duration_secs,
            clock.now_ms(),
            builder.config.policy.clone(),
        );

        tracing::info!(
            "Session {} created: {}s, {} rules",
            builder.exam_id,
            builder.duration_secs,
            builder.config.policy.rules.len()
        );

        Self {
            inner: Arc::new(SessionInner {
                exam_id: builder.exam_id,
                config: builder.config,
                tx,
                rx,
                aggregator: Mutex::new(aggregator),
                listeners: Mutex::new(Listeners::default()),
                result: Mutex::new(None),
                draining: AtomicBool::new(false),
                destroyed: AtomicBool::new(false),
                answers,
                clock,
            }),
        }
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    /// Registers a warning listener.
    pub fn on_warning(&self, listener: impl Fn(&Warning) + Send + Sync + 'static) {
        self.inner.listeners.lock().warning.push(Arc::new(listener));
    }

    /// Registers a listener for automatic termination (time expired or a
    /// violation limit). A candidate's own submission does not fire it.
    pub fn on_terminated(&self, listener: impl Fn(TerminationReason, &str) + Send + Sync + 'static) {
        self.inner.listeners.lock().terminated.push(Arc::new(listener));
    }

    /// Registers a listener for the final result.
    pub fn on_completed(&self, listener: impl Fn(&ExamResult) + Send + Sync + 'static) {
        self.inner.listeners.lock().completed.push(Arc::new(listener));
    }

    /// Registers a listener for monitor degradation.
    pub fn on_degraded(&self, listener: impl Fn(&MonitorFault) + Send + Sync + 'static) {
        self.inner.listeners.lock().degraded.push(Arc::new(listener));
    }

    /// Registers a listener for the transition out of `Active`.
    pub fn on_closing(&self, listener: impl Fn(TerminationReason) + Send + Sync + 'static) {
        self.inner.listeners.lock().closing.push(Arc::new(listener));
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Queues a signal and drains the inbox unless a drain is in progress.
    /// Signals posted after [`Self::destroy`] are dropped.
    pub fn post(&self, signal: Signal) {
        let at_ms = signal.at_ms();
        if self.try_post(signal).is_err() {
            tracing::debug!(at_ms, "signal after destroy ignored");
        }
    }

    /// Like [`Self::post`], but reports a destroyed session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Destroyed`] once the session is torn down.
    pub fn try_post(&self, signal: Signal) -> SessionResult<()> {
        if self.is_destroyed() || self.inner.tx.send(signal).is_err() {
            return Err(SessionError::Destroyed {
                exam_id: self.inner.exam_id.clone(),
            });
        }
        self.pump();
        Ok(())
    }

    /// Candidate-initiated submission.
    pub fn submit_now(&self) {
        self.post(Signal::SubmitRequested { at_ms: self.now_ms() });
    }

    /// Tears the session down: pending signals are discarded and no
    /// listener runs after this returns. Idempotent.
    pub fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        let discarded = self.inner.rx.try_iter().count();
        *self.inner.listeners.lock() = Listeners::default();
        tracing::info!(
            "Session {} destroyed ({} pending signals discarded)",
            self.inner.exam_id,
            discarded
        );
    }

    /// Writes the audit log in the binary export format.
    ///
    /// # Errors
    /// Returns [`crate::SessionError::Core`] if the writer fails.
    pub fn export_log<W: Write>(&self, writer: &mut W) -> SessionResult<()> {
        let log = self.event_log();
        log.write(writer)?;
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Exam identifier.
    #[must_use]
    pub fn exam_id(&self) -> &str {
        &self.inner.exam_id
    }

    /// Configuration the session was built with.
    #[must_use]
    pub fn config(&self) -> &ProctorConfig {
        &self.inner.config
    }

    /// Current time on the session clock.
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.inner.clock.now_ms()
    }

    /// Clock used for timestamps.
    #[must_use]
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.inner.clock)
    }

    /// Returns true once `destroy` was called.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::Acquire)
    }

    /// Lifecycle state.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.inner.aggregator.lock().status()
    }

    /// Why the session left `Active`, if it has.
    #[must_use]
    pub fn reason(&self) -> Option<TerminationReason> {
        self.inner.aggregator.lock().reason()
    }

    /// Snapshot of the warning view.
    #[must_use]
    pub fn warning_state(&self) -> WarningState {
        self.inner.aggregator.lock().warnings().clone()
    }

    /// Counted violations on one channel.
    #[must_use]
    pub fn channel_count(&self, channel: ViolationChannel) -> u32 {
        self.inner.aggregator.lock().count(channel)
    }

    /// Combined violation count.
    #[must_use]
    pub fn combined_count(&self) -> u32 {
        self.inner.aggregator.lock().combined_count()
    }

    /// Seconds left as of the last timer tick.
    #[must_use]
    pub fn time_remaining(&self) -> u32 {
        self.inner.aggregator.lock().time_remaining_secs()
    }

    /// Configured exam duration.
    #[must_use]
    pub fn duration_secs(&self) -> u32 {
        self.inner.aggregator.lock().log().duration_secs()
    }

    /// Copy of the audit log.
    #[must_use]
    pub fn event_log(&self) -> EventLog {
        self.inner.aggregator.lock().log().clone()
    }

    /// Degradations reported so far.
    #[must_use]
    pub fn faults(&self) -> Vec<MonitorFault> {
        self.inner.aggregator.lock().faults().to_vec()
    }

    /// Final result, once finalized.
    #[must_use]
    pub fn result(&self) -> Option<ExamResult> {
        self.inner.result.lock().clone()
    }

    // =========================================================================
    // Inbox
    // =========================================================================

    fn pump(&self) {
        loop {
            if self.inner.draining.swap(true, Ordering::AcqRel) {
                // The active drain picks this signal up.
                return;
            }
            while let Ok(signal) = self.inner.rx.try_recv() {
                self.process(&signal);
            }
            self.inner.draining.store(false, Ordering::Release);
            // A post may have landed between the last recv and the release.
            if self.inner.rx.is_empty() {
                return;
            }
        }
    }

    fn process(&self, signal: &Signal) {
        if self.is_destroyed() {
            return;
        }

        let (effects, result) = {
            let mut aggregator = self.inner.aggregator.lock();
            let effects = aggregator.apply(signal);
            let started = effects.iter().any(|e| matches!(e, Effect::SubmissionStarted { .. }));
            let result = if started {
                aggregator.finalize_with(self.inner.answers.as_ref())
            } else {
                None
            };
            (effects, result)
        };

        for effect in &effects {
            self.dispatch(effect);
        }

        if let Some(result) = result {
            *self.inner.result.lock() = Some(result.clone());
            let listeners = self.inner.listeners.lock().completed.clone();
            self.notify(&listeners, |listener| listener(&result));
        }
    }

    fn dispatch(&self, effect: &Effect) {
        match effect {
            Effect::Warning(warning) => {
                let listeners = self.inner.listeners.lock().warning.clone();
                self.notify(&listeners, |listener| listener(warning));
            }
            Effect::SubmissionStarted { reason, message } => {
                let closing = self.inner.listeners.lock().closing.clone();
                self.notify(&closing, |listener| listener(*reason));

                if *reason != TerminationReason::CandidateRequested {
                    let terminated = self.inner.listeners.lock().terminated.clone();
                    self.notify(&terminated, |listener| listener(*reason, message.as_str()));
                }
            }
            Effect::Degraded(fault) => {
                let listeners = self.inner.listeners.lock().degraded.clone();
                self.notify(&listeners, |listener| listener(fault));
            }
        }
    }

    /// Calls each listener unless the session is destroyed meanwhile.
    fn notify<L>(&self, listeners: &[L], call: impl Fn(&L)) {
        for listener in listeners {
            if self.is_destroyed() {
                return;
            }
            call(listener);
        }
    }
}

impl SignalSink for SessionHandle {
    fn post(&self, signal: Signal) {
        SessionHandle::post(self, signal);
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("exam_id", &self.inner.exam_id)
            .field("status", &self.status())
            .field("destroyed", &self.is_destroyed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::RwLock;
    use vigil_core::{ManualClock, MonitorEvent};

    fn session(duration_secs: u32) -> SessionHandle {
        SessionBuilder::new("exam-1", duration_secs)
            .clock(Arc::new(ManualClock::new(0)))
            .build()
            .unwrap()
    }

    fn violation(event: MonitorEvent) -> Signal {
        Signal::Monitor { event, at_ms: 0 }
    }

    #[test]
    fn test_warning_listener_sees_each_increment() {
        let session = session(600);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        session.on_warning(move |w| sink.lock().push(w.message.clone()));

        session.post(violation(MonitorEvent::TabSwitch));
        session.post(violation(MonitorEvent::TabReturn));
        session.post(violation(MonitorEvent::NoFace));

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], "Tab switch detected! 1 warning remaining.");
        assert_eq!(session.combined_count(), 2);
    }

    #[test]
    fn test_submit_completes_without_terminated() {
        let sheet = Arc::new(RwLock::new(AnswerSheet::new(4)));
        sheet.write().select("q1", 0);
        let session = SessionBuilder::new("exam-1", 600)
            .answers(sheet.clone())
            .clock(Arc::new(ManualClock::new(0)))
            .build()
            .unwrap();

        let terminated = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&terminated);
        session.on_terminated(move |_, _| flag.store(true, Ordering::SeqCst));

        session.submit_now();
        session.submit_now();

        let result = session.result().unwrap();
        assert_eq!(result.score, 25);
        assert_eq!(result.status, SessionStatus::Completed);
        assert_eq!(session.status(), SessionStatus::Completed);
        assert!(!terminated.load(Ordering::SeqCst));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = ProctorConfig::default();
        config.timer.tick_ms = 0;
        assert!(SessionBuilder::new("exam-1", 60).config(config).build().is_err());
    }

    #[test]
    fn test_destroy_silences_listeners() {
        let session = session(600);
        let calls = Arc::new(Mutex::new(0u32));
        let counter = Arc::clone(&calls);
        session.on_warning(move |_| *counter.lock() += 1);

        session.destroy();
        session.destroy();
        session.post(violation(MonitorEvent::TabSwitch));

        assert_eq!(*calls.lock(), 0);
        assert_eq!(session.combined_count(), 0);
        assert!(session.is_destroyed());
        assert!(matches!(
            session.try_post(violation(MonitorEvent::NoFace)),
            Err(SessionError::Destroyed { .. })
        ));
    }
}
