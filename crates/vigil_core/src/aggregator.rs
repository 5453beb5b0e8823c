//! # Violation Aggregator
//!
//! The session's single decision point. Every monitor, the timer and the
//! host feed [`Signal`]s in; the aggregator counts, logs, warns and decides
//! when the exam ends.
//!
//! ## States
//!
//! - **Active**: violations are counted against their rules.
//! - **Submitting**: a limit was hit, time ran out or the candidate
//!   submitted. Later violations are still logged for audit, never counted.
//! - **Completed / Terminated**: `finalize` computed the result.
//!
//! ## Determinism
//!
//! `apply` touches no platform API and no clock. Feeding the same signals
//! in the same order always yields the same effects, which is what makes
//! [`replay`] reproduce a session from its exported log.

use crate::answers::{score_percent, AnswerStore};
use crate::channel::{MonitorEvent, ViolationChannel};
use crate::log::{EntryKind, EventLog, LogEntry};
use crate::policy::Policy;
use crate::signal::{MonitorFault, Signal};
use crate::status::{SessionStatus, TerminationReason};
use crate::warning::{Warning, WarningState};

/// Output of one `apply` step, to be delivered to the host in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// A counted violation.
    Warning(Warning),
    /// `Active -> Submitting`.
    SubmissionStarted {
        /// Why.
        reason: TerminationReason,
        /// Candidate-facing explanation.
        message: String,
    },
    /// A monitor degraded; the session continues without it.
    Degraded(MonitorFault),
}

/// Final record of an exam attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExamResult {
    /// Exam identifier.
    pub exam_id: String,
    /// Percentage of questions answered, rounded.
    pub score: u32,
    /// Combined violation count.
    pub violation_count: u32,
    /// Why the exam ended.
    pub reason: TerminationReason,
    /// `Completed` or `Terminated`.
    pub status: SessionStatus,
}

/// Per-session violation state machine.
#[derive(Clone, Debug)]
pub struct Aggregator {
    /// Exam identifier.
    exam_id: String,
    /// Termination thresholds.
    policy: Policy,
    /// Lifecycle state.
    status: SessionStatus,
    /// Set on the first transition out of `Active`.
    reason: Option<TerminationReason>,
    /// Per-channel counts, indexed by channel code.
    counts: [u32; ViolationChannel::COUNT],
    /// Per-rule counters, parallel to `policy.rules`.
    rule_counts: Vec<u32>,
    /// Seconds left on the exam clock.
    time_remaining_secs: u32,
    /// Audit trail.
    log: EventLog,
    /// Derived view.
    warnings: WarningState,
    /// Degradations reported so far.
    faults: Vec<MonitorFault>,
    /// Violations logged after the session closed.
    late_violations: u32,
}

impl Aggregator {
    /// Creates an active session.
    #[must_use]
    pub fn new(exam_id: &str, duration_secs: u32, start_ms: u64, policy: Policy) -> Self {
        let rule_counts = vec![0; policy.rules.len()];
        Self {
            exam_id: exam_id.to_owned(),
            policy,
            status: SessionStatus::Active,
            reason: None,
            counts: [0; ViolationChannel::COUNT],
            rule_counts,
            time_remaining_secs: duration_secs,
            log: EventLog::new(duration_secs, start_ms),
            warnings: WarningState::new(),
            faults: Vec::new(),
            late_violations: 0,
        }
    }

    /// Applies one signal and returns the effects it produced.
    pub fn apply(&mut self, signal: &Signal) -> Vec<Effect> {
        let mut effects = Vec::new();
        match signal {
            Signal::Monitor { event, at_ms } => match event.channel() {
                Some(channel) => {
                    self.observe(*event);
                    self.record_violation(channel, *at_ms, &mut effects);
                }
                None => self.observe(*event),
            },
            Signal::TimerTick { remaining_secs, at_ms } => {
                if self.status.is_closed() {
                    return effects;
                }
                self.time_remaining_secs = (*remaining_secs).min(self.time_remaining_secs);
                if self.time_remaining_secs == 0 {
                    self.begin_submission(TerminationReason::TimeExpired, *at_ms, &mut effects);
                }
            }
            Signal::SubmitRequested { at_ms } => {
                self.begin_submission(TerminationReason::CandidateRequested, *at_ms, &mut effects);
            }
            Signal::Fault { fault, .. } => {
                tracing::warn!("Exam {} degraded: {}", self.exam_id, fault);
                self.faults.push(fault.clone());
                effects.push(Effect::Degraded(fault.clone()));
            }
        }
        effects
    }

    /// Updates the focus/presence flags of the warning view.
    fn observe(&mut self, event: MonitorEvent) {
        match event {
            MonitorEvent::TabSwitch => self.warnings.focused = false,
            MonitorEvent::TabReturn => self.warnings.focused = true,
            MonitorEvent::NoFace => self.warnings.last_face_count = Some(0),
            MonitorEvent::FacePresent => self.warnings.last_face_count = Some(1),
            MonitorEvent::MultipleFaces => self.warnings.last_face_count = Some(2),
            MonitorEvent::FullscreenExit | MonitorEvent::RestrictedInput(_) => {}
        }
    }

    /// Logs a violation and, while active, counts it.
    fn record_violation(&mut self, channel: ViolationChannel, at_ms: u64, effects: &mut Vec<Effect>) {
        self.log.append(EntryKind::Violation(channel), at_ms, self.time_remaining_secs);

        if self.status.is_closed() {
            self.late_violations += 1;
            tracing::debug!(
                "Exam {}: {} after close logged for audit ({:?})",
                self.exam_id,
                channel,
                self.status
            );
            return;
        }

        let count = &mut self.counts[channel.index()];
        *count = count.saturating_add(1);
        let count = *count;
        if self.policy.contributes(channel) {
            self.warnings.combined_count = self.warnings.combined_count.saturating_add(1);
        }

        let (rule_count, remaining, limit_hit) = match self.policy.rule_index(channel) {
            Some(idx) => {
                let limit = self.policy.rules[idx].limit;
                let rule_count = &mut self.rule_counts[idx];
                *rule_count = rule_count.saturating_add(1);
                let rule_count = *rule_count;
                (Some(rule_count), Some(limit.saturating_sub(rule_count)), rule_count >= limit)
            }
            None => (None, None, false),
        };

        let message = Warning::compose(channel, remaining);
        self.warnings.push_message(message.clone());
        effects.push(Effect::Warning(Warning {
            channel,
            count,
            rule_count,
            remaining,
            message,
        }));

        if limit_hit {
            self.begin_submission(TerminationReason::ViolationLimit(channel), at_ms, effects);
        }
    }

    /// `Active -> Submitting`. No-op once closed.
    fn begin_submission(&mut self, reason: TerminationReason, at_ms: u64, effects: &mut Vec<Effect>) {
        if self.status.is_closed() {
            return;
        }
        self.status = SessionStatus::Submitting;
        self.reason = Some(reason);
        self.warnings.is_terminating = true;
        self.log.append(EntryKind::Submission(reason), at_ms, self.time_remaining_secs);

        let message = self.termination_message(reason);
        tracing::info!(
            "Exam {} transition: Active -> Submitting ({}) with {} violations, {}s left",
            self.exam_id,
            reason,
            self.warnings.combined_count,
            self.time_remaining_secs
        );
        effects.push(Effect::SubmissionStarted { reason, message });
    }

    fn termination_message(&self, reason: TerminationReason) -> String {
        match reason {
            TerminationReason::TimeExpired => {
                "Time expired. Your exam is being submitted.".to_owned()
            }
            TerminationReason::CandidateRequested => "Your exam is being submitted.".to_owned(),
            TerminationReason::ViolationLimit(channel) => {
                let detail = self
                    .policy
                    .rule_for(channel)
                    .map_or("too many violations", |rule| rule.reason.as_str());
                format!("Exam terminated: {detail} detected. Your exam will be auto-submitted.")
            }
        }
    }

    /// `Submitting -> Completed | Terminated`. Returns `None` unless the
    /// session is currently submitting, so the result is produced once.
    pub fn finalize(&mut self, answered: usize, total: usize) -> Option<ExamResult> {
        if self.status != SessionStatus::Submitting {
            return None;
        }
        let reason = self.reason?;
        self.status = reason.final_status();

        let result = ExamResult {
            exam_id: self.exam_id.clone(),
            score: score_percent(answered, total),
            violation_count: self.warnings.combined_count,
            reason,
            status: self.status,
        };
        tracing::info!(
            "Exam {} finalized: {:?}, score {} with {} violations",
            self.exam_id,
            result.status,
            result.score,
            result.violation_count
        );
        Some(result)
    }

    /// `Submitting -> Completed | Terminated` without producing a result.
    fn settle(&mut self) {
        if self.status != SessionStatus::Submitting {
            return;
        }
        if let Some(reason) = self.reason {
            self.status = reason.final_status();
        }
    }

    /// Finalizes from an answer store.
    pub fn finalize_with(&mut self, answers: &dyn AnswerStore) -> Option<ExamResult> {
        self.finalize(answers.answer_count(), answers.total_questions())
    }

    /// Exam identifier.
    #[must_use]
    pub fn exam_id(&self) -> &str {
        &self.exam_id
    }

    /// Lifecycle state.
    #[must_use]
    pub const fn status(&self) -> SessionStatus {
        self.status
    }

    /// Why the session left `Active`.
    #[must_use]
    pub const fn reason(&self) -> Option<TerminationReason> {
        self.reason
    }

    /// Count of one channel.
    #[must_use]
    pub const fn count(&self, channel: ViolationChannel) -> u32 {
        self.counts[channel.index()]
    }

    /// Counter of a named rule.
    #[must_use]
    pub fn rule_count(&self, name: &str) -> Option<u32> {
        self.policy
            .rules
            .iter()
            .position(|r| r.name == name)
            .map(|idx| self.rule_counts[idx])
    }

    /// Combined risk score.
    #[must_use]
    pub const fn combined_count(&self) -> u32 {
        self.warnings.combined_count
    }

    /// Seconds left on the exam clock.
    #[must_use]
    pub const fn time_remaining_secs(&self) -> u32 {
        self.time_remaining_secs
    }

    /// Audit trail.
    #[must_use]
    pub const fn log(&self) -> &EventLog {
        &self.log
    }

    /// Derived warning view.
    #[must_use]
    pub const fn warnings(&self) -> &WarningState {
        &self.warnings
    }

    /// Degradations reported so far.
    #[must_use]
    pub fn faults(&self) -> &[MonitorFault] {
        &self.faults
    }

    /// Violations logged after the session closed.
    #[must_use]
    pub const fn late_violations(&self) -> u32 {
        self.late_violations
    }

    /// Active policy.
    #[must_use]
    pub const fn policy(&self) -> &Policy {
        &self.policy
    }
}

/// Rebuilds a session from an exported log.
///
/// Violations are re-applied in order; time-expired and candidate
/// submissions are re-issued as the signals that caused them. Limit
/// submissions are not replayed: the triggering violation re-derives them.
/// A logged submission settles the final status, since a live session is
/// finalized right after submitting.
#[must_use]
pub fn replay(exam_id: &str, log: &EventLog, policy: Policy) -> Aggregator {
    let mut aggregator = Aggregator::new(exam_id, log.duration_secs(), log.start_ms(), policy);
    for entry in log.entries() {
        replay_entry(&mut aggregator, entry);
    }
    aggregator
}

fn replay_entry(aggregator: &mut Aggregator, entry: &LogEntry) {
    aggregator.time_remaining_secs = entry.session_time_remaining_seconds;
    let at_ms = entry.timestamp_ms;
    let mut effects = Vec::new();
    match entry.kind {
        EntryKind::Violation(channel) => aggregator.record_violation(channel, at_ms, &mut effects),
        EntryKind::Submission(TerminationReason::TimeExpired) => {
            aggregator.begin_submission(TerminationReason::TimeExpired, at_ms, &mut effects);
        }
        EntryKind::Submission(TerminationReason::CandidateRequested) => {
            aggregator.begin_submission(TerminationReason::CandidateRequested, at_ms, &mut effects);
        }
        EntryKind::Submission(TerminationReason::ViolationLimit(_)) => {}
    }
    if let EntryKind::Submission(_) = entry.kind {
        aggregator.settle();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::RestrictedAction;

    fn monitor(event: MonitorEvent, at_ms: u64) -> Signal {
        Signal::Monitor { event, at_ms }
    }

    fn active() -> Aggregator {
        Aggregator::new("exam-1", 600, 0, Policy::default())
    }

    #[test]
    fn test_presence_limit() {
        let mut agg = active();
        for i in 0..4 {
            let effects = agg.apply(&monitor(MonitorEvent::NoFace, i));
            assert_eq!(effects.len(), 1);
        }
        assert_eq!(agg.status(), SessionStatus::Active);

        let effects = agg.apply(&monitor(MonitorEvent::NoFace, 5));
        assert_eq!(agg.status(), SessionStatus::Submitting);
        assert_eq!(
            agg.reason(),
            Some(TerminationReason::ViolationLimit(ViolationChannel::FaceAbsent))
        );
        match &effects[1] {
            Effect::SubmissionStarted { message, .. } => {
                assert!(message.contains("too many violations"));
            }
            other => panic!("unexpected effect {other:?}"),
        }
        assert_eq!(agg.count(ViolationChannel::FaceAbsent), 5);
    }

    #[test]
    fn test_presence_channels_share_rule() {
        let mut agg = active();
        for i in 0..3 {
            agg.apply(&monitor(MonitorEvent::NoFace, i));
        }
        agg.apply(&monitor(MonitorEvent::MultipleFaces, 10));
        assert_eq!(agg.rule_count("presence"), Some(4));
        agg.apply(&monitor(MonitorEvent::MultipleFaces, 11));
        assert_eq!(agg.status(), SessionStatus::Submitting);
        assert_eq!(agg.count(ViolationChannel::MultipleFaces), 2);
    }

    #[test]
    fn test_first_tab_switch_warns_with_remaining() {
        let mut agg = active();
        let effects = agg.apply(&monitor(MonitorEvent::TabSwitch, 1));
        match &effects[..] {
            [Effect::Warning(w)] => {
                assert_eq!(w.remaining, Some(1));
                assert!(w.message.contains("1 warning remaining"));
            }
            other => panic!("unexpected effects {other:?}"),
        }
        assert!(!agg.warnings().focused);

        let effects = agg.apply(&monitor(MonitorEvent::TabSwitch, 2));
        assert_eq!(agg.status(), SessionStatus::Submitting);
        assert!(matches!(
            effects.last(),
            Some(Effect::SubmissionStarted { message, .. }) if message.contains("tab switches")
        ));
    }

    #[test]
    fn test_restricted_input_is_log_only() {
        let mut agg = active();
        for i in 0..50 {
            agg.apply(&monitor(MonitorEvent::RestrictedInput(RestrictedAction::Copy), i));
        }
        assert_eq!(agg.status(), SessionStatus::Active);
        assert_eq!(agg.count(ViolationChannel::RestrictedInput), 50);
        assert_eq!(agg.combined_count(), 50);
        assert_eq!(agg.warnings().last_messages.len(), 3);
    }

    #[test]
    fn test_closed_session_logs_but_never_counts() {
        let mut agg = active();
        agg.apply(&Signal::SubmitRequested { at_ms: 1 });
        let log_len = agg.log().len();

        let effects = agg.apply(&monitor(MonitorEvent::TabSwitch, 2));
        assert!(effects.is_empty());
        agg.apply(&monitor(MonitorEvent::TabSwitch, 3));
        agg.apply(&Signal::TimerTick { remaining_secs: 0, at_ms: 4 });
        agg.apply(&Signal::SubmitRequested { at_ms: 5 });

        assert_eq!(agg.status(), SessionStatus::Submitting);
        assert_eq!(agg.reason(), Some(TerminationReason::CandidateRequested));
        assert_eq!(agg.count(ViolationChannel::TabSwitch), 0);
        assert_eq!(agg.log().len(), log_len + 2);
        assert_eq!(agg.late_violations(), 2);
    }

    #[test]
    fn test_timer_expiry_and_finalize() {
        let mut agg = Aggregator::new("exam-2", 3, 0, Policy::default());
        agg.apply(&monitor(MonitorEvent::RestrictedInput(RestrictedAction::Paste), 1));
        agg.apply(&Signal::TimerTick { remaining_secs: 2, at_ms: 1_000 });
        agg.apply(&Signal::TimerTick { remaining_secs: 1, at_ms: 2_000 });
        assert_eq!(agg.status(), SessionStatus::Active);

        let effects = agg.apply(&Signal::TimerTick { remaining_secs: 0, at_ms: 3_000 });
        assert!(matches!(
            effects[..],
            [Effect::SubmissionStarted { reason: TerminationReason::TimeExpired, .. }]
        ));
        let last = agg.log().entries().last().unwrap();
        assert_eq!(last.kind, EntryKind::Submission(TerminationReason::TimeExpired));
        assert_eq!(last.session_time_remaining_seconds, 0);

        let result = agg.finalize(3, 4).unwrap();
        assert_eq!(result.score, 75);
        assert_eq!(result.violation_count, 1);
        assert_eq!(result.status, SessionStatus::Completed);
        assert_eq!(agg.status(), SessionStatus::Completed);
        assert!(agg.finalize(3, 4).is_none());
    }

    #[test]
    fn test_violation_limit_finalizes_terminated() {
        let mut agg = active();
        assert!(agg.finalize(1, 1).is_none());
        agg.apply(&monitor(MonitorEvent::FullscreenExit, 1));
        agg.apply(&monitor(MonitorEvent::TabSwitch, 2));
        let result = agg.finalize(0, 10).unwrap();
        assert_eq!(result.status, SessionStatus::Terminated);
        assert_eq!(result.score, 0);
        assert_eq!(result.violation_count, 2);
    }

    #[test]
    fn test_faults_do_not_transition() {
        let mut agg = active();
        let effects = agg.apply(&Signal::Fault {
            fault: MonitorFault::CaptureUnavailable("no camera".into()),
            at_ms: 1,
        });
        assert!(matches!(effects[..], [Effect::Degraded(_)]));
        assert_eq!(agg.status(), SessionStatus::Active);
        assert_eq!(agg.faults().len(), 1);
        assert!(agg.log().is_empty());
    }

    #[test]
    fn test_replay_reproduces_log() {
        let mut agg = active();
        agg.apply(&monitor(MonitorEvent::NoFace, 10));
        agg.apply(&Signal::TimerTick { remaining_secs: 590, at_ms: 20 });
        agg.apply(&monitor(MonitorEvent::TabSwitch, 30));
        agg.apply(&monitor(MonitorEvent::FacePresent, 35));
        agg.apply(&monitor(MonitorEvent::FullscreenExit, 40));
        agg.apply(&monitor(MonitorEvent::NoFace, 50));
        agg.finalize(0, 10).unwrap();

        let replayed = replay("exam-1", agg.log(), Policy::default());
        assert_eq!(replayed.status(), SessionStatus::Terminated);
        assert_eq!(replayed.status(), agg.status());
        assert_eq!(replayed.combined_count(), agg.combined_count());
        assert_eq!(replayed.reason(), agg.reason());
        assert_eq!(replayed.log(), agg.log());
    }

    #[test]
    fn test_replay_settles_submission_status() {
        let mut agg = active();
        agg.apply(&monitor(MonitorEvent::NoFace, 10));
        agg.apply(&Signal::SubmitRequested { at_ms: 20 });
        agg.finalize(1, 2).unwrap();

        let replayed = replay("exam-1", agg.log(), Policy::default());
        assert_eq!(replayed.status(), SessionStatus::Completed);
        assert_eq!(replayed.reason(), Some(TerminationReason::CandidateRequested));

        // Nothing logged a submission: the replay stays active.
        let mut open = active();
        open.apply(&monitor(MonitorEvent::TabSwitch, 5));
        assert_eq!(replay("exam-1", open.log(), Policy::default()).status(), SessionStatus::Active);
    }
}
