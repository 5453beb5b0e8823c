//! Candidate-facing warnings and the derived warning view.

use crate::channel::ViolationChannel;
use std::collections::VecDeque;

/// Number of recent messages kept for display.
pub const RECENT_MESSAGES: usize = 3;

/// Notification for one counted violation. Emitted exactly once per
/// increment and never coalesced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Warning {
    /// Channel that was incremented.
    pub channel: ViolationChannel,
    /// Channel count after the increment.
    pub count: u32,
    /// Rule counter after the increment, if the channel is rule-limited.
    pub rule_count: Option<u32>,
    /// Increments left before the rule's limit, if rule-limited.
    pub remaining: Option<u32>,
    /// Display text.
    pub message: String,
}

impl Warning {
    /// Builds the warning text for a channel and the increments left.
    #[must_use]
    pub fn compose(channel: ViolationChannel, remaining: Option<u32>) -> String {
        let base = channel.warning_text();
        match remaining {
            Some(1) => format!("{base} 1 warning remaining."),
            Some(n) if n > 1 => format!("{base} {n} warnings remaining."),
            _ => base.to_owned(),
        }
    }
}

/// Derived view shown next to the exam.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WarningState {
    /// Sum of contributing channel counts.
    pub combined_count: u32,
    /// Most recent messages, oldest first.
    pub last_messages: VecDeque<String>,
    /// True once submission has been decided.
    pub is_terminating: bool,
    /// False between a tab switch and the matching return.
    pub focused: bool,
    /// Face count of the last presence sample, if any.
    pub last_face_count: Option<u8>,
}

impl WarningState {
    /// Creates the initial view.
    #[must_use]
    pub fn new() -> Self {
        Self {
            focused: true,
            last_messages: VecDeque::with_capacity(RECENT_MESSAGES),
            ..Self::default()
        }
    }

    /// Pushes a message, evicting the oldest beyond capacity.
    pub fn push_message(&mut self, message: String) {
        if self.last_messages.len() == RECENT_MESSAGES {
            self.last_messages.pop_front();
        }
        self.last_messages.push_back(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_text() {
        assert_eq!(
            Warning::compose(ViolationChannel::TabSwitch, Some(1)),
            "Tab switch detected! 1 warning remaining."
        );
        assert_eq!(
            Warning::compose(ViolationChannel::FaceAbsent, Some(3)),
            "Face not detected in camera! Please stay in front of the camera. 3 warnings remaining."
        );
        assert_eq!(
            Warning::compose(ViolationChannel::TabSwitch, Some(0)),
            "Tab switch detected!"
        );
        assert_eq!(
            Warning::compose(ViolationChannel::RestrictedInput, None),
            "Copy/paste operations are not allowed!"
        );
    }

    #[test]
    fn test_ring_buffer_keeps_last_three() {
        let mut state = WarningState::new();
        for i in 0..5 {
            state.push_message(format!("m{i}"));
        }
        assert_eq!(state.last_messages, ["m2", "m3", "m4"]);
    }
}
