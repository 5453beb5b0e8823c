//! # Threshold Policy
//!
//! A rule groups one or more channels under a single limit. The rule's
//! counter is the sum of its channels' counts; reaching the limit ends the
//! exam. Channels outside every rule are log-only.

use crate::channel::ViolationChannel;
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// One termination threshold.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdRule {
    /// Short identifier (`presence`, `focus`).
    pub name: String,
    /// Channels summed into this rule's counter.
    pub channels: Vec<ViolationChannel>,
    /// Counter value that triggers submission.
    pub limit: u32,
    /// Reason shown to the candidate when the limit is hit.
    pub reason: String,
}

impl ThresholdRule {
    /// Creates a rule.
    #[must_use]
    pub fn new(name: &str, channels: &[ViolationChannel], limit: u32, reason: &str) -> Self {
        Self {
            name: name.to_owned(),
            channels: channels.to_vec(),
            limit,
            reason: reason.to_owned(),
        }
    }

    /// Returns true if the channel feeds this rule.
    #[must_use]
    pub fn covers(&self, channel: ViolationChannel) -> bool {
        self.channels.contains(&channel)
    }
}

/// Termination policy for a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    /// Threshold rules; a channel may appear in at most one.
    pub rules: Vec<ThresholdRule>,
    /// Channels summed into the combined risk score.
    pub contributing: Vec<ViolationChannel>,
}

impl Policy {
    /// Presence rule limit.
    pub const PRESENCE_LIMIT: u32 = 5;
    /// Focus rule limit (tab switches and fullscreen exits).
    pub const FOCUS_LIMIT: u32 = 2;

    /// Validates rule shape and channel ownership.
    pub fn validate(&self) -> CoreResult<()> {
        let mut owner: [Option<&str>; ViolationChannel::COUNT] = [None; ViolationChannel::COUNT];
        for rule in &self.rules {
            if rule.channels.is_empty() {
                return Err(CoreError::EmptyRule(rule.name.clone()));
            }
            if rule.limit == 0 {
                return Err(CoreError::ZeroLimit(rule.name.clone()));
            }
            for &channel in &rule.channels {
                match owner[channel.index()] {
                    Some(first) if first != rule.name => {
                        return Err(CoreError::OverlappingRules {
                            channel,
                            first: first.to_owned(),
                            second: rule.name.clone(),
                        });
                    }
                    _ => owner[channel.index()] = Some(rule.name.as_str()),
                }
            }
        }
        Ok(())
    }

    /// Index of the rule covering a channel.
    #[must_use]
    pub fn rule_index(&self, channel: ViolationChannel) -> Option<usize> {
        self.rules.iter().position(|r| r.covers(channel))
    }

    /// Rule covering a channel.
    #[must_use]
    pub fn rule_for(&self, channel: ViolationChannel) -> Option<&ThresholdRule> {
        self.rules.iter().find(|r| r.covers(channel))
    }

    /// Effective limit of a channel; `None` means log only.
    #[must_use]
    pub fn limit_for(&self, channel: ViolationChannel) -> Option<u32> {
        self.rule_for(channel).map(|r| r.limit)
    }

    /// Returns true if the channel counts toward the combined score.
    #[must_use]
    pub fn contributes(&self, channel: ViolationChannel) -> bool {
        self.contributing.contains(&channel)
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            rules: vec![
                ThresholdRule::new(
                    "presence",
                    &[ViolationChannel::FaceAbsent, ViolationChannel::MultipleFaces],
                    Self::PRESENCE_LIMIT,
                    "too many violations",
                ),
                ThresholdRule::new(
                    "focus",
                    &[ViolationChannel::TabSwitch, ViolationChannel::FullscreenExit],
                    Self::FOCUS_LIMIT,
                    "too many tab switches",
                ),
            ],
            contributing: ViolationChannel::ALL.to_vec(),
        }
    }
}
