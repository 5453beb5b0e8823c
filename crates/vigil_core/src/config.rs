//! # Proctor Configuration
//!
//! Loaded once when the exam screen mounts. Every section is optional in
//! the TOML document; missing sections fall back to the reference
//! behavior.
//!
//! ```toml
//! [policy]
//! contributing = ["face-absent", "multiple-faces", "tab-switch"]
//!
//! [[policy.rules]]
//! name = "presence"
//! channels = ["face-absent", "multiple-faces"]
//! limit = 5
//! reason = "too many violations"
//!
//! [visibility]
//! dedup_window_ms = 250
//! ```

use crate::error::{CoreError, CoreResult};
use crate::policy::Policy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete configuration of a proctored session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProctorConfig {
    /// Termination thresholds.
    pub policy: Policy,
    /// Visibility monitor settings.
    pub visibility: VisibilitySettings,
    /// Lockdown monitor settings.
    pub lockdown: LockdownSettings,
    /// Presence monitor settings.
    pub presence: PresenceSettings,
    /// Exam timer settings.
    pub timer: TimerSettings,
}

impl ProctorConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(source: &str) -> CoreResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| CoreError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> CoreResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Validates the policy and periods.
    pub fn validate(&self) -> CoreResult<()> {
        self.policy.validate()?;
        if self.presence.sample_period_ms == 0 {
            return Err(CoreError::InvalidConfig("presence.sample_period_ms must be > 0".into()));
        }
        if self.timer.tick_ms == 0 {
            return Err(CoreError::InvalidConfig("timer.tick_ms must be > 0".into()));
        }
        Ok(())
    }
}

/// Visibility monitor settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilitySettings {
    /// Away signals closer than this to the previous counted switch are
    /// dropped. Zero keeps both the blur and the visibility signal.
    pub dedup_window_ms: u64,
    /// Count a context-menu attempt as a switch.
    pub context_menu_counts_as_switch: bool,
}

impl Default for VisibilitySettings {
    fn default() -> Self {
        Self {
            dedup_window_ms: 0,
            context_menu_counts_as_switch: true,
        }
    }
}

/// Lockdown monitor settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockdownSettings {
    /// Request fullscreen on start and count exits.
    pub enforce_fullscreen: bool,
    /// Treat the Meta (Cmd) modifier like Ctrl.
    pub meta_as_ctrl: bool,
}

impl Default for LockdownSettings {
    fn default() -> Self {
        Self {
            enforce_fullscreen: true,
            meta_as_ctrl: true,
        }
    }
}

/// Camera facing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Facing {
    /// Front camera.
    User,
    /// Rear camera.
    Environment,
}

/// Requested capture stream shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConstraints {
    /// Preferred width.
    pub ideal_width: u32,
    /// Preferred height.
    pub ideal_height: u32,
    /// Smallest acceptable width.
    pub min_width: u32,
    /// Smallest acceptable height.
    pub min_height: u32,
    /// Camera facing.
    pub facing: Facing,
    /// Preferred frame rate.
    pub ideal_frame_rate: u32,
    /// Smallest acceptable frame rate.
    pub min_frame_rate: u32,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            ideal_width: 640,
            ideal_height: 480,
            min_width: 480,
            min_height: 360,
            facing: Facing::User,
            ideal_frame_rate: 30,
            min_frame_rate: 15,
        }
    }
}

/// Presence monitor settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceSettings {
    /// Sampling period.
    pub sample_period_ms: u64,
    /// Capture stream constraints.
    pub capture: CaptureConstraints,
}

impl Default for PresenceSettings {
    fn default() -> Self {
        Self {
            sample_period_ms: 1000,
            capture: CaptureConstraints::default(),
        }
    }
}

/// Exam timer settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerSettings {
    /// Wall-clock length of one countdown second. Only shortened in demos.
    pub tick_ms: u64,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self { tick_ms: 1000 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ViolationChannel;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = ProctorConfig::from_toml_str("").unwrap();
        assert_eq!(config, ProctorConfig::default());
        assert_eq!(config.presence.sample_period_ms, 1000);
        assert_eq!(config.presence.capture.min_frame_rate, 15);
    }

    #[test]
    fn test_partial_document() {
        let config = ProctorConfig::from_toml_str(
            r#"
            [policy]
            contributing = ["tab-switch"]

            [[policy.rules]]
            name = "focus"
            channels = ["tab-switch"]
            limit = 3
            reason = "too many tab switches"

            [visibility]
            dedup_window_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.policy.rules.len(), 1);
        assert_eq!(config.policy.limit_for(ViolationChannel::TabSwitch), Some(3));
        assert_eq!(config.policy.limit_for(ViolationChannel::FaceAbsent), None);
        assert!(!config.policy.contributes(ViolationChannel::FaceAbsent));
        assert_eq!(config.visibility.dedup_window_ms, 250);
        assert!(config.visibility.context_menu_counts_as_switch);
        assert!(config.lockdown.enforce_fullscreen);
    }

    #[test]
    fn test_invalid_documents_rejected() {
        assert!(matches!(
            ProctorConfig::from_toml_str("[presence]\nsample_period_ms = 0"),
            Err(CoreError::InvalidConfig(_))
        ));
        assert!(matches!(
            ProctorConfig::from_toml_str("[policy]\ncontributing = [\"nope\"]"),
            Err(CoreError::InvalidConfig(_))
        ));
    }
}
