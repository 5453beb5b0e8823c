//! # Violation Channels
//!
//! A channel is one category of detectable integrity breach. Every channel
//! carries its own counter; thresholds are applied by the
//! [`Policy`](crate::policy::Policy).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of integrity breach.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum ViolationChannel {
    /// No face in the camera frame.
    FaceAbsent = 0,
    /// More than one face in the camera frame.
    MultipleFaces = 1,
    /// Candidate left the exam tab or window.
    TabSwitch = 2,
    /// Fullscreen display mode was left.
    FullscreenExit = 3,
    /// Copy/paste, devtools, context menu, selection or drag attempt.
    RestrictedInput = 4,
}

impl ViolationChannel {
    /// Number of channels.
    pub const COUNT: usize = 5;

    /// All channels in code order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::FaceAbsent,
        Self::MultipleFaces,
        Self::TabSwitch,
        Self::FullscreenExit,
        Self::RestrictedInput,
    ];

    /// Stable numeric code used by the binary export.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Inverse of [`code`](Self::code).
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::FaceAbsent),
            1 => Some(Self::MultipleFaces),
            2 => Some(Self::TabSwitch),
            3 => Some(Self::FullscreenExit),
            4 => Some(Self::RestrictedInput),
            _ => None,
        }
    }

    /// Index into per-channel arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Kebab-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FaceAbsent => "face-absent",
            Self::MultipleFaces => "multiple-faces",
            Self::TabSwitch => "tab-switch",
            Self::FullscreenExit => "fullscreen-exit",
            Self::RestrictedInput => "restricted-input",
        }
    }

    /// Candidate-facing warning text for one occurrence.
    #[must_use]
    pub const fn warning_text(self) -> &'static str {
        match self {
            Self::FaceAbsent => "Face not detected in camera! Please stay in front of the camera.",
            Self::MultipleFaces => {
                "Multiple faces detected! Only one person should be taking the exam."
            }
            Self::TabSwitch => "Tab switch detected!",
            Self::FullscreenExit => "Fullscreen exited! Please keep the exam in fullscreen mode.",
            Self::RestrictedInput => "Copy/paste operations are not allowed!",
        }
    }
}

impl fmt::Display for ViolationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input path suppressed by the lockdown monitor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RestrictedAction {
    /// Clipboard copy.
    Copy,
    /// Clipboard cut.
    Cut,
    /// Clipboard paste.
    Paste,
    /// Select-all.
    SelectAll,
    /// Print dialog.
    Print,
    /// Save page.
    Save,
    /// Developer tools or view-source.
    DevTools,
    /// Right-click context menu.
    ContextMenu,
    /// Text selection start.
    Selection,
    /// Drag start.
    Drag,
}

/// Discrete event produced by a monitor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MonitorEvent {
    /// Page hidden, window blurred or devtools shortcut.
    TabSwitch,
    /// Page visible or window focused again.
    TabReturn,
    /// Fullscreen left.
    FullscreenExit,
    /// A restricted input path was used.
    RestrictedInput(RestrictedAction),
    /// Sample contained no face.
    NoFace,
    /// Sample contained more than one face.
    MultipleFaces,
    /// Sample contained exactly one face.
    FacePresent,
}

impl MonitorEvent {
    /// Channel this event counts against, `None` for observations.
    #[must_use]
    pub const fn channel(self) -> Option<ViolationChannel> {
        match self {
            Self::TabSwitch => Some(ViolationChannel::TabSwitch),
            Self::FullscreenExit => Some(ViolationChannel::FullscreenExit),
            Self::RestrictedInput(_) => Some(ViolationChannel::RestrictedInput),
            Self::NoFace => Some(ViolationChannel::FaceAbsent),
            Self::MultipleFaces => Some(ViolationChannel::MultipleFaces),
            Self::TabReturn | Self::FacePresent => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        for channel in ViolationChannel::ALL {
            assert_eq!(ViolationChannel::from_code(channel.code()), Some(channel));
            assert_eq!(ViolationChannel::ALL[channel.index()], channel);
        }
        assert_eq!(ViolationChannel::from_code(5), None);
    }

    #[test]
    fn test_observations_have_no_channel() {
        assert_eq!(MonitorEvent::TabReturn.channel(), None);
        assert_eq!(MonitorEvent::FacePresent.channel(), None);
        assert_eq!(
            MonitorEvent::RestrictedInput(RestrictedAction::Paste).channel(),
            Some(ViolationChannel::RestrictedInput)
        );
    }

    #[test]
    fn test_display_is_kebab_case() {
        assert_eq!(ViolationChannel::MultipleFaces.to_string(), "multiple-faces");
    }
}
