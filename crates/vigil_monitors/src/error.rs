//! # Monitor Error Types
//!
//! None of these end a session. A failed camera leaves the session without
//! presence monitoring, a refused fullscreen leaves lockdown in windowed
//! mode, and a refused interceptor still lets every attempt be counted.

use thiserror::Error;

/// Camera stream could not be acquired.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceAcquisitionError {
    /// The user or policy denied camera access.
    #[error("camera permission denied; allow camera access and reload the exam")]
    PermissionDenied,
    /// No camera is connected.
    #[error("no camera found; connect a camera device")]
    NoDevice,
    /// Another application holds the camera.
    #[error("camera is already in use by another application")]
    DeviceBusy,
    /// The platform has no capture API.
    #[error("camera capture is not supported on this platform")]
    Unsupported,
}

impl DeviceAcquisitionError {
    /// Maps a platform error name (`NotAllowedError`, `NotFoundError`, ...)
    /// to a reason.
    #[must_use]
    pub fn classify(platform_name: &str) -> Self {
        match platform_name {
            "NotAllowedError" | "PermissionDeniedError" | "SecurityError" => Self::PermissionDenied,
            "NotFoundError" | "DevicesNotFoundError" | "OverconstrainedError" => Self::NoDevice,
            "NotReadableError" | "TrackStartError" | "AbortError" => Self::DeviceBusy,
            _ => Self::Unsupported,
        }
    }
}

/// Fullscreen display mode could not be entered or left.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FullscreenRequestError {
    /// The platform refused the request.
    #[error("fullscreen request denied: {0}")]
    Denied(String),
    /// The platform has no fullscreen API.
    #[error("fullscreen is not supported on this platform")]
    Unsupported,
}

/// The platform refused to suppress an input path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InterceptionFailure {
    /// Installing the interceptor for `path` was refused.
    #[error("interceptor for {path} refused: {detail}")]
    Refused {
        /// Input path (`keydown`, `contextmenu`, ...).
        path: String,
        /// Platform detail.
        detail: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_platform_names() {
        assert_eq!(
            DeviceAcquisitionError::classify("NotAllowedError"),
            DeviceAcquisitionError::PermissionDenied
        );
        assert_eq!(
            DeviceAcquisitionError::classify("NotFoundError"),
            DeviceAcquisitionError::NoDevice
        );
        assert_eq!(
            DeviceAcquisitionError::classify("NotReadableError"),
            DeviceAcquisitionError::DeviceBusy
        );
        assert_eq!(
            DeviceAcquisitionError::classify("TypeError"),
            DeviceAcquisitionError::Unsupported
        );
    }
}
