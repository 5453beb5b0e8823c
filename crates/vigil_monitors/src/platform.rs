//! # Platform Traits
//!
//! Everything a monitor needs from the host environment, behind traits.
//!
//! ## Architecture (Glass Walls)
//!
//! Monitors never call a platform API directly. The embedding host
//! implements these traits; tests use the in-memory versions in
//! `simulation`.
//!
//! ```text
//! Monitors define:        Host implements:
//! ┌────────────────┐      ┌────────────────┐
//! │ trait Display  │ ←─── │ impl Display   │
//! └────────────────┘      └────────────────┘
//! ```

use crate::error::{DeviceAcquisitionError, FullscreenRequestError, InterceptionFailure};
use vigil_core::CaptureConstraints;

// ============================================================================
// DISPLAY
// ============================================================================

/// Fullscreen control for the exam surface.
pub trait DisplayControl: Send + Sync {
    /// Requests fullscreen mode.
    ///
    /// # Errors
    /// Returns [`FullscreenRequestError`] if the platform refuses.
    fn request_fullscreen(&self) -> Result<(), FullscreenRequestError>;

    /// Leaves fullscreen mode.
    ///
    /// # Errors
    /// Returns [`FullscreenRequestError`] if the platform refuses.
    fn exit_fullscreen(&self) -> Result<(), FullscreenRequestError>;

    /// Returns true while fullscreen.
    fn is_fullscreen(&self) -> bool;
}

// ============================================================================
// INPUT
// ============================================================================

/// Suppression of clipboard, context-menu, selection and drag input paths.
///
/// While installed, the platform routes those events to the lockdown
/// monitor and honours its `Suppress` disposition.
pub trait InputInterceptor: Send + Sync {
    /// Installs interception on every restricted path.
    ///
    /// # Errors
    /// Returns [`InterceptionFailure`] naming the refused path.
    fn install(&self) -> Result<(), InterceptionFailure>;

    /// Removes every installed interception.
    fn remove(&self);

    /// Enables or disables text selection on the exam surface.
    fn set_selection_enabled(&self, enabled: bool);
}

// ============================================================================
// CAMERA
// ============================================================================

/// One captured video frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Monotonic frame number within the stream.
    pub sequence: u64,
    /// Raw pixel bytes; layout is up to the classifier.
    pub pixels: Vec<u8>,
}

/// A live capture stream. Exclusive; must be released.
pub trait CaptureStream: Send {
    /// Grabs the latest frame, or `None` if no frame is ready.
    fn grab_frame(&mut self) -> Option<Frame>;

    /// Stops the stream and frees the device. Idempotent.
    fn release(&mut self);
}

/// Source of capture streams.
pub trait CaptureDevice: Send + Sync {
    /// Opens a stream matching `constraints`.
    ///
    /// # Errors
    /// Returns [`DeviceAcquisitionError`] if the device cannot be opened.
    fn acquire(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<Box<dyn CaptureStream>, DeviceAcquisitionError>;
}
