//! In-memory platform for tests and demos.
//!
//! Each type records what the monitors did to it so tests can assert that
//! interception was reverted and the camera released.

use crate::error::{DeviceAcquisitionError, FullscreenRequestError, InterceptionFailure};
use crate::platform::{CaptureDevice, CaptureStream, DisplayControl, Frame, InputInterceptor};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use vigil_core::CaptureConstraints;

/// Display that grants or refuses fullscreen.
#[derive(Debug, Default)]
pub struct SimulatedDisplay {
    fullscreen: AtomicBool,
    refuse: bool,
}

impl SimulatedDisplay {
    /// Display that grants fullscreen.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Display that refuses every fullscreen request.
    #[must_use]
    pub fn refusing() -> Self {
        Self { fullscreen: AtomicBool::new(false), refuse: true }
    }

    /// Simulates the user leaving fullscreen outside the monitor's control.
    pub fn user_exit(&self) {
        self.fullscreen.store(false, Ordering::Release);
    }
}

impl DisplayControl for SimulatedDisplay {
    fn request_fullscreen(&self) -> Result<(), FullscreenRequestError> {
        if self.refuse {
            return Err(FullscreenRequestError::Denied("blocked by simulation".into()));
        }
        self.fullscreen.store(true, Ordering::Release);
        Ok(())
    }

    fn exit_fullscreen(&self) -> Result<(), FullscreenRequestError> {
        self.fullscreen.store(false, Ordering::Release);
        Ok(())
    }

    fn is_fullscreen(&self) -> bool {
        self.fullscreen.load(Ordering::Acquire)
    }
}

/// Interceptor that tracks installation and selection state.
#[derive(Debug)]
pub struct SimulatedInterceptor {
    installed: AtomicBool,
    selection_enabled: AtomicBool,
    installs: AtomicU32,
    refuse: bool,
}

impl Default for SimulatedInterceptor {
    fn default() -> Self {
        Self {
            installed: AtomicBool::new(false),
            selection_enabled: AtomicBool::new(true),
            installs: AtomicU32::new(0),
            refuse: false,
        }
    }
}

impl SimulatedInterceptor {
    /// Interceptor that installs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interceptor whose installation is refused.
    #[must_use]
    pub fn refusing() -> Self {
        Self { refuse: true, ..Self::default() }
    }

    /// Returns true while installed.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.installed.load(Ordering::Acquire)
    }

    /// Returns true if text selection is enabled.
    #[must_use]
    pub fn selection_enabled(&self) -> bool {
        self.selection_enabled.load(Ordering::Acquire)
    }

    /// Number of successful installs.
    #[must_use]
    pub fn install_count(&self) -> u32 {
        self.installs.load(Ordering::Acquire)
    }
}

impl InputInterceptor for SimulatedInterceptor {
    fn install(&self) -> Result<(), InterceptionFailure> {
        if self.refuse {
            return Err(InterceptionFailure::Refused {
                path: "keydown".into(),
                detail: "blocked by simulation".into(),
            });
        }
        self.installed.store(true, Ordering::Release);
        self.installs.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn remove(&self) {
        self.installed.store(false, Ordering::Release);
    }

    fn set_selection_enabled(&self, enabled: bool) {
        self.selection_enabled.store(enabled, Ordering::Release);
    }
}

/// Camera that hands out blank frames, or fails to open.
#[derive(Debug)]
pub struct SimulatedCamera {
    failure: Option<DeviceAcquisitionError>,
    live: Arc<AtomicU32>,
    frames_ready: Arc<AtomicBool>,
}

impl Default for SimulatedCamera {
    fn default() -> Self {
        Self {
            failure: None,
            live: Arc::new(AtomicU32::new(0)),
            frames_ready: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl SimulatedCamera {
    /// Working camera.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Camera whose acquisition always fails with `reason`.
    #[must_use]
    pub fn failing(reason: DeviceAcquisitionError) -> Self {
        Self { failure: Some(reason), ..Self::default() }
    }

    /// Number of streams acquired and not yet released.
    #[must_use]
    pub fn live_streams(&self) -> u32 {
        self.live.load(Ordering::Acquire)
    }

    /// Controls whether streams have a frame ready.
    pub fn set_frames_ready(&self, ready: bool) {
        self.frames_ready.store(ready, Ordering::Release);
    }
}

impl CaptureDevice for SimulatedCamera {
    fn acquire(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<Box<dyn CaptureStream>, DeviceAcquisitionError> {
        if let Some(reason) = self.failure {
            return Err(reason);
        }
        self.live.fetch_add(1, Ordering::AcqRel);
        Ok(Box::new(SimulatedStream {
            width: constraints.ideal_width,
            height: constraints.ideal_height,
            sequence: 0,
            live: Arc::clone(&self.live),
            frames_ready: Arc::clone(&self.frames_ready),
            released: false,
        }))
    }
}

struct SimulatedStream {
    width: u32,
    height: u32,
    sequence: u64,
    live: Arc<AtomicU32>,
    frames_ready: Arc<AtomicBool>,
    released: bool,
}

impl CaptureStream for SimulatedStream {
    fn grab_frame(&mut self) -> Option<Frame> {
        if self.released || !self.frames_ready.load(Ordering::Acquire) {
            return None;
        }
        let sequence = self.sequence;
        self.sequence += 1;
        Some(Frame { width: self.width, height: self.height, sequence, pixels: Vec::new() })
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.live.fetch_sub(1, Ordering::AcqRel);
        }
    }
}
