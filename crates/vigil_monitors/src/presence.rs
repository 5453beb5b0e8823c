//! # Presence Monitor
//!
//! Samples the camera on a fixed period and reports how many faces it sees.
//!
//! The camera is an exclusive device. The stream is held by a
//! [`StreamLease`] that releases it on drop, so `stop`, dropping the monitor
//! and every error path all free the hardware.

use crate::classifier::FaceClassifier;
use crate::emitter::Emitter;
use crate::error::DeviceAcquisitionError;
use crate::platform::{CaptureDevice, CaptureStream};
use parking_lot::Mutex;
use std::sync::Arc;
use vigil_core::config::PresenceSettings;
use vigil_core::{Clock, MonitorEvent, MonitorFault, SignalSink};

/// Exclusive ownership of a capture stream.
pub struct StreamLease {
    stream: Box<dyn CaptureStream>,
}

impl StreamLease {
    /// Wraps an acquired stream.
    #[must_use]
    pub fn new(stream: Box<dyn CaptureStream>) -> Self {
        Self { stream }
    }

    /// Borrows the stream for a frame grab.
    pub fn stream(&mut self) -> &mut dyn CaptureStream {
        self.stream.as_mut()
    }
}

impl Drop for StreamLease {
    fn drop(&mut self) {
        self.stream.release();
        tracing::debug!("capture stream released");
    }
}

struct PresenceState {
    lease: Option<StreamLease>,
    classifier: Box<dyn FaceClassifier>,
    samples: u64,
}

/// Emits `NoFace`, `FacePresent` or `MultipleFaces` once per sample.
pub struct PresenceMonitor {
    settings: PresenceSettings,
    emitter: Emitter,
    device: Arc<dyn CaptureDevice>,
    state: Mutex<PresenceState>,
}

impl PresenceMonitor {
    /// Creates a stopped monitor.
    #[must_use]
    pub fn new(
        settings: PresenceSettings,
        device: Arc<dyn CaptureDevice>,
        classifier: Box<dyn FaceClassifier>,
        sink: Arc<dyn SignalSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            settings,
            emitter: Emitter::new(sink, clock),
            device,
            state: Mutex::new(PresenceState { lease: None, classifier, samples: 0 }),
        }
    }

    /// Acquires the camera.
    ///
    /// # Errors
    /// On failure emits one `CaptureUnavailable` fault, stays stopped and
    /// returns the classified reason.
    pub fn start(&self) -> Result<(), DeviceAcquisitionError> {
        if self.is_running() {
            return Ok(());
        }
        match self.device.acquire(&self.settings.capture) {
            Ok(stream) => {
                self.state.lock().lease = Some(StreamLease::new(stream));
                self.emitter.activate();
                tracing::info!(
                    sample_period_ms = self.settings.sample_period_ms,
                    "presence monitor started"
                );
                Ok(())
            }
            Err(err) => {
                tracing::warn!(%err, "camera unavailable, presence monitoring disabled");
                self.emitter.fault(MonitorFault::CaptureUnavailable(err.to_string()));
                Err(err)
            }
        }
    }

    /// Releases the camera. Idempotent.
    pub fn stop(&self) {
        let was_running = self.emitter.deactivate();
        let lease = self.state.lock().lease.take();
        drop(lease);
        if was_running {
            tracing::info!("presence monitor stopped");
        }
    }

    /// Returns true while the camera is held and sampling is allowed.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.emitter.is_running()
    }

    /// Sampling period from the settings.
    #[must_use]
    pub fn sample_period_ms(&self) -> u64 {
        self.settings.sample_period_ms
    }

    /// Number of frames classified so far.
    #[must_use]
    pub fn samples(&self) -> u64 {
        self.state.lock().samples
    }

    /// Grabs and classifies one frame, then emits its event.
    ///
    /// Returns the face count, or `None` if stopped or no frame was ready.
    pub fn sample(&self) -> Option<usize> {
        if !self.is_running() {
            return None;
        }
        // Lock released before emitting so a sink may call `stop`.
        let count = {
            let mut state = self.state.lock();
            let frame = state.lease.as_mut()?.stream().grab_frame()?;
            let count = state.classifier.count_faces(&frame);
            state.samples += 1;
            count
        };

        let event = match count {
            0 => MonitorEvent::NoFace,
            1 => MonitorEvent::FacePresent,
            _ => MonitorEvent::MultipleFaces,
        };
        self.emitter.emit(event);
        Some(count)
    }
}
