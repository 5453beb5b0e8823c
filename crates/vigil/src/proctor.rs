//! # Proctor
//!
//! One session plus the three monitors feeding it.
//!
//! The proctor starts the monitors, routes platform signals to them and
//! stops all of them the moment the session leaves `Active`, whatever the
//! reason. Monitors post straight into the session inbox.

use crate::session::SessionHandle;
use std::sync::{Arc, Weak};
use vigil_core::{ProctorConfig, SignalSink};
use vigil_monitors::{
    CaptureDevice, DeviceAcquisitionError, DisplayControl, Disposition, FaceClassifier,
    InputInterceptor, KeyCombo, LockdownMonitor, LockdownSignal, PageSignal, PresenceMonitor,
    VisibilityMonitor,
};

/// Platform implementations the monitors run against.
pub struct Platform {
    /// Fullscreen control.
    pub display: Arc<dyn DisplayControl>,
    /// Input-path suppression.
    pub interceptor: Arc<dyn InputInterceptor>,
    /// Camera.
    pub camera: Arc<dyn CaptureDevice>,
    /// Face counter for camera frames.
    pub classifier: Box<dyn FaceClassifier>,
}

struct Monitors {
    visibility: VisibilityMonitor,
    lockdown: LockdownMonitor,
    presence: Arc<PresenceMonitor>,
}

impl Monitors {
    fn stop_all(&self) {
        self.visibility.stop();
        self.lockdown.stop();
        self.presence.stop();
        // Stopped first, so this exit is never counted.
        if let Err(err) = self.lockdown.exit_fullscreen() {
            tracing::debug!(%err, "fullscreen exit after close refused");
        }
    }
}

/// Session with its monitors attached.
pub struct Proctor {
    session: SessionHandle,
    monitors: Arc<Monitors>,
}

impl Proctor {
    /// Builds the monitors against `platform` using the session's
    /// configuration. Nothing starts until [`Proctor::start`].
    #[must_use]
    pub fn new(session: SessionHandle, platform: Platform) -> Self {
        let config: &ProctorConfig = session.config();
        let sink: Arc<dyn SignalSink> = Arc::new(session.clone());
        let clock = session.clock();

        let monitors = Arc::new(Monitors {
            visibility: VisibilityMonitor::new(
                config.visibility.clone(),
                Arc::clone(&sink),
                Arc::clone(&clock),
            ),
            lockdown: LockdownMonitor::new(
                config.lockdown.clone(),
                platform.display,
                platform.interceptor,
                Arc::clone(&sink),
                Arc::clone(&clock),
            ),
            presence: Arc::new(PresenceMonitor::new(
                config.presence.clone(),
                platform.camera,
                platform.classifier,
                sink,
                clock,
            )),
        });

        // Weak: the session owns this listener and the monitors own the session.
        let weak: Weak<Monitors> = Arc::downgrade(&monitors);
        session.on_closing(move |reason| {
            if let Some(monitors) = weak.upgrade() {
                tracing::info!("Session closing ({reason}), stopping monitors");
                monitors.stop_all();
            }
        });

        Self { session, monitors }
    }

    /// Starts every monitor.
    ///
    /// Returns the camera failure if presence monitoring could not start;
    /// the session continues without it and has already been sent the
    /// fault.
    pub fn start(&self) -> Option<DeviceAcquisitionError> {
        if !self.session.status().is_closed() {
            self.monitors.visibility.start();
            self.monitors.lockdown.start();
            if let Err(err) = self.monitors.presence.start() {
                return Some(err);
            }
        }
        None
    }

    /// Routes a page visibility/focus signal.
    pub fn handle_page(&self, signal: PageSignal) -> Disposition {
        self.monitors.visibility.handle(signal)
    }

    /// Routes a fullscreen or input-path signal.
    pub fn handle_lockdown(&self, signal: LockdownSignal) -> Disposition {
        self.monitors.lockdown.handle(signal)
    }

    /// Routes a key press to both monitors. A devtools shortcut counts as a
    /// switch and as a restricted input.
    pub fn handle_key(&self, combo: KeyCombo) -> Disposition {
        let page = self.handle_page(PageSignal::KeyDown(combo));
        let lockdown = self.handle_lockdown(LockdownSignal::KeyDown(combo));
        merge(page, lockdown)
    }

    /// Routes a context-menu request to both monitors.
    pub fn handle_context_menu(&self) -> Disposition {
        let page = self.handle_page(PageSignal::ContextMenu);
        let lockdown = self.handle_lockdown(LockdownSignal::ContextMenu);
        merge(page, lockdown)
    }

    /// Stops every monitor. Idempotent.
    pub fn stop(&self) {
        self.monitors.stop_all();
    }

    /// Stops every monitor and destroys the session.
    pub fn destroy(&self) {
        self.stop();
        self.session.destroy();
    }

    /// The session.
    #[must_use]
    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Visibility monitor.
    #[must_use]
    pub fn visibility(&self) -> &VisibilityMonitor {
        &self.monitors.visibility
    }

    /// Lockdown monitor.
    #[must_use]
    pub fn lockdown(&self) -> &LockdownMonitor {
        &self.monitors.lockdown
    }

    /// Presence monitor, shared with the driver.
    #[must_use]
    pub fn presence(&self) -> Arc<PresenceMonitor> {
        Arc::clone(&self.monitors.presence)
    }
}

impl Drop for Proctor {
    fn drop(&mut self) {
        self.monitors.stop_all();
    }
}

fn merge(a: Disposition, b: Disposition) -> Disposition {
    if a == Disposition::Suppress || b == Disposition::Suppress {
        Disposition::Suppress
    } else {
        Disposition::PassThrough
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionBuilder;
    use vigil_core::{ManualClock, MonitorFault, SessionStatus, ViolationChannel};
    use vigil_monitors::simulation::{SimulatedCamera, SimulatedDisplay, SimulatedInterceptor};
    use vigil_monitors::{Key, ScriptedClassifier};

    struct Rig {
        proctor: Proctor,
        display: Arc<SimulatedDisplay>,
        interceptor: Arc<SimulatedInterceptor>,
        camera: Arc<SimulatedCamera>,
    }

    fn rig(camera: SimulatedCamera) -> Rig {
        let session = SessionBuilder::new("exam-1", 600)
            .clock(Arc::new(ManualClock::new(0)))
            .build()
            .unwrap();
        let display = Arc::new(SimulatedDisplay::new());
        let interceptor = Arc::new(SimulatedInterceptor::new());
        let camera = Arc::new(camera);
        let proctor = Proctor::new(
            session,
            Platform {
                display: display.clone(),
                interceptor: interceptor.clone(),
                camera: camera.clone(),
                classifier: Box::new(ScriptedClassifier::new([1])),
            },
        );
        Rig { proctor, display, interceptor, camera }
    }

    #[test]
    fn test_start_engages_everything() {
        let rig = rig(SimulatedCamera::new());
        assert_eq!(rig.proctor.start(), None);
        assert!(rig.display.is_fullscreen());
        assert!(rig.interceptor.is_installed());
        assert_eq!(rig.camera.live_streams(), 1);
        assert!(rig.proctor.visibility().is_running());
    }

    #[test]
    fn test_devtools_key_counts_on_both_channels() {
        let rig = rig(SimulatedCamera::new());
        rig.proctor.start();

        let disposition = rig.proctor.handle_key(KeyCombo::new(Key::Function(12)));
        assert_eq!(disposition, Disposition::Suppress);

        let session = rig.proctor.session();
        assert_eq!(session.channel_count(ViolationChannel::TabSwitch), 1);
        assert_eq!(session.channel_count(ViolationChannel::RestrictedInput), 1);
    }

    #[test]
    fn test_close_stops_monitors() {
        let rig = rig(SimulatedCamera::new());
        rig.proctor.start();

        rig.proctor.handle_page(PageSignal::WindowBlur);
        rig.proctor.handle_page(PageSignal::WindowBlur);

        let session = rig.proctor.session();
        assert_eq!(session.status(), SessionStatus::Terminated);
        assert!(!rig.proctor.visibility().is_running());
        assert!(!rig.proctor.lockdown().is_running());
        assert!(!rig.interceptor.is_installed());
        assert!(rig.interceptor.selection_enabled());
        assert_eq!(rig.camera.live_streams(), 0);
        assert!(!rig.display.is_fullscreen());
        assert_eq!(session.channel_count(ViolationChannel::FullscreenExit), 0);
    }

    #[test]
    fn test_camera_failure_degrades() {
        let rig = rig(SimulatedCamera::failing(DeviceAcquisitionError::NoDevice));
        assert_eq!(rig.proctor.start(), Some(DeviceAcquisitionError::NoDevice));

        let session = rig.proctor.session();
        assert_eq!(session.status(), SessionStatus::Active);
        assert!(matches!(session.faults()[..], [MonitorFault::CaptureUnavailable(_)]));
        assert!(rig.proctor.visibility().is_running());
    }

    #[test]
    fn test_destroy_releases_everything() {
        let rig = rig(SimulatedCamera::new());
        rig.proctor.start();
        rig.proctor.destroy();
        assert!(rig.proctor.session().is_destroyed());
        assert_eq!(rig.camera.live_streams(), 0);
        assert!(!rig.interceptor.is_installed());
    }
}
