//! # Lockdown Monitor
//!
//! Keeps the exam in fullscreen and blocks the clipboard, print, save,
//! devtools, context-menu, selection and drag paths.
//!
//! Input suppression is global platform state. It is held by an
//! [`InterceptionGuard`] for exactly as long as the monitor runs; dropping the
//! guard (on `stop`, on monitor drop, or while unwinding) reverts it.

use crate::emitter::Emitter;
use crate::error::{FullscreenRequestError, InterceptionFailure};
use crate::input::{Disposition, Key, KeyCombo};
use crate::platform::{DisplayControl, InputInterceptor};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use vigil_core::config::LockdownSettings;
use vigil_core::{Clock, MonitorEvent, MonitorFault, RestrictedAction, SignalSink};

/// Platform signals routed to the lockdown monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockdownSignal {
    /// Fullscreen state changed.
    FullscreenChanged {
        /// New state.
        fullscreen: bool,
    },
    /// Key pressed on the exam surface.
    KeyDown(KeyCombo),
    /// Context menu requested.
    ContextMenu,
    /// Text selection started.
    SelectStart,
    /// Drag started.
    DragStart,
}

/// Scoped ownership of input interception.
///
/// Installed on construction; removed and text selection restored on drop.
pub struct InterceptionGuard {
    interceptor: Arc<dyn InputInterceptor>,
}

impl InterceptionGuard {
    /// Installs interception and disables text selection.
    ///
    /// # Errors
    /// Returns the platform's [`InterceptionFailure`]; nothing stays installed.
    pub fn acquire(interceptor: Arc<dyn InputInterceptor>) -> Result<Self, InterceptionFailure> {
        interceptor.install()?;
        interceptor.set_selection_enabled(false);
        Ok(Self { interceptor })
    }
}

impl Drop for InterceptionGuard {
    fn drop(&mut self) {
        self.interceptor.set_selection_enabled(true);
        self.interceptor.remove();
        tracing::debug!("input interception released");
    }
}

/// Emits `FullscreenExit` and `RestrictedInput`.
pub struct LockdownMonitor {
    settings: LockdownSettings,
    emitter: Emitter,
    display: Arc<dyn DisplayControl>,
    interceptor: Arc<dyn InputInterceptor>,
    guard: Mutex<Option<InterceptionGuard>>,
    fullscreen: AtomicBool,
    /// Set while an exit we requested is in flight.
    exit_requested: AtomicBool,
}

impl LockdownMonitor {
    /// Creates a stopped monitor.
    #[must_use]
    pub fn new(
        settings: LockdownSettings,
        display: Arc<dyn DisplayControl>,
        interceptor: Arc<dyn InputInterceptor>,
        sink: Arc<dyn SignalSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            settings,
            emitter: Emitter::new(sink, clock),
            display,
            interceptor,
            guard: Mutex::new(None),
            fullscreen: AtomicBool::new(false),
            exit_requested: AtomicBool::new(false),
        }
    }

    /// Installs interception and, if enforced, requests fullscreen.
    ///
    /// Refusals are reported as faults; the monitor still runs and still
    /// counts every attempt it sees.
    pub fn start(&self) {
        if !self.emitter.activate() {
            return;
        }

        match InterceptionGuard::acquire(Arc::clone(&self.interceptor)) {
            Ok(guard) => *self.guard.lock() = Some(guard),
            Err(err) => {
                tracing::warn!(%err, "input interception refused");
                self.emitter.fault(MonitorFault::InterceptionRefused(err.to_string()));
            }
        }

        self.exit_requested.store(false, Ordering::Release);
        self.fullscreen.store(self.display.is_fullscreen(), Ordering::Release);
        if self.settings.enforce_fullscreen && self.enter_fullscreen().is_err() {
            tracing::debug!("lockdown running without fullscreen");
        }
        tracing::info!(
            enforce_fullscreen = self.settings.enforce_fullscreen,
            "lockdown monitor started"
        );
    }

    /// Removes interception and restores selection. Idempotent.
    pub fn stop(&self) {
        if !self.emitter.deactivate() {
            return;
        }
        let guard = self.guard.lock().take();
        drop(guard);
        self.exit_requested.store(false, Ordering::Release);
        tracing::info!("lockdown monitor stopped");
    }

    /// Returns true while started.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.emitter.is_running()
    }

    /// Returns true if the monitor believes the surface is fullscreen.
    #[must_use]
    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen.load(Ordering::Acquire)
    }

    /// Requests fullscreen.
    ///
    /// # Errors
    /// Returns the platform refusal, after emitting a `FullscreenRefused` fault.
    pub fn enter_fullscreen(&self) -> Result<(), FullscreenRequestError> {
        match self.display.request_fullscreen() {
            Ok(()) => {
                self.fullscreen.store(true, Ordering::Release);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(%err, "fullscreen request refused");
                self.emitter.fault(MonitorFault::FullscreenRefused(err.to_string()));
                Err(err)
            }
        }
    }

    /// Leaves fullscreen without counting the resulting transition.
    /// A stopped monitor counts nothing, so only a running one marks the
    /// exit as expected.
    ///
    /// # Errors
    /// Returns the platform refusal.
    pub fn exit_fullscreen(&self) -> Result<(), FullscreenRequestError> {
        if !self.display.is_fullscreen() {
            return Ok(());
        }
        let running = self.is_running();
        if running {
            self.exit_requested.store(true, Ordering::Release);
        }
        if let Err(err) = self.display.exit_fullscreen() {
            self.exit_requested.store(false, Ordering::Release);
            return Err(err);
        }
        if !running {
            self.fullscreen.store(false, Ordering::Release);
        }
        Ok(())
    }

    /// Handles one platform signal.
    pub fn handle(&self, signal: LockdownSignal) -> Disposition {
        if !self.is_running() {
            return Disposition::PassThrough;
        }
        match signal {
            LockdownSignal::FullscreenChanged { fullscreen: true } => {
                self.fullscreen.store(true, Ordering::Release);
                Disposition::PassThrough
            }
            LockdownSignal::FullscreenChanged { fullscreen: false } => {
                self.left_fullscreen();
                Disposition::PassThrough
            }
            LockdownSignal::KeyDown(combo) => self.key_down(combo),
            LockdownSignal::ContextMenu => self.restrict(RestrictedAction::ContextMenu),
            LockdownSignal::SelectStart => self.restrict(RestrictedAction::Selection),
            LockdownSignal::DragStart => self.restrict(RestrictedAction::Drag),
        }
    }

    fn left_fullscreen(&self) {
        let was_fullscreen = self.fullscreen.swap(false, Ordering::AcqRel);
        if !was_fullscreen {
            return;
        }
        if self.exit_requested.swap(false, Ordering::AcqRel) {
            tracing::debug!("requested fullscreen exit completed");
            return;
        }
        if self.settings.enforce_fullscreen {
            self.emitter.emit(MonitorEvent::FullscreenExit);
        }
    }

    fn key_down(&self, combo: KeyCombo) -> Disposition {
        if let Some(action) = combo.restricted_action(self.settings.meta_as_ctrl) {
            return self.restrict(action);
        }
        // Best effort: the platform may still leave fullscreen on Escape.
        if combo.key == Key::Escape && self.is_fullscreen() {
            return Disposition::Suppress;
        }
        Disposition::PassThrough
    }

    fn restrict(&self, action: RestrictedAction) -> Disposition {
        self.emitter.emit(MonitorEvent::RestrictedInput(action));
        Disposition::Suppress
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{SimulatedDisplay, SimulatedInterceptor};
    use crossbeam_channel::Receiver;
    use vigil_core::{ManualClock, Signal};

    struct Rig {
        monitor: LockdownMonitor,
        display: Arc<SimulatedDisplay>,
        interceptor: Arc<SimulatedInterceptor>,
        rx: Receiver<Signal>,
    }

    fn rig(display: SimulatedDisplay, interceptor: SimulatedInterceptor) -> Rig {
        let (tx, rx) = crossbeam_channel::unbounded();
        let display = Arc::new(display);
        let interceptor = Arc::new(interceptor);
        let monitor = LockdownMonitor::new(
            LockdownSettings::default(),
            display.clone(),
            interceptor.clone(),
            Arc::new(tx),
            Arc::new(ManualClock::new(0)),
        );
        monitor.start();
        Rig { monitor, display, interceptor, rx }
    }

    fn events(rx: &Receiver<Signal>) -> Vec<MonitorEvent> {
        rx.try_iter()
            .filter_map(|s| match s {
                Signal::Monitor { event, .. } => Some(event),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_start_enters_fullscreen_and_intercepts() {
        let rig = rig(SimulatedDisplay::new(), SimulatedInterceptor::new());
        assert!(rig.display.is_fullscreen());
        assert!(rig.monitor.is_fullscreen());
        assert!(rig.interceptor.is_installed());
        assert!(!rig.interceptor.selection_enabled());
    }

    #[test]
    fn test_user_exit_counts_once_per_transition() {
        let rig = rig(SimulatedDisplay::new(), SimulatedInterceptor::new());
        rig.monitor.handle(LockdownSignal::FullscreenChanged { fullscreen: false });
        rig.monitor.handle(LockdownSignal::FullscreenChanged { fullscreen: false });
        rig.monitor.handle(LockdownSignal::FullscreenChanged { fullscreen: true });
        rig.monitor.handle(LockdownSignal::FullscreenChanged { fullscreen: false });
        assert_eq!(events(&rig.rx), vec![MonitorEvent::FullscreenExit; 2]);
    }

    #[test]
    fn test_requested_exit_not_counted() {
        let rig = rig(SimulatedDisplay::new(), SimulatedInterceptor::new());
        rig.monitor.exit_fullscreen().unwrap();
        rig.monitor.handle(LockdownSignal::FullscreenChanged { fullscreen: false });
        assert!(events(&rig.rx).is_empty());
    }

    #[test]
    fn test_restricted_paths_suppressed_and_counted() {
        let rig = rig(SimulatedDisplay::new(), SimulatedInterceptor::new());
        let m = &rig.monitor;
        assert_eq!(m.handle(LockdownSignal::KeyDown(KeyCombo::ctrl('v'))), Disposition::Suppress);
        assert_eq!(m.handle(LockdownSignal::ContextMenu), Disposition::Suppress);
        assert_eq!(m.handle(LockdownSignal::SelectStart), Disposition::Suppress);
        assert_eq!(m.handle(LockdownSignal::DragStart), Disposition::Suppress);
        assert_eq!(
            m.handle(LockdownSignal::KeyDown(KeyCombo::new(Key::char('q')))),
            Disposition::PassThrough
        );

        assert_eq!(
            events(&rig.rx),
            vec![
                MonitorEvent::RestrictedInput(RestrictedAction::Paste),
                MonitorEvent::RestrictedInput(RestrictedAction::ContextMenu),
                MonitorEvent::RestrictedInput(RestrictedAction::Selection),
                MonitorEvent::RestrictedInput(RestrictedAction::Drag),
            ]
        );
    }

    #[test]
    fn test_escape_suppressed_only_in_fullscreen() {
        let rig = rig(SimulatedDisplay::new(), SimulatedInterceptor::new());
        let esc = LockdownSignal::KeyDown(KeyCombo::new(Key::Escape));
        assert_eq!(rig.monitor.handle(esc), Disposition::Suppress);
        rig.monitor.handle(LockdownSignal::FullscreenChanged { fullscreen: false });
        assert_eq!(rig.monitor.handle(esc), Disposition::PassThrough);
    }

    #[test]
    fn test_refusals_are_faults() {
        let rig = rig(SimulatedDisplay::refusing(), SimulatedInterceptor::refusing());
        let faults: Vec<MonitorFault> = rig
            .rx
            .try_iter()
            .filter_map(|s| match s {
                Signal::Fault { fault, .. } => Some(fault),
                _ => None,
            })
            .collect();
        assert_eq!(faults.len(), 2);
        assert!(matches!(faults[0], MonitorFault::InterceptionRefused(_)));
        assert!(matches!(faults[1], MonitorFault::FullscreenRefused(_)));

        // Attempts are still counted without interception.
        rig.monitor.handle(LockdownSignal::KeyDown(KeyCombo::ctrl('c')));
        assert_eq!(events(&rig.rx).len(), 1);
    }

    #[test]
    fn test_stop_restores_selection() {
        let rig = rig(SimulatedDisplay::new(), SimulatedInterceptor::new());
        rig.monitor.stop();
        rig.monitor.stop();
        assert!(!rig.interceptor.is_installed());
        assert!(rig.interceptor.selection_enabled());
        assert_eq!(rig.interceptor.install_count(), 1);
        assert_eq!(rig.monitor.handle(LockdownSignal::ContextMenu), Disposition::PassThrough);
    }

    #[test]
    fn test_drop_restores_selection() {
        let rig = rig(SimulatedDisplay::new(), SimulatedInterceptor::new());
        let interceptor = rig.interceptor.clone();
        drop(rig);
        assert!(!interceptor.is_installed());
        assert!(interceptor.selection_enabled());
    }
}
