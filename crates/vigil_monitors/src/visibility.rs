//! # Visibility Monitor
//!
//! Watches whether the candidate is still looking at the exam surface.
//!
//! Two independent platform signals mean "left the exam": the document
//! becoming hidden and the window losing focus. Each one counts as a switch
//! on its own, so a single physical tab change that fires both is counted
//! twice unless `dedup_window_ms` is set. The context menu and devtools
//! shortcuts are also counted as switches.

use crate::emitter::Emitter;
use crate::input::{Disposition, KeyCombo};
use parking_lot::Mutex;
use std::sync::Arc;
use vigil_core::config::VisibilitySettings;
use vigil_core::{Clock, MonitorEvent, SignalSink};

/// Platform signals routed to the visibility monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSignal {
    /// Document visibility flag changed.
    VisibilityChanged {
        /// True when the document is now hidden.
        hidden: bool,
    },
    /// Window lost focus.
    WindowBlur,
    /// Window regained focus.
    WindowFocus,
    /// Context menu was requested.
    ContextMenu,
    /// Key pressed on the exam surface.
    KeyDown(KeyCombo),
}

/// Emits `TabSwitch` / `TabReturn`.
pub struct VisibilityMonitor {
    settings: VisibilitySettings,
    emitter: Emitter,
    /// Time of the last counted away transition, for dedup.
    last_away_ms: Mutex<Option<u64>>,
}

impl VisibilityMonitor {
    /// Creates a stopped monitor.
    #[must_use]
    pub fn new(
        settings: VisibilitySettings,
        sink: Arc<dyn SignalSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            settings,
            emitter: Emitter::new(sink, clock),
            last_away_ms: Mutex::new(None),
        }
    }

    /// Starts observing. No-op if running.
    pub fn start(&self) {
        if self.emitter.activate() {
            *self.last_away_ms.lock() = None;
            tracing::info!(
                dedup_window_ms = self.settings.dedup_window_ms,
                "visibility monitor started"
            );
        }
    }

    /// Stops observing. Idempotent.
    pub fn stop(&self) {
        if self.emitter.deactivate() {
            tracing::info!("visibility monitor stopped");
        }
    }

    /// Returns true while started.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.emitter.is_running()
    }

    /// Handles one platform signal.
    pub fn handle(&self, signal: PageSignal) -> Disposition {
        if !self.is_running() {
            return Disposition::PassThrough;
        }
        match signal {
            PageSignal::VisibilityChanged { hidden: true } | PageSignal::WindowBlur => {
                self.away();
                Disposition::PassThrough
            }
            PageSignal::VisibilityChanged { hidden: false } | PageSignal::WindowFocus => {
                self.emitter.emit(MonitorEvent::TabReturn);
                Disposition::PassThrough
            }
            PageSignal::ContextMenu => {
                if self.settings.context_menu_counts_as_switch {
                    self.emitter.emit(MonitorEvent::TabSwitch);
                }
                Disposition::Suppress
            }
            PageSignal::KeyDown(combo) if combo.is_devtools(false) => {
                self.emitter.emit(MonitorEvent::TabSwitch);
                Disposition::Suppress
            }
            PageSignal::KeyDown(_) => Disposition::PassThrough,
        }
    }

    fn away(&self) {
        let now = self.emitter.now_ms();
        let window = self.settings.dedup_window_ms;
        {
            let mut last = self.last_away_ms.lock();
            if let Some(prev) = *last {
                if window > 0 && now.saturating_sub(prev) < window {
                    tracing::debug!(now, prev, "away signal deduplicated");
                    return;
                }
            }
            *last = Some(now);
        }
        self.emitter.emit(MonitorEvent::TabSwitch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Key;
    use crossbeam_channel::Receiver;
    use vigil_core::{ManualClock, Signal};

    fn monitor(settings: VisibilitySettings) -> (VisibilityMonitor, Receiver<Signal>, Arc<ManualClock>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let clock = Arc::new(ManualClock::new(0));
        let monitor = VisibilityMonitor::new(settings, Arc::new(tx), clock.clone());
        monitor.start();
        (monitor, rx, clock)
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
    fn test_blur_and_hidden_both_count() {
        let (monitor, rx, _) = monitor(VisibilitySettings::default());
        monitor.handle(PageSignal::VisibilityChanged { hidden: true });
        monitor.handle(PageSignal::WindowBlur);
        monitor.handle(PageSignal::WindowFocus);

        assert_eq!(
            events(&rx),
            vec![MonitorEvent::TabSwitch, MonitorEvent::TabSwitch, MonitorEvent::TabReturn]
        );
    }

    #[test]
    fn test_dedup_window() {
        let settings = VisibilitySettings { dedup_window_ms: 200, ..VisibilitySettings::default() };
        let (monitor, rx, clock) = monitor(settings);

        monitor.handle(PageSignal::VisibilityChanged { hidden: true });
        clock.advance(50);
        monitor.handle(PageSignal::WindowBlur);
        clock.advance(500);
        monitor.handle(PageSignal::WindowBlur);

        assert_eq!(events(&rx), vec![MonitorEvent::TabSwitch, MonitorEvent::TabSwitch]);
    }

    #[test]
    fn test_context_menu_and_devtools() {
        let (monitor, rx, _) = monitor(VisibilitySettings::default());

        assert_eq!(monitor.handle(PageSignal::ContextMenu), Disposition::Suppress);
        assert_eq!(
            monitor.handle(PageSignal::KeyDown(KeyCombo::new(Key::Function(12)))),
            Disposition::Suppress
        );
        assert_eq!(
            monitor.handle(PageSignal::KeyDown(KeyCombo::ctrl('c'))),
            Disposition::PassThrough
        );
        assert_eq!(events(&rx).len(), 2);
    }

    #[test]
    fn test_context_menu_can_be_excluded() {
        let settings = VisibilitySettings {
            context_menu_counts_as_switch: false,
            ..VisibilitySettings::default()
        };
        let (monitor, rx, _) = monitor(settings);
        assert_eq!(monitor.handle(PageSignal::ContextMenu), Disposition::Suppress);
        assert!(events(&rx).is_empty());
    }

    #[test]
    fn test_stopped_monitor_is_silent() {
        let (monitor, rx, _) = monitor(VisibilitySettings::default());
        monitor.stop();
        monitor.stop();
        assert_eq!(monitor.handle(PageSignal::ContextMenu), Disposition::PassThrough);
        monitor.handle(PageSignal::WindowBlur);
        assert!(events(&rx).is_empty());
        assert!(!monitor.is_running());
    }
}
