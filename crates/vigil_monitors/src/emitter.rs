//! Shared start/stop gate and signal emission for monitors.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use vigil_core::{Clock, MonitorEvent, MonitorFault, Signal, SignalSink};

/// Gate in front of a monitor's sink.
///
/// Monitors run on one logical thread, so once `deactivate` returns no
/// further event passes `emit`. Both calls are safe from inside the sink.
pub struct Emitter {
    running: AtomicBool,
    sink: Arc<dyn SignalSink>,
    clock: Arc<dyn Clock>,
}

impl Emitter {
    /// Creates a closed gate.
    #[must_use]
    pub fn new(sink: Arc<dyn SignalSink>, clock: Arc<dyn Clock>) -> Self {
        Self {
            running: AtomicBool::new(false),
            sink,
            clock,
        }
    }

    /// Opens the gate. Returns false if it was already open.
    pub fn activate(&self) -> bool {
        !self.running.swap(true, Ordering::AcqRel)
    }

    /// Closes the gate. Returns false if it was already closed.
    pub fn deactivate(&self) -> bool {
        self.running.swap(false, Ordering::AcqRel)
    }

    /// Returns true while open.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Current time from the session clock.
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Posts an event if the gate is open. Returns true if posted.
    pub fn emit(&self, event: MonitorEvent) -> bool {
        if !self.is_running() {
            return false;
        }
        self.sink.post(Signal::Monitor { event, at_ms: self.clock.now_ms() });
        true
    }

    /// Posts a degradation regardless of the gate; faults are raised while
    /// starting, before the gate opens.
    pub fn fault(&self, fault: MonitorFault) {
        self.sink.post(Signal::Fault { fault, at_ms: self.clock.now_ms() });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::ManualClock;

    #[test]
    fn test_gate() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let emitter = Emitter::new(Arc::new(tx), Arc::new(ManualClock::new(42)));

        assert!(!emitter.emit(MonitorEvent::TabSwitch));
        assert!(emitter.activate());
        assert!(!emitter.activate());
        assert!(emitter.emit(MonitorEvent::TabSwitch));
        assert!(emitter.deactivate());
        assert!(!emitter.deactivate());
        assert!(!emitter.emit(MonitorEvent::TabSwitch));

        emitter.fault(MonitorFault::FullscreenRefused("test".into()));

        let received: Vec<Signal> = rx.try_iter().collect();
        assert_eq!(received.len(), 2);
        assert_eq!(received[0], Signal::Monitor { event: MonitorEvent::TabSwitch, at_ms: 42 });
        assert!(matches!(received[1], Signal::Fault { .. }));
    }
}
