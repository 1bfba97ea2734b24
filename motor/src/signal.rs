//! Single-slot coalescing signal mailboxes.
//!
//! The security system fires arm/disarm best-effort: each signal is buffered
//! at most once, and a raise while the same signal is already pending is
//! dropped rather than queued, so rapid repeats collapse to the latest
//! intent. The capture trigger toward the camera collaborator has the same
//! at-most-one-pending contract.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// Security-state transition delivered to the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmEvent {
    /// Security system armed: re-enable the mount and recalibrate.
    Arm,
    /// Security system disarmed: park the mount and disable it.
    Disarm,
}

#[derive(Default)]
struct AlarmState {
    arm: bool,
    disarm: bool,
    closed: bool,
}

/// Pair of single-slot arm/disarm mailboxes shared with the coordinator.
///
/// Cloning yields another handle to the same mailboxes; the producer side
/// (security integration) and consumer side (coordinator thread) each hold
/// one.
#[derive(Clone, Default)]
pub struct AlarmSignals {
    inner: Arc<(Mutex<AlarmState>, Condvar)>,
}

impl AlarmSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise a signal, waking the coordinator.
    ///
    /// Returns `false` if the same signal was already pending; the raise is
    /// dropped, never queued twice.
    pub fn raise(&self, event: AlarmEvent) -> bool {
        let (lock, cvar) = &*self.inner;
        let mut state = lock.lock().unwrap();
        let slot = match event {
            AlarmEvent::Arm => &mut state.arm,
            AlarmEvent::Disarm => &mut state.disarm,
        };
        let newly_raised = !*slot;
        *slot = true;
        if newly_raised {
            cvar.notify_all();
        }
        newly_raised
    }

    /// Block until a signal is pending and take it.
    ///
    /// Returns `None` once [`close`](Self::close) has been called and all
    /// pending signals are drained. When both signals are pending, disarm is
    /// delivered first: parking wins over re-enabling.
    pub fn wait(&self) -> Option<AlarmEvent> {
        let (lock, cvar) = &*self.inner;
        let mut state = lock.lock().unwrap();
        loop {
            if state.disarm {
                state.disarm = false;
                return Some(AlarmEvent::Disarm);
            }
            if state.arm {
                state.arm = false;
                return Some(AlarmEvent::Arm);
            }
            if state.closed {
                return None;
            }
            state = cvar.wait(state).unwrap();
        }
    }

    /// Close the mailboxes, waking any waiter.
    pub fn close(&self) {
        let (lock, cvar) = &*self.inner;
        lock.lock().unwrap().closed = true;
        cvar.notify_all();
    }
}

#[derive(Default)]
struct CaptureState {
    pending: bool,
}

/// Best-effort capture-request mailbox toward the camera collaborator.
///
/// Raised after every completed arm/disarm handling and after every
/// successful axis operation; the camera takes one confirmatory frame per
/// request it manages to consume.
#[derive(Clone, Default)]
pub struct CaptureTrigger {
    inner: Arc<(Mutex<CaptureState>, Condvar)>,
}

impl CaptureTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a confirmatory capture.
    ///
    /// Returns `false` if a request is already pending; the new one is
    /// silently dropped.
    pub fn request(&self) -> bool {
        let (lock, cvar) = &*self.inner;
        let mut state = lock.lock().unwrap();
        if state.pending {
            return false;
        }
        state.pending = true;
        cvar.notify_all();
        true
    }

    /// Take a pending request without blocking.
    pub fn take(&self) -> bool {
        let (lock, _) = &*self.inner;
        let mut state = lock.lock().unwrap();
        std::mem::take(&mut state.pending)
    }

    /// Wait up to `timeout` for a request and take it.
    ///
    /// Returns `false` if none arrived in time.
    pub fn wait(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let state = lock.lock().unwrap();
        let (mut state, _) = cvar
            .wait_timeout_while(state, timeout, |s| !s.pending)
            .unwrap();
        std::mem::take(&mut state.pending)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn alarm_raise_coalesces() {
        let signals = AlarmSignals::new();
        assert!(signals.raise(AlarmEvent::Arm));
        assert!(!signals.raise(AlarmEvent::Arm));
        // The other slot is independent
        assert!(signals.raise(AlarmEvent::Disarm));
        assert!(!signals.raise(AlarmEvent::Disarm));
    }

    #[test]
    fn disarm_delivered_before_arm() {
        let signals = AlarmSignals::new();
        signals.raise(AlarmEvent::Arm);
        signals.raise(AlarmEvent::Disarm);
        assert_eq!(signals.wait(), Some(AlarmEvent::Disarm));
        assert_eq!(signals.wait(), Some(AlarmEvent::Arm));
    }

    #[test]
    fn duplicate_raise_delivers_once() {
        let signals = AlarmSignals::new();
        signals.raise(AlarmEvent::Arm);
        signals.raise(AlarmEvent::Arm);
        signals.close();
        assert_eq!(signals.wait(), Some(AlarmEvent::Arm));
        assert_eq!(signals.wait(), None);
    }

    #[test]
    fn close_wakes_waiter() {
        let signals = AlarmSignals::new();
        let waiter = {
            let signals = signals.clone();
            thread::spawn(move || signals.wait())
        };
        signals.close();
        assert_eq!(waiter.join().unwrap(), None);
    }

    #[test]
    fn pending_signal_drained_before_close_takes_effect() {
        let signals = AlarmSignals::new();
        signals.raise(AlarmEvent::Disarm);
        signals.close();
        assert_eq!(signals.wait(), Some(AlarmEvent::Disarm));
        assert_eq!(signals.wait(), None);
    }

    #[test]
    fn capture_requests_coalesce() {
        let trigger = CaptureTrigger::new();
        assert!(trigger.request());
        assert!(!trigger.request());
        assert!(trigger.take());
        assert!(!trigger.take());
        assert!(trigger.request());
    }

    #[test]
    fn capture_wait_times_out_when_idle() {
        let trigger = CaptureTrigger::new();
        assert!(!trigger.wait(Duration::from_millis(10)));
        trigger.request();
        assert!(trigger.wait(Duration::from_millis(10)));
    }
}
