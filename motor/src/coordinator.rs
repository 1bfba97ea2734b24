//! Arm/disarm coordination for the mount.
//!
//! A standing thread consumes the security system's coalescing arm/disarm
//! signals and drives the controller: disarm parks the mount at its origin
//! and then disables it, arm re-enables it and re-homes. Each handled signal
//! ends with one best-effort capture request so the camera collaborator can
//! take a confirmatory frame.
//!
//! The coordinator is the sole writer of the controller's disabled flag.
//! Failures of individual steps are logged and do not abort the sequence: a
//! park that fails still leaves the mount disabled.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{info, warn};

use crate::controller::Controller;
use crate::port::MotorPort;
use crate::signal::{AlarmEvent, AlarmSignals, CaptureTrigger};

/// Standing arm/disarm handler.
///
/// Spawns its thread on construction. Closing the signal handle stops the
/// thread; dropping the coordinator does both and joins.
pub struct AlarmCoordinator {
    signals: AlarmSignals,
    handle: Option<JoinHandle<()>>,
}

impl AlarmCoordinator {
    /// Spawn the coordinator thread over `controller`.
    pub fn spawn<M: MotorPort + 'static>(
        controller: Arc<Controller<M>>,
        signals: AlarmSignals,
        capture: CaptureTrigger,
    ) -> Self {
        let thread_signals = signals.clone();
        let handle = thread::Builder::new()
            .name("motor-alarm".into())
            .spawn(move || Self::run(controller, thread_signals, capture))
            .expect("failed to spawn alarm coordinator thread");
        Self {
            signals,
            handle: Some(handle),
        }
    }

    fn run<M: MotorPort>(
        controller: Arc<Controller<M>>,
        signals: AlarmSignals,
        capture: CaptureTrigger,
    ) {
        while let Some(event) = signals.wait() {
            match event {
                AlarmEvent::Disarm => {
                    info!("disarm signal: parking motor");
                    if let Err(e) = controller.park() {
                        warn!("failed to park motor on disarm: {e}");
                    }
                    controller.disable();
                }
                AlarmEvent::Arm => {
                    info!("arm signal: re-enabling motor");
                    controller.enable();
                    if let Err(e) = controller.calibrate() {
                        warn!("failed to recalibrate motor on arm: {e}");
                    }
                }
            }
            capture.request();
        }
    }
}

impl Drop for AlarmCoordinator {
    fn drop(&mut self) {
        self.signals.close();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use crate::controller::ControllerConfig;
    use crate::error::MotorError;
    use crate::mock::{MockMotor, PortCommand};
    use crate::protocol::{Axis, MoveDelta};

    use super::*;

    fn fast_controller(mock: &Arc<MockMotor>) -> Arc<Controller<Arc<MockMotor>>> {
        let config = ControllerConfig {
            poll_interval: Duration::from_millis(1),
            ..ControllerConfig::default()
        };
        let controller = Arc::new(Controller::with_config(mock.clone(), config).unwrap());
        mock.clear_log();
        controller
    }

    /// Poll until `predicate` holds, panicking after one second.
    fn wait_for(what: &str, predicate: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(1);
        while !predicate() {
            assert!(Instant::now() < deadline, "timed out waiting for {what}");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn disarm_parks_then_disables() {
        let mock = Arc::new(MockMotor::at(300, 120));
        let controller = fast_controller(&mock);
        let signals = AlarmSignals::new();
        let capture = CaptureTrigger::new();
        let _coordinator =
            AlarmCoordinator::spawn(controller.clone(), signals.clone(), capture.clone());

        signals.raise(AlarmEvent::Disarm);
        wait_for("controller to disable", || controller.is_disabled());

        assert_eq!(mock.moves(), vec![MoveDelta { dx: -300, dy: -120 }]);
        assert_eq!(mock.position(), (0, 0));
        assert!(capture.wait(Duration::from_secs(1)));

        // No further motion is accepted until a following arm
        assert!(matches!(
            controller.set(Axis::Horizontal, 50),
            Err(MotorError::Disabled)
        ));
        assert_eq!(mock.moves().len(), 1);
    }

    #[test]
    fn arm_enables_then_recalibrates() {
        let mock = Arc::new(MockMotor::new());
        let controller = fast_controller(&mock);
        controller.disable();
        let signals = AlarmSignals::new();
        let capture = CaptureTrigger::new();
        let _coordinator =
            AlarmCoordinator::spawn(controller.clone(), signals.clone(), capture.clone());
        mock.clear_log();

        signals.raise(AlarmEvent::Arm);
        wait_for("controller to enable", || !controller.is_disabled());
        wait_for("recalibration", || {
            controller.last_calibrated().is_some()
        });

        let resets = mock
            .commands()
            .iter()
            .filter(|cmd| matches!(cmd, PortCommand::Reset))
            .count();
        assert_eq!(resets, 1);
        assert!(capture.wait(Duration::from_secs(1)));

        // Axis commands are accepted again
        controller.set(Axis::Horizontal, 40).unwrap();
        assert_eq!(mock.position(), (40, 0));
    }

    #[test]
    fn park_failure_still_disables() {
        let mock = Arc::new(MockMotor::at(100, 0));
        let controller = fast_controller(&mock);
        let signals = AlarmSignals::new();
        let capture = CaptureTrigger::new();
        let _coordinator =
            AlarmCoordinator::spawn(controller.clone(), signals.clone(), capture.clone());

        mock.fail_next(crate::protocol::CommandCode::Move, 5);
        signals.raise(AlarmEvent::Disarm);
        wait_for("controller to disable", || controller.is_disabled());

        // The capture request still goes out
        assert!(capture.wait(Duration::from_secs(1)));
    }

    #[test]
    fn drop_stops_the_thread() {
        let mock = Arc::new(MockMotor::new());
        let controller = fast_controller(&mock);
        let signals = AlarmSignals::new();
        let coordinator =
            AlarmCoordinator::spawn(controller, signals.clone(), CaptureTrigger::new());

        drop(coordinator);

        // The handle set is closed; a raise after shutdown is a no-op
        signals.raise(AlarmEvent::Arm);
        assert!(mock.commands().is_empty());
    }
}
