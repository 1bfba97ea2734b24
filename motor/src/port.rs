//! Hardware seam between the controller and the motor control endpoint.

use crate::error::MotorResult;
use crate::protocol::{MotorStatus, MoveDelta};

/// Interface to the motor control endpoint, one method per wire command.
///
/// Implemented by [`DevMotor`] for the real character device and by the
/// instrumented mock for tests. Methods take `&self`: the endpoint is a
/// single blocking call per command, and all serialization above it belongs
/// to the controller's locks, never to the port.
///
/// [`DevMotor`]: crate::dev::DevMotor
pub trait MotorPort: Send + Sync {
    /// Halt the current motion immediately.
    fn stop(&self) -> MotorResult<()>;

    /// Re-home the motor; the firmware re-zeros its step counters.
    fn reset(&self) -> MotorResult<()>;

    /// Issue a relative step move on both axes simultaneously.
    ///
    /// Returns as soon as the firmware accepts the command; the move
    /// completes asynchronously and is observed through [`status`](Self::status).
    fn move_by(&self, delta: MoveDelta) -> MotorResult<()>;

    /// Read the current position, motion state and speed.
    fn status(&self) -> MotorResult<MotorStatus>;

    /// Set the step rate for subsequent moves.
    fn set_speed(&self, speed: i32) -> MotorResult<()>;
}

/// Shared handles delegate, so a test can keep a reference to the port it
/// hands the controller.
impl<M: MotorPort + ?Sized> MotorPort for std::sync::Arc<M> {
    fn stop(&self) -> MotorResult<()> {
        (**self).stop()
    }

    fn reset(&self) -> MotorResult<()> {
        (**self).reset()
    }

    fn move_by(&self, delta: MoveDelta) -> MotorResult<()> {
        (**self).move_by(delta)
    }

    fn status(&self) -> MotorResult<MotorStatus> {
        (**self).status()
    }

    fn set_speed(&self, speed: i32) -> MotorResult<()> {
        (**self).set_speed(speed)
    }
}
