//! Error types for the motor controller.

use thiserror::Error;

use crate::protocol::CommandCode;

/// Errors that can occur while driving the mount motor.
///
/// None of these are retried internally: hardware failures surface to the
/// immediate caller, which decides whether to report, log or ignore them.
#[derive(Error, Debug)]
pub enum MotorError {
    /// The motor control device could not be opened.
    ///
    /// Fatal to controller startup; the owning process is expected to run
    /// without motion control for the rest of the run.
    #[error("failed to open motor control device: {0}")]
    DeviceUnavailable(#[source] std::io::Error),

    /// The kernel driver reported a non-zero completion for a command.
    ///
    /// The operation aborts; the raw OS error code is carried in `source`.
    #[error("{command:?} command failed: {source}")]
    Hardware {
        /// Command that failed.
        command: CommandCode,
        /// Raw completion reported by the driver.
        #[source]
        source: std::io::Error,
    },

    /// A command was attempted while the controller is disabled (parked).
    ///
    /// Surfaced before any hardware access, protecting a parked device from
    /// stray commands.
    #[error("motor controller is disabled")]
    Disabled,

    /// A textual target value from a transport layer did not parse.
    #[error("invalid axis target: {0}")]
    InvalidInput(String),

    /// The motor did not report idle within the configured wait deadline.
    ///
    /// Only possible when [`ControllerConfig::wait_deadline`] is set; the
    /// default wait is unbounded.
    ///
    /// [`ControllerConfig::wait_deadline`]: crate::controller::ControllerConfig
    #[error("timed out waiting for motor to come to rest")]
    Timeout,
}

/// Result type for motor operations.
pub type MotorResult<T> = Result<T, MotorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hardware_error_carries_raw_code() {
        let err = MotorError::Hardware {
            command: CommandCode::Move,
            source: std::io::Error::from_raw_os_error(5),
        };
        match &err {
            MotorError::Hardware { command, source } => {
                assert_eq!(*command, CommandCode::Move);
                assert_eq!(source.raw_os_error(), Some(5));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
        assert!(format!("{err}").contains("Move"));
    }

    #[test]
    fn disabled_error_display() {
        assert_eq!(
            format!("{}", MotorError::Disabled),
            "motor controller is disabled"
        );
    }
}
