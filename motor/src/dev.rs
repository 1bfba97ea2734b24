//! Motor character-device handle (Linux only).
//!
//! The mount's motor is driven by a kernel module exposing a character
//! device. Each command is one blocking `ioctl` with a fixed-layout payload
//! from [`crate::protocol`]; the device never needs to be read, so it is
//! opened write-only. The handle owns the file descriptor exclusively for
//! its lifetime and releases it on drop.

use std::ffi::CString;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::path::Path;

use tracing::debug;

use crate::error::{MotorError, MotorResult};
use crate::port::MotorPort;
use crate::protocol::{CommandCode, MotorStatus, MoveData, MoveDelta, ResetData, SpeedData, StatusData};

/// Well-known path of the motor control device.
pub const DEFAULT_DEVICE: &str = "/dev/motor";

/// Exclusive handle to the motor control character device.
///
/// Exactly one of these should exist per physical device; it is handed to
/// the [`Controller`](crate::controller::Controller) at construction and no
/// other component issues hardware commands.
#[derive(Debug)]
pub struct DevMotor {
    fd: OwnedFd,
    path: String,
}

impl DevMotor {
    /// Open the motor device at `path`.
    ///
    /// Failure (device missing, permission denied, already held) is fatal to
    /// controller startup; the caller is expected to run without motion
    /// control for the rest of the process.
    pub fn open(path: &str) -> MotorResult<Self> {
        let c_path = CString::new(path).map_err(|_| {
            MotorError::DeviceUnavailable(io::Error::new(
                io::ErrorKind::InvalidInput,
                "device path contains a NUL byte",
            ))
        })?;

        // SAFETY: c_path is a valid NUL-terminated string for the duration
        // of the call.
        let fd = unsafe { libc::open(c_path.as_ptr(), libc::O_WRONLY) };
        if fd < 0 {
            return Err(MotorError::DeviceUnavailable(io::Error::last_os_error()));
        }

        debug!("opened motor control device at {path}");

        Ok(Self {
            // SAFETY: fd is a freshly opened descriptor we own.
            fd: unsafe { OwnedFd::from_raw_fd(fd) },
            path: path.to_string(),
        })
    }

    /// Open the motor device at its well-known path.
    pub fn open_default() -> MotorResult<Self> {
        Self::open(DEFAULT_DEVICE)
    }

    /// Check whether a motor device node exists at `path` without opening it.
    ///
    /// Lets platform probes decide whether to bring up motion control at all.
    pub fn is_present(path: impl AsRef<Path>) -> bool {
        path.as_ref().exists()
    }

    /// Path this handle was opened at.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Issue one blocking ioctl for `command`.
    ///
    /// `payload` is read or written by the kernel depending on the command;
    /// null is valid for commands without a payload.
    fn command(&self, command: CommandCode, payload: *mut libc::c_void) -> MotorResult<()> {
        // SAFETY: the fd is open for the lifetime of self, and payload
        // either is null or points to a live repr(C) struct of the layout
        // this request code expects.
        let ret = unsafe {
            libc::ioctl(
                self.fd.as_raw_fd(),
                command.request() as libc::c_ulong,
                payload,
            )
        };
        if ret == -1 {
            return Err(MotorError::Hardware {
                command,
                source: io::Error::last_os_error(),
            });
        }
        Ok(())
    }
}

impl MotorPort for DevMotor {
    fn stop(&self) -> MotorResult<()> {
        self.command(CommandCode::Stop, std::ptr::null_mut())
    }

    fn reset(&self) -> MotorResult<()> {
        let mut data = bytemuck::Zeroable::zeroed();
        self.command(CommandCode::Reset, (&mut data as *mut ResetData).cast())
    }

    fn move_by(&self, delta: MoveDelta) -> MotorResult<()> {
        let mut data = MoveData::from(delta);
        self.command(CommandCode::Move, (&mut data as *mut MoveData).cast())
    }

    fn status(&self) -> MotorResult<MotorStatus> {
        let mut data: StatusData = bytemuck::Zeroable::zeroed();
        self.command(CommandCode::GetStatus, (&mut data as *mut StatusData).cast())?;
        Ok(data.into())
    }

    fn set_speed(&self, speed: i32) -> MotorResult<()> {
        let mut data = SpeedData { speed };
        self.command(CommandCode::SetSpeed, (&mut data as *mut SpeedData).cast())
    }
}

impl Drop for DevMotor {
    fn drop(&mut self) {
        debug!("releasing motor control device at {}", self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_missing_device_is_unavailable() {
        let err = DevMotor::open("/dev/nonexistent-motor-device").unwrap_err();
        assert!(matches!(err, MotorError::DeviceUnavailable(_)));
    }

    #[test]
    fn presence_probe() {
        assert!(!DevMotor::is_present("/dev/nonexistent-motor-device"));
        assert!(DevMotor::is_present("/dev/null"));
    }
}
