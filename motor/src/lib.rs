//! Motion control for the pan/tilt camera mount.
//!
//! The mount's two stepper axes are driven by a kernel module exposing a
//! character device; every command is one blocking ioctl with a fixed-layout
//! payload. This crate owns that device exclusively and layers on top of it:
//!
//! - [`protocol`] - command codes and wire payload structs
//! - [`dev`] - the character-device handle (Linux only)
//! - [`controller`] - motion sequencing, calibration and the
//!   enable/disable lifecycle behind two locks
//! - [`coordinator`] - the standing arm/disarm handler driven by the
//!   external security system
//! - [`signal`] - single-slot coalescing mailboxes for arm/disarm and
//!   capture-request signals
//!
//! Out-of-process collaborators (property publication, camera capture)
//! interact only through [`Controller`] calls, [`AlarmSignals`] and the
//! [`CaptureTrigger`].
//!
//! # Features
//!
//! - `mock` - expose the instrumented in-memory port used by the unit tests
//!   so external harnesses can run without hardware.

pub mod controller;
pub mod coordinator;
#[cfg(target_os = "linux")]
pub mod dev;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod port;
pub mod protocol;
pub mod signal;

pub use controller::{Controller, ControllerConfig, DEFAULT_SPEED, POLL_INTERVAL};
pub use coordinator::AlarmCoordinator;
#[cfg(target_os = "linux")]
pub use dev::{DevMotor, DEFAULT_DEVICE};
pub use error::{MotorError, MotorResult};
pub use port::MotorPort;
pub use protocol::{Axis, CommandCode, Direction, MotionState, MotorStatus, MoveDelta};
pub use signal::{AlarmEvent, AlarmSignals, CaptureTrigger};
