//! Wire protocol for the mount's motor kernel driver.
//!
//! The driver is controlled through ioctl requests on a character device.
//! The request code selects the command; payloads are plain C structs the
//! kernel reads or writes in place. Layout must match the firmware exactly:
//! fixed-width integers, native byte order, two's-complement signed deltas
//! and unsigned calibration counters, no padding reordering. Every payload
//! struct here is therefore `#[repr(C)]` + `bytemuck::Pod`, and the unit
//! tests assert the layouts.
//!
//! # Command set
//!
//! | Command | Request | Payload |
//! |---|---|---|
//! | Stop | 1 | none |
//! | Reset | 2 | [`ResetData`], all counters zero |
//! | Move | 3 | [`MoveData`] signed deltas |
//! | GetStatus | 4 | out: [`StatusData`] |
//! | SetSpeed | 5 | [`SpeedData`] |

use bytemuck::{Pod, Zeroable};
use strum::{Display, EnumIter, EnumString};

use crate::error::{MotorError, MotorResult};

/// ioctl request codes understood by the motor driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum CommandCode {
    /// Halt the current motion immediately.
    Stop = 1,
    /// Re-establish the home reference; the firmware re-zeros its step counters.
    Reset = 2,
    /// Relative step move on both axes simultaneously.
    Move = 3,
    /// Read the current position, motion state and speed.
    GetStatus = 4,
    /// Set the step rate for subsequent moves.
    SetSpeed = 5,
}

impl CommandCode {
    /// Raw ioctl request value.
    pub fn request(self) -> u32 {
        self as u32
    }
}

/// Mechanical degrees of freedom of the mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Axis {
    /// Pan axis.
    Horizontal,
    /// Tilt axis.
    Vertical,
}

impl Axis {
    /// Inclusive travel range in hardware steps.
    ///
    /// Published limits of the physical rig. Nothing in the protocol clamps
    /// to them; the firmware owns rejecting or saturating out-of-range
    /// targets.
    pub const fn bounds(self) -> (i32, i32) {
        match self {
            Axis::Horizontal => (0, 1250),
            Axis::Vertical => (0, 400),
        }
    }

    /// Midpoint of the travel range, used for centering.
    pub const fn midpoint(self) -> i32 {
        let (min, max) = self.bounds();
        (min + max) / 2
    }

    /// Parse a textual target value as delivered by transport layers.
    ///
    /// Rejects anything that is not a decimal step count before it can reach
    /// the motion engine. Range is deliberately not checked (see
    /// [`bounds`](Self::bounds)).
    pub fn parse_target(raw: &str) -> MotorResult<i32> {
        raw.trim()
            .parse()
            .map_err(|_| MotorError::InvalidInput(format!("{raw:?} is not a step count")))
    }
}

/// Direction of a single-axis relative move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Relative offset in hardware steps, always derived inside the motion
/// engine rather than requested directly by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MoveDelta {
    pub dx: i32,
    pub dy: i32,
}

impl MoveDelta {
    /// Delta for `steps` steps in `direction`.
    ///
    /// Up is +y, Down is -y, Right is +x, Left is -x. `steps` is a
    /// magnitude and expected to be non-negative.
    pub fn directional(direction: Direction, steps: i32) -> Self {
        match direction {
            Direction::Up => Self { dx: 0, dy: steps },
            Direction::Down => Self { dx: 0, dy: -steps },
            Direction::Right => Self { dx: steps, dy: 0 },
            Direction::Left => Self { dx: -steps, dy: 0 },
        }
    }

    pub fn is_zero(self) -> bool {
        self.dx == 0 && self.dy == 0
    }
}

/// Motion state reported by the firmware.
///
/// Zero is idle; any other code means the motor is still executing a move.
/// The non-zero codes are firmware-defined and carried through verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionState {
    Idle,
    Moving(i32),
}

impl MotionState {
    pub fn from_raw(raw: i32) -> Self {
        if raw == 0 {
            MotionState::Idle
        } else {
            MotionState::Moving(raw)
        }
    }

    pub fn is_idle(self) -> bool {
        matches!(self, MotionState::Idle)
    }
}

/// Snapshot of the motor's position, motion state and speed.
///
/// Only ever produced by querying the hardware. A snapshot is stale the
/// moment a concurrent move starts, so callers re-read rather than cache
/// across operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorStatus {
    pub x: i32,
    pub y: i32,
    pub state: MotionState,
    pub speed: i32,
}

impl MotorStatus {
    /// Position along `axis`.
    pub fn position(&self, axis: Axis) -> i32 {
        match axis {
            Axis::Horizontal => self.x,
            Axis::Vertical => self.y,
        }
    }
}

/// Payload for [`CommandCode::Move`]: signed step deltas for both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct MoveData {
    pub dx: i32,
    pub dy: i32,
}

impl From<MoveDelta> for MoveData {
    fn from(delta: MoveDelta) -> Self {
        Self {
            dx: delta.dx,
            dy: delta.dy,
        }
    }
}

/// Payload for [`CommandCode::Reset`].
///
/// The firmware expects the calibration counters zeroed; it rewrites them
/// itself as part of re-homing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct ResetData {
    pub x_max_steps: u32,
    pub y_max_steps: u32,
    pub x_cur_step: u32,
    pub y_cur_step: u32,
}

/// Out-payload for [`CommandCode::GetStatus`], written by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct StatusData {
    pub x: i32,
    pub y: i32,
    pub state: i32,
    pub speed: i32,
}

impl From<StatusData> for MotorStatus {
    fn from(data: StatusData) -> Self {
        Self {
            x: data.x,
            y: data.y,
            state: MotionState::from_raw(data.state),
            speed: data.speed,
        }
    }
}

/// Payload for [`CommandCode::SetSpeed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct SpeedData {
    pub speed: i32,
}

#[cfg(test)]
mod tests {
    use std::mem::{align_of, size_of};
    use std::str::FromStr;

    use super::*;

    #[test]
    fn command_codes_match_driver_table() {
        assert_eq!(CommandCode::Stop.request(), 1);
        assert_eq!(CommandCode::Reset.request(), 2);
        assert_eq!(CommandCode::Move.request(), 3);
        assert_eq!(CommandCode::GetStatus.request(), 4);
        assert_eq!(CommandCode::SetSpeed.request(), 5);
    }

    #[test]
    fn payload_layouts() {
        assert_eq!(size_of::<MoveData>(), 8);
        assert_eq!(size_of::<ResetData>(), 16);
        assert_eq!(size_of::<StatusData>(), 16);
        assert_eq!(size_of::<SpeedData>(), 4);
        // i32/u32 fields only, so no hidden padding on any target
        assert_eq!(align_of::<MoveData>(), 4);
        assert_eq!(align_of::<ResetData>(), 4);
        assert_eq!(align_of::<StatusData>(), 4);
    }

    #[cfg(target_endian = "little")]
    #[test]
    fn move_payload_is_twos_complement_native_order() {
        let data = MoveData { dx: 1, dy: -1 };
        assert_eq!(
            bytemuck::bytes_of(&data),
            &[0x01, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF]
        );
    }

    #[test]
    fn reset_payload_zeroed() {
        let data = ResetData::zeroed();
        assert_eq!(bytemuck::bytes_of(&data), &[0u8; 16]);
    }

    #[test]
    fn directional_deltas() {
        assert_eq!(
            MoveDelta::directional(Direction::Up, 5),
            MoveDelta { dx: 0, dy: 5 }
        );
        assert_eq!(
            MoveDelta::directional(Direction::Down, 5),
            MoveDelta { dx: 0, dy: -5 }
        );
        assert_eq!(
            MoveDelta::directional(Direction::Right, 7),
            MoveDelta { dx: 7, dy: 0 }
        );
        assert_eq!(
            MoveDelta::directional(Direction::Left, 7),
            MoveDelta { dx: -7, dy: 0 }
        );
        assert!(MoveDelta::directional(Direction::Up, 0).is_zero());
    }

    #[test]
    fn status_decode() {
        let status: MotorStatus = StatusData {
            x: 120,
            y: -3,
            state: 0,
            speed: 1000,
        }
        .into();
        assert_eq!(status.x, 120);
        assert_eq!(status.y, -3);
        assert!(status.state.is_idle());
        assert_eq!(status.speed, 1000);
        assert_eq!(status.position(Axis::Horizontal), 120);
        assert_eq!(status.position(Axis::Vertical), -3);

        let moving: MotorStatus = StatusData {
            x: 0,
            y: 0,
            state: 2,
            speed: 0,
        }
        .into();
        assert_eq!(moving.state, MotionState::Moving(2));
        assert!(!moving.state.is_idle());
    }

    #[test]
    fn axis_bounds_and_midpoints() {
        assert_eq!(Axis::Horizontal.bounds(), (0, 1250));
        assert_eq!(Axis::Vertical.bounds(), (0, 400));
        assert_eq!(Axis::Horizontal.midpoint(), 625);
        assert_eq!(Axis::Vertical.midpoint(), 200);
    }

    #[test]
    fn axis_parses_from_property_names() {
        assert_eq!(Axis::from_str("horizontal").unwrap(), Axis::Horizontal);
        assert_eq!(Axis::from_str("Vertical").unwrap(), Axis::Vertical);
        assert!(Axis::from_str("diagonal").is_err());
    }

    #[test]
    fn target_parsing() {
        assert_eq!(Axis::parse_target("600").unwrap(), 600);
        assert_eq!(Axis::parse_target(" -12 ").unwrap(), -12);
        assert!(matches!(
            Axis::parse_target("fast"),
            Err(MotorError::InvalidInput(_))
        ));
        assert!(matches!(
            Axis::parse_target(""),
            Err(MotorError::InvalidInput(_))
        ));
    }
}
