//! Instrumented in-memory motor port for tests and hardware-free harnesses.
//!
//! [`MockMotor`] behaves as an ideal echoing motor: moves land instantly and
//! status reads reflect the accumulated position, unless a scripted motion
//! state sequence says otherwise. Every command is recorded in issue order so
//! tests can assert exact hardware sequences, and a configurable per-move
//! dwell plus an overlap detector let lock-discipline tests prove that no
//! two moves ever interleave.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use crate::error::{MotorError, MotorResult};
use crate::port::MotorPort;
use crate::protocol::{CommandCode, MotionState, MotorStatus, MoveDelta};

/// A command observed by the mock, in issue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortCommand {
    Stop,
    Reset,
    Move(MoveDelta),
    GetStatus,
    SetSpeed(i32),
}

struct MockState {
    x: i32,
    y: i32,
    speed: i32,
    /// Motion states reported by successive status reads before settling
    /// back on idle.
    scripted_states: VecDeque<MotionState>,
    /// One-shot fault: the next command of this kind fails with the errno.
    fail_next: Option<(CommandCode, i32)>,
    log: Vec<PortCommand>,
}

/// Ideal echoing motor with full command instrumentation.
pub struct MockMotor {
    state: Mutex<MockState>,
    /// Set for the duration of each move; used to detect interleaving.
    move_in_flight: AtomicBool,
    overlap_detected: AtomicBool,
    move_dwell: Duration,
}

impl MockMotor {
    pub fn new() -> Self {
        Self::at(0, 0)
    }

    /// Mock starting at the given position.
    pub fn at(x: i32, y: i32) -> Self {
        Self {
            state: Mutex::new(MockState {
                x,
                y,
                speed: 0,
                scripted_states: VecDeque::new(),
                fail_next: None,
                log: Vec::new(),
            }),
            move_in_flight: AtomicBool::new(false),
            overlap_detected: AtomicBool::new(false),
            move_dwell: Duration::ZERO,
        }
    }

    /// Keep each move "executing" for `dwell`, widening the window in which
    /// an interleaved move would be caught.
    pub fn with_move_dwell(mut self, dwell: Duration) -> Self {
        self.move_dwell = dwell;
        self
    }

    /// Script the motion states reported by the next status reads; once the
    /// script is exhausted the mock reports idle again.
    pub fn script_states(&self, states: impl IntoIterator<Item = MotionState>) {
        self.state
            .lock()
            .unwrap()
            .scripted_states
            .extend(states);
    }

    /// Make the next command of `kind` fail with the given errno.
    pub fn fail_next(&self, kind: CommandCode, errno: i32) {
        self.state.lock().unwrap().fail_next = Some((kind, errno));
    }

    /// Every command issued so far, in order.
    pub fn commands(&self) -> Vec<PortCommand> {
        self.state.lock().unwrap().log.clone()
    }

    /// Only the move commands issued so far, in order.
    pub fn moves(&self) -> Vec<MoveDelta> {
        self.state
            .lock()
            .unwrap()
            .log
            .iter()
            .filter_map(|cmd| match cmd {
                PortCommand::Move(delta) => Some(*delta),
                _ => None,
            })
            .collect()
    }

    /// Forget the command log (scripted states and position are kept).
    pub fn clear_log(&self) {
        self.state.lock().unwrap().log.clear();
    }

    /// Current echoed position.
    pub fn position(&self) -> (i32, i32) {
        let state = self.state.lock().unwrap();
        (state.x, state.y)
    }

    /// Whether two moves were ever observed executing at the same time.
    pub fn overlap_detected(&self) -> bool {
        self.overlap_detected.load(Ordering::SeqCst)
    }

    fn record(&self, command: PortCommand, kind: CommandCode) -> MotorResult<()> {
        let mut state = self.state.lock().unwrap();
        state.log.push(command);
        if let Some((fail_kind, errno)) = state.fail_next {
            if fail_kind == kind {
                state.fail_next = None;
                return Err(MotorError::Hardware {
                    command: kind,
                    source: io::Error::from_raw_os_error(errno),
                });
            }
        }
        Ok(())
    }
}

impl Default for MockMotor {
    fn default() -> Self {
        Self::new()
    }
}

impl MotorPort for MockMotor {
    fn stop(&self) -> MotorResult<()> {
        self.record(PortCommand::Stop, CommandCode::Stop)
    }

    fn reset(&self) -> MotorResult<()> {
        self.record(PortCommand::Reset, CommandCode::Reset)?;
        let mut state = self.state.lock().unwrap();
        state.x = 0;
        state.y = 0;
        Ok(())
    }

    fn move_by(&self, delta: MoveDelta) -> MotorResult<()> {
        self.record(PortCommand::Move(delta), CommandCode::Move)?;

        if self.move_in_flight.swap(true, Ordering::SeqCst) {
            self.overlap_detected.store(true, Ordering::SeqCst);
        }
        if !self.move_dwell.is_zero() {
            thread::sleep(self.move_dwell);
        }
        self.move_in_flight.store(false, Ordering::SeqCst);

        let mut state = self.state.lock().unwrap();
        state.x += delta.dx;
        state.y += delta.dy;
        Ok(())
    }

    fn status(&self) -> MotorResult<MotorStatus> {
        self.record(PortCommand::GetStatus, CommandCode::GetStatus)?;
        let mut state = self.state.lock().unwrap();
        let motion = state
            .scripted_states
            .pop_front()
            .unwrap_or(MotionState::Idle);
        Ok(MotorStatus {
            x: state.x,
            y: state.y,
            state: motion,
            speed: state.speed,
        })
    }

    fn set_speed(&self, speed: i32) -> MotorResult<()> {
        self.record(PortCommand::SetSpeed(speed), CommandCode::SetSpeed)?;
        self.state.lock().unwrap().speed = speed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echoes_moves_into_status() {
        let mock = MockMotor::at(100, 50);
        mock.move_by(MoveDelta { dx: 20, dy: -10 }).unwrap();
        let status = mock.status().unwrap();
        assert_eq!((status.x, status.y), (120, 40));
        assert!(status.state.is_idle());
    }

    #[test]
    fn scripted_states_drain_then_idle() {
        let mock = MockMotor::new();
        mock.script_states([MotionState::Moving(1), MotionState::Moving(1)]);
        assert!(!mock.status().unwrap().state.is_idle());
        assert!(!mock.status().unwrap().state.is_idle());
        assert!(mock.status().unwrap().state.is_idle());
    }

    #[test]
    fn injected_fault_fires_once() {
        let mock = MockMotor::new();
        mock.fail_next(CommandCode::Reset, 5);
        let err = mock.reset().unwrap_err();
        assert!(matches!(
            err,
            MotorError::Hardware {
                command: CommandCode::Reset,
                ..
            }
        ));
        mock.reset().unwrap();
        assert_eq!(mock.commands(), vec![PortCommand::Reset, PortCommand::Reset]);
    }
}
