//! Mount motor controller: motion sequencing, calibration and lifecycle.
//!
//! [`Controller`] owns the hardware port and the two locks that make the
//! single physical motor safe to drive from concurrent transport handlers:
//!
//! - the **movement lock** is held for the full duration of every motion
//!   request, including the idle-poll loop, so exactly one move (and its
//!   completion) is in flight at a time process-wide;
//! - the **calibration lock** keeps public status reads from interleaving
//!   with an in-progress re-home.
//!
//! All blocking is synchronous in the calling thread: an axis operation may
//! block for seconds, bounded only by hardware motion time and the
//! configured wait deadline (unbounded by default). No operation is
//! cancellable once dispatched; [`stop`](Controller::stop) goes through the
//! same serialized path and therefore queues behind a move already in
//! flight.
//!
//! While the controller is disabled (mount parked on disarm), every hardware
//! command fails fast with [`MotorError::Disabled`] before touching the
//! device.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use tracing::{debug, info};

use crate::error::{MotorError, MotorResult};
use crate::port::MotorPort;
use crate::protocol::{Axis, Direction, MotorStatus, MoveDelta};
use crate::signal::CaptureTrigger;

/// Step rate commanded once at construction.
pub const DEFAULT_SPEED: i32 = 1000;

/// Interval between status polls while waiting for a move to finish.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Construction-time settings for [`Controller`].
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Step rate sent to the firmware at startup.
    pub initial_speed: i32,
    /// Interval between status polls while a move completes.
    pub poll_interval: Duration,
    /// Upper bound on a single wait for idle.
    ///
    /// `None` waits forever, matching the firmware contract: a fault that
    /// never reports idle stalls the calling operation rather than being
    /// silently bounded. Set a deadline to surface [`MotorError::Timeout`]
    /// instead.
    pub wait_deadline: Option<Duration>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            initial_speed: DEFAULT_SPEED,
            poll_interval: POLL_INTERVAL,
            wait_deadline: None,
        }
    }
}

/// Serialized access to the single mount motor.
///
/// Exactly one controller exists per physical device. It takes exclusive
/// ownership of the port at construction and releases it when dropped or
/// [`close`](Self::close)d; no other component issues hardware commands.
pub struct Controller<M: MotorPort> {
    port: M,
    /// Held for the full duration of any motion request.
    movement: Mutex<()>,
    /// Orders calibration against public status reads; guards the
    /// calibration timestamp.
    calibration: Mutex<Option<SystemTime>>,
    disabled: AtomicBool,
    capture: Option<CaptureTrigger>,
    config: ControllerConfig,
}

impl<M: MotorPort> Controller<M> {
    /// Take ownership of `port` and bring the motor up at the default speed.
    pub fn new(port: M) -> MotorResult<Self> {
        Self::with_config(port, ControllerConfig::default())
    }

    /// Take ownership of `port` with explicit settings.
    ///
    /// Sends the initial SetSpeed unconditionally; a failure here is fatal
    /// to controller startup, like a failed device open.
    pub fn with_config(port: M, config: ControllerConfig) -> MotorResult<Self> {
        let controller = Self {
            port,
            movement: Mutex::new(()),
            calibration: Mutex::new(None),
            disabled: AtomicBool::new(false),
            capture: None,
            config,
        };
        controller.checked()?.set_speed(controller.config.initial_speed)?;
        info!(
            speed = controller.config.initial_speed,
            "motor controller initialized"
        );
        Ok(controller)
    }

    /// Attach a capture trigger, raised after every successful axis
    /// operation so the camera collaborator can take a confirmatory frame.
    pub fn with_capture(mut self, capture: CaptureTrigger) -> Self {
        self.capture = Some(capture);
        self
    }

    /// Gate every hardware command on the disabled flag.
    ///
    /// Fails fast without touching the device while the mount is parked.
    fn checked(&self) -> MotorResult<&M> {
        if self.disabled.load(Ordering::Acquire) {
            return Err(MotorError::Disabled);
        }
        Ok(&self.port)
    }

    fn raw_status(&self) -> MotorResult<MotorStatus> {
        self.checked()?.status()
    }

    /// Poll until the firmware reports idle.
    fn wait_idle(&self) -> MotorResult<()> {
        let started = Instant::now();
        loop {
            if self.raw_status()?.state.is_idle() {
                return Ok(());
            }
            if let Some(deadline) = self.config.wait_deadline {
                if started.elapsed() >= deadline {
                    return Err(MotorError::Timeout);
                }
            }
            thread::sleep(self.config.poll_interval);
        }
    }

    /// Single-axis relative move: issue the command, then block until idle.
    ///
    /// Caller holds the movement lock. `steps` is a magnitude.
    fn move_directional(&self, direction: Direction, steps: i32) -> MotorResult<()> {
        debug!("motor: {steps} steps {direction}");
        self.checked()?
            .move_by(MoveDelta::directional(direction, steps))?;
        self.wait_idle()
    }

    /// Combined absolute move on both axes, the only true diagonal path.
    ///
    /// Caller holds the movement lock.
    fn go_to(&self, x: i32, y: i32) -> MotorResult<()> {
        let current = self.raw_status()?;
        let delta = MoveDelta {
            dx: Self::saturating_delta(current.x, x),
            dy: Self::saturating_delta(current.y, y),
        };
        debug!("motor: absolute move to ({x}, {y}), delta ({}, {})", delta.dx, delta.dy);
        self.checked()?.move_by(delta)?;
        self.wait_idle()
    }

    /// Signed step delta from `current` to `target`.
    ///
    /// Saturated to `[-i32::MAX, i32::MAX]` so the magnitude negation in
    /// [`MoveDelta::directional`] cannot overflow for extreme targets.
    fn saturating_delta(current: i32, target: i32) -> i32 {
        (i64::from(target) - i64::from(current))
            .clamp(-i64::from(i32::MAX), i64::from(i32::MAX)) as i32
    }

    fn axis_direction(axis: Axis, steps: i32) -> Direction {
        match (axis, steps > 0) {
            (Axis::Horizontal, true) => Direction::Right,
            (Axis::Horizontal, false) => Direction::Left,
            (Axis::Vertical, true) => Direction::Up,
            (Axis::Vertical, false) => Direction::Down,
        }
    }

    /// Best-effort capture request after a completed operation.
    fn notify_capture(&self) {
        if let Some(capture) = &self.capture {
            capture.request();
        }
    }

    /// Move `axis` to the absolute position `target`.
    ///
    /// Reads the current position, then moves by the signed difference. A
    /// target equal to the current position issues no move command. The
    /// target is not clamped to [`Axis::bounds`]; the firmware owns
    /// rejection.
    pub fn set(&self, axis: Axis, target: i32) -> MotorResult<()> {
        let _guard = self.movement.lock().unwrap();
        let current = self.raw_status()?.position(axis);
        let steps = Self::saturating_delta(current, target);
        if steps != 0 {
            self.move_directional(Self::axis_direction(axis, steps), steps.abs())?;
        }
        self.notify_capture();
        Ok(())
    }

    /// Move `axis` by a signed number of steps.
    ///
    /// Positive steps move up/right, negative down/left. Zero is a no-op:
    /// nothing is sent to the hardware.
    pub fn increment(&self, axis: Axis, steps: i32) -> MotorResult<()> {
        let _guard = self.movement.lock().unwrap();
        // i32::MIN has no positive counterpart; saturate so the magnitude
        // cannot overflow below.
        let steps = steps.max(-i32::MAX);
        if steps != 0 {
            self.move_directional(Self::axis_direction(axis, steps), steps.abs())?;
        }
        self.notify_capture();
        Ok(())
    }

    /// Move to the midpoint of both axis ranges.
    pub fn center(&self) -> MotorResult<()> {
        let _guard = self.movement.lock().unwrap();
        self.go_to(Axis::Horizontal.midpoint(), Axis::Vertical.midpoint())?;
        self.notify_capture();
        Ok(())
    }

    /// Park the mount at its origin. Used on disarm, before disabling.
    pub fn park(&self) -> MotorResult<()> {
        let _guard = self.movement.lock().unwrap();
        self.go_to(0, 0)
    }

    /// Halt the current motion.
    ///
    /// Goes through the serialized movement path, so in practice a move
    /// already in flight completes before the stop lands.
    pub fn stop(&self) -> MotorResult<()> {
        let _guard = self.movement.lock().unwrap();
        self.checked()?.stop()
    }

    /// Snapshot the motor's position, motion state and speed.
    ///
    /// Never answered from a cache; each call queries the hardware.
    pub fn status(&self) -> MotorResult<MotorStatus> {
        let _guard = self.calibration.lock().unwrap();
        self.raw_status()
    }

    /// Re-home the motor and record the calibration time.
    ///
    /// A failed reset is propagated and leaves the previous calibration
    /// record in place.
    pub fn calibrate(&self) -> MotorResult<()> {
        let mut calibrated = self.calibration.lock().unwrap();
        self.checked()?.reset()?;
        *calibrated = Some(SystemTime::now());
        info!("motor recalibrated");
        Ok(())
    }

    /// Time of the last successful calibration, if any.
    pub fn last_calibrated(&self) -> Option<SystemTime> {
        *self.calibration.lock().unwrap()
    }

    /// Change the step rate for subsequent moves.
    pub fn set_speed(&self, speed: i32) -> MotorResult<()> {
        self.checked()?.set_speed(speed)
    }

    /// Re-accept hardware commands after a park.
    pub fn enable(&self) {
        let _guard = self.movement.lock().unwrap();
        self.disabled.store(false, Ordering::Release);
        info!("motor controller enabled");
    }

    /// Reject all hardware commands until [`enable`](Self::enable).
    ///
    /// Acquires the movement lock before flipping the flag, so the
    /// transition is strictly ordered against axis operations: a move that
    /// already started completes before the flag takes effect.
    pub fn disable(&self) {
        let _guard = self.movement.lock().unwrap();
        self.disabled.store(true, Ordering::Release);
        info!("motor controller disabled");
    }

    /// Whether the controller currently rejects hardware commands.
    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::Acquire)
    }

    /// Release the device handle.
    ///
    /// Dropping has the same effect regardless of the enabled state; this
    /// just makes shutdown explicit at the call site.
    pub fn close(self) {
        debug!("motor controller closed");
    }
}
