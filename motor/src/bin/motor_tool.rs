//! CLI tool for exercising the pan/tilt mount motor.
//!
//! Drives the motor character device directly through the controller:
//! - `status`: print position, motion state, speed and axis bounds
//! - `set`: move an axis to an absolute position
//! - `incr`: move an axis by a signed number of steps
//! - `center`: move to the midpoint of both axis ranges
//! - `park`: move to the origin
//! - `calibrate`: re-home the motor
//! - `stop`: halt the current motion
//! - `speed`: change the step rate

#[cfg(target_os = "linux")]
mod tool {
    use std::time::Duration;

    use anyhow::{Context, Result};
    use clap::{Parser, Subcommand};
    use motor::{Axis, Controller, ControllerConfig, DevMotor, DEFAULT_DEVICE, DEFAULT_SPEED};
    use strum::IntoEnumIterator;

    /// Pan/tilt mount motor control tool
    #[derive(Parser, Debug)]
    #[command(name = "motor_tool")]
    #[command(about = "Control tool for the pan/tilt mount motor")]
    #[command(version)]
    struct Args {
        /// Motor control device path
        #[arg(long, global = true, default_value = DEFAULT_DEVICE)]
        device: String,

        /// Initial step rate sent at startup
        #[arg(long, global = true, default_value_t = DEFAULT_SPEED)]
        speed: i32,

        /// Give up waiting for a move after this many seconds (default: wait forever)
        #[arg(long, global = true)]
        wait_timeout: Option<u64>,

        #[command(subcommand)]
        command: Command,
    }

    #[derive(Subcommand, Debug)]
    enum Command {
        /// Print position, motion state, speed and axis bounds
        Status,

        /// Move an axis to an absolute position
        Set {
            /// Axis to move (horizontal or vertical)
            axis: Axis,

            /// Target position in steps
            target: String,
        },

        /// Move an axis by a signed number of steps
        Incr {
            /// Axis to move (horizontal or vertical)
            axis: Axis,

            /// Signed step count (positive is up/right)
            #[arg(allow_hyphen_values = true)]
            steps: i32,
        },

        /// Move to the midpoint of both axis ranges
        Center,

        /// Move to the origin
        Park,

        /// Re-home the motor
        Calibrate,

        /// Halt the current motion
        Stop,

        /// Change the step rate for subsequent moves
        Speed {
            /// Step rate
            value: i32,
        },
    }

    pub fn run() -> Result<()> {
        tracing_subscriber::fmt::init();

        let args = Args::parse();

        let config = ControllerConfig {
            initial_speed: args.speed,
            wait_deadline: args.wait_timeout.map(Duration::from_secs),
            ..ControllerConfig::default()
        };
        let device = DevMotor::open(&args.device)
            .with_context(|| format!("opening motor device {}", args.device))?;
        let controller = Controller::with_config(device, config)?;

        match args.command {
            Command::Status => {
                let status = controller.status()?;
                println!(
                    "Position: ({}, {})  state: {:?}  speed: {}",
                    status.x, status.y, status.state, status.speed
                );
                for axis in Axis::iter() {
                    let (min, max) = axis.bounds();
                    println!("{axis}: {} (range {min}-{max})", status.position(axis));
                }
            }
            Command::Set { axis, target } => {
                let target = Axis::parse_target(&target)?;
                controller.set(axis, target)?;
                println!("{axis} -> {}", controller.status()?.position(axis));
            }
            Command::Incr { axis, steps } => {
                controller.increment(axis, steps)?;
                println!("{axis} -> {}", controller.status()?.position(axis));
            }
            Command::Center => {
                controller.center()?;
                let status = controller.status()?;
                println!("Centered at ({}, {})", status.x, status.y);
            }
            Command::Park => {
                controller.park()?;
                println!("Parked at origin");
            }
            Command::Calibrate => {
                controller.calibrate()?;
                println!("Calibrated");
            }
            Command::Stop => {
                controller.stop()?;
                println!("Stopped");
            }
            Command::Speed { value } => {
                controller.set_speed(value)?;
                println!("Speed set to {value}");
            }
        }

        controller.close();
        Ok(())
    }
}

#[cfg(target_os = "linux")]
fn main() -> anyhow::Result<()> {
    tool::run()
}

#[cfg(not(target_os = "linux"))]
fn main() {
    eprintln!("motor_tool drives the motor character device and only runs on Linux");
    std::process::exit(1);
}
