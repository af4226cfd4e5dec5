//! Simulated chassis
//!
//! Kinematic stand-in for the motion stack used when running on the host.
//! Motions travel in straight lines and turn in place at the drivetrain's top
//! speed (scaled by the motion's `max_speed`), there is no closed loop
//! control and no sensor noise.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, trace, warn};
use nalgebra::Vector2;
use serde::Deserialize;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, MutexGuard,
};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

// Internal
use super::{MotionError, MotionFacade};
use crate::drive_config::{ChassisParams, DriveCurveConfig};
use comms_if::motion::{AngularDirection, MotionCmd, MotionOpts, Pose, MAX_SPEED};
use util::maths::{clamp, get_ang_dist_deg, rem_euclid, sgn, wrap_deg};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Distance from a target point counted as arrived.
///
/// Units: inches
const POS_TOLERANCE_IN: f64 = 0.05;

/// Angle from a target heading counted as arrived.
///
/// Units: degrees
const ANG_TOLERANCE_DEG: f64 = 0.05;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the simulated chassis, loaded from `sim.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimParams {
    /// Period of the simulation thread.
    pub tick_ms: u64,

    /// Multiplier applied to every speed, values above 1 run faster than the
    /// real robot.
    pub speed_scale: f64,
}

/// Simulated chassis implementing [`MotionFacade`].
///
/// The chassis state is advanced by a dedicated thread, stopped and joined
/// when the chassis is dropped.
pub struct SimChassis {
    state: Arc<Mutex<SimState>>,

    params: ChassisParams,

    stop: Arc<AtomicBool>,

    sim_thread: Option<JoinHandle<()>>,
}

/// Speeds and curves the simulation needs from the chassis parameters.
#[derive(Debug, Clone)]
struct ChassisModel {
    /// Units: inches/second
    max_speed_ins: f64,

    /// Units: degrees/second
    max_turn_rate_degs: f64,

    /// Units: inches
    track_width_in: f64,

    throttle_curve: DriveCurveConfig,

    speed_scale: f64,
}

#[derive(Debug, Default)]
struct SimState {
    pose: Pose,

    calibrated: bool,

    motion: Option<ActiveMotion>,

    /// Last tank command, raw stick units.
    tank: (f64, f64),
}

#[derive(Debug)]
struct ActiveMotion {
    cmd: MotionCmd,

    /// Simulated time since the motion started.
    elapsed_ms: f64,

    /// Distance (inches) or angle (degrees) covered so far.
    distance: f64,

    /// Move to pose drives to the point first then turns.
    turning: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SimParams {
    fn default() -> Self {
        Self {
            tick_ms: 10,
            speed_scale: 1.0,
        }
    }
}

impl SimChassis {
    /// Create the chassis and start its simulation thread.
    ///
    /// The configuration is only checked by [`MotionFacade::calibrate`].
    pub fn new(params: ChassisParams, sim_params: &SimParams) -> Result<Self, MotionError> {
        let state = Arc::new(Mutex::new(SimState::default()));
        let stop = Arc::new(AtomicBool::new(false));

        let model = ChassisModel::new(&params, sim_params.speed_scale);
        let tick = Duration::from_millis(sim_params.tick_ms.max(1));

        let thread_state = state.clone();
        let thread_stop = stop.clone();
        let sim_thread = thread::Builder::new()
            .name(String::from("sim_chassis"))
            .spawn(move || {
                while !thread_stop.load(Ordering::Relaxed) {
                    let tick_start = Instant::now();

                    thread_state
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .step(tick.as_secs_f64(), &model);

                    if let Some(d) = tick.checked_sub(tick_start.elapsed()) {
                        thread::sleep(d);
                    }
                }
            })
            .map_err(MotionError::ControlTaskSpawn)?;

        Ok(Self {
            state,
            params,
            stop,
            sim_thread: Some(sim_thread),
        })
    }

    fn lock(&self) -> MutexGuard<SimState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start a motion once the previous one has ended.
    fn start(&self, cmd: MotionCmd) {
        self.wait_until_done();

        let mut state = self.lock();
        if !state.calibrated {
            warn!("Motion {:?} ignored, the chassis is not calibrated", cmd);
            return;
        }

        trace!("Starting motion {:?}", cmd);
        state.tank = (0.0, 0.0);
        state.motion = Some(ActiveMotion {
            cmd,
            elapsed_ms: 0.0,
            distance: 0.0,
            turning: false,
        });
    }
}

impl Drop for SimChassis {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(h) = self.sim_thread.take() {
            h.join().ok();
        }
    }
}

impl MotionFacade for SimChassis {
    fn calibrate(&self) -> Result<(), MotionError> {
        self.params.validate()?;

        let mut state = self.lock();
        state.pose = Pose::default();
        state.motion = None;
        state.calibrated = true;

        let dt = &self.params.drivetrain;
        info!(
            "Chassis calibrated, {:?} cartridges at {:.2}:1, top speed {:.1} in/s",
            dt.gearset,
            dt.gear_ratio(),
            dt.max_linear_speed_ins()
        );
        match self.params.imu_port {
            Some(port) => info!("Heading from the IMU on port {}", port),
            None => info!("No IMU configured"),
        }

        Ok(())
    }

    fn set_pose(&self, pose: Pose) {
        debug!("Pose set to {}", pose);
        self.lock().pose = pose;
    }

    fn get_pose(&self) -> Pose {
        self.lock().pose
    }

    fn move_to_point(&self, x: f64, y: f64, timeout_ms: u32, opts: MotionOpts) {
        self.start(MotionCmd::MoveToPoint {
            x,
            y,
            timeout_ms,
            opts,
        })
    }

    fn move_to_pose(&self, x: f64, y: f64, heading: f64, timeout_ms: u32, opts: MotionOpts) {
        self.start(MotionCmd::MoveToPose {
            x,
            y,
            heading,
            timeout_ms,
            opts,
        })
    }

    fn turn_to_heading(&self, heading: f64, timeout_ms: u32, opts: MotionOpts) {
        self.start(MotionCmd::TurnToHeading {
            heading,
            timeout_ms,
            opts,
        })
    }

    fn tank(&self, left: i32, right: i32) {
        let limit = MAX_SPEED;
        self.lock().tank = (
            clamp(&(left as f64), &-limit, &limit),
            clamp(&(right as f64), &-limit, &limit),
        );
    }

    fn cancel_motion(&self) {
        if self.lock().motion.take().is_some() {
            debug!("Motion cancelled");
        }
    }

    fn is_in_motion(&self) -> bool {
        self.lock().motion.is_some()
    }

    fn distance_traveled(&self) -> Option<f64> {
        self.lock().motion.as_ref().map(|m| m.distance)
    }
}

impl ChassisModel {
    fn new(params: &ChassisParams, speed_scale: f64) -> Self {
        Self {
            max_speed_ins: params.drivetrain.max_linear_speed_ins(),
            max_turn_rate_degs: params.drivetrain.max_turn_rate_degs(),
            track_width_in: params.drivetrain.track_width_in,
            throttle_curve: params.throttle_curve,
            speed_scale,
        }
    }
}

impl SimState {
    /// Advance the simulation by `dt_s` seconds.
    fn step(&mut self, dt_s: f64, model: &ChassisModel) {
        let mut motion = match self.motion.take() {
            Some(m) => m,
            None => {
                self.step_tank(dt_s, model);
                return;
            }
        };

        motion.elapsed_ms += dt_s * 1000.0;
        if motion.elapsed_ms > motion.cmd.timeout_ms() as f64 {
            debug!(
                "Motion timed out after {} ms at {}",
                motion.cmd.timeout_ms(),
                self.pose
            );
            return;
        }

        let opts = *motion.cmd.opts();
        let output =
            clamp(&(opts.max_speed as f64), &0.0, &MAX_SPEED) / MAX_SPEED * model.speed_scale;
        let max_travel = model.max_speed_ins * output * dt_s;
        let max_turn = model.max_turn_rate_degs * output * dt_s;

        let cmd = motion.cmd;
        let done = match cmd {
            MotionCmd::MoveToPoint { x, y, .. } => self.drive_towards(
                &mut motion,
                Vector2::new(x, y),
                max_travel,
            ),
            MotionCmd::MoveToPose { x, y, heading, .. } => {
                if !motion.turning {
                    motion.turning =
                        self.drive_towards(&mut motion, Vector2::new(x, y), max_travel);
                    false
                } else {
                    self.turn_towards(&mut motion, heading, AngularDirection::Either, max_turn)
                }
            }
            MotionCmd::TurnToHeading { heading, .. } => {
                self.turn_towards(&mut motion, heading, opts.direction, max_turn)
            }
        };

        if !done {
            self.motion = Some(motion);
        }
    }

    /// Drive in a straight line towards `target`, returning `true` on
    /// arrival.
    fn drive_towards(
        &mut self,
        motion: &mut ActiveMotion,
        target: Vector2<f64>,
        max_travel: f64,
    ) -> bool {
        let opts = motion.cmd.opts();
        let exit_range = opts.early_exit_range.max(POS_TOLERANCE_IN);

        let position = Vector2::new(self.pose.x, self.pose.y);
        let to_target = target - position;
        let remaining = to_target.norm();

        if remaining <= exit_range {
            return true;
        }

        let direction = to_target / remaining;
        let travel = max_travel.min(remaining);
        let new_position = position + direction * travel;

        // Heading of the direction of travel, 0 along +Y and clockwise positive
        let travel_heading = direction.x.atan2(direction.y).to_degrees();

        self.pose.x = new_position.x;
        self.pose.y = new_position.y;
        self.pose.theta = match opts.forwards {
            true => wrap_deg(travel_heading),
            false => wrap_deg(travel_heading + 180.0),
        };
        motion.distance += travel;

        remaining - travel <= exit_range
    }

    /// Turn in place towards `heading`, returning `true` on arrival.
    fn turn_towards(
        &mut self,
        motion: &mut ActiveMotion,
        heading: f64,
        direction: AngularDirection,
        max_turn: f64,
    ) -> bool {
        let exit_range = motion.cmd.opts().early_exit_range.max(ANG_TOLERANCE_DEG);

        let remaining = match direction {
            AngularDirection::Either => get_ang_dist_deg(self.pose.theta, heading),
            AngularDirection::Cw => rem_euclid(heading - self.pose.theta, 360.0),
            AngularDirection::Ccw => -rem_euclid(self.pose.theta - heading, 360.0),
        };

        if remaining.abs() <= exit_range {
            return true;
        }

        let turn = max_turn.min(remaining.abs());
        self.pose.theta = wrap_deg(self.pose.theta + turn * sgn(remaining));
        motion.distance += turn;

        remaining.abs() - turn <= exit_range
    }

    /// Open loop differential drive from the last tank command.
    fn step_tank(&mut self, dt_s: f64, model: &ChassisModel) {
        let (left, right) = self.tank;
        if left == 0.0 && right == 0.0 {
            return;
        }

        let scale = model.max_speed_ins * model.speed_scale / MAX_SPEED;
        let v_left = model.throttle_curve.curve(left) * scale;
        let v_right = model.throttle_curve.curve(right) * scale;

        let v = 0.5 * (v_left + v_right);
        let omega_degs = ((v_left - v_right) / model.track_width_in).to_degrees();

        self.pose.theta = wrap_deg(self.pose.theta + omega_degs * dt_s);
        let theta_rad = self.pose.theta.to_radians();
        self.pose.x += v * dt_s * theta_rad.sin();
        self.pose.y += v * dt_s * theta_rad.cos();
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
