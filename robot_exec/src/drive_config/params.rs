//! Chassis parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::f64::consts::PI;

// Internal
use super::DriveConfigError;
use comms_if::{act::Gearset, motion::MAX_SPEED};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Full chassis description, loaded from `chassis.toml`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChassisParams {
    pub drivetrain: DrivetrainConfig,

    /// Gains of the distance controller.
    pub lateral: ControllerGains,

    /// Gains of the heading controller.
    pub angular: ControllerGains,

    /// Shaping applied to forward/backward stick input.
    pub throttle_curve: DriveCurveConfig,

    /// Shaping applied to turning stick input.
    pub steer_curve: DriveCurveConfig,

    /// Smart port of the inertial sensor, if the chassis has one.
    #[serde(default)]
    pub imu_port: Option<u8>,
}

/// Geometry and gearing of a differential drivetrain.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DrivetrainConfig {
    /// Distance between the centres of the left and right wheels.
    ///
    /// Units: inches
    pub track_width_in: f64,

    pub wheel: WheelType,

    /// Speed of the wheels at full output, after gearing.
    ///
    /// Units: rpm
    pub wheel_rpm: f64,

    /// Sideways slip allowance used when following curved paths.
    pub horizontal_drift: f64,

    /// Signed smart ports of the left motors, negative ports are reversed.
    pub left_motors: Vec<i8>,

    /// Signed smart ports of the right motors, negative ports are reversed.
    pub right_motors: Vec<i8>,

    pub gearset: Gearset,
}

/// Settings for one closed loop controller of the motion facade.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct ControllerGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,

    /// Error magnitude below which the integral term accumulates.
    pub anti_windup: f64,

    /// Error range counted as settled.
    ///
    /// Units: inches for lateral, degrees for angular
    pub small_error_range: f64,

    /// Time spent within `small_error_range` before the motion exits.
    pub small_error_timeout_ms: f64,

    /// Error range counted as nearly settled.
    pub large_error_range: f64,

    /// Time spent within `large_error_range` before the motion exits.
    pub large_error_timeout_ms: f64,

    /// Maximum change of output per control tick, 0 for no limit.
    pub max_acceleration: f64,
}

/// Exponential input curve used during manual driving.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct DriveCurveConfig {
    /// Stick values at or below this magnitude give no output.
    pub deadband: f64,

    /// Output just outside of the deadband.
    pub min_output: f64,

    /// Curvature of the response, 1 is linear.
    pub expo_gain: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Standard omni wheel sizes.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub enum WheelType {
    #[serde(rename = "NEW_2")]
    New2,
    #[serde(rename = "NEW_275")]
    New275,
    #[serde(rename = "OLD_275")]
    Old275,
    #[serde(rename = "NEW_325")]
    New325,
    #[serde(rename = "OLD_325")]
    Old325,
    #[serde(rename = "NEW_4")]
    New4,
    #[serde(rename = "OLD_4")]
    Old4,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl WheelType {
    /// Effective rolling diameter.
    ///
    /// Units: inches
    pub fn diameter_in(&self) -> f64 {
        match self {
            WheelType::New2 => 2.125,
            WheelType::New275 | WheelType::Old275 => 2.75,
            WheelType::New325 | WheelType::Old325 => 3.25,
            WheelType::New4 => 4.0,
            WheelType::Old4 => 4.18,
        }
    }
}

impl DrivetrainConfig {
    /// Ground speed of the chassis at full output.
    ///
    /// Units: inches/second
    pub fn max_linear_speed_ins(&self) -> f64 {
        self.wheel_rpm / 60.0 * PI * self.wheel.diameter_in()
    }

    /// Rate of an on-the-spot turn at full output.
    ///
    /// Units: degrees/second
    pub fn max_turn_rate_degs(&self) -> f64 {
        (2.0 * self.max_linear_speed_ins() / self.track_width_in).to_degrees()
    }

    /// Wheel turns per motor turn.
    pub fn gear_ratio(&self) -> f64 {
        self.wheel_rpm / self.gearset.max_rpm() as f64
    }
}

impl ChassisParams {
    /// Check the configuration is usable, returning the first problem found.
    pub fn validate(&self) -> Result<(), DriveConfigError> {
        let dt = &self.drivetrain;

        if !(dt.track_width_in > 0.0) {
            return Err(DriveConfigError::InvalidTrackWidth(dt.track_width_in));
        }
        if !(dt.wheel_rpm > 0.0) {
            return Err(DriveConfigError::InvalidWheelRpm(dt.wheel_rpm));
        }
        if dt.left_motors.is_empty() {
            return Err(DriveConfigError::EmptyMotorGroup("left"));
        }
        if dt.right_motors.is_empty() {
            return Err(DriveConfigError::EmptyMotorGroup("right"));
        }

        let mut ports = HashSet::new();
        for port in dt.left_motors.iter().chain(dt.right_motors.iter()) {
            if *port == 0 || port.unsigned_abs() > 21 || !ports.insert(port.unsigned_abs()) {
                return Err(DriveConfigError::InvalidMotorPort(*port));
            }
        }

        if let Some(imu) = self.imu_port {
            if imu == 0 || imu > 21 || ports.contains(&imu) {
                return Err(DriveConfigError::InvalidImuPort(imu));
            }
        }

        self.lateral.validate("lateral")?;
        self.angular.validate("angular")?;
        self.throttle_curve.validate("throttle")?;
        self.steer_curve.validate("steer")?;

        Ok(())
    }
}

impl ControllerGains {
    fn validate(&self, gains: &'static str) -> Result<(), DriveConfigError> {
        let fields = [
            ("kp", self.kp),
            ("ki", self.ki),
            ("kd", self.kd),
            ("anti_windup", self.anti_windup),
            ("small_error_range", self.small_error_range),
            ("small_error_timeout_ms", self.small_error_timeout_ms),
            ("large_error_range", self.large_error_range),
            ("large_error_timeout_ms", self.large_error_timeout_ms),
            ("max_acceleration", self.max_acceleration),
        ];

        match fields.iter().find(|(_, v)| !(*v >= 0.0)) {
            Some((field, value)) => Err(DriveConfigError::NegativeGain {
                gains,
                field: *field,
                value: *value,
            }),
            None => Ok(()),
        }
    }
}

impl DriveCurveConfig {
    fn validate(&self, curve: &'static str) -> Result<(), DriveConfigError> {
        if !(0.0 <= self.deadband && self.deadband < self.min_output && self.min_output <= MAX_SPEED) {
            return Err(DriveConfigError::InvalidCurveBounds(
                curve,
                self.deadband,
                self.min_output,
            ));
        }
        if !(self.expo_gain > 0.0) {
            return Err(DriveConfigError::InvalidExpoGain(curve, self.expo_gain));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    pub(crate) const CHASSIS_TOML: &str = r#"
        imu_port = 10

        [drivetrain]
        track_width_in = 10.75
        wheel = "OLD_325"
        wheel_rpm = 450.0
        horizontal_drift = 2.0
        left_motors = [-11, -12, -13]
        right_motors = [20, 19, 18]
        gearset = "Blue"

        [lateral]
        kp = 40.0
        ki = 0.0
        kd = 39.0
        anti_windup = 3.0
        small_error_range = 1.0
        small_error_timeout_ms = 100.0
        large_error_range = 3.0
        large_error_timeout_ms = 500.0
        max_acceleration = 0.0

        [angular]
        kp = 3.0
        ki = 0.0
        kd = 27.0
        anti_windup = 3.0
        small_error_range = 1.0
        small_error_timeout_ms = 100.0
        large_error_range = 3.0
        large_error_timeout_ms = 500.0
        max_acceleration = 0.0

        [throttle_curve]
        deadband = 3.0
        min_output = 10.0
        expo_gain = 1.019

        [steer_curve]
        deadband = 3.0
        min_output = 10.0
        expo_gain = 1.019
    "#;

    pub(crate) fn test_chassis() -> ChassisParams {
        util::params::from_str(CHASSIS_TOML).unwrap()
    }

    #[test]
    fn test_load_and_validate() {
        let p = test_chassis();

        assert_eq!(p.drivetrain.wheel, WheelType::Old325);
        assert_eq!(p.imu_port, Some(10));
        assert!(p.validate().is_ok());

        // 450 rpm on 3.25" wheels
        assert!((p.drivetrain.max_linear_speed_ins() - 76.576).abs() < 1e-3);
    }

    #[test]
    fn test_reject_bad_curve() {
        let mut p = test_chassis();
        p.steer_curve.deadband = 10.0;

        assert!(matches!(
            p.validate(),
            Err(DriveConfigError::InvalidCurveBounds("steer", _, _))
        ));
    }

    #[test]
    fn test_reject_negative_range() {
        let mut p = test_chassis();
        p.angular.large_error_range = -3.0;

        match p.validate() {
            Err(DriveConfigError::NegativeGain { gains, field, .. }) => {
                assert_eq!(gains, "angular");
                assert_eq!(field, "large_error_range");
            }
            r => panic!("Expected NegativeGain, got {:?}", r),
        }
    }

    #[test]
    fn test_gear_ratio() {
        let p = test_chassis();

        // 450 rpm wheels on 600 rpm cartridges
        assert!((p.drivetrain.gear_ratio() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_reject_out_of_range_ports() {
        let mut p = test_chassis();
        p.drivetrain.left_motors[0] = -128;
        assert!(matches!(
            p.validate(),
            Err(DriveConfigError::InvalidMotorPort(-128))
        ));

        let mut p = test_chassis();
        p.drivetrain.right_motors[2] = 22;
        assert!(matches!(
            p.validate(),
            Err(DriveConfigError::InvalidMotorPort(22))
        ));
    }

    #[test]
    fn test_reject_bad_imu_port() {
        let mut p = test_chassis();
        p.imu_port = Some(12);
        assert!(matches!(
            p.validate(),
            Err(DriveConfigError::InvalidImuPort(12))
        ));

        p.imu_port = Some(0);
        assert!(p.validate().is_err());

        p.imu_port = None;
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_reject_duplicate_port() {
        let mut p = test_chassis();
        p.drivetrain.right_motors[0] = 11;

        assert!(matches!(
            p.validate(),
            Err(DriveConfigError::InvalidMotorPort(11))
        ));
    }
}
