//! Exponential drive curve applied to stick inputs

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
use super::DriveCurveConfig;
use comms_if::motion::MAX_SPEED;
use util::maths::sgn;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DriveCurveConfig {
    /// Shape a raw stick value (-127 to 127) into a motor output of the same
    /// range.
    ///
    /// Inputs inside the deadband give 0. Outside of it the output starts at
    /// `min_output` and rises exponentially to full scale at full stick.
    pub fn curve(&self, input: f64) -> f64 {
        if input.abs() <= self.deadband {
            return 0.0;
        }

        let g = input.abs() - self.deadband;
        let g_max = MAX_SPEED - self.deadband;

        let i = self.expo_gain.powf(g - MAX_SPEED) * g * sgn(input);
        let i_max = self.expo_gain.powf(g_max - MAX_SPEED) * g_max;

        (MAX_SPEED - self.min_output) / MAX_SPEED * i * MAX_SPEED / i_max
            + self.min_output * sgn(input)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn chassis_curve() -> DriveCurveConfig {
        DriveCurveConfig {
            deadband: 3.0,
            min_output: 10.0,
            expo_gain: 1.019,
        }
    }

    #[test]
    fn test_deadband() {
        let c = chassis_curve();

        for v in [-3.0, -1.0, 0.0, 2.0, 3.0].iter() {
            assert_eq!(c.curve(*v), 0.0);
        }
    }

    #[test]
    fn test_full_scale() {
        let c = chassis_curve();

        assert!((c.curve(127.0) - 127.0).abs() < 1e-9);
        assert!((c.curve(-127.0) + 127.0).abs() < 1e-9);
    }

    #[test]
    fn test_monotonic_and_odd() {
        let c = chassis_curve();

        let mut last = 0.0;
        for v in 4..=127 {
            let out = c.curve(v as f64);
            assert!(out > last);
            assert!(out >= c.min_output);
            assert!((c.curve(-(v as f64)) + out).abs() < 1e-9);
            last = out;
        }
    }

    #[test]
    fn test_linear_with_unit_gain() {
        let c = DriveCurveConfig {
            deadband: 0.0,
            min_output: 0.0,
            expo_gain: 1.0,
        };

        assert!((c.curve(64.0) - 64.0).abs() < 1e-9);
    }
}
