//! Telemetry task
//!
//! Low rate background loop started when the robot initialises. Every period
//! it samples the chassis pose and the battery health, writes them to the
//! line display and the telemetry log, and archives them to CSV. Nothing it
//! does can affect control: sink failures are only logged.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, trace, warn};
use serde::{Deserialize, Serialize};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

// Internal
use crate::motion::MotionFacade;
use util::{archive::Archiver, logger::TELEMETRY_TARGET};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of lines written to the display each period.
pub const NUM_DISPLAY_LINES: u8 = 5;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Line oriented display, such as the robot's screen.
pub trait DisplaySink: Send {
    /// Replace the contents of line `line`.
    fn print(&mut self, line: u8, text: &str) -> Result<(), SinkError>;
}

/// Battery health counters.
pub trait HealthSource: Send {
    /// Charge of the controller battery in percent.
    fn battery_capacity(&self) -> i32;

    /// Main battery voltage.
    ///
    /// Units: millivolts
    fn battery_voltage_mv(&self) -> i32;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the telemetry task, loaded from `telemetry.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelemetryParams {
    pub period_ms: u64,

    /// Archive every sample to `telemetry/pose.csv`.
    pub archive: bool,
}

/// Handle on the running telemetry task.
///
/// Dropping the handle stops the task.
pub struct Telemetry {
    stop: Arc<AtomicBool>,

    handle: Option<JoinHandle<TelemetryReport>>,
}

/// Counters kept by the telemetry task.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TelemetryReport {
    pub num_samples: u64,

    pub num_sink_errors: u64,

    pub num_archive_errors: u64,
}

/// Display sink writing each line to the log on the telemetry target.
#[derive(Debug, Default)]
pub struct LogDisplay;

/// Health source used on the host, a slowly discharging battery.
#[derive(Debug)]
pub struct SimHealth {
    started: Instant,
}

/// One archived telemetry sample.
#[derive(Debug, Clone, Copy, Serialize)]
struct Sample {
    time_s: f64,
    x: f64,
    y: f64,
    theta: f64,
    battery_capacity: i32,
    battery_voltage_mv: i32,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Display line {0} does not exist")]
    InvalidLine(u8),

    #[error("The display is not available")]
    Unavailable,
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Could not start the telemetry task: {0}")]
    SpawnFailed(std::io::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for TelemetryParams {
    fn default() -> Self {
        Self {
            period_ms: 50,
            archive: true,
        }
    }
}

impl Telemetry {
    /// Start the telemetry task.
    pub fn spawn(
        drive: Arc<dyn MotionFacade>,
        mut sink: Box<dyn DisplaySink>,
        health: Box<dyn HealthSource>,
        mut archiver: Option<Archiver>,
        params: &TelemetryParams,
    ) -> Result<Self, TelemetryError> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();
        let period = Duration::from_millis(params.period_ms);

        let handle = thread::Builder::new()
            .name(String::from("telemetry"))
            .spawn(move || {
                let started = Instant::now();
                let mut report = TelemetryReport::default();
                let mut sink_failing = false;
                let mut archive_failing = false;

                while !thread_stop.load(Ordering::Relaxed) {
                    let period_start = Instant::now();

                    let pose = drive.get_pose();
                    let sample = Sample {
                        time_s: started.elapsed().as_secs_f64(),
                        x: pose.x,
                        y: pose.y,
                        theta: pose.theta,
                        battery_capacity: health.battery_capacity(),
                        battery_voltage_mv: health.battery_voltage_mv(),
                    };
                    report.num_samples += 1;

                    let lines = [
                        format!("X: {:.3}", sample.x),
                        format!("Y: {:.3}", sample.y),
                        format!("Theta: {:.3}", sample.theta),
                        format!("Battery Capacity: {}", sample.battery_capacity),
                        format!("Battery Voltage: {}", sample.battery_voltage_mv),
                    ];

                    let result = lines
                        .iter()
                        .enumerate()
                        .try_for_each(|(i, text)| sink.print(i as u8, text));

                    match result {
                        Ok(()) => sink_failing = false,
                        Err(e) => {
                            report.num_sink_errors += 1;
                            if !sink_failing {
                                warn!("Telemetry display failed: {}", e);
                                sink_failing = true;
                            }
                        }
                    }

                    info!(target: TELEMETRY_TARGET, "Chassis pose: {}", pose);

                    if let Some(ref mut arch) = archiver {
                        match arch.serialise(sample) {
                            Ok(()) => archive_failing = false,
                            Err(e) => {
                                report.num_archive_errors += 1;
                                if !archive_failing {
                                    warn!("Telemetry archive failed: {}", e);
                                    archive_failing = true;
                                }
                            }
                        }
                    }

                    if let Some(d) = period.checked_sub(period_start.elapsed()) {
                        thread::sleep(d);
                    }
                }

                report
            })
            .map_err(TelemetryError::SpawnFailed)?;

        info!("Telemetry task started ({} ms period)", params.period_ms);

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Stop the task and wait for it to exit.
    pub fn stop(mut self) -> TelemetryReport {
        self.join()
    }

    fn join(&mut self) -> TelemetryReport {
        self.stop.store(true, Ordering::Relaxed);

        match self.handle.take().map(|h| h.join()) {
            Some(Ok(report)) => {
                info!(
                    "Telemetry task stopped after {} samples",
                    report.num_samples
                );
                report
            }
            Some(Err(_)) => {
                warn!("Telemetry task panicked");
                TelemetryReport::default()
            }
            None => TelemetryReport::default(),
        }
    }
}

impl Drop for Telemetry {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.join();
        }
    }
}

impl DisplaySink for LogDisplay {
    fn print(&mut self, line: u8, text: &str) -> Result<(), SinkError> {
        if line >= NUM_DISPLAY_LINES {
            return Err(SinkError::InvalidLine(line));
        }

        trace!(target: TELEMETRY_TARGET, "[{}] {}", line, text);
        Ok(())
    }
}

impl SimHealth {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for SimHealth {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthSource for SimHealth {
    fn battery_capacity(&self) -> i32 {
        // One percent every ten seconds
        let used = (self.started.elapsed().as_secs() / 10) as i32;
        (100 - used).max(0)
    }

    fn battery_voltage_mv(&self) -> i32 {
        let used = (self.started.elapsed().as_millis() / 100) as i32;
        (12_800 - used).max(11_000)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
