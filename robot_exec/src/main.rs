//! Main robot executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Main loop:
//!         - Event script processing:
//!             - Phase events are passed to the phase manager
//!             - Controller snapshots are fed to the teleop input
//!         - Cycle management
//!
//! All control work happens outside of the main loop: the phase task runs
//! the autonomous routine or the teleop loop, the telemetry task samples the
//! chassis and the simulated chassis advances in its own thread.

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use robot_lib::{
    act_ctrl::{self, ActCtrl, SimActDriver},
    auto_seq::{routines, AutoSeq, AutoSeqParams},
    drive_config::ChassisParams,
    motion::{MotionFacade, SimChassis, SimParams},
    phase::{Modes, PhaseError, PhaseMgr, Robot},
    telemetry::{LogDisplay, SimHealth, TelemetryParams},
    teleop::{ScriptedInput, TeleopCtrl},
};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use comms_if::tc::Tc;
use util::{
    archive::Archiver,
    logger::{logger_init, LevelFilter},
    module::State,
    params,
    script_interpreter::{PendingTcs, ScriptInterpreter},
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Target period of one cycle.
const CYCLE_PERIOD_S: f64 = 0.01;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Competition robot executable, run on the host against the simulated
/// chassis.
#[derive(Debug, StructOpt)]
#[structopt(name = "robot_exec")]
struct Opt {
    /// Event script standing in for the field controller.
    #[structopt(parse(from_os_str))]
    script: Option<PathBuf>,

    /// Chassis parameter file, relative to $ROBOT_SW_ROOT/params.
    #[structopt(long, default_value = "chassis.toml")]
    chassis: String,

    /// Minimum log level: info, debug or trace.
    #[structopt(long, default_value = "trace")]
    log_level: LevelFilter,

    /// Print the selected autonomous routine as JSON and exit.
    #[structopt(long)]
    dump_routine: bool,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    let opt = Opt::from_args();

    if opt.dump_routine {
        let json = serde_json::to_string_pretty(&routines::selected())
            .wrap_err("Failed to serialise the routine")?;
        println!("{}", json);
        return Ok(());
    }

    let script_path = opt
        .script
        .clone()
        .ok_or_else(|| eyre!("An event script is required unless --dump-routine is given"))?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("robot_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(opt.log_level, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Robot Executable\n");
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI options: {:?}", opt);

    // ---- LOAD PARAMETERS ----

    let chassis_params: ChassisParams =
        params::load(&opt.chassis).wrap_err("Could not load chassis params")?;
    let act_params: act_ctrl::Params =
        params::load("actuators.toml").wrap_err("Could not load actuator params")?;
    let auto_seq_params: AutoSeqParams =
        params::load("auto_seq.toml").wrap_err("Could not load sequencer params")?;
    let telem_params: TelemetryParams =
        params::load("telemetry.toml").wrap_err("Could not load telemetry params")?;
    let sim_params: SimParams = params::load("sim.toml").wrap_err("Could not load sim params")?;

    info!("Exec parameters loaded");

    // ---- LOAD SCRIPT ----

    info!("Loading script from {:?}", script_path);

    let mut si = ScriptInterpreter::new(&script_path).wrap_err("Failed to load script")?;

    info!(
        "Loaded script lasts {:.02} s and contains {} events\n",
        si.get_duration(),
        si.get_num_tcs()
    );

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let drive: Arc<dyn MotionFacade> = Arc::new(
        SimChassis::new(chassis_params, &sim_params)
            .wrap_err("Failed to initialise the chassis")?,
    );
    info!("SimChassis init complete");

    let acts = ActCtrl::new(&act_params, Box::new(SimActDriver))
        .wrap_err("Failed to initialise ActCtrl")?;
    info!("ActCtrl init complete");

    let mut teleop = TeleopCtrl::default();
    teleop
        .init("teleop.toml")
        .wrap_err("Failed to initialise TeleopCtrl")?;
    info!("TeleopCtrl init complete");

    let (input, input_feed) = ScriptedInput::new();

    let telem_archiver = match telem_params.archive {
        true => Some(
            Archiver::from_path(&session, "telemetry/pose.csv")
                .wrap_err("Failed to create the telemetry archive")?,
        ),
        false => None,
    };

    let routine = routines::selected();
    info!(
        "Autonomous routine: {} ({} steps)",
        routine.name,
        routine.steps.len()
    );
    session.save("routine.json", routine.clone());

    let mut phase_mgr = PhaseMgr::new(
        Robot {
            drive,
            acts,
            input: Box::new(input),
            display: Box::new(LogDisplay),
            health: Box::new(SimHealth::new()),
        },
        Modes {
            routine,
            auto_seq: AutoSeq::new(auto_seq_params),
            teleop,
        },
        telem_params,
        telem_archiver,
    );

    info!("Module initialisation complete\n");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // ---- EVENT PROCESSING ----

        match si.get_pending_tcs() {
            PendingTcs::None => (),
            PendingTcs::Some(tc_vec) => {
                for tc in tc_vec {
                    match tc {
                        Tc::Phase(event) => match phase_mgr.handle_event(event) {
                            Ok(_) => (),
                            Err(e @ PhaseError::InvalidTransition { .. }) => {
                                warn!("Phase event ignored: {}", e)
                            }
                            Err(e) => return Err(e).wrap_err("Phase transition failed"),
                        },
                        Tc::Input(state) => input_feed.set(state),
                        Tc::Disconnect => {
                            info!("Controller disconnected");
                            input_feed.disconnect()
                        }
                    }
                }
            }
            // Exit if end of script reached
            PendingTcs::EndOfScript => {
                info!("End of event script reached, stopping");
                break;
            }
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match Duration::from_secs_f64(CYCLE_PERIOD_S).checked_sub(cycle_dur) {
            Some(d) => thread::sleep(d),
            None => warn!(
                "Cycle overran by {:.06} s",
                cycle_dur.as_secs_f64() - CYCLE_PERIOD_S
            ),
        }
    }

    // ---- SHUTDOWN ----

    phase_mgr
        .shutdown()
        .wrap_err("Failed to shut down the phase manager")?;

    session.exit();

    info!("End of execution");

    Ok(())
}
