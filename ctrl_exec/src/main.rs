//! Main control executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Main loop:
//!         - Input acquisition (replayed from a scenario):
//!             - Robot pose
//!             - Tracked objects
//!             - Point cloud
//!         - MPC preprocessing:
//!             - Reference horizon
//!             - Obstacle normalisation
//!             - Reference path re-centering
//!         - Velocity regulation
//!         - Marker publishing
//!         - Archiving
//!
//! # Modules
//!
//! All modules (e.g. `mpc_prep`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, warn};
use std::env;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

// Internal
use ctrl_lib::{
    data_store::DataStore,
    mpc_prep::{regulate_max_speed, viz::MarkerSink},
    params::CtrlExecParams,
    scenario::Scenario,
};
use util::{
    archive::Archived,
    host,
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};

#[cfg(feature = "viz")]
use comms_if::net::NetParams;
#[cfg(feature = "viz")]
use ctrl_lib::viz_server::MarkerServer;
#[cfg(not(feature = "viz"))]
use ctrl_lib::mpc_prep::viz::NullSink;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of consecutive cycle overruns after which a warning about the cycle period is raised.
const CYCLE_OVERRUN_WARN_LIMIT: u64 = 10;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("ctrl_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Control Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: CtrlExecParams =
        util::params::load("ctrl_exec.toml").wrap_err("Could not load exec params")?;
    exec_params
        .validate()
        .wrap_err("Invalid exec params")?;

    #[cfg(feature = "viz")]
    let net_params: NetParams =
        util::params::load("net.toml").wrap_err("Could not load net params")?;

    info!("Exec parameters loaded");

    // ---- LOAD SCENARIO ----

    // Collect all arguments
    let args: Vec<String> = env::args().collect();

    debug!("CLI arguments: {:?}", args);

    // A single argument is the scenario path, otherwise use the default relative to the root
    let scenario_path = match args.len() {
        1 => host::get_ctrl_sw_root()
            .wrap_err("Could not find the software root")?
            .join(&exec_params.default_scenario),
        2 => args[1].clone().into(),
        n => {
            return Err(eyre!(
                "Expected either zero or one argument, found {}",
                n - 1
            ))
        }
    };

    info!("Loading scenario from {:?}", scenario_path);
    let scenario = Scenario::load(&scenario_path).wrap_err("Failed to load the scenario")?;
    info!(
        "Loaded scenario contains {} frames and a {} pose reference path\n",
        scenario.num_frames(),
        scenario.reference_path.len()
    );

    // ---- INITIALISE DATASTORE ----

    info!("Initialising modules...");

    let mut ds = DataStore::default();
    ds.swap_reference_path(Arc::new(scenario.reference_path.clone()));

    // ---- INITIALISE MODULES ----

    ds.mpc_prep
        .init("mpc_prep.toml", &session)
        .wrap_err("Failed to initialise MpcPrep")?;
    info!("MpcPrep init complete");

    info!("Module initialisation complete\n");

    // ---- INITIALISE NETWORK ----

    #[cfg(feature = "viz")]
    let zmq_ctx = comms_if::net::zmq::Context::new();

    #[cfg(feature = "viz")]
    let mut marker_sink: Box<dyn MarkerSink> = {
        let s = MarkerServer::new(&zmq_ctx, &net_params)
            .wrap_err("Failed to initialise MarkerServer")?;
        info!("MarkerServer initialised");
        Box::new(s)
    };

    #[cfg(not(feature = "viz"))]
    let mut marker_sink: Box<dyn MarkerSink> = Box::new(NullSink);

    // ---- MAIN LOOP ----

    let cycle_period = Duration::from_secs_f64(exec_params.cycle_period_s);
    let max_cycles = exec_params
        .max_cycles
        .unwrap_or(scenario.num_frames() as u64)
        .min(scenario.num_frames() as u64);

    info!("Begining main loop ({} cycles)\n", max_cycles);

    for frame in scenario.frames.iter().take(max_cycles as usize) {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // Clear items that need wiping at the start of the cycle
        ds.cycle_start();

        // ---- DATA INPUT ----

        ds.mpc_prep_input.robot_pose = frame.robot_pose;
        ds.mpc_prep_input.reference_path = ds.reference_path.clone();
        ds.mpc_prep_input.objects = frame.objects.clone();
        ds.mpc_prep_input.cloud = frame.decode_cloud();

        // ---- CONTROL ALGORITHM PROCESSING ----

        match ds.mpc_prep.proc(&ds.mpc_prep_input) {
            Ok((o, r)) => {
                ds.mpc_prep_output = o;
                ds.mpc_prep_status_rpt = r;
                ds.num_consec_mpc_prep_errors = 0;
            }
            Err(e) => {
                // Nothing to build a horizon from yet, wait for the inputs to arrive
                warn!("Error during MpcPrep processing: {}", e);
                ds.num_consec_mpc_prep_errors += 1;
            }
        }

        // Re-centred path is used from the next cycle on
        if let Some(path) = ds.mpc_prep_output.recentred_path.take() {
            ds.swap_reference_path(path);
        }

        // Velocity regulation
        if let Some(mut cmd) = frame.velocity_cmd {
            regulate_max_speed(&mut cmd, &ds.mpc_prep.params().mpc);
            if Some(cmd) != frame.velocity_cmd {
                debug!("Velocity command limited to {:.3} m/s", cmd.linear_ms);
            }
            ds.velocity_cmd = Some(cmd);
        }

        // ---- VISUALISATION ----

        for markers in ds.mpc_prep_output.markers.drain(..) {
            marker_sink.publish(markers);
        }

        // ---- WRITE ARCHIVES ----

        if let Err(e) = ds.mpc_prep.write() {
            warn!("Could not write MpcPrep archives: {}", e);
        }

        // Snapshot of the horizon on the 1Hz cycle
        if ds.num_cycles % ((1.0 / exec_params.cycle_period_s).max(1.0) as u64) == 0 {
            session.save(
                format!("horizon/horizon_{:06}.json", ds.num_cycles),
                ds.mpc_prep_output.horizon.clone(),
            );
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match cycle_period.checked_sub(cycle_dur) {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            }
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - cycle_period.as_secs_f64()
                );
                ds.num_consec_cycle_overruns += 1;

                if ds.num_consec_cycle_overruns == CYCLE_OVERRUN_WARN_LIMIT {
                    warn!(
                        "{} consecutive cycle overruns, the cycle period may be too short",
                        CYCLE_OVERRUN_WARN_LIMIT
                    );
                }
            }
        }

        // Increment cycle counter
        ds.num_cycles += 1;
    }

    // ---- SHUTDOWN ----

    info!(
        "End of scenario after {} cycles, reference path re-centred {} times",
        ds.num_cycles, ds.num_recentrings
    );

    session.exit();

    info!("End of execution");

    Ok(())
}
