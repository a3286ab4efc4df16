//! `dexhand` — command-line front end for the hand control core.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                  Adapters (outer ring)                    │
//! │   SimulatedBus       JsonParamFile      LogEventSink      │
//! │   (BusTransport)     (ParamStore)       (EventSink)       │
//! │                                                           │
//! │  ─────────────── Port Trait Boundary ───────────────      │
//! │                                                           │
//! │   HandService ──▶ Hand ──▶ ServoBus (registry · motion)   │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! Every run brings the hand up on a simulated bus populated with the
//! servo ids named in the parameter file, then executes one command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};

use dexhand::adapters::log_sink::LogEventSink;
use dexhand::adapters::param_file::JsonParamFile;
use dexhand::adapters::sim_bus::SimulatedBus;
use dexhand::app::commands::{CommandReply, HandCommand};
use dexhand::app::ports::ParamStore;
use dexhand::app::service::HandService;
use dexhand::config::HandConfig;
use dexhand::kinematics::hand::Hand;

/// Drive the hand's servo bus.
#[derive(Parser, Debug)]
#[command(name = "dexhand", version, long_about = None)]
struct Cli {
    /// Hand configuration file (JSON); defaults apply if absent
    #[arg(short, long, default_value = "dexhand.json")]
    config: PathBuf,

    /// Parameter file, overriding the one named in the configuration
    #[arg(short, long)]
    params: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Configure every joint servo and report the result
    Bringup,

    /// Move one joint to an angle
    Move {
        finger: String,
        joint: String,
        /// Target angle in degrees
        #[arg(allow_hyphen_values = true)]
        angle: f64,
        /// Motion duration in ms
        #[arg(short, long)]
        duration: Option<u32>,
    },

    /// Send the cached state of one or more fingers
    Fingers {
        #[arg(required = true)]
        names: Vec<String>,
        #[arg(short, long)]
        duration: Option<u32>,
    },

    /// Switch torque on every configured servo
    Torque {
        #[arg(value_enum)]
        state: Switch,
    },

    /// Set or step a joint's calibration offset and save it
    Calibrate {
        finger: String,
        joint: String,
        /// Absolute offset in counts
        #[arg(long, allow_hyphen_values = true, conflicts_with = "step")]
        offset: Option<i32>,
        /// Step the offset up (+1) or down (-1)
        #[arg(long, allow_hyphen_values = true)]
        step: Option<i32>,
    },

    /// Print the cached hand state as JSON
    State,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Switch {
    On,
    Off,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(if cli.verbose {
        "debug"
    } else {
        "info"
    }))
    .format_target(false)
    .init();

    info!("dexhand v{}", env!("CARGO_PKG_VERSION"));

    let mut config = HandConfig::load(&cli.config)
        .with_context(|| format!("loading config {}", cli.config.display()))?;
    if let Some(params) = cli.params {
        config.param_file = params;
    }

    let store = JsonParamFile::new(&config.param_file);
    let params = store
        .load()
        .with_context(|| format!("loading parameters {}", config.param_file.display()))?;

    let mut bus = SimulatedBus::new();
    for (_, joints) in params.fingers() {
        for joint in joints.values() {
            bus.add_servo(joint.id, joint.model.unwrap_or(config.servo_model));
        }
    }
    info!("bus: simulated on {} @ {} baud", config.port, config.baud_rate);

    let default_duration = config.default_duration_ms;
    let hand = Hand::new(bus, store, LogEventSink::new(), config).context("building hand")?;
    let service = HandService::new(hand);

    let reply = service.execute(HandCommand::BringUp)?;
    if let CommandReply::BroughtUp { rejected, .. } = reply {
        if rejected > 0 {
            warn!("{rejected} servo(s) failed bring-up; running with a reduced set");
        }
    }

    let command = match cli.command {
        Command::Bringup => {
            println!("{reply:?}");
            return Ok(());
        }
        Command::Move {
            finger,
            joint,
            angle,
            duration,
        } => HandCommand::MoveJoint {
            finger,
            joint,
            angle_deg: angle,
            duration_ms: duration.unwrap_or(default_duration),
        },
        Command::Fingers { names, duration } => HandCommand::MoveFingers {
            fingers: names,
            duration_ms: duration.unwrap_or(default_duration),
        },
        Command::Torque { state } => HandCommand::SetTorque(matches!(state, Switch::On)),
        Command::Calibrate {
            finger,
            joint,
            offset,
            step,
        } => match (offset, step) {
            (Some(offset), _) => HandCommand::SetCalibrationOffset {
                finger,
                joint,
                offset,
            },
            (None, Some(direction)) => HandCommand::StepCalibration {
                finger,
                joint,
                direction,
            },
            (None, None) => anyhow::bail!("calibrate needs --offset or --step"),
        },
        Command::State => HandCommand::GetHandState,
    };

    match service.execute(command).context("command failed")? {
        CommandReply::HandState(state) => {
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
        CommandReply::Offset(offset) => println!("offset = {offset}"),
        other => info!("{other:?}"),
    }
    Ok(())
}
