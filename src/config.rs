//! Runtime configuration
//!
//! Everything about the hand that is not per-joint calibration: where the
//! bus lives, which servo model to assume, and the defaults applied to
//! motion and calibration commands.  Loaded from an optional JSON file;
//! every field falls back to its default.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::servo::control_table::ServoModel;
use crate::servo::{MAX_SERVO_ID, OperatingMode};

/// Hand-wide configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandConfig {
    // --- Bus ---
    /// Serial device the servo bus is attached to
    pub port: String,
    /// Bus baud rate
    pub baud_rate: u32,

    // --- Servos ---
    /// Model assumed for joints whose params do not name one
    pub servo_model: ServoModel,
    /// Operating mode written to every joint servo at bring-up
    pub operating_mode: OperatingMode,
    /// Group id assigned at bring-up for synchronized writes
    pub secondary_id: u8,

    // --- Parameters ---
    /// JSON file holding the per-joint parameter set
    pub param_file: PathBuf,

    // --- Motion ---
    /// Duration used when a command does not give one (ms)
    pub default_duration_ms: u32,
    /// Offset change per calibration step (counts)
    pub calibration_step: i32,
    /// Finger order for reports and whole-hand commands
    pub finger_order: Vec<String>,
}

impl Default for HandConfig {
    fn default() -> Self {
        Self {
            // Bus
            port: "/dev/ttyUSB0".into(),
            baud_rate: 115_200,

            // Servos
            servo_model: ServoModel::Xc330,
            operating_mode: OperatingMode::ExtendedPosition,
            secondary_id: MAX_SERVO_ID,

            // Parameters
            param_file: PathBuf::from("params/finger_params.json"),

            // Motion
            default_duration_ms: 1000,
            calibration_step: 100,
            finger_order: ["thumb", "index", "middle", "ring", "pinky", "abduction", "wrist"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl HandConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, or return the defaults if the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_json(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("config {}: not found, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(Error::Config(format!("{}: {e}", path.display()))),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.baud_rate == 0 {
            return Err(Error::Config("baud_rate must be non-zero".into()));
        }
        if self.secondary_id > MAX_SERVO_ID {
            return Err(Error::Config(format!(
                "secondary_id {} above {MAX_SERVO_ID}",
                self.secondary_id
            )));
        }
        if self.default_duration_ms == 0 {
            return Err(Error::Config("default_duration_ms must be non-zero".into()));
        }
        if self.calibration_step <= 0 {
            return Err(Error::Config("calibration_step must be positive".into()));
        }
        Ok(())
    }
}
