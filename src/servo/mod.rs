//! Servo descriptors and the bus-side services built on them.
//!
//! - [`control_table`] — immutable per-model register maps.
//! - [`registry`] — the set of configured servos.
//! - [`bus`] — [`ServoBus`](bus::ServoBus), owner of the transport handle.
//! - [`bringup`] — the configuration pipeline that admits a servo.

pub mod bringup;
pub mod bus;
pub mod control_table;
pub mod registry;

use serde::{Deserialize, Serialize};

use control_table::ServoModel;

/// Lowest and highest valid bus ids.
pub const MIN_SERVO_ID: u8 = 1;
pub const MAX_SERVO_ID: u8 = 252;

/// Secondary id value meaning "not assigned".
pub const NO_SECONDARY_ID: u8 = 255;

/// Widest position range an X-series servo accepts in extended mode.
pub const EXTENDED_POSITION_LIMIT: i32 = 1_048_575;

/// Servo control law.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    Current,
    Velocity,
    Position,
    #[serde(alias = "extended_pos")]
    ExtendedPosition,
    #[serde(alias = "current_pos")]
    CurrentPosition,
    Pwm,
}

impl OperatingMode {
    /// Value written to the operating-mode register.
    pub const fn register_value(self) -> u8 {
        match self {
            Self::Current => 0,
            Self::Velocity => 1,
            Self::Position => 3,
            Self::ExtendedPosition => 4,
            Self::CurrentPosition => 5,
            Self::Pwm => 16,
        }
    }
}

/// Independent bits of the drive-mode register.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveFlags {
    pub reverse: bool,
    pub time_based_profile: bool,
    pub torque_on_by_goal_update: bool,
}

impl DriveFlags {
    pub const REVERSE_BIT: u8 = 0;
    pub const TIME_PROFILE_BIT: u8 = 2;
    pub const TORQUE_ON_BY_GOAL_BIT: u8 = 3;

    /// Decode the flags from a raw drive-mode byte.
    pub const fn from_register(raw: u8) -> Self {
        Self {
            reverse: raw & (1 << Self::REVERSE_BIT) != 0,
            time_based_profile: raw & (1 << Self::TIME_PROFILE_BIT) != 0,
            torque_on_by_goal_update: raw & (1 << Self::TORQUE_ON_BY_GOAL_BIT) != 0,
        }
    }
}

/// Set or clear a single bit.
pub(crate) const fn with_bit(raw: u8, bit: u8, on: bool) -> u8 {
    if on { raw | (1 << bit) } else { raw & !(1 << bit) }
}

/// Goal-position bounds in native counts (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionLimits {
    pub min: i32,
    pub max: i32,
}

impl PositionLimits {
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    pub const fn contains(&self, count: i32) -> bool {
        self.min <= count && count <= self.max
    }
}

impl Default for PositionLimits {
    fn default() -> Self {
        Self {
            min: -EXTENDED_POSITION_LIMIT,
            max: EXTENDED_POSITION_LIMIT,
        }
    }
}

/// Everything the core knows about one configured servo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServoDescriptor {
    pub id: u8,
    pub model: ServoModel,
    pub position_limits: PositionLimits,
    pub operating_mode: OperatingMode,
    pub drive_flags: DriveFlags,
    pub secondary_id: u8,
    /// Last commanded torque state, not a readback.
    pub torque_enabled: bool,
    pub firmware_version: u8,
}

impl ServoDescriptor {
    /// Tentative descriptor with default limits, before any bus traffic.
    pub fn new(id: u8, model: ServoModel) -> Self {
        Self {
            id,
            model,
            position_limits: PositionLimits::default(),
            operating_mode: OperatingMode::ExtendedPosition,
            drive_flags: DriveFlags::default(),
            secondary_id: NO_SECONDARY_ID,
            torque_enabled: false,
            firmware_version: 0,
        }
    }

    pub fn table(&self) -> &'static control_table::ControlTable {
        self.model.table()
    }
}

pub(crate) const fn is_valid_id(id: u8) -> bool {
    id >= MIN_SERVO_ID && id <= MAX_SERVO_ID
}
