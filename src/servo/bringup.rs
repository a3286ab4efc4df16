//! Configuration pipeline — bring one servo from "seen on the bus" to
//! "registered, safe, ready".
//!
//! ## Sequence
//!
//! | # | Step                   | Bus traffic                                  |
//! |---|------------------------|----------------------------------------------|
//! | 1 | `CheckUnique`          | none (the only step that aborts the run)     |
//! | 2 | `ValidateModel`        | none                                         |
//! | 3 | `CreateDescriptor`     | none                                         |
//! | 4 | `ReadFirmware`         | read firmware version                        |
//! | 5 | `RestoreStartupConfig` | RMW startup config: RAM restore on, torque off |
//! | 6 | `WriteOperatingMode`   | write operating mode                         |
//! | 7 | `WriteReverse`         | RMW drive mode bit 0 (only if requested)     |
//! | 8 | `WritePositionLimits`  | write max + min limit (not in extended mode) |
//! | 9 | `EnableTimeProfile`    | RMW drive mode bit 2                         |
//! | 10| `AssignSecondaryId`    | write secondary id                           |
//! | 11| `ReadTemperature`      | read present temperature (liveness)          |
//!
//! Steps 2–11 always run, even after a failure, so one pass yields a full
//! per-servo diagnosis.  Each step records a [`StepOutcome`]; the
//! commit decision is the pure function [`should_commit`] over that list.
//! The tentative descriptor lives on the stack until then — a servo is
//! either registered with a complete configuration or absent.

use log::{error, info, warn};

use crate::app::ports::{BusTransport, TransportError};
use crate::error::{Error, Result};

use super::bus::{ServoBus, update_drive_bit, write_limits};
use super::control_table::ServoModel;
use super::{
    DriveFlags, MAX_SERVO_ID, OperatingMode, PositionLimits, ServoDescriptor, is_valid_id,
    with_bit,
};

/// Startup-configuration register bits.
const STARTUP_TORQUE_ON_BIT: u8 = 0;
const STARTUP_RAM_RESTORE_BIT: u8 = 1;

// ───────────────────────────────────────────────────────────────
// Request
// ───────────────────────────────────────────────────────────────

/// Validated bring-up request for one servo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServoSpec {
    id: u8,
    model: String,
    operating_mode: OperatingMode,
    reverse: Option<bool>,
    position_limits: Option<PositionLimits>,
    secondary_id: u8,
}

impl ServoSpec {
    pub fn builder(id: u8, model: impl Into<String>) -> ServoSpecBuilder {
        ServoSpecBuilder {
            id,
            model: model.into(),
            operating_mode: OperatingMode::Position,
            reverse: None,
            position_limits: None,
            secondary_id: MAX_SERVO_ID,
        }
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn operating_mode(&self) -> OperatingMode {
        self.operating_mode
    }
}

#[derive(Debug, Clone)]
pub struct ServoSpecBuilder {
    id: u8,
    model: String,
    operating_mode: OperatingMode,
    reverse: Option<bool>,
    position_limits: Option<PositionLimits>,
    secondary_id: u8,
}

impl ServoSpecBuilder {
    pub fn operating_mode(mut self, mode: OperatingMode) -> Self {
        self.operating_mode = mode;
        self
    }

    /// Request the reverse drive flag be written (either value).
    pub fn reverse(mut self, reverse: bool) -> Self {
        self.reverse = Some(reverse);
        self
    }

    pub fn position_limits(mut self, min: i32, max: i32) -> Self {
        self.position_limits = Some(PositionLimits::new(min, max));
        self
    }

    pub fn secondary_id(mut self, secondary_id: u8) -> Self {
        self.secondary_id = secondary_id;
        self
    }

    /// Reject incomplete or out-of-range requests before any bus traffic.
    pub fn build(self) -> Result<ServoSpec> {
        if !is_valid_id(self.id) {
            return Err(Error::InvalidSpec("servo id must be 1-252"));
        }
        if self.secondary_id > MAX_SERVO_ID {
            return Err(Error::InvalidSpec("secondary id must be 0-252"));
        }
        match self.position_limits {
            None if self.operating_mode != OperatingMode::ExtendedPosition => {
                return Err(Error::InvalidSpec(
                    "position limits are required outside extended position mode",
                ));
            }
            Some(l) if l.min > l.max => {
                return Err(Error::InvalidSpec("position limit min above max"));
            }
            _ => {}
        }
        Ok(ServoSpec {
            id: self.id,
            model: self.model,
            operating_mode: self.operating_mode,
            reverse: self.reverse,
            position_limits: self.position_limits,
            secondary_id: self.secondary_id,
        })
    }
}

// ───────────────────────────────────────────────────────────────
// Step bookkeeping
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BringupStep {
    CheckUnique,
    ValidateModel,
    CreateDescriptor,
    ReadFirmware,
    RestoreStartupConfig,
    WriteOperatingMode,
    WriteReverse,
    WritePositionLimits,
    EnableTimeProfile,
    AssignSecondaryId,
    ReadTemperature,
}

impl BringupStep {
    /// Steps that talk to the bus, in execution order.
    pub const BUS_SEQUENCE: [Self; 8] = [
        Self::ReadFirmware,
        Self::RestoreStartupConfig,
        Self::WriteOperatingMode,
        Self::WriteReverse,
        Self::WritePositionLimits,
        Self::EnableTimeProfile,
        Self::AssignSecondaryId,
        Self::ReadTemperature,
    ];
}

impl core::fmt::Display for BringupStep {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            Self::CheckUnique => "check unique id",
            Self::ValidateModel => "validate model",
            Self::CreateDescriptor => "create descriptor",
            Self::ReadFirmware => "read firmware version",
            Self::RestoreStartupConfig => "restore startup config",
            Self::WriteOperatingMode => "write operating mode",
            Self::WriteReverse => "write reverse flag",
            Self::WritePositionLimits => "write position limits",
            Self::EnableTimeProfile => "enable time-based profile",
            Self::AssignSecondaryId => "assign secondary id",
            Self::ReadTemperature => "read temperature",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepFailure {
    DuplicateId,
    UnsupportedModel,
    /// No register map, so the bus step could not be attempted.
    NoRegisterMap,
    Transport(TransportError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Ok,
    /// The request did not ask for this step.
    NotApplicable,
    Failed(StepFailure),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOutcome {
    pub step: BringupStep,
    pub status: StepStatus,
}

impl StepOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self.status, StepStatus::Failed(_))
    }
}

/// Commit policy: every attempted step succeeded.
pub fn should_commit(outcomes: &[StepOutcome]) -> bool {
    !outcomes.is_empty() && !outcomes.iter().any(StepOutcome::is_failure)
}

/// Full result of one bring-up run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationReport {
    pub id: u8,
    pub model: String,
    pub outcomes: Vec<StepOutcome>,
    pub firmware_version: Option<u8>,
    pub temperature_c: Option<u8>,
    pub committed: bool,
}

impl ConfigurationReport {
    pub fn failed_steps(&self) -> impl Iterator<Item = &StepOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    fn failed_with(&self, failure: StepFailure) -> bool {
        self.outcomes
            .iter()
            .any(|o| o.status == StepStatus::Failed(failure))
    }

    /// Collapse the report into the caller-facing result.
    pub fn into_result(self) -> Result<()> {
        if self.committed {
            Ok(())
        } else if self.failed_with(StepFailure::DuplicateId) {
            Err(Error::DuplicateId(self.id))
        } else if self.failed_with(StepFailure::UnsupportedModel) {
            Err(Error::UnsupportedModel(self.model))
        } else {
            Err(Error::ConfigurationFailed(self.id))
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Pipeline
// ───────────────────────────────────────────────────────────────

impl<T: BusTransport> ServoBus<T> {
    /// Run the configuration pipeline and register the servo on success.
    pub fn configure_servo(&mut self, spec: &ServoSpec) -> Result<()> {
        self.configure_servo_with_report(spec).into_result()
    }

    /// Run the configuration pipeline and return the per-step report.
    pub fn configure_servo_with_report(&mut self, spec: &ServoSpec) -> ConfigurationReport {
        let id = spec.id;
        info!("servo {id}: bring-up ({})", spec.model);

        let mut report = ConfigurationReport {
            id,
            model: spec.model.clone(),
            outcomes: Vec::with_capacity(11),
            firmware_version: None,
            temperature_c: None,
            committed: false,
        };

        // 1. The only early exit.
        if self.registry.contains(id) {
            error!("servo {id}: already registered");
            report.outcomes.push(StepOutcome {
                step: BringupStep::CheckUnique,
                status: StepStatus::Failed(StepFailure::DuplicateId),
            });
            return report;
        }
        report.outcomes.push(StepOutcome {
            step: BringupStep::CheckUnique,
            status: StepStatus::Ok,
        });

        // 2. + 3.
        let model = ServoModel::from_name(&spec.model);
        let (model_status, descriptor_status) = match model {
            Some(m) => {
                info!("servo {id}: - model {m}");
                (StepStatus::Ok, StepStatus::Ok)
            }
            None => {
                error!("servo {id}: - unsupported model {:?}", spec.model);
                (
                    StepStatus::Failed(StepFailure::UnsupportedModel),
                    StepStatus::Failed(StepFailure::NoRegisterMap),
                )
            }
        };
        report.outcomes.push(StepOutcome {
            step: BringupStep::ValidateModel,
            status: model_status,
        });
        report.outcomes.push(StepOutcome {
            step: BringupStep::CreateDescriptor,
            status: descriptor_status,
        });
        let mut tentative = model.map(|m| ServoDescriptor::new(id, m));

        // 4. – 11.
        for step in BringupStep::BUS_SEQUENCE {
            let status = match tentative.as_mut() {
                Some(desc) => self.run_step(step, spec, desc, &mut report),
                None => StepStatus::Failed(StepFailure::NoRegisterMap),
            };
            log_outcome(id, step, status);
            report.outcomes.push(StepOutcome { step, status });
        }

        if should_commit(&report.outcomes) {
            if let Some(desc) = tentative {
                report.committed = self.registry.register(desc).is_ok();
            }
        }

        if report.committed {
            info!("servo {id}: configured");
        } else {
            let failed = report.failed_steps().count();
            error!("servo {id}: configuration failed ({failed} step(s)), discarded");
        }
        report
    }

    fn run_step(
        &mut self,
        step: BringupStep,
        spec: &ServoSpec,
        desc: &mut ServoDescriptor,
        report: &mut ConfigurationReport,
    ) -> StepStatus {
        let id = desc.id;
        let table = desc.table();
        let t = &mut self.transport;

        let result: core::result::Result<StepStatus, TransportError> = match step {
            BringupStep::ReadFirmware => t.read(id, table.firmware_version).map(|fw| {
                desc.firmware_version = fw as u8;
                report.firmware_version = Some(fw as u8);
                StepStatus::Ok
            }),
            BringupStep::RestoreStartupConfig => {
                t.read(id, table.startup_configuration).and_then(|raw| {
                    let raw = with_bit(raw as u8, STARTUP_TORQUE_ON_BIT, false);
                    let raw = with_bit(raw, STARTUP_RAM_RESTORE_BIT, true);
                    t.write(id, table.startup_configuration, u32::from(raw))?;
                    desc.torque_enabled = false;
                    Ok(StepStatus::Ok)
                })
            }
            BringupStep::WriteOperatingMode => {
                let mode = spec.operating_mode;
                t.write(id, table.operating_mode, u32::from(mode.register_value()))
                    .map(|()| {
                        desc.operating_mode = mode;
                        StepStatus::Ok
                    })
            }
            BringupStep::WriteReverse => match spec.reverse {
                None => Ok(StepStatus::NotApplicable),
                Some(reverse) => {
                    update_drive_bit(t, id, table, DriveFlags::REVERSE_BIT, reverse).map(|raw| {
                        desc.drive_flags = DriveFlags::from_register(raw);
                        StepStatus::Ok
                    })
                }
            },
            BringupStep::WritePositionLimits => match spec.position_limits {
                _ if spec.operating_mode == OperatingMode::ExtendedPosition => {
                    Ok(StepStatus::NotApplicable)
                }
                // `build` guarantees limits outside extended mode.
                None => Ok(StepStatus::NotApplicable),
                Some(l) => write_limits(t, id, table, l.min, l.max).map(|()| {
                    desc.position_limits = l;
                    StepStatus::Ok
                }),
            },
            BringupStep::EnableTimeProfile => {
                update_drive_bit(t, id, table, DriveFlags::TIME_PROFILE_BIT, true).map(|raw| {
                    desc.drive_flags = DriveFlags::from_register(raw);
                    StepStatus::Ok
                })
            }
            BringupStep::AssignSecondaryId => t
                .write(id, table.secondary_id, u32::from(spec.secondary_id))
                .map(|()| {
                    desc.secondary_id = spec.secondary_id;
                    StepStatus::Ok
                }),
            BringupStep::ReadTemperature => t.read(id, table.present_temperature).map(|c| {
                report.temperature_c = Some(c as u8);
                StepStatus::Ok
            }),
            BringupStep::CheckUnique | BringupStep::ValidateModel | BringupStep::CreateDescriptor => {
                Ok(StepStatus::Ok)
            }
        };

        result.unwrap_or_else(|e| StepStatus::Failed(StepFailure::Transport(e)))
    }
}

fn log_outcome(id: u8, step: BringupStep, status: StepStatus) {
    match status {
        StepStatus::Ok => info!("servo {id}: - {step}: ok"),
        StepStatus::NotApplicable => info!("servo {id}: - {step}: not requested"),
        StepStatus::Failed(StepFailure::Transport(e)) => error!("servo {id}: - {step} failed: {e}"),
        StepStatus::Failed(StepFailure::NoRegisterMap) => {
            warn!("servo {id}: - {step} not attempted, no register map");
        }
        StepStatus::Failed(other) => error!("servo {id}: - {step} failed: {other:?}"),
    }
}
