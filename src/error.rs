//! Unified error type for the hand control core.
//!
//! Every fallible operation in the library funnels into [`Error`], so the
//! caller-facing layer handles bus, registry, batch and parameter failures
//! uniformly.  Bus failures are reported, never escalated: nothing in this
//! crate panics or aborts on a transport error.

use core::fmt;

use crate::app::ports::{StoreError, TransportError};

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A register read/write failed at the bus level.
    Transport(TransportError),
    /// Registration attempted for an id already present.
    DuplicateId(u8),
    /// No register map is known for the requested model.
    UnsupportedModel(String),
    /// At least one bring-up step failed; the servo was not registered.
    /// The failing steps are logged and listed in the bring-up report.
    ConfigurationFailed(u8),
    /// Motion batch sequences have different lengths.
    MalformedBatch {
        ids: usize,
        goals: usize,
        durations: usize,
    },
    /// An operation referenced an id not present in the registry.
    UnknownId(u8),
    /// The goal count lies outside the servo's position limits.
    GoalOutOfLimits { id: u8, goal: i32 },
    /// No finger with this name.
    UnknownFinger(String),
    /// The finger has no joint with this name.
    UnknownJoint { finger: String, joint: String },
    /// A servo request or bus command was rejected before any bus traffic.
    InvalidSpec(&'static str),
    /// The persisted parameter set failed validation.
    InvalidParams(String),
    /// Loading or saving the parameter set failed.
    Store(StoreError),
    /// The hand configuration file is unreadable or inconsistent.
    Config(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::DuplicateId(id) => write!(f, "servo id {id} already registered"),
            Self::UnsupportedModel(model) => write!(f, "unsupported servo model {model:?}"),
            Self::ConfigurationFailed(id) => write!(f, "configuration of servo {id} failed"),
            Self::MalformedBatch {
                ids,
                goals,
                durations,
            } => write!(
                f,
                "malformed batch: {ids} ids, {goals} goals, {durations} durations"
            ),
            Self::UnknownId(id) => write!(f, "servo id {id} not registered"),
            Self::GoalOutOfLimits { id, goal } => {
                write!(f, "goal {goal} outside position limits of servo {id}")
            }
            Self::UnknownFinger(name) => write!(f, "unknown finger {name:?}"),
            Self::UnknownJoint { finger, joint } => {
                write!(f, "finger {finger:?} has no joint {joint:?}")
            }
            Self::InvalidSpec(msg) => write!(f, "invalid request: {msg}"),
            Self::InvalidParams(msg) => write!(f, "invalid parameter set: {msg}"),
            Self::Store(e) => write!(f, "parameter store: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
