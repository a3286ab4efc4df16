//! Dexterous hand servo-bus control core.
//!
//! Turns joint-angle commands into register transactions on a shared
//! servo bus, and brings each servo into a known, safe state first.
//!
//! ```text
//!  Hand (degrees) ──▶ Finger / Joint map ──▶ ServoBus ──▶ BusTransport
//!                                            │  motion (grouped writes)
//!                                            │  bringup (per-servo pipeline)
//!                                            └─ registry
//! ```

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod kinematics;
pub mod motion;
pub mod params;
pub mod servo;

pub use error::{Error, Result};
