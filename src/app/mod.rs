//! Application boundary of the hand control core.
//!
//! Port traits in [`ports`] keep the servo bus, parameter storage and
//! event output swappable.  [`service`] is the thread-safe front door;
//! [`commands`] and [`events`] are the values that cross it.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
