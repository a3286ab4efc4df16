//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements   | Connects to                     |
//! |---------------|--------------|---------------------------------|
//! | `sim_bus`     | BusTransport | In-memory servo register files  |
//! | `param_file`  | ParamStore   | JSON file / in-memory store     |
//! | `log_sink`    | EventSink    | `log` output / event recorder   |

pub mod log_sink;
pub mod param_file;
pub mod sim_bus;
