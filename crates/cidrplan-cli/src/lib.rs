//! Support modules for the `cidrplan` binary, split out to a library target
//! so `tests/scenarios.rs` can exercise config and CSV I/O directly instead
//! of only through a spawned process.

pub mod config_io;
pub mod csv_io;
