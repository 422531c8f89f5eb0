//! Command-line interface for url-parity.

mod commands;
pub mod icons;
pub mod progress;

pub use commands::{is_verbose, run};
