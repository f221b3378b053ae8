//! Simulation driver
//!
//! - [`config`]: validated session configuration
//! - [`engine`]: the [`engine::Simulation`] session with snapshot history
//! - [`overflow`]: unbounded buffer writes and their [`overflow::OverflowReport`]
//! - [`errors`]: the [`errors::SimError`] type shared by every operation
//! - [`constants`]: synthetic code addresses and defaults

pub mod config;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod overflow;

pub use config::SimConfig;
pub use engine::Simulation;
pub use errors::SimError;
pub use overflow::{OverflowEngine, OverflowReport, TouchedField};
