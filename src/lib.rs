//! # Introduction
//!
//! stacksmash simulates call-stack frames in a flat byte array and shows what happens
//! when a write runs past the end of a local buffer: which neighbouring locals, saved
//! frame pointers and return addresses get overwritten, and where control goes when the
//! corrupted frame returns. Every step is captured in a snapshot so the run can be
//! navigated forward and backward through a terminal UI built with
//! [ratatui](https://docs.rs/ratatui).
//!
//! ## Pipeline
//!
//! ```text
//! Scenario (TOML) → Simulation → call / write / ret → Snapshots → TUI or text diagrams
//! ```
//!
//! 1. [`memory`] — the byte-addressable stack region, frame layout and the call stack.
//! 2. [`abi`] — calling conventions: word size, register vs. stack parameters, cleanup.
//! 3. [`simulator`] — the [`simulator::Simulation`] session, unbounded buffer writes and
//!    their [`simulator::OverflowReport`], plus the shared error type.
//! 4. [`snapshot`] — history of states with a configurable memory limit and the
//!    [`snapshot::TraceLog`] of everything that happened.
//! 5. [`scenario`] — scripted runs loaded from TOML.
//! 6. [`diagram`] — plain-text renderings of frames and overflow reports.
//! 7. [`ui`] — ratatui-based TUI; not part of the stable library API.
//!
//! ## Example
//!
//! ```
//! use stacksmash::memory::stack::FrameDecl;
//! use stacksmash::simulator::{SimConfig, Simulation};
//!
//! let mut sim = Simulation::new(SimConfig::default()).unwrap();
//! sim.call(&FrameDecl::new("function").local("buffer1", 5).local("buffer2", 10))
//!     .unwrap();
//! let report = sim.write_buffer("buffer1", &[0x41; 28]).unwrap();
//! assert_eq!(report.hijacked_return_address, Some(0x4141_4141));
//! ```

pub mod abi;
pub mod diagram;
pub mod memory;
pub mod scenario;
pub mod simulator;
pub mod snapshot;
pub mod ui;
