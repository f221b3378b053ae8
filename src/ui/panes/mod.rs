//! TUI pane rendering modules
//!
//! # Pane Modules
//!
//! - [`stack`]: Call stack with every frame's fields, clobbered slots and the last return
//! - [`memory`]: Hex dump of the stack region highlighting the last write
//! - [`trace`]: One line per simulation step
//! - [`status`]: Status bar with keybindings and position in the history
//! - `utils`: Shared block and scrolling helpers
//!
//! Each pane module exports a primary `render_*_pane()` function plus the state and
//! data types it takes.

mod utils;

pub mod memory;
pub mod stack;
pub mod status;
pub mod trace;

pub use memory::{render_memory_pane, MemoryRenderData, MemoryScrollState};
pub use stack::{render_stack_pane, StackRenderData, StackScrollState};
pub use status::{render_status_bar, StatusRenderData};
pub use trace::render_trace_pane;
