// Constants for the stack simulator

/// Instruction pointer value before the first call
/// Code addresses live in their own space and never index into stack memory
pub const ENTRY_POINT: u64 = 0x0804_8000;

/// Base of synthetic call-site addresses; call `n` returns to `CALL_SITE_BASE + n * CALL_SITE_STRIDE`
pub const CALL_SITE_BASE: u64 = 0x0804_8400;
pub const CALL_SITE_STRIDE: u64 = 0x10;

/// Base of synthetic function entry points; call `n` jumps to `FUNCTION_BASE + n * FUNCTION_STRIDE`
pub const FUNCTION_BASE: u64 = 0x0804_9000;
pub const FUNCTION_STRIDE: u64 = 0x100;

/// Default snapshot history limit (bytes)
pub const DEFAULT_SNAPSHOT_LIMIT: usize = 64 * 1024 * 1024;
