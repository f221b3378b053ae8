//! Error types for the stack simulator
//!
//! This module defines [`SimError`], the single error type returned by every core
//! operation (memory access, frame push/pop, buffer writes, configuration).
//!
//! All errors are recoverable: the simulation state is left exactly as it was before the
//! failing operation, so callers can keep inspecting the stack afterwards. Writing past a
//! buffer's bounds is *not* an error; only leaving the memory itself is.

use std::fmt;

/// Errors that can occur while driving a simulation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    /// Memory access touching bytes outside `[0, capacity)`
    OutOfBounds {
        address: u64,
        length: usize,
        capacity: usize,
    },

    /// Return or inspection with no live frame
    EmptyStack,

    /// Overflow target is not a local of the frame
    UnknownBuffer { name: String, function: String },

    /// Rejected configuration or frame declaration
    InvalidConfiguration { message: String },
}

impl SimError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        SimError::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Short machine-friendly name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            SimError::OutOfBounds { .. } => "OutOfBounds",
            SimError::EmptyStack => "EmptyStack",
            SimError::UnknownBuffer { .. } => "UnknownBuffer",
            SimError::InvalidConfiguration { .. } => "InvalidConfiguration",
        }
    }
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::OutOfBounds {
                address,
                length,
                capacity,
            } => {
                write!(
                    f,
                    "Out of bounds: {} byte{} at 0x{:x} exceed stack capacity of {} bytes",
                    length,
                    if *length == 1 { "" } else { "s" },
                    address,
                    capacity
                )
            }
            SimError::EmptyStack => write!(f, "Call stack is empty"),
            SimError::UnknownBuffer { name, function } => {
                write!(f, "Unknown buffer '{}' in frame of {}()", name, function)
            }
            SimError::InvalidConfiguration { message } => {
                write!(f, "Invalid configuration: {}", message)
            }
        }
    }
}

impl std::error::Error for SimError {}
