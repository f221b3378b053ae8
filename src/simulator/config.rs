//! Simulation configuration
//!
//! A [`SimConfig`] is the plain value a session is created from. It deserialises from the
//! `[config]` table of a scenario file:
//!
//! ```toml
//! [config]
//! convention = "register-first-six"   # or "stack-only"
//! word_size = 8                       # 4 or 8
//! growth = "toward-low"               # or "toward-high"
//! capacity = 512
//! byte_order = "little"               # optional
//! cleanup = "caller"                  # optional, "callee" for stdcall
//! return_location = "register"        # optional, or "stack"
//! ```

use crate::abi::{CallingConvention, Cleanup, ConventionKind, ReturnLocation};
use crate::memory::{ByteOrder, GrowthDirection, Memory};
use crate::simulator::errors::SimError;
use serde::Deserialize;

fn default_word_size() -> usize {
    4
}

fn default_capacity() -> usize {
    256
}

/// Configuration for one simulation session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimConfig {
    #[serde(default)]
    pub convention: ConventionKind,
    #[serde(default = "default_word_size")]
    pub word_size: usize,
    #[serde(default)]
    pub growth: GrowthDirection,
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default)]
    pub byte_order: ByteOrder,
    #[serde(default)]
    pub cleanup: Cleanup,
    #[serde(default)]
    pub return_location: ReturnLocation,
}

impl SimConfig {
    pub fn new(
        convention: ConventionKind,
        word_size: usize,
        growth: GrowthDirection,
        capacity: usize,
    ) -> Self {
        SimConfig {
            convention,
            word_size,
            growth,
            capacity,
            byte_order: ByteOrder::Little,
            cleanup: Cleanup::Caller,
            return_location: ReturnLocation::Register,
        }
    }

    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    pub fn with_cleanup(mut self, cleanup: Cleanup) -> Self {
        self.cleanup = cleanup;
        self
    }

    /// Reject word sizes other than 4 / 8 and empty memories
    pub fn validate(&self) -> Result<(), SimError> {
        if self.word_size != 4 && self.word_size != 8 {
            return Err(SimError::invalid(format!(
                "word size must be 4 or 8, got {}",
                self.word_size
            )));
        }
        if self.capacity == 0 {
            return Err(SimError::invalid("stack capacity must be positive"));
        }
        Ok(())
    }

    pub fn calling_convention(&self) -> Result<CallingConvention, SimError> {
        Ok(CallingConvention::new(self.convention, self.word_size)?
            .with_cleanup(self.cleanup)
            .with_return_location(self.return_location))
    }

    pub fn memory(&self) -> Result<Memory, SimError> {
        Memory::new(self.capacity, self.growth, self.byte_order)
    }
}

impl Default for SimConfig {
    /// 32-bit x86: cdecl, 4-byte words, stack growing down, 256 bytes
    fn default() -> Self {
        SimConfig::new(
            ConventionKind::StackOnly,
            default_word_size(),
            GrowthDirection::TowardLow,
            default_capacity(),
        )
    }
}
