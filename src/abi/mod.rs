//! Calling conventions
//!
//! A [`CallingConvention`] is an immutable policy value handed to frame construction.
//! It decides where each parameter lives, how wide control words are and who releases
//! the parameter area on return.
//!
//! # Built-in Conventions
//!
//! | Kind                                | Registers | Used for                 |
//! |-------------------------------------|-----------|--------------------------|
//! | [`ConventionKind::StackOnly`]       | 0         | x86 `cdecl` / `stdcall`  |
//! | [`ConventionKind::RegisterFirstSix`]| 6         | x86-64 System V          |
//!
//! Both kinds share the same alignment rules, so one frame layout algorithm serves both.
//!
//! # Parameter Placement
//!
//! ```text
//! f(p0, p1, ..., pN)
//!   p0..p(R-1)  → registers 0..R-1
//!   pR..pN      → pushed right-to-left: pR ends up nearest the call-site SP
//! ```

use crate::memory::align_up;
use crate::simulator::errors::SimError;
use serde::Deserialize;

/// System V integer argument registers, in slot order
const SYSV_ARGUMENT_REGISTERS: [&str; 6] = ["rdi", "rsi", "rdx", "rcx", "r8", "r9"];

/// Parameter passing family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConventionKind {
    #[default]
    StackOnly,
    RegisterFirstSix,
}

impl ConventionKind {
    pub fn register_slots(self) -> usize {
        match self {
            ConventionKind::StackOnly => 0,
            ConventionKind::RegisterFirstSix => SYSV_ARGUMENT_REGISTERS.len(),
        }
    }
}

/// Where a function's return value is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReturnLocation {
    #[default]
    Register,
    Stack,
}

/// Who releases stack-passed parameters after the call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cleanup {
    #[default]
    Caller,
    Callee,
}

/// Location of one parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamLocation {
    /// Register slot index
    Register(usize),
    /// Byte offset from the call-site stack pointer, in the direction of the caller
    StackOffset(usize),
}

/// Placement of one parameter, in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamPlacement {
    pub location: ParamLocation,
    /// Declared size
    pub size: usize,
    /// Bytes reserved for the parameter (word-aligned for stack slots)
    pub slot_size: usize,
}

impl ParamPlacement {
    pub fn is_stack(&self) -> bool {
        matches!(self.location, ParamLocation::StackOffset(_))
    }
}

/// Immutable calling convention policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallingConvention {
    kind: ConventionKind,
    word_size: usize,
    register_slots: usize,
    return_location: ReturnLocation,
    cleanup: Cleanup,
}

impl CallingConvention {
    /// Create a convention; word size must be 4 or 8
    pub fn new(kind: ConventionKind, word_size: usize) -> Result<Self, SimError> {
        if word_size != 4 && word_size != 8 {
            return Err(SimError::invalid(format!(
                "word size must be 4 or 8, got {}",
                word_size
            )));
        }
        Ok(CallingConvention {
            kind,
            word_size,
            register_slots: kind.register_slots(),
            return_location: ReturnLocation::Register,
            cleanup: Cleanup::Caller,
        })
    }

    /// 32-bit x86 cdecl: everything on the stack, caller cleans
    pub fn cdecl() -> Self {
        CallingConvention {
            kind: ConventionKind::StackOnly,
            word_size: 4,
            register_slots: 0,
            return_location: ReturnLocation::Register,
            cleanup: Cleanup::Caller,
        }
    }

    /// 32-bit x86 stdcall: everything on the stack, callee cleans
    pub fn stdcall() -> Self {
        CallingConvention::cdecl().with_cleanup(Cleanup::Callee)
    }

    /// x86-64 System V: first six integer arguments in registers
    pub fn system_v() -> Self {
        CallingConvention {
            kind: ConventionKind::RegisterFirstSix,
            word_size: 8,
            register_slots: SYSV_ARGUMENT_REGISTERS.len(),
            return_location: ReturnLocation::Register,
            cleanup: Cleanup::Caller,
        }
    }

    pub fn with_cleanup(mut self, cleanup: Cleanup) -> Self {
        self.cleanup = cleanup;
        self
    }

    pub fn with_return_location(mut self, location: ReturnLocation) -> Self {
        self.return_location = location;
        self
    }

    pub fn kind(&self) -> ConventionKind {
        self.kind
    }

    pub fn word_size(&self) -> usize {
        self.word_size
    }

    pub fn register_slots(&self) -> usize {
        self.register_slots
    }

    pub fn return_location(&self) -> ReturnLocation {
        self.return_location
    }

    pub fn cleanup(&self) -> Cleanup {
        self.cleanup
    }

    /// Saved return addresses are always exactly one word
    pub fn return_address_size(&self) -> usize {
        self.word_size
    }

    /// Size rounded up to a whole number of words
    pub fn align(&self, size: usize) -> usize {
        align_up(size, self.word_size)
    }

    /// Name of an argument register, if the convention has one at `index`
    pub fn register_name(&self, index: usize) -> Option<&'static str> {
        if index < self.register_slots {
            SYSV_ARGUMENT_REGISTERS.get(index).copied()
        } else {
            None
        }
    }

    /// Assign every parameter a location, in declaration order.
    ///
    /// The first `register_slots` parameters take registers in order. The remaining ones
    /// are pushed right-to-left, so in declaration order their offsets from the call-site
    /// stack pointer increase, each slot rounded up to the word size.
    pub fn layout_parameters(&self, sizes: &[usize]) -> Vec<ParamPlacement> {
        let mut stack_offset = 0;
        sizes
            .iter()
            .enumerate()
            .map(|(index, &size)| {
                if index < self.register_slots {
                    ParamPlacement {
                        location: ParamLocation::Register(index),
                        size,
                        slot_size: self.word_size.max(size),
                    }
                } else {
                    let slot_size = self.align(size);
                    let placement = ParamPlacement {
                        location: ParamLocation::StackOffset(stack_offset),
                        size,
                        slot_size,
                    };
                    stack_offset += slot_size;
                    placement
                }
            })
            .collect()
    }

    /// Bytes of stack the parameters occupy
    pub fn stack_parameter_bytes(&self, sizes: &[usize]) -> usize {
        self.layout_parameters(sizes)
            .iter()
            .filter(|p| p.is_stack())
            .map(|p| p.slot_size)
            .sum()
    }

    /// Indices of stack-resident parameters in the order they are pushed
    pub fn stack_push_order(&self, sizes: &[usize]) -> Vec<usize> {
        (self.register_slots.min(sizes.len())..sizes.len())
            .rev()
            .collect()
    }
}
