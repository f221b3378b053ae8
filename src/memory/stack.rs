//! Call stack implementation
//!
//! This module provides the call stack for simulated function calls:
//! - [`CallStack`]: The live frames plus the SP / FP / IP registers
//! - [`StackFrame`]: A single function's activation record laid out in [`Memory`]
//! - [`LocalSlot`] / [`ParamSlot`]: Where each local and parameter lives
//! - [`FieldKind`]: Logical name of any byte inside a frame
//!
//! # Frame Layout
//!
//! For a stack growing toward low addresses (low → high):
//! ```text
//!  SP                           FP
//!  [local 0][local 1]...[local N][saved FP][return addr][param 0][param 1]...
//! ```
//! The first declared local sits deepest, so a write running off the end of a local
//! reaches the next declared local, then the saved frame pointer, then the return
//! address. A stack growing toward high addresses uses the mirror image.
//!
//! # Control Data
//!
//! The frame record remembers the values that were saved at call time, but [`CallStack::ret`]
//! always reads the bytes currently in memory. Corrupted control data is returned as-is.

use super::{Address, GrowthDirection, Memory};
use crate::abi::{CallingConvention, Cleanup, ParamLocation, ParamPlacement};
use crate::simulator::constants::{CALL_SITE_BASE, CALL_SITE_STRIDE, FUNCTION_BASE, FUNCTION_STRIDE};
use crate::simulator::errors::SimError;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;
use std::fmt;
use std::ops::Range;

/// Declared local variable
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VarDecl {
    pub name: String,
    pub size: usize,
}

impl VarDecl {
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        VarDecl {
            name: name.into(),
            size,
        }
    }
}

/// Declared parameter with the argument value passed for it
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ParamDecl {
    pub name: String,
    pub size: usize,
    #[serde(default)]
    pub value: u64,
}

impl ParamDecl {
    pub fn new(name: impl Into<String>, size: usize, value: u64) -> Self {
        ParamDecl {
            name: name.into(),
            size,
            value,
        }
    }
}

/// Everything needed to push one frame
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FrameDecl {
    pub function: String,
    #[serde(default)]
    pub locals: Vec<VarDecl>,
    #[serde(default)]
    pub params: Vec<ParamDecl>,
}

impl FrameDecl {
    pub fn new(function: impl Into<String>) -> Self {
        FrameDecl {
            function: function.into(),
            locals: Vec::new(),
            params: Vec::new(),
        }
    }

    pub fn local(mut self, name: impl Into<String>, size: usize) -> Self {
        self.locals.push(VarDecl::new(name, size));
        self
    }

    pub fn param(mut self, name: impl Into<String>, size: usize, value: u64) -> Self {
        self.params.push(ParamDecl::new(name, size, value));
        self
    }

    fn validate(&self) -> Result<(), SimError> {
        let mut seen = FxHashSet::default();
        let names = self
            .locals
            .iter()
            .map(|l| (&l.name, l.size))
            .chain(self.params.iter().map(|p| (&p.name, p.size)));
        for (name, size) in names {
            if name.is_empty() {
                return Err(SimError::invalid(format!(
                    "unnamed variable in {}()",
                    self.function
                )));
            }
            if size == 0 {
                return Err(SimError::invalid(format!(
                    "'{}' in {}() must have a positive size",
                    name, self.function
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(SimError::invalid(format!(
                    "'{}' declared twice in {}()",
                    name, self.function
                )));
            }
        }
        Ok(())
    }
}

/// A local variable's slot in the frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalSlot {
    pub name: String,
    pub declared_size: usize,
    pub aligned_size: usize,
    /// Signed distance from the frame pointer to the slot's lowest address
    pub offset: i64,
    pub address: Address,
}

impl LocalSlot {
    pub fn range(&self) -> Range<Address> {
        self.address..self.address + self.aligned_size as Address
    }
}

/// A parameter's location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSlot {
    pub name: String,
    pub placement: ParamPlacement,
    /// Stack address for stack-resident parameters
    pub address: Option<Address>,
    pub value: u64,
}

impl ParamSlot {
    pub fn range(&self) -> Option<Range<Address>> {
        self.address
            .map(|a| a..a + self.placement.slot_size as Address)
    }
}

/// Logical name of a byte inside (or outside) a frame
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Local(String),
    Parameter(String),
    SavedFramePointer,
    SavedReturnAddress,
    BeyondFrame,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Local(name) | FieldKind::Parameter(name) => write!(f, "{}", name),
            FieldKind::SavedFramePointer => write!(f, "savedFramePointer"),
            FieldKind::SavedReturnAddress => write!(f, "savedReturnAddress"),
            FieldKind::BeyondFrame => write!(f, "beyondFrame"),
        }
    }
}

/// One field of a frame with its address range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameField {
    pub kind: FieldKind,
    pub range: Range<Address>,
}

/// Stack frame for a function call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    /// Call counter value; unique and increasing
    pub id: usize,
    pub function: String,
    pub locals: Vec<LocalSlot>,
    pub params: Vec<ParamSlot>,
    pub saved_fp_slot: Address,
    pub return_address_slot: Address,
    pub frame_pointer: Address,
    /// Caller's stack pointer before any argument was pushed
    pub entry_stack_pointer: Address,
    /// Stack pointer after the prologue
    pub stack_pointer: Address,
    /// Values written by the prologue
    pub saved_frame_pointer: u64,
    pub return_address: u64,
    pub word_size: usize,
    pub stack_param_bytes: usize,
    pub cleanup: Cleanup,
    pub growth: GrowthDirection,
    local_index: FxHashMap<String, usize>,
}

impl StackFrame {
    /// Run the function prologue for `decl` starting at stack pointer `sp`.
    ///
    /// Pushes stack-passed arguments, the return address and the caller's frame pointer,
    /// then reserves word-aligned space for every local. Every bound is checked before
    /// the first byte is written.
    pub fn build(
        conv: &CallingConvention,
        memory: &mut Memory,
        decl: &FrameDecl,
        id: usize,
        sp: Address,
        caller_fp: Address,
        return_address: u64,
    ) -> Result<Self, SimError> {
        decl.validate()?;
        let word = conv.word_size();
        let entry_stack_pointer = sp;

        let sizes: Vec<usize> = decl.params.iter().map(|p| p.size).collect();
        let placements = conv.layout_parameters(&sizes);
        let param_bytes = conv.stack_parameter_bytes(&sizes);

        let (sp, param_start) = memory.push_region(sp, param_bytes)?;
        let (sp, return_address_slot) = memory.push_region(sp, word)?;
        let (sp, saved_fp_slot) = memory.push_region(sp, word)?;
        let frame_pointer = sp;

        let locals_size: usize = decl.locals.iter().map(|l| conv.align(l.size)).sum();
        let (stack_pointer, locals_start) = memory.push_region(frame_pointer, locals_size)?;

        let mut locals = Vec::with_capacity(decl.locals.len());
        let mut local_index = FxHashMap::default();
        let mut allocated = 0;
        for local in &decl.locals {
            let aligned_size = conv.align(local.size);
            let address = memory.place_in_region(locals_start, locals_size, allocated, aligned_size);
            allocated += aligned_size;
            local_index.insert(local.name.clone(), locals.len());
            locals.push(LocalSlot {
                name: local.name.clone(),
                declared_size: local.size,
                aligned_size,
                offset: address as i64 - frame_pointer as i64,
                address,
            });
        }

        let params: Vec<ParamSlot> = decl
            .params
            .iter()
            .zip(placements)
            .map(|(param, placement)| ParamSlot {
                name: param.name.clone(),
                placement,
                address: match placement.location {
                    ParamLocation::StackOffset(offset) => Some(memory.place_in_region(
                        param_start,
                        param_bytes,
                        offset,
                        placement.slot_size,
                    )),
                    ParamLocation::Register(_) => None,
                },
                value: param.value,
            })
            .collect();

        // All ranges are in bounds from here on
        for param in &params {
            if let Some(address) = param.address {
                memory.write(address, &vec![0; param.placement.slot_size])?;
                memory.write_word(address, param.value, param.placement.size.min(8))?;
            }
        }
        memory.write_word(return_address_slot, return_address, word)?;
        memory.write_word(saved_fp_slot, caller_fp, word)?;

        Ok(StackFrame {
            id,
            function: decl.function.clone(),
            locals,
            params,
            saved_fp_slot,
            return_address_slot,
            frame_pointer,
            entry_stack_pointer,
            stack_pointer,
            saved_frame_pointer: caller_fp,
            return_address,
            word_size: word,
            stack_param_bytes: param_bytes,
            cleanup: conv.cleanup(),
            growth: memory.growth_direction(),
            local_index,
        })
    }

    /// Look up a local by name
    pub fn local(&self, name: &str) -> Option<&LocalSlot> {
        self.local_index.get(name).map(|&i| &self.locals[i])
    }

    pub fn param(&self, name: &str) -> Option<&ParamSlot> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Sum of aligned local sizes
    pub fn locals_size(&self) -> usize {
        self.locals.iter().map(|l| l.aligned_size).sum()
    }

    /// Locals + saved frame pointer + return address + stack-passed parameters
    pub fn total_size(&self) -> usize {
        self.locals_size() + 2 * self.word_size + self.stack_param_bytes
    }

    /// Address range covered by the frame
    pub fn region(&self) -> Range<Address> {
        match self.growth {
            GrowthDirection::TowardLow => self.stack_pointer..self.entry_stack_pointer,
            GrowthDirection::TowardHigh => self.entry_stack_pointer..self.stack_pointer,
        }
    }

    /// All fields, sorted by ascending address
    pub fn fields(&self) -> Vec<FrameField> {
        let word = self.word_size as Address;
        let mut fields: Vec<FrameField> = self
            .locals
            .iter()
            .map(|l| FrameField {
                kind: FieldKind::Local(l.name.clone()),
                range: l.range(),
            })
            .collect();
        fields.push(FrameField {
            kind: FieldKind::SavedFramePointer,
            range: self.saved_fp_slot..self.saved_fp_slot + word,
        });
        fields.push(FrameField {
            kind: FieldKind::SavedReturnAddress,
            range: self.return_address_slot..self.return_address_slot + word,
        });
        fields.extend(self.params.iter().filter_map(|p| {
            p.range().map(|range| FrameField {
                kind: FieldKind::Parameter(p.name.clone()),
                range,
            })
        }));
        fields.sort_by_key(|f| f.range.start);
        fields
    }

    /// Which field contains `address`
    pub fn field_at(&self, address: Address) -> FieldKind {
        let word = self.word_size as Address;
        if let Some(local) = self.locals.iter().find(|l| l.range().contains(&address)) {
            return FieldKind::Local(local.name.clone());
        }
        if (self.saved_fp_slot..self.saved_fp_slot + word).contains(&address) {
            return FieldKind::SavedFramePointer;
        }
        if (self.return_address_slot..self.return_address_slot + word).contains(&address) {
            return FieldKind::SavedReturnAddress;
        }
        self.params
            .iter()
            .find(|p| p.range().is_some_and(|r| r.contains(&address)))
            .map_or(FieldKind::BeyondFrame, |p| FieldKind::Parameter(p.name.clone()))
    }

    /// Return address currently stored in the frame (possibly overwritten)
    pub fn stored_return_address(&self, memory: &Memory) -> Result<u64, SimError> {
        memory.read_word(self.return_address_slot, self.word_size)
    }

    /// Saved frame pointer currently stored in the frame (possibly overwritten)
    pub fn stored_frame_pointer(&self, memory: &Memory) -> Result<u64, SimError> {
        memory.read_word(self.saved_fp_slot, self.word_size)
    }
}

/// Result of popping a frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnOutcome {
    /// Value loaded into the instruction pointer
    pub return_address: u64,
    /// Value loaded into the frame pointer
    pub caller_frame_pointer: u64,
    pub frame: StackFrame,
    /// Who released the stack-passed arguments
    pub cleaned_by: Cleanup,
}

impl ReturnOutcome {
    /// Control flow went somewhere other than the original call site
    pub fn is_hijacked(&self) -> bool {
        self.return_address != self.frame.return_address
    }
}

/// The call stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallStack {
    frames: Vec<StackFrame>,
    stack_pointer: Address,
    frame_pointer: Address,
    instruction_pointer: u64,
    next_call_id: usize,
}

impl CallStack {
    /// Empty stack with registers at the memory's starting position
    pub fn new(memory: &Memory, entry_point: u64) -> Self {
        let sp = memory.initial_stack_pointer();
        CallStack {
            frames: Vec::new(),
            stack_pointer: sp,
            frame_pointer: sp,
            instruction_pointer: entry_point,
            next_call_id: 0,
        }
    }

    /// Push a new frame for `decl`
    pub fn call(
        &mut self,
        memory: &mut Memory,
        conv: &CallingConvention,
        decl: &FrameDecl,
    ) -> Result<&StackFrame, SimError> {
        let id = self.next_call_id;
        let return_address = CALL_SITE_BASE + id as u64 * CALL_SITE_STRIDE;
        let frame = StackFrame::build(
            conv,
            memory,
            decl,
            id,
            self.stack_pointer,
            self.frame_pointer,
            return_address,
        )?;

        self.next_call_id += 1;
        self.stack_pointer = frame.stack_pointer;
        self.frame_pointer = frame.frame_pointer;
        self.instruction_pointer = FUNCTION_BASE + id as u64 * FUNCTION_STRIDE;
        self.frames.push(frame);
        Ok(&self.frames[self.frames.len() - 1])
    }

    /// Run the epilogue of the topmost frame.
    ///
    /// Whatever the frame's saved slots hold is loaded as-is: the return address into the
    /// instruction pointer and the saved frame pointer into the frame pointer register.
    /// Corrupted control data is never repaired, so a forged frame pointer stays visible
    /// in the caller's registers.
    pub fn ret(&mut self, memory: &Memory) -> Result<ReturnOutcome, SimError> {
        let frame = self.frames.last().ok_or(SimError::EmptyStack)?;
        let caller_frame_pointer = frame.stored_frame_pointer(memory)?;
        let return_address = frame.stored_return_address(memory)?;

        let frame = self.frames.pop().ok_or(SimError::EmptyStack)?;
        // Saved slots and parameter area are released together
        self.stack_pointer = frame.entry_stack_pointer;
        self.frame_pointer = caller_frame_pointer;
        self.instruction_pointer = return_address;

        Ok(ReturnOutcome {
            return_address,
            caller_frame_pointer,
            cleaned_by: frame.cleanup,
            frame,
        })
    }

    /// Get the current (top) frame
    pub fn current_frame(&self) -> Result<&StackFrame, SimError> {
        self.frames.last().ok_or(SimError::EmptyStack)
    }

    /// Find a live frame by call id
    pub fn frame(&self, id: usize) -> Option<&StackFrame> {
        self.frames.iter().find(|f| f.id == id)
    }

    /// Frame whose region contains `address`
    pub fn frame_containing(&self, address: Address) -> Option<&StackFrame> {
        self.frames.iter().find(|f| f.region().contains(&address))
    }

    /// Get all frames, oldest first (for UI display)
    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn stack_pointer(&self) -> Address {
        self.stack_pointer
    }

    pub fn frame_pointer(&self) -> Address {
        self.frame_pointer
    }

    pub fn instruction_pointer(&self) -> u64 {
        self.instruction_pointer
    }
}
