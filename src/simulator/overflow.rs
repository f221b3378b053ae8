//! Buffer writes that run past their bounds
//!
//! [`OverflowEngine::write_buffer`] copies a payload into a named local starting at the
//! local's base address and keeps going for as long as the payload lasts. Nothing stops
//! at the declared size; the only hard limit is the memory itself.
//!
//! Every byte written is attributed to the frame field it lands in, so the resulting
//! [`OverflowReport`] reads like a post-mortem:
//!
//! ```text
//! buffer1            [0..8)    41 41 41 41 41 41 41 41
//! buffer2            [8..20)   41 41 41 41 41 41 41 41 41 41 41 41
//! savedFramePointer  [20..24)  41 41 41 41
//! savedReturnAddress [24..26)  41 41
//! ```

use crate::memory::stack::{FieldKind, StackFrame};
use crate::memory::{Address, Memory};
use crate::simulator::errors::SimError;
use std::ops::Range;

/// A run of consecutive payload bytes that landed in one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TouchedField {
    pub field: FieldKind,
    /// Offsets into the payload
    pub offsets: Range<usize>,
    pub addresses: Range<Address>,
    /// Resulting raw bytes
    pub bytes: Vec<u8>,
}

impl TouchedField {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// What a buffer write did to the frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverflowReport {
    pub function: String,
    pub buffer: String,
    pub declared_size: usize,
    pub bytes_written: usize,
    /// Address range written
    pub written: Range<Address>,
    /// Fields in the order the write reached them
    pub fields_touched: Vec<TouchedField>,
    /// New return address when the whole return slot was overwritten
    pub hijacked_return_address: Option<u64>,
    /// New saved frame pointer when the whole slot was overwritten
    pub clobbered_frame_pointer: Option<u64>,
}

impl OverflowReport {
    /// The payload did not fit in the declared buffer
    pub fn overflowed(&self) -> bool {
        self.bytes_written > self.declared_size
    }

    /// Find the run for a given field
    pub fn touched(&self, field: &FieldKind) -> Option<&TouchedField> {
        self.fields_touched.iter().find(|t| &t.field == field)
    }

    /// `(field, byte count)` pairs in write order
    pub fn summary(&self) -> Vec<(String, usize)> {
        self.fields_touched
            .iter()
            .map(|t| (t.field.to_string(), t.len()))
            .collect()
    }
}

/// Writes payloads into frame locals
pub struct OverflowEngine<'m> {
    memory: &'m mut Memory,
}

impl<'m> OverflowEngine<'m> {
    pub fn new(memory: &'m mut Memory) -> Self {
        OverflowEngine { memory }
    }

    /// Write `data` into the local `buffer` of `frame`, unbounded by the local's size.
    ///
    /// Fails with [`SimError::UnknownBuffer`] for undeclared locals and with
    /// [`SimError::OutOfBounds`] if the payload would leave the memory, in which case
    /// nothing is written.
    pub fn write_buffer(
        &mut self,
        frame: &StackFrame,
        buffer: &str,
        data: &[u8],
    ) -> Result<OverflowReport, SimError> {
        let local = frame.local(buffer).ok_or_else(|| SimError::UnknownBuffer {
            name: buffer.to_string(),
            function: frame.function.clone(),
        })?;
        let start = local.address;
        self.memory.write(start, data)?;
        let written = start..start + data.len() as Address;

        let mut touched: Vec<TouchedField> = Vec::new();
        for (offset, &byte) in data.iter().enumerate() {
            let address = start + offset as Address;
            let field = frame.field_at(address);

            match touched.last_mut() {
                Some(run) if run.field == field => {
                    run.offsets.end = offset + 1;
                    run.addresses.end = address + 1;
                    run.bytes.push(byte);
                }
                _ => touched.push(TouchedField {
                    field,
                    offsets: offset..offset + 1,
                    addresses: address..address + 1,
                    bytes: vec![byte],
                }),
            }
        }

        let word = frame.word_size as Address;
        let covers = |slot: Address| written.start <= slot && slot + word <= written.end;
        let hijacked_return_address = if covers(frame.return_address_slot) {
            Some(frame.stored_return_address(&*self.memory)?)
        } else {
            None
        };
        let clobbered_frame_pointer = if covers(frame.saved_fp_slot) {
            Some(frame.stored_frame_pointer(&*self.memory)?)
        } else {
            None
        };

        Ok(OverflowReport {
            function: frame.function.clone(),
            buffer: buffer.to_string(),
            declared_size: local.declared_size,
            bytes_written: data.len(),
            written,
            fields_touched: touched,
            hijacked_return_address,
            clobbered_frame_pointer,
        })
    }
}
