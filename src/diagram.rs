//! Plain-text renderings of frames and overflow reports
//!
//! Used by `--print` mode and handy in tests. Nothing here touches a terminal; every
//! function returns a `String`.

use crate::memory::stack::{CallStack, FieldKind, StackFrame};
use crate::memory::{GrowthDirection, Memory};
use crate::simulator::OverflowReport;
use std::fmt::Write;

/// Short field label used in the one-line layout
fn short_name(kind: &FieldKind) -> String {
    match kind {
        FieldKind::SavedFramePointer => "sfp".to_string(),
        FieldKind::SavedReturnAddress => "ret".to_string(),
        other => other.to_string(),
    }
}

/// Space-separated lowercase hex bytes
pub fn hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// One-line picture of a frame, lowest address on the left:
///
/// ```text
/// [buffer1][buffer2][sfp][ret][a][b][c]
/// ```
pub fn render_layout_line(frame: &StackFrame) -> String {
    frame
        .fields()
        .iter()
        .map(|f| format!("[{}]", short_name(&f.kind)))
        .collect()
}

/// Value the prologue stored in a word-sized field, when there is one
fn expected_word(frame: &StackFrame, kind: &FieldKind) -> Option<u64> {
    match kind {
        FieldKind::SavedFramePointer => Some(frame.saved_frame_pointer),
        FieldKind::SavedReturnAddress => Some(frame.return_address),
        FieldKind::Parameter(name) => frame
            .param(name)
            .filter(|p| p.placement.size <= 8)
            .map(|p| p.value),
        _ => None,
    }
}

fn render_frame(out: &mut String, frame: &StackFrame, memory: &Memory) {
    let _ = writeln!(
        out,
        "frame #{} {}()  fp=0x{:08x} sp=0x{:08x}  {}",
        frame.id,
        frame.function,
        frame.frame_pointer,
        frame.stack_pointer,
        render_layout_line(frame)
    );

    let name_width = frame
        .fields()
        .iter()
        .map(|f| f.kind.to_string().len())
        .max()
        .unwrap_or(0);

    for field in frame.fields().iter().rev() {
        let len = (field.range.end - field.range.start) as usize;
        let bytes = memory.read(field.range.start, len).unwrap_or(&[]);
        let mut line = format!(
            "  0x{:08x}  {:<width$}  {}",
            field.range.start,
            field.kind.to_string(),
            hex_bytes(bytes),
            width = name_width
        );

        if let Some(expected) = expected_word(frame, &field.kind) {
            let size = match &field.kind {
                FieldKind::Parameter(name) => frame.param(name).map_or(len, |p| p.placement.size),
                _ => frame.word_size,
            };
            if let Ok(stored) = memory.read_word(field.range.start, size.min(8)) {
                let _ = write!(line, "  = 0x{:08x}", stored);
                if stored != expected {
                    let _ = write!(line, "  <- clobbered (was 0x{:08x})", expected);
                }
            }
        }
        let _ = writeln!(out, "{}", line);
    }
}

/// Every live frame as a field table, highest address first
pub fn render_stack(stack: &CallStack, memory: &Memory) -> String {
    let mut out = format!(
        "sp=0x{:08x} fp=0x{:08x} ip=0x{:08x}\n",
        stack.stack_pointer(),
        stack.frame_pointer(),
        stack.instruction_pointer()
    );
    if stack.is_empty() {
        out.push_str("(no frames)\n");
        return out;
    }

    // Oldest frames sit at the highest addresses when the stack grows down
    let frames: Vec<&StackFrame> = match memory.growth_direction() {
        GrowthDirection::TowardLow => stack.frames().iter().collect(),
        GrowthDirection::TowardHigh => stack.frames().iter().rev().collect(),
    };
    for frame in frames {
        render_frame(&mut out, frame, memory);
    }
    out
}

/// Field-by-field account of one buffer write
pub fn render_report(report: &OverflowReport) -> String {
    let mut out = format!(
        "write {} bytes into {}.{} (declared {} bytes",
        report.bytes_written, report.function, report.buffer, report.declared_size
    );
    if report.overflowed() {
        let _ = write!(
            out,
            ", {} past the end",
            report.bytes_written - report.declared_size
        );
    }
    out.push_str(")\n");

    let name_width = report
        .fields_touched
        .iter()
        .map(|t| t.field.to_string().len())
        .max()
        .unwrap_or(0);
    for touched in &report.fields_touched {
        let span = format!("[{}..{})", touched.offsets.start, touched.offsets.end);
        let _ = writeln!(
            out,
            "  {:<width$}  {:<9}  {}",
            touched.field.to_string(),
            span,
            hex_bytes(&touched.bytes),
            width = name_width
        );
    }

    if let Some(fp) = report.clobbered_frame_pointer {
        let _ = writeln!(out, "  saved frame pointer now 0x{:08x}", fp);
    }
    if let Some(address) = report.hijacked_return_address {
        let _ = writeln!(out, "  return address now 0x{:08x}", address);
    }
    out
}
