//! Stack pane rendering with frames and their fields
//!
//! Frames are listed in push order, oldest first. Inside a frame the fields follow the
//! same direction: from the caller's side (parameters, return address) toward the stack
//! pointer (locals), so reading top to bottom walks the stack the way it grew.
//!
//! # Highlighting
//!
//! - Bytes written by the last buffer write are shown in the accent colour
//! - Saved frame pointers and return addresses that no longer hold the value the
//!   prologue stored are flagged as clobbered
//! - After a return, the loaded instruction pointer is shown, flagged when hijacked

use super::utils::{clamp_scroll, pane_block, visible_height, window};
use crate::abi::{CallingConvention, ParamLocation};
use crate::memory::stack::{CallStack, FieldKind, FrameField, ReturnOutcome, StackFrame};
use crate::memory::{Address, GrowthDirection, Memory};
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem},
    Frame,
};
use std::ops::Range;

/// Scroll state for the stack pane
pub struct StackScrollState {
    pub offset: usize,
    pub prev_item_count: usize,
}

/// Data needed to render the stack pane
pub struct StackRenderData<'a> {
    pub stack: &'a CallStack,
    pub memory: &'a Memory,
    pub convention: &'a CallingConvention,
    pub last_return: Option<&'a ReturnOutcome>,
    /// Addresses written by the last buffer write
    pub written: Option<Range<Address>>,
}

/// Render the stack pane
pub fn render_stack_pane(
    frame: &mut Frame,
    area: Rect,
    data: StackRenderData,
    is_focused: bool,
    scroll_state: &mut StackScrollState,
) {
    let block = pane_block(" Call Stack ", is_focused);
    let frames = data.stack.frames();
    let mut all_items = Vec::new();

    all_items.push(ListItem::new(Line::from(vec![
        Span::styled("sp ", Style::default().fg(DEFAULT_THEME.comment)),
        Span::styled(
            format!("0x{:08x}", data.stack.stack_pointer()),
            Style::default().fg(DEFAULT_THEME.number),
        ),
        Span::styled("  fp ", Style::default().fg(DEFAULT_THEME.comment)),
        Span::styled(
            format!("0x{:08x}", data.stack.frame_pointer()),
            Style::default().fg(DEFAULT_THEME.number),
        ),
        Span::styled("  ip ", Style::default().fg(DEFAULT_THEME.comment)),
        Span::styled(
            format!("0x{:08x}", data.stack.instruction_pointer()),
            Style::default().fg(DEFAULT_THEME.number),
        ),
    ])));

    if frames.is_empty() {
        all_items.push(ListItem::new("(empty)").style(Style::default().fg(DEFAULT_THEME.comment)));
    }

    for (depth, stack_frame) in frames.iter().enumerate() {
        all_items.push(ListItem::new(""));
        push_frame(&mut all_items, stack_frame, depth, &data, depth + 1 == frames.len());
    }

    if let Some(outcome) = data.last_return {
        all_items.push(ListItem::new(""));
        all_items.push(ListItem::new(return_line(outcome)));
    }

    let total_items = all_items.len();
    let visible_height = visible_height(area.height);

    // Smart auto-scroll: scroll to bottom only when content grows
    if total_items > scroll_state.prev_item_count {
        scroll_state.offset = total_items.saturating_sub(visible_height);
    } else {
        scroll_state.offset = clamp_scroll(scroll_state.offset, total_items, visible_height);
    }
    scroll_state.prev_item_count = total_items;

    let list = List::new(window(all_items, scroll_state.offset, visible_height)).block(block);
    frame.render_widget(list, area);
}

fn push_frame(
    all_items: &mut Vec<ListItem<'static>>,
    stack_frame: &StackFrame,
    depth: usize,
    data: &StackRenderData,
    is_top: bool,
) {
    let name_style = if is_top {
        Style::default()
            .fg(DEFAULT_THEME.function)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.muted_function)
    };

    all_items.push(ListItem::new(Line::from(vec![
        Span::styled("▸ ", Style::default().fg(DEFAULT_THEME.secondary)),
        Span::styled(
            format!("Frame {} ", depth),
            Style::default().fg(DEFAULT_THEME.comment),
        ),
        Span::styled("│ ", Style::default().fg(DEFAULT_THEME.comment)),
        Span::styled(format!("{}()", stack_frame.function), name_style),
        Span::styled(
            format!("  #{} ", stack_frame.id),
            Style::default().fg(DEFAULT_THEME.comment),
        ),
    ])));
    all_items.push(ListItem::new(Line::from(vec![
        Span::styled("  ↪ returns to ", Style::default().fg(DEFAULT_THEME.comment)),
        Span::styled(
            format!("0x{:08x}", stack_frame.return_address),
            Style::default().fg(DEFAULT_THEME.number),
        ),
        Span::styled(
            format!("  fp 0x{:08x}", stack_frame.frame_pointer),
            Style::default().fg(DEFAULT_THEME.comment),
        ),
    ])));

    let mut fields = stack_frame.fields();
    if stack_frame.growth == GrowthDirection::TowardLow {
        fields.reverse();
    }
    let name_width = fields
        .iter()
        .map(|f| f.kind.to_string().len())
        .max()
        .unwrap_or(0);

    for field in &fields {
        all_items.push(ListItem::new(field_line(stack_frame, field, data, name_width)));
    }

    let registers: Vec<String> = stack_frame
        .params
        .iter()
        .filter_map(|p| match p.placement.location {
            ParamLocation::Register(index) => Some(match data.convention.register_name(index) {
                Some(register) => format!("{}→{}", p.name, register),
                None => p.name.clone(),
            }),
            ParamLocation::StackOffset(_) => None,
        })
        .collect();
    if !registers.is_empty() {
        all_items.push(ListItem::new(Line::from(Span::styled(
            format!("  in registers: {}", registers.join(", ")),
            Style::default().fg(DEFAULT_THEME.comment),
        ))));
    }
}

fn field_line(
    stack_frame: &StackFrame,
    field: &FrameField,
    data: &StackRenderData,
    name_width: usize,
) -> Line<'static> {
    let len = (field.range.end - field.range.start) as usize;
    let written = data.written.as_ref();
    let is_written = |address: Address| written.is_some_and(|w| w.contains(&address));

    let addr_style = if is_written(field.range.start) {
        Style::default()
            .fg(DEFAULT_THEME.secondary)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.comment)
    };
    let name_style = match field.kind {
        FieldKind::SavedFramePointer | FieldKind::SavedReturnAddress => {
            Style::default().fg(DEFAULT_THEME.type_name)
        }
        _ => Style::default().fg(DEFAULT_THEME.fg),
    };

    let mut spans = vec![
        Span::styled(format!("  0x{:08x} ", field.range.start), addr_style),
        Span::styled(
            format!("{:<width$} ", field.kind.to_string(), width = name_width),
            name_style,
        ),
    ];

    let bytes = data.memory.read(field.range.start, len).unwrap_or(&[]);
    for (i, byte) in bytes.iter().enumerate() {
        let style = if is_written(field.range.start + i as Address) {
            Style::default()
                .fg(DEFAULT_THEME.secondary)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(DEFAULT_THEME.number)
        };
        spans.push(Span::styled(format!("{:02x} ", byte), style));
    }

    let expected = match field.kind {
        FieldKind::SavedFramePointer => Some(stack_frame.saved_frame_pointer),
        FieldKind::SavedReturnAddress => Some(stack_frame.return_address),
        _ => None,
    };
    if let Some(expected) = expected {
        if let Ok(stored) = data.memory.read_word(field.range.start, stack_frame.word_size) {
            if stored != expected {
                spans.push(Span::styled(
                    format!("⚠ clobbered, was 0x{:08x}", expected),
                    Style::default()
                        .fg(DEFAULT_THEME.error)
                        .add_modifier(Modifier::BOLD),
                ));
            }
        }
    }

    Line::from(spans)
}

fn return_line(outcome: &ReturnOutcome) -> Line<'static> {
    let mut spans = vec![
        Span::styled(
            "  ↖ ",
            Style::default()
                .fg(DEFAULT_THEME.return_value)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("{}() returned to ", outcome.frame.function),
            Style::default().fg(DEFAULT_THEME.return_value),
        ),
        Span::styled(
            format!("0x{:08x}", outcome.return_address),
            Style::default()
                .fg(DEFAULT_THEME.return_value)
                .add_modifier(Modifier::BOLD),
        ),
    ];
    if outcome.is_hijacked() {
        spans.push(Span::styled(
            format!("  HIJACKED (expected 0x{:08x})", outcome.frame.return_address),
            Style::default()
                .fg(DEFAULT_THEME.error)
                .add_modifier(Modifier::BOLD),
        ));
    } else {
        spans.push(Span::styled(
            "  ✓",
            Style::default().fg(DEFAULT_THEME.success),
        ));
    }
    Line::from(spans)
}
