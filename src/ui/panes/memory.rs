//! Memory pane: hex dump of the whole stack region
//!
//! Each row shows an address, the bytes as hex and an ASCII column. Bytes written by the
//! last buffer write are highlighted, bytes inside a live frame are brighter than free
//! space, and the rows holding SP and FP are tagged.

use super::utils::{clamp_scroll, pane_block, visible_height, window};
use crate::memory::stack::CallStack;
use crate::memory::{Address, Memory};
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem},
    Frame,
};
use std::ops::Range;

/// Scroll state for the memory pane
pub struct MemoryScrollState {
    pub offset: usize,
    /// Address the view last jumped to; a new one re-centres the view
    pub prev_focus: Option<Address>,
}

/// Data needed to render the memory pane
pub struct MemoryRenderData<'a> {
    pub memory: &'a Memory,
    pub stack: &'a CallStack,
    pub written: Option<Range<Address>>,
}

/// Bytes per row for a pane of `content_width` columns
fn row_width(content_width: usize) -> usize {
    // "0x00000000  " + 16 × "xx " + " " + 16 ascii + " ← sp fp"
    if content_width >= 12 + 48 + 1 + 16 + 8 {
        16
    } else {
        8
    }
}

fn ascii(byte: u8) -> char {
    if byte.is_ascii_graphic() || byte == b' ' {
        byte as char
    } else {
        '.'
    }
}

/// Render the memory pane
pub fn render_memory_pane(
    frame: &mut Frame,
    area: Rect,
    data: MemoryRenderData,
    is_focused: bool,
    scroll_state: &mut MemoryScrollState,
) {
    let block = pane_block(" Stack Memory ", is_focused);
    let content_width = area.width.saturating_sub(2) as usize;
    let per_row = row_width(content_width);

    let bytes = data.memory.as_bytes();
    let sp = data.stack.stack_pointer();
    let fp = data.stack.frame_pointer();
    let in_frame = |address: Address| data.stack.frame_containing(address).is_some();
    let is_written = |address: Address| {
        data.written
            .as_ref()
            .is_some_and(|w| w.contains(&address))
    };

    let mut all_items = Vec::with_capacity(bytes.len().div_ceil(per_row));
    for (row, chunk) in bytes.chunks(per_row).enumerate() {
        let base = (row * per_row) as Address;
        let mut spans = vec![Span::styled(
            format!("0x{:08x}  ", base),
            Style::default().fg(DEFAULT_THEME.comment),
        )];

        for (i, byte) in chunk.iter().enumerate() {
            let address = base + i as Address;
            let style = if is_written(address) {
                Style::default()
                    .fg(DEFAULT_THEME.secondary)
                    .add_modifier(Modifier::BOLD)
            } else if in_frame(address) {
                Style::default().fg(DEFAULT_THEME.number)
            } else {
                Style::default().fg(DEFAULT_THEME.comment)
            };
            let style = if address == sp {
                style.add_modifier(Modifier::UNDERLINED)
            } else {
                style
            };
            spans.push(Span::styled(format!("{:02x} ", byte), style));
        }

        let text: String = chunk.iter().map(|&b| ascii(b)).collect();
        spans.push(Span::styled(
            format!(" {}", text),
            Style::default().fg(DEFAULT_THEME.fg),
        ));

        let row_range = base..base + chunk.len() as Address;
        let mut tags = Vec::new();
        if row_range.contains(&sp) {
            tags.push("sp");
        }
        if row_range.contains(&fp) {
            tags.push("fp");
        }
        if !tags.is_empty() {
            spans.push(Span::styled(
                format!(" ← {}", tags.join(" ")),
                Style::default()
                    .fg(DEFAULT_THEME.primary)
                    .add_modifier(Modifier::BOLD),
            ));
        }

        all_items.push(ListItem::new(Line::from(spans)));
    }

    let total_items = all_items.len();
    let visible_height = visible_height(area.height);

    // Jump to the last write, or to SP, whenever it moves
    let focus = data.written.as_ref().map_or(sp, |w| w.start);
    if scroll_state.prev_focus != Some(focus) {
        let focus_row = (focus as usize / per_row).min(total_items.saturating_sub(1));
        scroll_state.offset = focus_row.saturating_sub(visible_height / 2);
        scroll_state.prev_focus = Some(focus);
    }
    scroll_state.offset = clamp_scroll(scroll_state.offset, total_items, visible_height);

    let list = List::new(window(all_items, scroll_state.offset, visible_height)).block(block);
    frame.render_widget(list, area);
}
