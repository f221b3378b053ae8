//! Trace pane rendering

use super::utils::{clamp_scroll, pane_block, visible_height, window};
use crate::snapshot::TraceLog;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, Padding, Paragraph},
    Frame,
};

/// Render the trace pane
pub fn render_trace_pane(
    frame: &mut Frame,
    area: Rect,
    trace: &TraceLog,
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let block = pane_block(" Trace ", is_focused);

    if trace.lines.is_empty() {
        let paragraph = Paragraph::new("(nothing yet)")
            .block(block)
            .style(Style::default().fg(DEFAULT_THEME.comment));
        frame.render_widget(paragraph, area);
        return;
    }

    let block = block.padding(Padding::new(1, 0, 0, 0));
    let last = trace.lines.len() - 1;
    let all_items: Vec<ListItem> = trace
        .lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let text_style = if line.text.contains("HIJACKED") || line.text.contains("not recorded") {
                Style::default().fg(DEFAULT_THEME.error)
            } else {
                Style::default().fg(DEFAULT_THEME.fg)
            };
            let item = ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:>3} ", line.step),
                    Style::default().fg(DEFAULT_THEME.comment),
                ),
                Span::styled(line.text.clone(), text_style),
            ]));
            // Latest line is the step being shown
            if i == last {
                item.style(
                    Style::default()
                        .bg(DEFAULT_THEME.current_line_bg)
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                item
            }
        })
        .collect();

    let total_items = all_items.len();
    let visible_height = visible_height(area.height);
    *scroll_offset = clamp_scroll(*scroll_offset, total_items, visible_height);

    let list = List::new(window(all_items, *scroll_offset, visible_height)).block(block);
    frame.render_widget(list, area);
}
