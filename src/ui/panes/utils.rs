//! Shared helpers for pane rendering
//!
//! All functions here are `pub(super)`: only the pane modules use them.

use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    style::{Modifier, Style},
    widgets::{Block, Borders, ListItem},
};

/// Bordered block with the focus-dependent border style
pub(super) fn pane_block(title: &str, is_focused: bool) -> Block<'_> {
    let border_style = if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    };

    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style)
}

/// Rows that fit inside a bordered pane of `height` cells, min 1
pub(super) fn visible_height(height: u16) -> usize {
    height.saturating_sub(2).max(1) as usize
}

/// Clamp `offset` so the window never scrolls past the last item
pub(super) fn clamp_scroll(offset: usize, total_items: usize, visible_height: usize) -> usize {
    if total_items > visible_height {
        offset.min(total_items - visible_height)
    } else {
        0
    }
}

/// Take the visible slice of `items`
pub(super) fn window<'a>(
    items: Vec<ListItem<'a>>,
    offset: usize,
    visible_height: usize,
) -> Vec<ListItem<'a>> {
    items.into_iter().skip(offset).take(visible_height).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_scroll() {
        assert_eq!(clamp_scroll(usize::MAX, 30, 10), 20);
        assert_eq!(clamp_scroll(5, 30, 10), 5);
        assert_eq!(clamp_scroll(5, 8, 10), 0);
    }

    #[test]
    fn test_visible_height() {
        assert_eq!(visible_height(12), 10);
        assert_eq!(visible_height(1), 1);
    }
}
