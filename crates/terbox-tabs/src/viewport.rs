//! Horizontally scrollable tab strip.
//!
//! The strip shows a contiguous window `[start, end)` of the tab sequence.
//! The window starts at the scroll offset and greedily takes tabs until the
//! next one would overflow the available width. After every state change the
//! active tab is inside the window: moving left aligns it to the window's
//! start, moving right aligns it to the window's end.

use std::ops::Range;

use crate::text::{display_width, truncate_to_width};
use crate::theme::Theme;

/// Columns reserved for the two scroll indicators.
pub const INDICATOR_RESERVE: usize = 4;
/// Smallest width the layout ever works with, however narrow the screen.
pub const MIN_AVAILABLE_WIDTH: usize = 10;
/// One column of padding on each side of a label.
pub const TAB_PADDING: usize = 2;

pub const LEFT_INDICATOR: &str = "◀ ";
pub const RIGHT_INDICATOR: &str = " ▶";

/// Errors from tab addressing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabError {
    NotFound(String),
    IndexOutOfRange(usize),
    DuplicateId(String),
}

impl std::fmt::Display for TabError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TabError::NotFound(id) => write!(f, "tab {id} not found"),
            TabError::IndexOutOfRange(idx) => write!(f, "tab index {idx} out of range"),
            TabError::DuplicateId(id) => write!(f, "tab {id} already exists"),
        }
    }
}

impl std::error::Error for TabError {}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Tab {
    id: String,
    label: String,
}

/// Output of one render pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedStrip {
    /// Styled line, exactly `width` columns wide.
    pub line: String,
    /// Same columns without styling.
    pub plain: String,
    /// Starting column of each rendered tab, in window order.
    pub positions: Vec<usize>,
    /// Tab indices shown in this pass.
    pub visible: Range<usize>,
}

/// Scroll and selection state for the tab strip.
pub struct TabViewport {
    tabs: Vec<Tab>,
    active: usize,
    width: usize,
    scroll_offset: usize,
    theme: Theme,
    // Hit-test table from the last render: (tab index, start column, columns).
    hit_cells: Vec<(usize, usize, usize)>,
}

impl TabViewport {
    pub fn new(theme: Theme) -> Self {
        Self {
            tabs: Vec::new(),
            active: 0,
            width: 0,
            scroll_offset: 0,
            theme,
            hit_cells: Vec::new(),
        }
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        self.ensure_active_visible();
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn set_width(&mut self, width: usize) {
        self.width = width;
        self.ensure_active_visible();
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Tab ids in display order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.tabs.iter().map(|t| t.id.as_str())
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.tabs.iter().position(|t| t.id == id)
    }

    /// Replace every tab with a fresh snapshot, e.g. from the session registry.
    ///
    /// `active` is the active position in `tabs`; `None` keeps the current
    /// index, clamped to the new length.
    pub fn sync<I, S, L>(&mut self, tabs: I, active: Option<usize>)
    where
        I: IntoIterator<Item = (S, L)>,
        S: Into<String>,
        L: Into<String>,
    {
        self.tabs = tabs
            .into_iter()
            .map(|(id, label)| Tab {
                id: id.into(),
                label: label.into(),
            })
            .collect();
        if let Some(active) = active {
            self.active = active;
        }
        self.clamp();
        self.ensure_active_visible();
    }

    /// Append a tab at the end of the strip.
    pub fn add_tab(&mut self, id: &str, label: &str) -> Result<(), TabError> {
        if self.index_of(id).is_some() {
            return Err(TabError::DuplicateId(id.to_string()));
        }
        self.tabs.push(Tab {
            id: id.to_string(),
            label: label.to_string(),
        });
        self.ensure_active_visible();
        Ok(())
    }

    /// Remove the tab `id`.
    ///
    /// Removing a tab left of the active one keeps the same tab active.
    /// Removing the active tab keeps the index, so the tab that slid into its
    /// place becomes active; if it was the last tab the selection moves left.
    pub fn remove_tab(&mut self, id: &str) -> Result<(), TabError> {
        let idx = self
            .index_of(id)
            .ok_or_else(|| TabError::NotFound(id.to_string()))?;
        self.tabs.remove(idx);
        if idx < self.active {
            self.active -= 1;
        }
        self.clamp();
        self.ensure_active_visible();
        Ok(())
    }

    pub fn set_label(&mut self, id: &str, label: &str) -> Result<(), TabError> {
        let idx = self
            .index_of(id)
            .ok_or_else(|| TabError::NotFound(id.to_string()))?;
        self.tabs[idx].label = label.to_string();
        self.ensure_active_visible();
        Ok(())
    }

    /// Active tab index; `None` when there are no tabs.
    pub fn active_index(&self) -> Option<usize> {
        if self.tabs.is_empty() {
            None
        } else {
            Some(self.active)
        }
    }

    pub fn active_id(&self) -> Option<&str> {
        self.tabs.get(self.active).map(|t| t.id.as_str())
    }

    pub fn set_active(&mut self, index: usize) -> Result<(), TabError> {
        if index >= self.tabs.len() {
            return Err(TabError::IndexOutOfRange(index));
        }
        self.active = index;
        self.ensure_active_visible();
        Ok(())
    }

    /// Move the selection one tab right; stops at the last tab.
    pub fn select_next(&mut self) -> bool {
        if self.active + 1 >= self.tabs.len() {
            return false;
        }
        self.active += 1;
        self.ensure_active_visible();
        true
    }

    /// Move the selection one tab left; stops at the first tab.
    pub fn select_prev(&mut self) -> bool {
        if self.active == 0 || self.tabs.is_empty() {
            return false;
        }
        self.active -= 1;
        self.ensure_active_visible();
        true
    }

    /// Select by 1-based number (the 1-9 shortcuts).
    pub fn select_number(&mut self, number: usize) -> bool {
        match number.checked_sub(1) {
            Some(idx) => self.set_active(idx).is_ok(),
            None => false,
        }
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    /// Scroll to `offset` (clamped). The active tab is kept visible.
    pub fn set_scroll_offset(&mut self, offset: usize) {
        self.scroll_offset = offset.min(self.tabs.len().saturating_sub(1));
        self.ensure_active_visible();
    }

    /// Width the tabs themselves may use.
    fn available_width(&self) -> usize {
        self.width
            .saturating_sub(INDICATOR_RESERVE)
            .max(MIN_AVAILABLE_WIDTH)
    }

    fn tab_width(&self, idx: usize) -> usize {
        self.theme.label_width(&self.tabs[idx].label) + TAB_PADDING
    }

    /// Tabs that fit starting at the scroll offset. Never empty while tabs exist.
    pub fn visible_range(&self) -> Range<usize> {
        if self.tabs.is_empty() {
            return 0..0;
        }
        let available = self.available_width();
        let start = self.scroll_offset.min(self.tabs.len() - 1);
        let mut used = 0;
        let mut end = start;
        while end < self.tabs.len() {
            let w = self.tab_width(end);
            if used + w > available && end > start {
                break;
            }
            used += w;
            end += 1;
        }
        start..end
    }

    /// Re-establish the invariant that the active tab is inside the window.
    pub fn ensure_active_visible(&mut self) {
        if self.tabs.is_empty() {
            self.scroll_offset = 0;
            return;
        }
        let range = self.visible_range();

        if self.active < range.start {
            self.scroll_offset = self.active;
            return;
        }

        if self.active >= range.end {
            // Walk left from the active tab while the preceding tab still fits.
            let available = self.available_width();
            let mut start = self.active;
            let mut used = self.tab_width(start);
            while start > 0 {
                let w = self.tab_width(start - 1);
                if used + w > available {
                    break;
                }
                used += w;
                start -= 1;
            }
            self.scroll_offset = start;
        }
    }

    /// Lay out the strip at exactly `width` columns and record click positions.
    pub fn render(&mut self) -> RenderedStrip {
        let visible = self.visible_range();
        let mut segments: Vec<Segment> = Vec::with_capacity(visible.len() + 2);

        if visible.start > 0 {
            segments.push(Segment::Indicator(LEFT_INDICATOR.to_string()));
        }
        for idx in visible.clone() {
            segments.push(Segment::Tab {
                idx,
                cell: format!(" {} ", self.tabs[idx].label),
            });
        }
        if visible.end < self.tabs.len() {
            segments.push(Segment::Indicator(RIGHT_INDICATOR.to_string()));
        }

        let mut line = String::new();
        let mut plain = String::new();
        let mut positions = Vec::with_capacity(visible.len());
        self.hit_cells.clear();
        let mut col = 0;

        for segment in &segments {
            let text = segment.text();
            let full = display_width(text);
            let room = self.width.saturating_sub(col);
            let shown = if full <= room { text } else { truncate_to_width(text, room) };

            match segment {
                Segment::Indicator(_) => line.push_str(&self.theme.paint_indicator(shown)),
                Segment::Tab { idx, .. } => {
                    positions.push(col);
                    // Columns come from the label, so hit-testing matches the greedy layout.
                    let cell_width = self.tab_width(*idx);
                    self.hit_cells.push((*idx, col, cell_width));
                    line.push_str(&self.theme.paint_tab(shown, *idx == self.active));
                }
            }
            plain.push_str(shown);
            col += full;
        }

        let used = display_width(&plain);
        if used < self.width {
            let pad = " ".repeat(self.width - used);
            line.push_str(&pad);
            plain.push_str(&pad);
        }

        RenderedStrip {
            line,
            plain,
            positions,
            visible,
        }
    }

    /// Tab index under column `x` in the last rendered strip.
    pub fn hit_test(&self, x: usize) -> Option<usize> {
        self.hit_cells
            .iter()
            .find(|(_, start, width)| *start <= x && x < *start + *width && x < self.width)
            .map(|(idx, _, _)| *idx)
    }

    /// Activate the tab under column `x`. Returns the new active index.
    pub fn click(&mut self, x: usize) -> Option<usize> {
        let idx = self.hit_test(x)?;
        self.set_active(idx).ok()?;
        Some(idx)
    }

    fn clamp(&mut self) {
        if self.tabs.is_empty() {
            self.active = 0;
            self.scroll_offset = 0;
            return;
        }
        if self.active >= self.tabs.len() {
            self.active = self.tabs.len() - 1;
        }
        if self.scroll_offset >= self.tabs.len() {
            self.scroll_offset = self.tabs.len() - 1;
        }
    }
}

enum Segment {
    Indicator(String),
    Tab { idx: usize, cell: String },
}

impl Segment {
    fn text(&self) -> &str {
        match self {
            Segment::Indicator(text) => text,
            Segment::Tab { cell, .. } => cell,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Ten tabs of eight columns each (six-column labels plus padding).
    fn ten_tabs(width: usize) -> TabViewport {
        let mut vp = TabViewport::new(Theme::plain());
        vp.set_width(width);
        for i in 0..10 {
            vp.add_tab(&format!("s{i}"), &format!("tab--{i}")).unwrap();
        }
        vp
    }

    fn abc() -> TabViewport {
        let mut vp = TabViewport::new(Theme::plain());
        vp.set_width(80);
        vp.sync([("a", "a"), ("b", "b"), ("c", "c")], Some(0));
        vp
    }

    #[test]
    fn test_initial_window_and_right_indicator() {
        let mut vp = ten_tabs(20);
        assert_eq!(vp.visible_range(), 0..2);

        let strip = vp.render();
        assert_eq!(strip.plain, " tab--0  tab--1  ▶  ");
        assert_eq!(strip.positions, vec![0, 8]);
        assert_eq!(display_width(&strip.plain), 20);
    }

    #[test]
    fn test_jump_to_last_shows_left_indicator() {
        let mut vp = ten_tabs(20);
        vp.set_active(9).unwrap();

        let strip = vp.render();
        assert!(strip.visible.contains(&9));
        assert!(strip.plain.starts_with(LEFT_INDICATOR));
        assert!(!strip.plain.contains('▶'));
        assert_eq!(strip.visible, 8..10);
        assert_eq!(strip.positions, vec![2, 10]);
    }

    #[test]
    fn test_scroll_right_aligns_active_to_end() {
        let mut vp = ten_tabs(20);
        vp.set_active(1).unwrap();
        assert_eq!(vp.scroll_offset(), 0);

        assert!(vp.select_next());
        assert_eq!(vp.scroll_offset(), 1);
        assert_eq!(vp.visible_range(), 1..3);
    }

    #[test]
    fn test_scroll_left_aligns_active_to_start() {
        let mut vp = ten_tabs(20);
        vp.set_active(9).unwrap();
        assert_eq!(vp.scroll_offset(), 8);

        assert!(vp.select_prev());
        assert_eq!(vp.active_index(), Some(8));
        assert_eq!(vp.scroll_offset(), 8);

        assert!(vp.select_prev());
        assert_eq!(vp.scroll_offset(), 7);
        assert_eq!(vp.visible_range(), 7..9);

        vp.set_active(3).unwrap();
        assert_eq!(vp.scroll_offset(), 3);
    }

    #[test]
    fn test_active_always_visible_while_walking() {
        let mut vp = ten_tabs(27);
        for _ in 0..9 {
            vp.select_next();
            assert!(vp.visible_range().contains(&vp.active_index().unwrap()));
        }
        for _ in 0..9 {
            vp.select_prev();
            assert!(vp.visible_range().contains(&vp.active_index().unwrap()));
        }
        assert!(!vp.select_prev());
    }

    #[test]
    fn test_zero_width_clamps_to_minimum() {
        let mut vp = ten_tabs(0);
        vp.set_active(5).unwrap();
        let range = vp.visible_range();
        assert!(!range.is_empty());
        assert!(range.contains(&5));
        assert_eq!(vp.render().plain, "");
    }

    #[test]
    fn test_oversized_label_still_visible() {
        let mut vp = TabViewport::new(Theme::plain());
        vp.set_width(12);
        vp.sync(
            [("a", "short"), ("b", "a label much wider than the strip")],
            Some(1),
        );
        assert_eq!(vp.visible_range(), 1..2);

        let strip = vp.render();
        assert_eq!(display_width(&strip.plain), 12);
        assert!(strip.plain.starts_with("◀  a label"));
    }

    #[test]
    fn test_width_change_keeps_active_visible() {
        let mut vp = ten_tabs(80);
        vp.set_active(8).unwrap();
        assert_eq!(vp.scroll_offset(), 0);

        vp.set_width(20);
        assert!(vp.visible_range().contains(&8));
    }

    #[test]
    fn test_hit_test_maps_columns_to_tabs() {
        let mut vp = ten_tabs(20);
        vp.set_active(9).unwrap();
        vp.render();

        assert_eq!(vp.hit_test(0), None);
        assert_eq!(vp.hit_test(1), None);
        assert_eq!(vp.hit_test(2), Some(8));
        assert_eq!(vp.hit_test(9), Some(8));
        assert_eq!(vp.hit_test(10), Some(9));
        assert_eq!(vp.hit_test(17), Some(9));
        assert_eq!(vp.hit_test(18), None);
    }

    #[test]
    fn test_click_activates_tab() {
        let mut vp = ten_tabs(20);
        vp.render();
        assert_eq!(vp.click(9), Some(1));
        assert_eq!(vp.active_index(), Some(1));
        assert_eq!(vp.click(19), None);
        assert_eq!(vp.active_index(), Some(1));
    }

    #[test]
    fn test_remove_last_active_moves_left() {
        let mut vp = abc();
        vp.set_active(2).unwrap();
        vp.remove_tab("c").unwrap();
        assert_eq!(vp.active_index(), Some(1));
        assert_eq!(vp.active_id(), Some("b"));
    }

    #[test]
    fn test_remove_active_middle_keeps_index() {
        let mut vp = abc();
        vp.set_active(1).unwrap();
        vp.remove_tab("b").unwrap();
        assert_eq!(vp.active_index(), Some(1));
        assert_eq!(vp.active_id(), Some("c"));
    }

    #[test]
    fn test_remove_before_active_keeps_same_tab() {
        let mut vp = abc();
        vp.set_active(2).unwrap();
        vp.remove_tab("a").unwrap();
        assert_eq!(vp.active_index(), Some(1));
        assert_eq!(vp.active_id(), Some("c"));

        vp.remove_tab("b").unwrap();
        assert_eq!(vp.active_id(), Some("c"));
    }

    #[test]
    fn test_remove_after_active_keeps_index() {
        let mut vp = abc();
        vp.set_active(0).unwrap();
        vp.remove_tab("c").unwrap();
        assert_eq!(vp.active_id(), Some("a"));
    }

    #[test]
    fn test_remove_everything() {
        let mut vp = abc();
        for id in ["a", "b", "c"] {
            vp.remove_tab(id).unwrap();
        }
        assert!(vp.is_empty());
        assert_eq!(vp.active_index(), None);
        assert_eq!(vp.visible_range(), 0..0);
        assert_eq!(vp.render().plain, " ".repeat(80));
        assert_eq!(vp.remove_tab("a"), Err(TabError::NotFound("a".to_string())));
    }

    #[test]
    fn test_removal_clamps_scroll_offset() {
        let mut vp = ten_tabs(20);
        vp.set_active(9).unwrap();
        for i in (2..10).rev() {
            vp.remove_tab(&format!("s{i}")).unwrap();
        }
        assert_eq!(vp.active_index(), Some(1));
        assert!(vp.visible_range().contains(&1));
        assert!(vp.scroll_offset() <= 1);
    }

    #[test]
    fn test_add_duplicate_and_labels() {
        let mut vp = abc();
        assert_eq!(vp.add_tab("a", "x"), Err(TabError::DuplicateId("a".to_string())));

        vp.set_label("b", "renamed").unwrap();
        assert!(vp.render().plain.starts_with(" a  renamed  c "));
        assert!(vp.set_label("zz", "x").is_err());
        assert_eq!(vp.ids().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_select_number_and_bounds() {
        let mut vp = abc();
        assert!(vp.select_number(3));
        assert_eq!(vp.active_index(), Some(2));
        assert!(!vp.select_number(0));
        assert!(!vp.select_number(9));
        assert_eq!(vp.set_active(7), Err(TabError::IndexOutOfRange(7)));
        assert!(!vp.select_next());
    }

    #[test]
    fn test_set_scroll_offset_is_self_correcting() {
        let mut vp = ten_tabs(20);
        vp.set_scroll_offset(5);
        // Active tab 0 would fall out of view, so the window follows it back.
        assert_eq!(vp.scroll_offset(), 0);

        vp.set_active(6).unwrap();
        vp.set_scroll_offset(100);
        assert!(vp.visible_range().contains(&6));
    }

    #[test]
    fn test_sync_clamps_active() {
        let mut vp = abc();
        vp.set_active(2).unwrap();
        vp.sync([("a", "a")], None);
        assert_eq!(vp.active_index(), Some(0));
    }

    #[test]
    fn test_styled_line_contains_labels() {
        let mut vp = TabViewport::new(Theme::default_theme());
        vp.set_width(30);
        vp.sync([("a", "one"), ("b", "two")], Some(1));
        let strip = vp.render();
        assert!(strip.line.contains(" one "));
        assert!(strip.line.contains(" two "));
        assert_eq!(display_width(&strip.plain), 30);
    }
}
