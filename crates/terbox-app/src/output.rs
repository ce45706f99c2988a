use std::collections::VecDeque;

use crate::io_thread::OutputChunk;

/// Bounded scrollback for one tab.
///
/// Holds at most `capacity` completed lines; the oldest are dropped first.
/// The view can be scrolled back from the newest line.
#[derive(Debug)]
pub struct OutputBuffer {
    lines: VecDeque<String>,
    partial: String,
    capacity: usize,
    /// Lines hidden below the bottom of the view.
    scroll: usize,
}

impl OutputBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity.min(1024)),
            partial: String::new(),
            capacity,
            scroll: 0,
        }
    }

    pub fn push(&mut self, chunk: OutputChunk) {
        for line in chunk.lines {
            self.push_line(line);
        }
        self.partial = chunk.partial;
    }

    pub fn push_line(&mut self, line: String) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    /// Completed lines held.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.partial.is_empty()
    }

    /// Rows shown, counting the unterminated line.
    fn rows(&self) -> usize {
        self.lines.len() + usize::from(!self.partial.is_empty())
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll
    }

    /// Scroll toward older output, stopping when the oldest line reaches the
    /// top of a `height`-row view.
    pub fn scroll_up(&mut self, lines: usize, height: usize) {
        let max = self.rows().saturating_sub(height);
        self.scroll = (self.scroll + lines).min(max);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll = 0;
    }

    /// Up to `height` lines to display, oldest first, ending `scroll_offset`
    /// rows above the newest. The unterminated line counts as the newest.
    pub fn window(&self, height: usize) -> Vec<&str> {
        let mut all: Vec<&str> = self.lines.iter().map(String::as_str).collect();
        if !self.partial.is_empty() {
            all.push(&self.partial);
        }
        let offset = self.scroll.min(all.len().saturating_sub(height));
        let end = all.len() - offset;
        all.truncate(end);
        let start = end.saturating_sub(height);
        all.split_off(start)
    }
}
