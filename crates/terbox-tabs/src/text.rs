//! Column-width helpers for plain (unstyled) text.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Terminal columns occupied by `text`.
pub fn display_width(text: &str) -> usize {
    text.graphemes(true).map(UnicodeWidthStr::width).sum()
}

/// Longest prefix of `text` that fits in `max_width` columns.
///
/// Never splits a grapheme; a wide grapheme that would straddle the limit is dropped.
pub fn truncate_to_width(text: &str, max_width: usize) -> &str {
    let mut used = 0;
    for (idx, grapheme) in text.grapheme_indices(true) {
        let w = UnicodeWidthStr::width(grapheme);
        if used + w > max_width {
            return &text[..idx];
        }
        used += w;
    }
    text
}

/// `text` cut or right-padded with spaces to exactly `width` columns.
pub fn fit_to_width(text: &str, width: usize) -> String {
    let cut = truncate_to_width(text, width);
    let mut out = String::with_capacity(cut.len() + width);
    out.push_str(cut);
    out.extend(std::iter::repeat(' ').take(width.saturating_sub(display_width(cut))));
    out
}
