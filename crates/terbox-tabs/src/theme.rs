use crossterm::style::{style, Color, Stylize};

use crate::text::display_width;

/// Immutable color scheme handed to rendering calls.
///
/// `None` colors leave the terminal default in place.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Theme {
    pub name: String,
    pub tab_active_fg: Option<Color>,
    pub tab_active_bg: Option<Color>,
    pub tab_inactive_fg: Option<Color>,
    pub tab_inactive_bg: Option<Color>,
    pub indicator_fg: Option<Color>,
    pub panel_fg: Option<Color>,
    pub separator_fg: Option<Color>,
}

/// Theme names accepted by [`Theme::by_name`].
pub const THEME_NAMES: &[&str] = &["default", "dark", "light", "plain"];

impl Theme {
    pub fn default_theme() -> Self {
        Self {
            name: "default".to_string(),
            tab_active_fg: Some(Color::AnsiValue(255)),
            tab_active_bg: Some(Color::AnsiValue(63)),
            tab_inactive_fg: Some(Color::AnsiValue(240)),
            tab_inactive_bg: None,
            indicator_fg: Some(Color::AnsiValue(228)),
            panel_fg: Some(Color::AnsiValue(255)),
            separator_fg: Some(Color::AnsiValue(239)),
        }
    }

    pub fn dark() -> Self {
        Self {
            name: "dark".to_string(),
            tab_active_fg: Some(Color::AnsiValue(15)),
            tab_active_bg: Some(Color::AnsiValue(17)),
            tab_inactive_fg: Some(Color::AnsiValue(245)),
            tab_inactive_bg: None,
            indicator_fg: Some(Color::AnsiValue(226)),
            panel_fg: Some(Color::AnsiValue(15)),
            separator_fg: Some(Color::AnsiValue(238)),
        }
    }

    pub fn light() -> Self {
        Self {
            name: "light".to_string(),
            tab_active_fg: Some(Color::AnsiValue(0)),
            tab_active_bg: Some(Color::AnsiValue(231)),
            tab_inactive_fg: Some(Color::AnsiValue(8)),
            tab_inactive_bg: None,
            indicator_fg: Some(Color::AnsiValue(226)),
            panel_fg: Some(Color::AnsiValue(0)),
            separator_fg: Some(Color::AnsiValue(250)),
        }
    }

    /// No colors at all; output is the bare text.
    pub fn plain() -> Self {
        Self {
            name: "plain".to_string(),
            tab_active_fg: None,
            tab_active_bg: None,
            tab_inactive_fg: None,
            tab_inactive_bg: None,
            indicator_fg: None,
            panel_fg: None,
            separator_fg: None,
        }
    }

    /// Look up a built-in theme by name.
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "default" => Some(Self::default_theme()),
            "dark" => Some(Self::dark()),
            "light" => Some(Self::light()),
            "plain" => Some(Self::plain()),
            _ => None,
        }
    }

    /// Columns `text` occupies once rendered, excluding tab padding.
    pub fn label_width(&self, text: &str) -> usize {
        display_width(text)
    }

    /// A tab label with one column of padding on each side.
    pub fn render_tab(&self, label: &str, active: bool) -> String {
        self.paint_tab(&format!(" {label} "), active)
    }

    /// Color an already padded (possibly truncated) tab cell.
    pub fn paint_tab(&self, cell: &str, active: bool) -> String {
        if active {
            paint(cell, self.tab_active_fg, self.tab_active_bg)
        } else {
            paint(cell, self.tab_inactive_fg, self.tab_inactive_bg)
        }
    }

    pub fn paint_indicator(&self, text: &str) -> String {
        paint(text, self.indicator_fg, None)
    }

    pub fn paint_panel(&self, text: &str) -> String {
        paint(text, self.panel_fg, None)
    }

    pub fn paint_separator(&self, text: &str) -> String {
        paint(text, self.separator_fg, None)
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::default_theme()
    }
}

fn paint(text: &str, fg: Option<Color>, bg: Option<Color>) -> String {
    if text.is_empty() || (fg.is_none() && bg.is_none()) {
        return text.to_string();
    }
    let mut styled = style(text);
    if let Some(fg) = fg {
        styled = styled.with(fg);
    }
    if let Some(bg) = bg {
        styled = styled.on(bg);
    }
    styled.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn by_name_covers_all_names() {
        for name in THEME_NAMES {
            let theme = Theme::by_name(name).expect("built-in theme");
            assert_eq!(theme.name, *name);
        }
        assert!(Theme::by_name("solarized").is_none());
    }

    #[test]
    fn plain_theme_adds_only_padding() {
        let theme = Theme::plain();
        assert_eq!(theme.render_tab("ls", true), " ls ");
        assert_eq!(theme.render_tab("ls", false), " ls ");
        assert_eq!(theme.paint_indicator("◀ "), "◀ ");
    }

    #[test]
    fn colored_theme_wraps_in_escapes() {
        let theme = Theme::default_theme();
        let active = theme.render_tab("ls", true);
        assert!(active.contains(" ls "));
        assert!(active.starts_with('\u{1b}'));
        assert_ne!(active, theme.render_tab("ls", false));
    }

    #[test]
    fn label_width_counts_columns() {
        let theme = Theme::default();
        assert_eq!(theme.label_width("[1] shell"), 9);
        assert_eq!(theme.label_width("日本"), 4);
    }
}
