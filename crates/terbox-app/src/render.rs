//! Frame composition.
//!
//! Layout, top to bottom: tab strip, separator (doubles as status line),
//! output panel or overlay, input line.

use std::io::{self, Write};

use crossterm::cursor::MoveTo;
use crossterm::style::Print;
use crossterm::queue;
use terbox_tabs::text::{display_width, fit_to_width, truncate_to_width};
use terbox_tabs::THEME_NAMES;

use crate::input::Action;
use crate::state::{App, Mode, CHROME_ROWS};

/// Build every row of the screen, each exactly as wide as the terminal.
pub fn compose(app: &mut App) -> Vec<String> {
    let width = app.size.0 as usize;
    let height = app.size.1 as usize;
    if width == 0 || height == 0 {
        return Vec::new();
    }

    app.sync_tabs();
    let theme = app.viewport.theme().clone();
    let mut frame = Vec::with_capacity(height);

    let strip = app.viewport.render();
    if app.viewport.is_empty() {
        let hint = match app.config.binding(Action::NewTab.name()) {
            Some(chord) => format!(" no tabs, press {chord} to open one"),
            None => " no tabs".to_string(),
        };
        frame.push(theme.paint_panel(&fit_to_width(&hint, width)));
    } else {
        frame.push(strip.line);
    }
    let scrolled = app.active_output().map_or(0, |out| out.scroll_offset());
    let note = match &app.status {
        Some(status) => Some(status.clone()),
        None if scrolled > 0 => Some(format!("scrolled back {scrolled} lines")),
        None => None,
    };
    frame.push(theme.paint_separator(&rule(note.as_deref(), width)));

    let panel_height = height.saturating_sub(CHROME_ROWS as usize);
    let body: Vec<String> = match app.mode {
        Mode::Normal => app
            .active_output()
            .map(|out| out.window(panel_height).into_iter().map(str::to_string).collect())
            .unwrap_or_default(),
        Mode::Help => help_lines(app),
        Mode::Settings => settings_lines(app),
    };
    for row in 0..panel_height {
        let text = body.get(row).map(String::as_str).unwrap_or("");
        frame.push(theme.paint_panel(&fit_to_width(text, width)));
    }

    frame.push(prompt_line(&app.input, width));
    frame.truncate(height);
    frame
}

/// Write a composed frame to the terminal.
pub fn draw(app: &mut App, out: &mut impl Write) -> io::Result<()> {
    for (row, line) in compose(app).iter().enumerate() {
        queue!(out, MoveTo(0, row as u16), Print(line))?;
    }
    out.flush()
}

/// Horizontal rule with an optional message at its start.
fn rule(status: Option<&str>, width: usize) -> String {
    let label = status.map(|msg| format!("── {msg} ")).unwrap_or_default();
    let mut line = truncate_to_width(&label, width).to_string();
    let fill = width.saturating_sub(display_width(&line));
    line.extend(std::iter::repeat('─').take(fill));
    line
}

/// `$ input_`, scrolled so the cursor end stays visible.
fn prompt_line(input: &str, width: usize) -> String {
    let mut shown = input;
    while !shown.is_empty() && display_width(shown) + 3 > width {
        let mut chars = shown.chars();
        chars.next();
        shown = chars.as_str();
    }
    fit_to_width(&format!("$ {shown}_"), width)
}

fn help_lines(app: &App) -> Vec<String> {
    let mut lines = vec![" terbox help".to_string(), String::new()];
    for action in Action::ALL {
        let chord = app.config.binding(action.name()).unwrap_or("unbound");
        lines.push(format!("  {chord:<14}{}", action.description()));
    }
    for (key, what) in [
        ("1-9", "jump to a tab (input line empty)"),
        ("left/right", "previous or next tab, stopping at the ends"),
        ("up/down", "scroll the output one line"),
        ("pgup/pgdn", "scroll the output one page"),
        ("click", "select a tab in the strip"),
        ("enter", "send the input line to the active tab"),
        ("backspace", "delete the last character"),
        ("esc", "clear the input line"),
    ] {
        lines.push(format!("  {key:<14}{what}"));
    }
    lines.push(String::new());
    lines.push(" press any key to return".to_string());
    lines
}

fn settings_lines(app: &App) -> Vec<String> {
    let config = &app.config;
    let mut lines = vec![
        " terbox settings".to_string(),
        String::new(),
        format!("  {:<18}{}", "shell", config.shell),
        format!(
            "  {:<18}{} (available: {})",
            "theme",
            app.viewport.theme().name,
            THEME_NAMES.join(", ")
        ),
        format!("  {:<18}{}", "scrollback lines", config.scrollback_lines),
        format!("  {:<18}{}", "settings file", app.db_path.display()),
        format!("  {:<18}{}", "log file", crate::logging::log_path().display()),
        format!("  {:<18}{}", "open tabs", app.registry.session_count()),
        String::new(),
        "  keybindings".to_string(),
    ];
    for (action, chord) in &config.keybindings {
        lines.push(format!("    {action:<16}{chord}"));
    }
    lines.push(String::new());
    lines.push(" press any key to return".to_string());
    lines
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use terbox_db::Config;
    use tokio::sync::mpsc;

    use super::*;
    use crate::event::AppEvent;
    use crate::io_thread::OutputChunk;

    fn plain_app(cols: u16, rows: u16) -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut config = Config::default();
        config.shell = "/bin/sh".to_string();
        config.theme = "plain".to_string();
        App::new(config, PathBuf::from("/tmp/terbox.db"), (cols, rows), tx)
    }

    #[test]
    fn empty_registry_frame() {
        let mut app = plain_app(40, 6);
        let frame = compose(&mut app);
        assert_eq!(frame.len(), 6);
        assert!(frame[0].starts_with(" no tabs, press ctrl+t"));
        assert_eq!(frame[1], "─".repeat(40));
        assert_eq!(frame[5].trim_end(), "$ _");
        for line in &frame {
            assert_eq!(display_width(line), 40);
        }
    }

    #[test]
    fn panel_shows_tail_of_active_output() {
        let mut app = plain_app(30, 5);
        app.open_tab();
        let id = app.registry.get_active_id().unwrap();
        app.handle_event(AppEvent::Output {
            id,
            chunk: OutputChunk {
                lines: vec!["one".into(), "two".into(), "three".into()],
                partial: "$ ".into(),
            },
        });

        let frame = compose(&mut app);
        assert!(frame[0].starts_with(" [1] shell-1 "));
        // Two panel rows: the last completed line and the prompt.
        assert_eq!(frame[2].trim_end(), "three");
        assert_eq!(frame[3].trim_end(), "$");
        app.shutdown();
    }

    #[test]
    fn separator_notes_scrollback() {
        let mut app = plain_app(40, 5);
        app.open_tab();
        let id = app.registry.get_active_id().unwrap();
        app.handle_event(AppEvent::Output {
            id,
            chunk: OutputChunk {
                lines: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                partial: String::new(),
            },
        });
        app.handle_event(AppEvent::Key(KeyEvent::new(KeyCode::Up, KeyModifiers::NONE)));

        let frame = compose(&mut app);
        assert!(frame[1].starts_with("── scrolled back 1 lines "));
        assert_eq!(frame[2].trim_end(), "b");
        assert_eq!(frame[3].trim_end(), "c");
        app.shutdown();
    }

    #[test]
    fn status_message_on_separator() {
        let mut app = plain_app(30, 4);
        app.handle_event(AppEvent::Key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)));
        let frame = compose(&mut app);
        assert!(frame[1].starts_with("── "));
        assert!(frame[1].ends_with('─'));
        assert_eq!(display_width(&frame[1]), 30);
    }

    #[test]
    fn help_overlay_lists_bindings() {
        let mut app = plain_app(60, 20);
        app.handle_event(AppEvent::Key(KeyEvent::new(KeyCode::Char('h'), KeyModifiers::CONTROL)));
        let frame = compose(&mut app);
        let text = frame.join("\n");
        assert!(text.contains("terbox help"));
        assert!(text.contains("ctrl+t"));
        assert!(text.contains("open a new tab"));
    }

    #[test]
    fn settings_overlay_shows_config() {
        let mut app = plain_app(80, 24);
        app.handle_event(AppEvent::Key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL)));
        let text = compose(&mut app).join("\n");
        assert!(text.contains("/bin/sh"));
        assert!(text.contains("plain (available: default, dark, light, plain)"));
        assert!(text.contains("/tmp/terbox.db"));
        assert!(text.contains("new_tab"));
    }

    #[test]
    fn long_input_scrolls_left() {
        assert_eq!(prompt_line("ls", 8), "$ ls_   ");
        assert_eq!(prompt_line("abcdefgh", 8), "$ defgh_");
    }

    #[test]
    fn rule_truncates_long_status() {
        let line = rule(Some("a very long failure message"), 10);
        assert_eq!(display_width(&line), 10);
        assert!(line.starts_with("── a very"));
    }

    #[test]
    fn tiny_terminal_still_fits() {
        let mut app = plain_app(5, 2);
        let frame = compose(&mut app);
        assert_eq!(frame.len(), 2);
        assert!(compose(&mut plain_app(0, 0)).is_empty());
    }

    #[test]
    fn draw_writes_every_row() {
        let mut app = plain_app(20, 4);
        let mut out = Vec::new();
        draw(&mut app, &mut out).unwrap();
        let written = String::from_utf8(out).unwrap();
        assert!(written.contains("$ _"));
        assert!(written.contains("no tabs"));
    }
}
