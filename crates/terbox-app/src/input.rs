//! Key chords and the actions they trigger.
//!
//! Chords are written the way they are stored in the settings table:
//! lowercase modifiers joined with `+`, e.g. `ctrl+t` or `ctrl+left`.

use std::collections::HashMap;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use terbox_db::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    NewTab,
    CloseTab,
    Settings,
    Help,
    NextTab,
    PrevTab,
    Quit,
}

impl Action {
    /// Every action, in help-screen order.
    pub const ALL: [Action; 7] = [
        Action::NewTab,
        Action::CloseTab,
        Action::NextTab,
        Action::PrevTab,
        Action::Help,
        Action::Settings,
        Action::Quit,
    ];

    /// Name used for the `keybinding.<name>` setting.
    pub fn name(self) -> &'static str {
        match self {
            Action::NewTab => "new_tab",
            Action::CloseTab => "close_tab",
            Action::Settings => "settings",
            Action::Help => "help",
            Action::NextTab => "next_tab",
            Action::PrevTab => "prev_tab",
            Action::Quit => "quit",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.name() == name)
    }

    pub fn description(self) -> &'static str {
        match self {
            Action::NewTab => "open a new tab",
            Action::CloseTab => "close the active tab",
            Action::Settings => "show settings",
            Action::Help => "show this help",
            Action::NextTab => "next tab",
            Action::PrevTab => "previous tab",
            Action::Quit => "quit",
        }
    }
}

/// Chord string for a key event, or `None` for keys that cannot be bound.
///
/// Shift is implied by the character for printable keys and only spelled out
/// for named keys.
pub fn chord(key: &KeyEvent) -> Option<String> {
    let base = match key.code {
        KeyCode::Char(' ') => "space".to_string(),
        KeyCode::Char(c) => c.to_lowercase().collect(),
        KeyCode::Left => "left".to_string(),
        KeyCode::Right => "right".to_string(),
        KeyCode::Up => "up".to_string(),
        KeyCode::Down => "down".to_string(),
        KeyCode::Home => "home".to_string(),
        KeyCode::End => "end".to_string(),
        KeyCode::PageUp => "pageup".to_string(),
        KeyCode::PageDown => "pagedown".to_string(),
        KeyCode::Tab => "tab".to_string(),
        KeyCode::BackTab => "backtab".to_string(),
        KeyCode::Enter => "enter".to_string(),
        KeyCode::Esc => "esc".to_string(),
        KeyCode::Backspace => "backspace".to_string(),
        KeyCode::Delete => "delete".to_string(),
        KeyCode::Insert => "insert".to_string(),
        KeyCode::F(n) => format!("f{n}"),
        _ => return None,
    };

    let mut parts: Vec<&str> = Vec::with_capacity(4);
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        parts.push("ctrl");
    }
    if key.modifiers.contains(KeyModifiers::ALT) {
        parts.push("alt");
    }
    if key.modifiers.contains(KeyModifiers::SHIFT) && !matches!(key.code, KeyCode::Char(_)) {
        parts.push("shift");
    }
    parts.push(&base);
    Some(parts.join("+"))
}

/// Chord -> action table built from the configured keybindings.
#[derive(Debug, Default)]
pub struct Keymap {
    bindings: HashMap<String, Action>,
}

impl Keymap {
    pub fn from_config(config: &Config) -> Self {
        let mut bindings = HashMap::new();
        for (name, chord) in &config.keybindings {
            match Action::from_name(name) {
                Some(action) => {
                    if let Some(previous) = bindings.insert(chord.clone(), action) {
                        log::warn!("{chord} bound to both {} and {name}", previous.name());
                    }
                }
                None => log::warn!("ignoring binding for unknown action {name:?}"),
            }
        }
        Self { bindings }
    }

    pub fn lookup(&self, key: &KeyEvent) -> Option<Action> {
        self.bindings.get(&chord(key)?).copied()
    }
}
