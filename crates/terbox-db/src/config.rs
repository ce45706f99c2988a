//! Typed application configuration stored in the `settings` table.

use std::collections::BTreeMap;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::settings;

pub const KEY_SHELL: &str = "shell";
pub const KEY_THEME: &str = "theme";
pub const KEY_SCROLLBACK: &str = "scrollback_lines";
/// Prefix for keybinding keys, e.g. `keybinding.new_tab`.
pub const KEYBINDING_PREFIX: &str = "keybinding.";

pub const DEFAULT_SHELL: &str = "/bin/sh";
pub const DEFAULT_THEME: &str = "default";
pub const DEFAULT_SCROLLBACK: usize = 1000;

/// Action name -> key chord for a fresh install.
pub const DEFAULT_KEYBINDINGS: &[(&str, &str)] = &[
    ("new_tab", "ctrl+t"),
    ("close_tab", "ctrl+w"),
    ("settings", "ctrl+s"),
    ("help", "ctrl+h"),
    ("next_tab", "ctrl+right"),
    ("prev_tab", "ctrl+left"),
    ("quit", "ctrl+q"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Shell spawned for each new tab.
    pub shell: String,
    pub theme: String,
    /// Output lines kept per tab.
    pub scrollback_lines: usize,
    pub keybindings: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shell: DEFAULT_SHELL.to_string(),
            theme: DEFAULT_THEME.to_string(),
            scrollback_lines: DEFAULT_SCROLLBACK,
            keybindings: DEFAULT_KEYBINDINGS
                .iter()
                .map(|(action, chord)| (action.to_string(), chord.to_string()))
                .collect(),
        }
    }
}

impl Config {
    /// Stored settings layered over the defaults.
    ///
    /// Unusable values are ignored with a warning.
    pub fn load(conn: &Connection) -> rusqlite::Result<Self> {
        let mut config = Self::default();

        for (key, value) in settings::all(conn)? {
            match key.as_str() {
                KEY_SHELL => {
                    if value.trim().is_empty() {
                        log::warn!("ignoring empty shell setting");
                    } else {
                        config.shell = value;
                    }
                }
                KEY_THEME => config.theme = value,
                KEY_SCROLLBACK => match value.parse::<usize>() {
                    Ok(n) if n > 0 => config.scrollback_lines = n,
                    _ => log::warn!("ignoring invalid {KEY_SCROLLBACK} setting {value:?}"),
                },
                _ => {
                    if let Some(action) = key.strip_prefix(KEYBINDING_PREFIX) {
                        let chord = value.trim().to_lowercase();
                        if chord.is_empty() {
                            log::warn!("ignoring empty binding for {action}");
                        } else {
                            config.keybindings.insert(action.to_string(), chord);
                        }
                    }
                }
            }
        }

        Ok(config)
    }

    /// Write every field back to the settings table.
    pub fn save(&self, conn: &Connection) -> rusqlite::Result<()> {
        settings::set(conn, KEY_SHELL, &self.shell)?;
        settings::set(conn, KEY_THEME, &self.theme)?;
        settings::set(conn, KEY_SCROLLBACK, &self.scrollback_lines.to_string())?;
        for (action, chord) in &self.keybindings {
            settings::set(conn, &format!("{KEYBINDING_PREFIX}{action}"), chord)?;
        }
        Ok(())
    }

    /// Key chord bound to `action`, if any.
    pub fn binding(&self, action: &str) -> Option<&str> {
        self.keybindings.get(action).map(String::as_str)
    }
}

/// Store the defaults for any key that has no value yet (first launch).
pub fn seed_defaults(conn: &Connection) -> rusqlite::Result<()> {
    let defaults = Config::default();
    settings::set_if_absent(conn, KEY_SHELL, &defaults.shell)?;
    settings::set_if_absent(conn, KEY_THEME, &defaults.theme)?;
    settings::set_if_absent(conn, KEY_SCROLLBACK, &defaults.scrollback_lines.to_string())?;
    for (action, chord) in &defaults.keybindings {
        settings::set_if_absent(conn, &format!("{KEYBINDING_PREFIX}{action}"), chord)?;
    }
    Ok(())
}
