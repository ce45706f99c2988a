//! Application state and event dispatch.
//!
//! Everything here runs on the event-loop thread. Shell processes live in the
//! [`Multiplexer`]; this layer owns the tab strip, the per-tab scrollback and
//! the input line.

use std::collections::HashMap;
use std::path::PathBuf;

use crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use terbox_db::Config;
use terbox_pty::{Multiplexer, RegistryConfig, SessionId};
use terbox_tabs::{TabViewport, Theme};
use tokio::sync::mpsc;

use crate::event::AppEvent;
use crate::input::{Action, Keymap};
use crate::io_thread;
use crate::output::OutputBuffer;

/// Rows taken by the tab strip, the separator and the input line.
pub const CHROME_ROWS: u16 = 3;

/// Modifiers that keep a character out of the input line.
const COMMAND_MODIFIERS: KeyModifiers = KeyModifiers::CONTROL.union(KeyModifiers::ALT);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Help,
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct App {
    pub(crate) registry: Multiplexer,
    pub(crate) viewport: TabViewport,
    pub(crate) outputs: HashMap<SessionId, OutputBuffer>,
    pub(crate) input: String,
    pub(crate) mode: Mode,
    pub(crate) config: Config,
    pub(crate) db_path: PathBuf,
    /// Last error shown on the separator row; cleared by the next success.
    pub(crate) status: Option<String>,
    pub(crate) size: (u16, u16),
    keymap: Keymap,
    next_number: usize,
    events: mpsc::UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(
        config: Config,
        db_path: PathBuf,
        size: (u16, u16),
        events: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        let theme = Theme::by_name(&config.theme).unwrap_or_else(|| {
            log::warn!("unknown theme {:?}, using default", config.theme);
            Theme::default()
        });
        let mut viewport = TabViewport::new(theme);
        viewport.set_width(size.0 as usize);

        let registry = Multiplexer::new(RegistryConfig {
            shell: config.shell.clone(),
            cols: size.0.max(1),
            rows: panel_rows(size.1),
        });

        Self {
            registry,
            viewport,
            outputs: HashMap::new(),
            input: String::new(),
            mode: Mode::Normal,
            keymap: Keymap::from_config(&config),
            config,
            db_path,
            status: None,
            size,
            next_number: 0,
            events,
        }
    }

    pub fn handle_event(&mut self, event: AppEvent) -> Flow {
        match event {
            AppEvent::Key(key) => return self.handle_key(key),
            AppEvent::Mouse(mouse) => self.handle_mouse(mouse),
            AppEvent::Resize(cols, rows) => {
                self.size = (cols, rows);
                self.viewport.set_width(cols as usize);
            }
            AppEvent::Output { id, chunk } => {
                if let Some(buffer) = self.outputs.get_mut(&id) {
                    buffer.push(chunk);
                }
            }
            AppEvent::Exited { id } => {
                log::debug!("output of {id} closed");
                self.reap();
            }
        }
        Flow::Continue
    }

    fn handle_key(&mut self, key: KeyEvent) -> Flow {
        if key.kind != KeyEventKind::Press {
            return Flow::Continue;
        }

        match self.keymap.lookup(&key) {
            Some(Action::Quit) => return Flow::Quit,
            Some(Action::Help) => self.toggle_mode(Mode::Help),
            Some(Action::Settings) => self.toggle_mode(Mode::Settings),
            // Any other key dismisses an overlay.
            _ if self.mode != Mode::Normal => self.mode = Mode::Normal,
            Some(action) => self.perform(action),
            None => self.edit_input(key),
        }
        Flow::Continue
    }

    fn toggle_mode(&mut self, mode: Mode) {
        self.mode = if self.mode == mode { Mode::Normal } else { mode };
    }

    fn perform(&mut self, action: Action) {
        match action {
            Action::NewTab => self.open_tab(),
            Action::CloseTab => self.close_active_tab(),
            Action::NextTab => {
                let result = self.registry.next_session().map(drop);
                self.report(result);
            }
            Action::PrevTab => {
                let result = self.registry.prev_session().map(drop);
                self.report(result);
            }
            Action::Help | Action::Settings | Action::Quit => {}
        }
    }

    fn edit_input(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                let command = std::mem::take(&mut self.input);
                if let Some(buffer) = self.active_output_mut() {
                    buffer.scroll_to_bottom();
                }
                let result = self.registry.write_active(&command);
                self.report(result);
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Esc => self.input.clear(),
            KeyCode::Left => self.step_tab(false),
            KeyCode::Right => self.step_tab(true),
            KeyCode::Up => self.scroll_panel(1, true),
            KeyCode::Down => self.scroll_panel(1, false),
            KeyCode::PageUp => {
                let page = self.panel_height();
                self.scroll_panel(page, true);
            }
            KeyCode::PageDown => {
                let page = self.panel_height();
                self.scroll_panel(page, false);
            }
            KeyCode::Char(c) if !key.modifiers.intersects(COMMAND_MODIFIERS) => {
                match c.to_digit(10) {
                    Some(n @ 1..=9) if self.input.is_empty() => self.select_number(n as usize),
                    _ => self.input.push(c),
                }
            }
            _ => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if self.mode != Mode::Normal || mouse.row != 0 {
            return;
        }
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
            return;
        }
        // Hit cells come from the last drawn strip, i.e. what the user clicked on.
        if self.viewport.click(mouse.column as usize).is_some() {
            self.activate_viewport_selection();
        }
    }

    /// Move one tab left or right in the strip; stops at either end.
    fn step_tab(&mut self, forward: bool) {
        self.sync_tabs();
        let moved = if forward {
            self.viewport.select_next()
        } else {
            self.viewport.select_prev()
        };
        if moved {
            self.activate_viewport_selection();
        }
    }

    /// Make the registry follow the strip's selection.
    fn activate_viewport_selection(&mut self) {
        let id = self.viewport.active_id().map(str::to_string);
        if let Some(id) = id {
            let result = self.registry.set_active(&id);
            self.report(result);
        }
    }

    fn scroll_panel(&mut self, lines: usize, up: bool) {
        let height = self.panel_height();
        if let Some(buffer) = self.active_output_mut() {
            if up {
                buffer.scroll_up(lines, height);
            } else {
                buffer.scroll_down(lines);
            }
        }
    }

    fn panel_height(&self) -> usize {
        panel_rows(self.size.1) as usize
    }

    /// Spawn a shell in a new tab and make it active.
    pub fn open_tab(&mut self) {
        self.next_number += 1;
        let id = format!("session-{}", self.next_number);

        if let Err(e) = self.registry.create_session(&id) {
            log::error!("failed to open tab {id}: {e}");
            self.status = Some(format!("could not open a tab: {e}"));
            return;
        }
        let name = format!("shell-{}", self.next_number);
        if let Err(e) = self.registry.rename_session(&id, &name) {
            log::warn!("failed to name session {id}: {e}");
        }
        if let Err(e) = self.registry.set_active(&id) {
            log::warn!("failed to activate session {id}: {e}");
        }
        self.outputs
            .insert(id.clone(), OutputBuffer::new(self.config.scrollback_lines));

        match self.registry.take_output(&id) {
            Ok(Some(reader)) => {
                let events = self.events.clone();
                if let Err(e) = io_thread::start_io_thread(id.clone(), reader, events) {
                    log::error!("failed to start reader for {id}: {e}");
                }
            }
            Ok(None) => log::warn!("session {id} has no output stream"),
            Err(e) => log::warn!("session {id} vanished before its output was taken: {e}"),
        }
        self.status = None;
    }

    pub fn close_active_tab(&mut self) {
        let Some(id) = self.registry.get_active_id() else {
            self.status = Some("no tabs to close".to_string());
            return;
        };
        let result = self.registry.close_session(&id);
        self.outputs.remove(&id);
        self.report(result);
    }

    fn select_number(&mut self, number: usize) {
        let ids = self.registry.list_sessions();
        if let Some(id) = ids.get(number - 1) {
            let result = self.registry.set_active(id);
            self.report(result);
        }
    }

    /// Drop tabs whose shells have exited.
    pub fn reap(&mut self) {
        for id in self.registry.cleanup_dead_sessions() {
            self.outputs.remove(&id);
        }
    }

    /// Close every session before exit.
    pub fn shutdown(&mut self) {
        for id in self.registry.list_sessions() {
            if let Err(e) = self.registry.close_session(&id) {
                log::warn!("closing {id} on exit: {e}");
            }
        }
        self.outputs.clear();
    }

    /// Refresh the strip from the registry.
    pub fn sync_tabs(&mut self) {
        let tabs: Vec<(String, String)> = self
            .registry
            .session_infos()
            .into_iter()
            .enumerate()
            .map(|(i, info)| (info.id, format!("[{}] {}", i + 1, info.name)))
            .collect();
        self.viewport.sync(tabs, self.registry.active_index());
    }

    pub fn active_output(&self) -> Option<&OutputBuffer> {
        self.outputs.get(&self.registry.get_active_id()?)
    }

    fn active_output_mut(&mut self) -> Option<&mut OutputBuffer> {
        let id = self.registry.get_active_id()?;
        self.outputs.get_mut(&id)
    }

    fn report<E: std::fmt::Display>(&mut self, result: Result<(), E>) {
        match result {
            Ok(()) => self.status = None,
            Err(e) => {
                log::debug!("{e}");
                self.status = Some(e.to_string());
            }
        }
    }
}

/// PTY rows left for the output panel at terminal height `rows`.
pub fn panel_rows(rows: u16) -> u16 {
    rows.saturating_sub(CHROME_ROWS).max(1)
}
