// Terminal UI - tabs over the library, a progress gauge, one event loop
// Built with ratatui; all state lives in App so the loop itself stays dumb

mod app;         // application state and the update dispatcher
pub mod events;  // input, ticks, background results
pub mod keymap;  // key -> action table
mod render;      // drawing only, never mutates

pub use app::{App, View};
pub use events::{AppEvent, EventHandler};

use anyhow::Result;
use crossterm::{
    cursor, execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::time::Duration;
use tracing::info;

pub struct TerminalManager {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    _cleanup_guard: CleanupGuard,
}

struct CleanupGuard;

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        // Runs on panic unwinds too, so the shell is never left in raw mode
        let _ = disable_raw_mode();
        let mut stdout = io::stdout();
        let _ = execute!(stdout, LeaveAlternateScreen, cursor::Show);
    }
}

impl TerminalManager {
    pub fn new() -> Result<Self> {
        let _ = disable_raw_mode();
        let mut stdout = io::stdout();
        let _ = execute!(stdout, LeaveAlternateScreen);

        enable_raw_mode()?;
        let guard = CleanupGuard;
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        Ok(Self {
            terminal,
            _cleanup_guard: guard,
        })
    }

    pub fn draw(&mut self, app: &App) -> Result<()> {
        self.terminal.draw(|f| render::render_ui(f, app))?;
        Ok(())
    }
}

impl Drop for TerminalManager {
    fn drop(&mut self) {
        let _ = self.terminal.clear();
        let _ = self.terminal.show_cursor();
    }
}

/// Own the terminal until the app asks to quit.
///
/// Redraws after every event; ticks arrive every `tick` so progress moves
/// even when nobody touches the keyboard.
pub async fn run(app: &mut App, events: &mut EventHandler, tick: Duration) -> Result<()> {
    let mut terminal = TerminalManager::new()?;
    let input = events.spawn_input();
    let ticks = events.spawn_ticks(tick);

    terminal.draw(app)?;
    while !app.should_quit() {
        let Some(event) = events.next_event().await else {
            break;
        };
        app.update(event);
        terminal.draw(app)?;
    }

    input.abort();
    ticks.abort();
    info!("UI loop finished");
    Ok(())
}
