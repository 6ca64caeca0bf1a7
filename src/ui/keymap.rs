// Key bindings - one table for browsing, a tiny one for text entry
// Keys never reach the engine directly, they become Actions the app dispatches

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search,
    PlaylistName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,

    // Playback
    TogglePause,
    PlaySelected,
    Stop,
    SkipForward,
    SkipBackward,
    Left,
    Right,
    VolumeUp,
    VolumeDown,
    ToggleMute,

    // Queue
    NextInQueue,
    PreviousInQueue,
    AddToQueue,
    ClearQueue,
    ViewQueue,
    ShuffleQueue,
    DeleteSelected,

    // Navigation
    Up,
    Down,
    NextView,
    StartSearch,
    Rescan,

    // Playlists
    NewPlaylist,
    AddToPlaylist,

    // Text entry
    Input(char),
    Backspace,
    Submit,
    Cancel,
}

pub fn map_key(key: KeyEvent, mode: InputMode) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Action::Quit);
    }

    match mode {
        InputMode::Normal => map_normal(key),
        InputMode::Search | InputMode::PlaylistName => map_text(key),
    }
}

fn map_normal(key: KeyEvent) -> Option<Action> {
    let action = match key.code {
        KeyCode::Char('q') => Action::Quit,

        KeyCode::Char(' ') | KeyCode::Char('p') => Action::TogglePause,
        KeyCode::Enter => Action::PlaySelected,
        KeyCode::Char('s') => Action::Stop,
        KeyCode::Char('f') => Action::SkipForward,
        KeyCode::Char('b') => Action::SkipBackward,
        KeyCode::Left | KeyCode::Char('h') => Action::Left,
        KeyCode::Right | KeyCode::Char('l') => Action::Right,
        KeyCode::Char('+') | KeyCode::Char('=') => Action::VolumeUp,
        KeyCode::Char('-') => Action::VolumeDown,
        KeyCode::Char('m') => Action::ToggleMute,

        KeyCode::Char('.') | KeyCode::Char('>') => Action::NextInQueue,
        KeyCode::Char(',') | KeyCode::Char('<') => Action::PreviousInQueue,
        KeyCode::Char('a') => Action::AddToQueue,
        KeyCode::Char('c') => Action::ClearQueue,
        KeyCode::Char('v') => Action::ViewQueue,
        KeyCode::Char('z') => Action::ShuffleQueue,
        KeyCode::Char('d') | KeyCode::Delete => Action::DeleteSelected,

        KeyCode::Up | KeyCode::Char('k') => Action::Up,
        KeyCode::Down | KeyCode::Char('j') => Action::Down,
        KeyCode::Tab => Action::NextView,
        KeyCode::Char('/') => Action::StartSearch,
        KeyCode::F(5) => Action::Rescan,

        KeyCode::Char('N') => Action::NewPlaylist,
        KeyCode::Char('A') => Action::AddToPlaylist,

        _ => return None,
    };
    Some(action)
}

fn map_text(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Enter => Some(Action::Submit),
        KeyCode::Esc => Some(Action::Cancel),
        KeyCode::Backspace => Some(Action::Backspace),
        KeyCode::Up => Some(Action::Up),
        KeyCode::Down => Some(Action::Down),
        KeyCode::Char(c) => Some(Action::Input(c)),
        _ => None,
    }
}

/// One-line cheat sheet for the footer.
pub const HELP: &str = "space pause | enter play | s stop | b/f seek | +/- vol | m mute | a queue | ,/. prev/next | c clear | v queue | / search | tab view | N new list | A add to list | q quit";
