use super::app::{App, View};
use super::keymap::{InputMode, HELP};
use crate::audio::AudioFile;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph},
    Frame,
};

pub fn render_ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header / views
            Constraint::Min(0),    // Track list
            Constraint::Length(3), // Player controls
            Constraint::Length(1), // Status / help
        ])
        .split(f.area());

    render_header(f, app, chunks[0]);

    let input = match (app.view, app.mode) {
        (View::Search, _) => Some(("Search", app.search_query.as_str())),
        (_, InputMode::PlaylistName) => Some(("New playlist name", app.playlist_name.as_str())),
        _ => None,
    };

    match input {
        Some((title, text)) => {
            let parts = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(3), Constraint::Min(0)])
                .split(chunks[1]);
            render_input(f, app, title, text, parts[0]);
            render_main_content(f, app, parts[1]);
        }
        None => render_main_content(f, app, chunks[1]),
    }

    render_player_controls(f, app, chunks[2]);
    render_status(f, app, chunks[3]);
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::styled(
        "🎵 tapedeck  ",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )];
    for view in View::ALL {
        let style = if view == app.view {
            Style::default().fg(Color::Black).bg(Color::Cyan)
        } else {
            Style::default().fg(Color::Gray)
        };
        spans.push(Span::styled(format!(" {} ", view.title()), style));
        spans.push(Span::raw(" "));
    }

    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn render_input(f: &mut Frame, app: &App, title: &str, text: &str, area: Rect) {
    let editing = app.mode != InputMode::Normal;
    let style = if editing {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };

    let input = Paragraph::new(text.to_string())
        .style(style)
        .block(Block::default().borders(Borders::ALL).title(title.to_string()));
    f.render_widget(input, area);

    if editing {
        let x = area.x + 1 + text.chars().count() as u16;
        f.set_cursor_position((x.min(area.right().saturating_sub(2)), area.y + 1));
    }
}

fn render_main_content(f: &mut Frame, app: &App, area: Rect) {
    let now_playing = app.player.current_track().map(|t| t.path);
    let queue_current = app.queue.current_index();

    let (title, tracks): (String, Vec<&AudioFile>) = match app.view {
        View::Library => {
            let scanning = if app.scanning { " - scanning..." } else { "" };
            (
                format!("Library ({}){}", app.library.len(), scanning),
                app.library.tracks().iter().collect(),
            )
        }
        View::Search => (
            format!("Results ({})", app.search_results.len()),
            app.search_results
                .iter()
                .filter_map(|&i| app.library.get_index(i))
                .collect(),
        ),
        View::Playlists => match app.playlists.active() {
            Some(playlist) => (
                format!(
                    "{} ({}) - {} playlists, ←/→ to switch",
                    playlist.name,
                    playlist.len(),
                    app.playlists.len()
                ),
                playlist.tracks().iter().collect(),
            ),
            None => ("Playlists - N to create one".to_string(), Vec::new()),
        },
        View::Queue => (format!("Queue ({})", app.queue.len()), app.queue.tracks().iter().collect()),
    };

    let items: Vec<ListItem> = tracks
        .iter()
        .enumerate()
        .map(|(i, track)| {
            let is_current = now_playing.as_ref() == Some(&track.path);
            let is_queue_cursor = app.view == View::Queue && queue_current == Some(i);
            let prefix = if is_current {
                "♪ "
            } else if is_queue_cursor {
                "› "
            } else {
                "  "
            };

            let content = format!(
                "{}{} - {} ({}) [{}]",
                prefix, track.artist, track.title, track.album, track.duration
            );

            let style = if is_current {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };

            ListItem::new(content).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("► ");

    let mut list_state = ListState::default();
    if !tracks.is_empty() {
        list_state.select(Some(app.cursor().min(tracks.len() - 1)));
    }
    f.render_stateful_widget(list, area, &mut list_state);
}

fn render_player_controls(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(70), // Now playing + progress
            Constraint::Percentage(15), // Volume
            Constraint::Percentage(15), // Status
        ])
        .split(area);

    let snapshot = app.player.snapshot();

    let title = match &snapshot.track {
        Some(track) => format!("♪ {}", track.display_name()),
        None => "Nothing playing".to_string(),
    };
    let progress = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(app.progress.clamp(0.0, 1.0))
        .label(app.time_label());
    f.render_widget(progress, chunks[0]);

    let (volume_title, volume_style) = if snapshot.muted {
        ("Volume (muted)", Style::default().fg(Color::DarkGray))
    } else {
        ("Volume", Style::default().fg(Color::Green))
    };
    let volume = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(volume_title))
        .gauge_style(volume_style)
        .ratio((snapshot.volume_percent / 100.0).clamp(0.0, 1.0));
    f.render_widget(volume, chunks[1]);

    let state_text = if snapshot.is_paused {
        "⏸ Paused"
    } else if snapshot.is_playing {
        "▶ Playing"
    } else {
        "⏹ Stopped"
    };
    let state = Paragraph::new(state_text).block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(state, chunks[2]);
}

fn render_status(f: &mut Frame, app: &App, area: Rect) {
    let line = match &app.status {
        Some(status) if status.is_error => {
            Line::from(Span::styled(status.text.clone(), Style::default().fg(Color::Red)))
        }
        Some(status) => Line::from(Span::styled(status.text.clone(), Style::default().fg(Color::Green))),
        None => Line::from(Span::styled(HELP, Style::default().fg(Color::DarkGray))),
    };
    f.render_widget(Paragraph::new(line), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::player::testing::*;
    use crate::audio::{AudioConfig, AudioPlayer, MusicScanner};
    use crate::config::Config;
    use crate::ui::events::AppEvent;
    use crate::ui::keymap::Action;
    use ratatui::{backend::TestBackend, Terminal};
    use std::path::PathBuf;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn screen(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 20)).unwrap();
        terminal.draw(|f| render_ui(f, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn app() -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        let player = AudioPlayer::with_opener(AudioConfig::default(), Arc::new(FakeOpener::new(1_000, 90_000)));
        let mut app = App::new(Config::default(), PathBuf::from("/music"), player, MusicScanner::new(), tx);
        app.update(AppEvent::ScanCompleted(vec![track("/music/first.mp3"), track("/music/second.mp3")]));
        app
    }

    #[test]
    fn draws_library_and_now_playing() {
        let mut app = app();
        app.handle_action(Action::PlaySelected).unwrap();

        let text = screen(&app);
        assert!(text.contains("Library (2)"));
        assert!(text.contains("first.mp3"));
        assert!(text.contains("second.mp3"));
        assert!(text.contains("0:00 / 1:30"));
        assert!(text.contains("Playing"));
    }

    #[test]
    fn idle_player_shows_placeholder_time() {
        let text = screen(&app());
        assert!(text.contains("Nothing playing"));
        assert!(text.contains("--:-- / --:--"));
        assert!(text.contains("Stopped"));
    }
}
