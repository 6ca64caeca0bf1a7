use super::events::{spawn_background, spawn_debounced, AppEvent};
use super::keymap::{map_key, Action, InputMode};
use crate::audio::{
    advance_after_finish, evaluate_tick, AudioFile, AudioPlayer, Handoff, Library, MusicScanner,
    PlaylistManager, Queue, TickOutcome,
};
use crate::config::Config;
use crate::error::{Error, Result};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Library,
    Search,
    Playlists,
    Queue,
}

impl View {
    pub const ALL: [View; 4] = [View::Library, View::Search, View::Playlists, View::Queue];

    pub fn title(self) -> &'static str {
        match self {
            View::Library => "Library",
            View::Search => "Search",
            View::Playlists => "Playlists",
            View::Queue => "Queue",
        }
    }

    fn index(self) -> usize {
        match self {
            View::Library => 0,
            View::Search => 1,
            View::Playlists => 2,
            View::Queue => 3,
        }
    }

    fn next(self) -> View {
        View::ALL[(self.index() + 1) % View::ALL.len()]
    }
}

#[derive(Debug, Clone)]
pub struct StatusLine {
    pub text: String,
    pub is_error: bool,
    set_at: Instant,
}

/// All mutable application state. Events come in one at a time through
/// [`App::update`]; nothing here touches the terminal, so it runs in tests.
pub struct App {
    pub(crate) config: Config,
    root: PathBuf,
    pub(crate) player: AudioPlayer,
    scanner: MusicScanner,
    pub(crate) library: Library,
    pub(crate) queue: Queue,
    pub(crate) playlists: PlaylistManager,

    pub(crate) view: View,
    pub(crate) mode: InputMode,
    cursors: [usize; 4],
    pub(crate) search_query: String,
    pub(crate) search_results: Vec<usize>,
    search_seq: Arc<AtomicU64>,
    pub(crate) playlist_name: String,

    pub(crate) progress: f64,
    playing_from_queue: bool,
    pub(crate) scanning: bool,
    pub(crate) status: Option<StatusLine>,
    events: mpsc::UnboundedSender<AppEvent>,
    pub(crate) should_quit: bool,
}

impl App {
    pub fn new(
        config: Config,
        root: PathBuf,
        player: AudioPlayer,
        scanner: MusicScanner,
        events: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            config,
            root,
            player,
            scanner,
            library: Library::new(),
            queue: Queue::new(),
            playlists: PlaylistManager::new(),
            view: View::Library,
            mode: InputMode::Normal,
            cursors: [0; 4],
            search_query: String::new(),
            search_results: Vec::new(),
            search_seq: Arc::new(AtomicU64::new(0)),
            playlist_name: String::new(),
            progress: 0.0,
            playing_from_queue: false,
            scanning: false,
            status: None,
            events,
            should_quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn player(&self) -> &AudioPlayer {
        &self.player
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn cursor(&self) -> usize {
        self.cursors[self.view.index()]
    }

    /// Kick off a library scan on the blocking pool.
    pub fn start_scan(&mut self) {
        if self.scanning {
            return;
        }
        self.scanning = true;
        self.info(format!("Scanning {}...", self.root.display()));

        let scanner = self.scanner.clone();
        let root = self.root.clone();
        spawn_background(self.events.clone(), move || match scanner.scan_directory(&root) {
            Ok(tracks) => AppEvent::ScanCompleted(tracks),
            Err(e) => AppEvent::CommandFailed(e),
        });
    }

    /// The single dispatcher: every event the app reacts to goes through here.
    pub fn update(&mut self, event: AppEvent) {
        match event {
            AppEvent::Key(key) => {
                if let Some(action) = map_key(key, self.mode) {
                    if let Err(e) = self.handle_action(action) {
                        self.report(e);
                    }
                }
            }
            AppEvent::Resize => {}
            AppEvent::Tick => self.on_tick(),
            AppEvent::TrackFinished { generation } => {
                if generation != self.player.generation() {
                    debug!("Ignoring end of stale stream {}", generation);
                    return;
                }
                if self.player.take_finished(self.config.playback.finish_threshold) {
                    self.finish_track();
                }
            }
            AppEvent::ScanCompleted(tracks) => {
                self.scanning = false;
                self.library = Library::from_tracks(tracks);
                self.clamp_cursors();
                self.info(format!("Loaded {} tracks", self.library.len()));
                if !self.search_query.is_empty() {
                    self.schedule_search();
                }
            }
            AppEvent::SearchCompleted { seq, results } => {
                if seq != self.search_seq.load(Ordering::SeqCst) {
                    debug!("Dropping stale search results ({})", seq);
                    return;
                }
                self.search_results = results;
                self.clamp_cursors();
            }
            AppEvent::CommandFailed(e) => {
                // Scanning is the only background command that can fail
                self.scanning = false;
                self.report(e);
            }
        }
    }

    pub fn handle_action(&mut self, action: Action) -> Result<()> {
        match self.mode {
            InputMode::Search => return self.handle_search_input(action),
            InputMode::PlaylistName => return self.handle_playlist_name_input(action),
            InputMode::Normal => {}
        }

        let playback = self.config.playback.clone();
        match action {
            Action::Quit => {
                self.player.stop();
                self.should_quit = true;
            }

            Action::TogglePause => {
                let running = self.player.toggle_pause()?;
                self.info(if running { "Playing" } else { "Paused" });
            }
            Action::PlaySelected => self.play_selected()?,
            Action::Stop => {
                self.player.stop();
                self.progress = 0.0;
                self.playing_from_queue = false;
                self.info("Stopped");
            }
            Action::SkipForward => self.player.skip_forward(Duration::from_secs(playback.skip_seconds))?,
            Action::SkipBackward => self.player.skip_backward(Duration::from_secs(playback.skip_seconds))?,
            Action::Left if self.view == View::Playlists => self.cycle_playlist(false),
            Action::Right if self.view == View::Playlists => self.cycle_playlist(true),
            Action::Left => self.player.skip_backward(Duration::from_secs(playback.skip_seconds))?,
            Action::Right => self.player.skip_forward(Duration::from_secs(playback.skip_seconds))?,
            Action::VolumeUp => {
                let volume = self.player.set_volume(self.player.volume() + playback.volume_step);
                self.info(format!("Volume {:.0}%", volume));
            }
            Action::VolumeDown => {
                let volume = self.player.set_volume(self.player.volume() - playback.volume_step);
                self.info(format!("Volume {:.0}%", volume));
            }
            Action::ToggleMute => {
                let muted = self.player.toggle_mute();
                self.info(if muted { "Muted" } else { "Unmuted" });
            }

            Action::NextInQueue => {
                let next = self.queue.next().cloned();
                self.play_from_queue(next)?;
            }
            Action::PreviousInQueue => {
                let previous = self.queue.previous().cloned();
                self.play_from_queue(previous)?;
            }
            Action::AddToQueue => self.add_selected_to_queue()?,
            Action::ClearQueue => {
                self.queue.clear();
                // Whatever is playing finishes, then silence
                self.playing_from_queue = false;
                self.cursors[View::Queue.index()] = 0;
                self.info("Queue cleared");
            }
            Action::ViewQueue => self.view = View::Queue,
            Action::ShuffleQueue => {
                self.queue.shuffle();
                self.info("Queue shuffled");
            }
            Action::DeleteSelected => self.delete_selected()?,

            Action::Up => self.move_cursor(-1),
            Action::Down => self.move_cursor(1),
            Action::NextView => self.view = self.view.next(),
            Action::StartSearch => {
                self.view = View::Search;
                self.mode = InputMode::Search;
            }
            Action::Rescan => self.start_scan(),

            Action::NewPlaylist => {
                self.view = View::Playlists;
                self.mode = InputMode::PlaylistName;
                self.playlist_name.clear();
            }
            Action::AddToPlaylist => self.add_selected_to_playlist()?,

            Action::Input(_) | Action::Backspace | Action::Submit | Action::Cancel => {}
        }
        Ok(())
    }

    fn handle_search_input(&mut self, action: Action) -> Result<()> {
        match action {
            Action::Input(c) => {
                self.search_query.push(c);
                self.schedule_search();
            }
            Action::Backspace => {
                self.search_query.pop();
                self.schedule_search();
            }
            Action::Submit | Action::Cancel => self.mode = InputMode::Normal,
            Action::Up => self.move_cursor(-1),
            Action::Down => self.move_cursor(1),
            Action::Quit => self.should_quit = true,
            _ => {}
        }
        Ok(())
    }

    fn handle_playlist_name_input(&mut self, action: Action) -> Result<()> {
        match action {
            Action::Input(c) => self.playlist_name.push(c),
            Action::Backspace => {
                self.playlist_name.pop();
            }
            Action::Submit => {
                self.mode = InputMode::Normal;
                let name = std::mem::take(&mut self.playlist_name);
                let id = self.playlists.create_playlist(&name)?;
                self.playlists.set_active(id)?;
                self.cursors[View::Playlists.index()] = 0;
                self.info(format!("Created playlist '{}'", name.trim()));
            }
            Action::Cancel => {
                self.mode = InputMode::Normal;
                self.playlist_name.clear();
            }
            Action::Quit => self.should_quit = true,
            _ => {}
        }
        Ok(())
    }

    fn on_tick(&mut self) {
        self.expire_status();

        match evaluate_tick(&self.player, self.config.playback.finish_threshold) {
            TickOutcome::Idle => {}
            TickOutcome::Progress(percent) => self.progress = percent,
            TickOutcome::Finished(percent) => {
                self.progress = percent;
                self.finish_track();
            }
        }
    }

    fn finish_track(&mut self) {
        match advance_after_finish(&self.player, &mut self.queue, self.playing_from_queue) {
            Ok(Handoff::Advanced(track)) => {
                self.progress = 0.0;
                self.info(format!("Now playing: {}", track.display_name()));
            }
            Ok(Handoff::Stopped) => {
                self.progress = 0.0;
                self.playing_from_queue = false;
            }
            Err(e) => {
                self.progress = 0.0;
                self.playing_from_queue = false;
                self.report(e);
            }
        }
    }

    fn play_track(&mut self, track: &AudioFile, from_queue: bool) -> Result<()> {
        self.progress = 0.0;
        self.playing_from_queue = false;
        self.player.play(track)?;
        self.playing_from_queue = from_queue;
        self.info(format!("Now playing: {}", track.display_name()));
        Ok(())
    }

    fn play_from_queue(&mut self, track: Option<AudioFile>) -> Result<()> {
        match track {
            Some(track) => self.play_track(&track, true),
            None => {
                self.info("Queue is empty");
                Ok(())
            }
        }
    }

    fn play_selected(&mut self) -> Result<()> {
        if self.view == View::Queue {
            let index = self.cursor();
            if self.queue.is_empty() {
                return Ok(());
            }
            let track = self.queue.select(index)?.clone();
            return self.play_track(&track, true);
        }

        if let Some(track) = self.selected_track() {
            self.play_track(&track, false)?;
        }
        Ok(())
    }

    fn add_selected_to_queue(&mut self) -> Result<()> {
        let Some(track) = self.selected_track() else {
            return Ok(());
        };

        let was_empty = self.queue.is_empty();
        if !self.queue.add(track.clone()) {
            self.info("Already queued");
            return Ok(());
        }

        // First track into an idle player starts straight away
        if was_empty && !self.player.snapshot().is_open {
            return self.play_track(&track, true);
        }

        self.info(format!("Queued: {}", track.display_name()));
        Ok(())
    }

    fn add_selected_to_playlist(&mut self) -> Result<()> {
        let Some(track) = self.selected_track() else {
            return Ok(());
        };

        let id = match self.playlists.active() {
            Some(playlist) => playlist.id,
            None => {
                let id = self.playlists.create_playlist("My Playlist")?;
                self.playlists.set_active(id)?;
                id
            }
        };

        if self.playlists.add_track_to_playlist(id, track.clone())? {
            self.info(format!("Added to playlist: {}", track.display_name()));
        } else {
            self.info("Already in playlist");
        }
        Ok(())
    }

    fn delete_selected(&mut self) -> Result<()> {
        let index = self.cursor();
        match self.view {
            View::Queue => {
                let removed = self.queue.remove(index)?;
                self.info(format!("Removed from queue: {}", removed.display_name()));
            }
            View::Playlists => {
                let Some(id) = self.playlists.active().map(|p| p.id) else {
                    return Ok(());
                };
                let removed = self.playlists.remove_track_from_playlist(id, index)?;
                self.info(format!("Removed from playlist: {}", removed.display_name()));
            }
            View::Library | View::Search => {}
        }
        self.clamp_cursors();
        Ok(())
    }

    fn cycle_playlist(&mut self, forward: bool) {
        let ids: Vec<u32> = self.playlists.list_playlists().iter().map(|p| p.id).collect();
        if ids.is_empty() {
            return;
        }
        let position = self
            .playlists
            .active()
            .and_then(|active| ids.iter().position(|id| *id == active.id))
            .unwrap_or(0);
        let next = if forward {
            (position + 1) % ids.len()
        } else {
            (position + ids.len() - 1) % ids.len()
        };
        if self.playlists.set_active(ids[next]).is_ok() {
            self.cursors[View::Playlists.index()] = 0;
        }
    }

    /// The track under the cursor in the current view.
    pub fn selected_track(&self) -> Option<AudioFile> {
        let cursor = self.cursor();
        match self.view {
            View::Library => self.library.get_index(cursor).cloned(),
            View::Search => self
                .search_results
                .get(cursor)
                .and_then(|&i| self.library.get_index(i))
                .cloned(),
            View::Playlists => self.playlists.active()?.tracks().get(cursor).cloned(),
            View::Queue => self.queue.tracks().get(cursor).cloned(),
        }
    }

    pub fn view_len(&self, view: View) -> usize {
        match view {
            View::Library => self.library.len(),
            View::Search => self.search_results.len(),
            View::Playlists => self.playlists.active().map_or(0, |p| p.len()),
            View::Queue => self.queue.len(),
        }
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = self.view_len(self.view);
        if len == 0 {
            return;
        }
        let cursor = &mut self.cursors[self.view.index()];
        *cursor = cursor.saturating_add_signed(delta).min(len - 1);
    }

    fn clamp_cursors(&mut self) {
        for view in View::ALL {
            let len = self.view_len(view);
            let cursor = &mut self.cursors[view.index()];
            *cursor = (*cursor).min(len.saturating_sub(1));
        }
    }

    fn schedule_search(&mut self) {
        let seq = self.search_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let library = self.library.clone();
        let query = self.search_query.clone();

        spawn_debounced(
            self.events.clone(),
            Arc::clone(&self.search_seq),
            seq,
            self.config.ui.search_debounce(),
            move || AppEvent::SearchCompleted {
                seq,
                results: library.search(&query),
            },
        );
    }

    fn info(&mut self, text: impl Into<String>) {
        let text = text.into();
        debug!("{}", text);
        self.status = Some(StatusLine {
            text,
            is_error: false,
            set_at: Instant::now(),
        });
    }

    /// Failures never stop the loop; they become the status line.
    fn report(&mut self, err: Error) {
        let is_error = !err.is_benign();
        if is_error {
            error!("{}", err);
        } else {
            info!("{}", err);
        }
        self.status = Some(StatusLine {
            text: err.to_string(),
            is_error,
            set_at: Instant::now(),
        });
    }

    fn expire_status(&mut self) {
        let timeout = self.config.ui.status_timeout();
        if self.status.as_ref().is_some_and(|s| s.set_at.elapsed() >= timeout) {
            self.status = None;
        }
    }

    /// Time display for the footer, `elapsed / total`.
    pub fn time_label(&self) -> String {
        let snapshot = self.player.snapshot();
        if !snapshot.is_open {
            return "--:-- / --:--".to_string();
        }
        format!(
            "{} / {}",
            crate::audio::format_duration(snapshot.elapsed()),
            crate::audio::format_duration(snapshot.total())
        )
    }
}
