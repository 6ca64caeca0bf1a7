use super::decode::{DecodedStream, Mp3Opener, StreamOpener};
use super::source::{OutputDevice, PlaybackSource};
use super::track::AudioFile;
use super::volume::VolumeControl;
use super::AudioConfig;
use crate::error::{Error, Result};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Rate reported while nothing is open, so idle time math never divides by zero.
const IDLE_SAMPLE_RATE: u32 = 44_100;
const IDLE_CHANNELS: u16 = 2;

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// The decoder ran dry for the stream opened as `generation`.
    StreamEnded { generation: u64 },
}

/// Everything the output callback and the event loop both touch. Lives behind
/// the engine's one lock.
pub(crate) struct PlaybackState {
    pub(crate) stream: Option<Box<dyn DecodedStream>>,
    pub(crate) track: Option<AudioFile>,
    pub(crate) is_playing: bool,
    pub(crate) is_paused: bool,
    pub(crate) sample_rate: u32,
    pub(crate) channels: u16,
    pub(crate) total_samples: u64,
    pub(crate) samples_played: u64,
    pub(crate) volume: VolumeControl,
    /// Bumped on every play/stop so late signals from an old stream can be told apart.
    pub(crate) generation: u64,
    exhausted: bool,
    end_signalled: bool,
    /// Whether the user had paused when the end was signalled, so a seek back can restore it.
    paused_at_end: bool,
    finish_reported: bool,
    events: Option<mpsc::UnboundedSender<PlayerEvent>>,
}

/// One block handed to the output device.
pub(crate) struct Block {
    pub(crate) channels: u16,
    pub(crate) sample_rate: u32,
}

impl PlaybackState {
    fn new(volume: VolumeControl) -> Self {
        Self {
            stream: None,
            track: None,
            is_playing: false,
            is_paused: false,
            sample_rate: IDLE_SAMPLE_RATE,
            channels: IDLE_CHANNELS,
            total_samples: 0,
            samples_played: 0,
            volume,
            generation: 0,
            exhausted: false,
            end_signalled: false,
            paused_at_end: false,
            finish_reported: false,
            events: None,
        }
    }

    /// Drop back to stopped and hand back the stream for closing outside the lock.
    fn reset(&mut self) -> Option<Box<dyn DecodedStream>> {
        self.generation += 1;
        self.track = None;
        self.is_playing = false;
        self.is_paused = false;
        self.sample_rate = IDLE_SAMPLE_RATE;
        self.channels = IDLE_CHANNELS;
        self.total_samples = 0;
        self.samples_played = 0;
        self.exhausted = false;
        self.end_signalled = false;
        self.paused_at_end = false;
        self.finish_reported = false;
        self.stream.take()
    }

    /// Pull up to `frames` frames into `buf` for the output callback, counting
    /// what was consumed and applying the gain. Silence while idle or paused.
    pub(crate) fn fill(&mut self, buf: &mut Vec<f32>, frames: usize) -> Block {
        let channels = self.channels.max(1);
        let block = Block {
            channels,
            sample_rate: self.sample_rate,
        };
        let len = frames * channels as usize;
        buf.clear();
        buf.resize(len, 0.0);

        if self.stream.is_none() {
            return block;
        }

        if self.exhausted {
            self.signal_end();
            return block;
        }

        if !self.is_playing {
            return block;
        }

        let read = match self.stream.as_mut() {
            Some(stream) => stream.read(buf),
            None => 0,
        };

        if read == 0 {
            self.exhausted = true;
            self.samples_played = self.total_samples;
            self.signal_end();
            return block;
        }

        // A ragged last frame still counts; the unwritten tail is already zero
        let frames_read = (read + channels as usize - 1) / channels as usize;
        self.samples_played = (self.samples_played + frames_read as u64).min(self.total_samples);

        let amplitude = self.volume.amplitude();
        for sample in buf.iter_mut() {
            *sample = (*sample * amplitude).clamp(-1.0, 1.0);
        }

        block
    }

    fn signal_end(&mut self) {
        if self.end_signalled {
            return;
        }
        self.end_signalled = true;
        self.paused_at_end = self.is_paused;
        self.is_playing = false;
        self.is_paused = false;
        if let Some(events) = &self.events {
            // Receiver gone just means nobody is listening any more
            let _ = events.send(PlayerEvent::StreamEnded {
                generation: self.generation,
            });
        }
    }

    fn progress(&self) -> f64 {
        if self.total_samples == 0 {
            return 0.0;
        }
        (self.samples_played as f64 / self.total_samples as f64).clamp(0.0, 1.0)
    }

    fn frames_to_duration(&self, frames: u64) -> Duration {
        Duration::from_secs_f64(frames as f64 / self.sample_rate.max(1) as f64)
    }
}

/// Read-only copy of the engine state, for drawing and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub track: Option<AudioFile>,
    pub is_open: bool,
    pub is_playing: bool,
    pub is_paused: bool,
    pub sample_rate: u32,
    pub total_samples: u64,
    pub samples_played: u64,
    pub volume_percent: f64,
    pub muted: bool,
    pub generation: u64,
}

impl PlaybackSnapshot {
    pub fn progress(&self) -> f64 {
        if self.total_samples == 0 {
            return 0.0;
        }
        (self.samples_played as f64 / self.total_samples as f64).clamp(0.0, 1.0)
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_secs_f64(self.samples_played as f64 / self.sample_rate.max(1) as f64)
    }

    pub fn total(&self) -> Duration {
        Duration::from_secs_f64(self.total_samples as f64 / self.sample_rate.max(1) as f64)
    }
}

/// The playback engine. Owns at most one open stream; every method takes the
/// state lock only for its own read-modify-write and never while opening or
/// closing a file.
pub struct AudioPlayer {
    state: Arc<Mutex<PlaybackState>>,
    opener: Arc<dyn StreamOpener>,
    config: AudioConfig,
    _output: Option<OutputDevice>, // None when headless
}

impl AudioPlayer {
    /// Engine wired to the default audio output device.
    pub fn new(config: AudioConfig) -> Result<Self> {
        let mut player = Self::with_opener(config, Arc::new(Mp3Opener));
        let device = OutputDevice::open(player.source())?;
        player._output = Some(device);
        info!("Audio output ready");
        Ok(player)
    }

    /// Engine with no output device attached; samples only move when
    /// someone pulls from [`AudioPlayer::source`].
    pub fn with_opener(config: AudioConfig, opener: Arc<dyn StreamOpener>) -> Self {
        let volume = VolumeControl::new(config.initial_volume, config.max_gain_db);
        Self {
            state: Arc::new(Mutex::new(PlaybackState::new(volume))),
            opener,
            config,
            _output: None,
        }
    }

    pub fn set_event_sender(&self, sender: mpsc::UnboundedSender<PlayerEvent>) {
        self.lock().events = Some(sender);
    }

    /// A fresh output-side reader over the shared state.
    pub fn source(&self) -> PlaybackSource {
        PlaybackSource::new(Arc::clone(&self.state))
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, PlaybackState> {
        // A panic elsewhere must not take the audio thread down with it
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Close whatever is open, then open and start `track`. On failure the
    /// engine is left stopped.
    pub fn play(&self, track: &AudioFile) -> Result<()> {
        // Previous stream goes first so two are never open together
        self.stop();

        let stream = match self.opener.open(&track.path) {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Failed to open {}: {}", track.path.display(), e);
                return Err(e);
            }
        };

        let sample_rate = stream.sample_rate().max(1);
        let channels = stream.channels().max(1);
        let total_samples = stream.total_frames();

        let displaced = {
            let mut state = self.lock();
            let displaced = state.reset();
            state.stream = Some(stream);
            state.track = Some(track.clone());
            state.sample_rate = sample_rate;
            state.channels = channels;
            state.total_samples = total_samples;
            state.is_playing = true;
            displaced
        };

        // Only reachable if another caller raced a play in between
        if let Some(old) = displaced {
            close_stream(old);
        }

        info!(
            "Playing {} ({} Hz, {} ch, {:.1}s)",
            track.path.display(),
            sample_rate,
            channels,
            total_samples as f64 / sample_rate as f64
        );
        Ok(())
    }

    /// Suspend output, keeping the stream and position.
    pub fn pause(&self) -> Result<()> {
        let mut state = self.lock();
        if state.stream.is_none() {
            return Err(Error::NoActivePlayback);
        }
        if state.is_playing {
            state.is_playing = false;
            state.is_paused = true;
            debug!("Paused at frame {}", state.samples_played);
        }
        Ok(())
    }

    pub fn resume(&self) -> Result<()> {
        let mut state = self.lock();
        if state.stream.is_none() {
            return Err(Error::NoActivePlayback);
        }
        if state.is_paused {
            state.is_paused = false;
            state.is_playing = true;
            debug!("Resumed at frame {}", state.samples_played);
        }
        Ok(())
    }

    /// Pause or resume. Returns whether output is now running.
    pub fn toggle_pause(&self) -> Result<bool> {
        let paused = {
            let state = self.lock();
            if state.stream.is_none() {
                return Err(Error::NoActivePlayback);
            }
            state.is_paused
        };

        if paused {
            self.resume()?;
            Ok(true)
        } else {
            self.pause()?;
            Ok(false)
        }
    }

    /// Release the stream and zero the counters. Safe to call any time.
    pub fn stop(&self) {
        let old = self.lock().reset();
        if let Some(old) = old {
            close_stream(old);
            info!("Playback stopped");
        }
    }

    pub fn skip_forward(&self, by: Duration) -> Result<()> {
        self.seek_by(by, true)
    }

    pub fn skip_backward(&self, by: Duration) -> Result<()> {
        self.seek_by(by, false)
    }

    fn seek_by(&self, by: Duration, forward: bool) -> Result<()> {
        let mut guard = self.lock();
        let state = &mut *guard;

        let stream = state.stream.as_mut().ok_or(Error::NoActivePlayback)?;
        if state.total_samples == 0 {
            // No known length, nothing to clamp against
            return Err(Error::SeekUnsupported);
        }

        let delta = (by.as_secs_f64() * state.sample_rate as f64).round() as u64;
        let target = if forward {
            state.samples_played.saturating_add(delta).min(state.total_samples)
        } else {
            state.samples_played.saturating_sub(delta)
        };

        if target >= state.total_samples {
            state.samples_played = state.total_samples;
            state.exhausted = true;
            debug!("Seek clamped to end of track");
            return Ok(());
        }

        stream.seek(target)?;
        state.samples_played = target;
        if state.end_signalled {
            // Back inside the track after running dry: pick up where the user left it
            state.is_paused = state.paused_at_end;
            state.is_playing = !state.paused_at_end;
        }
        state.exhausted = false;
        state.end_signalled = false;
        state.paused_at_end = false;
        state.finish_reported = false;
        debug!("Seeked to frame {}", target);
        Ok(())
    }

    /// Clamp and store a new volume. Returns the stored level.
    pub fn set_volume(&self, percent: f64) -> f64 {
        let stored = self.lock().volume.set_percent(percent);
        debug!("Volume set to {:.0}%", stored);
        stored
    }

    pub fn volume(&self) -> f64 {
        self.lock().volume.percent()
    }

    /// Returns whether output is now muted.
    pub fn toggle_mute(&self) -> bool {
        let muted = self.lock().volume.toggle_mute();
        debug!("Mute {}", if muted { "on" } else { "off" });
        muted
    }

    pub fn is_muted(&self) -> bool {
        self.lock().volume.is_muted()
    }

    pub fn progress(&self) -> f64 {
        self.lock().progress()
    }

    /// Open, not paused, and the decoder hasn't run dry.
    pub fn is_playing(&self) -> bool {
        let state = self.lock();
        state.stream.is_some() && state.is_playing && !state.exhausted
    }

    pub fn current_track(&self) -> Option<AudioFile> {
        self.lock().track.clone()
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    pub fn elapsed(&self) -> Duration {
        let state = self.lock();
        state.frames_to_duration(state.samples_played)
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        let state = self.lock();
        PlaybackSnapshot {
            track: state.track.clone(),
            is_open: state.stream.is_some(),
            is_playing: state.is_playing && !state.exhausted,
            is_paused: state.is_paused,
            sample_rate: state.sample_rate,
            total_samples: state.total_samples,
            samples_played: state.samples_played,
            volume_percent: state.volume.percent(),
            muted: state.volume.is_muted(),
            generation: state.generation,
        }
    }

    /// Claim the end of the current track. True at most once per opened
    /// stream: when the decoder has run dry, or while playing once progress
    /// reaches `threshold`.
    pub fn take_finished(&self, threshold: f64) -> bool {
        let mut state = self.lock();
        if state.stream.is_none() || state.finish_reported {
            return false;
        }

        let ran_dry = state.exhausted || state.end_signalled;
        let near_end = state.is_playing && state.total_samples > 0 && state.progress() >= threshold;

        if ran_dry || near_end {
            state.finish_reported = true;
            debug!("Track finished (generation {})", state.generation);
            return true;
        }
        false
    }
}

impl Drop for AudioPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn close_stream(stream: Box<dyn DecodedStream>) {
    if let Err(e) = stream.close() {
        warn!("Failed to close previous stream: {}", e);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashSet;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Shared counters for fake streams.
    #[derive(Default)]
    pub struct OpenCounter {
        pub open: AtomicUsize,
        pub max_open: AtomicUsize,
        pub opened: AtomicUsize,
    }

    /// In-memory stream: a constant tone of a known length.
    pub struct FakeStream {
        pub sample_rate: u32,
        pub channels: u16,
        pub total_frames: u64,
        pub position: u64,
        pub seekable: bool,
        pub counter: Arc<OpenCounter>,
    }

    impl DecodedStream for FakeStream {
        fn sample_rate(&self) -> u32 {
            self.sample_rate
        }

        fn channels(&self) -> u16 {
            self.channels
        }

        fn total_frames(&self) -> u64 {
            self.total_frames
        }

        fn read(&mut self, out: &mut [f32]) -> usize {
            let channels = self.channels as usize;
            let remaining = (self.total_frames - self.position) as usize;
            let frames = (out.len() / channels).min(remaining);
            for sample in &mut out[..frames * channels] {
                *sample = 0.5;
            }
            self.position += frames as u64;
            frames * channels
        }

        fn seek(&mut self, frame: u64) -> Result<()> {
            if !self.seekable {
                return Err(Error::SeekUnsupported);
            }
            self.position = frame.min(self.total_frames);
            Ok(())
        }

        fn close(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }

    impl Drop for FakeStream {
        fn drop(&mut self) {
            self.counter.open.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Opens fake streams for any path not listed as broken.
    pub struct FakeOpener {
        pub sample_rate: u32,
        pub total_frames: u64,
        pub seekable: bool,
        pub broken: HashSet<PathBuf>,
        pub counter: Arc<OpenCounter>,
    }

    impl FakeOpener {
        pub fn new(sample_rate: u32, total_frames: u64) -> Self {
            Self {
                sample_rate,
                total_frames,
                seekable: true,
                broken: HashSet::new(),
                counter: Arc::new(OpenCounter::default()),
            }
        }

        pub fn broken(mut self, path: &str) -> Self {
            self.broken.insert(PathBuf::from(path));
            self
        }
    }

    impl StreamOpener for FakeOpener {
        fn open(&self, path: &Path) -> Result<Box<dyn DecodedStream>> {
            if self.broken.contains(path) {
                return Err(Error::decode(path, "not an mp3"));
            }
            let now_open = self.counter.open.fetch_add(1, Ordering::SeqCst) + 1;
            self.counter.max_open.fetch_max(now_open, Ordering::SeqCst);
            self.counter.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeStream {
                sample_rate: self.sample_rate,
                channels: 2,
                total_frames: self.total_frames,
                position: 0,
                seekable: self.seekable,
                counter: Arc::clone(&self.counter),
            }))
        }
    }

    pub fn track(path: &str) -> AudioFile {
        AudioFile::untagged(PathBuf::from(path))
    }

    pub fn player_with(opener: FakeOpener) -> (AudioPlayer, Arc<OpenCounter>) {
        let counter = Arc::clone(&opener.counter);
        let player = AudioPlayer::with_opener(AudioConfig::default(), Arc::new(opener));
        (player, counter)
    }

    /// Stand in for the output callback: pull `frames` frames.
    pub fn pull(player: &AudioPlayer, frames: usize) -> Vec<f32> {
        let mut buf = Vec::new();
        player.lock().fill(&mut buf, frames);
        buf
    }
}
