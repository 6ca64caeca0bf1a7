// Output side of the engine - the audio thread pulls blocks through here
// One PlaybackSource is installed in the sink for the whole process; tracks swap underneath it

use super::player::PlaybackState;
use crate::error::{Error, Result};
use rodio::{OutputStream, Sink, Source};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Frames pulled per lock. Small enough that pause and seek land quickly.
const BLOCK_FRAMES: usize = 1024;

/// Endless `rodio::Source` over the engine state: decoded audio while a track
/// plays, silence otherwise.
pub struct PlaybackSource {
    state: Arc<Mutex<PlaybackState>>,
    buffer: Vec<f32>,
    position: usize,
    channels: u16,
    sample_rate: u32,
}

impl PlaybackSource {
    pub(crate) fn new(state: Arc<Mutex<PlaybackState>>) -> Self {
        let mut source = Self {
            state,
            buffer: Vec::with_capacity(BLOCK_FRAMES * 2),
            position: 0,
            channels: 2,
            sample_rate: 44_100,
        };
        source.refill();
        source
    }

    // The buffer is refilled as soon as it drains so current_frame_len never reports 0
    fn refill(&mut self) {
        let block = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fill(&mut self.buffer, BLOCK_FRAMES);
        self.channels = block.channels;
        self.sample_rate = block.sample_rate;
        self.position = 0;
    }
}

impl Iterator for PlaybackSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        let sample = self.buffer.get(self.position).copied().unwrap_or(0.0);
        self.position += 1;
        if self.position >= self.buffer.len() {
            self.refill();
        }
        Some(sample)
    }
}

impl Source for PlaybackSource {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.buffer.len().saturating_sub(self.position).max(1))
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

/// Keeps the platform output stream open with our source installed.
pub struct OutputDevice {
    _stream: OutputStream, // dropping this closes the device
    sink: Sink,
}

impl OutputDevice {
    pub fn open(source: PlaybackSource) -> Result<Self> {
        let (stream, handle) =
            OutputStream::try_default().map_err(|e| Error::OutputUnavailable(e.to_string()))?;
        let sink = Sink::try_new(&handle).map_err(|e| Error::OutputUnavailable(e.to_string()))?;
        sink.append(source);

        Ok(Self {
            _stream: stream,
            sink,
        })
    }
}

impl Drop for OutputDevice {
    fn drop(&mut self) {
        self.sink.stop();
    }
}

#[cfg(test)]
mod tests {
    use crate::audio::player::testing::*;
    use rodio::Source;

    #[test]
    fn idle_source_plays_silence_forever() {
        let (player, _) = player_with(FakeOpener::new(1_000, 1_000));
        let mut source = player.source();

        assert_eq!(source.channels(), 2);
        for _ in 0..5_000 {
            assert_eq!(source.next(), Some(0.0));
            assert!(source.current_frame_len().unwrap() > 0);
        }
    }

    #[test]
    fn source_picks_up_a_new_track() {
        let (player, _) = player_with(FakeOpener::new(8_000, 4_000));
        let mut source = player.source();
        player.play(&track("/music/a.mp3")).unwrap();

        // Drain the silent block that was buffered before play
        let mut heard = false;
        for _ in 0..10_000 {
            if source.next().unwrap() != 0.0 {
                heard = true;
                break;
            }
        }
        assert!(heard);
        assert_eq!(source.sample_rate(), 8_000);
        assert!(player.snapshot().samples_played > 0);
    }
}
