// Decoder handles - an open, seekable, closeable sample stream over one file
// The engine only talks to DecodedStream/StreamOpener, so tests can swap in an in-memory stream

use crate::error::{Error, Result};
use rodio::source::SeekError;
use rodio::{Decoder, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub trait DecodedStream: Send {
    fn sample_rate(&self) -> u32;

    fn channels(&self) -> u16;

    /// Length in frames (one sample per channel), 0 when unknown.
    fn total_frames(&self) -> u64;

    /// Fill `out` with interleaved samples in [-1, 1]. Returns how many were
    /// written; 0 means the stream is exhausted.
    fn read(&mut self, out: &mut [f32]) -> usize;

    /// Reposition so the next `read` starts at `frame`.
    fn seek(&mut self, frame: u64) -> Result<()>;

    fn close(self: Box<Self>) -> Result<()>;
}

pub trait StreamOpener: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn DecodedStream>>;
}

/// Opens MP3 files through rodio's Symphonia-backed decoder.
#[derive(Debug, Default, Clone, Copy)]
pub struct Mp3Opener;

impl StreamOpener for Mp3Opener {
    fn open(&self, path: &Path) -> Result<Box<dyn DecodedStream>> {
        let file = File::open(path).map_err(|e| Error::decode(path, e))?;
        let decoder = Decoder::new_mp3(BufReader::new(file)).map_err(|e| Error::decode(path, e))?;

        let sample_rate = decoder.sample_rate();
        let channels = decoder.channels();
        if sample_rate == 0 || channels == 0 {
            return Err(Error::decode(path, "stream header reports no audio"));
        }

        let total_frames = decoder
            .total_duration()
            .map(|d| (d.as_secs_f64() * sample_rate as f64).round() as u64)
            .or_else(|| probed_frames(path, sample_rate))
            .unwrap_or(0);

        debug!(
            "Opened {} ({} Hz, {} ch, {} frames)",
            path.display(),
            sample_rate,
            channels,
            total_frames
        );

        Ok(Box::new(RodioStream {
            decoder,
            sample_rate,
            channels,
            total_frames,
        }))
    }
}

// Header frame counts are in the file's own rate; rescale if the decoder differs.
fn probed_frames(path: &Path, sample_rate: u32) -> Option<u64> {
    let (frames, rate) = super::metadata::probe_frames(path).ok()?;
    if rate == 0 {
        return None;
    }
    Some(frames * sample_rate as u64 / rate as u64)
}

struct RodioStream {
    decoder: Decoder<BufReader<File>>,
    sample_rate: u32,
    channels: u16,
    total_frames: u64,
}

impl DecodedStream for RodioStream {
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
        let mut written = 0;
        for slot in out.iter_mut() {
            match self.decoder.next() {
                Some(sample) => {
                    *slot = sample as f32 / i16::MAX as f32;
                    written += 1;
                }
                None => break,
            }
        }
        written
    }

    fn seek(&mut self, frame: u64) -> Result<()> {
        let target = Duration::from_secs_f64(frame as f64 / self.sample_rate as f64);
        self.decoder.try_seek(target).map_err(|e| match e {
            SeekError::NotSupported { .. } => Error::SeekUnsupported,
            other => Error::Seek(other.to_string()),
        })
    }

    fn close(self: Box<Self>) -> Result<()> {
        // Dropping the decoder releases the file handle
        Ok(())
    }
}
