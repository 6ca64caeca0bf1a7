// Tick-driven progress sampling and the end-of-track handoff
// Finished means past the threshold or the decoder ran dry; the engine latch keeps it to one advance

use super::player::AudioPlayer;
use super::queue::Queue;
use super::track::AudioFile;
use crate::error::Result;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Nothing playing or no known length; leave the display as it is.
    Idle,
    Progress(f64),
    /// The current track just ended. Carries the last progress value.
    Finished(f64),
}

impl TickOutcome {
    pub fn percent(&self) -> Option<f64> {
        match self {
            TickOutcome::Idle => None,
            TickOutcome::Progress(p) | TickOutcome::Finished(p) => Some(*p),
        }
    }
}

pub fn evaluate_tick(player: &AudioPlayer, threshold: f64) -> TickOutcome {
    let snapshot = player.snapshot();

    // An exhausted stream is no longer "playing" but still needs its finish claimed
    if snapshot.is_open && player.take_finished(threshold) {
        return TickOutcome::Finished(snapshot.progress());
    }

    if !snapshot.is_playing || snapshot.total_samples == 0 {
        return TickOutcome::Idle;
    }

    TickOutcome::Progress(snapshot.progress())
}

/// What ended-track handling did.
#[derive(Debug, Clone, PartialEq)]
pub enum Handoff {
    Advanced(AudioFile),
    Stopped,
}

/// Move playback on after a finished track: the next queued track when the
/// queue is driving playback, otherwise stop.
pub fn advance_after_finish(player: &AudioPlayer, queue: &mut Queue, from_queue: bool) -> Result<Handoff> {
    let next = if from_queue {
        queue.advance_and_get_next().cloned()
    } else {
        None
    };

    match next {
        Some(track) => {
            info!("Advancing to {}", track.path.display());
            if let Err(e) = player.play(&track) {
                player.stop();
                return Err(e);
            }
            Ok(Handoff::Advanced(track))
        }
        None => {
            player.stop();
            info!("End of playback");
            Ok(Handoff::Stopped)
        }
    }
}
