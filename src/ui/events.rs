use crate::audio::{AudioFile, PlayerEvent};
use crate::error::Error;
use crossterm::event::{Event, EventStream, KeyEvent, KeyEventKind};
use futures::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Everything the update loop reacts to, in arrival order.
#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize,
    Tick,
    /// Decoder ran dry for the stream opened as `generation`.
    TrackFinished { generation: u64 },
    ScanCompleted(Vec<AudioFile>),
    SearchCompleted { seq: u64, results: Vec<usize> },
    CommandFailed(Error),
}

pub struct EventHandler {
    event_sender: mpsc::UnboundedSender<AppEvent>,
    event_receiver: mpsc::UnboundedReceiver<AppEvent>,
}

impl EventHandler {
    pub fn new() -> Self {
        let (event_sender, event_receiver) = mpsc::unbounded_channel();

        Self {
            event_sender,
            event_receiver,
        }
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<AppEvent> {
        self.event_sender.clone()
    }

    pub async fn next_event(&mut self) -> Option<AppEvent> {
        self.event_receiver.recv().await
    }

    /// Forward terminal input. Only key presses count, not releases/repeats.
    pub fn spawn_input(&self) -> JoinHandle<()> {
        let sender = self.sender();
        tokio::spawn(async move {
            let mut reader = EventStream::new();
            while let Some(event) = reader.next().await {
                let app_event = match event {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => AppEvent::Key(key),
                    Ok(Event::Resize(_, _)) => AppEvent::Resize,
                    Ok(_) => continue,
                    Err(e) => {
                        warn!("Terminal input error: {}", e);
                        break;
                    }
                };
                if sender.send(app_event).is_err() {
                    break;
                }
            }
            debug!("Input task finished");
        })
    }

    /// Send periodic tick events
    pub fn spawn_ticks(&self, period: Duration) -> JoinHandle<()> {
        let sender = self.sender();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if sender.send(AppEvent::Tick).is_err() {
                    break;
                }
            }
        })
    }

    /// Turn engine notifications into app events.
    pub fn forward_player(&self, mut player_events: mpsc::UnboundedReceiver<PlayerEvent>) -> JoinHandle<()> {
        let sender = self.sender();
        tokio::spawn(async move {
            while let Some(event) = player_events.recv().await {
                let app_event = match event {
                    PlayerEvent::StreamEnded { generation } => AppEvent::TrackFinished { generation },
                };
                if sender.send(app_event).is_err() {
                    break;
                }
            }
        })
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Run blocking work on the blocking pool and post its result back as an event.
pub fn spawn_background<F>(sender: mpsc::UnboundedSender<AppEvent>, work: F) -> JoinHandle<()>
where
    F: FnOnce() -> AppEvent + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        // Loop gone means we're shutting down
        let _ = sender.send(work());
    })
}

/// Run `work` after `delay`, unless `latest` has moved past `seq` by then.
pub fn spawn_debounced<F>(
    sender: mpsc::UnboundedSender<AppEvent>,
    latest: Arc<AtomicU64>,
    seq: u64,
    delay: Duration,
    work: F,
) -> JoinHandle<()>
where
    F: FnOnce() -> AppEvent + Send + 'static,
{
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if latest.load(Ordering::SeqCst) != seq {
            return;
        }
        // Awaited so a test can wait on the whole chain through this handle
        let _ = spawn_background(sender, work).await;
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn background_work_posts_its_result() {
        let mut events = EventHandler::new();
        spawn_background(events.sender(), || AppEvent::SearchCompleted {
            seq: 7,
            results: vec![1, 2],
        })
        .await
        .unwrap();

        match events.next_event().await {
            Some(AppEvent::SearchCompleted { seq, results }) => {
                assert_eq!(seq, 7);
                assert_eq!(results, vec![1, 2]);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn superseded_debounce_does_nothing() {
        let mut events = EventHandler::new();
        let latest = Arc::new(AtomicU64::new(1));

        let stale = spawn_debounced(
            events.sender(),
            Arc::clone(&latest),
            1,
            Duration::from_millis(20),
            || AppEvent::Tick,
        );
        latest.store(2, Ordering::SeqCst);
        let fresh = spawn_debounced(
            events.sender(),
            Arc::clone(&latest),
            2,
            Duration::from_millis(20),
            || AppEvent::Resize,
        );
        stale.await.unwrap();
        fresh.await.unwrap();

        assert!(matches!(events.next_event().await, Some(AppEvent::Resize)));
        assert!(events.event_receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn player_end_becomes_track_finished() {
        let mut events = EventHandler::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let forwarder = events.forward_player(rx);

        tx.send(PlayerEvent::StreamEnded { generation: 3 }).unwrap();
        drop(tx);
        forwarder.await.unwrap();

        assert!(matches!(
            events.next_event().await,
            Some(AppEvent::TrackFinished { generation: 3 })
        ));
    }
}
