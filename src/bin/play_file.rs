use std::io::Write;
use std::path::PathBuf;
use tapedeck::audio::{advance_after_finish, evaluate_tick, AudioFile, AudioPlayer, MetadataCache, Queue, TickOutcome};
use tapedeck::config::Config;
use tokio::time::sleep;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("🎵 tapedeck playback check");
    println!("==========================");

    let Some(path) = std::env::args().nth(1).map(PathBuf::from) else {
        println!("usage: play_file FILE.mp3");
        std::process::exit(2);
    };

    if !path.is_file() {
        println!("❌ Not a file: {:?}", path);
        std::process::exit(1);
    }

    let tags = MetadataCache::new().read(&path);
    let track = AudioFile::new(path, tags);

    println!("🎧 {}", track.display_name());
    println!("   Album: {}", track.album);
    println!("   Duration: {}", track.duration);

    let config = Config::default();
    let player = AudioPlayer::new(config.playback.clone().into())?;

    println!("\n▶️  Starting playback...");
    player.play(&track)?;

    let threshold = config.playback.finish_threshold;
    let mut queue = Queue::new();
    loop {
        sleep(config.playback.tick_interval()).await;

        match evaluate_tick(&player, threshold) {
            TickOutcome::Idle => {}
            TickOutcome::Progress(percent) => {
                let snapshot = player.snapshot();
                print!(
                    "\r   {:>5.1}%  {} / {}",
                    percent * 100.0,
                    tapedeck::audio::format_duration(snapshot.elapsed()),
                    tapedeck::audio::format_duration(snapshot.total())
                );
                std::io::stdout().flush()?;
            }
            TickOutcome::Finished(_) => {
                advance_after_finish(&player, &mut queue, false)?;
                break;
            }
        }
    }

    println!("\n✅ Finished");
    Ok(())
}
