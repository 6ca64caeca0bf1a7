use std::path::PathBuf;
use tapedeck::audio::{MetadataCache, MusicScanner};
use tapedeck::config::Config;

fn main() -> anyhow::Result<()> {
    println!("🎵 tapedeck scan report");
    println!("=======================");

    let music_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    println!("📁 Scanning: {:?}", music_dir);

    let config = Config::default();
    let scanner = MusicScanner::from_config(&config.library, MetadataCache::new());

    let tracks = match scanner.scan_directory(&music_dir) {
        Ok(tracks) => tracks,
        Err(e) => {
            println!("❌ {}", e);
            std::process::exit(1);
        }
    };

    println!("✅ Found {} files\n", tracks.len());

    for (i, track) in tracks.iter().enumerate() {
        println!("{:>4}. {}", i + 1, track.title);
        println!("      Artist: {}", track.artist);
        println!("      Album: {}", track.album);
        println!("      Duration: {}", track.duration);
        println!("      Path: {:?}", track.path);
    }

    let untagged = tracks.iter().filter(|t| t.duration == "0:00").count();
    if untagged > 0 {
        println!("\n⚠️  {} files with no readable length", untagged);
    }

    Ok(())
}
