// tapedeck - Terminal Music Player
// Point it at a folder of MP3s, queue a few up, let it play

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tapedeck::audio::{AudioPlayer, MetadataCache, MusicScanner};
use tapedeck::config::Config;
use tapedeck::logging::{init_logging, redirect_stderr_to_null};
use tapedeck::ui::{self, App, EventHandler};
use tokio::sync::mpsc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "tapedeck", version, about = "Terminal MP3 player")]
struct Args {
    /// Music directory to scan
    #[arg(default_value = ".")]
    dir: PathBuf,

    /// Use this config file instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keep stderr attached (see backend errors and panics)
    #[arg(long)]
    dev: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("tapedeck: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    // Config first - it decides where logs go
    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let _log_guard = init_logging(&config.logging.log_dir(), config.logging.filter.as_deref(), args.dev)?;
    info!("tapedeck starting in {}", args.dir.display());

    if !args.dir.is_dir() {
        anyhow::bail!("{} is not a directory", args.dir.display());
    }
    std::fs::read_dir(&args.dir)
        .map_err(|e| anyhow::anyhow!("cannot read {}: {}", args.dir.display(), e))?;

    let player = AudioPlayer::new(config.playback.clone().into())?;

    // Audio backends love printing to stderr; don't let them tear the TUI
    if !args.dev {
        redirect_stderr_to_null()?;
    }

    let mut events = EventHandler::new();
    let (player_tx, player_rx) = mpsc::unbounded_channel();
    player.set_event_sender(player_tx);
    events.forward_player(player_rx);

    let scanner = MusicScanner::from_config(&config.library, MetadataCache::new());
    let tick = config.playback.tick_interval();
    let mut app = App::new(config, args.dir.clone(), player, scanner, events.sender());
    app.start_scan();

    ui::run(&mut app, &mut events, tick).await?;

    info!("tapedeck exiting");
    Ok(())
}
