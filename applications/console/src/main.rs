/// Atelier Console - sidebar player driven from the terminal
use atelier_console::{
    config::ConsoleConfig,
    keymap::HELP,
    playlist,
    render::{OutputMode, Renderer},
    session::{self, Session},
};
use atelier_playback::PlaybackController;
use clap::Parser;
use std::path::PathBuf;
use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "atelier-console")]
#[command(about = "Play the Atelier sidebar playlist from the terminal", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "ATELIER_CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Playlist file (TOML with [[tracks]] entries)
    #[arg(short, long)]
    playlist: Option<PathBuf>,

    /// Print state and events as JSON lines
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays parseable in JSON mode
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "atelier_console=info,atelier_playback=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = ConsoleConfig::load(cli.config.as_deref())?;
    config.validate()?;

    let tracks = match &cli.playlist {
        Some(path) => playlist::load(path)?,
        None => playlist::demo()?,
    };
    if tracks.is_empty() {
        tracing::warn!("Playlist is empty; only volume controls will do anything");
    }
    tracing::info!(tracks = tracks.len(), "Starting Atelier console");

    let mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };

    let controller = PlaybackController::spawn(
        tracks.clone(),
        config.preview.factory(),
        config.playback.clone(),
    );
    let printer = session::spawn_event_printer(controller.clone(), Renderer::new(mode));

    if mode == OutputMode::Text {
        println!("{HELP}\n");
        println!(
            "{}",
            Renderer::new(mode).playlist(&tracks, &controller.snapshot())
        );
    }

    let mut session = Session::new(
        controller.clone(),
        config.controls.clone(),
        Renderer::new(mode),
        tracks,
        std::io::stdout(),
    );
    session.run(BufReader::new(tokio::io::stdin())).await?;

    controller.shutdown().await?;
    printer.abort();
    tracing::info!("Console stopped");

    Ok(())
}
