mod repl;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use earstreak::{
    FileStore, GameMode, LevelConfiguration, PlaybackEngine, Progress, Settings, SoundService,
};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "earstreak.ron";

#[derive(Parser)]
#[command(name = "earstreak", about = "Ear training: hear a melody, play it back")]
#[command(version)]
struct Cli {
    /// Endless rounds of random length instead of a catalog level
    #[arg(long, conflicts_with = "level")]
    challenge: bool,

    /// Catalog level to play (must be unlocked)
    #[arg(long)]
    level: Option<u32>,

    /// Chord naming quiz
    #[arg(long, conflicts_with_all = ["challenge", "level"])]
    chords: bool,

    /// Settings file (RON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for reproducible rounds
    #[arg(long)]
    seed: Option<u64>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("earstreak=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref());

    let engine = PlaybackEngine::start(&settings.audio);
    if !engine.is_available() {
        eprintln!("No audio output; continuing without sound.");
    }
    let sound: Arc<dyn SoundService> = Arc::new(engine);

    let seed = cli.seed.unwrap_or_else(rand::random);
    let result = if cli.chords {
        repl::run_chords(sound, &settings, seed)
    } else {
        let progress = Progress::new(Box::new(FileStore::open(&settings.store_path)));
        let mode = pick_mode(&cli, &progress);
        repl::run_game(mode, settings, sound, progress, seed)
    };

    if let Err(e) = result {
        eprintln!("Terminal error: {}", e);
        std::process::exit(1);
    }
}

fn load_settings(path: Option<&Path>) -> Settings {
    match path {
        Some(path) => Settings::load(path).unwrap_or_else(|e| {
            eprintln!("{}", e);
            std::process::exit(1);
        }),
        None => Settings::load_or_default(Path::new(DEFAULT_CONFIG)),
    }
}

fn pick_mode(cli: &Cli, progress: &Progress) -> GameMode {
    if cli.challenge {
        return GameMode::Challenge;
    }
    let number = cli.level.unwrap_or_else(|| progress.highest_unlocked());
    let Some(configuration) = LevelConfiguration::by_number(number) else {
        eprintln!(
            "No level {} (levels run 1 to {})",
            number,
            LevelConfiguration::catalog().len()
        );
        std::process::exit(1);
    };
    if !progress.is_unlocked(number) {
        eprintln!("Level {} is locked", number);
        std::process::exit(1);
    }
    GameMode::Practice(configuration)
}
