use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use realm::{Difficulty, Game, GameSettings, SettingsLoader};

#[derive(Debug, Parser)]
#[command(author, version, about = "Headless realm simulation runner")]
struct Cli {
    /// Settings YAML file (built-in defaults when omitted)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Override turn count
    #[arg(long)]
    turns: Option<u32>,

    /// Override the master seed
    #[arg(long)]
    seed: Option<u64>,

    /// easy, normal or hard
    #[arg(long)]
    difficulty: Option<Difficulty>,

    /// Override map radius
    #[arg(long)]
    radius: Option<i32>,

    /// Print the final state as JSON
    #[arg(long)]
    json: bool,

    /// Directory to write the final snapshot into
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = match &cli.settings {
        Some(path) => SettingsLoader::new(".").load(path)?,
        None => GameSettings::default(),
    };
    if let Some(seed) = cli.seed {
        settings.seed = seed;
    }
    if let Some(difficulty) = cli.difficulty {
        settings.difficulty = difficulty;
    }
    if let Some(radius) = cli.radius {
        settings.map_radius = radius;
    }
    settings.validate()?;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.logging.level));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let turns = settings.turns(cli.turns);
    let mut game = Game::generate(settings)?;
    let summaries = game.run(turns)?;

    let collapses = summaries.iter().filter(|s| s.events.collapsed).count();
    let snapshot = game.snapshot();
    if let Some(dir) = &cli.snapshot_dir {
        let path = snapshot.write(dir)?;
        println!("Snapshot written to {}", path.display());
    }
    if cli.json {
        println!("{}", snapshot.to_json()?);
    } else {
        println!(
            "Realm '{}' ran {} turns. Era: {}. Settlements: {}. Population: {}. \
             Treasury: {}. Collapses: {}. Outlook: {}",
            game.settings().name,
            turns,
            snapshot.era,
            snapshot.settlements.len(),
            snapshot.population,
            snapshot.treasury,
            collapses,
            snapshot.outlook.describe()
        );
    }
    Ok(())
}
