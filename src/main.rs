//! ShapeMania level compiler entry point
//!
//! Compiles a level document into a rapier world and prints the resulting
//! level record as JSON.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use shapemania::level::{Element, StaticBodyRegistry, assemble};
use shapemania::sim::RapierWorld;
use shapemania::{LevelError, Tuning};

#[derive(Parser, Debug)]
#[command(name = "shapemania", about = "Compile a ShapeMania level into physics bodies")]
struct Cli {
    /// Level document (JSON element tree)
    level: PathBuf,

    /// Tuning overrides; defaults are used if missing or invalid
    #[arg(long)]
    tuning: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let tuning = cli
        .tuning
        .as_deref()
        .map(Tuning::load_or_default)
        .unwrap_or_default();

    match run(&cli.level, &tuning) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}: {e}", cli.level.display());
            ExitCode::FAILURE
        }
    }
}

fn run(path: &Path, tuning: &Tuning) -> Result<String, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;
    let document = Element::from_json(&text)?;
    let (level, geometry) = assemble(&document, tuning)?;

    let mut world = RapierWorld::default();
    let registry = StaticBodyRegistry::instantiate(&level, &geometry, &mut world);
    log::info!(
        "{} bodies ({} convex shapes) instantiated",
        registry.len(),
        geometry.shape_count()
    );

    let json = serde_json::to_string_pretty(&level);
    registry.dispose(&mut world);
    Ok(json.map_err(LevelError::from)?)
}
