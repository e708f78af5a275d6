mod app;
mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vsearch_experiment::{ExperimentStateMachine, RngSource, TrialTable};
use vsearch_render::INSTRUCTIONS;
use vsearch_timing::HighPrecisionTimer;

pub use app::App;
use cli::{Cli, cascade_listing};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .compact()
        .init();

    let config = cli.load_config()?;
    let table = TrialTable::from_path(&cli.design, &config.design)
        .with_context(|| format!("loading design {}", cli.design.display()))?;

    if cli.list {
        print!("{}", cascade_listing(&table));
        return Ok(());
    }

    let (participant, block, trial) = cli.resolve_start(&table)?;
    let font = load_font(&cli);

    let mut experiment = ExperimentStateMachine::new(
        table,
        config,
        HighPrecisionTimer::new(),
        RngSource(rand::rng()),
    );
    experiment
        .start(&participant, block, trial)
        .with_context(|| format!("starting {participant} at block {block}, trial {trial}"))?;

    App::new(experiment, font, cli.windowed).run()
}

fn load_font(cli: &Cli) -> Option<Vec<u8>> {
    for path in cli.font_candidates() {
        match std::fs::read(&path) {
            Ok(bytes) => {
                info!(font = %path.display(), "using font");
                return Some(bytes);
            }
            Err(e) if cli.font.as_ref() == Some(&path) => {
                warn!(font = %path.display(), error = %e, "cannot read requested font");
            }
            Err(_) => {}
        }
    }
    warn!("no font found; on-screen text is disabled, pass --font to enable it");
    for line in INSTRUCTIONS {
        info!("{line}");
    }
    None
}
