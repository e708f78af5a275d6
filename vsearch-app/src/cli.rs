use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::PathBuf;
use vsearch_experiment::{ExperimentConfig, StartSelection, TrialTable};

/// Common locations of a sans-serif TTF for the instructions screen.
const SYSTEM_FONTS: [&str; 4] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

#[derive(Parser, Debug)]
#[command(name = "vsearch")]
#[command(version)]
#[command(about = "Visual search experiment: find the odd shape, then click its placeholder")]
pub struct Cli {
    /// Trial design CSV
    pub design: PathBuf,

    /// JSON experiment configuration; defaults apply when omitted
    #[arg(long, env = "VSEARCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Participant to run (first in the design by default)
    #[arg(short, long)]
    pub participant: Option<String>,

    /// Starting Block1 value (first for the participant by default)
    #[arg(short, long)]
    pub block: Option<u32>,

    /// Starting Block2 value (first for the block by default)
    #[arg(short, long)]
    pub trial: Option<u32>,

    /// TTF/OTF font for on-screen text
    #[arg(long, env = "VSEARCH_FONT")]
    pub font: Option<PathBuf>,

    /// Where exported logs go; overrides the configuration
    #[arg(long)]
    pub export_dir: Option<PathBuf>,

    /// Print the participant/block/trial choices and exit
    #[arg(long)]
    pub list: bool,

    /// Run in a window instead of borderless fullscreen
    #[arg(long)]
    pub windowed: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn load_config(&self) -> Result<ExperimentConfig> {
        let mut config = match &self.config {
            Some(path) => ExperimentConfig::from_json_file(path)
                .with_context(|| format!("loading configuration {}", path.display()))?,
            None => ExperimentConfig::default(),
        };
        if let Some(dir) = &self.export_dir {
            config.log.export_dir = dir.clone();
        }
        Ok(config)
    }

    /// Applies the requested participant, block and trial on top of the
    /// first-option defaults.
    pub fn resolve_start(&self, table: &TrialTable) -> Result<(String, u32, u32)> {
        let mut selection = StartSelection::new(table);

        if let Some(p) = &self.participant {
            if !selection.select_participant(table, p) {
                bail!(
                    "participant `{p}` is not in the design (have: {})",
                    table.participants().join(", ")
                );
            }
        }
        if let Some(b) = self.block {
            if !selection.select_block(table, b) {
                bail!(
                    "block {b} not available (have: {:?})",
                    selection.options(table).blocks
                );
            }
        }
        if let Some(t) = self.trial {
            if !selection.select_trial(table, t) {
                bail!(
                    "trial {t} not available (have: {:?})",
                    selection.options(table).trials
                );
            }
        }

        match selection.choice() {
            Some((p, b, t)) => Ok((p.to_string(), b, t)),
            None => bail!("design has no selectable start row"),
        }
    }

    /// Explicit `--font` first, then the usual system locations.
    pub fn font_candidates(&self) -> Vec<PathBuf> {
        self.font
            .iter()
            .cloned()
            .chain(SYSTEM_FONTS.iter().map(PathBuf::from))
            .collect()
    }
}

/// Indented participant → block → trial tree.
pub fn cascade_listing(table: &TrialTable) -> String {
    let mut out = String::new();
    for p in table.participants() {
        out.push_str(&format!("{p}\n"));
        for b in table.blocks(p) {
            let trials: Vec<String> = table.trials(p, b).iter().map(u32::to_string).collect();
            out.push_str(&format!("  block {b}: trials {}\n", trials.join(", ")));
        }
    }
    out
}
