pub mod config;
pub mod error;
pub mod evaluator;
pub mod generator;
pub mod log;
pub mod selection;
pub mod state;
pub mod table;

pub use config::{ColumnNames, DesignConfig, ExperimentConfig, LogConfig, StimulusConfig};
pub use error::{ExperimentError, Result};
pub use evaluator::{Decision, evaluate};
pub use generator::{RandomSource, RngSource, SequenceSource, StimulusGenerator};
pub use log::{LogStore, export_file_name};
pub use selection::{SelectionOptions, StartSelection};
pub use state::{Advance, ExperimentEvent, ExperimentStateMachine};
pub use table::TrialTable;
