use std::path::PathBuf;

/// Failures that stop a session from starting or its log from being written.
///
/// Running out of trials and wrong clicks are part of normal flow and are
/// reported through the state machine instead.
#[derive(Debug, thiserror::Error)]
pub enum ExperimentError {
    #[error("failed to open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("malformed design data: {0}")]
    Csv(#[from] csv::Error),

    #[error("design file has no `{0}` column")]
    MissingColumn(String),

    #[error("line {line}: invalid {column} value `{value}`")]
    InvalidField {
        line: u64,
        column: String,
        value: String,
    },

    #[error("design file contains no trials")]
    EmptyDesign,

    #[error("no trial for participant {participant}, block {block}, trial {trial}")]
    NoMatchingStartRow {
        participant: String,
        block: u32,
        trial: u32,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ExperimentError>;
