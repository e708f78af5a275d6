use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use csv::{Terminator, WriterBuilder};
use tracing::info;
use vsearch_core::{LOG_HEADER, TrialOutcome};

use crate::config::delimiter_byte;
use crate::error::{ExperimentError, Result};

/// Completed trials of the current session, in completion order.
#[derive(Debug, Clone, PartialEq)]
pub struct LogStore {
    records: Vec<TrialOutcome>,
    delimiter: char,
}

impl LogStore {
    pub fn new(delimiter: char) -> Self {
        Self {
            records: Vec::new(),
            delimiter,
        }
    }

    /// Drops all records; the header is fixed.
    pub fn reset(&mut self) {
        self.records.clear();
    }

    pub fn push(&mut self, outcome: TrialOutcome) {
        self.records.push(outcome);
    }

    pub fn records(&self) -> &[TrialOutcome] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Writes the header and every record, one CRLF-terminated line each.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv = WriterBuilder::new()
            .delimiter(delimiter_byte(self.delimiter)?)
            .terminator(Terminator::CRLF)
            .from_writer(writer);

        csv.write_record(LOG_HEADER)?;
        for outcome in &self.records {
            csv.write_record(outcome.to_record())?;
        }
        csv.flush()?;
        Ok(())
    }

    pub fn to_delimited(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Writes the log into `dir` and returns the file path.
    pub fn export(&self, dir: &Path, participant: &str, unix_millis: i64) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(export_file_name(participant, unix_millis));
        let file = File::create(&path).map_err(|source| ExperimentError::Open {
            path: path.clone(),
            source,
        })?;
        self.write_to(file)?;
        info!(path = %path.display(), records = self.records.len(), "Log exported");
        Ok(path)
    }
}

impl Default for LogStore {
    fn default() -> Self {
        Self::new(',')
    }
}

pub fn export_file_name(participant: &str, unix_millis: i64) -> String {
    format!("logs_{participant}_{unix_millis}.csv")
}
