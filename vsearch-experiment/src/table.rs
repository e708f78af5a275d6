use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, info};
use vsearch_core::{DifferenceType, ObjectCount, TrialRow};

use crate::config::{ColumnNames, DesignConfig, delimiter_byte};
use crate::error::{ExperimentError, Result};

/// The design table, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrialTable {
    rows: Vec<TrialRow>,
}

struct ColumnIndex {
    participant: usize,
    practice: usize,
    block1: usize,
    block2: usize,
    difference_type: usize,
    object_count: usize,
    design_name: usize,
    trial_id: usize,
}

impl ColumnIndex {
    fn resolve(headers: &StringRecord, names: &ColumnNames) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}') == name)
                .ok_or_else(|| ExperimentError::MissingColumn(name.to_string()))
        };
        Ok(Self {
            participant: find(&names.participant)?,
            practice: find(&names.practice)?,
            block1: find(&names.block1)?,
            block2: find(&names.block2)?,
            difference_type: find(&names.difference_type)?,
            object_count: find(&names.object_count)?,
            design_name: find(&names.design_name)?,
            trial_id: find(&names.trial_id)?,
        })
    }
}

impl TrialTable {
    pub fn new(rows: Vec<TrialRow>) -> Self {
        Self { rows }
    }

    pub fn from_path(path: &Path, design: &DesignConfig) -> Result<Self> {
        let file = File::open(path).map_err(|source| ExperimentError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_reader(file, design)?;
        info!(path = %path.display(), rows = table.len(), "Design loaded");
        Ok(table)
    }

    pub fn from_reader<R: Read>(reader: R, design: &DesignConfig) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter_byte(design.delimiter)?)
            .trim(Trim::All)
            .from_reader(reader);

        let columns = ColumnIndex::resolve(reader.headers()?, &design.columns)?;
        let names = &design.columns;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let line = record.position().map_or(0, |p| p.line());
            let field = |index: usize| record.get(index).unwrap_or("");

            let number = |index: usize, column: &str| {
                let raw = field(index);
                raw.parse::<u32>()
                    .map_err(|_| ExperimentError::InvalidField {
                        line,
                        column: column.to_string(),
                        value: raw.to_string(),
                    })
            };

            let object_count = field(columns.object_count)
                .parse::<ObjectCount>()
                .map_err(|e| ExperimentError::InvalidField {
                    line,
                    column: names.object_count.clone(),
                    value: e.0,
                })?;

            rows.push(TrialRow {
                design_name: field(columns.design_name).to_string(),
                participant_id: field(columns.participant).to_string(),
                practice: field(columns.practice).to_string(),
                trial_id: field(columns.trial_id).to_string(),
                block1: number(columns.block1, &names.block1)?,
                block2: number(columns.block2, &names.block2)?,
                difference_type: DifferenceType::new(field(columns.difference_type)),
                object_count,
            });
        }

        if rows.is_empty() {
            return Err(ExperimentError::EmptyDesign);
        }
        debug!(rows = rows.len(), "Parsed design rows");
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[TrialRow] {
        &self.rows
    }

    pub fn get(&self, index: usize) -> Option<&TrialRow> {
        self.rows.get(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the first row for `participant` with the given `Block1` and
    /// `Block2` values.
    pub fn find_start(&self, participant: &str, block: u32, trial: u32) -> Option<usize> {
        self.rows.iter().position(|row| {
            row.participant_id == participant && row.block1 == block && row.block2 == trial
        })
    }

    /// Participant ids in order of first appearance.
    pub fn participants(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for row in &self.rows {
            if !out.contains(&row.participant_id.as_str()) {
                out.push(&row.participant_id);
            }
        }
        out
    }

    /// `Block1` values for a participant in order of first appearance.
    pub fn blocks(&self, participant: &str) -> Vec<u32> {
        let mut out = Vec::new();
        for row in self.rows_for(participant) {
            if !out.contains(&row.block1) {
                out.push(row.block1);
            }
        }
        out
    }

    /// `Block2` values within one block, in order of first appearance.
    pub fn trials(&self, participant: &str, block: u32) -> Vec<u32> {
        let mut out = Vec::new();
        for row in self.rows_for(participant).filter(|row| row.block1 == block) {
            if !out.contains(&row.block2) {
                out.push(row.block2);
            }
        }
        out
    }

    pub fn rows_for<'a>(&'a self, participant: &'a str) -> impl Iterator<Item = &'a TrialRow> {
        self.rows
            .iter()
            .filter(move |row| row.participant_id == participant)
    }
}
