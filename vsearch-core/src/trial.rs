use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Column names of the exported log, in export order.
pub const LOG_HEADER: [&str; 9] = [
    "DesignName",
    "ParticipantID",
    "TrialID",
    "Block1",
    "Block2",
    "DT",
    "OC",
    "visualSearchTime",
    "ErrorCount",
];

/// Categorical trial density from the design's `OC` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectCount {
    Low,
    Medium,
    High,
}

impl ObjectCount {
    /// Number of shapes drawn for this density.
    pub fn count(self) -> usize {
        match self {
            ObjectCount::Low => 9,
            ObjectCount::Medium => 25,
            ObjectCount::High => 49,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ObjectCount::Low => "Low",
            ObjectCount::Medium => "Medium",
            ObjectCount::High => "High",
        }
    }
}

impl fmt::Display for ObjectCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown object count `{0}` (expected Low, Medium or High)")]
pub struct ParseObjectCountError(pub String);

impl FromStr for ObjectCount {
    type Err = ParseObjectCountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Low" => Ok(ObjectCount::Low),
            "Medium" => Ok(ObjectCount::Medium),
            "High" => Ok(ObjectCount::High),
            other => Err(ParseObjectCountError(other.to_string())),
        }
    }
}

/// The `DT` column: which visual dimensions single out the target.
///
/// The raw text is kept as-is for logging; the active dimensions are the
/// `Size` and `Opacity` tokens it contains, so `"SizeOpacity"` varies both
/// and an empty string varies neither.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DifferenceType(String);

impl DifferenceType {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn varies_size(&self) -> bool {
        self.0.contains("Size")
    }

    pub fn varies_opacity(&self) -> bool {
        self.0.contains("Opacity")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DifferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One line of the design table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialRow {
    pub design_name: String,
    pub participant_id: String,
    pub practice: String,
    pub trial_id: String,
    pub block1: u32,
    pub block2: u32,
    pub difference_type: DifferenceType,
    pub object_count: ObjectCount,
}

impl TrialRow {
    pub fn set_key(&self) -> SetKey {
        SetKey {
            block1: self.block1,
            block2: self.block2,
            difference_type: self.difference_type.clone(),
            object_count: self.object_count,
        }
    }

    pub fn parameters(&self) -> TrialParameters {
        TrialParameters {
            difference_type: self.difference_type.clone(),
            object_count: self.object_count,
        }
    }
}

/// Identifies a run of consecutive rows that share one instructions screen.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SetKey {
    pub block1: u32,
    pub block2: u32,
    pub difference_type: DifferenceType,
    pub object_count: ObjectCount,
}

/// Stimulus inputs cached for the current set and reused on retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialParameters {
    pub difference_type: DifferenceType,
    pub object_count: ObjectCount,
}

/// Recorded result of a completed trial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialOutcome {
    pub design_name: String,
    pub participant_id: String,
    pub trial_id: String,
    pub block1: u32,
    pub block2: u32,
    pub difference_type: DifferenceType,
    pub object_count: ObjectCount,
    pub response_time_ms: u64,
    pub error_count: u32,
}

impl TrialOutcome {
    pub fn from_row(row: &TrialRow, response_time_ms: u64, error_count: u32) -> Self {
        Self {
            design_name: row.design_name.clone(),
            participant_id: row.participant_id.clone(),
            trial_id: row.trial_id.clone(),
            block1: row.block1,
            block2: row.block2,
            difference_type: row.difference_type.clone(),
            object_count: row.object_count,
            response_time_ms,
            error_count,
        }
    }

    /// Field values in [`LOG_HEADER`] order.
    pub fn to_record(&self) -> [String; 9] {
        [
            self.design_name.clone(),
            self.participant_id.clone(),
            self.trial_id.clone(),
            self.block1.to_string(),
            self.block2.to_string(),
            self.difference_type.to_string(),
            self.object_count.to_string(),
            self.response_time_ms.to_string(),
            self.error_count.to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(dt: &str, oc: ObjectCount) -> TrialRow {
        TrialRow {
            design_name: "VS".into(),
            participant_id: "P1".into(),
            practice: "false".into(),
            trial_id: "7".into(),
            block1: 1,
            block2: 2,
            difference_type: DifferenceType::new(dt),
            object_count: oc,
        }
    }

    #[test]
    fn object_count_maps_to_perfect_squares() {
        assert_eq!(ObjectCount::Low.count(), 9);
        assert_eq!(ObjectCount::Medium.count(), 25);
        assert_eq!(ObjectCount::High.count(), 49);
    }

    #[test]
    fn object_count_parse_rejects_unknown_values() {
        assert_eq!(" Medium ".parse::<ObjectCount>(), Ok(ObjectCount::Medium));
        assert!("Huge".parse::<ObjectCount>().is_err());
        assert!("low".parse::<ObjectCount>().is_err());
    }

    #[test]
    fn difference_type_tokens_compose() {
        let both = DifferenceType::new("SizeOpacity");
        assert!(both.varies_size() && both.varies_opacity());

        let none = DifferenceType::new("None");
        assert!(!none.varies_size() && !none.varies_opacity());

        assert!(DifferenceType::new("Opacity").varies_opacity());
        assert!(!DifferenceType::new("Opacity").varies_size());
    }

    #[test]
    fn set_key_differs_on_any_component() {
        let a = row("Size", ObjectCount::Low);
        let b = row("Size", ObjectCount::High);
        let mut c = row("Size", ObjectCount::Low);
        c.block2 = 3;

        assert_eq!(a.set_key(), row("Size", ObjectCount::Low).set_key());
        assert_ne!(a.set_key(), b.set_key());
        assert_ne!(a.set_key(), c.set_key());
    }

    #[test]
    fn outcome_record_follows_header_order() {
        let outcome = TrialOutcome::from_row(&row("Size", ObjectCount::Medium), 812, 2);
        assert_eq!(
            outcome.to_record(),
            ["VS", "P1", "7", "1", "2", "Size", "Medium", "812", "2"].map(String::from)
        );
        assert_eq!(LOG_HEADER.len(), outcome.to_record().len());
    }

    #[test]
    fn outcome_serializes_with_enum_names() {
        let outcome = TrialOutcome::from_row(&row("Opacity", ObjectCount::High), 10, 0);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["object_count"], "High");
        assert_eq!(json["difference_type"], "Opacity");
    }
}
