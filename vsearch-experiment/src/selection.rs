use crate::table::TrialTable;

/// Choices offered at each level of the start selection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionOptions {
    pub participants: Vec<String>,
    pub blocks: Vec<u32>,
    pub trials: Vec<u32>,
}

/// Participant → block → trial choice for where a session starts.
///
/// Picking a level reseeds every level below it with its first option.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StartSelection {
    participant: Option<String>,
    block: Option<u32>,
    trial: Option<u32>,
}

impl StartSelection {
    /// Seeds every level with the table's first options.
    pub fn new(table: &TrialTable) -> Self {
        let mut selection = Self::default();
        if let Some(first) = table.participants().first() {
            let first = first.to_string();
            selection.select_participant(table, &first);
        }
        selection
    }

    /// Returns false (and changes nothing) for an unknown participant.
    pub fn select_participant(&mut self, table: &TrialTable, participant: &str) -> bool {
        if !table.participants().contains(&participant) {
            return false;
        }
        self.participant = Some(participant.to_string());
        self.block = None;
        self.trial = None;
        if let Some(&block) = table.blocks(participant).first() {
            self.select_block(table, block);
        }
        true
    }

    pub fn select_block(&mut self, table: &TrialTable, block: u32) -> bool {
        let Some(participant) = self.participant.as_deref() else {
            return false;
        };
        if !table.blocks(participant).contains(&block) {
            return false;
        }
        self.trial = table.trials(participant, block).first().copied();
        self.block = Some(block);
        true
    }

    pub fn select_trial(&mut self, table: &TrialTable, trial: u32) -> bool {
        let (Some(participant), Some(block)) = (self.participant.as_deref(), self.block) else {
            return false;
        };
        if !table.trials(participant, block).contains(&trial) {
            return false;
        }
        self.trial = Some(trial);
        true
    }

    pub fn participant(&self) -> Option<&str> {
        self.participant.as_deref()
    }

    pub fn block(&self) -> Option<u32> {
        self.block
    }

    pub fn trial(&self) -> Option<u32> {
        self.trial
    }

    /// The full `(participant, block, trial)` choice once every level is set.
    pub fn choice(&self) -> Option<(&str, u32, u32)> {
        Some((self.participant.as_deref()?, self.block?, self.trial?))
    }

    pub fn options(&self, table: &TrialTable) -> SelectionOptions {
        let participants = table
            .participants()
            .into_iter()
            .map(str::to_string)
            .collect();
        let blocks = self
            .participant
            .as_deref()
            .map(|p| table.blocks(p))
            .unwrap_or_default();
        let trials = match (self.participant.as_deref(), self.block) {
            (Some(p), Some(b)) => table.trials(p, b),
            _ => Vec::new(),
        };
        SelectionOptions {
            participants,
            blocks,
            trials,
        }
    }
}
