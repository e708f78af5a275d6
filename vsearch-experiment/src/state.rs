use tracing::{debug, info, warn};
use vsearch_core::{
    ExperimentState, SetKey, StimulusLayout, TrialOutcome, TrialParameters, TrialRow,
};
use vsearch_timing::Timer;

use crate::config::ExperimentConfig;
use crate::error::{ExperimentError, Result};
use crate::evaluator::{Decision, evaluate};
use crate::generator::{RandomSource, StimulusGenerator};
use crate::log::LogStore;
use crate::table::TrialTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExperimentEvent {
    EnterPressed,
    SpacePressed,
    PlaceholderClicked(usize),
}

/// Where the cursor landed after moving to the next row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// First row of a new set; instructions come first.
    Instructions,
    /// Same set as the previous row; the stimulus is already up.
    Shapes,
    /// No rows left for this participant.
    Finished,
}

/// Walks the design table for one participant and runs each trial.
pub struct ExperimentStateMachine<T, R>
where
    T: Timer,
    R: RandomSource,
{
    pub timer: T,
    pub rng: R,
    pub config: ExperimentConfig,
    table: TrialTable,
    generator: StimulusGenerator,
    state: ExperimentState,
    participant: String,
    /// Row entered by the next advance.
    next_row: usize,
    current_row: Option<usize>,
    set_key: Option<SetKey>,
    parameters: Option<TrialParameters>,
    layout: Option<StimulusLayout>,
    shapes_shown_at: u64,
    error_count: u32,
    log: LogStore,
}

impl<T, R> ExperimentStateMachine<T, R>
where
    T: Timer,
    R: RandomSource,
{
    pub fn new(table: TrialTable, config: ExperimentConfig, timer: T, rng: R) -> Self {
        Self {
            generator: StimulusGenerator::new(config.stimulus.clone()),
            log: LogStore::new(config.log.delimiter),
            timer,
            rng,
            config,
            table,
            state: ExperimentState::Idle,
            participant: String::new(),
            next_row: 0,
            current_row: None,
            set_key: None,
            parameters: None,
            layout: None,
            shapes_shown_at: 0,
            error_count: 0,
        }
    }

    /// Starts a session at the first row matching the participant, `Block1`
    /// and `Block2` values.
    ///
    /// Fails without touching the current session when no row matches.
    pub fn start(&mut self, participant: &str, block: u32, trial: u32) -> Result<Advance> {
        let Some(index) = self.table.find_start(participant, block, trial) else {
            warn!(participant, block, trial, "No trial matches the start selection");
            return Err(ExperimentError::NoMatchingStartRow {
                participant: participant.to_string(),
                block,
                trial,
            });
        };

        info!(participant, block, trial, row = index, "Starting experiment");
        self.participant = participant.to_string();
        // A reset, not a transition: start is allowed from any state.
        self.state = ExperimentState::Idle;
        self.next_row = index;
        self.current_row = None;
        self.set_key = None;
        self.parameters = None;
        self.layout = None;
        self.error_count = 0;
        self.log.reset();

        Ok(self.advance())
    }

    /// Moves to the next row and shows its instructions or stimulus.
    ///
    /// Rows only change from `Idle` (session start) or `Placeholders`
    /// (trial completed). Anywhere else the current step is returned as is.
    pub fn advance(&mut self) -> Advance {
        match self.state {
            ExperimentState::Idle | ExperimentState::Placeholders => {}
            ExperimentState::Instructions => return Advance::Instructions,
            ExperimentState::Shapes => return Advance::Shapes,
            ExperimentState::Finished => return Advance::Finished,
        }

        let index = self.next_row;
        self.next_row += 1;
        self.layout = None;

        let row = match self.table.get(index) {
            Some(row) if row.participant_id == self.participant => row,
            _ => {
                self.current_row = None;
                self.parameters = None;
                self.transition(ExperimentState::Finished);
                info!(
                    participant = %self.participant,
                    completed = self.log.len(),
                    "Experiment finished for this participant"
                );
                return Advance::Finished;
            }
        };

        self.current_row = Some(index);
        let key = row.set_key();
        let parameters = row.parameters();

        if self.set_key.as_ref() != Some(&key) {
            debug!(row = index, block1 = key.block1, block2 = key.block2, "New set");
            self.set_key = Some(key);
            self.parameters = Some(parameters);
            self.transition(ExperimentState::Instructions);
            Advance::Instructions
        } else {
            self.parameters = Some(parameters);
            self.show_shapes();
            Advance::Shapes
        }
    }

    pub fn acknowledge_instructions(&mut self) -> bool {
        self.state == ExperimentState::Instructions && self.show_shapes()
    }

    pub fn reveal_placeholders(&mut self) -> bool {
        self.state == ExperimentState::Shapes && self.transition(ExperimentState::Placeholders)
    }

    /// Wrong placeholder: count the error and redraw the same trial.
    pub fn fail_attempt(&mut self) -> bool {
        if self.state != ExperimentState::Placeholders {
            return false;
        }
        self.error_count += 1;
        debug!(
            row = ?self.current_row,
            errors = self.error_count,
            "Incorrect selection, restarting trial"
        );
        self.layout = None;
        self.show_shapes()
    }

    /// Right placeholder: log the trial with the session's running error
    /// total and move on.
    pub fn succeed_attempt(&mut self, response_time_ms: u64) -> Option<Advance> {
        if self.state != ExperimentState::Placeholders {
            return None;
        }
        let row = self.current_row()?;
        let outcome = TrialOutcome::from_row(row, response_time_ms, self.error_count);
        info!(
            trial = %outcome.trial_id,
            response_time_ms,
            errors = self.error_count,
            "Trial completed"
        );
        self.log.push(outcome);
        Some(self.advance())
    }

    /// Applies one input event. Returns whether it changed anything.
    pub fn handle_event(&mut self, event: ExperimentEvent) -> bool {
        let decision = evaluate(
            self.state,
            event,
            self.layout.as_ref().map(|l| l.target_index),
            self.shapes_shown_at,
            self.timer.now(),
        );
        match decision {
            Decision::Ignore => false,
            Decision::AcknowledgeInstructions => self.acknowledge_instructions(),
            Decision::RevealPlaceholders => self.reveal_placeholders(),
            Decision::Succeed { response_time_ms } => {
                self.succeed_attempt(response_time_ms).is_some()
            }
            Decision::Fail => self.fail_attempt(),
        }
    }

    /// Checked state change for every move inside a session.
    fn transition(&mut self, next: ExperimentState) -> bool {
        if !self.state.can_transition_to(next) {
            warn!(from = ?self.state, to = ?next, "Rejected state change");
            return false;
        }
        self.state = next;
        true
    }

    fn show_shapes(&mut self) -> bool {
        if !self.transition(ExperimentState::Shapes) {
            return false;
        }
        let Some(parameters) = self.parameters.as_ref() else {
            warn!(row = ?self.current_row, "No trial parameters for the stimulus");
            return false;
        };
        let layout = self.generator.generate(parameters, &mut self.rng);
        debug!(
            objects = layout.len(),
            target = layout.target_index,
            dt = %parameters.difference_type,
            "Display shapes"
        );
        self.layout = Some(layout);
        self.shapes_shown_at = self.timer.now();
        true
    }

    pub fn state(&self) -> ExperimentState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn participant(&self) -> &str {
        &self.participant
    }

    pub fn table(&self) -> &TrialTable {
        &self.table
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_row
    }

    pub fn current_row(&self) -> Option<&TrialRow> {
        self.current_row.and_then(|i| self.table.get(i))
    }

    pub fn parameters(&self) -> Option<&TrialParameters> {
        self.parameters.as_ref()
    }

    pub fn layout(&self) -> Option<&StimulusLayout> {
        self.layout.as_ref()
    }

    /// Errors made so far on the current trial.
    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    pub fn log(&self) -> &LogStore {
        &self.log
    }

    /// 1-based position of the current row among the participant's rows.
    pub fn trial_progress(&self) -> Option<(usize, usize)> {
        let index = self.current_row?;
        let rows = self.table.rows();
        let total = rows
            .iter()
            .filter(|r| r.participant_id == self.participant)
            .count();
        let done = rows[..index]
            .iter()
            .filter(|r| r.participant_id == self.participant)
            .count();
        Some((done + 1, total))
    }
}
