use vsearch_core::ExperimentState;

use crate::state::ExperimentEvent;

/// What an input means in the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Out-of-order input; leave everything as it is.
    Ignore,
    AcknowledgeInstructions,
    RevealPlaceholders,
    Succeed { response_time_ms: u64 },
    Fail,
}

/// Maps an input event to a decision.
///
/// `shapes_shown_at` is when the current attempt's shapes appeared and `now`
/// the time of the input, both from the same timer. Response time spans
/// the search and the placeholder click.
pub fn evaluate(
    state: ExperimentState,
    event: ExperimentEvent,
    target_index: Option<usize>,
    shapes_shown_at: u64,
    now: u64,
) -> Decision {
    match (state, event) {
        (ExperimentState::Instructions, ExperimentEvent::EnterPressed) => {
            Decision::AcknowledgeInstructions
        }
        (ExperimentState::Shapes, ExperimentEvent::SpacePressed) => Decision::RevealPlaceholders,
        (ExperimentState::Placeholders, ExperimentEvent::PlaceholderClicked(clicked)) => {
            match target_index {
                Some(target) if target == clicked => Decision::Succeed {
                    response_time_ms: now.saturating_sub(shapes_shown_at),
                },
                Some(_) => Decision::Fail,
                None => Decision::Ignore,
            }
        }
        _ => Decision::Ignore,
    }
}
