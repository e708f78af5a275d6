/// Session states and the input each one accepts.
///
/// `Idle` is the state before a session starts (no trial on screen).
/// `Finished` is terminal for the session: only a new start leaves it.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default)]
pub enum ExperimentState {
    #[default]
    Idle,
    Instructions,
    Shapes,
    Placeholders,
    Finished,
}

impl ExperimentState {
    /// Whether `self -> next` is an allowed in-session transition.
    ///
    /// A new session always opens on instructions, so `Idle` never goes
    /// straight to `Shapes`.
    pub fn can_transition_to(self, next: ExperimentState) -> bool {
        use ExperimentState::*;
        matches!(
            (self, next),
            (Idle, Instructions)
                | (Idle, Finished)
                | (Instructions, Shapes)
                | (Shapes, Placeholders)
                | (Placeholders, Shapes)
                | (Placeholders, Instructions)
                | (Placeholders, Finished)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ExperimentState::Finished)
    }

    pub fn shows_stimulus(self) -> bool {
        matches!(self, ExperimentState::Shapes)
    }

    pub fn accepts_clicks(self) -> bool {
        matches!(self, ExperimentState::Placeholders)
    }

    pub fn is_running(self) -> bool {
        !matches!(self, ExperimentState::Idle | ExperimentState::Finished)
    }
}
