use serde::{Deserialize, Serialize};

/// Visual parameters of one shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Appearance {
    /// Diameter in pixels.
    pub size: f32,
    pub opacity: f32,
}

/// Grid cell center, relative to the grid origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacedShape {
    pub position: GridPosition,
    pub appearance: Appearance,
}

/// Shapes of a single attempt, in grid order, with exactly one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StimulusLayout {
    pub shapes: Vec<PlacedShape>,
    pub target_index: usize,
    pub grid_side: usize,
    pub cell_size: f32,
}

impl StimulusLayout {
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn target(&self) -> &PlacedShape {
        &self.shapes[self.target_index]
    }

    pub fn distractors(&self) -> impl Iterator<Item = &PlacedShape> {
        self.shapes
            .iter()
            .enumerate()
            .filter(move |(i, _)| *i != self.target_index)
            .map(|(_, shape)| shape)
    }

    /// Distance between the first and last cell centers along one axis.
    pub fn extent(&self) -> f32 {
        self.grid_side.saturating_sub(1) as f32 * self.cell_size
    }
}
