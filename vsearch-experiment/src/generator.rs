use rand::Rng;
use vsearch_core::{Appearance, GridPosition, PlacedShape, StimulusLayout, TrialParameters};

use crate::config::StimulusConfig;

/// Randomness consumed by stimulus generation.
pub trait RandomSource {
    /// Uniform value in `[0, 1)`.
    fn unit(&mut self) -> f64;

    /// Uniform index in `[0, bound)`. `bound` is never zero.
    fn below(&mut self, bound: usize) -> usize;
}

/// Adapts any `rand` generator.
#[derive(Debug, Clone)]
pub struct RngSource<R: Rng>(pub R);

impl<R: Rng> RandomSource for RngSource<R> {
    fn unit(&mut self) -> f64 {
        self.0.random::<f64>()
    }

    fn below(&mut self, bound: usize) -> usize {
        self.0.random_range(0..bound)
    }
}

/// Replays fixed draws in a loop, for reproducible layouts.
#[derive(Debug, Clone)]
pub struct SequenceSource {
    units: Vec<f64>,
    indices: Vec<usize>,
    next_unit: usize,
    next_index: usize,
}

impl SequenceSource {
    pub fn new(units: Vec<f64>, indices: Vec<usize>) -> Self {
        Self {
            units,
            indices,
            next_unit: 0,
            next_index: 0,
        }
    }
}

impl RandomSource for SequenceSource {
    fn unit(&mut self) -> f64 {
        if self.units.is_empty() {
            return 0.0;
        }
        let value = self.units[self.next_unit % self.units.len()];
        self.next_unit += 1;
        value
    }

    fn below(&mut self, bound: usize) -> usize {
        if self.indices.is_empty() {
            return 0;
        }
        let value = self.indices[self.next_index % self.indices.len()];
        self.next_index += 1;
        value % bound
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extreme {
    Large,
    Small,
}

impl Extreme {
    fn opposite(self) -> Self {
        match self {
            Extreme::Large => Extreme::Small,
            Extreme::Small => Extreme::Large,
        }
    }
}

/// Builds the grid of shapes for one attempt.
#[derive(Debug, Clone, Default)]
pub struct StimulusGenerator {
    config: StimulusConfig,
}

impl StimulusGenerator {
    pub fn new(config: StimulusConfig) -> Self {
        Self { config }
    }

    pub fn generate<R: RandomSource + ?Sized>(
        &self,
        params: &TrialParameters,
        rng: &mut R,
    ) -> StimulusLayout {
        let count = params.object_count.count();
        let varies_size = params.difference_type.varies_size();
        let varies_opacity = params.difference_type.varies_opacity();

        // Both draws happen even when a dimension is inactive.
        let size_extreme = self.pick_extreme(rng.unit());
        let opacity_extreme = self.pick_extreme(rng.unit());

        let target = Appearance {
            size: self.size_for(varies_size.then_some(size_extreme)),
            opacity: self.opacity_for(varies_opacity.then_some(opacity_extreme)),
        };
        let distractor = Appearance {
            size: self.size_for(varies_size.then_some(size_extreme.opposite())),
            opacity: self.opacity_for(varies_opacity.then_some(opacity_extreme.opposite())),
        };

        let mut appearances = vec![distractor; count - 1];
        shuffle(&mut appearances, rng);
        let target_index = rng.below(count);
        appearances.insert(target_index, target);

        let (grid_side, positions) = grid_positions(count, self.config.cell_size);
        let shapes = positions
            .into_iter()
            .zip(appearances)
            .map(|(position, appearance)| PlacedShape {
                position,
                appearance,
            })
            .collect();

        StimulusLayout {
            shapes,
            target_index,
            grid_side,
            cell_size: self.config.cell_size,
        }
    }

    fn pick_extreme(&self, draw: f64) -> Extreme {
        if draw > self.config.extreme_threshold {
            Extreme::Large
        } else {
            Extreme::Small
        }
    }

    fn size_for(&self, extreme: Option<Extreme>) -> f32 {
        self.config.base_size * self.factor(extreme)
    }

    fn opacity_for(&self, extreme: Option<Extreme>) -> f32 {
        self.config.base_opacity * self.factor(extreme)
    }

    fn factor(&self, extreme: Option<Extreme>) -> f32 {
        match extreme {
            Some(Extreme::Large) => self.config.large_factor,
            Some(Extreme::Small) => self.config.small_factor,
            None => 1.0,
        }
    }
}

/// Fisher–Yates shuffle driven by `rng`.
pub fn shuffle<T, R: RandomSource + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.below(i + 1);
        items.swap(i, j);
    }
}

/// Row-major cell centers of a square grid holding `count` cells.
pub fn grid_positions(count: usize, cell_size: f32) -> (usize, Vec<GridPosition>) {
    let side = (count as f64).sqrt().ceil() as usize;
    let positions = (0..count)
        .map(|i| GridPosition {
            x: (i % side) as f32 * cell_size,
            y: (i / side) as f32 * cell_size,
        })
        .collect();
    (side, positions)
}
