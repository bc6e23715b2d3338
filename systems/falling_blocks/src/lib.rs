#![deny(unsafe_code, non_snake_case)]
#![warn(missing_docs, dead_code, unused_results, unreachable_pub)]

//! Gravity for loose blocks such as sand and gravel.
//!
//! The agent never reads tiles itself. A [`FallingBlocksFacade`] classifies
//! positions and performs moves, and the agent keeps the set of positions
//! that may need to move on the next update. Positive y points up.

use std::collections::BTreeSet;

use orbitile_core::{IVec2, RectI, RandomSource};
use serde::{Deserialize, Serialize};

/// How a position behaves under gravity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FallingBlockType {
    /// Never moves and supports what rests on it.
    Immovable,
    /// Falls straight down into open space.
    Falling,
    /// Falls straight down, and slides off piles diagonally.
    Cascading,
    /// Empty; blocks can move in.
    Open,
}

/// World access used by [`FallingBlocksAgent`].
pub trait FallingBlocksFacade {
    /// Classifies the block at `pos`.
    fn block_type(&self, pos: IVec2) -> FallingBlockType;

    /// Moves the block at `from` into the open position `to`.
    fn move_block(&mut self, from: IVec2, to: IVec2);
}

/// Tuning of [`FallingBlocksAgent`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FallingBlocksConfig {
    /// Chance that the block above a moved block is handled in the same
    /// update instead of the next one.
    pub immediate_upward_propagate_probability: f32,
    /// Open cells a cascading block needs below its side before it slides.
    pub cascade_slope: u32,
}

impl Default for FallingBlocksConfig {
    fn default() -> Self {
        Self {
            immediate_upward_propagate_probability: 0.5,
            cascade_slope: 1,
        }
    }
}

const DOWN: IVec2 = IVec2::new(0, -1);
const UP: IVec2 = IVec2::new(0, 1);
const LEFT: IVec2 = IVec2::new(-1, 0);
const RIGHT: IVec2 = IVec2::new(1, 0);

// Ordered bottom-up, then left to right.
fn order_key(pos: IVec2) -> (i32, i32) {
    (pos.y, pos.x)
}

fn from_key((y, x): (i32, i32)) -> IVec2 {
    IVec2::new(x, y)
}

/// Moves loose blocks one step per update.
pub struct FallingBlocksAgent<F> {
    facade: F,
    config: FallingBlocksConfig,
    random: RandomSource,
    pending: BTreeSet<(i32, i32)>,
}

impl<F: FallingBlocksFacade> FallingBlocksAgent<F> {
    /// Creates an agent with nothing pending.
    #[must_use]
    pub fn new(facade: F, config: FallingBlocksConfig, seed: u64) -> Self {
        Self {
            facade,
            config,
            random: RandomSource::new(seed),
            pending: BTreeSet::new(),
        }
    }

    /// The wrapped world access.
    #[must_use]
    pub fn facade(&self) -> &F {
        &self.facade
    }

    /// Mutable world access, e.g. to edit tiles before visiting them.
    pub fn facade_mut(&mut self) -> &mut F {
        &mut self.facade
    }

    /// Unwraps the world access.
    #[must_use]
    pub fn into_facade(self) -> F {
        self.facade
    }

    /// Schedules `pos` for the next update.
    pub fn visit_location(&mut self, pos: IVec2) {
        let _ = self.pending.insert(order_key(pos));
    }

    /// Schedules every cell of `rect` for the next update.
    pub fn visit_region(&mut self, rect: RectI) {
        for y in rect.min().y..rect.max().y {
            for x in rect.min().x..rect.max().x {
                self.visit_location(IVec2::new(x, y));
            }
        }
    }

    /// Positions scheduled for the next update, bottom-up.
    #[must_use]
    pub fn pending(&self) -> Vec<IVec2> {
        self.pending.iter().copied().map(from_key).collect()
    }

    /// Processes every scheduled position once and returns the number of
    /// blocks moved.
    pub fn update(&mut self) -> usize {
        let mut working = std::mem::take(&mut self.pending);
        let mut moves = 0;
        while let Some(key) = working.pop_first() {
            let pos = from_key(key);
            let Some(target) = self.destination(pos) else {
                continue;
            };
            self.facade.move_block(pos, target);
            moves += 1;

            let _ = self.pending.insert(order_key(target));
            for offset in [LEFT, RIGHT, UP + LEFT, UP + RIGHT] {
                let _ = self.pending.insert(order_key(pos + offset));
            }
            let above = order_key(pos + UP);
            if self
                .random
                .bernoulli(self.config.immediate_upward_propagate_probability)
            {
                let _ = working.insert(above);
            } else {
                let _ = self.pending.insert(above);
            }
        }
        if moves > 0 {
            log::trace!("moved {moves} falling block(s), {} pending", self.pending.len());
        }
        moves
    }

    fn destination(&mut self, pos: IVec2) -> Option<IVec2> {
        let kind = self.facade.block_type(pos);
        if !matches!(kind, FallingBlockType::Falling | FallingBlockType::Cascading) {
            return None;
        }
        let below = pos + DOWN;
        if self.facade.block_type(below) == FallingBlockType::Open {
            return Some(below);
        }
        if kind != FallingBlockType::Cascading {
            return None;
        }
        let left = self.can_slide(pos, LEFT);
        let right = self.can_slide(pos, RIGHT);
        let side = match (left, right) {
            (true, true) => {
                if self.random.bernoulli(0.5) {
                    LEFT
                } else {
                    RIGHT
                }
            }
            (true, false) => LEFT,
            (false, true) => RIGHT,
            (false, false) => return None,
        };
        Some(pos + side + DOWN)
    }

    // The side cell must be open, followed by `cascade_slope` open cells
    // going down from the diagonal.
    fn can_slide(&self, pos: IVec2, side: IVec2) -> bool {
        if self.facade.block_type(pos + side) != FallingBlockType::Open {
            return false;
        }
        (1..=self.config.cascade_slope.max(1) as i32).all(|depth| {
            self.facade.block_type(pos + side + DOWN * depth) == FallingBlockType::Open
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[derive(Default)]
    struct Column {
        blocks: HashMap<IVec2, FallingBlockType>,
    }

    impl FallingBlocksFacade for Column {
        fn block_type(&self, pos: IVec2) -> FallingBlockType {
            if pos.y < 0 {
                return FallingBlockType::Immovable;
            }
            self.blocks
                .get(&pos)
                .copied()
                .unwrap_or(FallingBlockType::Open)
        }

        fn move_block(&mut self, from: IVec2, to: IVec2) {
            if let Some(kind) = self.blocks.remove(&from) {
                let _ = self.blocks.insert(to, kind);
            }
        }
    }

    #[test]
    fn stack_falls_together_when_propagation_is_immediate() {
        let mut column = Column::default();
        for y in 3..6 {
            let _ = column.blocks.insert(IVec2::new(0, y), FallingBlockType::Falling);
        }
        let config = FallingBlocksConfig {
            immediate_upward_propagate_probability: 1.0,
            ..FallingBlocksConfig::default()
        };
        let mut agent = FallingBlocksAgent::new(column, config, 1);
        agent.visit_location(IVec2::new(0, 3));
        assert_eq!(agent.update(), 3);
        let column = agent.into_facade();
        for y in 2..5 {
            assert_eq!(column.block_type(IVec2::new(0, y)), FallingBlockType::Falling);
        }
        assert_eq!(column.block_type(IVec2::new(0, 5)), FallingBlockType::Open);
    }

    #[test]
    fn deferred_propagation_moves_one_block_per_update() {
        let mut column = Column::default();
        for y in 3..5 {
            let _ = column.blocks.insert(IVec2::new(0, y), FallingBlockType::Falling);
        }
        let config = FallingBlocksConfig {
            immediate_upward_propagate_probability: 0.0,
            ..FallingBlocksConfig::default()
        };
        let mut agent = FallingBlocksAgent::new(column, config, 1);
        agent.visit_location(IVec2::new(0, 3));
        assert_eq!(agent.update(), 1);
        assert!(agent.pending().contains(&IVec2::new(0, 4)));
        assert!(agent.pending().contains(&IVec2::new(0, 2)));
        assert_eq!(agent.update(), 2);
    }

    #[test]
    fn falling_blocks_do_not_slide() {
        let mut column = Column::default();
        let _ = column.blocks.insert(IVec2::new(0, 0), FallingBlockType::Immovable);
        let _ = column.blocks.insert(IVec2::new(0, 1), FallingBlockType::Falling);
        let mut agent = FallingBlocksAgent::new(column, FallingBlocksConfig::default(), 3);
        agent.visit_location(IVec2::new(0, 1));
        assert_eq!(agent.update(), 0);
        assert!(agent.pending().is_empty());
    }

    #[test]
    fn config_reads_camel_case_with_defaults() {
        let config: FallingBlocksConfig =
            serde_json::from_str(r#"{ "cascadeSlope": 3 }"#).expect("config parses");
        assert_eq!(config.cascade_slope, 3);
        assert!((config.immediate_upward_propagate_probability - 0.5).abs() < f32::EPSILON);
    }
}
