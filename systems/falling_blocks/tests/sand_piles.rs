use std::collections::BTreeMap;

use orbitile_core::{IVec2, RectI};
use orbitile_system_falling_blocks::{
    FallingBlockType, FallingBlocksAgent, FallingBlocksConfig, FallingBlocksFacade,
};
use proptest::prelude::*;

const WIDTH: i32 = 24;

/// Walled box with an immovable floor at y = -1.
#[derive(Clone, Debug, Default, PartialEq)]
struct SandBox {
    blocks: BTreeMap<(i32, i32), FallingBlockType>,
    moves: usize,
}

impl SandBox {
    fn with_column(x: i32, height: i32, kind: FallingBlockType) -> Self {
        let mut sand = Self::default();
        for y in 0..height {
            let _ = sand.blocks.insert((x, y + 10), kind);
        }
        sand
    }

    fn count(&self, kind: FallingBlockType) -> usize {
        self.blocks.values().filter(|block| **block == kind).count()
    }
}

impl FallingBlocksFacade for SandBox {
    fn block_type(&self, pos: IVec2) -> FallingBlockType {
        if pos.y < 0 || pos.x < 0 || pos.x >= WIDTH {
            return FallingBlockType::Immovable;
        }
        self.blocks
            .get(&(pos.x, pos.y))
            .copied()
            .unwrap_or(FallingBlockType::Open)
    }

    fn move_block(&mut self, from: IVec2, to: IVec2) {
        assert_eq!(self.block_type(to), FallingBlockType::Open, "moved into a full cell");
        if let Some(kind) = self.blocks.remove(&(from.x, from.y)) {
            let _ = self.blocks.insert((to.x, to.y), kind);
            self.moves += 1;
        }
    }
}

fn settle(sand: SandBox, config: FallingBlocksConfig, seed: u64) -> SandBox {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut agent = FallingBlocksAgent::new(sand, config, seed);
    agent.visit_region(RectI::new(0, 0, WIDTH, 64));
    for _ in 0..5_000 {
        if agent.update() == 0 && agent.pending().is_empty() {
            break;
        }
    }
    assert!(agent.pending().is_empty(), "pile did not settle");
    agent.into_facade()
}

fn is_stable(sand: &SandBox) -> bool {
    sand.blocks.iter().all(|(&(x, y), kind)| {
        if *kind == FallingBlockType::Immovable {
            return true;
        }
        let pos = IVec2::new(x, y);
        let below = sand.block_type(pos + IVec2::new(0, -1)) != FallingBlockType::Open;
        let slides = *kind == FallingBlockType::Cascading
            && [-1, 1].iter().any(|dx| {
                sand.block_type(pos + IVec2::new(*dx, 0)) == FallingBlockType::Open
                    && sand.block_type(pos + IVec2::new(*dx, -1)) == FallingBlockType::Open
            });
        below && !slides
    })
}

#[test]
fn gravel_column_lands_without_spreading() {
    let settled = settle(
        SandBox::with_column(5, 6, FallingBlockType::Falling),
        FallingBlocksConfig::default(),
        11,
    );
    let cells: Vec<_> = settled.blocks.keys().copied().collect();
    assert_eq!(cells, (0..6).map(|y| (5, y)).collect::<Vec<_>>());
}

#[test]
fn sand_column_spreads_into_a_stable_pile() {
    let settled = settle(
        SandBox::with_column(12, 9, FallingBlockType::Cascading),
        FallingBlocksConfig::default(),
        4,
    );
    assert_eq!(settled.count(FallingBlockType::Cascading), 9);
    assert!(is_stable(&settled));
    let height = settled.blocks.keys().map(|(_, y)| *y).max().unwrap_or(0);
    assert!(height < 8, "pile did not spread: height {height}");
}

#[test]
fn same_seed_builds_the_same_pile() {
    let build = |seed| {
        settle(
            SandBox::with_column(12, 12, FallingBlockType::Cascading),
            FallingBlocksConfig::default(),
            seed,
        )
    };
    assert_eq!(build(99), build(99));
}

#[test]
fn steeper_slope_setting_keeps_taller_piles() {
    let column = SandBox::with_column(12, 12, FallingBlockType::Cascading);
    let shallow = settle(column.clone(), FallingBlocksConfig::default(), 8);
    let steep = settle(
        column,
        FallingBlocksConfig {
            cascade_slope: 3,
            ..FallingBlocksConfig::default()
        },
        8,
    );
    let top = |sand: &SandBox| sand.blocks.keys().map(|(_, y)| *y).max().unwrap_or(0);
    assert!(top(&steep) >= top(&shallow));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn blocks_are_conserved_and_come_to_rest(
        seed in any::<u64>(),
        probability in 0.0_f32..=1.0,
        cells in prop::collection::btree_map(
            (0..WIDTH, 0_i32..20),
            prop_oneof![
                Just(FallingBlockType::Falling),
                Just(FallingBlockType::Cascading),
                Just(FallingBlockType::Immovable),
            ],
            0..60,
        ),
    ) {
        let sand = SandBox { blocks: cells, moves: 0 };
        let config = FallingBlocksConfig {
            immediate_upward_propagate_probability: probability,
            ..FallingBlocksConfig::default()
        };
        let before = sand.blocks.clone();
        let settled = settle(sand, config, seed);
        for kind in [FallingBlockType::Falling, FallingBlockType::Cascading, FallingBlockType::Immovable] {
            prop_assert_eq!(
                settled.count(kind),
                before.values().filter(|block| **block == kind).count()
            );
        }
        for (cell, kind) in &before {
            if *kind == FallingBlockType::Immovable {
                prop_assert_eq!(settled.blocks.get(cell), Some(kind));
            }
        }
        prop_assert!(is_stable(&settled));
    }
}
