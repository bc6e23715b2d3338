//! Uniform-cell broad-phase index on a horizontally wrapping world.

use std::{
    collections::{BTreeSet, HashMap},
    hash::Hash,
};

use orbitile_core::{IVec2, RectF, WorldGeometry};

/// Default cell side in world units.
pub const DEFAULT_CELL_SIZE: f32 = 16.0;

/// Maps keys to the cells their rectangles overlap.
#[derive(Clone, Debug)]
pub struct SpatialHash<K> {
    geometry: WorldGeometry,
    cell_size: f32,
    cells: HashMap<IVec2, BTreeSet<K>>,
    entries: HashMap<K, Vec<IVec2>>,
}

impl<K: Copy + Eq + Hash + Ord> SpatialHash<K> {
    /// Creates an empty index; non-positive cell sizes fall back to the default.
    #[must_use]
    pub fn new(geometry: WorldGeometry, cell_size: f32) -> Self {
        let cell_size = if cell_size > 0.0 {
            cell_size
        } else {
            DEFAULT_CELL_SIZE
        };
        Self {
            geometry,
            cell_size,
            cells: HashMap::new(),
            entries: HashMap::new(),
        }
    }

    /// Number of indexed keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether no keys are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Indexes `key` under `rect`. Returns true when its cell set changed.
    pub fn set(&mut self, key: K, rect: RectF) -> bool {
        let cells = self.cells_for(rect);
        if self.entries.get(&key) == Some(&cells) {
            return false;
        }
        self.unlink(key);
        for cell in &cells {
            let _ = self.cells.entry(*cell).or_default().insert(key);
        }
        let _ = self.entries.insert(key, cells);
        true
    }

    /// Drops `key` from the index.
    pub fn remove(&mut self, key: K) -> bool {
        let present = self.entries.contains_key(&key);
        self.unlink(key);
        let _ = self.entries.remove(&key);
        present
    }

    /// Keys whose cells overlap `rect`, ascending and without duplicates.
    ///
    /// Cells are coarse, so callers test the returned keys precisely.
    #[must_use]
    pub fn query(&self, rect: RectF) -> Vec<K> {
        let spans = self.cell_spans(rect);
        let mut found = BTreeSet::new();
        if span_cell_count(&spans) > self.cells.len() as u64 {
            // Wider than the occupied set: walk the occupied cells instead.
            for (cell, keys) in &self.cells {
                if spans.iter().any(|(min, max)| span_contains(*min, *max, *cell)) {
                    found.extend(keys.iter().copied());
                }
            }
        } else {
            for (min, max) in spans {
                for y in min.y..=max.y {
                    for x in min.x..=max.x {
                        if let Some(keys) = self.cells.get(&IVec2::new(x, y)) {
                            found.extend(keys.iter().copied());
                        }
                    }
                }
            }
        }
        found.into_iter().collect()
    }

    fn unlink(&mut self, key: K) {
        let Some(old) = self.entries.get(&key) else {
            return;
        };
        for cell in old {
            if let Some(keys) = self.cells.get_mut(cell) {
                let _ = keys.remove(&key);
                if keys.is_empty() {
                    let _ = self.cells.remove(cell);
                }
            }
        }
    }

    fn cells_for(&self, rect: RectF) -> Vec<IVec2> {
        let mut cells = BTreeSet::new();
        for (min, max) in self.cell_spans(rect) {
            for y in min.y..=max.y {
                for x in min.x..=max.x {
                    let _ = cells.insert((y, x));
                }
            }
        }
        cells.into_iter().map(|(y, x)| IVec2::new(x, y)).collect()
    }

    /// Inclusive cell ranges covered by `rect`, with rows clamped to the
    /// world's height.
    fn cell_spans(&self, rect: RectF) -> Vec<(IVec2, IVec2)> {
        let last_row = if self.geometry.height() > 0 {
            ((self.geometry.height() as f32 / self.cell_size).floor() as i32).max(0)
        } else {
            i32::MAX
        };
        let first_row = if self.geometry.height() > 0 { 0 } else { i32::MIN };
        self.geometry
            .split_rect_f(rect)
            .into_iter()
            .map(|piece| {
                let mut min = (piece.min() / self.cell_size).floor().as_ivec2();
                let mut max = (piece.max() / self.cell_size).floor().as_ivec2();
                min.y = min.y.clamp(first_row, last_row);
                max.y = max.y.clamp(first_row, last_row);
                (min, max)
            })
            .collect()
    }
}

fn span_cell_count(spans: &[(IVec2, IVec2)]) -> u64 {
    spans
        .iter()
        .map(|(min, max)| {
            let columns = (i64::from(max.x) - i64::from(min.x) + 1).max(0) as u64;
            let rows = (i64::from(max.y) - i64::from(min.y) + 1).max(0) as u64;
            columns.saturating_mul(rows)
        })
        .fold(0, u64::saturating_add)
}

fn span_contains(min: IVec2, max: IVec2, cell: IVec2) -> bool {
    (min.x..=max.x).contains(&cell.x) && (min.y..=max.y).contains(&cell.y)
}
