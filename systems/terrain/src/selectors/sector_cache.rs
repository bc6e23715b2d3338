use std::sync::{Arc, Mutex, MutexGuard};

use orbitile_core::{Grid2, IVec2, LruCache};

use super::TERRAIN_SECTOR_SIZE;

/// Values of one generated sector, indexed relative to its origin.
pub(crate) type SectorValues = Arc<Grid2<f32>>;

/// Thread-safe cache of whole generated sectors.
///
/// Generation runs without the lock held. Threads racing on one sector may
/// both generate it; the first insert is kept.
#[derive(Debug)]
pub(crate) struct SectorCache {
    sectors: Mutex<LruCache<IVec2, SectorValues>>,
    world_width: u32,
}

impl SectorCache {
    pub(crate) fn new(max_sectors: usize, world_width: u32) -> Self {
        Self {
            sectors: Mutex::new(LruCache::new(max_sectors)),
            world_width,
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<IVec2, SectorValues>> {
        match self.sectors.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Origin of the sector holding `(x, y)` after horizontal wrapping.
    pub(crate) fn sector_origin(&self, x: i32, y: i32) -> IVec2 {
        let x = self.wrap(x);
        IVec2::new(
            x.div_euclid(TERRAIN_SECTOR_SIZE) * TERRAIN_SECTOR_SIZE,
            y.div_euclid(TERRAIN_SECTOR_SIZE) * TERRAIN_SECTOR_SIZE,
        )
    }

    /// Reads `(x, y)`, generating its sector with `generate` on a miss.
    pub(crate) fn get(&self, x: i32, y: i32, generate: impl FnOnce(IVec2) -> Grid2<f32>) -> f32 {
        let origin = self.sector_origin(x, y);
        let local_x = (self.wrap(x) - origin.x) as usize;
        let local_y = (y - origin.y) as usize;
        let cached = self.lock().get(&origin).cloned();
        let values = match cached {
            Some(values) => values,
            None => {
                let values = Arc::new(generate(origin));
                let mut sectors = self.lock();
                match sectors.get(&origin) {
                    Some(existing) => existing.clone(),
                    None => {
                        let _ = sectors.insert(origin, values.clone());
                        values
                    }
                }
            }
        };
        values.get(local_x, local_y).copied().unwrap_or(-1.0)
    }

    fn wrap(&self, x: i32) -> i32 {
        if self.world_width == 0 {
            x
        } else {
            x.rem_euclid(self.world_width as i32)
        }
    }
}
