//! Sparse wrap-around tile storage paged in square sectors.

use orbitile_core::{Grid2, IVec2, RectI};
use serde::{Deserialize, Serialize};

use crate::TileArrayError;

/// Sector coordinates, `(⌊x/S⌋, ⌊y/S⌋)`.
pub type Sector = IVec2;

/// Dense `S`×`S` block of tiles, row-major.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<T>", into = "Vec<T>")]
#[serde(bound(
    serialize = "T: Clone + Serialize",
    deserialize = "T: Deserialize<'de>"
))]
pub struct SectorArray<T, const S: usize> {
    tiles: Vec<T>,
}

impl<T: Clone, const S: usize> SectorArray<T, S> {
    /// A sector with every tile set to `tile`.
    #[must_use]
    pub fn filled(tile: T) -> Self {
        Self {
            tiles: vec![tile; S * S],
        }
    }
}

impl<T, const S: usize> SectorArray<T, S> {
    /// Tile at local `(x, y)`.
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> Option<&T> {
        (x < S && y < S).then(|| &self.tiles[y * S + x])
    }

    /// Mutable tile at local `(x, y)`.
    pub fn get_mut(&mut self, x: usize, y: usize) -> Option<&mut T> {
        (x < S && y < S).then(|| &mut self.tiles[y * S + x])
    }

    /// Tiles in row-major order.
    #[must_use]
    pub fn tiles(&self) -> &[T] {
        &self.tiles
    }

    /// Mutable tiles in row-major order.
    pub fn tiles_mut(&mut self) -> &mut [T] {
        &mut self.tiles
    }
}

impl<T, const S: usize> TryFrom<Vec<T>> for SectorArray<T, S> {
    type Error = String;

    fn try_from(tiles: Vec<T>) -> Result<Self, Self::Error> {
        if tiles.len() == S * S {
            Ok(Self { tiles })
        } else {
            Err(format!("sector holds {} tiles, expected {}", tiles.len(), S * S))
        }
    }
}

impl<T, const S: usize> From<SectorArray<T, S>> for Vec<T> {
    fn from(sector: SectorArray<T, S>) -> Self {
        sector.tiles
    }
}

/// A piece of a split rectangle lying inside `[0, W)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SplitRect {
    /// The piece in world coordinates.
    pub rect: RectI,
    /// Added to a piece x to recover the caller's x.
    pub x_offset: i32,
}

/// Splits `rect` into at most two pieces inside `[0, width)`.
///
/// Rectangles at least `width` wide fold to a single full-width piece with a
/// zero offset. Narrower rectangles must start at or right of `-width`.
pub fn split_rect(rect: RectI, width: i32) -> Result<Vec<SplitRect>, TileArrayError> {
    if rect.is_empty() || width <= 0 {
        return Ok(Vec::new());
    }
    let (y_min, y_max) = (rect.min().y, rect.max().y);
    if rect.width() >= width {
        return Ok(vec![SplitRect {
            rect: RectI::new(0, y_min, width, y_max),
            x_offset: 0,
        }]);
    }
    if rect.min().x < -width {
        return Err(TileArrayError::RectOutOfRange {
            x_min: rect.min().x,
            width,
        });
    }
    let x_min = rect.min().x.rem_euclid(width);
    let x_offset = rect.min().x - x_min;
    let x_max = x_min + rect.width();
    if x_max <= width {
        return Ok(vec![SplitRect {
            rect: RectI::new(x_min, y_min, x_max, y_max),
            x_offset,
        }]);
    }
    Ok(vec![
        SplitRect {
            rect: RectI::new(x_min, y_min, width, y_max),
            x_offset,
        },
        SplitRect {
            rect: RectI::new(0, y_min, x_max - width, y_max),
            x_offset: x_offset + width,
        },
    ])
}

/// Clamps `[y_min, y_max)` into `[0, height)`; the result may be empty.
#[must_use]
pub fn clamp_y_range(y_min: i32, y_max: i32, height: i32) -> (i32, i32) {
    let low = y_min.clamp(0, height.max(0));
    let high = y_max.clamp(low, height.max(0));
    (low, high)
}

/// Tile grid of `width` × `height` that wraps in x, stored as optional
/// `S`×`S` sectors.
///
/// Reads of unloaded sectors or rows outside `[0, height)` yield the
/// default tile; writes there are refused.
#[derive(Clone, Debug)]
pub struct TileSectorArray<T, const S: usize> {
    width: i32,
    height: i32,
    sectors_wide: i32,
    sectors_high: i32,
    default_tile: T,
    sectors: Vec<Option<SectorArray<T, S>>>,
    loaded: usize,
}

impl<T: Clone, const S: usize> TileSectorArray<T, S> {
    /// Creates an array with no sectors loaded.
    #[must_use]
    pub fn new(size: IVec2, default_tile: T) -> Self {
        let side = S as i32;
        let width = size.x.max(0);
        let height = size.y.max(0);
        let sectors_wide = (width + side - 1) / side;
        let sectors_high = (height + side - 1) / side;
        let total = (sectors_wide * sectors_high) as usize;
        Self {
            width,
            height,
            sectors_wide,
            sectors_high,
            default_tile,
            sectors: vec![None; total],
            loaded: 0,
        }
    }

    /// Copy of a loaded sector.
    #[must_use]
    pub fn copy_sector(&self, sector: Sector) -> Option<SectorArray<T, S>> {
        self.sector(sector).cloned()
    }

    /// Fills `target` with `f(pos, tile)` for every cell of `rect`,
    /// resizing it to the rect. Cell `(0, 0)` of the target is `rect.min()`.
    pub fn for_each_tile_to<U: Clone + Default>(
        &self,
        target: &mut Grid2<U>,
        rect: RectI,
        mut f: impl FnMut(IVec2, &T) -> U,
    ) -> Result<(), TileArrayError> {
        let origin = rect.min();
        let (width, height) = if rect.width() >= self.width && self.width > 0 {
            (self.width, rect.height())
        } else {
            (rect.width(), rect.height())
        };
        target.resize(width as usize, height as usize, U::default());
        let base = if rect.width() >= self.width {
            IVec2::new(0, origin.y)
        } else {
            origin
        };
        self.for_each_tile(rect, |pos, tile| {
            let local = pos - base;
            let _ = target.set(local.x as usize, local.y as usize, f(pos, tile));
        })
    }
}

impl<T, const S: usize> TileSectorArray<T, S> {
    /// World size in tiles.
    #[must_use]
    pub fn size(&self) -> IVec2 {
        IVec2::new(self.width, self.height)
    }

    /// World width in tiles.
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// World height in tiles.
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// Side length of a sector.
    #[must_use]
    pub const fn sector_size() -> i32 {
        S as i32
    }

    /// Sector columns, including a partial one at the seam.
    #[must_use]
    pub const fn sectors_wide(&self) -> i32 {
        self.sectors_wide
    }

    /// Sector rows, including a partial one at the top.
    #[must_use]
    pub const fn sectors_high(&self) -> i32 {
        self.sectors_high
    }

    /// Number of sector slots.
    #[must_use]
    pub const fn total_sectors(&self) -> usize {
        (self.sectors_wide * self.sectors_high) as usize
    }

    /// Tile returned for unloaded or out-of-range cells.
    #[must_use]
    pub fn default_tile(&self) -> &T {
        &self.default_tile
    }

    /// Wraps an x coordinate into `[0, width)`.
    #[must_use]
    pub fn xwrap(&self, x: i32) -> i32 {
        if self.width == 0 {
            x
        } else {
            x.rem_euclid(self.width)
        }
    }

    /// Sector containing `pos`, or `None` when `pos.y` is outside the world.
    #[must_use]
    pub fn sector_for(&self, pos: IVec2) -> Option<Sector> {
        if pos.y < 0 || pos.y >= self.height || self.width == 0 {
            return None;
        }
        let side = S as i32;
        Some(IVec2::new(self.xwrap(pos.x) / side, pos.y / side))
    }

    /// Reports whether `sector` addresses a slot of this array.
    #[must_use]
    pub fn sector_valid(&self, sector: Sector) -> bool {
        sector.x >= 0 && sector.y >= 0 && sector.x < self.sectors_wide && sector.y < self.sectors_high
    }

    /// Tiles covered by `sector`; seam and top sectors may be partial.
    #[must_use]
    pub fn sector_region(&self, sector: Sector) -> RectI {
        let side = S as i32;
        let min = sector * side;
        RectI::new(
            min.x,
            min.y,
            (min.x + side).min(self.width),
            (min.y + side).min(self.height),
        )
    }

    /// Neighbour of `sector` offset by `(dx, dy)`; wraps in x, `None` past y.
    #[must_use]
    pub fn adjacent_sector(&self, sector: Sector, dx: i32, dy: i32) -> Option<Sector> {
        if !self.sector_valid(sector) {
            return None;
        }
        let y = sector.y + dy;
        if y < 0 || y >= self.sectors_high {
            return None;
        }
        Some(IVec2::new((sector.x + dx).rem_euclid(self.sectors_wide), y))
    }

    /// Every sector `rect` touches, each once, row by row.
    pub fn valid_sectors_for(&self, rect: RectI) -> Result<Vec<Sector>, TileArrayError> {
        let side = S as i32;
        let mut sectors: Vec<Sector> = Vec::new();
        for piece in split_rect(rect, self.width)? {
            let (y_min, y_max) = clamp_y_range(piece.rect.min().y, piece.rect.max().y, self.height);
            if y_min >= y_max {
                continue;
            }
            for sy in y_min / side..=(y_max - 1) / side {
                for sx in piece.rect.min().x / side..=(piece.rect.max().x - 1) / side {
                    let sector = IVec2::new(sx, sy);
                    if !sectors.contains(&sector) {
                        sectors.push(sector);
                    }
                }
            }
        }
        sectors.sort_by_key(|sector| (sector.y, sector.x));
        Ok(sectors)
    }

    fn slot(&self, sector: Sector) -> Option<usize> {
        self.sector_valid(sector)
            .then(|| (sector.y * self.sectors_wide + sector.x) as usize)
    }

    /// Installs `array` as the contents of `sector`. Returns false and drops
    /// the array when the sector is invalid.
    pub fn load_sector(&mut self, sector: Sector, array: SectorArray<T, S>) -> bool {
        let Some(slot) = self.slot(sector) else {
            return false;
        };
        if self.sectors[slot].replace(array).is_none() {
            self.loaded += 1;
        }
        true
    }

    /// Removes and returns the contents of `sector`.
    pub fn unload_sector(&mut self, sector: Sector) -> Option<SectorArray<T, S>> {
        let slot = self.slot(sector)?;
        let array = self.sectors[slot].take()?;
        self.loaded -= 1;
        Some(array)
    }

    /// Unloads every sector.
    pub fn unload_all(&mut self) {
        for slot in &mut self.sectors {
            *slot = None;
        }
        self.loaded = 0;
    }

    /// Reports whether `sector` is loaded.
    #[must_use]
    pub fn sector_loaded(&self, sector: Sector) -> bool {
        self.sector(sector).is_some()
    }

    /// Number of loaded sectors.
    #[must_use]
    pub const fn loaded_count(&self) -> usize {
        self.loaded
    }

    /// Loaded sectors, row by row.
    #[must_use]
    pub fn loaded_sectors(&self) -> Vec<Sector> {
        let wide = self.sectors_wide.max(1);
        self.sectors
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(index, _)| IVec2::new(index as i32 % wide, index as i32 / wide))
            .collect()
    }

    /// Contents of a loaded sector.
    #[must_use]
    pub fn sector(&self, sector: Sector) -> Option<&SectorArray<T, S>> {
        self.slot(sector).and_then(|slot| self.sectors[slot].as_ref())
    }

    /// Mutable contents of a loaded sector.
    pub fn sector_mut(&mut self, sector: Sector) -> Option<&mut SectorArray<T, S>> {
        let slot = self.slot(sector)?;
        self.sectors[slot].as_mut()
    }

    /// Tile at `pos`; the default tile when unloaded or outside the world.
    #[must_use]
    pub fn tile(&self, pos: IVec2) -> &T {
        self.loaded_tile(pos).unwrap_or(&self.default_tile)
    }

    fn loaded_tile(&self, pos: IVec2) -> Option<&T> {
        let sector = self.sector_for(pos)?;
        let side = S as i32;
        let local_x = (self.xwrap(pos.x) - sector.x * side) as usize;
        let local_y = (pos.y - sector.y * side) as usize;
        self.sector(sector)?.get(local_x, local_y)
    }

    /// Mutable tile at `pos`; `None` when unloaded or outside the world.
    pub fn modify_tile(&mut self, pos: IVec2) -> Option<&mut T> {
        let sector = self.sector_for(pos)?;
        let side = S as i32;
        let local_x = (self.xwrap(pos.x) - sector.x * side) as usize;
        let local_y = (pos.y - sector.y * side) as usize;
        self.sector_mut(sector)?.get_mut(local_x, local_y)
    }

    /// Calls `f(pos, tile)` for every cell of `rect`, row by row.
    ///
    /// Positions are reported in the caller's frame, except that rects at
    /// least a world wide fold to `[0, width)`. Cells outside the world or
    /// in unloaded sectors are delivered with the default tile.
    pub fn for_each_tile(
        &self,
        rect: RectI,
        mut f: impl FnMut(IVec2, &T),
    ) -> Result<(), TileArrayError> {
        let pieces = split_rect(rect, self.width)?;
        for y in rect.min().y..rect.max().y {
            for piece in &pieces {
                for x in piece.rect.min().x..piece.rect.max().x {
                    let tile = self.tile(IVec2::new(x, y));
                    f(IVec2::new(x + piece.x_offset, y), tile);
                }
            }
        }
        Ok(())
    }

    /// Calls `f(pos, tile)` with mutable access for every loaded cell of
    /// `rect`; unloaded and out-of-range cells are skipped.
    pub fn tile_eval(
        &mut self,
        rect: RectI,
        mut f: impl FnMut(IVec2, &mut T),
    ) -> Result<(), TileArrayError> {
        let pieces = split_rect(rect, self.width)?;
        let (y_min, y_max) = clamp_y_range(rect.min().y, rect.max().y, self.height);
        for y in y_min..y_max {
            for piece in &pieces {
                for x in piece.rect.min().x..piece.rect.max().x {
                    if let Some(tile) = self.modify_tile(IVec2::new(x, y)) {
                        f(IVec2::new(x + piece.x_offset, y), tile);
                    }
                }
            }
        }
        Ok(())
    }

    /// Reports whether `pred` holds for any cell of `rect`, stopping at the
    /// first match. Unloaded cells are tested as the default tile.
    pub fn tile_satisfies(
        &self,
        rect: RectI,
        mut pred: impl FnMut(IVec2, &T) -> bool,
    ) -> Result<bool, TileArrayError> {
        let pieces = split_rect(rect, self.width)?;
        for y in rect.min().y..rect.max().y {
            for piece in &pieces {
                for x in piece.rect.min().x..piece.rect.max().x {
                    if pred(IVec2::new(x + piece.x_offset, y), self.tile(IVec2::new(x, y))) {
                        return Ok(true);
                    }
                }
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Array = TileSectorArray<u8, 4>;

    #[test]
    fn split_folds_wide_rects_and_splits_at_the_seam() {
        assert_eq!(
            split_rect(RectI::new(-5, 0, 70, 2), 64).expect("splits"),
            vec![SplitRect {
                rect: RectI::new(0, 0, 64, 2),
                x_offset: 0
            }]
        );
        assert_eq!(
            split_rect(RectI::new(60, 0, 66, 2), 64).expect("splits"),
            vec![
                SplitRect {
                    rect: RectI::new(60, 0, 64, 2),
                    x_offset: 0
                },
                SplitRect {
                    rect: RectI::new(0, 0, 2, 2),
                    x_offset: 64
                },
            ]
        );
        assert_eq!(
            split_rect(RectI::new(-3, 0, 2, 1), 64).expect("splits"),
            vec![
                SplitRect {
                    rect: RectI::new(61, 0, 64, 1),
                    x_offset: -64
                },
                SplitRect {
                    rect: RectI::new(0, 0, 2, 1),
                    x_offset: 0
                },
            ]
        );
        assert_eq!(
            split_rect(RectI::new(-65, 0, -60, 1), 64),
            Err(TileArrayError::RectOutOfRange {
                x_min: -65,
                width: 64
            })
        );
        assert!(split_rect(RectI::new(3, 0, 3, 9), 64).expect("splits").is_empty());
    }

    #[test]
    fn clamp_keeps_ranges_inside_the_world() {
        assert_eq!(clamp_y_range(-4, 3, 10), (0, 3));
        assert_eq!(clamp_y_range(8, 20, 10), (8, 10));
        assert_eq!(clamp_y_range(12, 20, 10), (10, 10));
    }

    #[test]
    fn partial_sectors_at_the_seam() {
        let array = Array::new(IVec2::new(10, 6), 0);
        assert_eq!(array.sectors_wide(), 3);
        assert_eq!(array.sectors_high(), 2);
        assert_eq!(array.sector_region(IVec2::new(2, 1)), RectI::new(8, 4, 10, 6));
        assert_eq!(array.sector_for(IVec2::new(-1, 5)), Some(IVec2::new(2, 1)));
        assert_eq!(array.sector_for(IVec2::new(0, 6)), None);
        assert_eq!(array.adjacent_sector(IVec2::new(0, 0), -1, 0), Some(IVec2::new(2, 0)));
        assert_eq!(array.adjacent_sector(IVec2::new(0, 1), 0, 1), None);
    }

    #[test]
    fn writes_require_loaded_sectors() {
        let mut array = Array::new(IVec2::new(8, 8), 0);
        assert!(array.modify_tile(IVec2::new(1, 1)).is_none());
        assert!(array.load_sector(IVec2::new(0, 0), SectorArray::filled(5)));
        assert!(!array.load_sector(IVec2::new(9, 0), SectorArray::filled(5)));
        *array.modify_tile(IVec2::new(9, 1)).expect("wrapped into sector 0") = 7;
        assert_eq!(*array.tile(IVec2::new(1, 1)), 7);
        assert!(array.modify_tile(IVec2::new(1, -1)).is_none());
        assert_eq!(*array.tile(IVec2::new(5, 1)), 0);
        assert_eq!(array.loaded_sectors(), vec![IVec2::new(0, 0)]);

        let copy = array.copy_sector(IVec2::new(0, 0)).expect("loaded");
        let unloaded = array.unload_sector(IVec2::new(0, 0)).expect("loaded");
        assert_eq!(copy, unloaded);
        assert_eq!(array.loaded_count(), 0);
        assert_eq!(*array.tile(IVec2::new(1, 1)), 0);
    }

    #[test]
    fn tile_eval_skips_unloaded_and_satisfies_short_circuits() {
        let mut array = Array::new(IVec2::new(8, 8), 0);
        let _ = array.load_sector(IVec2::new(1, 0), SectorArray::filled(1));
        let mut visited = 0;
        array
            .tile_eval(RectI::new(-2, -1, 5, 3), |_, tile| {
                *tile += 1;
                visited += 1;
            })
            .expect("in range");
        assert_eq!(visited, 9);
        assert_eq!(*array.tile(IVec2::new(4, 2)), 2);
        assert_eq!(*array.tile(IVec2::new(5, 2)), 1);
        assert_eq!(*array.tile(IVec2::new(6, 2)), 2);

        let mut tested = 0;
        let found = array
            .tile_satisfies(RectI::new(0, 0, 8, 8), |_, tile| {
                tested += 1;
                *tile == 2
            })
            .expect("in range");
        assert!(found);
        assert_eq!(tested, 5);
    }

    #[test]
    fn sectors_for_a_seam_rect() {
        let array = Array::new(IVec2::new(16, 8), 0);
        assert_eq!(
            array.valid_sectors_for(RectI::new(14, -3, 18, 5)).expect("in range"),
            vec![
                IVec2::new(0, 0),
                IVec2::new(3, 0),
                IVec2::new(0, 1),
                IVec2::new(3, 1)
            ]
        );
    }

    #[test]
    fn dense_extraction_matches_the_rect() {
        let mut array = Array::new(IVec2::new(8, 8), 0);
        let _ = array.load_sector(IVec2::new(0, 0), SectorArray::filled(3));
        let mut target = Grid2::new(1, 1, 0_u16);
        array
            .for_each_tile_to(&mut target, RectI::new(-2, 2, 2, 5), |_, tile| u16::from(*tile) * 10)
            .expect("in range");
        assert_eq!((target.width(), target.height()), (4, 3));
        assert_eq!(target.get(0, 0), Some(&0));
        assert_eq!(target.get(2, 0), Some(&30));
        assert_eq!(target.get(3, 2), Some(&0));
        assert_eq!(target.get(3, 1), Some(&30));
    }

    #[test]
    fn sector_arrays_reject_wrong_lengths() {
        let tiles: Vec<u8> = vec![0; 15];
        assert!(SectorArray::<u8, 4>::try_from(tiles).is_err());
        let array = SectorArray::<u8, 4>::filled(2);
        let bytes = bincode::serialize(&array).expect("encodes");
        let decoded: SectorArray<u8, 4> = bincode::deserialize(&bytes).expect("decodes");
        assert_eq!(decoded, array);
    }
}
