//! Integer and float geometry on a world that wraps horizontally.

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

/// Half-open axis-aligned integer rectangle `[min, max)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RectI {
    min: IVec2,
    max: IVec2,
}

impl RectI {
    /// Creates a rectangle from its minimum and maximum edges.
    #[must_use]
    pub const fn new(x_min: i32, y_min: i32, x_max: i32, y_max: i32) -> Self {
        Self {
            min: IVec2::new(x_min, y_min),
            max: IVec2::new(x_max, y_max),
        }
    }

    /// Creates a rectangle spanning the provided corners.
    #[must_use]
    pub const fn from_corners(min: IVec2, max: IVec2) -> Self {
        Self { min, max }
    }

    /// Creates a rectangle anchored at `min` with the provided size.
    #[must_use]
    pub fn with_size(min: IVec2, size: IVec2) -> Self {
        Self {
            min,
            max: min + size,
        }
    }

    /// Rectangle covering exactly one integer cell.
    #[must_use]
    pub fn unit(cell: IVec2) -> Self {
        Self::with_size(cell, IVec2::ONE)
    }

    /// Inclusive lower corner.
    #[must_use]
    pub const fn min(&self) -> IVec2 {
        self.min
    }

    /// Exclusive upper corner.
    #[must_use]
    pub const fn max(&self) -> IVec2 {
        self.max
    }

    /// Width in cells, never negative.
    #[must_use]
    pub fn width(&self) -> i32 {
        (self.max.x - self.min.x).max(0)
    }

    /// Height in cells, never negative.
    #[must_use]
    pub fn height(&self) -> i32 {
        (self.max.y - self.min.y).max(0)
    }

    /// Number of integer cells covered by the rectangle.
    #[must_use]
    pub fn area(&self) -> i64 {
        i64::from(self.width()) * i64::from(self.height())
    }

    /// Reports whether the rectangle covers no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Reports whether `cell` lies inside the rectangle.
    #[must_use]
    pub fn contains(&self, cell: IVec2) -> bool {
        cell.x >= self.min.x && cell.x < self.max.x && cell.y >= self.min.y && cell.y < self.max.y
    }

    /// Reports whether the two rectangles share at least one cell.
    #[must_use]
    pub fn intersects(&self, other: &RectI) -> bool {
        !self.intersection(other).is_empty()
    }

    /// Overlapping region of both rectangles; empty when they are disjoint.
    #[must_use]
    pub fn intersection(&self, other: &RectI) -> RectI {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max).max(min);
        RectI { min, max }
    }

    /// Copy of the rectangle moved by `offset`.
    #[must_use]
    pub fn translated(&self, offset: IVec2) -> RectI {
        RectI {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Copy of the rectangle grown by `amount` on every side.
    #[must_use]
    pub fn padded(&self, amount: i32) -> RectI {
        RectI {
            min: self.min - IVec2::splat(amount),
            max: self.max + IVec2::splat(amount),
        }
    }

    /// Float rectangle covering the same area.
    #[must_use]
    pub fn to_rect_f(&self) -> RectF {
        RectF::new(
            self.min.x as f32,
            self.min.y as f32,
            self.max.x as f32,
            self.max.y as f32,
        )
    }
}

/// Axis-aligned float rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RectF {
    min: Vec2,
    max: Vec2,
}

impl RectF {
    /// Creates a rectangle from its minimum and maximum edges.
    #[must_use]
    pub const fn new(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Self {
        Self {
            min: Vec2::new(x_min, y_min),
            max: Vec2::new(x_max, y_max),
        }
    }

    /// Creates a rectangle spanning the provided corners.
    #[must_use]
    pub const fn from_corners(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Degenerate rectangle located at a single point.
    #[must_use]
    pub const fn point(point: Vec2) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    /// Lower corner.
    #[must_use]
    pub const fn min(&self) -> Vec2 {
        self.min
    }

    /// Upper corner.
    #[must_use]
    pub const fn max(&self) -> Vec2 {
        self.max
    }

    /// Horizontal extent.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    /// Vertical extent.
    #[must_use]
    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    /// Centre point of the rectangle.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Reports whether the rectangle has no positive area.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Reports whether `point` lies inside the rectangle, edges included.
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    /// Reports whether the rectangles overlap. Touching edges overlap.
    #[must_use]
    pub fn intersects(&self, other: &RectF) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    /// Copy of the rectangle moved by `offset`.
    #[must_use]
    pub fn translated(&self, offset: Vec2) -> RectF {
        RectF {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Copy of the rectangle grown by `amount` on every side.
    #[must_use]
    pub fn padded(&self, amount: f32) -> RectF {
        RectF {
            min: self.min - Vec2::splat(amount),
            max: self.max + Vec2::splat(amount),
        }
    }

    /// Shortest distance from `point` to the rectangle; zero inside.
    #[must_use]
    pub fn distance_to_point(&self, point: Vec2) -> f32 {
        let dx = (self.min.x - point.x).max(0.0).max(point.x - self.max.x);
        let dy = (self.min.y - point.y).max(0.0).max(point.y - self.max.y);
        Vec2::new(dx, dy).length()
    }

    /// Smallest integer rectangle that covers this one.
    #[must_use]
    pub fn to_covering_rect_i(&self) -> RectI {
        RectI::new(
            self.min.x.floor() as i32,
            self.min.y.floor() as i32,
            self.max.x.ceil() as i32,
            self.max.y.ceil() as i32,
        )
    }
}

/// Straight segment between two points.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Line2F {
    /// Start point.
    pub a: Vec2,
    /// End point.
    pub b: Vec2,
}

impl Line2F {
    /// Creates a segment from `a` to `b`.
    #[must_use]
    pub const fn new(a: Vec2, b: Vec2) -> Self {
        Self { a, b }
    }

    /// Length of the segment.
    #[must_use]
    pub fn length(&self) -> f32 {
        (self.b - self.a).length()
    }

    /// Shortest distance from `point` to any point of the segment.
    #[must_use]
    pub fn distance_to_point(&self, point: Vec2) -> f32 {
        let direction = self.b - self.a;
        let length_squared = direction.length_squared();
        if length_squared == 0.0 {
            return (point - self.a).length();
        }
        let t = ((point - self.a).dot(direction) / length_squared).clamp(0.0, 1.0);
        (point - (self.a + direction * t)).length()
    }

    /// Reports whether any part of the segment lies within `rect`.
    ///
    /// Uses Liang-Barsky clipping, so segments fully inside count.
    #[must_use]
    pub fn intersects_rect(&self, rect: &RectF) -> bool {
        let direction = self.b - self.a;
        let mut t_enter = 0.0_f32;
        let mut t_exit = 1.0_f32;
        let checks = [
            (-direction.x, self.a.x - rect.min().x),
            (direction.x, rect.max().x - self.a.x),
            (-direction.y, self.a.y - rect.min().y),
            (direction.y, rect.max().y - self.a.y),
        ];
        for (p, q) in checks {
            if p == 0.0 {
                if q < 0.0 {
                    return false;
                }
                continue;
            }
            let t = q / p;
            if p < 0.0 {
                t_enter = t_enter.max(t);
            } else {
                t_exit = t_exit.min(t);
            }
            if t_enter > t_exit {
                return false;
            }
        }
        true
    }
}

/// Dimensions of a world that wraps in X and is clamped in Y.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldGeometry {
    width: u32,
    height: u32,
}

impl WorldGeometry {
    /// Creates a geometry with the provided size in tiles.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width of the world; zero disables wrapping.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height of the world.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Normalizes an integer x coordinate into `[0, width)`.
    #[must_use]
    pub fn xwrap(&self, x: i32) -> i32 {
        if self.width == 0 {
            x
        } else {
            x.rem_euclid(self.width as i32)
        }
    }

    /// Normalizes a float x coordinate into `[0, width)`.
    #[must_use]
    pub fn xwrap_f(&self, x: f32) -> f32 {
        if self.width == 0 {
            return x;
        }
        let wrapped = x.rem_euclid(self.width as f32);
        // rem_euclid may round up to exactly `width` for tiny negative inputs
        if wrapped >= self.width as f32 {
            0.0
        } else {
            wrapped
        }
    }

    /// Normalizes an integer position horizontally.
    #[must_use]
    pub fn wrap_cell(&self, cell: IVec2) -> IVec2 {
        IVec2::new(self.xwrap(cell.x), cell.y)
    }

    /// Normalizes a float position horizontally.
    #[must_use]
    pub fn wrap_position(&self, position: Vec2) -> Vec2 {
        Vec2::new(self.xwrap_f(position.x), position.y)
    }

    /// Shortest difference `a - b` taking the seam into account.
    #[must_use]
    pub fn diff(&self, a: Vec2, b: Vec2) -> Vec2 {
        let mut dx = a.x - b.x;
        if self.width != 0 {
            let width = self.width as f32;
            dx = (dx + width * 0.5).rem_euclid(width) - width * 0.5;
        }
        Vec2::new(dx, a.y - b.y)
    }

    /// Shortest integer difference `a - b` taking the seam into account.
    #[must_use]
    pub fn diff_cell(&self, a: IVec2, b: IVec2) -> IVec2 {
        let mut dx = a.x - b.x;
        if self.width != 0 {
            let width = self.width as i32;
            dx = (dx + width / 2).rem_euclid(width) - width / 2;
        }
        IVec2::new(dx, a.y - b.y)
    }

    /// Shortest distance between two points.
    #[must_use]
    pub fn distance(&self, a: Vec2, b: Vec2) -> f32 {
        self.diff(a, b).length()
    }

    /// Copy of `target` shifted by whole world widths to lie closest to `source`.
    #[must_use]
    pub fn nearest_to(&self, source: Vec2, target: Vec2) -> Vec2 {
        source + self.diff(target, source)
    }

    /// Splits a float rectangle at the seam into at most two pieces inside `[0, width)`.
    #[must_use]
    pub fn split_rect_f(&self, rect: RectF) -> Vec<RectF> {
        if self.width == 0 {
            return vec![rect];
        }
        let width = self.width as f32;
        if rect.width() >= width {
            return vec![RectF::new(0.0, rect.min().y, width, rect.max().y)];
        }
        let x_min = self.xwrap_f(rect.min().x);
        let x_max = x_min + rect.width();
        if x_max <= width {
            vec![RectF::new(x_min, rect.min().y, x_max, rect.max().y)]
        } else {
            vec![
                RectF::new(x_min, rect.min().y, width, rect.max().y),
                RectF::new(0.0, rect.min().y, x_max - width, rect.max().y),
            ]
        }
    }

    /// Splits an integer rectangle at the seam into at most two pieces inside `[0, width)`.
    #[must_use]
    pub fn split_rect_i(&self, rect: RectI) -> Vec<RectI> {
        if self.width == 0 || rect.is_empty() {
            return vec![rect];
        }
        let width = self.width as i32;
        if rect.width() >= width {
            return vec![RectI::new(0, rect.min().y, width, rect.max().y)];
        }
        let x_min = self.xwrap(rect.min().x);
        let x_max = x_min + rect.width();
        if x_max <= width {
            vec![RectI::new(x_min, rect.min().y, x_max, rect.max().y)]
        } else {
            vec![
                RectI::new(x_min, rect.min().y, width, rect.max().y),
                RectI::new(0, rect.min().y, x_max - width, rect.max().y),
            ]
        }
    }

    /// Reports whether two rectangles overlap anywhere on the wrapped world.
    #[must_use]
    pub fn rect_intersects_rect(&self, a: &RectF, b: &RectF) -> bool {
        let a_parts = self.split_rect_f(*a);
        let b_parts = self.split_rect_f(*b);
        a_parts
            .iter()
            .any(|lhs| b_parts.iter().any(|rhs| lhs.intersects(rhs)))
    }

    /// Reports whether `point` lies inside `rect` on the wrapped world.
    #[must_use]
    pub fn rect_contains(&self, rect: &RectF, point: Vec2) -> bool {
        let point = self.wrap_position(point);
        self.split_rect_f(*rect)
            .iter()
            .any(|part| part.contains(point))
    }

    /// Shortest distance from `point` to `rect` on the wrapped world.
    #[must_use]
    pub fn rect_distance(&self, rect: &RectF, point: Vec2) -> f32 {
        let nearest_center = self.nearest_to(point, rect.center());
        let shifted = rect.translated(nearest_center - rect.center());
        shifted.distance_to_point(point)
    }

    /// Reports whether a segment touches `rect` on the wrapped world.
    #[must_use]
    pub fn line_intersects_rect(&self, line: &Line2F, rect: &RectF) -> bool {
        if self.width == 0 {
            return line.intersects_rect(rect);
        }
        let width = self.width as f32;
        let start = self.wrap_position(line.a);
        let shifted = Line2F::new(start, start + (line.b - line.a));
        [-width, 0.0, width].iter().any(|offset| {
            self.split_rect_f(*rect)
                .iter()
                .any(|part| shifted.intersects_rect(&part.translated(Vec2::new(*offset, 0.0))))
        })
    }
}
