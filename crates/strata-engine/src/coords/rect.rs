use glam::{Mat4, Vec4};

use super::Vec2;

/// Axis-aligned rectangle stored as min/max corners.
///
/// `min <= max` on both axes for any rectangle built through the constructors
/// below. A rectangle with zero width or height is empty.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    #[inline]
    pub const fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self {
            min: Vec2::new(min_x, min_y),
            max: Vec2::new(max_x, max_y),
        }
    }

    /// Builds a rectangle from two arbitrary corners.
    #[inline]
    pub fn from_corners(a: Vec2, b: Vec2) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Smallest rectangle containing every point, `None` for an empty input.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Vec2>,
    {
        let mut it = points.into_iter();
        let first = it.next()?;
        Some(it.fold(Rect { min: first, max: first }, |r, p| Rect {
            min: r.min.min(p),
            max: r.max.max(p),
        }))
    }

    #[inline]
    pub fn width(self) -> f32 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(self) -> f32 {
        self.max.y - self.min.y
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Half-open containment: [min, max).
    #[inline]
    pub fn contains(self, p: Vec2) -> bool {
        p.x >= self.min.x && p.y >= self.min.y && p.x < self.max.x && p.y < self.max.y
    }

    #[inline]
    pub fn union(self, other: Rect) -> Rect {
        Rect {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    #[inline]
    pub fn intersect(self, other: Rect) -> Option<Rect> {
        let r = Rect {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        };
        if r.is_empty() { None } else { Some(r) }
    }

    /// Grows the rectangle by `amount` on every side.
    #[inline]
    pub fn outset(self, amount: f32) -> Rect {
        Rect {
            min: Vec2::new(self.min.x - amount, self.min.y - amount),
            max: Vec2::new(self.max.x + amount, self.max.y + amount),
        }
    }

    #[inline]
    pub fn corners(self) -> [Vec2; 4] {
        [
            self.min,
            Vec2::new(self.max.x, self.min.y),
            self.max,
            Vec2::new(self.min.x, self.max.y),
        ]
    }

    /// Maps the four corners through `m` (with perspective divide) and returns
    /// their bounding rectangle.
    pub fn transformed(self, m: &Mat4) -> Rect {
        let mapped = self.corners().map(|c| {
            let v = *m * Vec4::new(c.x, c.y, 0.0, 1.0);
            let w = if v.w.abs() > f32::EPSILON { v.w } else { 1.0 };
            Vec2::new(v.x / w, v.y / w)
        });
        // Four corners are always present.
        Rect::from_points(mapped).unwrap_or(self)
    }

    /// Two triangles covering the rectangle, six vertices.
    #[inline]
    pub fn quad(self) -> [Vec2; 6] {
        let (lo, hi) = (self.min, self.max);
        [
            Vec2::new(lo.x, lo.y),
            Vec2::new(hi.x, lo.y),
            Vec2::new(lo.x, hi.y),
            Vec2::new(hi.x, lo.y),
            Vec2::new(hi.x, hi.y),
            Vec2::new(lo.x, hi.y),
        ]
    }
}
