//! Bounded regions used by every spatial query.
//!
//! `Rect` and `Circle` live on the integer pixel lattice with inclusive edges.
//! `Segment` and `Quad` are float shapes used for sight checks; they treat a
//! `Rect` as the pixel area `[x, x + width] x [y, y + height]`.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::coords::{BlockCoord, ChunkKey};

/// Axis-aligned rectangle with inclusive `right`/`bottom` edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const EMPTY: Rect = Rect::new(0, 0, 0, 0);

    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Smallest rectangle containing both points (inclusive).
    pub fn from_points(a: (i32, i32), b: (i32, i32)) -> Self {
        let x = a.0.min(b.0);
        let y = a.1.min(b.1);
        Self::new(x, y, (a.0 - b.0).abs() + 1, (a.1 - b.1).abs() + 1)
    }

    /// Minimal rectangle enclosing `a` and `b`.
    pub fn union(a: Rect, b: Rect) -> Rect {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        let right = (a.x + a.width).max(b.x + b.width);
        let bottom = (a.y + a.height).max(b.y + b.height);
        Rect::new(x, y, right - x, bottom - y)
    }

    #[inline]
    pub fn left(&self) -> i32 {
        self.x
    }

    #[inline]
    pub fn top(&self) -> i32 {
        self.y
    }

    #[inline]
    pub fn right(&self) -> i32 {
        self.x + self.width - 1
    }

    #[inline]
    pub fn bottom(&self) -> i32 {
        self.y + self.height - 1
    }

    #[inline]
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x <= other.right()
            && self.right() >= other.x
            && self.y <= other.bottom()
            && self.bottom() >= other.y
    }

    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }

    /// Grow by `amount` pixels on every side.
    pub fn inflate(&self, amount: i32) -> Rect {
        Rect::new(
            self.x - amount,
            self.y - amount,
            self.width + 2 * amount,
            self.height + 2 * amount,
        )
    }

    /// Translate a rectangle given relative to an anchor point.
    pub fn offset(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Top-left and bottom-right blocks touched by this rectangle.
    pub fn block_span(&self, block_size: i32) -> (BlockCoord, BlockCoord) {
        (
            BlockCoord::from_real(self.left(), self.top(), block_size),
            BlockCoord::from_real(self.right(), self.bottom(), block_size),
        )
    }

    /// Top-left and bottom-right chunks touched by this rectangle.
    pub fn chunk_span(&self, chunk_pixel_size: i32) -> (ChunkKey, ChunkKey) {
        (
            ChunkKey::from_real(self.left(), self.top(), chunk_pixel_size),
            ChunkKey::from_real(self.right(), self.bottom(), chunk_pixel_size),
        )
    }

    fn area_min(&self) -> Vec2 {
        Vec2::new(self.x as f32, self.y as f32)
    }

    fn area_max(&self) -> Vec2 {
        Vec2::new((self.x + self.width) as f32, (self.y + self.height) as f32)
    }
}

/// Circle on the pixel lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Circle {
    pub center_x: i32,
    pub center_y: i32,
    pub radius: i32,
}

impl Circle {
    pub const fn new(center_x: i32, center_y: i32, radius: i32) -> Self {
        Self {
            center_x,
            center_y,
            radius,
        }
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        let dx = (x - self.center_x) as i64;
        let dy = (y - self.center_y) as i64;
        dx * dx + dy * dy <= self.radius_sq()
    }

    /// Exact test against the point of `rect` closest to the centre.
    pub fn intersects(&self, rect: &Rect) -> bool {
        let closest_x = self.center_x.clamp(rect.left(), rect.right().max(rect.left()));
        let closest_y = self.center_y.clamp(rect.top(), rect.bottom().max(rect.top()));
        self.contains(closest_x, closest_y)
    }

    /// Square covering every lattice point of the circle.
    pub fn bounding_rect(&self) -> Rect {
        Rect::new(
            self.center_x - self.radius,
            self.center_y - self.radius,
            2 * self.radius + 1,
            2 * self.radius + 1,
        )
    }

    fn radius_sq(&self) -> i64 {
        (self.radius as i64) * (self.radius as i64)
    }
}

/// Query shape accepted by the collision engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Rect(Rect),
    Circle(Circle),
}

impl Shape {
    pub fn bounding_rect(&self) -> Rect {
        match self {
            Shape::Rect(rect) => *rect,
            Shape::Circle(circle) => circle.bounding_rect(),
        }
    }

    pub fn intersects(&self, rect: &Rect) -> bool {
        match self {
            Shape::Rect(own) => own.intersects(rect),
            Shape::Circle(circle) => circle.intersects(rect),
        }
    }
}

impl From<Rect> for Shape {
    fn from(rect: Rect) -> Self {
        Shape::Rect(rect)
    }
}

impl From<Circle> for Shape {
    fn from(circle: Circle) -> Self {
        Shape::Circle(circle)
    }
}

/// Straight line between two real positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: Vec2,
    pub end: Vec2,
}

impl Segment {
    pub fn new(start: Vec2, end: Vec2) -> Self {
        Self { start, end }
    }

    /// Liang-Barsky clip against the pixel area of `rect`.
    pub fn intersects_rect(&self, rect: &Rect) -> bool {
        let min = rect.area_min();
        let max = rect.area_max();
        let d = self.end - self.start;
        let mut t0 = 0.0_f32;
        let mut t1 = 1.0_f32;

        let edges = [
            (-d.x, self.start.x - min.x),
            (d.x, max.x - self.start.x),
            (-d.y, self.start.y - min.y),
            (d.y, max.y - self.start.y),
        ];

        for (p, q) in edges {
            if p == 0.0 {
                if q < 0.0 {
                    return false;
                }
                continue;
            }
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return false;
                }
                t0 = t0.max(r);
            } else {
                if r < t0 {
                    return false;
                }
                t1 = t1.min(r);
            }
        }
        true
    }

    /// The segment widened to `width` pixels, as a quad.
    pub fn thicken(&self, width: f32) -> Quad {
        let half = width / 2.0;
        let dir = (self.end - self.start).normalize_or_zero();
        if dir == Vec2::ZERO {
            let p = self.start;
            return Quad {
                corners: [
                    p + Vec2::new(-half, -half),
                    p + Vec2::new(half, -half),
                    p + Vec2::new(half, half),
                    p + Vec2::new(-half, half),
                ],
            };
        }
        let normal = dir.perp() * half;
        Quad {
            corners: [
                self.start + normal,
                self.end + normal,
                self.end - normal,
                self.start - normal,
            ],
        }
    }
}

/// Convex quadrilateral, corners in winding order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub corners: [Vec2; 4],
}

impl Quad {
    /// Separating-axis test against the pixel area of `rect`.
    pub fn intersects_rect(&self, rect: &Rect) -> bool {
        let min = rect.area_min();
        let max = rect.area_max();
        let rect_corners = [
            min,
            Vec2::new(max.x, min.y),
            max,
            Vec2::new(min.x, max.y),
        ];

        let mut axes = vec![Vec2::X, Vec2::Y];
        for i in 0..2 {
            let edge = self.corners[i + 1] - self.corners[i];
            if edge != Vec2::ZERO {
                axes.push(edge.perp());
            }
        }

        axes.iter().all(|axis| {
            let (a_min, a_max) = project(&self.corners, *axis);
            let (b_min, b_max) = project(&rect_corners, *axis);
            a_min <= b_max && b_min <= a_max
        })
    }
}

fn project(points: &[Vec2; 4], axis: Vec2) -> (f32, f32) {
    points.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), p| {
        let d = p.dot(axis);
        (lo.min(d), hi.max(d))
    })
}
