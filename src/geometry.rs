//! Small geometry vocabulary shared by the session, the zoom strategies and
//! the renderer contract.
//!
//! Coordinates are `f64` in output-local space.  Logical sizes are
//! multiplied by the output scale where a pixel-space value is needed.

use std::ops::{Add, Div, Mul, Neg, Sub};

/// A 2-D vector (position or size).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Same value on both axes.
    pub const fn splat(v: f64) -> Self {
        Self { x: v, y: v }
    }

    /// Component-wise product.
    pub fn mul_vec(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x * other.x, self.y * other.y)
    }

    /// Component-wise quotient.
    pub fn div_vec(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x / other.x, self.y / other.y)
    }

    /// Clamp each component to `[min, max]`.
    pub fn clamp(self, min: f64, max: f64) -> Vec2 {
        Vec2::new(self.x.clamp(min, max), self.y.clamp(min, max))
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f64> for Vec2 {
    type Output = Vec2;
    fn div(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x / rhs, self.y / rhs)
    }
}

/// Linear interpolation between two scalars.
pub fn lerp(from: f64, to: f64, t: f64) -> f64 {
    (to - from) * t + from
}

/// Linear interpolation between two vectors with one shared factor.
pub fn lerp_vec(from: Vec2, to: Vec2, t: f64) -> Vec2 {
    Vec2::new(lerp(from.x, to.x, t), lerp(from.y, to.y, t))
}

/// Linear interpolation between two vectors with a per-axis factor.
pub fn lerp_per_axis(from: Vec2, to: Vec2, t: Vec2) -> Vec2 {
    Vec2::new(lerp(from.x, to.x, t.x), lerp(from.y, to.y, t.y))
}

/// An axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn from_pos_size(pos: Vec2, size: Vec2) -> Self {
        Self::new(pos.x, pos.y, size.x, size.y)
    }

    pub fn pos(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.w, self.h)
    }

    /// Scale origin and extent by `factor`.
    pub fn scale(self, factor: f64) -> Rect {
        Rect::new(
            self.x * factor,
            self.y * factor,
            self.w * factor,
            self.h * factor,
        )
    }

    pub fn translate(self, by: Vec2) -> Rect {
        Rect::new(self.x + by.x, self.y + by.y, self.w, self.h)
    }

    /// Snap to whole pixels, keeping the right/bottom edge aligned too.
    pub fn round(self) -> Rect {
        let x = self.x.round();
        let y = self.y.round();
        let right = (self.x + self.w).round();
        let bottom = (self.y + self.h).round();
        Rect::new(x, y, right - x, bottom - y)
    }
}

/// Integer pixel extent of an offscreen target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

impl PixelSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Round a logical size to whole pixels (never below 1×1).
    pub fn from_vec(v: Vec2) -> Self {
        Self {
            width: v.x.round().max(1.0) as u32,
            height: v.y.round().max(1.0) as u32,
        }
    }

    pub fn as_vec(&self) -> Vec2 {
        Vec2::new(self.width as f64, self.height as f64)
    }
}

/// RGBA colour with channels in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);

    pub const fn rgba(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Decode a packed `0xAARRGGBB` value.
    pub fn from_argb(argb: u32) -> Self {
        let channel = |shift: u32| ((argb >> shift) & 0xFF) as f64 / 255.0;
        Self::rgba(channel(16), channel(8), channel(0), channel(24))
    }

    /// The same colour, fully opaque.
    pub fn strip_alpha(self) -> Self {
        Self { a: 1.0, ..self }
    }
}
