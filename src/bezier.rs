//! CSS-like cubic Bézier easing curves for the animation timeline.

use serde::{Deserialize, Serialize};

/// A cubic Bézier easing curve with fixed endpoints `(0,0)` and `(1,1)`.
///
/// `(x1, y1)` and `(x2, y2)` are the two free control points, exactly as in
/// CSS `cubic-bezier(x1, y1, x2, y2)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CubicBezier {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Default for CubicBezier {
    /// CSS `ease`.
    fn default() -> Self {
        Self::EASE
    }
}

impl CubicBezier {
    /// CSS `ease` == cubic-bezier(0.25, 0.1, 0.25, 1.0)
    pub const EASE: CubicBezier = CubicBezier::new(0.25, 0.10, 0.25, 1.00);

    pub const LINEAR: CubicBezier = CubicBezier::new(0.0, 0.0, 1.0, 1.0);

    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Map normalised time `u` in `[0,1]` to eased progress.
    pub fn ease(&self, u: f64) -> f64 {
        // Polynomial coefficients for x(t) and y(t) with endpoints at (0,0)
        // and (1,1): B(t) = ((a*t + b)*t + c)*t
        let cx = 3.0 * self.x1;
        let bx = 3.0 * (self.x2 - self.x1) - cx;
        let ax = 1.0 - cx - bx;

        let cy = 3.0 * self.y1;
        let by = 3.0 * (self.y2 - self.y1) - cy;
        let ay = 1.0 - cy - by;

        let u = u.clamp(0.0, 1.0);
        let t = solve_t_for_x(u, ax, bx, cx);
        sample_curve(ay, by, cy, t)
    }

    /// Interpolate between two scalars along this curve.
    pub fn interpolate(&self, a: f64, b: f64, u: f64) -> f64 {
        a + (b - a) * self.ease(u)
    }
}

#[inline]
fn sample_curve(a: f64, b: f64, c: f64, t: f64) -> f64 {
    ((a * t + b) * t + c) * t
}

/// Solve x(t) = u for t in [0,1].
fn solve_t_for_x(u: f64, ax: f64, bx: f64, cx: f64) -> f64 {
    // Newton-Raphson
    let mut t = u;
    for _ in 0..8 {
        let x = sample_curve(ax, bx, cx, t) - u;
        if x.abs() < 1e-9 {
            return t;
        }
        let dx = (3.0 * ax * t + 2.0 * bx) * t + cx;
        if dx.abs() < 1e-9 {
            break;
        }
        t -= x / dx;
        if !(0.0..=1.0).contains(&t) {
            break;
        }
    }

    // Bisection fallback
    let mut lo = 0.0;
    let mut hi = 1.0;
    t = u;
    for _ in 0..48 {
        let x = sample_curve(ax, bx, cx, t);
        if (x - u).abs() < 1e-10 {
            return t;
        }
        if x < u {
            lo = t;
        } else {
            hi = t;
        }
        t = 0.5 * (lo + hi);
    }
    t
}
