//! The two ways an overview expresses its zoom level.
//!
//! * [`GridZoom`] animates the size of the whole grid: at `S·N` one tile
//!   fills the output, at `S` the full grid does.
//! * [`ScaleZoom`] keeps every tile at output size and animates a scale
//!   factor instead, panning with the swipe.
//!
//! Both share the session's position property; [`Zoom`] dispatches each
//! geometry formula to the active strategy.

use crate::animation::{AnimatedVar, AnimationConfig, AnimationStep};
use crate::geometry::{lerp, lerp_per_axis, lerp_vec, Vec2};
use std::time::Duration;

/// Accumulator components are kept strictly inside `(0, 1)` in scale mode.
const SCALE_ACC_MIN: f64 = 0.0001;
const SCALE_ACC_MAX: f64 = 0.9999;

/// Floor of the grid-mode accumulator.
const GRID_ACC_FLOOR: f64 = 0.01;

/// Peak opacity of the hovered-tile highlight.
const HIGHLIGHT_ALPHA: f64 = 0.3;

/// Which zoom strategy a session uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomKind {
    Grid,
    Scale,
}

/// Output geometry and grid dimensions, fixed for a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridMetrics {
    /// Side length `N`.
    pub side: usize,
    /// Logical output size `S`.
    pub output_size: Vec2,
    /// Output scale `σ`.
    pub output_scale: f64,
}

impl GridMetrics {
    pub fn tile_count(&self) -> usize {
        self.side * self.side
    }

    /// `(col, row)` of a tile index.
    pub fn cell(&self, index: usize) -> Vec2 {
        Vec2::new((index % self.side) as f64, (index / self.side) as f64)
    }

    /// Fractional grid position of a tile, each axis in `[0, 1]`.
    pub fn fraction(&self, index: usize) -> Vec2 {
        self.cell(index) / (self.side - 1) as f64
    }

    /// Pixel offset of a tile's origin inside the zoomed-in grid, i.e. the
    /// negated position that puts that tile on screen.
    pub fn tile_offset(&self, index: usize) -> Vec2 {
        self.cell(index).mul_vec(self.output_size) * self.output_scale
    }

    /// Tile index of a `(col, row)` pair, clamping each axis into the grid.
    pub fn index_of(&self, col: f64, row: f64) -> usize {
        let max = (self.side - 1) as f64;
        let col = col.floor().clamp(0.0, max) as usize;
        let row = row.floor().clamp(0.0, max) as usize;
        col + row * self.side
    }

    /// Tile under an output-local point when the grid fills the output.
    pub fn tile_at(&self, local: Vec2) -> usize {
        let cell = local.div_vec(self.output_size) * self.side as f64;
        self.index_of(cell.x, cell.y)
    }
}

/// What a swipe end commits to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeOutcome {
    /// Stay open with the full grid showing.
    Open,
    /// Zoom back into a tile and tear down.
    Close,
}

/// Grid-size zoom.
#[derive(Debug, Clone)]
pub struct GridZoom {
    size: AnimatedVar<Vec2>,
}

impl GridZoom {
    pub fn size(&self) -> &AnimatedVar<Vec2> {
        &self.size
    }

    #[allow(clippy::too_many_arguments)]
    fn swipe_update(
        &mut self,
        pos: &mut AnimatedVar<Vec2>,
        acc: &mut Vec2,
        delta: Vec2,
        focused: usize,
        m: &GridMetrics,
        distance: f64,
        positive: bool,
    ) {
        acc.y += if positive { delta.y } else { -delta.y };
        if acc.y <= GRID_ACC_FLOOR {
            acc.y = GRID_ACC_FLOOR;
        }

        let p = 1.0 - (acc.y / distance).clamp(0.0, 1.0);
        let s = m.output_size;
        self.size.warp(lerp_vec(s, s * m.side as f64, p));
        pos.warp(lerp_vec(Vec2::ZERO, -m.tile_offset(focused), p));
    }

    /// How far the grid is zoomed out, `0.0` (one tile) to `1.0` (full grid).
    pub fn zoomed_out(&self, m: &GridMetrics) -> f64 {
        let min = m.output_size.x;
        let max = m.output_size.x * m.side as f64;
        1.0 - (self.size.value().x - min) / (max - min)
    }
}

/// Scale-factor zoom.
#[derive(Debug, Clone)]
pub struct ScaleZoom {
    scale: AnimatedVar<f64>,
    zoom_scale: f64,
}

impl ScaleZoom {
    pub fn scale(&self) -> &AnimatedVar<f64> {
        &self.scale
    }

    fn swipe_update(
        &mut self,
        pos: &mut AnimatedVar<Vec2>,
        acc: &mut Vec2,
        delta: Vec2,
        m: &GridMetrics,
        distance: f64,
    ) {
        *acc = (*acc - delta / distance).clamp(SCALE_ACC_MIN, SCALE_ACC_MAX);

        let full = m.output_size * m.output_scale;
        let pos_max = full * (m.side as f64 * self.scale.value()) - full;
        pos.warp(lerp_per_axis(Vec2::ZERO, -pos_max, *acc));

        if self.scale.goal() != self.zoom_scale {
            self.scale.set_target(self.zoom_scale);
        }
    }
}

/// The zoom strategy of a session.
#[derive(Debug, Clone)]
pub enum Zoom {
    Grid(GridZoom),
    Scale(ScaleZoom),
}

impl Zoom {
    /// Create the strategy in its fully-zoomed-in state.
    pub fn new(kind: ZoomKind, m: &GridMetrics, anim: AnimationConfig, zoom_scale: f64) -> Self {
        match kind {
            ZoomKind::Grid => Zoom::Grid(GridZoom {
                size: AnimatedVar::new(m.output_size * m.side as f64, anim),
            }),
            ZoomKind::Scale => Zoom::Scale(ScaleZoom {
                scale: AnimatedVar::new(1.0, anim),
                zoom_scale,
            }),
        }
    }

    pub fn kind(&self) -> ZoomKind {
        match self {
            Zoom::Grid(_) => ZoomKind::Grid,
            Zoom::Scale(_) => ZoomKind::Scale,
        }
    }

    pub fn advance(&mut self, dt: Duration) -> AnimationStep {
        match self {
            Zoom::Grid(g) => g.size.advance(dt),
            Zoom::Scale(s) => s.scale.advance(dt),
        }
    }

    /// Apply one swipe delta, warping the animated geometry.
    #[allow(clippy::too_many_arguments)]
    pub fn swipe_update(
        &mut self,
        pos: &mut AnimatedVar<Vec2>,
        acc: &mut Vec2,
        delta: Vec2,
        focused: usize,
        m: &GridMetrics,
        distance: f64,
        positive: bool,
    ) {
        match self {
            Zoom::Grid(g) => g.swipe_update(pos, acc, delta, focused, m, distance, positive),
            Zoom::Scale(s) => s.swipe_update(pos, acc, delta, m, distance),
        }
    }

    /// Decide how a swipe ends.  Grid zoom stays open only when strictly
    /// more than half zoomed out; scale zoom always closes.
    pub fn swipe_outcome(&self, m: &GridMetrics) -> SwipeOutcome {
        match self {
            Zoom::Grid(g) if g.zoomed_out(m) > 0.5 => SwipeOutcome::Open,
            _ => SwipeOutcome::Close,
        }
    }

    /// Start easing towards the full grid.  Returns `false` for strategies
    /// that have no zoomed-out resting state.
    pub fn animate_open(&mut self, pos: &mut AnimatedVar<Vec2>, m: &GridMetrics) -> bool {
        match self {
            Zoom::Grid(g) => {
                g.size.set_target(m.output_size);
                pos.set_target(Vec2::ZERO);
                true
            }
            Zoom::Scale(_) => false,
        }
    }

    /// Start easing into tile `index`.
    pub fn animate_close(&mut self, pos: &mut AnimatedVar<Vec2>, index: usize, m: &GridMetrics) {
        pos.set_target(-m.tile_offset(index));
        match self {
            Zoom::Grid(g) => g.size.set_target(m.output_size * m.side as f64),
            Zoom::Scale(s) => s.scale.set_target(1.0),
        }
    }

    /// Tile under the pointer (grid zoom) or under the output centre (scale
    /// zoom) for the current geometry.
    pub fn hovered(&self, pos: Vec2, pointer: Vec2, m: &GridMetrics) -> usize {
        match self {
            Zoom::Grid(g) => {
                let cell = (pointer - pos).div_vec(g.size.value()) * m.side as f64;
                m.index_of(cell.x, cell.y)
            }
            Zoom::Scale(s) => {
                let centre = m.output_size / 2.0 - pos / s.scale.value();
                let cell = centre.div_vec(m.output_size);
                m.index_of(cell.x, cell.y)
            }
        }
    }

    /// Current on-screen tile size and gap (logical px).
    ///
    /// The grid gap grows with the opening animation and shrinks with the
    /// closing one; scale zoom has no gap.
    pub fn tile_layout(&self, closing: bool, gap_size: f64, m: &GridMetrics) -> (Vec2, f64) {
        match self {
            Zoom::Grid(g) => {
                let pct = g.size.percent();
                let gap = (if closing { 1.0 - pct } else { pct }) * gap_size;
                let n = m.side as f64;
                let tile = (g.size.value() - Vec2::splat(gap * (n - 1.0))) / n;
                (tile, gap)
            }
            Zoom::Scale(s) => (m.output_size * s.scale.value(), 0.0),
        }
    }

    /// Opacity of the hovered-tile highlight, if this strategy draws one.
    pub fn highlight_alpha(&self, m: &GridMetrics) -> Option<f64> {
        match self {
            Zoom::Grid(g) => {
                let depth = m.output_size.x / (g.size.value().x / m.side as f64) - 2.0;
                Some(lerp(0.0, HIGHLIGHT_ALPHA, depth.clamp(0.0, 1.0)))
            }
            Zoom::Scale(_) => None,
        }
    }

    /// Extent of the whole grid, used to locate damage.
    pub fn extent(&self, m: &GridMetrics) -> Vec2 {
        match self {
            Zoom::Grid(g) => g.size.value(),
            Zoom::Scale(_) => m.output_size * m.output_scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bezier::CubicBezier;

    fn metrics() -> GridMetrics {
        GridMetrics {
            side: 3,
            output_size: Vec2::new(1920.0, 1080.0),
            output_scale: 1.0,
        }
    }

    fn anim() -> AnimationConfig {
        AnimationConfig {
            duration_ms: 100,
            curve: CubicBezier::LINEAR,
        }
    }

    #[test]
    fn metrics_cells_and_offsets() {
        let m = metrics();
        assert_eq!(m.cell(5), Vec2::new(2.0, 1.0));
        assert_eq!(m.fraction(5), Vec2::new(1.0, 0.5));
        assert_eq!(m.tile_offset(4), Vec2::new(1920.0, 1080.0));
        assert_eq!(m.index_of(-1.0, 7.0), 6);
        assert_eq!(m.tile_at(Vec2::new(1900.0, 10.0)), 2);
    }

    #[test]
    fn grid_swipe_warps_size_and_position() {
        let m = metrics();
        let mut zoom = Zoom::new(ZoomKind::Grid, &m, anim(), 0.9);
        let mut pos = AnimatedVar::new(-m.tile_offset(4), anim());
        let mut acc = m.fraction(4);

        // Half the gesture distance: halfway between grid and single tile.
        zoom.swipe_update(&mut pos, &mut acc, Vec2::new(0.0, 99.5), 4, &m, 200.0, true);
        assert_eq!(acc.y, 100.0);
        let Zoom::Grid(g) = &zoom else {
            panic!("expected grid zoom")
        };
        assert_eq!(g.size().value(), Vec2::new(3840.0, 2160.0));
        assert!(!g.size().is_animating());
        assert_eq!(pos.value(), Vec2::new(-960.0, -540.0));
    }

    #[test]
    fn grid_accumulator_never_reaches_zero() {
        let m = metrics();
        let mut zoom = Zoom::new(ZoomKind::Grid, &m, anim(), 0.9);
        let mut pos = AnimatedVar::new(Vec2::ZERO, anim());
        let mut acc = Vec2::ZERO;
        for dy in [-50.0, 0.0, -0.01, 3.0, -1000.0] {
            zoom.swipe_update(&mut pos, &mut acc, Vec2::new(0.0, dy), 0, &m, 200.0, true);
            assert!(acc.y > 0.0, "accumulator hit zero after dy={dy}");
        }
    }

    #[test]
    fn scale_swipe_clamps_inside_unit_interval() {
        let m = metrics();
        let mut zoom = Zoom::new(ZoomKind::Scale, &m, anim(), 0.9);
        let mut pos = AnimatedVar::new(Vec2::ZERO, anim());
        let mut acc = Vec2::new(0.5, 0.5);
        for d in [
            Vec2::new(1000.0, -1000.0),
            Vec2::new(-5000.0, 5000.0),
            Vec2::new(0.0, 0.0),
        ] {
            zoom.swipe_update(&mut pos, &mut acc, d, 0, &m, 200.0, true);
            for v in [acc.x, acc.y] {
                assert!(v > 0.0 && v < 1.0, "component {v} out of range");
            }
        }
        let Zoom::Scale(s) = &zoom else {
            panic!("expected scale zoom")
        };
        assert_eq!(s.scale().goal(), 0.9);
    }

    fn assert_near(a: Vec2, b: Vec2) {
        assert!(
            (a.x - b.x).abs() < 1e-6 && (a.y - b.y).abs() < 1e-6,
            "{a:?} != {b:?}"
        );
    }

    #[test]
    fn scale_swipe_pans_across_the_scaled_grid() {
        let m = metrics();
        let mut zoom = Zoom::new(ZoomKind::Scale, &m, anim(), 0.9);
        let mut pos = AnimatedVar::new(-m.tile_offset(4), anim());
        let mut acc = m.fraction(4);

        // At scale 1 the grid overhangs the output by 2·S.
        zoom.swipe_update(&mut pos, &mut acc, Vec2::new(20.0, 20.0), 4, &m, 200.0, true);
        assert_near(acc, Vec2::new(0.4, 0.4));
        assert_near(pos.value(), Vec2::new(-1536.0, -864.0));
        assert!(!pos.is_animating());

        // Once the scale settles the overhang is N·S·0.9 − S.
        assert_eq!(zoom.advance(Duration::from_millis(100)), AnimationStep::Completed);
        zoom.swipe_update(&mut pos, &mut acc, Vec2::ZERO, 4, &m, 200.0, true);
        assert_near(pos.value(), Vec2::new(-0.4 * 3264.0, -0.4 * 1836.0));

        let (tile, gap) = zoom.tile_layout(false, 10.0, &m);
        assert_near(tile, Vec2::new(1728.0, 972.0));
        assert_eq!(gap, 0.0);
        assert_eq!(zoom.highlight_alpha(&m), None);
    }

    #[test]
    fn midpoint_swipe_end_closes() {
        let m = metrics();
        let mut zoom = Zoom::new(ZoomKind::Grid, &m, anim(), 0.9);
        if let Zoom::Grid(g) = &mut zoom {
            g.size.warp(Vec2::new(3840.0, 2160.0));
        }
        assert_eq!(zoom.swipe_outcome(&m), SwipeOutcome::Close);

        if let Zoom::Grid(g) = &mut zoom {
            g.size.warp(Vec2::new(3800.0, 2137.5));
        }
        assert_eq!(zoom.swipe_outcome(&m), SwipeOutcome::Open);
    }

    #[test]
    fn scale_swipe_end_always_closes() {
        let m = metrics();
        let zoom = Zoom::new(ZoomKind::Scale, &m, anim(), 0.5);
        assert_eq!(zoom.swipe_outcome(&m), SwipeOutcome::Close);
    }

    #[test]
    fn hovered_tile_follows_pointer_in_full_grid() {
        let m = metrics();
        let mut zoom = Zoom::new(ZoomKind::Grid, &m, anim(), 0.9);
        if let Zoom::Grid(g) = &mut zoom {
            g.size.warp(m.output_size);
        }
        assert_eq!(zoom.hovered(Vec2::ZERO, Vec2::new(1300.0, 400.0), &m), 5);
    }

    #[test]
    fn scale_hover_tracks_the_output_centre() {
        let m = metrics();
        let zoom = Zoom::new(ZoomKind::Scale, &m, anim(), 0.9);
        assert_eq!(zoom.hovered(-m.tile_offset(7), Vec2::ZERO, &m), 7);
    }

    #[test]
    fn highlight_is_strongest_on_the_full_grid() {
        let m = metrics();
        let mut zoom = Zoom::new(ZoomKind::Grid, &m, anim(), 0.9);
        assert_eq!(zoom.highlight_alpha(&m), Some(0.0));
        if let Zoom::Grid(g) = &mut zoom {
            g.size.warp(m.output_size);
        }
        let alpha = zoom.highlight_alpha(&m).unwrap();
        assert!((alpha - 0.3).abs() < 1e-9);
        assert_eq!(Zoom::new(ZoomKind::Scale, &m, anim(), 0.9).highlight_alpha(&m), None);
    }

    #[test]
    fn gap_follows_animation_progress() {
        let m = metrics();
        let mut zoom = Zoom::new(ZoomKind::Grid, &m, anim(), 0.9);
        let mut pos = AnimatedVar::new(Vec2::ZERO, anim());
        assert!(zoom.animate_open(&mut pos, &m));
        let (_, gap) = zoom.tile_layout(false, 10.0, &m);
        assert_eq!(gap, 0.0);
        zoom.advance(Duration::from_millis(50));
        let (_, gap) = zoom.tile_layout(false, 10.0, &m);
        assert!((gap - 5.0).abs() < 1e-9);
        let (_, gap) = zoom.tile_layout(true, 10.0, &m);
        assert!((gap - 5.0).abs() < 1e-9);
    }
}
