//! A single open overview on one output.
//!
//! An [`OverviewSession`] snapshots every workspace of the grid into an
//! offscreen tile, composites the tiles each frame using its animated
//! geometry, and tears itself down once the closing animation completes.
//!
//! # Lifecycle
//!
//! 1. [`open`](OverviewSession::open) scans the workspace layout, captures
//!    every tile and zooms into the tile of the active workspace.
//! 2. Every frame the host calls [`pre_render`](OverviewSession::pre_render)
//!    (hover tracking and tile refresh) and
//!    [`render`](OverviewSession::render) (composite).
//! 3. Swipe updates warp the geometry; a swipe end either commits to the
//!    full grid or closes.
//! 4. [`close`](OverviewSession::close) eases into the chosen tile, switches
//!    to its workspace and registers teardown on the position animation.
//!    [`advance`](OverviewSession::advance) reports
//!    [`SessionStatus::Finished`] once that animation completes; the owner
//!    then drops the session, which releases every framebuffer.
//!
//! The session holds no reference to the compositor or renderer; both are
//! passed into each call by the owning
//! [`OverviewController`](crate::controller::OverviewController).

pub mod zoom;

use crate::animation::{AnimatedVar, AnimationConfig, AnimationStep};
use crate::config::{Config, WorkspaceMethod};
use crate::geometry::{Color, PixelSize, Rect, Vec2};
use crate::layout::{scan_workspaces, tile_of};
use crate::traits::{
    Compositor, DamageOrigin, EventDisposition, Framebuffer, OutputInfo, RenderPass, Renderer,
    WorkspaceId, WorkspaceTransition,
};
use log::{debug, info};
use std::time::{Duration, Instant};
use zoom::{GridMetrics, SwipeOutcome, Zoom, ZoomKind};

/// Cursor shown while an overview is open.
pub const CURSOR_IMAGE: &str = "left_ptr";

/// Errors reported by overview operations.
#[derive(Debug, thiserror::Error)]
pub enum OverviewError {
    #[error("an overview is already open")]
    AlreadyOpen,
    #[error("a swipe is already in progress")]
    AlreadySwiping,
    #[error("no overview is open")]
    NotOpen,
    #[error("framebuffer allocation failed: {0}")]
    Allocation(String),
}

fn allocation_error<E: std::error::Error>(e: E) -> OverviewError {
    OverviewError::Allocation(e.to_string())
}

/// Configuration values a session snapshots when it opens.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub side: usize,
    pub gap_size: f64,
    pub background: Color,
    pub workspace_method: String,
    pub skip_empty: bool,
    pub gesture_distance: f64,
    pub gesture_positive: bool,
    pub zoom_scale: f64,
    pub low_res_previews: bool,
    pub animation: AnimationConfig,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        let o = &config.overview;
        Self {
            side: o.side_length(),
            gap_size: o.gap_size as f64,
            background: Color::from_argb(o.bg_col),
            workspace_method: o.workspace_method.clone(),
            skip_empty: o.skip_empty,
            gesture_distance: o.gesture_distance(),
            gesture_positive: o.gesture_positive,
            zoom_scale: o.zoom_scale,
            low_res_previews: o.low_res_previews,
            animation: config.animation,
        }
    }
}

/// What to do when an animated property reaches its goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Completion {
    RedrawAll { low_res: bool },
    Destroy,
}

/// Result of [`OverviewSession::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Live,
    /// The closing animation finished; drop the session.
    Finished,
}

/// One grid cell: its workspace and the framebuffer holding its snapshot.
#[derive(Debug)]
pub struct WorkspaceTile<F> {
    workspace: Option<WorkspaceId>,
    captured: Option<WorkspaceId>,
    framebuffer: F,
    screen_rect: Rect,
}

impl<F> WorkspaceTile<F> {
    /// The workspace assigned by the layout scan (`None` = unassigned).
    pub fn workspace(&self) -> Option<WorkspaceId> {
        self.workspace
    }

    /// The workspace whose contents the tile shows, if it was live when
    /// last captured.
    pub fn captured(&self) -> Option<WorkspaceId> {
        self.captured
    }

    pub fn framebuffer(&self) -> &F {
        &self.framebuffer
    }

    /// Placement in the fully zoomed-out grid (logical px).
    pub fn screen_rect(&self) -> Rect {
        self.screen_rect
    }
}

/// An open overview.  See the [module docs](self).
pub struct OverviewSession<R: Renderer> {
    output: OutputInfo,
    metrics: GridMetrics,
    settings: SessionSettings,
    tiles: Vec<WorkspaceTile<R::Framebuffer>>,
    started_on: WorkspaceId,
    opened: usize,
    hovered: usize,
    close_requested: Option<usize>,
    accumulator: Vec2,
    pos: AnimatedVar<Vec2>,
    zoom: Zoom,
    on_size_complete: Option<Completion>,
    on_pos_complete: Option<Completion>,
    last_pointer: Vec2,
    closing: bool,
    fully_open: bool,
    gesture_commenced: bool,
}

impl<R: Renderer> OverviewSession<R> {
    /// Open an overview on the compositor's focused output.
    ///
    /// With `gesture` set the session starts fully zoomed into the current
    /// tile and waits for swipe updates; otherwise a grid-zoom session
    /// immediately eases out to the full grid.
    pub fn open<C: Compositor + ?Sized>(
        compositor: &mut C,
        renderer: &mut R,
        settings: SessionSettings,
        kind: ZoomKind,
        gesture: bool,
    ) -> Result<Self, OverviewError> {
        let output = compositor.focused_output();
        let metrics = GridMetrics {
            side: settings.side,
            output_size: output.size,
            output_scale: output.scale,
        };
        let started_on = compositor.active_workspace(&output.name);
        let method = WorkspaceMethod::parse(&settings.workspace_method, &*compositor, started_on);
        let assignments = scan_workspaces(
            compositor,
            &output.name,
            method,
            settings.side,
            settings.skip_empty,
        );

        let fb_size = if settings.low_res_previews {
            low_res_size(&metrics)
        } else {
            output.pixel_size()
        };
        let n = settings.side as f64;
        let gap = settings.gap_size;
        let tile_size = (output.size - Vec2::splat(gap * (n - 1.0))) / n;

        let mut tiles = Vec::with_capacity(metrics.tile_count());
        for (i, workspace) in assignments.iter().enumerate() {
            let cell = metrics.cell(i);
            tiles.push(WorkspaceTile {
                workspace: *workspace,
                captured: workspace.filter(|id| compositor.workspace_exists(*id)),
                framebuffer: renderer.allocate(fb_size).map_err(allocation_error)?,
                screen_rect: Rect::from_pos_size(
                    cell.mul_vec(tile_size) + cell * gap,
                    tile_size,
                ),
            });
        }

        let opened = tile_of(&assignments, started_on).unwrap_or_else(|| {
            info!("workspace {} is not in the grid, opening on tile 0", started_on);
            0
        });

        let zoom = Zoom::new(kind, &metrics, settings.animation, settings.zoom_scale);
        let pos = AnimatedVar::new(-metrics.tile_offset(opened), settings.animation);
        let low_res = settings.low_res_previews;

        let mut session = Self {
            last_pointer: output.to_local(compositor.pointer_position()),
            output,
            metrics,
            settings,
            tiles,
            started_on,
            opened,
            hovered: opened,
            close_requested: None,
            accumulator: metrics.fraction(opened),
            pos,
            zoom,
            on_size_complete: None,
            on_pos_complete: None,
            closing: false,
            fully_open: false,
            gesture_commenced: false,
        };

        for i in 0..session.tiles.len() {
            session.capture(i, low_res, compositor, renderer)?;
        }

        if !gesture && session.zoom.animate_open(&mut session.pos, &session.metrics) {
            session.on_size_complete = Some(Completion::RedrawAll { low_res: true });
        }

        compositor.set_cursor_image(CURSOR_IMAGE);

        info!(
            "overview opened on {} ({:?}, {}x{}, workspace {} in tile {})",
            session.output.name,
            kind,
            session.metrics.side,
            session.metrics.side,
            started_on,
            opened
        );
        Ok(session)
    }

    //  Accessors

    pub fn output(&self) -> &OutputInfo {
        &self.output
    }

    pub fn kind(&self) -> ZoomKind {
        self.zoom.kind()
    }

    pub fn zoom(&self) -> &Zoom {
        &self.zoom
    }

    pub fn metrics(&self) -> &GridMetrics {
        &self.metrics
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn tiles(&self) -> &[WorkspaceTile<R::Framebuffer>] {
        &self.tiles
    }

    pub fn started_on(&self) -> WorkspaceId {
        self.started_on
    }

    pub fn opened_tile(&self) -> usize {
        self.opened
    }

    pub fn hovered_tile(&self) -> usize {
        self.hovered
    }

    pub fn close_requested(&self) -> Option<usize> {
        self.close_requested
    }

    pub fn accumulator(&self) -> Vec2 {
        self.accumulator
    }

    pub fn position(&self) -> &AnimatedVar<Vec2> {
        &self.pos
    }

    pub fn is_closing(&self) -> bool {
        self.closing
    }

    pub fn is_fully_open(&self) -> bool {
        self.fully_open
    }

    pub fn gesture_commenced(&self) -> bool {
        self.gesture_commenced
    }

    /// Treat the grid as fully shown: swipes then zoom around the hovered
    /// tile instead of the opened one.
    pub fn mark_fully_open(&mut self) {
        self.fully_open = true;
    }

    //  Tile capture

    /// Render tile `index` into its framebuffer.
    fn capture<C: Compositor + ?Sized>(
        &mut self,
        index: usize,
        low_res: bool,
        compositor: &mut C,
        renderer: &mut R,
    ) -> Result<(), OverviewError> {
        let target = if low_res {
            low_res_size(&self.metrics)
        } else {
            self.output.pixel_size()
        };

        let output = &self.output;
        let name = output.name.as_str();
        let started_on = self.started_on;
        let tile = &mut self.tiles[index];

        if tile.framebuffer.size() != target {
            tile.framebuffer = renderer.allocate(target).map_err(allocation_error)?;
        }

        let viewport = Rect::from_pos_size(Vec2::ZERO, target.as_vec());
        renderer.begin_capture(output, &tile.framebuffer);
        renderer.clear(Color::BLACK);

        let special = compositor.active_special_workspace(name);
        if special.is_some() {
            compositor.set_active_special_workspace(name, None);
        }
        compositor.set_workspace_visible(started_on, false);

        tile.captured = tile.captured.filter(|id| compositor.workspace_exists(*id));
        match tile.captured {
            Some(id) => {
                compositor.set_active_workspace(name, id);
                compositor.start_workspace_transition(id, WorkspaceTransition::In, true);
                compositor.set_workspace_visible(id, true);
                let show_special = id == started_on && special.is_some();
                if show_special {
                    compositor.set_active_special_workspace(name, special);
                }

                renderer.render_workspace(
                    output,
                    Some(id),
                    Instant::now(),
                    viewport,
                    RenderPass::Capture,
                );

                compositor.set_workspace_visible(id, false);
                compositor.start_workspace_transition(id, WorkspaceTransition::Out, true);
                if show_special {
                    compositor.set_active_special_workspace(name, None);
                }
            }
            None => renderer.render_workspace(
                output,
                None,
                Instant::now(),
                viewport,
                RenderPass::Capture,
            ),
        }

        renderer.end_capture();

        if special.is_some() {
            compositor.set_active_special_workspace(name, special);
        }
        compositor.set_active_workspace(name, started_on);
        compositor.set_workspace_visible(started_on, true);
        compositor.start_workspace_transition(started_on, WorkspaceTransition::In, true);
        Ok(())
    }

    /// Refresh one tile.  `low_res` only takes effect when low-resolution
    /// previews are enabled.
    pub fn redraw_id<C: Compositor + ?Sized>(
        &mut self,
        index: usize,
        low_res: bool,
        compositor: &mut C,
        renderer: &mut R,
    ) -> Result<(), OverviewError> {
        self.check_stale(compositor, renderer)?;
        let index = index.min(self.tiles.len() - 1);
        let low_res = low_res && self.settings.low_res_previews;
        self.capture(index, low_res, compositor, renderer)
    }

    /// Refresh every tile.
    pub fn redraw_all<C: Compositor + ?Sized>(
        &mut self,
        low_res: bool,
        compositor: &mut C,
        renderer: &mut R,
    ) -> Result<(), OverviewError> {
        for i in 0..self.tiles.len() {
            self.redraw_id(i, low_res, compositor, renderer)?;
        }
        Ok(())
    }

    /// Refresh the tiles that show a live workspace.
    pub fn redraw_all_valid<C: Compositor + ?Sized>(
        &mut self,
        low_res: bool,
        compositor: &mut C,
        renderer: &mut R,
    ) -> Result<(), OverviewError> {
        for i in 0..self.tiles.len() {
            if self.tiles[i].captured.is_some() {
                self.redraw_id(i, low_res, compositor, renderer)?;
            }
        }
        Ok(())
    }

    //  Reconciliation

    fn check_stale<C: Compositor + ?Sized>(
        &mut self,
        compositor: &mut C,
        renderer: &mut R,
    ) -> Result<(), OverviewError> {
        if !self.closing && compositor.active_workspace(&self.output.name) != self.started_on {
            self.on_workspace_change(compositor, renderer)?;
        }
        Ok(())
    }

    /// The active workspace changed behind the overview's back: collapse
    /// onto the new one.
    fn on_workspace_change<C: Compositor + ?Sized>(
        &mut self,
        compositor: &mut C,
        renderer: &mut R,
    ) -> Result<(), OverviewError> {
        let active = compositor.active_workspace(&self.output.name);
        info!(
            "workspace changed from {} to {} outside the overview, closing",
            self.started_on, active
        );

        if compositor.workspace_exists(self.started_on) {
            compositor.start_workspace_transition(
                self.started_on,
                WorkspaceTransition::Out,
                true,
            );
        }
        self.started_on = active;

        if let Some(i) = self.tiles.iter().position(|t| t.workspace == Some(active)) {
            self.opened = i;
        }
        self.close_requested = Some(self.opened);
        self.close(compositor, renderer)
    }

    //  Selection and close

    /// Close onto tile `index` unless the user picks another one first.
    pub fn request_close_tile(&mut self, index: usize) {
        if !self.closing {
            self.close_requested = Some(index.min(self.tiles.len() - 1));
        }
    }

    /// Remember the tile under the pointer as the close target.
    pub fn select_hovered_workspace(&mut self) {
        if self.closing {
            return;
        }
        self.close_requested = Some(self.metrics.tile_at(self.last_pointer));
    }

    /// Ease into the requested (or hovered) tile and switch to its
    /// workspace.  Calling it again while closing does nothing.
    pub fn close<C: Compositor + ?Sized>(
        &mut self,
        compositor: &mut C,
        renderer: &mut R,
    ) -> Result<(), OverviewError> {
        if self.closing {
            return Ok(());
        }

        let index = self
            .close_requested
            .unwrap_or(self.hovered)
            .min(self.tiles.len() - 1);

        self.zoom.animate_close(&mut self.pos, index, &self.metrics);
        self.closing = true;
        self.on_pos_complete = Some(Completion::Destroy);

        self.redraw_all(false, compositor, renderer)?;

        let name = self.output.name.clone();
        let old = compositor.active_workspace(&name);
        let target = self.tiles[index].workspace;
        debug!("closing onto tile {} ({:?})", index, target);

        if target != Some(old) {
            compositor.set_active_special_workspace(&name, None);
            let new = target.unwrap_or_else(|| compositor.next_empty_workspace(&name));
            compositor.change_workspace(&name, new);

            let now_active = compositor.active_workspace(&name);
            compositor.start_workspace_transition(now_active, WorkspaceTransition::In, true);
            compositor.start_workspace_transition(old, WorkspaceTransition::Out, true);
            self.started_on = now_active;
            info!("switched from workspace {} to {}", old, now_active);
        }
        Ok(())
    }

    //  Swipe

    /// Feed one swipe delta.  Ignored once the session is closing.
    pub fn on_swipe_update(&mut self, delta: Vec2, renderer: &mut R) {
        if self.closing {
            return;
        }
        let focused = if self.fully_open {
            self.hovered
        } else {
            self.opened
        };
        self.zoom.swipe_update(
            &mut self.pos,
            &mut self.accumulator,
            delta,
            focused,
            &self.metrics,
            self.settings.gesture_distance,
            self.settings.gesture_positive,
        );
        self.damage(renderer);
    }

    /// The fingers lifted: commit to the full grid or close.
    pub fn on_swipe_end<C: Compositor + ?Sized>(
        &mut self,
        compositor: &mut C,
        renderer: &mut R,
    ) -> Result<(), OverviewError> {
        if self.closing {
            return Ok(());
        }
        match self.zoom.swipe_outcome(&self.metrics) {
            SwipeOutcome::Close => self.close(compositor, renderer),
            SwipeOutcome::Open => {
                debug!("swipe committed to the full grid");
                self.zoom.animate_open(&mut self.pos, &self.metrics);
                self.on_size_complete = Some(Completion::RedrawAll { low_res: true });
                self.gesture_commenced = true;
                self.fully_open = true;
                Ok(())
            }
        }
    }

    //  Pointer

    /// Track the pointer.  `global` is in layout coordinates.
    pub fn on_pointer_move(&mut self, global: Vec2) -> EventDisposition {
        if self.closing {
            return EventDisposition::PassThrough;
        }
        self.last_pointer = self.output.to_local(global);
        EventDisposition::Consumed
    }

    /// A click or touch: close onto the tile under the pointer.
    pub fn on_pointer_select<C: Compositor + ?Sized>(
        &mut self,
        compositor: &mut C,
        renderer: &mut R,
    ) -> Result<EventDisposition, OverviewError> {
        if self.closing {
            return Ok(EventDisposition::PassThrough);
        }
        self.close_requested = Some(self.metrics.tile_at(self.last_pointer));
        self.close(compositor, renderer)?;
        Ok(EventDisposition::Consumed)
    }

    //  Frame

    /// Track the hovered tile and refresh live tiles.  Call once per frame
    /// before [`render`](Self::render).
    pub fn pre_render<C: Compositor + ?Sized>(
        &mut self,
        compositor: &mut C,
        renderer: &mut R,
    ) -> Result<(), OverviewError> {
        self.hovered = self
            .zoom
            .hovered(self.pos.value(), self.last_pointer, &self.metrics);
        self.redraw_id(self.hovered, true, compositor, renderer)?;
        self.redraw_all_valid(true, compositor, renderer)
    }

    /// Composite the grid for the live frame.
    pub fn render<C: Compositor + ?Sized>(
        &mut self,
        compositor: &mut C,
        renderer: &mut R,
    ) -> Result<(), OverviewError> {
        self.check_stale(compositor, renderer)?;

        let (tile, gap) = self
            .zoom
            .tile_layout(self.closing, self.settings.gap_size, &self.metrics);
        let highlight = self.zoom.highlight_alpha(&self.metrics);
        let pos = self.pos.value();

        renderer.clear(self.settings.background.strip_alpha());

        for (i, t) in self.tiles.iter().enumerate() {
            let cell = self.metrics.cell(i);
            let rect = Rect::from_pos_size(cell.mul_vec(tile) + cell * gap, tile)
                .scale(self.output.scale)
                .translate(pos)
                .round();
            renderer.blit(&t.framebuffer, rect, 1.0);

            if i == self.hovered {
                if let Some(alpha) = highlight {
                    renderer.fill_rect(rect, Color::rgba(1.0, 1.0, 1.0, alpha));
                }
            }
        }
        Ok(())
    }

    /// Damage from elsewhere hit the output: repaint it and the opened
    /// tile, and ask for a frame.
    pub fn on_damage_reported<C: Compositor + ?Sized>(
        &mut self,
        compositor: &mut C,
        renderer: &mut R,
    ) {
        self.damage(renderer);

        let n = self.metrics.side as f64;
        let gap = self.settings.gap_size;
        let tile = (self.zoom.extent(&self.metrics) - Vec2::splat(gap * (n - 1.0))) / n;
        let cell = self.metrics.cell(self.opened);
        let rect = Rect::from_pos_size(cell.mul_vec(tile) + cell * gap, tile)
            .translate(self.output.position);
        renderer.damage_rect(rect, DamageOrigin::Overview);

        compositor.schedule_frame(&self.output.name);
    }

    fn damage(&self, renderer: &mut R) {
        renderer.damage_output(&self.output, DamageOrigin::Overview);
    }

    //  Animation

    /// Move the animations forward by `dt` and run completion actions.
    pub fn advance<C: Compositor + ?Sized>(
        &mut self,
        dt: Duration,
        compositor: &mut C,
        renderer: &mut R,
    ) -> Result<SessionStatus, OverviewError> {
        let size_step = self.zoom.advance(dt);
        let pos_step = self.pos.advance(dt);

        if size_step != AnimationStep::Idle || pos_step != AnimationStep::Idle {
            self.damage(renderer);
        }

        if size_step == AnimationStep::Completed {
            if let Some(action) = self.on_size_complete.take() {
                if self.complete(action, compositor, renderer)? == SessionStatus::Finished {
                    return Ok(SessionStatus::Finished);
                }
            }
        }
        if pos_step == AnimationStep::Completed {
            if let Some(action) = self.on_pos_complete.take() {
                return self.complete(action, compositor, renderer);
            }
        }
        Ok(SessionStatus::Live)
    }

    fn complete<C: Compositor + ?Sized>(
        &mut self,
        action: Completion,
        compositor: &mut C,
        renderer: &mut R,
    ) -> Result<SessionStatus, OverviewError> {
        match action {
            Completion::RedrawAll { low_res } => {
                self.redraw_all(low_res, compositor, renderer)?;
                Ok(SessionStatus::Live)
            }
            Completion::Destroy => {
                info!("overview on {} finished closing", self.output.name);
                Ok(SessionStatus::Finished)
            }
        }
    }
}

/// Framebuffer size of a low-resolution tile: twice the grid cell.
fn low_res_size(m: &GridMetrics) -> PixelSize {
    PixelSize::from_vec(m.output_size / m.side as f64 * 2.0)
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{
        default_output, CompositorEvent, DrawOp, HeadlessCompositor, RecordingRenderer,
    };

    type Session = OverviewSession<RecordingRenderer>;

    fn settings() -> SessionSettings {
        SessionSettings::from_config(&Config::default())
    }

    fn backends(ids: &[WorkspaceId], active: WorkspaceId) -> (HeadlessCompositor, RecordingRenderer) {
        (
            HeadlessCompositor::new(default_output(), ids.iter().copied(), active),
            RecordingRenderer::new(),
        )
    }

    fn run_to_completion(
        session: &mut Session,
        c: &mut HeadlessCompositor,
        r: &mut RecordingRenderer,
    ) -> bool {
        for _ in 0..100 {
            if session.advance(Duration::from_millis(16), c, r).unwrap() == SessionStatus::Finished {
                return true;
            }
        }
        false
    }

    #[test]
    fn center_layout_opens_on_middle_tile() {
        let (mut c, mut r) = backends(&[3, 4, 5, 6, 7], 5);
        let s = Session::open(&mut c, &mut r, settings(), ZoomKind::Grid, false).unwrap();

        assert_eq!(s.tiles().len(), 9);
        assert_eq!(s.tiles()[4].workspace(), Some(5));
        assert_eq!(s.opened_tile(), 4);
        assert_eq!(s.accumulator(), Vec2::new(0.5, 0.5));
        assert_eq!(c.cursor_image(), Some(CURSOR_IMAGE));
        assert_eq!(r.live_framebuffers(), 9);

        // Only existing workspaces are captured; the rest show background.
        let captured: Vec<_> = s.tiles().iter().filter_map(|t| t.captured()).collect();
        assert_eq!(captured, vec![3, 4, 5, 6, 7]);
        let fb = s.tiles()[0].framebuffer().id();
        assert_eq!(r.contents(fb), Some(None));

        // Capture leaves the started-on workspace active.
        assert_eq!(c.active_workspace("HEADLESS-1"), 5);
    }

    #[test]
    fn opened_tile_matches_started_workspace() {
        for active in [1, 4, 9] {
            let (mut c, mut r) = backends(&[1, 2, 3, 4, 5, 6, 7, 8, 9], active);
            let s = Session::open(&mut c, &mut r, settings(), ZoomKind::Grid, true).unwrap();
            assert_eq!(s.tiles()[s.opened_tile()].workspace(), Some(s.started_on()));
        }
    }

    #[test]
    fn non_gesture_open_eases_to_full_grid() {
        let (mut c, mut r) = backends(&[5], 5);
        let mut s = Session::open(&mut c, &mut r, settings(), ZoomKind::Grid, false).unwrap();
        assert_eq!(s.position().value(), Vec2::new(-1920.0, -1080.0));
        assert_eq!(s.position().goal(), Vec2::ZERO);

        assert!(!run_to_completion(&mut s, &mut c, &mut r));
        assert_eq!(s.position().value(), Vec2::ZERO);
        let Zoom::Grid(g) = s.zoom() else {
            panic!("expected grid zoom")
        };
        assert_eq!(g.size().value(), Vec2::new(1920.0, 1080.0));
    }

    #[test]
    fn scale_swipe_clamps_accumulator() {
        let mut cfg = Config::default();
        cfg.overview.workspace_method = "first 1".into();
        let (mut c, mut r) = backends(&[1, 2, 3, 4, 5, 6, 7, 8, 9], 7);
        let mut s = Session::open(
            &mut c,
            &mut r,
            SessionSettings::from_config(&cfg),
            ZoomKind::Scale,
            true,
        )
        .unwrap();
        assert_eq!(s.opened_tile(), 6);
        assert_eq!(s.accumulator(), Vec2::new(0.0, 1.0));

        s.on_swipe_update(Vec2::new(0.0, 100.0), &mut r);
        assert_eq!(s.accumulator().y, 0.5);
        assert_eq!(s.accumulator().x, 0.0001);
        let Zoom::Scale(z) = s.zoom() else {
            panic!("expected scale zoom")
        };
        assert_eq!(z.scale().goal(), 0.9);

        s.on_swipe_update(Vec2::new(0.0, 100.0), &mut r);
        assert_eq!(s.accumulator().y, 0.0001);
        let Zoom::Scale(z) = s.zoom() else {
            panic!("expected scale zoom")
        };
        assert_eq!(z.scale().goal(), 0.9);
    }

    #[test]
    fn grid_swipe_end_at_midpoint_closes() {
        let (mut c, mut r) = backends(&[3, 4, 5, 6, 7], 5);
        let mut s = Session::open(&mut c, &mut r, settings(), ZoomKind::Grid, true).unwrap();
        s.on_swipe_update(Vec2::new(0.0, 99.5), &mut r);
        let Zoom::Grid(g) = s.zoom() else {
            panic!("expected grid zoom")
        };
        assert_eq!(g.size().value(), Vec2::new(3840.0, 2160.0));

        s.on_swipe_end(&mut c, &mut r).unwrap();
        assert!(s.is_closing());
        assert!(!s.is_fully_open());
    }

    #[test]
    fn grid_swipe_end_past_midpoint_stays_open() {
        let (mut c, mut r) = backends(&[3, 4, 5, 6, 7], 5);
        let mut s = Session::open(&mut c, &mut r, settings(), ZoomKind::Grid, true).unwrap();
        s.on_swipe_update(Vec2::new(0.0, 150.0), &mut r);
        s.on_swipe_end(&mut c, &mut r).unwrap();

        assert!(!s.is_closing());
        assert!(s.is_fully_open());
        assert!(s.gesture_commenced());
        assert_eq!(s.position().goal(), Vec2::ZERO);
    }

    #[test]
    fn swipe_updates_are_ignored_while_closing() {
        let (mut c, mut r) = backends(&[5], 5);
        let mut s = Session::open(&mut c, &mut r, settings(), ZoomKind::Grid, true).unwrap();
        s.close(&mut c, &mut r).unwrap();
        let acc = s.accumulator();
        s.on_swipe_update(Vec2::new(0.0, 50.0), &mut r);
        assert_eq!(s.accumulator(), acc);
        assert!(s.position().is_animating());
    }

    #[test]
    fn close_is_idempotent() {
        let (mut c, mut r) = backends(&[3, 4, 5, 6, 7], 5);
        let mut s = Session::open(&mut c, &mut r, settings(), ZoomKind::Grid, false).unwrap();
        s.request_close_tile(0);
        s.close(&mut c, &mut r).unwrap();
        assert_eq!(c.switches(), vec![1]);

        let events = c.events().len();
        let ops = r.ops().len();
        s.close(&mut c, &mut r).unwrap();
        assert_eq!(c.events().len(), events);
        assert_eq!(r.ops().len(), ops);
        assert_eq!(c.switches(), vec![1]);
    }

    #[test]
    fn round_trip_close_on_opened_tile() {
        let (mut c, mut r) = backends(&[3, 4, 5, 6, 7], 5);
        let mut s = Session::open(&mut c, &mut r, settings(), ZoomKind::Grid, false).unwrap();
        let opened = s.opened_tile();
        s.request_close_tile(opened);
        s.close(&mut c, &mut r).unwrap();

        assert!(run_to_completion(&mut s, &mut c, &mut r));
        assert!(c.switches().is_empty());
        assert_eq!(c.active_workspace("HEADLESS-1"), 5);

        drop(s);
        assert_eq!(r.live_framebuffers(), 0);
    }

    #[test]
    fn closing_on_unassigned_tile_goes_to_next_empty() {
        let mut cfg = Config::default();
        cfg.overview.skip_empty = true;
        let (mut c, mut r) = backends(&[3, 4, 5, 6, 7], 5);
        let mut s = Session::open(
            &mut c,
            &mut r,
            SessionSettings::from_config(&cfg),
            ZoomKind::Grid,
            false,
        )
        .unwrap();
        assert_eq!(s.tiles()[8].workspace(), None);

        s.request_close_tile(8);
        s.close(&mut c, &mut r).unwrap();
        assert_eq!(c.switches(), vec![1]);
        assert_eq!(s.started_on(), 1);
    }

    #[test]
    fn external_switch_collapses_onto_new_workspace() {
        let (mut c, mut r) = backends(&[3, 4, 5, 6, 7], 5);
        let mut s = Session::open(&mut c, &mut r, settings(), ZoomKind::Grid, false).unwrap();

        c.change_workspace("HEADLESS-1", 6);
        c.clear_events();
        s.pre_render(&mut c, &mut r).unwrap();

        assert!(s.is_closing());
        assert_eq!(s.opened_tile(), 5);
        assert_eq!(s.close_requested(), Some(5));
        assert!(c
            .events()
            .contains(&CompositorEvent::Transition(5, WorkspaceTransition::Out, true)));
        assert!(c.switches().is_empty());

        assert!(run_to_completion(&mut s, &mut c, &mut r));
        assert_eq!(c.active_workspace("HEADLESS-1"), 6);
    }

    #[test]
    fn special_workspace_is_hidden_during_capture_and_restored() {
        let (mut c, mut r) = backends(&[4, 5, 6], 5);
        c.open_special(-98);
        let _s = Session::open(&mut c, &mut r, settings(), ZoomKind::Grid, true).unwrap();

        assert!(c.events().contains(&CompositorEvent::Special(None)));
        assert_eq!(c.active_special_workspace("HEADLESS-1"), Some(-98));
    }

    #[test]
    fn close_onto_other_workspace_dismisses_special() {
        let (mut c, mut r) = backends(&[4, 5, 6], 5);
        c.open_special(-98);
        let mut s = Session::open(&mut c, &mut r, settings(), ZoomKind::Grid, false).unwrap();
        s.request_close_tile(5);
        s.close(&mut c, &mut r).unwrap();
        assert_eq!(c.active_special_workspace("HEADLESS-1"), None);
        assert_eq!(c.active_workspace("HEADLESS-1"), 6);
    }

    #[test]
    fn allocation_failure_is_reported() {
        let (mut c, mut r) = backends(&[5], 5);
        r.fail_allocations(true);
        let err = Session::open(&mut c, &mut r, settings(), ZoomKind::Grid, false);
        assert!(matches!(err, Err(OverviewError::Allocation(_))));
    }

    #[test]
    fn tiles_are_low_res_until_close() {
        let (mut c, mut r) = backends(&[5], 5);
        let mut s = Session::open(&mut c, &mut r, settings(), ZoomKind::Grid, false).unwrap();
        assert_eq!(s.tiles()[0].framebuffer().size(), PixelSize::new(1280, 720));

        s.close(&mut c, &mut r).unwrap();
        assert_eq!(s.tiles()[0].framebuffer().size(), PixelSize::new(1920, 1080));
        assert_eq!(r.live_framebuffers(), 9);
    }

    #[test]
    fn composite_draws_every_tile_and_highlights_hovered() {
        let (mut c, mut r) = backends(&[5], 5);
        let mut s = Session::open(&mut c, &mut r, settings(), ZoomKind::Grid, false).unwrap();
        assert!(!run_to_completion(&mut s, &mut c, &mut r));

        s.on_pointer_move(Vec2::new(10.0, 10.0));
        s.pre_render(&mut c, &mut r).unwrap();
        assert_eq!(s.hovered_tile(), 0);
        s.render(&mut c, &mut r).unwrap();

        let frame = r.last_composite();
        assert_eq!(frame[0], DrawOp::Clear(Color::from_argb(0xFF11_1111)));
        let blits: Vec<_> = frame
            .iter()
            .filter_map(|op| match op {
                DrawOp::Blit { dest, .. } => Some(*dest),
                _ => None,
            })
            .collect();
        assert_eq!(blits.len(), 9);
        assert_eq!(blits[0].pos(), Vec2::ZERO);

        let highlights: Vec<_> = frame
            .iter()
            .filter_map(|op| match op {
                DrawOp::FillRect { rect, color } => Some((*rect, color.a)),
                _ => None,
            })
            .collect();
        assert_eq!(highlights.len(), 1);
        assert_eq!(highlights[0].0, blits[0]);
        assert!((highlights[0].1 - 0.3).abs() < 1e-9);
    }

    #[test]
    fn scale_composite_has_no_gap_and_no_highlight() {
        let (mut c, mut r) = backends(&[5], 5);
        let mut s = Session::open(&mut c, &mut r, settings(), ZoomKind::Scale, true).unwrap();
        assert_eq!(s.opened_tile(), 4);

        s.on_swipe_update(Vec2::new(20.0, 20.0), &mut r);
        s.render(&mut c, &mut r).unwrap();

        let frame = r.last_composite();
        let blits: Vec<_> = frame
            .iter()
            .filter_map(|op| match op {
                DrawOp::Blit { dest, .. } => Some(*dest),
                _ => None,
            })
            .collect();
        assert_eq!(blits.len(), 9);
        // Tiles keep the output size and touch each other.
        assert_eq!(blits[4], Rect::new(384.0, 216.0, 1920.0, 1080.0));
        assert_eq!(blits[3], Rect::new(-1536.0, 216.0, 1920.0, 1080.0));
        assert_eq!(blits[7], Rect::new(384.0, 1296.0, 1920.0, 1080.0));
        assert!(!frame.iter().any(|op| matches!(op, DrawOp::FillRect { .. })));
    }

    #[test]
    fn started_workspace_outside_grid_opens_on_first_tile() {
        let mut cfg = Config::default();
        cfg.overview.workspace_method = "first 1".into();
        let (mut c, mut r) = backends(&[1, 2, 12], 12);
        let s = Session::open(
            &mut c,
            &mut r,
            SessionSettings::from_config(&cfg),
            ZoomKind::Grid,
            false,
        )
        .unwrap();
        assert_eq!(s.started_on(), 12);
        assert_eq!(s.opened_tile(), 0);
        assert_eq!(s.tiles()[0].workspace(), Some(1));
    }

    #[test]
    fn pointer_select_closes_on_tile_under_pointer() {
        let (mut c, mut r) = backends(&[3, 4, 5, 6, 7], 5);
        let mut s = Session::open(&mut c, &mut r, settings(), ZoomKind::Grid, false).unwrap();

        assert_eq!(
            s.on_pointer_move(Vec2::new(1900.0, 10.0)),
            EventDisposition::Consumed
        );
        let d = s.on_pointer_select(&mut c, &mut r).unwrap();
        assert_eq!(d, EventDisposition::Consumed);
        assert_eq!(c.switches(), vec![3]);

        // Once closing, pointer input belongs to the host again.
        assert_eq!(
            s.on_pointer_move(Vec2::new(5.0, 5.0)),
            EventDisposition::PassThrough
        );
        assert_eq!(
            s.on_pointer_select(&mut c, &mut r).unwrap(),
            EventDisposition::PassThrough
        );
    }

    #[test]
    fn select_hovered_records_close_target() {
        let (mut c, mut r) = backends(&[5], 5);
        let mut s = Session::open(&mut c, &mut r, settings(), ZoomKind::Grid, false).unwrap();
        s.on_pointer_move(Vec2::new(700.0, 400.0));
        s.select_hovered_workspace();
        assert_eq!(s.close_requested(), Some(4));
    }

    #[test]
    fn damage_report_repaints_output_and_opened_tile() {
        let (mut c, mut r) = backends(&[5], 5);
        let mut s = Session::open(&mut c, &mut r, settings(), ZoomKind::Grid, true).unwrap();
        r.take_ops();
        s.on_damage_reported(&mut c, &mut r);

        assert_eq!(r.ops()[0], DrawOp::DamageOutput(DamageOrigin::Overview));
        assert!(matches!(
            r.ops()[1],
            DrawOp::DamageRect(_, DamageOrigin::Overview)
        ));
        assert_eq!(c.frames_scheduled(), 1);
    }
}
