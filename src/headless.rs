//! In-memory reference backends.
//!
//! [`HeadlessCompositor`] keeps a workspace directory, an active workspace
//! and a pointer, and records every side effect the overview asks for.
//! [`RecordingRenderer`] allocates bookkeeping-only framebuffers and logs
//! each draw call as a [`DrawOp`].
//!
//! Together they let the whole overview run without a GPU or a real
//! compositor: the `hyprexpo` daemon uses them to drive the preview window,
//! and the test suites use them to observe what a session did.

use crate::geometry::{Color, PixelSize, Rect, Vec2};
use crate::gestures::Modifiers;
use crate::traits::{
    Compositor, DamageOrigin, Framebuffer, OutputInfo, RenderPass, Renderer, WorkspaceId,
    WorkspaceTransition,
};
use log::{debug, trace};
use std::collections::{BTreeSet, HashMap};
use std::rc::{Rc, Weak};
use std::time::Instant;

/// A 1920×1080 output at the origin with scale 1.
pub fn default_output() -> OutputInfo {
    OutputInfo {
        name: "HEADLESS-1".into(),
        position: Vec2::ZERO,
        size: Vec2::new(1920.0, 1080.0),
        scale: 1.0,
    }
}

//  Compositor

/// A side effect requested from the [`HeadlessCompositor`].
#[derive(Debug, Clone, PartialEq)]
pub enum CompositorEvent {
    Created(WorkspaceId),
    SetActive(WorkspaceId),
    Changed(WorkspaceId),
    Special(Option<WorkspaceId>),
    Visible(WorkspaceId, bool),
    Transition(WorkspaceId, WorkspaceTransition, bool),
    CursorImage(Option<String>),
    FrameScheduled,
}

/// A single-output compositor whose workspaces live in a sorted set.
///
/// With `skip_empty`, relative walks visit existing workspaces only and wrap
/// around the ends.  Without it every positive id is a step.
#[derive(Debug, Clone)]
pub struct HeadlessCompositor {
    output: OutputInfo,
    workspaces: BTreeSet<WorkspaceId>,
    active: WorkspaceId,
    special: Option<WorkspaceId>,
    pointer: Vec2,
    modifiers: Modifiers,
    cursor: Option<String>,
    events: Vec<CompositorEvent>,
}

impl HeadlessCompositor {
    /// Create a compositor with the given workspaces; `active` is added if
    /// missing.
    pub fn new(
        output: OutputInfo,
        workspaces: impl IntoIterator<Item = WorkspaceId>,
        active: WorkspaceId,
    ) -> Self {
        let mut workspaces: BTreeSet<_> = workspaces.into_iter().collect();
        workspaces.insert(active);
        let pointer = output.position + output.size / 2.0;
        Self {
            output,
            workspaces,
            active,
            special: None,
            pointer,
            modifiers: Modifiers::NONE,
            cursor: None,
            events: Vec::new(),
        }
    }

    /// Move the pointer to `global`.
    pub fn move_pointer(&mut self, global: Vec2) {
        self.pointer = global;
    }

    /// Hold `mods` until the next call.
    pub fn hold_modifiers(&mut self, mods: Modifiers) {
        self.modifiers = mods;
    }

    /// Open a special workspace without recording an event.
    pub fn open_special(&mut self, id: WorkspaceId) {
        self.special = Some(id);
    }

    /// Remove a workspace from the directory.
    pub fn destroy_workspace(&mut self, id: WorkspaceId) {
        self.workspaces.remove(&id);
    }

    pub fn workspaces(&self) -> impl Iterator<Item = WorkspaceId> + '_ {
        self.workspaces.iter().copied()
    }

    /// The cursor image currently forced by the overview, if any.
    pub fn cursor_image(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// Every side effect recorded so far.
    pub fn events(&self) -> &[CompositorEvent] {
        &self.events
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// User-level workspace switches, in order.
    pub fn switches(&self) -> Vec<WorkspaceId> {
        self.events
            .iter()
            .filter_map(|e| match e {
                CompositorEvent::Changed(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    pub fn frames_scheduled(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, CompositorEvent::FrameScheduled))
            .count()
    }

    fn skip_walk(&self, from: WorkspaceId, offset: i64) -> Option<WorkspaceId> {
        let ids: Vec<WorkspaceId> = self.workspaces.iter().copied().collect();
        if ids.is_empty() {
            return None;
        }
        if offset == 0 {
            return Some(from);
        }
        let below = ids.iter().filter(|id| **id < from).count() as i64;
        let index = if self.workspaces.contains(&from) || offset < 0 {
            below + offset
        } else {
            below + offset - 1
        };
        Some(ids[index.rem_euclid(ids.len() as i64) as usize])
    }
}

impl Compositor for HeadlessCompositor {
    fn focused_output(&self) -> OutputInfo {
        self.output.clone()
    }

    fn workspace_exists(&self, id: WorkspaceId) -> bool {
        self.workspaces.contains(&id)
    }

    /// Understands `current`, plain ids, `r±N` (id walk) and `e±N`
    /// (existing workspaces only).
    fn resolve_workspace(&self, selector: &str) -> Option<WorkspaceId> {
        let selector = selector.trim();
        if selector == "current" {
            return Some(self.active);
        }
        if let Some(rest) = selector.strip_prefix('r') {
            let offset: i64 = rest.parse().ok()?;
            return self.relative_workspace(self.active, offset, false);
        }
        if let Some(rest) = selector.strip_prefix('e') {
            let offset: i64 = rest.parse().ok()?;
            return self.relative_workspace(self.active, offset, true);
        }
        selector.parse::<WorkspaceId>().ok().filter(|id| *id >= 1)
    }

    fn relative_workspace(
        &self,
        from: WorkspaceId,
        offset: i64,
        skip_empty: bool,
    ) -> Option<WorkspaceId> {
        if skip_empty {
            return self.skip_walk(from, offset);
        }
        let id = from as i64 + offset;
        if id >= 1 && id <= WorkspaceId::MAX as i64 {
            Some(id as WorkspaceId)
        } else {
            None
        }
    }

    fn next_empty_workspace(&self, _output: &str) -> WorkspaceId {
        (1..).find(|id| !self.workspaces.contains(id)).unwrap_or(1)
    }

    fn create_workspace(&mut self, _output: &str, id: WorkspaceId) {
        if self.workspaces.insert(id) {
            self.events.push(CompositorEvent::Created(id));
        }
    }

    fn active_workspace(&self, _output: &str) -> WorkspaceId {
        self.active
    }

    fn set_active_workspace(&mut self, _output: &str, id: WorkspaceId) {
        self.active = id;
        self.events.push(CompositorEvent::SetActive(id));
    }

    fn change_workspace(&mut self, output: &str, id: WorkspaceId) {
        debug!("headless: switching {} to workspace {}", output, id);
        self.workspaces.insert(id);
        self.active = id;
        self.events.push(CompositorEvent::Changed(id));
    }

    fn active_special_workspace(&self, _output: &str) -> Option<WorkspaceId> {
        self.special
    }

    fn set_active_special_workspace(&mut self, _output: &str, special: Option<WorkspaceId>) {
        self.special = special;
        self.events.push(CompositorEvent::Special(special));
    }

    fn set_workspace_visible(&mut self, id: WorkspaceId, visible: bool) {
        self.events.push(CompositorEvent::Visible(id, visible));
    }

    fn start_workspace_transition(
        &mut self,
        id: WorkspaceId,
        transition: WorkspaceTransition,
        instant: bool,
    ) {
        self.events
            .push(CompositorEvent::Transition(id, transition, instant));
    }

    fn pointer_position(&self) -> Vec2 {
        self.pointer
    }

    fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    fn set_cursor_image(&mut self, name: &str) {
        self.cursor = Some(name.to_string());
        self.events
            .push(CompositorEvent::CursorImage(Some(name.to_string())));
    }

    fn unset_cursor_image(&mut self) {
        self.cursor = None;
        self.events.push(CompositorEvent::CursorImage(None));
    }

    fn schedule_frame(&mut self, _output: &str) {
        self.events.push(CompositorEvent::FrameScheduled);
    }
}

//  Renderer

/// Identifier of a [`RecordedFramebuffer`], unique per renderer.
pub type FramebufferId = usize;

/// A framebuffer that only remembers its size.  Its liveness is observable
/// through [`RecordingRenderer::live_framebuffers`].
#[derive(Debug)]
pub struct RecordedFramebuffer {
    id: FramebufferId,
    size: PixelSize,
    _alive: Rc<()>,
}

impl RecordedFramebuffer {
    pub fn id(&self) -> FramebufferId {
        self.id
    }
}

impl Framebuffer for RecordedFramebuffer {
    fn size(&self) -> PixelSize {
        self.size
    }
}

/// One recorded renderer call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    BeginCapture {
        target: FramebufferId,
    },
    EndCapture,
    RenderWorkspace {
        workspace: Option<WorkspaceId>,
        viewport: Rect,
        pass: RenderPass,
    },
    Clear(Color),
    Blit {
        source: FramebufferId,
        dest: Rect,
        opacity: f64,
    },
    FillRect {
        rect: Rect,
        color: Color,
    },
    DamageOutput(DamageOrigin),
    DamageRect(Rect, DamageOrigin),
}

/// Error from the [`RecordingRenderer`].
#[derive(Debug, thiserror::Error)]
#[error("headless renderer error: {0}")]
pub struct HeadlessRenderError(String);

/// A renderer that records draw calls instead of executing them.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    next_id: FramebufferId,
    allocated: Vec<Weak<()>>,
    capturing: Option<FramebufferId>,
    contents: HashMap<FramebufferId, Option<WorkspaceId>>,
    ops: Vec<DrawOp>,
    fail_allocations: bool,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent [`allocate`](Renderer::allocate) fail.
    pub fn fail_allocations(&mut self, fail: bool) {
        self.fail_allocations = fail;
    }

    /// Number of framebuffers that have not been dropped yet.
    pub fn live_framebuffers(&self) -> usize {
        self.allocated
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Which workspace was last captured into `fb` (`Some(None)` for an
    /// empty tile, `None` if nothing was captured yet).
    pub fn contents(&self, fb: FramebufferId) -> Option<Option<WorkspaceId>> {
        self.contents.get(&fb).copied()
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Drain the recorded ops.
    pub fn take_ops(&mut self) -> Vec<DrawOp> {
        std::mem::take(&mut self.ops)
    }

    /// The ops of the most recent live frame: everything after the last
    /// [`Clear`](DrawOp::Clear) issued outside a capture.
    pub fn last_composite(&self) -> &[DrawOp] {
        let mut in_capture = false;
        let mut start = None;
        for (i, op) in self.ops.iter().enumerate() {
            match op {
                DrawOp::BeginCapture { .. } => in_capture = true,
                DrawOp::EndCapture => in_capture = false,
                DrawOp::Clear(_) if !in_capture => start = Some(i),
                _ => {}
            }
        }
        match start {
            Some(i) => &self.ops[i..],
            None => &[],
        }
    }
}

impl Renderer for RecordingRenderer {
    type Framebuffer = RecordedFramebuffer;
    type Error = HeadlessRenderError;

    fn allocate(&mut self, size: PixelSize) -> Result<RecordedFramebuffer, HeadlessRenderError> {
        if self.fail_allocations {
            return Err(HeadlessRenderError(format!(
                "cannot allocate {}x{}",
                size.width, size.height
            )));
        }
        let alive = Rc::new(());
        self.allocated.retain(|w| w.strong_count() > 0);
        self.allocated.push(Rc::downgrade(&alive));
        let id = self.next_id;
        self.next_id += 1;
        trace!("allocated framebuffer {} ({}x{})", id, size.width, size.height);
        Ok(RecordedFramebuffer {
            id,
            size,
            _alive: alive,
        })
    }

    fn begin_capture(&mut self, _output: &OutputInfo, target: &RecordedFramebuffer) {
        self.capturing = Some(target.id);
        self.ops.push(DrawOp::BeginCapture { target: target.id });
    }

    fn end_capture(&mut self) {
        self.capturing = None;
        self.ops.push(DrawOp::EndCapture);
    }

    fn render_workspace(
        &mut self,
        _output: &OutputInfo,
        workspace: Option<WorkspaceId>,
        _now: Instant,
        viewport: Rect,
        pass: RenderPass,
    ) {
        if let Some(fb) = self.capturing {
            self.contents.insert(fb, workspace);
        }
        self.ops.push(DrawOp::RenderWorkspace {
            workspace,
            viewport,
            pass,
        });
    }

    fn clear(&mut self, color: Color) {
        self.ops.push(DrawOp::Clear(color));
    }

    fn blit(&mut self, source: &RecordedFramebuffer, dest: Rect, opacity: f64) {
        self.ops.push(DrawOp::Blit {
            source: source.id,
            dest,
            opacity,
        });
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.ops.push(DrawOp::FillRect { rect, color });
    }

    fn damage_output(&mut self, _output: &OutputInfo, origin: DamageOrigin) {
        self.ops.push(DrawOp::DamageOutput(origin));
    }

    fn damage_rect(&mut self, rect: Rect, origin: DamageOrigin) {
        self.ops.push(DrawOp::DamageRect(rect, origin));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compositor(ids: &[WorkspaceId], active: WorkspaceId) -> HeadlessCompositor {
        HeadlessCompositor::new(default_output(), ids.iter().copied(), active)
    }

    #[test]
    fn plain_walk_stops_below_one() {
        let c = compositor(&[1, 2, 3], 2);
        assert_eq!(c.relative_workspace(2, -1, false), Some(1));
        assert_eq!(c.relative_workspace(2, -2, false), None);
        assert_eq!(c.relative_workspace(2, 10, false), Some(12));
    }

    #[test]
    fn skip_walk_wraps_through_existing_workspaces() {
        let c = compositor(&[3, 5, 9], 5);
        assert_eq!(c.relative_workspace(5, 1, true), Some(9));
        assert_eq!(c.relative_workspace(5, 2, true), Some(3));
        assert_eq!(c.relative_workspace(5, -1, true), Some(3));
        assert_eq!(c.relative_workspace(5, -2, true), Some(9));
    }

    #[test]
    fn skip_walk_from_missing_workspace() {
        let c = compositor(&[3, 5, 9], 5);
        assert_eq!(c.relative_workspace(6, 1, true), Some(9));
        assert_eq!(c.relative_workspace(6, -1, true), Some(5));
    }

    #[test]
    fn resolve_selectors() {
        let c = compositor(&[1, 2, 4], 2);
        assert_eq!(c.resolve_workspace("current"), Some(2));
        assert_eq!(c.resolve_workspace("7"), Some(7));
        assert_eq!(c.resolve_workspace("r+1"), Some(3));
        assert_eq!(c.resolve_workspace("e+1"), Some(4));
        assert_eq!(c.resolve_workspace("r-5"), None);
        assert_eq!(c.resolve_workspace("bogus"), None);
    }

    #[test]
    fn next_empty_is_lowest_free_id() {
        let c = compositor(&[1, 2, 4], 1);
        assert_eq!(c.next_empty_workspace("HEADLESS-1"), 3);
    }

    #[test]
    fn change_workspace_records_switch() {
        let mut c = compositor(&[1], 1);
        c.change_workspace("HEADLESS-1", 6);
        assert_eq!(c.active_workspace("HEADLESS-1"), 6);
        assert!(c.workspace_exists(6));
        assert_eq!(c.switches(), vec![6]);
    }

    #[test]
    fn dropped_framebuffers_are_not_live() {
        let mut r = RecordingRenderer::new();
        let a = r.allocate(PixelSize::new(10, 10)).unwrap();
        let b = r.allocate(PixelSize::new(10, 10)).unwrap();
        assert_eq!(r.live_framebuffers(), 2);
        drop(a);
        assert_eq!(r.live_framebuffers(), 1);
        assert_ne!(b.id(), 0);
    }

    #[test]
    fn capture_records_contents() {
        let mut r = RecordingRenderer::new();
        let out = default_output();
        let fb = r.allocate(PixelSize::new(4, 4)).unwrap();
        r.begin_capture(&out, &fb);
        r.render_workspace(&out, Some(3), Instant::now(), Rect::default(), RenderPass::Capture);
        r.end_capture();
        assert_eq!(r.contents(fb.id()), Some(Some(3)));
        assert!(r.last_composite().is_empty());

        r.clear(Color::BLACK);
        r.blit(&fb, Rect::new(0.0, 0.0, 4.0, 4.0), 1.0);
        assert_eq!(r.last_composite().len(), 2);
    }

    #[test]
    fn failing_allocation_is_an_error() {
        let mut r = RecordingRenderer::new();
        r.fail_allocations(true);
        assert!(r.allocate(PixelSize::new(1, 1)).is_err());
    }
}
