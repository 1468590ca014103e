//! Contracts for the collaborators the overview engine drives.
//!
//! The session never talks to a concrete compositor.  Everything it needs is
//! expressed through these traits:
//!
//! * [`Compositor`]: the workspace directory, the active workspace per
//!   output, pointer state and frame scheduling.
//! * [`Renderer`]: offscreen framebuffers, workspace capture, texture blits
//!   and damage.
//! * [`CommandSource`]: a transport delivering [`Command`]s to the
//!   [`OverviewController`](crate::controller::OverviewController).
//!
//! Reference implementations live in [`headless`](crate::headless).

use crate::command::Command;
use crate::geometry::{Color, PixelSize, Rect, Vec2};
use crate::gestures::Modifiers;
use std::sync::mpsc;
use std::time::Instant;

/// Identifier of a logical workspace, as the compositor numbers them.
pub type WorkspaceId = i32;

/// Static description of the output the overview is shown on.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputInfo {
    /// Name the compositor uses for the output (e.g. `"DP-1"`).
    pub name: String,
    /// Top-left corner in global layout coordinates.
    pub position: Vec2,
    /// Logical size.
    pub size: Vec2,
    /// Fractional scale (pixels per logical unit).
    pub scale: f64,
}

impl OutputInfo {
    /// Size of the output in device pixels.
    pub fn pixel_size(&self) -> PixelSize {
        PixelSize::from_vec(self.size * self.scale)
    }

    /// Convert a global pointer position to output-local coordinates.
    pub fn to_local(&self, global: Vec2) -> Vec2 {
        global - self.position
    }
}

/// Direction of a workspace enter/leave animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceTransition {
    In,
    Out,
}

/// Which kind of frame the renderer is producing.
///
/// Passed down explicitly so the host's workspace-render hook can tell a
/// tile capture (draw the plain workspace) from a live frame (draw the
/// overview instead).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPass {
    /// Rendering one workspace into a tile framebuffer.
    Capture,
    /// Compositing the live frame for the output.
    Composite,
}

/// Who produced a damage report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOrigin {
    /// Damage the overview emitted itself; the host applies it as-is.
    Overview,
    /// Damage from anything else on the output.
    External,
}

/// Result of offering an input event to the overview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDisposition {
    /// The overview handled the event; the host must not process it further.
    Consumed,
    /// The host should process the event normally.
    PassThrough,
}

/// Workspace directory, output and input state of the host compositor.
pub trait Compositor {
    /// The output that currently has focus; overviews open there.
    fn focused_output(&self) -> OutputInfo;

    /// Whether `id` denotes a live workspace.
    fn workspace_exists(&self, id: WorkspaceId) -> bool;

    /// Resolve a workspace selector string (`"current"`, `"3"`, `"r+1"`, …).
    fn resolve_workspace(&self, selector: &str) -> Option<WorkspaceId>;

    /// Walk `offset` steps from `from` through workspace ids.
    ///
    /// With `skip_empty` only workspaces that currently exist are visited
    /// and the walk wraps around; otherwise every id is a step.  Returns
    /// `None` when no workspace can be addressed.
    fn relative_workspace(
        &self,
        from: WorkspaceId,
        offset: i64,
        skip_empty: bool,
    ) -> Option<WorkspaceId>;

    /// The id a "next empty workspace" request on `output` would go to.
    fn next_empty_workspace(&self, output: &str) -> WorkspaceId;

    /// Create workspace `id` on `output` if it does not exist yet.
    fn create_workspace(&mut self, output: &str, id: WorkspaceId);

    /// The workspace currently shown on `output`.
    fn active_workspace(&self, output: &str) -> WorkspaceId;

    /// Make `id` the active workspace without any user-facing side effects.
    /// Used to temporarily retarget the output while capturing tiles.
    fn set_active_workspace(&mut self, output: &str, id: WorkspaceId);

    /// Perform a full user-level workspace switch, creating `id` on demand.
    fn change_workspace(&mut self, output: &str, id: WorkspaceId);

    /// The special (scratchpad) workspace open on `output`, if any.
    fn active_special_workspace(&self, output: &str) -> Option<WorkspaceId>;

    fn set_active_special_workspace(&mut self, output: &str, special: Option<WorkspaceId>);

    fn set_workspace_visible(&mut self, id: WorkspaceId, visible: bool);

    /// Start an enter/leave animation for `id`; `instant` skips the easing.
    fn start_workspace_transition(
        &mut self,
        id: WorkspaceId,
        transition: WorkspaceTransition,
        instant: bool,
    );

    /// Pointer position in global layout coordinates.
    fn pointer_position(&self) -> Vec2;

    /// Keyboard modifiers currently held.
    fn modifiers(&self) -> Modifiers;

    fn set_cursor_image(&mut self, name: &str);

    fn unset_cursor_image(&mut self);

    /// Ask for a new frame on `output`.
    fn schedule_frame(&mut self, output: &str);
}

/// An offscreen render target.  Dropping it releases the GPU resource.
pub trait Framebuffer {
    fn size(&self) -> PixelSize;
}

/// The rendering capabilities the overview issues commands against.
pub trait Renderer {
    type Framebuffer: Framebuffer;
    type Error: std::error::Error + Send + 'static;

    /// Allocate an offscreen target in the output's pixel format.
    fn allocate(&mut self, size: PixelSize) -> Result<Self::Framebuffer, Self::Error>;

    /// Begin a full-damage render of `output` into `target`.  Screen-space
    /// shaders and surface feedback are suppressed until
    /// [`end_capture`](Renderer::end_capture).
    fn begin_capture(&mut self, output: &OutputInfo, target: &Self::Framebuffer);

    fn end_capture(&mut self);

    /// Draw `workspace` (or just the background when `None`) into
    /// `viewport`.
    fn render_workspace(
        &mut self,
        output: &OutputInfo,
        workspace: Option<WorkspaceId>,
        now: Instant,
        viewport: Rect,
        pass: RenderPass,
    );

    fn clear(&mut self, color: Color);

    /// Draw `source` into `dest` with the given opacity.
    fn blit(&mut self, source: &Self::Framebuffer, dest: Rect, opacity: f64);

    fn fill_rect(&mut self, rect: Rect, color: Color);

    fn damage_output(&mut self, output: &OutputInfo, origin: DamageOrigin);

    fn damage_rect(&mut self, rect: Rect, origin: DamageOrigin);
}

/// A source of [`Command`]s.
///
/// Implementations listen on some transport (a Unix socket, the host's
/// gesture hooks, a test harness) and forward parsed commands into the
/// provided [`mpsc::Sender`].
///
/// # Contract
///
/// * [`run`](CommandSource::run) **blocks** until the source is exhausted or
///   an unrecoverable error occurs.
/// * Each received command must be sent through `sink` exactly once.
/// * Implementations must be [`Send`] so they can run on a dedicated thread.
pub trait CommandSource: Send {
    type Error: std::error::Error + Send + 'static;

    fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), Self::Error>;
}
