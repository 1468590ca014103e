//! The single owner of the overview.
//!
//! [`OverviewController`] holds the compositor and renderer backends, the
//! configuration, at most one [`OverviewSession`] and the swipe state.  Every
//! entry point (commands, frame hooks, damage, the animation tick) goes
//! through it and tolerates the session being absent.
//!
//! The controller is generic over any [`Compositor`] and [`Renderer`], so the
//! same logic drives a real compositor integration, the headless preview
//! daemon and the tests.

use crate::command::{Command, ExpoAction};
use crate::config::Config;
use crate::geometry::Vec2;
use crate::gestures::SwipeTracker;
use crate::session::zoom::ZoomKind;
use crate::session::{OverviewError, OverviewSession, SessionSettings, SessionStatus};
use crate::traits::{Compositor, DamageOrigin, EventDisposition, RenderPass, Renderer};
use log::{debug, info, warn};
use std::time::Duration;

/// Owns the backends and the optional open session.
///
/// # Typical usage
///
/// ```ignore
/// let mut controller = OverviewController::new(compositor, renderer, config);
/// controller.handle(Command::Expo(ExpoAction::Toggle))?;
/// loop {
///     controller.frame(&output, frame_time)?;
/// }
/// ```
pub struct OverviewController<C: Compositor, R: Renderer> {
    compositor: C,
    renderer: R,
    config: Config,
    session: Option<OverviewSession<R>>,
    swipe: SwipeTracker,
}

impl<C: Compositor, R: Renderer> OverviewController<C, R> {
    pub fn new(compositor: C, renderer: R, config: Config) -> Self {
        Self {
            compositor,
            renderer,
            config,
            session: None,
            swipe: SwipeTracker::new(),
        }
    }

    pub fn compositor(&self) -> &C {
        &self.compositor
    }

    pub fn compositor_mut(&mut self) -> &mut C {
        &mut self.compositor
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The open session, if any.
    pub fn session(&self) -> Option<&OverviewSession<R>> {
        self.session.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Whether a swipe is currently driving the overview.
    pub fn is_swiping(&self) -> bool {
        self.swipe.is_active()
    }

    /// Process a single [`Command`].
    ///
    /// The returned disposition tells an input source whether the event was
    /// swallowed by the overview or should reach the host as usual.
    pub fn handle(&mut self, cmd: Command) -> Result<EventDisposition, OverviewError> {
        match cmd {
            Command::Expo(action) => {
                self.dispatch(action)?;
                Ok(EventDisposition::Consumed)
            }
            Command::SwipeBegin { fingers } => self.swipe_begin(fingers),
            Command::SwipeUpdate { fingers, dx, dy } => {
                self.swipe_update(fingers, Vec2::new(dx, dy))
            }
            Command::SwipeEnd => self.swipe_end(),
            Command::PointerMove { x, y } => Ok(self.pointer_move(Vec2::new(x, y))),
            Command::PointerSelect => self.pointer_select(),
        }
    }

    //  Dispatcher

    /// Run the overview dispatcher.  Every action is rejected while a swipe
    /// is in progress.
    pub fn dispatch(&mut self, action: ExpoAction) -> Result<(), OverviewError> {
        if self.swipe.is_active() {
            warn!("expo {} rejected: a swipe is in progress", action);
            return Err(OverviewError::AlreadySwiping);
        }
        info!("expo {}", action);

        match action {
            ExpoAction::Select => {
                let session = self.session.as_mut().ok_or(OverviewError::NotOpen)?;
                session.select_hovered_workspace();
                session.close(&mut self.compositor, &mut self.renderer)
            }
            ExpoAction::Toggle => match self.session.as_mut() {
                Some(session) => session.close(&mut self.compositor, &mut self.renderer),
                None => {
                    self.open(ZoomKind::Grid, false)?;
                    if let Some(session) = self.session.as_mut() {
                        session.mark_fully_open();
                    }
                    Ok(())
                }
            },
            ExpoAction::Close => match self.session.as_mut() {
                Some(session) => session.close(&mut self.compositor, &mut self.renderer),
                None => {
                    debug!("nothing to close");
                    Ok(())
                }
            },
            ExpoAction::Open => self.open(ZoomKind::Grid, false),
        }
    }

    fn open(&mut self, kind: ZoomKind, gesture: bool) -> Result<(), OverviewError> {
        if self.session.is_some() {
            return Err(OverviewError::AlreadyOpen);
        }
        let settings = SessionSettings::from_config(&self.config);
        let session = OverviewSession::open(
            &mut self.compositor,
            &mut self.renderer,
            settings,
            kind,
            gesture,
        )?;
        self.session = Some(session);
        Ok(())
    }

    //  Swipe

    fn passive_disposition(&self) -> EventDisposition {
        if self.swipe.is_active() || self.session.is_some() {
            EventDisposition::Consumed
        } else {
            EventDisposition::PassThrough
        }
    }

    /// A swipe started.  A bound finger count opens the overview right away
    /// (unless one is already open) and takes over the swipe; anything else
    /// waits for the first update to be routed.
    fn swipe_begin(&mut self, fingers: u32) -> Result<EventDisposition, OverviewError> {
        if self.swipe.is_active() {
            warn!("swipe begin rejected: a swipe is in progress");
            return Err(OverviewError::AlreadySwiping);
        }
        let mods = self.compositor.modifiers();
        debug!("swipe begin: {} fingers, mods {:?}", fingers, mods);

        let Some(binding) = self.config.gestures.binding_for(fingers, mods).cloned() else {
            self.swipe.begin();
            return Ok(self.passive_disposition());
        };
        if self.session.is_none() {
            if let Some(kind) = binding.zoom() {
                info!("gesture \"{}\" opens a {:?} overview", binding, kind);
                self.open(kind, true)?;
            }
        }
        self.swipe.begin_bound(&binding);
        Ok(EventDisposition::Consumed)
    }

    fn swipe_update(
        &mut self,
        fingers: u32,
        delta: Vec2,
    ) -> Result<EventDisposition, OverviewError> {
        let route = self.swipe.update(
            &self.config.gestures,
            self.config.overview.gesture_positive,
            fingers,
            delta,
            self.session.is_some(),
        );

        if let Some(kind) = route.open {
            if let Err(e) = self.open(kind, true) {
                self.swipe.end();
                return Err(e);
            }
        }
        if route.feed {
            if let Some(session) = self.session.as_mut() {
                session.on_swipe_update(route.delta, &mut self.renderer);
            }
        }
        Ok(route.disposition)
    }

    fn swipe_end(&mut self) -> Result<EventDisposition, OverviewError> {
        let was_active = self.swipe.end();
        let Some(session) = self.session.as_mut() else {
            return Ok(EventDisposition::PassThrough);
        };
        debug!("swipe end (tracked: {})", was_active);
        session.on_swipe_end(&mut self.compositor, &mut self.renderer)?;
        Ok(EventDisposition::Consumed)
    }

    //  Pointer

    fn pointer_move(&mut self, global: Vec2) -> EventDisposition {
        match self.session.as_mut() {
            Some(session) => session.on_pointer_move(global),
            None => EventDisposition::PassThrough,
        }
    }

    fn pointer_select(&mut self) -> Result<EventDisposition, OverviewError> {
        match self.session.as_mut() {
            Some(session) => session.on_pointer_select(&mut self.compositor, &mut self.renderer),
            None => Ok(EventDisposition::PassThrough),
        }
    }

    //  Frame hooks

    /// Per-frame preparation: hover tracking and tile refresh.
    pub fn pre_render(&mut self) -> Result<(), OverviewError> {
        match self.session.as_mut() {
            Some(session) => session.pre_render(&mut self.compositor, &mut self.renderer),
            None => Ok(()),
        }
    }

    /// Whether the host must hand the workspace render of `output` to
    /// [`render_output`](Self::render_output).  Capture passes always draw
    /// the plain workspace.
    pub fn intercepts_workspace_render(&self, output: &str, pass: RenderPass) -> bool {
        pass == RenderPass::Composite
            && self
                .session
                .as_ref()
                .is_some_and(|s| s.output().name == output)
    }

    /// Composite the overview onto `output`.  Returns `false` when no
    /// session is shown there.
    pub fn render_output(&mut self, output: &str) -> Result<bool, OverviewError> {
        match self.session.as_mut() {
            Some(session) if session.output().name == output => {
                session.render(&mut self.compositor, &mut self.renderer)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Damage was reported on `output`.  Damage the overview emitted itself
    /// passes through untouched.
    pub fn on_damage(&mut self, output: &str, origin: DamageOrigin) -> EventDisposition {
        match self.session.as_mut() {
            Some(session)
                if origin == DamageOrigin::External && session.output().name == output =>
            {
                session.on_damage_reported(&mut self.compositor, &mut self.renderer);
                EventDisposition::Consumed
            }
            _ => EventDisposition::PassThrough,
        }
    }

    /// One host frame on `output`: [`tick`](Self::tick), then
    /// [`pre_render`](Self::pre_render) and
    /// [`render_output`](Self::render_output) while a session is open.
    /// Returns whether the overview was composited.
    pub fn frame(&mut self, output: &str, dt: Duration) -> Result<bool, OverviewError> {
        self.tick(dt)?;
        if self.session.is_none() {
            return Ok(false);
        }
        self.pre_render()?;
        self.render_output(output)
    }

    /// Advance animations by `dt`; drops the session once it finished
    /// closing.
    pub fn tick(&mut self, dt: Duration) -> Result<(), OverviewError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        if session.advance(dt, &mut self.compositor, &mut self.renderer)?
            == SessionStatus::Finished
        {
            self.session = None;
            self.compositor.unset_cursor_image();
            info!("overview closed");
        }
        Ok(())
    }
}

//  Tests
