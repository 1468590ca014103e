//! Touchpad swipe recognition.
//!
//! Two pieces live here:
//!
//! * [`SwipeTracker`]: decides, for each swipe update, whether the overview
//!   should open (and in which zoom mode), resume an existing session, or
//!   leave the event to the host.
//! * [`HyprlandGestureSource`]: a [`CommandSource`] reading raw swipe events
//!   from Hyprland's event socket and forwarding them as
//!   [`Command::SwipeBegin`] / [`Command::SwipeUpdate`] / [`Command::SwipeEnd`].
//!
//! # Routing
//!
//! The first update of a swipe locks its axis to whichever delta component is
//! larger.  The expo gesture (`expo_fingers`) only reacts to vertical swipes:
//! it opens a grid-zoom overview when the signed vertical delta points in the
//! opening direction, and resumes an open overview when it points the other
//! way.  The swish gesture (`swish_fingers`) opens a scale-zoom overview, or
//! resumes the open one, regardless of axis.
//!
//! A finger count with a [`GestureBinding`] (for the modifiers held at that
//! moment) skips this routing: the overview opens in the binding's mode when
//! the swipe begins, and every update is fed to it scaled by the binding's
//! delta factor.
//!
//! Swipe events are swallowed while an overview exists or a swipe is being
//! tracked, so the host's own workspace-swipe never runs underneath.

use crate::command::Command;
use crate::geometry::Vec2;
use crate::session::zoom::ZoomKind;
use crate::traits::{CommandSource, EventDisposition};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{BufRead, BufReader};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::sync::mpsc;

/// Tuning knobs for gesture recognition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Fingers for the vertical grid-zoom gesture.  Default: `3`.
    pub expo_fingers: u32,
    /// Fingers for the scale-zoom gesture.  Default: `4`.
    pub swish_fingers: u32,
    /// Default: `true`.
    pub enable_expo_gesture: bool,
    /// Default: `true`.
    pub enable_swish_gesture: bool,
    /// Explicit gesture bindings, in declaration order.  A bound finger
    /// count opens the overview as soon as the swipe begins.
    pub bindings: Vec<GestureBinding>,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            expo_fingers: 3,
            swish_fingers: 4,
            enable_expo_gesture: true,
            enable_swish_gesture: true,
            bindings: Vec::new(),
        }
    }
}

impl GestureConfig {
    /// The binding a swipe with `fingers` and `mods` held starts, if any.
    ///
    /// `unset` entries remove every earlier binding with the same finger
    /// count, direction and modifiers.  Of the remaining bindings the first
    /// declared one wins.
    pub fn binding_for(&self, fingers: u32, mods: Modifiers) -> Option<&GestureBinding> {
        let mut live: Vec<&GestureBinding> = Vec::new();
        for binding in &self.bindings {
            if binding.action == GestureAction::Unset {
                let before = live.len();
                live.retain(|b| !b.same_trigger(binding));
                if live.len() == before {
                    warn!("gesture binding \"{}\" unsets nothing", binding);
                }
            } else {
                live.push(binding);
            }
        }
        live.into_iter().find(|b| b.fingers == fingers && b.mods == mods)
    }
}

//  Bindings

/// Keyboard modifiers held while a swipe starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers(u8);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const SHIFT: Modifiers = Modifiers(1);
    pub const CTRL: Modifiers = Modifiers(1 << 1);
    pub const ALT: Modifiers = Modifiers(1 << 2);
    pub const SUPER: Modifiers = Modifiers(1 << 3);

    const NAMES: [(Modifiers, &'static str); 4] = [
        (Modifiers::SUPER, "SUPER"),
        (Modifiers::SHIFT, "SHIFT"),
        (Modifiers::CTRL, "CTRL"),
        (Modifiers::ALT, "ALT"),
    ];

    pub fn contains(self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0
    }

    /// Parse a modifier list such as `"SUPER_SHIFT"` or `"ctrl alt"`.
    pub fn parse(text: &str) -> Result<Modifiers, GestureBindingError> {
        let mut mods = Modifiers::NONE;
        for name in text
            .split(|c: char| c == '_' || c == '+' || c.is_whitespace())
            .filter(|n| !n.is_empty())
        {
            mods = mods
                | match name.to_uppercase().as_str() {
                    "SHIFT" => Modifiers::SHIFT,
                    "CTRL" | "CONTROL" => Modifiers::CTRL,
                    "ALT" | "MOD1" => Modifiers::ALT,
                    "SUPER" | "WIN" | "LOGO" | "MOD4" | "META" => Modifiers::SUPER,
                    _ => return Err(GestureBindingError::Modifier(name.to_string())),
                };
        }
        Ok(mods)
    }
}

impl std::ops::BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Modifiers) -> Modifiers {
        Modifiers(self.0 | rhs.0)
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(m, _)| self.contains(*m))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "{}", names.join("_"))
    }
}

/// Direction a bound gesture is declared for.
///
/// Swipe events carry no direction when they begin, so the direction only
/// distinguishes bindings from one another (for `unset`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureDirection {
    Swipe,
    Horizontal,
    Vertical,
    Left,
    Right,
    Up,
    Down,
}

impl GestureDirection {
    fn parse(text: &str) -> Option<GestureDirection> {
        Some(match text {
            "swipe" => GestureDirection::Swipe,
            "horizontal" => GestureDirection::Horizontal,
            "vertical" => GestureDirection::Vertical,
            "left" => GestureDirection::Left,
            "right" => GestureDirection::Right,
            "up" => GestureDirection::Up,
            "down" => GestureDirection::Down,
            _ => return None,
        })
    }
}

impl fmt::Display for GestureDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GestureDirection::Swipe => "swipe",
            GestureDirection::Horizontal => "horizontal",
            GestureDirection::Vertical => "vertical",
            GestureDirection::Left => "left",
            GestureDirection::Right => "right",
            GestureDirection::Up => "up",
            GestureDirection::Down => "down",
        };
        write!(f, "{}", name)
    }
}

/// What a bound gesture does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureAction {
    /// Open a grid-zoom overview.
    Expo,
    /// Open a scale-zoom overview.
    Swish,
    /// Remove an earlier binding with the same trigger.
    Unset,
}

/// A gesture binding: `fingers, direction, [mod: MODS,] [scale: F,] action`.
///
/// ```text
/// 3, up, expo
/// 4, swipe, mod: SUPER, scale: 1.5, swish
/// 3, up, unset
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GestureBinding {
    pub fingers: u32,
    pub direction: GestureDirection,
    pub mods: Modifiers,
    /// Factor applied to every swipe delta, clamped to `[0.1, 10]`.
    pub delta_scale: f64,
    pub action: GestureAction,
}

impl GestureBinding {
    pub fn parse(text: &str) -> Result<GestureBinding, GestureBindingError> {
        let mut fields = text.split(',').map(str::trim);
        let mut next = |what: &'static str| {
            fields
                .next()
                .filter(|f| !f.is_empty())
                .ok_or(GestureBindingError::Missing(what))
        };

        let raw_fingers = next("finger count")?;
        let fingers = raw_fingers
            .parse::<u32>()
            .ok()
            .filter(|n| (2..=9).contains(n))
            .ok_or_else(|| GestureBindingError::Fingers(raw_fingers.to_string()))?;

        let raw_direction = next("direction")?;
        let direction = GestureDirection::parse(raw_direction)
            .ok_or_else(|| GestureBindingError::Direction(raw_direction.to_string()))?;

        let mut mods = Modifiers::NONE;
        let mut delta_scale = 1.0;
        let action = loop {
            let field = next("action")?;
            if let Some(rest) = field.strip_prefix("mod:") {
                mods = Modifiers::parse(rest)?;
            } else if let Some(rest) = field.strip_prefix("scale:") {
                let scale: f64 = rest
                    .trim()
                    .parse()
                    .map_err(|_| GestureBindingError::Scale(rest.trim().to_string()))?;
                delta_scale = scale.clamp(0.1, 10.0);
            } else {
                break match field {
                    "expo" => GestureAction::Expo,
                    "swish" => GestureAction::Swish,
                    "unset" => GestureAction::Unset,
                    other => return Err(GestureBindingError::Action(other.to_string())),
                };
            }
        };

        Ok(GestureBinding {
            fingers,
            direction,
            mods,
            delta_scale,
            action,
        })
    }

    /// The zoom mode this binding opens, `None` for `unset`.
    pub fn zoom(&self) -> Option<ZoomKind> {
        match self.action {
            GestureAction::Expo => Some(ZoomKind::Grid),
            GestureAction::Swish => Some(ZoomKind::Scale),
            GestureAction::Unset => None,
        }
    }

    fn same_trigger(&self, other: &GestureBinding) -> bool {
        self.fingers == other.fingers
            && self.direction == other.direction
            && self.mods == other.mods
    }
}

impl fmt::Display for GestureBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.fingers, self.direction)?;
        if self.mods != Modifiers::NONE {
            write!(f, ", mod: {}", self.mods)?;
        }
        if self.delta_scale != 1.0 {
            write!(f, ", scale: {}", self.delta_scale)?;
        }
        let action = match self.action {
            GestureAction::Expo => "expo",
            GestureAction::Swish => "swish",
            GestureAction::Unset => "unset",
        };
        write!(f, ", {}", action)
    }
}

impl TryFrom<String> for GestureBinding {
    type Error = GestureBindingError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        GestureBinding::parse(&text)
    }
}

impl From<GestureBinding> for String {
    fn from(binding: GestureBinding) -> String {
        binding.to_string()
    }
}

/// A malformed gesture binding.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GestureBindingError {
    #[error("missing {0}")]
    Missing(&'static str),
    #[error("invalid value {0} for finger count")]
    Fingers(String),
    #[error("invalid direction: {0}")]
    Direction(String),
    #[error("invalid modifier: {0}")]
    Modifier(String),
    #[error("invalid delta scale: {0}")]
    Scale(String),
    #[error("invalid gesture: {0}")]
    Action(String),
}

/// The axis a swipe was locked to on its first decisive update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeAxis {
    Horizontal,
    Vertical,
}

/// Dominant axis of a delta, or `None` when both components are equal.
pub(crate) fn dominant_axis(delta: Vec2) -> Option<SwipeAxis> {
    let (ax, ay) = (delta.x.abs(), delta.y.abs());
    if ax > ay {
        Some(SwipeAxis::Horizontal)
    } else if ay > ax {
        Some(SwipeAxis::Vertical)
    } else {
        None
    }
}

/// What the controller should do with one swipe update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwipeRoute {
    /// Whether the host must stop processing the event.
    pub disposition: EventDisposition,
    /// Open a new session in this mode before feeding the update.
    pub open: Option<ZoomKind>,
    /// Feed the update to the session (if one exists after `open`).
    pub feed: bool,
    /// The delta to feed, after the binding's scale factor.
    pub delta: Vec2,
}

impl SwipeRoute {
    fn ignore(disposition: EventDisposition) -> Self {
        Self {
            disposition,
            open: None,
            feed: false,
            delta: Vec2::default(),
        }
    }
}

/// Per-swipe state shared by every gesture source.
#[derive(Debug, Default)]
pub struct SwipeTracker {
    axis: Option<SwipeAxis>,
    active: bool,
    /// Delta scale of the binding that started the swipe.
    bound: Option<f64>,
}

impl SwipeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an overview swipe is in progress.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn axis(&self) -> Option<SwipeAxis> {
        self.axis
    }

    /// Whether the current swipe was started by a [`GestureBinding`].
    pub fn is_bound(&self) -> bool {
        self.bound.is_some()
    }

    /// A new swipe started; forget the previous axis lock.
    pub fn begin(&mut self) {
        self.axis = None;
    }

    /// A swipe started by `binding`.  Every update of it is fed to the
    /// overview, scaled by the binding's factor.
    pub fn begin_bound(&mut self, binding: &GestureBinding) {
        self.axis = None;
        self.active = true;
        self.bound = Some(binding.delta_scale);
    }

    /// Route one update.  `session_open` tells whether an overview exists
    /// before the update is applied.
    pub fn update(
        &mut self,
        config: &GestureConfig,
        positive: bool,
        fingers: u32,
        delta: Vec2,
        session_open: bool,
    ) -> SwipeRoute {
        if let Some(scale) = self.bound {
            return SwipeRoute {
                disposition: EventDisposition::Consumed,
                open: None,
                feed: session_open,
                delta: delta * scale,
            };
        }
        if self.axis.is_none() {
            self.axis = dominant_axis(delta);
        }

        let passive = if self.active || session_open {
            EventDisposition::Consumed
        } else {
            EventDisposition::PassThrough
        };

        let expo = config.enable_expo_gesture && fingers == config.expo_fingers;
        let swish = config.enable_swish_gesture && fingers == config.swish_fingers;

        if !expo && !swish {
            return SwipeRoute::ignore(passive);
        }
        if expo && self.axis != Some(SwipeAxis::Vertical) {
            return SwipeRoute::ignore(passive);
        }

        let mut open = None;
        if !self.active {
            if expo {
                let signed = if positive { delta.y } else { -delta.y };
                if session_open && signed <= 0.0 {
                    debug!("expo swipe resumes the open overview");
                    self.active = true;
                } else if !session_open && signed > 0.0 {
                    debug!("expo swipe opens a grid overview");
                    open = Some(ZoomKind::Grid);
                    self.active = true;
                }
            } else if session_open {
                self.active = true;
            } else {
                debug!("swish swipe opens a scale overview");
                open = Some(ZoomKind::Scale);
                self.active = true;
            }
        }

        SwipeRoute {
            disposition: EventDisposition::Consumed,
            open,
            feed: session_open || open.is_some(),
            delta,
        }
    }

    /// The fingers lifted.  Returns whether the tracker was driving a swipe.
    pub fn end(&mut self) -> bool {
        self.bound = None;
        std::mem::replace(&mut self.active, false)
    }
}

//  Hyprland event socket

/// A [`CommandSource`] that reads swipe events from Hyprland's event socket
/// (`socket2`) and forwards them unprocessed.
///
/// Lines arrive as `EVENT>>DATA`:
///
/// | Event         | Payload               |
/// |---------------|-----------------------|
/// | `swipebegin`  | `<fingers>`           |
/// | `swipeupdate` | `<fingers>,<dx>,<dy>` |
/// | `swipeend`    | `<fingers>`           |
pub struct HyprlandGestureSource {
    path: Option<PathBuf>,
}

impl HyprlandGestureSource {
    /// Connect to the socket of the running Hyprland instance.
    pub fn new() -> Self {
        Self { path: None }
    }

    /// Connect to an explicit socket path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }
}

impl Default for HyprlandGestureSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve `$XDG_RUNTIME_DIR/hypr/$HYPRLAND_INSTANCE_SIGNATURE/.socket2.sock`.
fn socket2_path() -> Result<PathBuf, HyprlandGestureError> {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR")
        .map_err(|_| HyprlandGestureError("XDG_RUNTIME_DIR not set".into()))?;
    let his = std::env::var("HYPRLAND_INSTANCE_SIGNATURE")
        .map_err(|_| HyprlandGestureError("HYPRLAND_INSTANCE_SIGNATURE not set".into()))?;
    Ok(PathBuf::from(format!(
        "{}/hypr/{}/.socket2.sock",
        runtime_dir, his
    )))
}

/// Split `EVENT>>DATA` into its parts.
fn parse_event_line(line: &str) -> Option<(&str, &str)> {
    let sep = line.find(">>")?;
    Some((&line[..sep], &line[sep + 2..]))
}

/// Translate one socket event into a command.
fn swipe_command(event: &str, data: &str) -> Option<Command> {
    // Strip any namespace prefix ("touchpad:swipebegin" → "swipebegin").
    let event = event.rsplit_once(':').map(|(_, name)| name).unwrap_or(event);
    let data = data.trim();
    match event {
        "swipebegin" => data
            .parse()
            .ok()
            .map(|fingers| Command::SwipeBegin { fingers }),
        "swipeupdate" => {
            let mut parts = data.split(',');
            let fingers = parts.next()?.trim().parse().ok()?;
            let dx = parts.next()?.trim().parse().ok()?;
            let dy = parts.next()?.trim().parse().ok()?;
            Some(Command::SwipeUpdate { fingers, dx, dy })
        }
        "swipeend" => Some(Command::SwipeEnd),
        _ => None,
    }
}

impl CommandSource for HyprlandGestureSource {
    type Error = HyprlandGestureError;

    /// Connect and forward swipe events until the socket closes.
    ///
    /// This method **blocks**.  Run it on a dedicated thread.
    fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), Self::Error> {
        let path = match &self.path {
            Some(p) => p.clone(),
            None => socket2_path()?,
        };
        let stream = UnixStream::connect(&path)
            .map_err(|e| HyprlandGestureError(format!("connect to {}: {}", path.display(), e)))?;
        info!("gesture source connected to {}", path.display());

        for line in BufReader::new(stream).lines() {
            match line {
                Ok(line) if line.is_empty() => continue,
                Ok(line) => {
                    let Some(cmd) = parse_event_line(&line).and_then(|(e, d)| swipe_command(e, d))
                    else {
                        continue;
                    };
                    if sink.send(cmd).is_err() {
                        info!("sink closed, shutting down gesture source");
                        return Ok(());
                    }
                }
                Err(e) => {
                    error!("socket2 read error: {}", e);
                    return Err(HyprlandGestureError(format!("read error: {}", e)));
                }
            }
        }

        warn!("socket2 stream ended");
        Ok(())
    }
}

/// Error from the Hyprland gesture source.
#[derive(Debug, thiserror::Error)]
#[error("hyprland gesture error: {0}")]
pub struct HyprlandGestureError(String);

//  Tests
