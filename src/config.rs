//! Application configuration.
//!
//! The configuration is loaded from a JSON file at
//! `$XDG_CONFIG_HOME/hyprexpo/config.json`.  Every section is optional and
//! falls back to compiled-in defaults, so `{}` is a valid file.
//!
//! Values are read when an overview opens and snapshotted into the session;
//! editing the file does not affect an overview that is already showing.
//!
//! # Example
//!
//! ```json
//! {
//!   "overview": {
//!     "columns": 3,
//!     "gap_size": 5,
//!     "bg_col": 4279308561,
//!     "workspace_method": "center current",
//!     "skip_empty": false,
//!     "gesture_distance": 200,
//!     "gesture_positive": true,
//!     "zoom_scale": 0.9
//!   },
//!   "gestures": {
//!     "expo_fingers": 3,
//!     "swish_fingers": 4,
//!     "bindings": ["4, swipe, mod: SUPER, scale: 1.5, swish"]
//!   },
//!   "animation": { "duration_ms": 300 }
//! }
//! ```

use crate::animation::AnimationConfig;
use crate::gestures::GestureConfig;
use crate::traits::{Compositor, WorkspaceId};
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Grid layout and zoom settings.
    #[serde(default)]
    pub overview: OverviewConfig,

    /// Gesture recognition settings.
    #[serde(default)]
    pub gestures: GestureConfig,

    /// Timing of eased open/close transitions.
    #[serde(default)]
    pub animation: AnimationConfig,
}

/// Grid layout and zoom settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverviewConfig {
    /// Side length `N` of the `N × N` grid.
    pub columns: u32,
    /// Gap between tiles in the zoomed-out grid (logical px).
    pub gap_size: u32,
    /// Background colour as packed `0xAARRGGBB`.
    pub bg_col: u32,
    /// Grid layout policy: `"center <workspace>"` or `"first <workspace>"`.
    pub workspace_method: String,
    /// Leave out workspaces that do not exist.
    pub skip_empty: bool,
    /// Touchpad travel that spans a full zoom.
    pub gesture_distance: u32,
    /// Whether a positive vertical delta zooms out.
    pub gesture_positive: bool,
    /// Scale applied to the grid while swiping in scale-zoom mode.
    pub zoom_scale: f64,
    /// Capture tiles at reduced resolution while the grid is shown.
    pub low_res_previews: bool,
}

impl Default for OverviewConfig {
    fn default() -> Self {
        Self {
            columns: 3,
            gap_size: 5,
            bg_col: 0xFF11_1111,
            workspace_method: "center current".into(),
            skip_empty: false,
            gesture_distance: 200,
            gesture_positive: true,
            zoom_scale: 0.9,
            low_res_previews: true,
        }
    }
}

impl OverviewConfig {
    /// Grid side length, never below 2.
    ///
    /// A 1×1 grid has no zoomed-out state and makes the fractional tile
    /// position divide by zero.
    pub fn side_length(&self) -> usize {
        self.columns.max(2) as usize
    }

    /// Gesture distance, never zero.
    pub fn gesture_distance(&self) -> f64 {
        self.gesture_distance.max(1) as f64
    }
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;
        Ok(config)
    }
}

/// Where the workspace scan starts and how the grid is filled around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceMethod {
    /// Put this workspace in the middle tile, filling backwards and forwards.
    Center(WorkspaceId),
    /// Put this workspace in the first tile, filling forwards.
    Start(WorkspaceId),
}

impl WorkspaceMethod {
    /// Parse a `"<mode> <selector>"` string such as `"center current"` or
    /// `"first 1"`.
    ///
    /// A first token of `center` selects centered mode; any other token
    /// selects start mode.  Malformed strings and unresolvable selectors
    /// fall back to the `active` workspace.
    pub fn parse<C: Compositor + ?Sized>(text: &str, compositor: &C, active: WorkspaceId) -> Self {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        if tokens.len() < 2 {
            warn!(
                "workspace_method {:?} needs a mode and a selector, centering on {}",
                text, active
            );
            return WorkspaceMethod::Center(active);
        }

        let id = compositor.resolve_workspace(tokens[1]).unwrap_or_else(|| {
            warn!(
                "workspace_method selector {:?} does not resolve, using {}",
                tokens[1], active
            );
            active
        });

        if tokens[0] == "center" {
            WorkspaceMethod::Center(id)
        } else {
            WorkspaceMethod::Start(id)
        }
    }
}

/// Error from loading or parsing a configuration file.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);
