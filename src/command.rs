//! Commands understood by the overview controller.
//!
//! This module defines the vocabulary every command source shares:
//! [`Command`] describes each input the
//! [`OverviewController`](crate::controller::OverviewController) reacts to,
//! and [`ExpoAction`] the arguments of the overview dispatcher.
//!
//! The dispatcher argument is forwarded as a raw string and parsed here
//! (`"toggle"`, `"select"`, `"off"`, …), matching how keybinds pass it.

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Argument of the overview dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ExpoAction {
    /// Close the overview if open, otherwise open it fully zoomed out.
    Toggle,
    /// Pick the tile under the pointer and close onto it.
    Select,
    /// Close the overview if open.
    Close,
    /// Open the overview if none is open.
    Open,
}

impl fmt::Display for ExpoAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpoAction::Toggle => write!(f, "toggle"),
            ExpoAction::Select => write!(f, "select"),
            ExpoAction::Close => write!(f, "close"),
            ExpoAction::Open => write!(f, "open"),
        }
    }
}

impl ExpoAction {
    /// Parse a dispatcher argument (case-insensitive).
    ///
    /// `off`, `close` and `disable` all close.  Any other argument opens,
    /// the same as binding the dispatcher without an argument.
    pub fn parse(arg: &str) -> ExpoAction {
        match arg.trim().to_lowercase().as_str() {
            "toggle" => ExpoAction::Toggle,
            "select" => ExpoAction::Select,
            "off" | "close" | "disable" => ExpoAction::Close,
            _ => ExpoAction::Open,
        }
    }
}

impl<'de> Deserialize<'de> for ExpoAction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if s.chars().any(char::is_control) {
            return Err(DeError::custom(format!("invalid expo argument: {:?}", s)));
        }
        Ok(ExpoAction::parse(&s))
    }
}

/// Every input the overview controller reacts to.
///
/// # Wire format
///
/// Commands travel as externally tagged JSON, one per line:
///
/// ```json
/// {"Expo":"toggle"}
/// {"SwipeBegin":{"fingers":3}}
/// {"SwipeUpdate":{"fingers":3,"dx":0.0,"dy":12.5}}
/// "SwipeEnd"
/// {"PointerMove":{"x":640.0,"y":360.0}}
/// "PointerSelect"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Invoke the overview dispatcher.
    Expo(ExpoAction),

    //  Raw touchpad swipe events

    /// A multi-finger swipe has started.
    SwipeBegin { fingers: u32 },

    /// Incremental finger movement during a swipe, in raw touchpad units.
    SwipeUpdate { fingers: u32, dx: f64, dy: f64 },

    /// Fingers lifted.
    SwipeEnd,

    //  Pointer / touch

    /// The pointer moved to `(x, y)` in global layout coordinates.
    PointerMove { x: f64, y: f64 },

    /// A button press or touch-down at the current pointer position.
    PointerSelect,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expo_action_display() {
        assert_eq!(ExpoAction::Toggle.to_string(), "toggle");
        assert_eq!(ExpoAction::Select.to_string(), "select");
        assert_eq!(ExpoAction::Close.to_string(), "close");
        assert_eq!(ExpoAction::Open.to_string(), "open");
    }

    #[test]
    fn expo_action_aliases() {
        assert_eq!(ExpoAction::parse("off"), ExpoAction::Close);
        assert_eq!(ExpoAction::parse("disable"), ExpoAction::Close);
        assert_eq!(ExpoAction::parse(" Close "), ExpoAction::Close);
        assert_eq!(ExpoAction::parse("TOGGLE"), ExpoAction::Toggle);
    }

    #[test]
    fn unknown_expo_argument_opens() {
        assert_eq!(ExpoAction::parse(""), ExpoAction::Open);
        assert_eq!(ExpoAction::parse("on"), ExpoAction::Open);
    }

    #[test]
    fn deserialize_commands_from_json() {
        let cmd: Command = serde_json::from_str(r#"{"Expo":"select"}"#).unwrap();
        assert_eq!(cmd, Command::Expo(ExpoAction::Select));

        let cmd: Command =
            serde_json::from_str(r#"{"SwipeUpdate":{"fingers":4,"dx":1.5,"dy":-2.0}}"#).unwrap();
        assert_eq!(
            cmd,
            Command::SwipeUpdate {
                fingers: 4,
                dx: 1.5,
                dy: -2.0
            }
        );

        let cmd: Command = serde_json::from_str(r#""SwipeEnd""#).unwrap();
        assert_eq!(cmd, Command::SwipeEnd);

        let cmd: Command = serde_json::from_str(r#""PointerSelect""#).unwrap();
        assert_eq!(cmd, Command::PointerSelect);
    }

    #[test]
    fn serialize_round_trips_through_wire_format() {
        let cmd = Command::PointerMove { x: 10.0, y: 20.0 };
        let json = serde_json::to_string(&cmd).unwrap();
        assert_eq!(json, r#"{"PointerMove":{"x":10.0,"y":20.0}}"#);
    }

    #[test]
    fn expo_serializes_as_variant_name() {
        // Serialization uses the enum name; deserialization accepts the
        // lower-case dispatcher spelling as well.
        let json = serde_json::to_string(&Command::Expo(ExpoAction::Toggle)).unwrap();
        assert_eq!(json, r#"{"Expo":"Toggle"}"#);
        let back: Command = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Command::Expo(ExpoAction::Toggle));
    }
}
