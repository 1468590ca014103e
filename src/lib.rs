//! **hyprexpo**: a workspace-grid overview engine.
//!
//! Opening the overview captures every workspace of an `N × N` grid into an
//! offscreen tile and zooms out from the active workspace until the whole
//! grid is visible.  Picking a tile (pointer, keybind or swipe) zooms back
//! into it and switches to that workspace.  The zoom is either a grid-size
//! animation (expo) or a scale animation that pans with the fingers (swish).
//!
//! # Architecture
//!
//! The crate is organised around the collaborator traits in [`traits`]:
//!
//! * [`traits::Compositor`]: the workspace directory, pointer and frame
//!   scheduling of the host.
//! * [`traits::Renderer`]: offscreen capture, compositing and damage.
//! * [`traits::CommandSource`]: the transport that delivers user intent (a
//!   Unix socket, Hyprland's swipe events, …).
//!
//! [`controller::OverviewController`] is the single owner of the open
//! [`session::OverviewSession`] and the entry point for commands and frame
//! hooks.  [`headless`] provides in-memory backends used by the preview
//! daemon and the tests; [`ipc`] and [`gestures`] provide command sources.

pub mod animation;
pub mod bezier;
pub mod command;
pub mod config;
pub mod controller;
pub mod geometry;
pub mod gestures;
pub mod headless;
pub mod ipc;
pub mod layout;
pub mod preview;
pub mod session;
pub mod traits;
