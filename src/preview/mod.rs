//! Preview window for the headless backends.
//!
//! When the `preview-gtk` feature is enabled, [`gtk::run_main_loop`] takes
//! over the main thread, drives the
//! [`OverviewController`](crate::controller::OverviewController) from the
//! GLib main loop and paints each recorded composite into a window.

#[cfg(feature = "preview-gtk")]
pub mod gtk;
