//! IPC listener that accepts overview commands over a Unix socket.
//!
//! External tools (keybind scripts, gesture daemons, etc.) can connect to
//! the socket and send newline-delimited JSON commands.

pub mod listener;
