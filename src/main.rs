//! Entry point for the **hyprexpo** preview daemon.
//!
//! Runs the overview against the in-memory backends: a
//! [`HeadlessCompositor`] seeded with a few workspaces and a
//! [`RecordingRenderer`].  Commands arrive from the Unix socket listener
//! and, inside a Hyprland session, from Hyprland's swipe events.
//!
//! When the `preview-gtk` feature is enabled the main thread runs the GLib
//! main loop and shows the composited grid in a window.  Without the feature
//! a plain frame loop is used and the composite is only logged.
//!
//! ```text
//! hyprexpo [--workspaces 1,2,3,5] [--active 2]
//! ```

use hyprexpo::command::Command;
use hyprexpo::config::Config;
use hyprexpo::controller::OverviewController;
use hyprexpo::gestures::HyprlandGestureSource;
use hyprexpo::headless::{default_output, HeadlessCompositor, RecordingRenderer};
use hyprexpo::ipc::listener::UnixSocketListener;
use hyprexpo::traits::{CommandSource, WorkspaceId};
use log::{error, info, warn};
use std::sync::mpsc;

/// Default socket path for the command listener.
fn default_socket_path() -> String {
    let runtime = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".into());
    format!("{}/hyprexpo.sock", runtime)
}

/// Resolve the config directory (`$XDG_CONFIG_HOME/hyprexpo`).
fn config_dir() -> std::path::PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        format!("{}/.config", home)
    });
    std::path::PathBuf::from(base).join("hyprexpo")
}

/// Try to load the config from `$XDG_CONFIG_HOME/hyprexpo/config.json`,
/// falling back to compiled-in defaults.
fn load_config() -> Config {
    let path = config_dir().join("config.json");
    match Config::load(&path) {
        Ok(cfg) => {
            info!("loaded config from {}", path.display());
            cfg
        }
        Err(e) => {
            info!("no config file ({}), using defaults", e);
            Config::default()
        }
    }
}

/// Workspaces the headless compositor starts with.
struct Seed {
    workspaces: Vec<WorkspaceId>,
    active: WorkspaceId,
}

fn parse_args() -> Seed {
    let mut seed = Seed {
        workspaces: vec![1, 2, 3, 4],
        active: 1,
    };
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match (arg.as_str(), args.next()) {
            ("--workspaces", Some(list)) => {
                let ids: Vec<WorkspaceId> = list
                    .split(',')
                    .filter_map(|s| s.trim().parse().ok())
                    .filter(|id| *id >= 1)
                    .collect();
                if ids.is_empty() {
                    warn!("ignoring empty workspace list {:?}", list);
                } else {
                    seed.workspaces = ids;
                }
            }
            ("--active", Some(id)) => match id.parse() {
                Ok(id) => seed.active = id,
                Err(_) => warn!("ignoring bad --active value {:?}", id),
            },
            (other, _) => warn!("unknown argument {:?}", other),
        }
    }
    seed
}

//  Main

fn main() {
    env_logger::init();

    let config = load_config();
    let seed = parse_args();
    info!(
        "headless output with workspaces {:?}, active {}",
        seed.workspaces, seed.active
    );

    let compositor = HeadlessCompositor::new(default_output(), seed.workspaces, seed.active);
    let controller = OverviewController::new(compositor, RecordingRenderer::new(), config);

    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
    spawn_command_sources(cmd_tx);

    start_event_loop(controller, cmd_rx);
}

//  Event loops

type Controller = OverviewController<HeadlessCompositor, RecordingRenderer>;

#[cfg(feature = "preview-gtk")]
fn start_event_loop(controller: Controller, cmd_rx: mpsc::Receiver<Command>) {
    hyprexpo::preview::gtk::run_main_loop(controller, cmd_rx);
}

#[cfg(not(feature = "preview-gtk"))]
fn start_event_loop(mut controller: Controller, cmd_rx: mpsc::Receiver<Command>) {
    use log::debug;
    use std::sync::mpsc::RecvTimeoutError;
    use std::time::{Duration, Instant};

    const FRAME: Duration = Duration::from_millis(16);

    info!("hyprexpo running");
    let output = default_output().name;
    let mut last_frame = Instant::now();
    loop {
        match cmd_rx.recv_timeout(FRAME) {
            Ok(cmd) => {
                debug!("command: {:?}", cmd);
                if let Err(e) = controller.handle(cmd) {
                    warn!("command rejected: {}", e);
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        let now = Instant::now();
        let dt = now - last_frame;
        last_frame = now;

        controller.renderer_mut().take_ops();
        match controller.frame(&output, dt) {
            Ok(true) => debug!(
                "composited {} ops",
                controller.renderer().last_composite().len()
            ),
            Ok(false) => {}
            Err(e) => {
                error!("fatal overview error: {}", e);
                std::process::exit(1);
            }
        }
    }
    info!("all command sources closed, exiting");
}

//  Helpers

fn spawn_command_sources(tx: mpsc::Sender<Command>) {
    {
        let tx = tx.clone();
        let path = default_socket_path();
        std::thread::spawn(move || {
            let mut source = UnixSocketListener::new(&path);
            if let Err(e) = source.run(tx) {
                error!("socket listener error on {}: {}", source.path().display(), e);
            }
        });
    }

    // Inside a Hyprland session, swipes also come straight from its event
    // socket.
    if std::env::var_os("HYPRLAND_INSTANCE_SIGNATURE").is_some() {
        let tx = tx.clone();
        std::thread::spawn(move || {
            let mut source = HyprlandGestureSource::new();
            if let Err(e) = source.run(tx) {
                warn!("hyprland gesture source stopped: {}", e);
            }
        });
    }

    drop(tx);
}
