//! Unix-socket [`CommandSource`] implementation.
//!
//! Binds a Unix stream socket and accepts one connection at a time.
//! Each line received is parsed as a JSON-encoded [`Command`].
//!
//! # Wire format
//!
//! Every message is a single line of JSON followed by `\n`:
//!
//! ```json
//! {"Expo":"toggle"}
//! {"SwipeBegin":{"fingers":3}}
//! {"SwipeUpdate":{"fingers":3,"dx":0.0,"dy":12.5}}
//! "SwipeEnd"
//! {"PointerMove":{"x":640.0,"y":360.0}}
//! "PointerSelect"
//! ```
//!
//! A keybind can drive the overview with e.g.
//! `echo '{"Expo":"toggle"}' | socat - UNIX-CONNECT:$XDG_RUNTIME_DIR/hyprexpo.sock`.

use crate::command::Command;
use crate::traits::CommandSource;
use log::{debug, error, info, warn};
use std::io::{BufRead, BufReader};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::mpsc;

/// A [`CommandSource`] that listens on a Unix stream socket for
/// JSON-encoded overview commands.
///
/// Each accepted connection can send multiple newline-delimited JSON
/// commands.  When the connection closes, the listener waits for the
/// next one.
pub struct UnixSocketListener {
    path: PathBuf,
}

/// Errors produced by the Unix socket listener.
#[derive(Debug, thiserror::Error)]
pub enum UnixSocketError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl UnixSocketListener {
    /// Create a new listener bound to `path`.
    ///
    /// The socket file is created when [`run`](CommandSource::run) is called
    /// and removed when the source shuts down.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The filesystem path of the socket.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Parse one wire line.  Blank lines yield `Ok(None)`.
fn parse_line(text: &str) -> Result<Option<Command>, UnixSocketError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(text)?))
}

/// Why a client connection stopped being served.
enum ClientEnd {
    Disconnected,
    SinkClosed,
}

/// Forward every command from one client until it hangs up.
fn serve_client(stream: UnixStream, sink: &mpsc::Sender<Command>) -> ClientEnd {
    for line in BufReader::new(stream).lines() {
        let text = match line {
            Ok(text) => text,
            Err(e) => {
                error!("read error: {}", e);
                break;
            }
        };
        match parse_line(&text) {
            Ok(Some(cmd)) => {
                debug!("received {:?}", cmd);
                if sink.send(cmd).is_err() {
                    return ClientEnd::SinkClosed;
                }
            }
            Ok(None) => {}
            Err(e) => warn!("bad command {:?}: {}", text, e),
        }
    }
    ClientEnd::Disconnected
}

impl CommandSource for UnixSocketListener {
    type Error = UnixSocketError;

    /// Bind the socket and serve clients one after another.
    ///
    /// This method **blocks** until the sink hangs up.  Run it on a
    /// dedicated thread.
    fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), Self::Error> {
        // A previous instance may have left its socket file behind.
        let _ = std::fs::remove_file(&self.path);

        let listener = UnixListener::bind(&self.path)?;
        info!("listening on {}", self.path.display());

        for stream in listener.incoming() {
            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    error!("accept error: {}", e);
                    continue;
                }
            };
            debug!("client connected");
            if let ClientEnd::SinkClosed = serve_client(stream, &sink) {
                info!("sink closed, shutting down");
                break;
            }
            debug!("client disconnected");
        }

        let _ = std::fs::remove_file(&self.path);
        Ok(())
    }
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ExpoAction;
    use std::io::Write;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Monotonic counter to generate unique socket paths per test.
    static TEST_ID: AtomicU32 = AtomicU32::new(0);

    fn tmp_socket_path() -> PathBuf {
        let id = TEST_ID.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!(
            "hyprexpo-test-{}-{}.sock",
            std::process::id(),
            id
        ))
    }

    fn spawn_listener(path: &Path) -> mpsc::Receiver<Command> {
        let (tx, rx) = mpsc::channel();
        let path = path.to_path_buf();
        std::thread::spawn(move || {
            let mut listener = UnixSocketListener::new(&path);
            let _ = listener.run(tx);
        });
        // Give the listener a moment to bind.
        std::thread::sleep(std::time::Duration::from_millis(150));
        rx
    }

    #[test]
    fn round_trip_commands_over_socket() {
        let path = tmp_socket_path();
        let rx = spawn_listener(&path);

        {
            let mut stream = UnixStream::connect(&path).expect("connect");
            writeln!(stream, r#"{{"Expo":"toggle"}}"#).unwrap();
            writeln!(stream, r#"{{"SwipeUpdate":{{"fingers":3,"dx":0.0,"dy":12.5}}}}"#).unwrap();
            writeln!(stream).unwrap();
            writeln!(stream, r#""PointerSelect""#).unwrap();
            stream.shutdown(std::net::Shutdown::Write).unwrap();
        }

        std::thread::sleep(std::time::Duration::from_millis(150));
        let cmds: Vec<Command> = rx.try_iter().collect();

        assert_eq!(cmds.len(), 3);
        assert_eq!(cmds[0], Command::Expo(ExpoAction::Toggle));
        assert_eq!(
            cmds[1],
            Command::SwipeUpdate {
                fingers: 3,
                dx: 0.0,
                dy: 12.5
            }
        );
        assert_eq!(cmds[2], Command::PointerSelect);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn malformed_json_does_not_crash() {
        let path = tmp_socket_path();
        let rx = spawn_listener(&path);

        {
            let mut stream = UnixStream::connect(&path).expect("connect");
            writeln!(stream, "not json at all").unwrap();
            writeln!(stream, r#"{{"Expo":"off"}}"#).unwrap();
            stream.shutdown(std::net::Shutdown::Write).unwrap();
        }

        std::thread::sleep(std::time::Duration::from_millis(150));
        let cmds: Vec<Command> = rx.try_iter().collect();
        // Only the valid command should have arrived.
        assert_eq!(cmds, vec![Command::Expo(ExpoAction::Close)]);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn parse_line_skips_blanks_and_reports_json_errors() {
        assert!(matches!(parse_line("   "), Ok(None)));
        assert!(matches!(
            parse_line(r#""SwipeEnd""#),
            Ok(Some(Command::SwipeEnd))
        ));
        assert!(matches!(parse_line("{"), Err(UnixSocketError::Json(_))));
    }

    #[test]
    fn serves_consecutive_clients() {
        let path = tmp_socket_path();
        let rx = spawn_listener(&path);

        for action in ["open", "close"] {
            let mut stream = UnixStream::connect(&path).expect("connect");
            writeln!(stream, r#"{{"Expo":"{}"}}"#, action).unwrap();
            stream.shutdown(std::net::Shutdown::Write).unwrap();
            std::thread::sleep(std::time::Duration::from_millis(50));
        }

        std::thread::sleep(std::time::Duration::from_millis(100));
        let cmds: Vec<Command> = rx.try_iter().collect();
        assert_eq!(
            cmds,
            vec![
                Command::Expo(ExpoAction::Open),
                Command::Expo(ExpoAction::Close)
            ]
        );

        let _ = std::fs::remove_file(&path);
    }
}
