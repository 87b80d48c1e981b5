//! playtime daemon entrypoint.
//!
//! A small, single-writer service that owns the play-time ledger. The gateway
//! bridge forwards presence updates and chat commands over a Unix socket
//! (newline-delimited JSON, one request per connection); every connection is
//! served on its own thread and all of them share one `Tracker`.

use fs_err as fs;
use std::env;
use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use playtime_core::{LedgerStore, Tracker};
use playtime_daemon_protocol::{
    parse_command, parse_presence, ErrorInfo, Method, Request, Response, MAX_REQUEST_BYTES,
    PROTOCOL_VERSION,
};

mod config;
mod shutdown;
mod state;

use state::SharedState;

const READ_TIMEOUT_SECS: u64 = 2;
const READ_CHUNK_SIZE: usize = 4096;

fn main() {
    init_logging();

    if let Err(err) = shutdown::block_termination_signals() {
        warn!(error = %err, "Signal-driven shutdown unavailable");
    }

    let daemon_config = match config::load_config(None) {
        Ok(config) => config,
        Err(err) => {
            warn!(error = %err, "Failed to load daemon config; using defaults");
            config::DaemonConfig::default()
        }
    };
    let paths = match config::resolve_paths(&daemon_config) {
        Ok(paths) => paths,
        Err(err) => {
            error!(error = %err, "Failed to resolve daemon paths");
            std::process::exit(1);
        }
    };

    let tracker = Tracker::open(LedgerStore::new(&paths.data_file));
    let shared_state = Arc::new(SharedState::new(tracker));
    let socket_path = Arc::new(paths.socket_path);

    if let Err(err) = prepare_socket_dir(&socket_path) {
        error!(error = %err, "Failed to prepare daemon socket directory");
        std::process::exit(1);
    }

    if let Err(err) = remove_existing_socket(&socket_path) {
        error!(error = %err, path = %socket_path.display(), "Failed to remove existing socket");
        std::process::exit(1);
    }

    let listener = match UnixListener::bind(socket_path.as_path()) {
        Ok(listener) => listener,
        Err(err) => {
            error!(error = %err, path = %socket_path.display(), "Failed to bind daemon socket");
            std::process::exit(1);
        }
    };

    {
        let state = Arc::clone(&shared_state);
        let socket_path = Arc::clone(&socket_path);
        shutdown::spawn_signal_watcher(move |signal| {
            shutdown_and_exit(&state, &socket_path, signal);
        });
    }

    info!(
        path = %socket_path.display(),
        data_file = %paths.data_file.display(),
        "playtime daemon started"
    );

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let state = Arc::clone(&shared_state);
                let socket_path = Arc::clone(&socket_path);
                thread::spawn(move || handle_connection(stream, state, socket_path));
            }
            Err(err) => {
                warn!(error = %err, "Failed to accept daemon connection");
            }
        }
    }
}

fn init_logging() {
    let debug_enabled = env::var("PLAYTIME_DEBUG_LOG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    let filter = if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn prepare_socket_dir(socket_path: &Path) -> Result<(), String> {
    let parent = socket_path
        .parent()
        .ok_or_else(|| "Socket path has no parent".to_string())?;
    fs::create_dir_all(parent).map_err(|err| format!("Failed to create socket directory: {}", err))
}

fn remove_existing_socket(socket_path: &Path) -> Result<(), String> {
    if socket_path.exists() {
        fs::remove_file(socket_path)
            .map_err(|err| format!("Failed to remove existing socket: {}", err))?;
    }
    Ok(())
}

/// Final save, then release the socket. Never returns.
fn shutdown_and_exit(state: &SharedState, socket_path: &Path, reason: &str) -> ! {
    info!(reason, "Shutting down playtime daemon");
    state.shutdown();
    release_socket_and_exit(socket_path)
}

fn release_socket_and_exit(socket_path: &Path) -> ! {
    if let Err(err) = remove_existing_socket(socket_path) {
        warn!(error = %err, "Failed to remove daemon socket on shutdown");
    }
    std::process::exit(0);
}

fn handle_connection(mut stream: UnixStream, state: Arc<SharedState>, socket_path: Arc<PathBuf>) {
    let request = match read_request(&mut stream) {
        Ok(request) => request,
        Err(err) => {
            warn!(code = %err.code, message = %err.message, "Failed to read request");
            let response = Response::error_with_info(None, err);
            let _ = write_response(&mut stream, response);
            return;
        }
    };

    tracing::debug!(method = ?request.method, id = ?request.id, "Daemon request received");
    let shutdown_requested =
        request.method == Method::Shutdown && request.protocol_version == PROTOCOL_VERSION;
    if shutdown_requested {
        info!(reason = "shutdown_request", "Shutting down playtime daemon");
        state.shutdown();
    }
    let response = handle_request(request, &state);
    let _ = write_response(&mut stream, response);

    if shutdown_requested {
        drop(stream);
        release_socket_and_exit(&socket_path);
    }
}

fn read_request(stream: &mut UnixStream) -> Result<Request, ErrorInfo> {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(READ_TIMEOUT_SECS)));

    let mut buffer = Vec::new();
    let mut chunk = [0u8; READ_CHUNK_SIZE];

    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                buffer.extend_from_slice(&chunk[..n]);
                if buffer.len() > MAX_REQUEST_BYTES {
                    return Err(ErrorInfo::new(
                        "request_too_large",
                        "request exceeded maximum size",
                    ));
                }
                if chunk[..n].contains(&b'\n') {
                    break;
                }
            }
            Err(err)
                if err.kind() == std::io::ErrorKind::WouldBlock
                    || err.kind() == std::io::ErrorKind::TimedOut =>
            {
                return Err(ErrorInfo::new("read_timeout", "request timed out"));
            }
            Err(err) => {
                return Err(ErrorInfo::new(
                    "read_error",
                    format!("failed to read request: {}", err),
                ));
            }
        }
    }

    let newline_index = buffer.iter().position(|b| *b == b'\n');
    let request_bytes = match newline_index {
        Some(index) => {
            if buffer.len() > index + 1 {
                let trailing = &buffer[index + 1..];
                if trailing.iter().any(|b| !b.is_ascii_whitespace()) {
                    warn!("Extra bytes detected after newline; ignoring trailing data");
                }
            }
            &buffer[..index]
        }
        None => buffer.as_slice(),
    };

    if request_bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(ErrorInfo::new("empty_request", "request body was empty"));
    }

    serde_json::from_slice(request_bytes).map_err(|err| {
        ErrorInfo::new(
            "invalid_json",
            format!("request was not valid JSON: {}", err),
        )
    })
}

fn handle_request(request: Request, state: &SharedState) -> Response {
    if request.protocol_version != PROTOCOL_VERSION {
        return Response::error(
            request.id,
            "protocol_mismatch",
            "unsupported protocol version",
        );
    }

    match request.method {
        Method::GetHealth => {
            let mut data = serde_json::json!({
                "status": "ok",
                "pid": std::process::id(),
                "version": env!("CARGO_PKG_VERSION"),
                "protocol_version": PROTOCOL_VERSION,
            });
            if let (Some(data), Ok(serde_json::Value::Object(snapshot))) = (
                data.as_object_mut(),
                serde_json::to_value(state.health_snapshot()),
            ) {
                data.extend(snapshot);
            }
            Response::ok(request.id, data)
        }
        Method::Presence => {
            let params = match request.params {
                Some(params) => params,
                None => {
                    return Response::error(
                        request.id,
                        "invalid_params",
                        "presence payload is required",
                    )
                }
            };
            let update = match parse_presence(params) {
                Ok(update) => update,
                Err(err) => return Response::error_with_info(request.id, err),
            };
            let outcome = state.apply_presence(&update);
            to_response(request.id, &outcome, "presence outcome")
        }
        Method::Command => {
            let params = match request.params {
                Some(params) => params,
                None => {
                    return Response::error(
                        request.id,
                        "invalid_params",
                        "command payload is required",
                    )
                }
            };
            let command = match parse_command(params) {
                Ok(command) => command,
                Err(err) => return Response::error_with_info(request.id, err),
            };
            let reply = state.handle_command(&command);
            to_response(request.id, &reply, "command reply")
        }
        Method::Shutdown => Response::ok(request.id, serde_json::json!({"stopping": true})),
    }
}

fn to_response<T: serde::Serialize>(id: Option<String>, value: &T, label: &str) -> Response {
    match serde_json::to_value(value) {
        Ok(value) => Response::ok(id, value),
        Err(err) => Response::error(
            id,
            "serialization_error",
            format!("Failed to serialize {}: {}", label, err),
        ),
    }
}

fn write_response(stream: &mut UnixStream, response: Response) -> std::io::Result<()> {
    serde_json::to_writer(&mut *stream, &response)?;
    stream.write_all(b"\n")?;
    stream.flush()?;
    Ok(())
}
