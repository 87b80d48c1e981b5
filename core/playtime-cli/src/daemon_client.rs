//! Client helper for talking to the playtime daemon.
//!
//! The daemon is the only writer. Failures are surfaced to the caller; there
//! is no local fallback.

use chrono::Utc;
use playtime_daemon_protocol::{
    CommandEvent, CommandReply, Method, PresenceUpdate, Request, Response, MAX_REQUEST_BYTES,
    PROTOCOL_VERSION,
};
use rand::RngCore;
use serde_json::Value;
use std::env;
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

const SOCKET_ENV: &str = "PLAYTIME_SOCKET";
const SOCKET_NAME: &str = "daemon.sock";
const READ_TIMEOUT_MS: u64 = 2_000;
const WRITE_TIMEOUT_MS: u64 = 600;
const RETRY_DELAY_MS: u64 = 50;

pub struct DaemonClient {
    socket: PathBuf,
}

impl DaemonClient {
    pub fn new(socket: impl Into<PathBuf>) -> Self {
        Self {
            socket: socket.into(),
        }
    }

    pub fn from_env() -> Result<Self, String> {
        Ok(Self::new(socket_path()?))
    }

    pub fn socket(&self) -> &Path {
        &self.socket
    }

    pub fn health(&self) -> Result<Value, String> {
        self.call(Method::GetHealth, None)
    }

    /// Retries once, only when connecting fails. A request that reached the
    /// socket is never resent.
    pub fn send_presence(&self, update: &PresenceUpdate) -> Result<Value, String> {
        let params = serde_json::to_value(update)
            .map_err(|err| format!("Failed to serialize presence: {}", err))?;
        let request = make_request(Method::Presence, Some(params));

        let stream = match self.connect() {
            Ok(stream) => stream,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    id = ?request.id,
                    "Failed to reach daemon for presence"
                );
                std::thread::sleep(Duration::from_millis(RETRY_DELAY_MS));
                self.connect().map_err(|retry_err| {
                    tracing::warn!(
                        error = %retry_err,
                        id = ?request.id,
                        "Retry failed reaching daemon for presence"
                    );
                    retry_err
                })?
            }
        };

        into_data(exchange(stream, &request)?)
    }

    pub fn send_command(&self, command: &CommandEvent) -> Result<CommandReply, String> {
        let params = serde_json::to_value(command)
            .map_err(|err| format!("Failed to serialize command: {}", err))?;
        let data = self.call(Method::Command, Some(params))?;
        serde_json::from_value(data).map_err(|err| format!("Unexpected command reply: {}", err))
    }

    pub fn shutdown(&self) -> Result<Value, String> {
        self.call(Method::Shutdown, None)
    }

    fn call(&self, method: Method, params: Option<Value>) -> Result<Value, String> {
        let request = make_request(method, params);
        into_data(exchange(self.connect()?, &request)?)
    }

    fn connect(&self) -> Result<UnixStream, String> {
        UnixStream::connect(&self.socket)
            .map_err(|err| format!("Failed to connect to daemon socket: {}", err))
    }
}

fn make_request(method: Method, params: Option<Value>) -> Request {
    Request {
        protocol_version: PROTOCOL_VERSION,
        method,
        id: Some(make_request_id()),
        params,
    }
}

fn into_data(response: Response) -> Result<Value, String> {
    if response.ok {
        Ok(response.data.unwrap_or(Value::Null))
    } else {
        Err(response
            .error
            .map(|err| format!("{}: {}", err.code, err.message))
            .unwrap_or_else(|| "Unknown daemon error".to_string()))
    }
}

fn exchange(mut stream: UnixStream, request: &Request) -> Result<Response, String> {
    let _ = stream.set_read_timeout(Some(Duration::from_millis(READ_TIMEOUT_MS)));
    let _ = stream.set_write_timeout(Some(Duration::from_millis(WRITE_TIMEOUT_MS)));

    serde_json::to_writer(&mut stream, request)
        .map_err(|err| format!("Failed to write request: {}", err))?;
    stream
        .write_all(b"\n")
        .map_err(|err| format!("Failed to flush request: {}", err))?;
    stream.flush().ok();

    read_response(&mut stream)
}

fn socket_path() -> Result<PathBuf, String> {
    if let Ok(path) = env::var(SOCKET_ENV) {
        return Ok(PathBuf::from(path));
    }
    let home = dirs::home_dir().ok_or_else(|| "Home directory not found".to_string())?;
    Ok(home.join(".playtime").join(SOCKET_NAME))
}

fn read_response(stream: &mut UnixStream) -> Result<Response, String> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                buffer.extend_from_slice(&chunk[..n]);
                if buffer.len() > MAX_REQUEST_BYTES {
                    return Err("Response exceeded maximum size".to_string());
                }
                if chunk[..n].contains(&b'\n') {
                    break;
                }
            }
            Err(err)
                if err.kind() == std::io::ErrorKind::WouldBlock
                    || err.kind() == std::io::ErrorKind::TimedOut =>
            {
                return Err("Timed out waiting for daemon response".to_string());
            }
            Err(err) => return Err(format!("Failed to read response: {}", err)),
        }
    }

    let newline_index = buffer.iter().position(|b| *b == b'\n');
    let response_bytes = match newline_index {
        Some(index) => &buffer[..index],
        None => buffer.as_slice(),
    };

    if response_bytes.is_empty() {
        return Err("Daemon response was empty".to_string());
    }

    serde_json::from_slice(response_bytes)
        .map_err(|err| format!("Failed to parse response JSON: {}", err))
}

fn make_request_id() -> String {
    let suffix = rand::thread_rng().next_u64();
    format!(
        "req-{}-{}-{:x}",
        Utc::now().timestamp_millis(),
        std::process::id(),
        suffix
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use playtime_daemon_protocol::{Activity, ActivityTotal};
    use std::os::unix::net::UnixListener;
    use std::sync::{Arc, Mutex};
    use std::thread;

    fn read_request(stream: &mut UnixStream) -> Request {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    buffer.extend_from_slice(&chunk[..n]);
                    if buffer.contains(&b'\n') {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
        let end = buffer.iter().position(|b| *b == b'\n').unwrap_or(buffer.len());
        serde_json::from_slice(&buffer[..end]).expect("request json")
    }

    /// Serves `responses` in order, one per connection, recording each request.
    fn fake_daemon(
        socket: &Path,
        responses: Vec<Response>,
    ) -> (thread::JoinHandle<()>, Arc<Mutex<Vec<Request>>>) {
        let listener = UnixListener::bind(socket).expect("bind fake daemon");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let handle = thread::spawn(move || {
            for response in responses {
                let (mut stream, _) = listener.accept().expect("accept");
                let request = read_request(&mut stream);
                seen_clone.lock().unwrap().push(request);
                serde_json::to_writer(&mut stream, &response).expect("write response");
                stream.write_all(b"\n").expect("newline");
            }
        });
        (handle, seen)
    }

    #[test]
    fn send_command_decodes_reply() {
        let temp = tempfile::tempdir().unwrap();
        let socket = temp.path().join("daemon.sock");
        let reply = CommandReply::Report {
            totals: vec![ActivityTotal {
                activity: "Chess".to_string(),
                seconds: 42.0,
            }],
        };
        let (handle, seen) = fake_daemon(
            &socket,
            vec![Response::ok(None, serde_json::to_value(&reply).unwrap())],
        );

        let client = DaemonClient::new(&socket);
        let decoded = client
            .send_command(&CommandEvent {
                user_id: "1234".to_string(),
                display_name: None,
                content: "!mygames".to_string(),
            })
            .unwrap();
        handle.join().unwrap();

        assert_eq!(decoded, reply);
        let requests = seen.lock().unwrap();
        assert_eq!(requests[0].method, Method::Command);
        assert_eq!(requests[0].protocol_version, PROTOCOL_VERSION);
        assert!(requests[0].id.as_deref().unwrap().starts_with("req-"));
    }

    #[test]
    fn error_response_is_surfaced() {
        let temp = tempfile::tempdir().unwrap();
        let socket = temp.path().join("daemon.sock");
        let (handle, _) = fake_daemon(
            &socket,
            vec![Response::error(None, "invalid_params", "bad payload")],
        );

        let err = DaemonClient::new(&socket).health().unwrap_err();
        handle.join().unwrap();
        assert_eq!(err, "invalid_params: bad payload");
    }

    fn chess_presence() -> PresenceUpdate {
        PresenceUpdate {
            user_id: "1234".to_string(),
            username: None,
            bot: false,
            activities: vec![Activity::game("Chess")],
        }
    }

    #[test]
    fn rejected_presence_is_not_resent() {
        let temp = tempfile::tempdir().unwrap();
        let socket = temp.path().join("daemon.sock");
        let (handle, seen) = fake_daemon(
            &socket,
            vec![Response::error(None, "invalid_params", "bad payload")],
        );

        let err = DaemonClient::new(&socket)
            .send_presence(&chess_presence())
            .unwrap_err();
        handle.join().unwrap();

        assert_eq!(err, "invalid_params: bad payload");
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn presence_retries_when_daemon_comes_up_late() {
        let temp = tempfile::tempdir().unwrap();
        let socket = temp.path().join("daemon.sock");
        let late_socket = socket.clone();
        let late = thread::spawn(move || {
            thread::sleep(Duration::from_millis(RETRY_DELAY_MS / 5));
            fake_daemon(
                &late_socket,
                vec![Response::ok(None, serde_json::json!({"accepted": true}))],
            )
        });

        // Refused until the late daemon binds.
        let client = DaemonClient::new(&socket);
        let data = client.send_presence(&chess_presence()).unwrap();
        let (handle, seen) = late.join().unwrap();
        handle.join().unwrap();

        assert_eq!(data["accepted"], true);
        let requests = seen.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::Presence);
    }

    #[test]
    fn missing_socket_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        let client = DaemonClient::new(temp.path().join("absent.sock"));
        assert!(client
            .health()
            .unwrap_err()
            .starts_with("Failed to connect to daemon socket"));
    }
}
