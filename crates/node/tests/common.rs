// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Allow unused items: test helpers are shared across multiple test binaries,
// and not every test file uses every helper.
#![allow(dead_code)]
#![allow(unused_imports)]

use std::collections::{HashMap, VecDeque};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;

pub use predicates::prelude::*;
pub use tempfile::TempDir;

pub const LOGIN: &str = "/api/auth/login";
pub const UPLOAD: &str = "/api/upload-image";

pub fn motioncam() -> Command {
    let mut cmd = cargo_bin_cmd!("motioncam");
    cmd.env_remove("MOTIONCAM_CONFIG")
        .env_remove("MOTIONCAM_PASSWORD")
        .env_remove("MOTIONCAM_RETAINED_DIR")
        .env("RUST_LOG", "warn");
    cmd
}

/// A successful login answer carrying `token`.
pub fn login_ok(token: &str) -> (u16, String) {
    (
        200,
        format!(r#"{{"success":true,"data":{{"token":"{}"}}}}"#, token),
    )
}

pub fn upload_ok() -> (u16, String) {
    (200, r#"{"success":true,"message":"stored"}"#.to_string())
}

/// One request as seen by the stub backend.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn body_contains(&self, needle: &[u8]) -> bool {
        self.body.windows(needle.len()).any(|w| w == needle)
    }
}

#[derive(Default)]
struct StubState {
    routes: HashMap<String, VecDeque<(u16, String)>>,
    requests: Vec<Recorded>,
}

/// Minimal HTTP/1.1 backend on a loopback port. Answers each path from a
/// scripted queue; an exhausted or unknown path gets a 404.
#[derive(Clone)]
pub struct StubServer {
    port: u16,
    state: Arc<Mutex<StubState>>,
}

impl StubServer {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(Mutex::new(StubState::default()));

        let shared = Arc::clone(&state);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                let _ = serve(stream, &shared);
            }
        });

        StubServer { port, state }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Queues an answer for `path`.
    pub fn respond(&self, path: &str, answer: (u16, String)) -> &Self {
        self.state
            .lock()
            .unwrap()
            .routes
            .entry(path.to_string())
            .or_default()
            .push_back(answer);
        self
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }
}

fn serve(stream: TcpStream, state: &Mutex<StubState>) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);

    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut headers = HashMap::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 || line.trim().is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    let body = if let Some(len) = headers.get("content-length") {
        let mut body = vec![0; len.parse().unwrap_or(0)];
        reader.read_exact(&mut body)?;
        body
    } else if headers
        .get("transfer-encoding")
        .is_some_and(|v| v.eq_ignore_ascii_case("chunked"))
    {
        read_chunked(&mut reader)?
    } else {
        Vec::new()
    };

    let (status, answer) = {
        let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
        let answer = state
            .routes
            .get_mut(&path)
            .and_then(VecDeque::pop_front)
            .unwrap_or((404, r#"{"success":false}"#.to_string()));
        state.requests.push(Recorded {
            method,
            path,
            headers,
            body,
        });
        answer
    };

    let mut stream = stream;
    write!(
        stream,
        "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        answer.len(),
        answer
    )?;
    stream.flush()
}

fn read_chunked(reader: &mut impl BufRead) -> std::io::Result<Vec<u8>> {
    let mut body = Vec::new();
    loop {
        let mut size_line = String::new();
        reader.read_line(&mut size_line)?;
        let size = usize::from_str_radix(size_line.trim(), 16).unwrap_or(0);
        let mut chunk = vec![0; size + 2];
        reader.read_exact(&mut chunk)?;
        if size == 0 {
            return Ok(body);
        }
        body.extend_from_slice(&chunk[..size]);
    }
}

/// Temp directory holding a config, a camera frame, storage and retained dirs.
pub struct Node {
    pub temp: TempDir,
}

impl Node {
    /// A node pointing at `port` on loopback with a zero cooldown.
    pub fn new(port: u16) -> Self {
        Self::with_options(port, 0, "")
    }

    /// A node with the given cooldown and `extra` appended to the config.
    pub fn with_options(port: u16, cooldown_secs: u64, extra: &str) -> Self {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        std::fs::write(root.join("frame.jpg"), b"\xFF\xD8frame-bytes\xFF\xD9").unwrap();

        let config = format!(
            r#"[server]
static_host = "127.0.0.1"
port = {port}

[credentials]
username = "cam"
password = "pw"

[storage]
root = "{storage}"

[retained]
dir = "{retained}"

[pipeline]
cooldown_secs = {cooldown_secs}

[camera]
file = "{frame}"
{extra}
"#,
            storage = slashes(&root.join("storage")),
            retained = slashes(&root.join("retained")),
            frame = slashes(&root.join("frame.jpg")),
        );
        std::fs::write(root.join("motioncam.toml"), config).unwrap();
        Node { temp }
    }

    pub fn config(&self) -> PathBuf {
        self.temp.path().join("motioncam.toml")
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = motioncam();
        cmd.arg("--config").arg(self.config());
        cmd
    }

    pub fn pending(&self) -> Vec<String> {
        list(&self.temp.path().join("storage/pending"))
    }

    pub fn sent(&self) -> Vec<String> {
        list(&self.temp.path().join("storage/sent"))
    }
}

fn slashes(path: &Path) -> String {
    path.display().to_string().replace('\\', "/")
}

fn list(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .filter(|n| n.ends_with(".jpg"))
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
