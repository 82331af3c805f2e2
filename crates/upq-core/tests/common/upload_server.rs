//! Minimal HTTP/1.1 upload receiver and status monitor for integration tests.
//!
//! Accepts POSTed upload bodies keyed by the `pid` query parameter and answers
//! monitor GETs with the same XML payloads a production status endpoint emits:
//! a fraction while bytes arrive, then a final verdict.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct UploadServerOptions {
    /// If true, POST responses are withheld until the monitor has reported
    /// completion for that pid, so a poll loop always observes the full
    /// progress-then-complete sequence.
    pub hold_responses: bool,
}

impl Default for UploadServerOptions {
    fn default() -> Self {
        Self {
            hold_responses: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReceivedUpload {
    pub pid: String,
    pub body: Vec<u8>,
}

#[derive(Default)]
struct State {
    uploads: Vec<ReceivedUpload>,
    monitor_hits: HashMap<String, u32>,
    cancel_commands: Vec<String>,
}

pub struct UploadServer {
    base_url: String,
    state: Arc<Mutex<State>>,
}

impl UploadServer {
    pub fn start() -> Self {
        Self::start_with_options(UploadServerOptions::default())
    }

    /// Starts the server in a background thread. It runs until the process
    /// exits.
    pub fn start_with_options(opts: UploadServerOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(Mutex::new(State::default()));
        let handler_state = Arc::clone(&state);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let state = Arc::clone(&handler_state);
                thread::spawn(move || handle(stream, &state, opts));
            }
        });
        Self {
            base_url: format!("http://127.0.0.1:{}/", port),
            state,
        }
    }

    pub fn receiver_url(&self) -> String {
        format!("{}upload", self.base_url)
    }

    pub fn monitor_url(&self) -> String {
        format!("{}monitor", self.base_url)
    }

    /// Uploads recorded so far, in arrival order.
    pub fn uploads(&self) -> Vec<ReceivedUpload> {
        self.state.lock().unwrap().uploads.clone()
    }

    /// Pids for which a `command=cancel` monitor request has arrived.
    pub fn cancel_commands(&self) -> Vec<String> {
        self.state.lock().unwrap().cancel_commands.clone()
    }
}

fn handle(mut stream: std::net::TcpStream, state: &Mutex<State>, opts: UploadServerOptions) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));

    let mut raw = Vec::new();
    let mut buf = [0u8; 8192];
    let (head_end, header_len) = loop {
        let n = match stream.read(&mut buf) {
            Ok(0) => return,
            Ok(n) => n,
            Err(_) => return,
        };
        raw.extend_from_slice(&buf[..n]);
        if let Some(pos) = find_header_end(&raw) {
            break (pos, pos + 4);
        }
        if raw.len() > 64 * 1024 {
            return;
        }
    };
    let head = match std::str::from_utf8(&raw[..head_end]) {
        Ok(s) => s.to_string(),
        Err(_) => return,
    };
    let (method, target, content_length) = parse_head(&head);
    let (path, query) = match target.split_once('?') {
        Some((p, q)) => (p, q),
        None => (target.as_str(), ""),
    };
    let params = parse_query(query);

    if method.eq_ignore_ascii_case("POST") && path == "/upload" {
        // Drain the rest of the body before recording.
        while raw.len() - header_len < content_length {
            match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => raw.extend_from_slice(&buf[..n]),
                Err(_) => return,
            }
        }
        let pid = params.get("pid").cloned().unwrap_or_default();
        state.lock().unwrap().uploads.push(ReceivedUpload {
            pid: pid.clone(),
            body: raw[header_len..].to_vec(),
        });
        if opts.hold_responses {
            // Hold the response open until the monitor has served the final
            // verdict, so the client's poll loop drives completion.
            for _ in 0..500 {
                let done = state
                    .lock()
                    .unwrap()
                    .monitor_hits
                    .get(&pid)
                    .is_some_and(|hits| *hits >= 2);
                if done {
                    break;
                }
                thread::sleep(Duration::from_millis(10));
            }
        }
        let _ = stream.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");
        return;
    }

    if method.eq_ignore_ascii_case("GET") && path == "/monitor" {
        let pid = params.get("pid").cloned().unwrap_or_default();
        let xml = if params.get("command").map(String::as_str) == Some("cancel") {
            state.lock().unwrap().cancel_commands.push(pid.clone());
            status_xml("v=\"cancel\"")
        } else {
            let mut state = state.lock().unwrap();
            let uploaded: u64 = state
                .uploads
                .iter()
                .filter(|u| u.pid == pid)
                .map(|u| u.body.len() as u64)
                .sum();
            if uploaded == 0 {
                status_xml("v=\"unknownpid\"")
            } else {
                let hits = state.monitor_hits.entry(pid).or_insert(0);
                *hits += 1;
                if *hits == 1 {
                    status_xml(&format!("p=\"{}/{}\"", uploaded / 2, uploaded))
                } else {
                    status_xml("v=\"complete\"")
                }
            }
        };
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/xml\r\nContent-Length: {}\r\n\r\n{}",
            xml.len(),
            xml
        );
        let _ = stream.write_all(response.as_bytes());
        return;
    }

    let _ = stream.write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n");
}

fn status_xml(attrs: &str) -> String {
    format!("<?xml version=\"1.0\"?><m><s {}/></m>", attrs)
}

fn find_header_end(raw: &[u8]) -> Option<usize> {
    raw.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Returns (method, request target, Content-Length).
fn parse_head(head: &str) -> (String, String, usize) {
    let mut method = String::new();
    let mut target = String::new();
    let mut content_length = 0usize;
    for (i, line) in head.lines().enumerate() {
        if i == 0 {
            let mut parts = line.split_whitespace();
            method = parts.next().unwrap_or("").to_string();
            target = parts.next().unwrap_or("").to_string();
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }
    (method, target, content_length)
}

fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
