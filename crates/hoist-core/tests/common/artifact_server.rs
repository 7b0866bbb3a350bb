//! Minimal HTTP/1.1 server that serves a fixed artifact tree for
//! integration tests.
//!
//! Answers HEAD with Content-Length only and GET with the stored body,
//! returns 404 for unknown paths, optionally redirects a path once, and
//! counts every (method, path) hit so tests can assert how much network
//! traffic a scenario produced.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

pub struct ArtifactServer {
    /// Base URL with trailing slash, e.g. `http://127.0.0.1:12345/`.
    pub base_url: String,
    hits: Arc<Mutex<HashMap<(String, String), usize>>>,
}

impl ArtifactServer {
    /// Hits for one method + relative path (no leading slash).
    pub fn hits(&self, method: &str, path: &str) -> usize {
        self.hits
            .lock()
            .unwrap()
            .get(&(method.to_string(), path.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Total hits for one method across all paths.
    pub fn total(&self, method: &str) -> usize {
        self.hits
            .lock()
            .unwrap()
            .iter()
            .filter(|((m, _), _)| m == method)
            .map(|(_, n)| n)
            .sum()
    }
}

/// Starts a server in a background thread serving `files` (keyed by relative
/// path without leading slash). Runs until the process exits.
pub fn start(files: HashMap<String, Vec<u8>>) -> ArtifactServer {
    start_with_redirects(files, HashMap::new())
}

/// Like `start`, but paths in `redirects` answer GET with a 302 to their
/// target path (which must exist in `files`).
pub fn start_with_redirects(
    files: HashMap<String, Vec<u8>>,
    redirects: HashMap<String, String>,
) -> ArtifactServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let files = Arc::new(files);
    let redirects = Arc::new(redirects);
    let hits: Arc<Mutex<HashMap<(String, String), usize>>> = Arc::new(Mutex::new(HashMap::new()));

    let hits_for_thread = Arc::clone(&hits);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let files = Arc::clone(&files);
            let redirects = Arc::clone(&redirects);
            let hits = Arc::clone(&hits_for_thread);
            thread::spawn(move || handle(stream, &files, &redirects, &hits));
        }
    });

    ArtifactServer {
        base_url: format!("http://127.0.0.1:{}/", port),
        hits,
    }
}

fn handle(
    mut stream: std::net::TcpStream,
    files: &HashMap<String, Vec<u8>>,
    redirects: &HashMap<String, String>,
    hits: &Mutex<HashMap<(String, String), usize>>,
) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let mut parts = request.split_whitespace();
    let method = parts.next().unwrap_or("").to_string();
    let path = parts
        .next()
        .unwrap_or("")
        .trim_start_matches('/')
        .to_string();

    *hits
        .lock()
        .unwrap()
        .entry((method.clone(), path.clone()))
        .or_insert(0) += 1;

    if method.eq_ignore_ascii_case("HEAD") {
        let length = files
            .get(&path)
            .map(|b| b.len())
            .or_else(|| redirects.get(&path).and_then(|t| files.get(t)).map(|b| b.len()));
        let response = match length {
            Some(len) => format!("HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n", len),
            None => "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n".to_string(),
        };
        let _ = stream.write_all(response.as_bytes());
        return;
    }

    if method.eq_ignore_ascii_case("GET") {
        if let Some(target) = redirects.get(&path) {
            let response = format!(
                "HTTP/1.1 302 Found\r\nLocation: /{}\r\nContent-Length: 0\r\n\r\n",
                target
            );
            let _ = stream.write_all(response.as_bytes());
            return;
        }
        match files.get(&path) {
            Some(body) => {
                let response = format!("HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n", body.len());
                let _ = stream.write_all(response.as_bytes());
                let _ = stream.write_all(body);
            }
            None => {
                let _ = stream.write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n");
            }
        }
        return;
    }

    let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\n\r\n");
}
