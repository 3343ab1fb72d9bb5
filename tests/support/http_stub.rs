#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde_json::Value;

/// Canned response served by [`StubServer`].
#[derive(Debug, Clone)]
pub struct StubResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub delay: Duration,
}

impl StubResponse {
    pub fn json(status: u16, body: &Value) -> Self {
        Self::raw(
            status,
            Some("application/json"),
            serde_json::to_vec(body).expect("serialize stub body"),
        )
    }

    pub fn yaml(status: u16, body: &str) -> Self {
        Self::raw(status, Some("application/yaml"), body.as_bytes().to_vec())
    }

    pub fn raw(status: u16, content_type: Option<&str>, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type: content_type.map(ToOwned::to_owned),
            body,
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
}

struct Route {
    method: String,
    path: String,
    responses: VecDeque<StubResponse>,
}

/// Minimal HTTP/1.1 server for exercising the fetcher without a real application.
///
/// Each route replays its queued responses in order; the last one repeats.
/// Unknown routes answer 404.
pub struct StubServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubServer {
    pub fn start(routes: Vec<(&str, &str, Vec<StubResponse>)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub server");
        let addr = listener.local_addr().expect("stub address");
        let routes = Arc::new(Mutex::new(
            routes
                .into_iter()
                .map(|(method, path, responses)| Route {
                    method: method.to_string(),
                    path: path.to_string(),
                    responses: responses.into(),
                })
                .collect::<Vec<_>>(),
        ));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let accept_routes = Arc::clone(&routes);
        let accept_requests = Arc::clone(&requests);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else {
                    continue;
                };
                let routes = Arc::clone(&accept_routes);
                let requests = Arc::clone(&accept_requests);
                thread::spawn(move || handle(stream, &routes, &requests));
            }
        });

        Self { addr, requests }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

fn handle(
    stream: TcpStream,
    routes: &Mutex<Vec<Route>>,
    requests: &Mutex<Vec<RecordedRequest>>,
) {
    let Ok(read_half) = stream.try_clone() else {
        return;
    };
    let mut reader = BufReader::new(read_half);
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    let mut authorization = None;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).is_err() {
            return;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim();
            if name == "content-length" {
                content_length = value.parse().unwrap_or(0);
            } else if name == "authorization" {
                authorization = Some(value.to_string());
            }
        }
    }
    let mut body = vec![0; content_length];
    if reader.read_exact(&mut body).is_err() {
        return;
    }

    requests
        .lock()
        .expect("requests lock")
        .push(RecordedRequest {
            method: method.clone(),
            path: path.clone(),
            authorization,
        });

    let response = {
        let mut routes = routes.lock().expect("routes lock");
        routes
            .iter_mut()
            .find(|route| route.method == method && route.path == path)
            .and_then(|route| {
                if route.responses.len() > 1 {
                    route.responses.pop_front()
                } else {
                    route.responses.front().cloned()
                }
            })
    }
    .unwrap_or_else(|| StubResponse::raw(404, Some("text/plain"), b"not found".to_vec()));

    if !response.delay.is_zero() {
        thread::sleep(response.delay);
    }
    write_response(stream, &response);
}

fn write_response(mut stream: TcpStream, response: &StubResponse) {
    let mut head = format!("HTTP/1.1 {} Stub\r\n", response.status);
    if let Some(content_type) = &response.content_type {
        head.push_str(&format!("Content-Type: {content_type}\r\n"));
    }
    head.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n",
        response.body.len()
    ));
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(&response.body);
    let _ = stream.flush();
}

/// The sample description document shipped with the tests.
pub fn sample_document() -> Value {
    let raw = std::fs::read(data_path("airlines-openapi.yaml")).expect("read sample");
    oascheck::engine::normalize::normalize_as(&raw, oascheck::io::Format::Yaml)
        .expect("parse sample")
}

pub fn data_path(name: &str) -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

pub fn fixture_path() -> std::path::PathBuf {
    shipped_fixture("airlines.yaml")
}

pub fn operations_fixture_path() -> std::path::PathBuf {
    shipped_fixture("airlines-operations.yaml")
}

fn shipped_fixture(name: &str) -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(name)
}
