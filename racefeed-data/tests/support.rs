//! Canned HTTP server for exercising `HttpResultsSource` without a real API.

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};

/// Response served for a path.
#[derive(Debug, Clone)]
pub struct CannedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl CannedResponse {
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: vec![("content-type".to_owned(), "application/json".to_owned())],
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }
}

/// A request as seen by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub target: String,
    pub authorization: Option<String>,
}

/// Routes keyed by path (query ignored); unknown paths get a 404.
#[derive(Debug)]
pub struct CannedServer {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl CannedServer {
    /// Bind to an ephemeral port and serve `routes` on the current runtime.
    pub async fn start(routes: HashMap<String, CannedResponse>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind canned server");
        let addr = listener.local_addr().expect("local addr");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let routes = Arc::new(routes);
        let log = Arc::clone(&requests);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let routes = Arc::clone(&routes);
                let log = Arc::clone(&log);
                tokio::spawn(async move { handle(stream, &routes, &log).await });
            }
        });
        Self { addr, requests }
    }

    /// Base URL for the API root.
    pub fn base_url(&self) -> String {
        format!("http://{}/api/event.json", self.addr)
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("request log").clone()
    }
}

async fn handle(
    mut stream: TcpStream,
    routes: &HashMap<String, CannedResponse>,
    log: &Mutex<Vec<RecordedRequest>>,
) {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 1024];
    while !buffer.windows(4).any(|window| window == b"\r\n\r\n") {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(read) => buffer.extend_from_slice(chunk.get(..read).unwrap_or_default()),
        }
    }

    let head = String::from_utf8_lossy(&buffer).into_owned();
    let mut lines = head.lines();
    let target = lines
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_owned();
    let authorization = lines.find_map(|line| {
        let (name, value) = line.split_once(':')?;
        name.eq_ignore_ascii_case("authorization")
            .then(|| value.trim().to_owned())
    });
    log.lock().expect("request log").push(RecordedRequest {
        target: target.clone(),
        authorization,
    });

    let path = target.split('?').next().unwrap_or_default();
    let response = routes
        .get(path)
        .cloned()
        .unwrap_or_else(|| CannedResponse::json(404, r#"{"error":"not found"}"#));

    let mut raw = format!(
        "HTTP/1.1 {} Canned\r\ncontent-length: {}\r\nconnection: close\r\n",
        response.status,
        response.body.len()
    );
    for (name, value) in &response.headers {
        raw.push_str(&format!("{name}: {value}\r\n"));
    }
    raw.push_str("\r\n");
    raw.push_str(&response.body);
    let _ = stream.write_all(raw.as_bytes()).await;
    let _ = stream.shutdown().await;
}

/// Accepts connections and holds them open without ever answering.
#[derive(Debug)]
pub struct SilentServer {
    pub addr: SocketAddr,
    accepted: Arc<Mutex<Vec<TcpStream>>>,
}

impl SilentServer {
    /// Bind to an ephemeral port and start accepting on the current runtime.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind silent server");
        let addr = listener.local_addr().expect("local addr");
        let accepted = Arc::new(Mutex::new(Vec::new()));
        let held = Arc::clone(&accepted);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                held.lock().expect("held connections").push(stream);
            }
        });
        Self { addr, accepted }
    }

    /// Base URL for the API root.
    pub fn base_url(&self) -> String {
        format!("http://{}/api/event.json", self.addr)
    }

    /// Connections accepted so far.
    pub fn connections(&self) -> usize {
        self.accepted.lock().expect("held connections").len()
    }
}
