use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const HTML: &str = "text/html; charset=utf-8";
const JSON: &str = "application/json; charset=utf-8";
const NO_ROUTE: &str = r#"{"value":{"error":"unknown command","message":"no canned route","stacktrace":""}}"#;

/// One canned JSON reply, matched on the exact `METHOD /path` of the request line.
#[derive(Clone, Debug)]
pub struct Route {
    line: String,
    status: u16,
    body: String,
    delay: Duration,
}

impl Route {
    pub fn new(line: &str, status: u16, body: impl Into<String>) -> Self {
        Route { line: line.to_string(), status, body: body.into(), delay: Duration::ZERO }
    }

    /// Hold the reply back; the request is still recorded on arrival.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// In-process HTTP/1.1 server replaying canned `(status, body)` responses in
/// order; the last one repeats once the list runs out.
pub struct CannedServer {
    pub base: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl CannedServer {
    pub async fn start(responses: Vec<(u16, String)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();
        tokio::spawn(async move {
            let mut idx = 0usize;
            loop {
                let Ok((mut stream, _)) = listener.accept().await else { break };
                let (status, body) = responses[idx.min(responses.len() - 1)].clone();
                idx += 1;
                let req = read_request(&mut stream).await;
                seen.lock().unwrap().push(req);
                respond(&mut stream, status, HTML, &body).await;
            }
        });
        CannedServer { base, requests }
    }

    /// Connections are served concurrently; unmatched requests get a 404 in
    /// the WebDriver error shape.
    pub async fn routed(routes: Vec<Route>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();
        let routes = Arc::new(routes);
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else { break };
                let routes = routes.clone();
                let seen = seen.clone();
                tokio::spawn(async move {
                    let req = read_request(&mut stream).await;
                    let line = req.lines().next().unwrap_or_default().to_string();
                    seen.lock().unwrap().push(req);
                    match routes.iter().find(|r| line.starts_with(&format!("{} ", r.line))) {
                        Some(r) => {
                            if !r.delay.is_zero() { tokio::time::sleep(r.delay).await; }
                            respond(&mut stream, r.status, JSON, &r.body).await;
                        }
                        None => respond(&mut stream, 404, JSON, NO_ROUTE).await,
                    }
                });
            }
        });
        CannedServer { base, requests }
    }

    pub fn url(&self, path: &str) -> String { format!("{}{}", self.base, path) }

    pub fn hits(&self) -> usize { self.requests.lock().unwrap().len() }

    pub fn requests(&self) -> Vec<String> { self.requests.lock().unwrap().clone() }

    /// Requests whose request line starts with `METHOD /path `.
    pub fn count(&self, line: &str) -> usize {
        let prefix = format!("{line} ");
        self.requests.lock().unwrap().iter().filter(|r| r.starts_with(&prefix)).count()
    }
}

/// In-memory sink for formatted log lines, installed as the thread's default
/// subscriber so span nesting can be asserted.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let sink = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .with_writer(move || sink.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.0.lock().unwrap()).lines().map(str::to_string).collect()
    }

    /// First captured line containing `needle`.
    pub fn line_with(&self, needle: &str) -> Option<String> {
        self.lines().into_iter().find(|l| l.contains(needle))
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> { Ok(()) }
}

async fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut chunk).await.unwrap_or(0);
        if n == 0 { break buf.len(); }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find(&buf, b"\r\n\r\n") { break pos + 4; }
    };
    let head = String::from_utf8_lossy(&buf[..header_end.min(buf.len())]).to_string();
    let content_length = head
        .lines()
        .find_map(|l| {
            let (k, v) = l.split_once(':')?;
            if k.trim().eq_ignore_ascii_case("content-length") { v.trim().parse::<usize>().ok() } else { None }
        })
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await.unwrap_or(0);
        if n == 0 { break; }
        buf.extend_from_slice(&chunk[..n]);
    }
    String::from_utf8_lossy(&buf).to_string()
}

async fn respond(stream: &mut TcpStream, status: u16, content_type: &str, body: &str) {
    let reason = match status { 200 => "OK", 404 => "Not Found", 500 => "Internal Server Error", 503 => "Service Unavailable", _ => "Status" };
    let resp = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(resp.as_bytes()).await;
    let _ = stream.shutdown().await;
}

fn find(hay: &[u8], needle: &[u8]) -> Option<usize> {
    hay.windows(needle.len()).position(|w| w == needle)
}
