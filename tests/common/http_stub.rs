//! Minimal HTTP/1.1 responder for exercising the API client offline.
//!
//! Each accepted connection consumes the next scripted response and is
//! closed afterwards. Requests are recorded for assertions.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

#[derive(Clone, Debug)]
pub struct StubResponse {
    pub status: u16,
    pub body: String,
}

impl StubResponse {
    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_owned(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct RecordedRequest {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

pub struct StubServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    task: JoinHandle<()>,
}

impl StubServer {
    pub async fn start(responses: Vec<StubResponse>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap_or_else(|err| panic!("bind stub listener: {err}"));
        let addr = listener
            .local_addr()
            .unwrap_or_else(|err| panic!("stub listener address: {err}"));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);
        let mut queue = VecDeque::from(responses);

        let task = tokio::spawn(async move {
            while let Some(response) = queue.pop_front() {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let request = serve(stream, &response).await;
                recorded
                    .lock()
                    .unwrap_or_else(|err| panic!("lock poisoned: record request: {err}"))
                    .push(request);
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            requests,
            task,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|err| panic!("lock poisoned: requests: {err}"))
            .clone()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(stream: TcpStream, response: &StubResponse) -> RecordedRequest {
    let mut reader = BufReader::new(stream);
    let mut request = RecordedRequest::default();

    let mut line = String::new();
    reader
        .read_line(&mut line)
        .await
        .unwrap_or_else(|err| panic!("read request line: {err}"));
    let mut parts = line.split_whitespace();
    request.method = parts.next().unwrap_or_default().to_owned();
    request.target = parts.next().unwrap_or_default().to_owned();

    let mut content_length = 0_usize;
    loop {
        line.clear();
        reader
            .read_line(&mut line)
            .await
            .unwrap_or_else(|err| panic!("read header: {err}"));
        let header = line.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            let trimmed = value.trim().to_owned();
            if name.eq_ignore_ascii_case("content-length") {
                content_length = trimmed.parse().unwrap_or(0);
            }
            request.headers.push((name.to_owned(), trimmed));
        }
    }

    let mut body = vec![0_u8; content_length];
    reader
        .read_exact(&mut body)
        .await
        .unwrap_or_else(|err| panic!("read body: {err}"));
    request.body = String::from_utf8_lossy(&body).into_owned();

    let payload = format!(
        "HTTP/1.1 {} Stub\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        response.status,
        response.body.len(),
        response.body
    );
    let mut stream = reader.into_inner();
    stream
        .write_all(payload.as_bytes())
        .await
        .unwrap_or_else(|err| panic!("write response: {err}"));
    stream.shutdown().await.ok();

    request
}
