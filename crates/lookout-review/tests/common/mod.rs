#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lookout_core::{ChangedFile, CommentKind, ExistingComment, LookoutError, PullRequest};
use lookout_review::github::HostingApi;
use lookout_review::llm::{ChatCompletion, ChatModel};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// A write the fake host received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    IssueComment(String),
    ReviewComment {
        commit: String,
        path: String,
        position: u32,
        body: String,
    },
    Approve,
    Delete(CommentKind, u64),
}

/// In-memory hosting API. Endpoints named in `failing` return an error.
#[derive(Default)]
pub struct FakeHost {
    pub pr: PullRequest,
    pub files: Vec<ChangedFile>,
    pub commits: Vec<String>,
    pub comments: Vec<ExistingComment>,
    pub failing: Vec<&'static str>,
    pub writes: Mutex<Vec<Write>>,
}

impl FakeHost {
    pub fn with_files(files: Vec<ChangedFile>) -> Self {
        Self {
            pr: PullRequest {
                number: 7,
                title: "Add retry to uploader".into(),
                author: "octocat".into(),
                head_sha: Some("headsha0000000".into()),
                ..PullRequest::default()
            },
            files,
            commits: vec!["first00".into(), "latest0123456789".into()],
            ..Self::default()
        }
    }

    pub fn writes(&self) -> Vec<Write> {
        self.writes.lock().unwrap().clone()
    }

    fn check(&self, endpoint: &str) -> Result<(), LookoutError> {
        if self.failing.iter().any(|f| *f == endpoint) {
            Err(LookoutError::Hosting(format!("{endpoint} returned 500")))
        } else {
            Ok(())
        }
    }

    fn record(&self, write: Write) {
        self.writes.lock().unwrap().push(write);
    }
}

#[async_trait]
impl HostingApi for FakeHost {
    async fn pull_request(&self, _pr: u64) -> Result<PullRequest, LookoutError> {
        self.check("pull_request")?;
        Ok(self.pr.clone())
    }

    async fn list_files(&self, _pr: u64) -> Result<Vec<ChangedFile>, LookoutError> {
        self.check("list_files")?;
        Ok(self.files.clone())
    }

    async fn list_commits(&self, _pr: u64) -> Result<Vec<String>, LookoutError> {
        self.check("list_commits")?;
        Ok(self.commits.clone())
    }

    async fn list_issue_comments(&self, _pr: u64) -> Result<Vec<ExistingComment>, LookoutError> {
        self.check("list_issue_comments")?;
        Ok(self
            .comments
            .iter()
            .filter(|c| c.kind == CommentKind::Issue)
            .cloned()
            .collect())
    }

    async fn list_review_comments(
        &self,
        _pr: u64,
    ) -> Result<Vec<ExistingComment>, LookoutError> {
        self.check("list_review_comments")?;
        Ok(self
            .comments
            .iter()
            .filter(|c| c.kind == CommentKind::Review)
            .cloned()
            .collect())
    }

    async fn create_issue_comment(&self, _pr: u64, body: &str) -> Result<u64, LookoutError> {
        self.check("create_issue_comment")?;
        self.record(Write::IssueComment(body.to_string()));
        Ok(1000)
    }

    async fn create_review_comment(
        &self,
        _pr: u64,
        commit_sha: &str,
        path: &str,
        position: u32,
        body: &str,
    ) -> Result<u64, LookoutError> {
        self.check("create_review_comment")?;
        self.record(Write::ReviewComment {
            commit: commit_sha.to_string(),
            path: path.to_string(),
            position,
            body: body.to_string(),
        });
        Ok(2000)
    }

    async fn approve(&self, _pr: u64, _body: &str) -> Result<(), LookoutError> {
        self.check("approve")?;
        self.record(Write::Approve);
        Ok(())
    }

    async fn delete_comment(&self, kind: CommentKind, id: u64) -> Result<(), LookoutError> {
        self.check("delete_comment")?;
        self.record(Write::Delete(kind, id));
        Ok(())
    }
}

/// Chat model returning a canned reply and recording prompts.
pub struct FakeModel {
    reply: Result<String, String>,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeModel {
    pub fn replying(content: &str) -> Self {
        Self {
            reply: Ok(content.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ChatModel for FakeModel {
    fn model(&self) -> &str {
        "fake-model"
    }

    async fn complete(&self, prompt: &str) -> Result<ChatCompletion, LookoutError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.reply {
            Ok(content) => Ok(ChatCompletion {
                content: content.clone(),
                usage: None,
            }),
            Err(message) => Err(LookoutError::Llm(message.clone())),
        }
    }
}

/// A request the stub server received.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl Recorded {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// Canned HTTP response.
pub struct StubResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl StubResponse {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    pub fn empty(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// Minimal HTTP/1.1 server answering one connection per canned response.
pub struct StubServer {
    pub base_url: String,
    listener: Option<TcpListener>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl StubServer {
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        Self {
            base_url: format!("http://{addr}"),
            listener: Some(listener),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Start answering with `responses`, in order.
    pub fn serve(&mut self, responses: Vec<StubResponse>) {
        let listener = self.listener.take().unwrap();
        let requests = Arc::clone(&self.requests);
        tokio::spawn(async move {
            for response in responses {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                let recorded = read_request(&mut stream).await;
                requests.lock().unwrap().push(recorded);

                let mut head = format!(
                    "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n",
                    response.status,
                    response.body.len()
                );
                for (name, value) in &response.headers {
                    head.push_str(&format!("{name}: {value}\r\n"));
                }
                head.push_str("\r\n");
                let _ = stream.write_all(head.as_bytes()).await;
                let _ = stream.write_all(response.body.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

async fn read_request(stream: &mut tokio::net::TcpStream) -> Recorded {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break buf.len();
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let headers: HashMap<String, String> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    while buf.len() < header_end + length {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let end = (header_end + length).min(buf.len());
    let body = String::from_utf8_lossy(&buf[header_end..end]).to_string();

    Recorded {
        method,
        path,
        headers,
        body,
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
