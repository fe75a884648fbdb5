use std::fmt::{Display, Formatter};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;

use crate::session::SessionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

/// A file part plus accompanying text fields, sent as multipart/form-data.
#[derive(Debug, Clone)]
pub struct Upload {
    pub field: &'static str,
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
    pub form: Vec<(&'static str, String)>,
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub upload: Option<Upload>,
    pub headers: Vec<(&'static str, String)>,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            upload: None,
            headers: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        let mut req = Self::new(HttpMethod::Post, path);
        req.body = Some(body);
        req
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        let mut req = Self::new(HttpMethod::Put, path);
        req.body = Some(body);
        req
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    pub fn with_upload(mut self, upload: Upload) -> Self {
        self.upload = Some(upload);
        self
    }

    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    Empty,
    Json(Value),
    Text(String),
    Binary { content_type: String, bytes: Vec<u8> },
}

impl ApiResponse {
    /// The JSON payload of a response. Text bodies get one re-parse attempt,
    /// since some endpoints serve JSON under a text content type.
    pub fn into_json(self) -> Result<Value, ApiError> {
        match self {
            Self::Json(value) => Ok(value),
            Self::Empty => Ok(Value::Null),
            Self::Text(text) => serde_json::from_str(&text)
                .map_err(|e| ApiError::Parse(format!("expected JSON body: {}", e))),
            Self::Binary { content_type, .. } => Err(ApiError::Parse(format!(
                "expected JSON body, got {}",
                content_type
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Non-2xx response; message is the server-supplied one when it could be
    /// extracted, else a generic `HTTP <status>`.
    Http { status: u16, message: String },
    Network(String),
    Parse(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Http { .. } => "http_error",
            Self::Network(_) => "network_error",
            Self::Parse(_) => "parse_error",
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http { status, message } => write!(f, "{} ({})", message, status),
            Self::Network(message) => write!(f, "network error: {}", message),
            Self::Parse(message) => write!(f, "parse error: {}", message),
        }
    }
}

impl std::error::Error for ApiError {}

/// The transport seam. Production traffic goes through [`HttpGateway`];
/// tests script an in-memory implementation.
#[async_trait]
pub trait ApiGateway: Send + Sync {
    async fn send(&self, req: ApiRequest) -> Result<ApiResponse, ApiError>;

    async fn get_json(&self, path: &str, query: &[(String, String)]) -> Result<Value, ApiError> {
        let mut req = ApiRequest::get(path);
        req.query = query.to_vec();
        self.send(req).await?.into_json()
    }

    async fn post_json(&self, path: &str, body: Value) -> Result<Value, ApiError> {
        self.send(ApiRequest::post(path, body)).await?.into_json()
    }

    async fn put_json(&self, path: &str, body: Value) -> Result<Value, ApiError> {
        self.send(ApiRequest::put(path, body)).await?.into_json()
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(ApiRequest::delete(path)).await.map(|_| ())
    }
}

pub struct HttpGateway {
    base_url: String,
    client: reqwest::Client,
    store: Arc<SessionStore>,
}

impl HttpGateway {
    pub fn new(base_url: String, store: Arc<SessionStore>) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
            store,
        }
    }

    fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl ApiGateway for HttpGateway {
    async fn send(&self, req: ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = self.url_for(&req.path);
        let mut builder = match req.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
            HttpMethod::Put => self.client.put(&url),
            HttpMethod::Delete => self.client.delete(&url),
        };
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        if let Some(token) = self.store.token() {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        for (name, value) in &req.headers {
            builder = builder.header(*name, value);
        }
        if let Some(upload) = req.upload {
            let part = reqwest::multipart::Part::bytes(upload.bytes)
                .file_name(upload.file_name)
                .mime_str(upload.content_type)
                .map_err(|e| ApiError::Parse(e.to_string()))?;
            let mut form = reqwest::multipart::Form::new().part(upload.field, part);
            for (key, value) in upload.form {
                form = form.text(key, value);
            }
            builder = builder.multipart(form);
        } else if let Some(body) = &req.body {
            builder = builder.json(body);
        }

        log::debug!("{} {}", req.method.as_str(), url);
        let resp = builder
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = resp.status();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(http_error(status.as_u16(), &body));
        }
        if status.as_u16() == 204 {
            return Ok(ApiResponse::Empty);
        }
        if is_binary_content_type(&content_type) {
            let bytes = resp
                .bytes()
                .await
                .map_err(|e| ApiError::Network(e.to_string()))?;
            return Ok(ApiResponse::Binary {
                content_type,
                bytes: bytes.to_vec(),
            });
        }

        let text = resp
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        if text.is_empty() {
            return Ok(ApiResponse::Empty);
        }
        if content_type.contains("json") {
            return serde_json::from_str(&text)
                .map(ApiResponse::Json)
                .map_err(|e| ApiError::Parse(e.to_string()));
        }
        Ok(ApiResponse::Text(text))
    }
}

pub fn http_error(status: u16, body: &str) -> ApiError {
    ApiError::Http {
        status,
        message: server_message(body).unwrap_or_else(|| format!("HTTP {}", status)),
    }
}

/// Pulls a human-readable message out of an error body. JSON bodies are
/// checked for the usual field names; anything else non-empty is taken as-is.
fn server_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        for key in ["message", "error", "detail", "title"] {
            if let Some(s) = value.get(key).and_then(|v| v.as_str()) {
                if !s.trim().is_empty() {
                    return Some(s.trim().to_string());
                }
            }
        }
        if let Some(s) = value.as_str() {
            return Some(s.to_string());
        }
        return None;
    }
    Some(trimmed.to_string())
}

fn is_binary_content_type(content_type: &str) -> bool {
    content_type.contains("spreadsheet")
        || content_type.contains("ms-excel")
        || content_type.contains("octet-stream")
        || content_type.contains("application/zip")
        || content_type.contains("application/pdf")
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// Scripted in-memory gateway. Responses are queued per "METHOD path"
    /// route and handed out in order; every send is recorded so tests can
    /// assert on call sequence.
    pub struct FakeGateway {
        responses: Mutex<HashMap<String, VecDeque<Result<ApiResponse, ApiError>>>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeGateway {
        pub fn new() -> Self {
            Self {
                responses: Mutex::new(HashMap::new()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn enqueue(
            &self,
            method: HttpMethod,
            path: &str,
            result: Result<ApiResponse, ApiError>,
        ) {
            self.responses
                .lock()
                .unwrap()
                .entry(format!("{} {}", method.as_str(), path))
                .or_default()
                .push_back(result);
        }

        pub fn enqueue_json(&self, method: HttpMethod, path: &str, value: Value) {
            self.enqueue(method, path, Ok(ApiResponse::Json(value)));
        }

        pub fn enqueue_http_error(&self, method: HttpMethod, path: &str, status: u16) {
            self.enqueue(
                method,
                path,
                Err(ApiError::Http {
                    status,
                    message: format!("HTTP {}", status),
                }),
            );
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ApiGateway for FakeGateway {
        async fn send(&self, req: ApiRequest) -> Result<ApiResponse, ApiError> {
            let key = format!("{} {}", req.method.as_str(), req.path);
            self.calls.lock().unwrap().push(key.clone());
            self.responses
                .lock()
                .unwrap()
                .get_mut(&key)
                .and_then(|queue| queue.pop_front())
                .unwrap_or_else(|| {
                    Err(ApiError::Http {
                        status: 404,
                        message: format!("no scripted response for {}", key),
                    })
                })
        }
    }
}
