use serde_json::Value;

use super::error::err;
use crate::gateway::ApiError;
use crate::resources::Page;

/// Handler-level failure, mapped onto the wire error shape at the edge.
pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        Self::new("bad_params", message)
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn response(self, id: &str) -> Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<ApiError> for HandlerErr {
    fn from(e: ApiError) -> Self {
        Self::new(e.code(), e.to_string())
    }
}

pub fn required_str(params: &Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn optional_str(params: &Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty())
}

pub fn required_object(params: &Value, key: &str) -> Result<Value, HandlerErr> {
    match params.get(key) {
        Some(v) if v.is_object() => Ok(v.clone()),
        Some(_) => Err(HandlerErr::bad_params(format!("{} must be an object", key))),
        None => Err(HandlerErr::bad_params(format!("missing {}", key))),
    }
}

pub fn required_usize(params: &Value, key: &str) -> Result<usize, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_u64())
        .map(|v| v as usize)
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn required_bool(params: &Value, key: &str) -> Result<bool, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_bool())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

/// A grade field that must be present, where `null` means "clear".
pub fn nullable_grade(params: &Value, key: &str) -> Result<Option<u8>, HandlerErr> {
    match params.get(key) {
        None => Err(HandlerErr::bad_params(format!("missing {}", key))),
        Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .filter(|g| *g <= u8::MAX as u64)
            .map(|g| Some(g as u8))
            .ok_or_else(|| HandlerErr::bad_params(format!("{} must be a number or null", key))),
    }
}

/// Grade field that may be absent entirely (absent and null both mean none).
pub fn optional_grade(params: &Value, key: &str) -> Result<Option<u8>, HandlerErr> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .filter(|g| *g <= u8::MAX as u64)
            .map(|g| Some(g as u8))
            .ok_or_else(|| HandlerErr::bad_params(format!("{} must be a number or null", key))),
    }
}

/// Reads an upload from a host-supplied filesystem path; files cross the IPC
/// boundary as paths, not inline bytes.
pub fn read_upload(path: &str) -> Result<(Vec<u8>, String), HandlerErr> {
    let bytes = std::fs::read(path)
        .map_err(|e| HandlerErr::new("io_error", format!("read {}: {}", path, e)))?;
    let file_name = std::path::Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.bin")
        .to_string();
    Ok((bytes, file_name))
}

pub fn write_download(out_path: &str, download: &crate::files::Download) -> Result<Value, HandlerErr> {
    std::fs::write(out_path, &download.bytes)
        .map_err(|e| HandlerErr::new("io_error", format!("write {}: {}", out_path, e)))?;
    Ok(serde_json::json!({
        "outPath": out_path,
        "contentType": download.content_type,
        "byteCount": download.bytes.len(),
    }))
}

pub fn page_from(params: &Value) -> Page {
    let defaults = Page::default();
    Page {
        page: params
            .get("page")
            .and_then(|v| v.as_u64())
            .map(|v| v.max(1) as u32)
            .unwrap_or(defaults.page),
        page_size: params
            .get("pageSize")
            .and_then(|v| v.as_u64())
            .map(|v| v.clamp(1, 500) as u32)
            .unwrap_or(defaults.page_size),
    }
}
