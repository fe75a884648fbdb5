use std::io::Cursor;

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::gateway::{ApiError, ApiGateway, ApiRequest, ApiResponse, Upload};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// A binary body fetched from the backend, content type included so the host
/// application can hand it to the user with the right file semantics.
#[derive(Debug, Clone)]
pub struct Download {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// An .xlsx file is a zip archive; anything that does not open as one with
/// at least one entry is rejected before it ever reaches the wire.
pub fn is_spreadsheet_archive(bytes: &[u8]) -> bool {
    zip::ZipArchive::new(Cursor::new(bytes))
        .map(|archive| archive.len() > 0)
        .unwrap_or(false)
}

async fn import_spreadsheet(
    gw: &dyn ApiGateway,
    path: &str,
    bytes: Vec<u8>,
    file_name: &str,
) -> Result<Value, ApiError> {
    if !is_spreadsheet_archive(&bytes) {
        return Err(ApiError::Parse(format!(
            "{} is not a readable spreadsheet archive",
            file_name
        )));
    }
    let req = ApiRequest::new(crate::gateway::HttpMethod::Post, path).with_upload(Upload {
        field: "file",
        file_name: file_name.to_string(),
        content_type: XLSX_CONTENT_TYPE,
        bytes,
        form: Vec::new(),
    });
    gw.send(req).await?.into_json()
}

pub async fn import_students(
    gw: &dyn ApiGateway,
    bytes: Vec<u8>,
    file_name: &str,
) -> Result<Value, ApiError> {
    import_spreadsheet(gw, "/api/students/import", bytes, file_name).await
}

pub async fn import_teachers(
    gw: &dyn ApiGateway,
    bytes: Vec<u8>,
    file_name: &str,
) -> Result<Value, ApiError> {
    import_spreadsheet(gw, "/api/teachers/import", bytes, file_name).await
}

async fn download(gw: &dyn ApiGateway, path: &str) -> Result<Download, ApiError> {
    let req = ApiRequest::get(path).with_header("accept", format!("{}, */*", XLSX_CONTENT_TYPE));
    match gw.send(req).await? {
        ApiResponse::Binary {
            content_type,
            bytes,
        } => Ok(Download {
            content_type,
            bytes,
        }),
        // CSV exports come back under a text content type.
        ApiResponse::Text(text) => Ok(Download {
            content_type: "text/plain".to_string(),
            bytes: text.into_bytes(),
        }),
        ApiResponse::Json(_) => Err(ApiError::Parse(
            "expected a file body, got JSON".to_string(),
        )),
        ApiResponse::Empty => Err(ApiError::Parse("empty file body".to_string())),
    }
}

pub async fn export_students(gw: &dyn ApiGateway) -> Result<Download, ApiError> {
    download(gw, "/api/students/export").await
}

pub async fn export_teachers(gw: &dyn ApiGateway) -> Result<Download, ApiError> {
    download(gw, "/api/teachers/export").await
}

pub async fn students_import_template(gw: &dyn ApiGateway) -> Result<Download, ApiError> {
    download(gw, "/api/students/import/template").await
}

pub async fn teachers_import_template(gw: &dyn ApiGateway) -> Result<Download, ApiError> {
    download(gw, "/api/teachers/import/template").await
}

async fn push_syllabus(
    gw: &dyn ApiGateway,
    method: crate::gateway::HttpMethod,
    course_id: &str,
    bytes: Vec<u8>,
    file_name: &str,
) -> Result<Value, ApiError> {
    // The digest travels with the upload so the server can verify the body it
    // stored matches what the client read from disk.
    let digest = sha256_hex(&bytes);
    log::debug!("syllabus {} sha256={}", file_name, digest);
    let req = ApiRequest::new(method, format!("/api/taught-subjects/{}/syllabus", course_id))
        .with_upload(Upload {
            field: "file",
            file_name: file_name.to_string(),
            content_type: "application/octet-stream",
            bytes,
            form: vec![("sha256", digest)],
        });
    gw.send(req).await?.into_json()
}

pub async fn upload_syllabus(
    gw: &dyn ApiGateway,
    course_id: &str,
    bytes: Vec<u8>,
    file_name: &str,
) -> Result<Value, ApiError> {
    push_syllabus(gw, crate::gateway::HttpMethod::Post, course_id, bytes, file_name).await
}

pub async fn replace_syllabus(
    gw: &dyn ApiGateway,
    course_id: &str,
    bytes: Vec<u8>,
    file_name: &str,
) -> Result<Value, ApiError> {
    push_syllabus(gw, crate::gateway::HttpMethod::Put, course_id, bytes, file_name).await
}

pub async fn delete_syllabus(gw: &dyn ApiGateway, course_id: &str) -> Result<(), ApiError> {
    gw.delete(&format!("/api/taught-subjects/{}/syllabus", course_id))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;

    fn tiny_xlsx() -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            writer
                .start_file("[Content_Types].xml", FileOptions::default())
                .expect("start file");
            writer.write_all(b"<Types/>").expect("write entry");
            writer.finish().expect("finish zip");
        }
        cursor.into_inner()
    }

    #[test]
    fn sha256_matches_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn spreadsheet_archive_detection() {
        assert!(is_spreadsheet_archive(&tiny_xlsx()));
        assert!(!is_spreadsheet_archive(b"id,name\n1,Ana\n"));
        assert!(!is_spreadsheet_archive(b""));
    }

    #[tokio::test]
    async fn import_rejects_non_archives_locally() {
        let gw = crate::gateway::fake::FakeGateway::new();
        let result = import_students(&gw, b"not a spreadsheet".to_vec(), "roster.xlsx").await;
        assert!(matches!(result, Err(ApiError::Parse(_))));
        // Nothing was sent.
        assert!(gw.calls().is_empty());
    }
}
