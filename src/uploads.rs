// src/uploads.rs

use std::path::Path;

use actix_multipart::Multipart;
use actix_web::{http::header, web, HttpRequest};
use chrono::Utc;
use futures_util::StreamExt;
use log::{debug, info};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

const MAX_EXTENSION_LEN: usize = 10;

/// A file received with a share request, held in memory until the request has
/// been authorized.
#[derive(Debug)]
pub struct UploadedFile {
    pub original_name: Option<String>,
    pub bytes: Vec<u8>,
}

/// What an employee sent when sharing an update.
#[derive(Debug, Default)]
pub struct Submission {
    pub message: String,
    pub file: Option<UploadedFile>,
}

impl Submission {
    pub fn is_empty(&self) -> bool {
        self.message.trim().is_empty() && self.file.is_none()
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct JsonSubmission {
    message: String,
}

/// Keeps the extension of the original name when it is short and
/// alphanumeric. Everything else about the client's name is discarded.
pub fn safe_extension(original: Option<&str>) -> Option<String> {
    let ext = Path::new(original?).extension()?.to_str()?;
    if ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// `<millis>-<uuid>[.ext]`
pub fn stored_file_name(original: Option<&str>) -> String {
    let stem = format!(
        "{}-{}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple()
    );
    match safe_extension(original) {
        Some(ext) => format!("{}.{}", stem, ext),
        None => stem,
    }
}

/// Writes the file under a generated name and returns that name.
pub async fn save(dir: &Path, file: &UploadedFile) -> Result<String, ApiError> {
    tokio::fs::create_dir_all(dir).await?;
    let name = stored_file_name(file.original_name.as_deref());
    tokio::fs::write(dir.join(&name), &file.bytes).await?;
    info!("Stored upload {} ({} bytes)", name, file.bytes.len());
    Ok(name)
}

fn too_large(max_bytes: usize) -> ApiError {
    ApiError::validation(format!("File too large (limit {} bytes)", max_bytes))
}

fn is_multipart(req: &HttpRequest) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.trim_start().to_ascii_lowercase().starts_with("multipart/"))
        .unwrap_or(false)
}

/// Reads a share request body: multipart with `message` and `file` fields,
/// or a JSON `{message}` body.
pub async fn read_submission(
    req: &HttpRequest,
    payload: web::Payload,
    max_bytes: usize,
) -> Result<Submission, ApiError> {
    if is_multipart(req) {
        read_multipart(Multipart::new(req.headers(), payload), max_bytes).await
    } else {
        read_json(payload, max_bytes).await
    }
}

async fn read_json(mut payload: web::Payload, max_bytes: usize) -> Result<Submission, ApiError> {
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| ApiError::validation(format!("Invalid body: {}", e)))?;
        if body.len() + chunk.len() > max_bytes {
            return Err(too_large(max_bytes));
        }
        body.extend_from_slice(&chunk);
    }
    if body.is_empty() {
        return Ok(Submission::default());
    }
    let parsed: JsonSubmission = serde_json::from_slice(&body)
        .map_err(|e| ApiError::validation(format!("Invalid JSON body: {}", e)))?;
    Ok(Submission {
        message: parsed.message,
        file: None,
    })
}

async fn read_multipart(mut multipart: Multipart, max_bytes: usize) -> Result<Submission, ApiError> {
    let mut submission = Submission::default();

    while let Some(item) = multipart.next().await {
        let mut field =
            item.map_err(|e| ApiError::validation(format!("Invalid multipart body: {}", e)))?;
        let (name, filename) = match field.content_disposition() {
            Some(cd) => (
                cd.get_name().unwrap_or_default().to_string(),
                cd.get_filename().map(str::to_string),
            ),
            None => (String::new(), None),
        };

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk =
                chunk.map_err(|e| ApiError::validation(format!("Invalid multipart body: {}", e)))?;
            if bytes.len() + chunk.len() > max_bytes {
                return Err(too_large(max_bytes));
            }
            bytes.extend_from_slice(&chunk);
        }

        match name.as_str() {
            "message" => {
                submission.message = String::from_utf8(bytes)
                    .map_err(|_| ApiError::validation("message must be UTF-8 text"))?;
            }
            "file" => {
                // Browsers send an empty part when no file was picked.
                let picked = filename.as_deref().is_some_and(|f| !f.is_empty());
                if picked || !bytes.is_empty() {
                    submission.file = Some(UploadedFile {
                        original_name: filename,
                        bytes,
                    });
                }
            }
            other => debug!("Ignoring multipart field {:?}", other),
        }
    }

    Ok(submission)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_are_sanitized() {
        assert_eq!(safe_extension(Some("report.PDF")), Some("pdf".to_string()));
        assert_eq!(safe_extension(Some("archive.tar.gz")), Some("gz".to_string()));
        assert_eq!(safe_extension(Some("noext")), None);
        assert_eq!(safe_extension(Some("evil.p/hp")), None);
        assert_eq!(safe_extension(Some("weird.ex e")), None);
        assert_eq!(safe_extension(None), None);
    }

    #[test]
    fn stored_names_are_unique_and_keep_the_extension() {
        let a = stored_file_name(Some("notes.txt"));
        let b = stored_file_name(Some("notes.txt"));
        assert_ne!(a, b);
        assert!(a.ends_with(".txt"));
        let (millis, _) = a.split_once('-').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert!(!stored_file_name(Some("../../etc/passwd")).contains('/'));
    }

    #[tokio::test]
    async fn save_writes_into_the_upload_dir() {
        let dir = tempfile::tempdir().unwrap();
        let file = UploadedFile {
            original_name: Some("hello.txt".into()),
            bytes: b"hello".to_vec(),
        };
        let name = save(dir.path(), &file).await.unwrap();
        let written = std::fs::read(dir.path().join(&name)).unwrap();
        assert_eq!(written, b"hello");
    }

    #[test]
    fn empty_submission() {
        assert!(Submission::default().is_empty());
        let with_file = Submission {
            message: " ".into(),
            file: Some(UploadedFile {
                original_name: None,
                bytes: vec![1],
            }),
        };
        assert!(!with_file.is_empty());
    }
}
