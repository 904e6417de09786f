//! Multipart intake and on-disk storage for update evidence, templates and
//! profile pictures.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use axum::extract::Multipart;
use buildwatch_core::hashing::sha256_hex;
use buildwatch_core::upload::{
    is_safe_stored_name, stored_file_name, validate_extension, validate_size, FileKind,
};

use crate::error::AppError;

/// Sub-directory of the upload root for progress update evidence.
pub const PROJECT_UPDATES_DIR: &str = "project-updates";
/// Sub-directory of the upload root for templates.
pub const TEMPLATES_DIR: &str = "templates";
/// Sub-directory of the upload root for profile pictures.
pub const PROFILE_PICTURES_DIR: &str = "profile-pictures";

/// A file part read from a multipart body.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field_name: String,
    pub original_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Text fields and file parts of one multipart body.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub files: Vec<UploadedFile>,
}

impl MultipartForm {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn require_text(&self, name: &str) -> Result<&str, AppError> {
        self.text(name)
            .ok_or_else(|| AppError::BadRequest(format!("Missing form field '{name}'")))
    }
}

/// Drain a multipart body. Parts with a file name are files; the rest are text.
pub async fn read_multipart(mut multipart: Multipart) -> Result<MultipartForm, AppError> {
    let mut form = MultipartForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match field.file_name().map(str::to_string) {
            Some(original_name) => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                form.files.push(UploadedFile {
                    field_name: name,
                    original_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            None => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                form.fields.insert(name, value);
            }
        }
    }
    Ok(form)
}

/// A file written under the upload root.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub file_name: String,
    pub original_name: String,
    /// Path relative to the upload root, e.g. `project-updates/files-…pdf`.
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: String,
    pub file_type: FileKind,
    pub sha256: String,
}

/// Check a file part against the extension whitelist and size limit.
pub fn validate_upload(
    file: &UploadedFile,
    allowed: &[&str],
    max_bytes: usize,
) -> Result<String, AppError> {
    let ext = validate_extension(&file.original_name, allowed).map_err(AppError::validation)?;
    validate_size(&file.original_name, file.bytes.len(), max_bytes)
        .map_err(AppError::validation)?;
    Ok(ext)
}

/// Validate and write `file` to `<root>/<subdir>/<generated name>`.
pub async fn store(
    root: &Path,
    subdir: &str,
    file: &UploadedFile,
    allowed: &[&str],
    max_bytes: usize,
) -> Result<StoredFile, AppError> {
    let ext = validate_upload(file, allowed, max_bytes)?;

    let dir = root.join(subdir);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?;

    let field = if file.field_name.is_empty() {
        "file"
    } else {
        file.field_name.as_str()
    };
    let file_name = stored_file_name(
        field,
        chrono::Utc::now().timestamp_millis(),
        rand::random::<u32>(),
        &ext,
    );
    tokio::fs::write(dir.join(&file_name), &file.bytes)
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?;

    tracing::debug!(
        file_name = %file_name,
        original_name = %file.original_name,
        size = file.bytes.len(),
        "Stored upload"
    );

    Ok(StoredFile {
        file_path: format!("{subdir}/{file_name}"),
        file_name,
        original_name: file.original_name.clone(),
        file_size: file.bytes.len() as i64,
        mime_type: file.content_type.clone(),
        file_type: FileKind::from_mime(&file.content_type),
        sha256: sha256_hex(&file.bytes),
    })
}

/// Resolve a stored relative path under `root`, refusing anything that could
/// escape it.
pub fn resolve(root: &Path, relative: &str) -> Result<PathBuf, AppError> {
    let (subdir, name) = relative
        .split_once('/')
        .ok_or_else(|| AppError::InternalError(format!("Invalid stored path '{relative}'")))?;
    if ![PROJECT_UPDATES_DIR, TEMPLATES_DIR, PROFILE_PICTURES_DIR].contains(&subdir) || !is_safe_stored_name(name) {
        return Err(AppError::InternalError(format!(
            "Invalid stored path '{relative}'"
        )));
    }
    Ok(root.join(subdir).join(name))
}

/// Best-effort removal, used when a later step of the same request fails.
pub async fn remove_quietly(root: &Path, stored: &[StoredFile]) {
    for file in stored {
        remove_path_quietly(root, &file.file_path).await;
    }
}

/// Best-effort removal of a file that is no longer referenced.
pub async fn remove_path_quietly(root: &Path, relative: &str) {
    if let Ok(path) = resolve(root, relative) {
        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove upload");
        }
    }
}
