//! Upload acceptance rules and stored-file naming.

use std::path::Path;

/// Default per-file limit (10 MiB).
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Files accepted on a progress update.
pub const MAX_FILES_PER_UPDATE: usize = 10;

/// Extensions accepted as progress-update evidence.
pub const UPDATE_EXTENSIONS: &[&str] = &[
    "jpeg", "jpg", "png", "gif", "pdf", "doc", "docx", "xls", "xlsx", "mp4", "avi", "mov",
];

/// Extensions accepted for downloadable templates.
pub const TEMPLATE_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "xls", "xlsx"];

/// Extensions accepted as a profile picture.
pub const PROFILE_PICTURE_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "gif", "webp"];

/// Profile pictures are capped below the general limit (5 MiB).
pub const MAX_PROFILE_PICTURE_BYTES: usize = 5 * 1024 * 1024;

define_text_enum! {
    /// Coarse kind recorded in `project_update_files.file_type`.
    FileKind {
        Photo => "photo",
        Video => "video",
        Document => "document",
        Other => "other",
    }
}

impl FileKind {
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime.to_ascii_lowercase();
        if mime.starts_with("image/") {
            FileKind::Photo
        } else if mime.starts_with("video/") {
            FileKind::Video
        } else if mime == "application/pdf"
            || mime.contains("word")
            || mime.contains("excel")
            || mime.contains("spreadsheet")
            || mime.contains("document")
        {
            FileKind::Document
        } else {
            FileKind::Other
        }
    }
}

/// `Content-Type` served for a stored image, keyed by its extension.
pub fn image_content_type(file_name: &str) -> Option<&'static str> {
    match extension_of(file_name)?.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Lower-cased extension of a client file name, without the dot.
pub fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Check a client file name against an extension allow-list.
pub fn validate_extension(file_name: &str, allowed: &[&str]) -> Result<String, String> {
    match extension_of(file_name) {
        Some(ext) if allowed.contains(&ext.as_str()) => Ok(ext),
        _ => Err(format!(
            "File type not allowed for '{file_name}'. Allowed: {}",
            allowed.join(", ")
        )),
    }
}

pub fn validate_size(file_name: &str, size: usize, limit: usize) -> Result<(), String> {
    if size > limit {
        return Err(format!(
            "File '{file_name}' exceeds the {} MB limit",
            limit / (1024 * 1024)
        ));
    }
    Ok(())
}

/// On-disk name: `<field>-<millis>-<random>.<ext>`.
///
/// The field name is reduced to `[A-Za-z0-9_]` so it is always a safe path
/// component.
pub fn stored_file_name(field: &str, millis: i64, random: u32, ext: &str) -> String {
    let field: String = field
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    let field = if field.is_empty() { "file".to_string() } else { field };
    format!("{field}-{millis}-{random}.{ext}")
}

/// Whether a stored name is a bare file name (no separators or parent refs).
pub fn is_safe_stored_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains("..")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_from_mime() {
        assert_eq!(FileKind::from_mime("image/jpeg"), FileKind::Photo);
        assert_eq!(FileKind::from_mime("IMAGE/PNG"), FileKind::Photo);
        assert_eq!(FileKind::from_mime("video/mp4"), FileKind::Video);
        assert_eq!(FileKind::from_mime("application/pdf"), FileKind::Document);
        assert_eq!(FileKind::from_mime("application/msword"), FileKind::Document);
        assert_eq!(
            FileKind::from_mime("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
            FileKind::Document
        );
        assert_eq!(FileKind::from_mime("application/octet-stream"), FileKind::Other);
    }

    #[test]
    fn extension_allow_list() {
        assert_eq!(validate_extension("site.JPG", UPDATE_EXTENSIONS).unwrap(), "jpg");
        assert!(validate_extension("clip.mov", UPDATE_EXTENSIONS).is_ok());
        assert!(validate_extension("run.exe", UPDATE_EXTENSIONS).is_err());
        assert!(validate_extension("noext", UPDATE_EXTENSIONS).is_err());
        assert!(validate_extension("photo.png", TEMPLATE_EXTENSIONS).is_err());
        assert!(validate_extension("form.xlsx", TEMPLATE_EXTENSIONS).is_ok());
    }

    #[test]
    fn profile_pictures_are_images_only() {
        assert!(validate_extension("me.webp", PROFILE_PICTURE_EXTENSIONS).is_ok());
        assert!(validate_extension("cv.pdf", PROFILE_PICTURE_EXTENSIONS).is_err());
        assert_eq!(image_content_type("profile_picture-1-2.JPG"), Some("image/jpeg"));
        assert_eq!(image_content_type("a.webp"), Some("image/webp"));
        assert_eq!(image_content_type("a.pdf"), None);
        let err = validate_size("me.png", MAX_PROFILE_PICTURE_BYTES + 1, MAX_PROFILE_PICTURE_BYTES)
            .unwrap_err();
        assert!(err.contains("5 MB"));
    }

    #[test]
    fn size_limit() {
        assert!(validate_size("a.pdf", MAX_UPLOAD_BYTES, MAX_UPLOAD_BYTES).is_ok());
        let err = validate_size("a.pdf", MAX_UPLOAD_BYTES + 1, MAX_UPLOAD_BYTES).unwrap_err();
        assert!(err.contains("10 MB"));
    }

    #[test]
    fn stored_names() {
        assert_eq!(stored_file_name("files", 1700000000000, 42, "pdf"), "files-1700000000000-42.pdf");
        assert_eq!(stored_file_name("../x", 1, 2, "png"), "x-1-2.png");
        assert_eq!(stored_file_name("", 1, 2, "png"), "file-1-2.png");
    }

    #[test]
    fn safe_names() {
        assert!(is_safe_stored_name("files-1-2.pdf"));
        assert!(!is_safe_stored_name("../etc/passwd"));
        assert!(!is_safe_stored_name("a\\b"));
        assert!(!is_safe_stored_name(""));
    }
}
