use std::path::{Path, PathBuf};

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::Attachment;

pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "txt", "pdf", "png", "jpg", "jpeg", "gif", "doc", "docx", "xls", "xlsx",
];

/// Lowercased extension of the original filename, if it is on the allow-list.
pub fn allowed_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Generated stored name, unrelated to the client-supplied one. Keeps path
/// traversal and collisions out of the upload directory.
pub fn stored_filename(extension: &str) -> String {
    format!("{}.{}", Uuid::new_v4().simple(), extension)
}

pub async fn save(
    pool: &SqlitePool,
    uploads_dir: &Path,
    ticket_id: i64,
    user_id: i64,
    original_filename: &str,
    data: &[u8],
) -> Result<Attachment, ApiError> {
    let extension = allowed_extension(original_filename)
        .ok_or_else(|| ApiError::bad_request("File type not allowed"))?;

    let filename = stored_filename(&extension);
    let path = uploads_dir.join(&filename);

    tokio::fs::create_dir_all(uploads_dir)
        .await
        .map_err(|e| ApiError::internal(format!("failed to create upload directory: {e}")))?;
    tokio::fs::write(&path, data)
        .await
        .map_err(|e| ApiError::internal(format!("failed to store uploaded file: {e}")))?;

    let mime_type = mime_guess::from_path(&path).first_or_octet_stream().to_string();

    let result = sqlx::query(
        "INSERT INTO attachments (filename, original_filename, file_size, mime_type, ticket_id, user_id, uploaded_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&filename)
    .bind(original_filename)
    .bind(data.len() as i64)
    .bind(&mime_type)
    .bind(ticket_id)
    .bind(user_id)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    get(pool, result.last_insert_rowid()).await
}

pub async fn list(pool: &SqlitePool, ticket_id: i64) -> Result<Vec<Attachment>, ApiError> {
    let attachments = sqlx::query_as("SELECT * FROM attachments WHERE ticket_id = ? ORDER BY id")
        .bind(ticket_id)
        .fetch_all(pool)
        .await?;
    Ok(attachments)
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Attachment, ApiError> {
    let attachment: Option<Attachment> = sqlx::query_as("SELECT * FROM attachments WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    attachment.ok_or_else(|| ApiError::not_found("Attachment not found"))
}

/// Reads the backing file; a dangling record (file gone from disk) is a 404
/// even though the metadata row exists.
pub async fn read_file(uploads_dir: &Path, attachment: &Attachment) -> Result<Vec<u8>, ApiError> {
    let path: PathBuf = uploads_dir.join(&attachment.filename);
    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ApiError::not_found("File not found"))
        }
        Err(e) => Err(ApiError::internal(format!("failed to read stored file: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_allow_list() {
        assert_eq!(allowed_extension("report.PDF").as_deref(), Some("pdf"));
        assert_eq!(allowed_extension("photo.jpeg").as_deref(), Some("jpeg"));
        assert!(allowed_extension("payload.exe").is_none());
        assert!(allowed_extension("no_extension").is_none());
        assert!(allowed_extension("archive.tar.gz").is_none());
    }

    #[test]
    fn stored_names_are_unique_and_keep_extension() {
        let a = stored_filename("png");
        let b = stored_filename("png");
        assert_ne!(a, b);
        assert!(a.ends_with(".png"));
        assert!(!a.contains('/'));
        assert!(!a.contains(".."));
    }
}
