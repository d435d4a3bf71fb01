//! Notes: metadata rows in SQLite, attachments sealed in the blob store.
//!
//! Handlers parse multipart note forms, stage any uploaded file as
//! plaintext under the staging dir, and hand it to the blob store. The
//! `encrypted_path` and `iv` columns exist only on `NoteRow`; the API
//! response types have no such fields, so they cannot leak.

pub mod files;
pub mod handlers;

use std::path::{Path, PathBuf};

use axum::extract::Multipart;
use axum::http::StatusCode;
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use nvault_core::config::LimitsConfig;
use nvault_core::FileMeta;

// --- API response types (camelCase, original client contract) ---

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    pub file_name: String,
    pub original_name: String,
    pub mime_type: String,
    pub size: u64,
}

impl From<FileMeta> for FileResponse {
    fn from(meta: FileMeta) -> Self {
        FileResponse {
            file_name: meta.file_name,
            original_name: meta.original_name,
            mime_type: meta.mime_type,
            size: meta.size,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteResponse {
    pub id: String,
    pub title: String,
    pub content: String,
    pub is_pinned: bool,
    pub created_at: String,
    pub updated_at: String,
    pub file: Option<FileResponse>,
}

// --- Database row ---

pub(crate) const NOTE_COLUMNS: &str = "id, user_id, title, content, is_pinned, \
     file_name, original_name, mime_type, size, encrypted_path, iv, \
     created_at, updated_at";

/// A notes table row, including the storage-internal columns.
#[derive(Debug, Clone)]
pub struct NoteRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub is_pinned: bool,
    pub file_name: Option<String>,
    pub original_name: Option<String>,
    pub mime_type: Option<String>,
    pub size: Option<i64>,
    pub encrypted_path: Option<String>,
    pub iv: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl NoteRow {
    pub(crate) fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            content: row.get(3)?,
            is_pinned: row.get::<_, i64>(4)? != 0,
            file_name: row.get(5)?,
            original_name: row.get(6)?,
            mime_type: row.get(7)?,
            size: row.get(8)?,
            encrypted_path: row.get(9)?,
            iv: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }

    pub(crate) fn fetch(conn: &Connection, note_id: &str) -> rusqlite::Result<Option<Self>> {
        conn.query_row(
            &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1"),
            [note_id],
            Self::from_row,
        )
        .optional()
    }
}

impl From<NoteRow> for NoteResponse {
    /// Project a row into its API shape. The `encrypted_path` and `iv`
    /// columns have no counterpart here and never leave the server.
    fn from(row: NoteRow) -> Self {
        let file = match (row.file_name, row.original_name, row.mime_type, row.size) {
            (Some(file_name), Some(original_name), Some(mime_type), Some(size)) => {
                Some(FileResponse {
                    file_name,
                    original_name,
                    mime_type,
                    size: size.max(0) as u64,
                })
            }
            _ => None,
        };

        NoteResponse {
            id: row.id,
            title: row.title,
            content: row.content,
            is_pinned: row.is_pinned,
            created_at: row.created_at,
            updated_at: row.updated_at,
            file,
        }
    }
}

/// Fetch a note enforcing ownership: a missing id is 404, someone else's
/// note is 403.
pub(crate) fn fetch_owned(
    conn: &Connection,
    note_id: &str,
    user_id: &str,
) -> Result<NoteRow, (StatusCode, String)> {
    match NoteRow::fetch(conn, note_id) {
        Ok(Some(row)) if row.user_id == user_id => Ok(row),
        Ok(Some(_)) => Err((StatusCode::FORBIDDEN, "You do not own this note".to_string())),
        Ok(None) => Err((StatusCode::NOT_FOUND, "Note not found".to_string())),
        Err(_) => Err(internal()),
    }
}

// --- Multipart note form ---

/// A parsed multipart note form. Fields absent from the form stay `None`
/// so PUT can distinguish "not sent" from "sent empty".
#[derive(Debug, Default)]
pub struct NoteForm {
    pub title: Option<String>,
    pub content: Option<String>,
    pub is_pinned: Option<bool>,
    pub file: Option<StagedUpload>,
}

/// An uploaded file parked in the staging directory, still plaintext.
#[derive(Debug)]
pub struct StagedUpload {
    pub path: PathBuf,
    pub original_name: String,
    pub mime_type: String,
    pub size: u64,
}

impl StagedUpload {
    /// Best-effort removal of the staged plaintext (validation failure
    /// and rollback paths).
    pub(crate) async fn discard(self) {
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            tracing::warn!(path = %self.path.display(), "staged upload cleanup failed: {e}");
        }
    }
}

/// Parse a multipart note form, staging any file field to disk.
///
/// A file field larger than `max_upload_bytes` is rejected with 413 before
/// anything is staged. Unknown fields are ignored.
pub(crate) async fn parse_note_form(
    mut multipart: Multipart,
    limits: &LimitsConfig,
    staging_dir: &Path,
) -> Result<NoteForm, (StatusCode, String)> {
    let mut form = NoteForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (e.status(), e.body_text()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match name.as_str() {
            "title" => {
                form.title = Some(field.text().await.map_err(|e| (e.status(), e.body_text()))?);
            }
            "content" => {
                form.content = Some(field.text().await.map_err(|e| (e.status(), e.body_text()))?);
            }
            "isPinned" => {
                let value = field.text().await.map_err(|e| (e.status(), e.body_text()))?;
                form.is_pinned = Some(parse_is_pinned(&value)?);
            }
            "file" => {
                let original_name = sanitize_file_name(field.file_name());
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| (e.status(), e.body_text()))?;

                if data.len() > limits.max_upload_bytes {
                    if let Some(prev) = form.file.take() {
                        prev.discard().await;
                    }
                    return Err((
                        StatusCode::PAYLOAD_TOO_LARGE,
                        format!("File exceeds the {} byte limit", limits.max_upload_bytes),
                    ));
                }

                let staged = staging_dir.join(format!("{}.part", Uuid::new_v4().simple()));
                tokio::fs::write(&staged, &data).await.map_err(|e| {
                    tracing::error!(path = %staged.display(), "staging write failed: {e}");
                    internal()
                })?;

                // A repeated file field replaces the previous one
                if let Some(prev) = form.file.take() {
                    prev.discard().await;
                }
                form.file = Some(StagedUpload {
                    path: staged,
                    original_name,
                    mime_type,
                    size: data.len() as u64,
                });
            }
            _ => {}
        }
    }

    Ok(form)
}

fn parse_is_pinned(value: &str) -> Result<bool, (StatusCode, String)> {
    match value.trim() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err((
            StatusCode::BAD_REQUEST,
            format!("isPinned must be true or false, got '{other}'"),
        )),
    }
}

/// Keep only the final path component of a client-supplied filename and
/// drop characters that would corrupt a Content-Disposition header.
fn sanitize_file_name(name: Option<&str>) -> String {
    let name = name.unwrap_or("upload");
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .filter(|c| !c.is_control() && *c != '"')
        .collect();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// Title and content bounds shared by create and update.
pub(crate) fn validate_note_fields(
    title: &str,
    content: &str,
    limits: &LimitsConfig,
) -> Result<(), (StatusCode, String)> {
    if title.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Title is required".to_string()));
    }
    if title.chars().count() > limits.max_title_chars {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Title exceeds {} characters", limits.max_title_chars),
        ));
    }
    if content.chars().count() > limits.max_content_chars {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Content exceeds {} characters", limits.max_content_chars),
        ));
    }
    Ok(())
}

pub(crate) fn internal() -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}
