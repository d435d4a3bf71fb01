//! Note CRUD handlers.
//!
//! Attachment ordering: on create the blob is sealed before the row is
//! inserted and rolled back if the insert fails, so metadata never
//! references a blob that is not there. On update the old blob is deleted
//! before the replacement is recorded.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use nvault_core::FileMeta;

use crate::auth::middleware::Claims;
use crate::notes::{
    fetch_owned, internal, parse_note_form, validate_note_fields, FileResponse, NoteResponse,
    NoteRow, StagedUpload, NOTE_COLUMNS,
};
use crate::state::AppState;

/// Seal a staged upload into the blob store, returning the metadata to
/// persist. The staged plaintext is gone on success; on failure it is
/// cleaned up here and the client gets a generic 500.
pub(crate) async fn seal_upload(
    state: &AppState,
    upload: StagedUpload,
) -> Result<FileMeta, (StatusCode, String)> {
    let StagedUpload {
        path,
        original_name,
        mime_type,
        size,
    } = upload;

    match state.store.encrypt_file(&path).await {
        Ok(blob) => {
            state.metrics.blobs_encrypted.inc();
            state.metrics.upload_bytes.inc_by(size);
            Ok(FileMeta {
                file_name: blob.file_name().to_string(),
                original_name,
                mime_type,
                size,
                encrypted_path: blob.locator,
                iv: blob.iv,
            })
        }
        Err(e) => {
            tracing::error!("attachment encryption failed: {e}");
            if path.exists() {
                if let Err(rm) = tokio::fs::remove_file(&path).await {
                    tracing::warn!(path = %path.display(), "staged upload cleanup failed: {rm}");
                }
            }
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to store attachment".to_string(),
            ))
        }
    }
}

/// GET /api/notes — List the user's notes, pinned first, newest first.
pub async fn list_notes(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<Vec<NoteResponse>>, (StatusCode, String)> {
    let db = state.db.clone();
    let user_id = claims.sub;

    let rows = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| internal())?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {NOTE_COLUMNS} FROM notes WHERE user_id = ?1 \
                 ORDER BY is_pinned DESC, created_at DESC"
            ))
            .map_err(|_| internal())?;
        let rows: Vec<NoteRow> = stmt
            .query_map([&user_id], NoteRow::from_row)
            .map_err(|_| internal())?
            .filter_map(|r| r.ok())
            .collect();
        Ok::<_, (StatusCode, String)>(rows)
    })
    .await
    .map_err(|_| internal())??;

    Ok(Json(rows.into_iter().map(NoteResponse::from).collect()))
}

/// POST /api/notes — Create a note, sealing any attached file.
pub async fn create_note(
    State(state): State<AppState>,
    claims: Claims,
    multipart: Multipart,
) -> Result<(StatusCode, Json<NoteResponse>), (StatusCode, String)> {
    let form = parse_note_form(multipart, &state.limits, &state.staging_dir).await?;

    let title = form
        .title
        .clone()
        .map(|t| t.trim().to_string())
        .unwrap_or_default();
    let content = form.content.clone().unwrap_or_default();
    let is_pinned = form.is_pinned.unwrap_or(false);

    if let Err(e) = validate_note_fields(&title, &content, &state.limits) {
        if let Some(file) = form.file {
            file.discard().await;
        }
        return Err(e);
    }

    // Seal the attachment before touching the database
    let attachment = match form.file {
        Some(upload) => Some(seal_upload(&state, upload).await?),
        None => None,
    };

    let note_id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    let insert = {
        let db = state.db.clone();
        let note_id = note_id.clone();
        let user_id = claims.sub.clone();
        let title = title.clone();
        let content = content.clone();
        let now = now.clone();
        let attachment = attachment.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.lock().map_err(|_| internal())?;
            match &attachment {
                Some(a) => conn.execute(
                    "INSERT INTO notes (id, user_id, title, content, is_pinned, \
                     file_name, original_name, mime_type, size, encrypted_path, iv, \
                     created_at, updated_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                    rusqlite::params![
                        note_id,
                        user_id,
                        title,
                        content,
                        is_pinned,
                        a.file_name,
                        a.original_name,
                        a.mime_type,
                        a.size as i64,
                        a.encrypted_path,
                        a.iv,
                        now,
                        now
                    ],
                ),
                None => conn.execute(
                    "INSERT INTO notes (id, user_id, title, content, is_pinned, \
                     created_at, updated_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    rusqlite::params![note_id, user_id, title, content, is_pinned, now, now],
                ),
            }
            .map_err(|_| internal())?;
            Ok::<_, (StatusCode, String)>(())
        })
        .await
        .map_err(|_| internal())?
    };

    if let Err(e) = insert {
        // The blob was written but its metadata never landed; drop it
        if let Some(a) = &attachment {
            if let Err(del) = state.store.delete_blob(&a.encrypted_path).await {
                tracing::warn!(locator = %a.encrypted_path, "rollback delete failed: {del}");
            }
        }
        return Err(e);
    }

    state.metrics.notes_created.inc();
    tracing::info!(note_id = %note_id, "note created");

    let file = attachment.map(FileResponse::from);
    Ok((
        StatusCode::CREATED,
        Json(NoteResponse {
            id: note_id,
            title,
            content,
            is_pinned,
            created_at: now.clone(),
            updated_at: now,
            file,
        }),
    ))
}

/// GET /api/notes/{id} — Fetch a single note.
pub async fn get_note(
    State(state): State<AppState>,
    claims: Claims,
    Path(note_id): Path<String>,
) -> Result<Json<NoteResponse>, (StatusCode, String)> {
    let db = state.db.clone();
    let user_id = claims.sub;

    let row = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| internal())?;
        fetch_owned(&conn, &note_id, &user_id)
    })
    .await
    .map_err(|_| internal())??;

    Ok(Json(NoteResponse::from(row)))
}

/// PUT /api/notes/{id} — Update provided fields; a new file replaces the
/// old attachment.
pub async fn update_note(
    State(state): State<AppState>,
    claims: Claims,
    Path(note_id): Path<String>,
    multipart: Multipart,
) -> Result<Json<NoteResponse>, (StatusCode, String)> {
    let form = parse_note_form(multipart, &state.limits, &state.staging_dir).await?;

    let existing = {
        let db = state.db.clone();
        let note_id = note_id.clone();
        let user_id = claims.sub.clone();
        let loaded = tokio::task::spawn_blocking(move || {
            let conn = db.lock().map_err(|_| internal())?;
            fetch_owned(&conn, &note_id, &user_id)
        })
        .await
        .map_err(|_| internal())?;

        match loaded {
            Ok(row) => row,
            Err(e) => {
                if let Some(file) = form.file {
                    file.discard().await;
                }
                return Err(e);
            }
        }
    };

    let title = match &form.title {
        Some(t) => t.trim().to_string(),
        None => existing.title.clone(),
    };
    let content = form
        .content
        .clone()
        .unwrap_or_else(|| existing.content.clone());
    let is_pinned = form.is_pinned.unwrap_or(existing.is_pinned);

    if let Err(e) = validate_note_fields(&title, &content, &state.limits) {
        if let Some(file) = form.file {
            file.discard().await;
        }
        return Err(e);
    }

    // Replacement order: the old blob goes before the new one is recorded
    let attachment = match form.file {
        Some(upload) => {
            if let Some(old) = &existing.encrypted_path {
                match state.store.delete_blob(old).await {
                    Ok(()) => {
                        state.metrics.blobs_deleted.inc();
                    }
                    Err(e) => tracing::warn!(locator = %old, "old attachment delete failed: {e}"),
                }
            }
            Some(seal_upload(&state, upload).await?)
        }
        None => None,
    };

    let now = Utc::now().to_rfc3339();

    let update = {
        let db = state.db.clone();
        let note_id = note_id.clone();
        let title = title.clone();
        let content = content.clone();
        let now = now.clone();
        let attachment = attachment.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.lock().map_err(|_| internal())?;
            match &attachment {
                Some(a) => conn.execute(
                    "UPDATE notes SET title = ?1, content = ?2, is_pinned = ?3, \
                     file_name = ?4, original_name = ?5, mime_type = ?6, size = ?7, \
                     encrypted_path = ?8, iv = ?9, updated_at = ?10 WHERE id = ?11",
                    rusqlite::params![
                        title,
                        content,
                        is_pinned,
                        a.file_name,
                        a.original_name,
                        a.mime_type,
                        a.size as i64,
                        a.encrypted_path,
                        a.iv,
                        now,
                        note_id
                    ],
                ),
                None => conn.execute(
                    "UPDATE notes SET title = ?1, content = ?2, is_pinned = ?3, \
                     updated_at = ?4 WHERE id = ?5",
                    rusqlite::params![title, content, is_pinned, now, note_id],
                ),
            }
            .map_err(|_| internal())?;
            Ok::<_, (StatusCode, String)>(())
        })
        .await
        .map_err(|_| internal())?
    };

    if let Err(e) = update {
        if let Some(a) = &attachment {
            if let Err(del) = state.store.delete_blob(&a.encrypted_path).await {
                tracing::warn!(locator = %a.encrypted_path, "rollback delete failed: {del}");
            }
        }
        return Err(e);
    }

    tracing::info!(note_id = %note_id, "note updated");

    let row = {
        let db = state.db.clone();
        let note_id = note_id.clone();
        let user_id = claims.sub.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.lock().map_err(|_| internal())?;
            fetch_owned(&conn, &note_id, &user_id)
        })
        .await
        .map_err(|_| internal())??
    };

    Ok(Json(NoteResponse::from(row)))
}

/// DELETE /api/notes/{id} — Delete the note and its attachment blob.
/// Blob failures are logged and the row still goes.
pub async fn delete_note(
    State(state): State<AppState>,
    claims: Claims,
    Path(note_id): Path<String>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let existing = {
        let db = state.db.clone();
        let note_id = note_id.clone();
        let user_id = claims.sub.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.lock().map_err(|_| internal())?;
            fetch_owned(&conn, &note_id, &user_id)
        })
        .await
        .map_err(|_| internal())??
    };

    if let Some(locator) = &existing.encrypted_path {
        match state.store.delete_blob(locator).await {
            Ok(()) => {
                state.metrics.blobs_deleted.inc();
            }
            Err(e) => tracing::warn!(locator = %locator, "attachment delete failed: {e}"),
        }
    }

    {
        let db = state.db.clone();
        let note_id = note_id.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.lock().map_err(|_| internal())?;
            conn.execute("DELETE FROM notes WHERE id = ?1", [&note_id])
                .map_err(|_| internal())?;
            Ok::<_, (StatusCode, String)>(())
        })
        .await
        .map_err(|_| internal())??;
    }

    tracing::info!(note_id = %note_id, "note deleted");

    Ok(Json(serde_json::json!({ "message": "Note deleted" })))
}
