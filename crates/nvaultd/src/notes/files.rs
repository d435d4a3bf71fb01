//! Attachment download and removal.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;

use crate::auth::middleware::Claims;
use crate::notes::{fetch_owned, internal, NoteResponse};
use crate::state::AppState;

/// GET /api/notes/{id}/file — Decrypt the attachment and return the
/// original bytes with the stored MIME type.
pub async fn download_file(
    State(state): State<AppState>,
    claims: Claims,
    Path(note_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
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

    let (Some(locator), Some(iv), Some(mime_type), Some(original_name)) =
        (row.encrypted_path, row.iv, row.mime_type, row.original_name)
    else {
        return Err((
            StatusCode::NOT_FOUND,
            "No file attached to this note".to_string(),
        ));
    };

    let plaintext = match state.store.decrypt_blob(&locator, &iv).await {
        Ok(bytes) => bytes,
        Err(e) => {
            // Detail stays in the logs; the client gets a generic message
            tracing::error!(note_id = %note_id, "attachment read failed: {e}");
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read attachment".to_string(),
            ));
        }
    };
    state.metrics.blobs_decrypted.inc();

    let headers = [
        (header::CONTENT_TYPE, mime_type),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{original_name}\""),
        ),
    ];
    Ok((headers, plaintext))
}

/// DELETE /api/notes/{id}/file — Remove the attachment blob and clear its
/// metadata, returning the updated note.
pub async fn delete_file(
    State(state): State<AppState>,
    claims: Claims,
    Path(note_id): Path<String>,
) -> Result<Json<NoteResponse>, (StatusCode, String)> {
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

    let Some(locator) = row.encrypted_path else {
        return Err((
            StatusCode::NOT_FOUND,
            "No file attached to this note".to_string(),
        ));
    };

    // Deleting a missing blob succeeds; a hard storage error aborts before
    // the metadata is cleared
    state.store.delete_blob(&locator).await.map_err(|e| {
        tracing::error!(locator = %locator, "attachment delete failed: {e}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to delete attachment".to_string(),
        )
    })?;
    state.metrics.blobs_deleted.inc();

    let now = Utc::now().to_rfc3339();
    let updated = {
        let db = state.db.clone();
        let note_id = note_id.clone();
        let user_id = claims.sub.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.lock().map_err(|_| internal())?;
            conn.execute(
                "UPDATE notes SET file_name = NULL, original_name = NULL, \
                 mime_type = NULL, size = NULL, encrypted_path = NULL, iv = NULL, \
                 updated_at = ?1 WHERE id = ?2",
                rusqlite::params![now, note_id],
            )
            .map_err(|_| internal())?;
            fetch_owned(&conn, &note_id, &user_id)
        })
        .await
        .map_err(|_| internal())??
    };

    tracing::info!(note_id = %note_id, "attachment deleted");

    Ok(Json(NoteResponse::from(updated)))
}
