//! Account handlers: register, login, me.
//!
//! Passwords arrive as `SecretString` so accidental Debug logging shows
//! `[REDACTED]`, and are hashed with Argon2id (PHC string format) on a
//! blocking thread.

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use rusqlite::OptionalExtension;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;

use crate::auth::jwt::issue_access_token;
use crate::auth::middleware::Claims;
use crate::state::AppState;

/// Uniform 401 body for unknown email and wrong password alike, so login
/// responses do not reveal which accounts exist.
const INVALID_CREDENTIALS: &str = "Invalid credentials";

const MIN_PASSWORD_CHARS: usize = 6;

// --- Request / response types ---

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub password: SecretString,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    pub password: SecretString,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

// --- Handlers ---

/// POST /api/auth/register — Create an account and return a token.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), (StatusCode, String)> {
    let name = req.name.trim().to_string();
    let email = normalize_email(&req.email);

    if name.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Name is required".to_string()));
    }
    validate_email(&email)?;
    if req.password.expose_secret().chars().count() < MIN_PASSWORD_CHARS {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Password must be at least {MIN_PASSWORD_CHARS} characters"),
        ));
    }

    let password = req.password.expose_secret().to_string();
    let password_hash = tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
    })
    .await
    .map_err(|_| internal())?
    .map_err(|_| internal())?;

    let user_id = Uuid::new_v4().to_string();
    let created_at = Utc::now().to_rfc3339();

    let db = state.db.clone();
    {
        let user_id = user_id.clone();
        let name = name.clone();
        let email = email.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.lock().map_err(|_| internal())?;
            conn.execute(
                "INSERT INTO users (id, name, email, password_hash, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![user_id, name, email, password_hash, created_at],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(err, _)
                    if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    (StatusCode::BAD_REQUEST, "Email already registered".to_string())
                }
                _ => internal(),
            })?;
            Ok::<_, (StatusCode, String)>(())
        })
        .await
        .map_err(|_| internal())??;
    }

    let token = issue_access_token(&state.jwt_secret, &user_id, &email, state.token_ttl_hours)
        .map_err(|_| internal())?;

    tracing::info!(user_id = %user_id, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: UserResponse {
                id: user_id,
                name,
                email,
            },
        }),
    ))
}

/// POST /api/auth/login — Verify credentials and return a token.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let email = normalize_email(&req.email);

    let db = state.db.clone();
    let row = {
        let email = email.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.lock().map_err(|_| internal())?;
            let row: Option<(String, String, String)> = conn
                .query_row(
                    "SELECT id, name, password_hash FROM users WHERE email = ?1",
                    [&email],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()
                .map_err(|_| internal())?;
            Ok::<_, (StatusCode, String)>(row)
        })
        .await
        .map_err(|_| internal())??
    };

    let Some((user_id, name, password_hash)) = row else {
        return Err((StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS.to_string()));
    };

    let password = req.password.expose_secret().to_string();
    let verified = tokio::task::spawn_blocking(move || {
        PasswordHash::new(&password_hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    })
    .await
    .map_err(|_| internal())?;

    if !verified {
        return Err((StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS.to_string()));
    }

    let token = issue_access_token(&state.jwt_secret, &user_id, &email, state.token_ttl_hours)
        .map_err(|_| internal())?;

    Ok(Json(AuthResponse {
        token,
        user: UserResponse {
            id: user_id,
            name,
            email,
        },
    }))
}

/// GET /api/auth/me — Return the authenticated user's profile.
pub async fn me(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<UserResponse>, (StatusCode, String)> {
    let db = state.db.clone();
    let user_id = claims.sub.clone();
    let row = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| internal())?;
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT name, email FROM users WHERE id = ?1",
                [&user_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|_| internal())?;
        Ok::<_, (StatusCode, String)>(row)
    })
    .await
    .map_err(|_| internal())??;

    let Some((name, email)) = row else {
        return Err((StatusCode::NOT_FOUND, "User not found".to_string()));
    };

    Ok(Json(UserResponse {
        id: claims.sub,
        name,
        email,
    }))
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

fn validate_email(email: &str) -> Result<(), (StatusCode, String)> {
    let well_formed = email.len() <= 254
        && email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !well_formed {
        return Err((StatusCode::BAD_REQUEST, "A valid email is required".to_string()));
    }
    Ok(())
}

fn internal() -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}
