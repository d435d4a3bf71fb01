use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};

use crate::auth::middleware::JwtSecret;
use crate::state::AppState;
use crate::{auth, metrics, notes};

/// Inject the JWT secret into request extensions so the Claims extractor
/// can find it.
async fn inject_jwt_secret(
    axum::extract::State(state): axum::extract::State<AppState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: middleware::Next,
) -> axum::response::Response {
    req.extensions_mut()
        .insert(JwtSecret(state.jwt_secret.clone()));
    next.run(req).await
}

/// Build the full axum Router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    // Multipart boundaries and the text fields ride along with the file,
    // so the transport limit sits a little above the attachment bound;
    // the exact per-file check lives in the form parser.
    let body_limit = state.limits.max_upload_bytes + 64 * 1024;

    // Liveness, readiness, and Prometheus metrics
    let ops_routes = Router::new()
        .route("/healthz", get(metrics::healthz_handler))
        .route("/readyz", get(metrics::readyz_handler))
        .route("/metrics", get(metrics::metrics_handler));

    let auth_routes = Router::new()
        .route("/api/auth/register", post(auth::handlers::register))
        .route("/api/auth/login", post(auth::handlers::login))
        .route("/api/auth/me", get(auth::handlers::me));

    // Note routes (JWT required — Claims extractor validates the token)
    let note_routes = Router::new()
        .route(
            "/api/notes",
            get(notes::handlers::list_notes).post(notes::handlers::create_note),
        )
        .route(
            "/api/notes/{id}",
            get(notes::handlers::get_note)
                .put(notes::handlers::update_note)
                .delete(notes::handlers::delete_note),
        )
        .route(
            "/api/notes/{id}/file",
            get(notes::files::download_file).delete(notes::files::delete_file),
        )
        .layer(DefaultBodyLimit::max(body_limit));

    Router::new()
        .merge(ops_routes)
        .merge(auth_routes)
        .merge(note_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            inject_jwt_secret,
        ))
        .with_state(state)
}
