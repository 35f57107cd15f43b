//! Static artifacts served from the site root.
//!
//! - `/server_key_commitment.json` — the published commitment `K = k·G`,
//!   rendered from the in-memory key material.
//! - `/eHashes/*` — the evaluated-hash database and its manifest, served
//!   from the configured artifact directory.
//!
//! All responses carry `Cache-Control: no-cache` so clients re-verify
//! against current artifacts.

use std::path::PathBuf;

use axum::http::{header, HeaderValue};
use axum::routing::get;
use axum::{Json, Router};
use hashscreen_types::KeyCommitment;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::services::key_material::KeyMaterial;

/// Creates a router serving the published artifacts.
pub(crate) fn routes(key_material: KeyMaterial, artifact_dir: PathBuf) -> Router {
    Router::new()
        .route(
            "/server_key_commitment.json",
            get(move || commitment(key_material.clone())),
        )
        .nest_service("/eHashes", ServeDir::new(artifact_dir))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache"),
        ))
}

/// Responds with the key commitment artifact.
async fn commitment(key_material: KeyMaterial) -> Json<KeyCommitment> {
    Json(key_material.commitment().clone())
}
