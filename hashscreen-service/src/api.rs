//! HTTP surface of the screening service.

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use hashscreen_core::envelope::EnvelopeKey;

use crate::services::key_material::KeyMaterial;
use crate::services::text_filter::TextFilter;

pub(crate) mod artifacts;
pub(crate) mod errors;
pub(crate) mod image;
pub(crate) mod scan;

/// Everything the routes need; cloned into the handler closures.
pub(crate) struct ApiArgs {
    pub(crate) key_material: KeyMaterial,
    pub(crate) envelope_key: EnvelopeKey,
    pub(crate) text_filter: Arc<TextFilter>,
    pub(crate) artifact_dir: PathBuf,
}

/// Builds the full router: the two scan endpoints under `/api` and the
/// static artifacts at the site root.
pub(crate) fn routes(args: ApiArgs) -> Router {
    let ApiArgs {
        key_material,
        envelope_key,
        text_filter,
        artifact_dir,
    } = args;
    Router::new()
        .merge(artifacts::routes(key_material.clone(), artifact_dir))
        .nest(
            "/api",
            Router::new()
                .merge(scan::routes(scan::TextScanArgs {
                    text_filter,
                    envelope_key: envelope_key.clone(),
                }))
                .merge(image::routes(image::ImageScanArgs {
                    key_material,
                    envelope_key,
                })),
        )
}
