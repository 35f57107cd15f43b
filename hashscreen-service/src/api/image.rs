//! `POST /api/scan/image` — blinded OPRF evaluation with a DLEQ proof.
//!
//! The server never sees the image or its perceptual hash: the request
//! carries only the blinded point `P' = r·H(p)`. Evaluation is stateless
//! apart from the immutable key material; concurrent requests share nothing
//! else.

use std::time::Instant;

use axum::extract::Multipart;
use axum::routing::post;
use axum::{Json, Router};
use hashscreen_core::dleq;
use hashscreen_core::envelope::{Envelope, EnvelopeKey};
use hashscreen_core::oprf::BlindedQuery;
use hashscreen_types::api::v1::ImageEvalResponse;
use tracing::instrument;

use crate::api::errors::Error;
use crate::metrics::{METRICS_ID_IMAGE_EVALS, METRICS_ID_IMAGE_EVAL_DURATION};
use crate::services::key_material::KeyMaterial;

/// Name of the multipart form field carrying the blinded point.
const BLINDED_POINT_FIELD: &str = "blindedPoint";

#[derive(Clone)]
pub(crate) struct ImageScanArgs {
    pub(crate) key_material: KeyMaterial,
    pub(crate) envelope_key: EnvelopeKey,
}

/// Creates a `Router` with the `/scan/image` route.
pub(crate) fn routes(args: ImageScanArgs) -> Router {
    Router::new().route(
        "/scan/image",
        post(move |multipart: Multipart| evaluate_blinded(args.clone(), multipart)),
    )
}

/// Evaluates the blinded point under the server key and proves the
/// evaluation against the published commitment.
///
/// Undecodable points are rejected with `400` before any evaluation
/// happens.
#[instrument(level = "debug", skip_all)]
async fn evaluate_blinded(
    args: ImageScanArgs,
    mut multipart: Multipart,
) -> Result<Json<Envelope<ImageEvalResponse>>, Error> {
    let start = Instant::now();

    let mut blinded_hex = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(BLINDED_POINT_FIELD) {
            blinded_hex = Some(field.text().await?);
            break;
        }
    }
    let blinded_hex = blinded_hex.ok_or(Error::MissingBlindedPoint)?;
    let blinded = BlindedQuery::from_hex(blinded_hex.trim())?;

    let (evaluated, proof) =
        dleq::evaluate_with_proof(args.key_material.key(), &blinded, &mut rand::thread_rng());
    let envelope = args.envelope_key.wrap(ImageEvalResponse {
        evaluated_point: evaluated,
        proof,
    })?;

    ::metrics::counter!(METRICS_ID_IMAGE_EVALS).increment(1);
    ::metrics::histogram!(METRICS_ID_IMAGE_EVAL_DURATION)
        .record(start.elapsed().as_millis() as f64);
    Ok(Json(envelope))
}
