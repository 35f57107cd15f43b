//! `POST /api/scan` — keyword scanning of user text.

use std::sync::Arc;

use axum::routing::post;
use axum::{Json, Router};
use hashscreen_core::envelope::{Envelope, EnvelopeKey};
use hashscreen_types::api::v1::{TextScanOutcome, TextScanRequest};
use tracing::instrument;

use crate::api::errors::Error;
use crate::metrics::METRICS_ID_TEXT_SCANS;
use crate::services::text_filter::TextFilter;

pub(crate) struct TextScanArgs {
    pub(crate) text_filter: Arc<TextFilter>,
    pub(crate) envelope_key: EnvelopeKey,
}

/// Creates a `Router` with the `/scan` route.
pub(crate) fn routes(args: TextScanArgs) -> Router {
    let TextScanArgs {
        text_filter,
        envelope_key,
    } = args;
    Router::new().route(
        "/scan",
        post(move |request: Json<TextScanRequest>| {
            scan_text(text_filter.clone(), envelope_key.clone(), request)
        }),
    )
}

/// Runs the keyword filter and wraps the outcome in a response envelope.
#[instrument(level = "debug", skip_all)]
async fn scan_text(
    text_filter: Arc<TextFilter>,
    envelope_key: EnvelopeKey,
    Json(request): Json<TextScanRequest>,
) -> Result<Json<Envelope<TextScanOutcome>>, Error> {
    let verdict = text_filter.scan(&request.text);
    tracing::debug!("text scan verdict: {verdict:?}");
    ::metrics::counter!(METRICS_ID_TEXT_SCANS).increment(1);
    let envelope = envelope_key.wrap(TextScanOutcome::from(verdict))?;
    Ok(Json(envelope))
}
