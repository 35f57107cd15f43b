//! Errors of the scan endpoints and their HTTP mapping.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hashscreen_core::curve::CurveError;
use hashscreen_core::envelope::EnvelopeError;

use crate::metrics::METRICS_ID_BAD_POINTS;

/// All errors that may occur while serving a scan request.
#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    /// The submitted blinded point did not decode to a usable curve point.
    #[error("blinded point rejected: {0}")]
    BadPoint(#[from] CurveError),
    /// The multipart form did not carry a `blindedPoint` field.
    #[error("missing multipart field `blindedPoint`")]
    MissingBlindedPoint,
    /// The multipart body could not be read.
    #[error(transparent)]
    Multipart(#[from] MultipartError),
    /// The response payload could not be wrapped.
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        tracing::debug!("{self:?}");
        match self {
            Error::BadPoint(_) => {
                ::metrics::counter!(METRICS_ID_BAD_POINTS).increment(1);
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            Error::MissingBlindedPoint | Error::Multipart(_) => {
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            Error::Envelope(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_owned()).into_response()
            }
        }
    }
}
