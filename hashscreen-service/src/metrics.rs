//! Metrics definitions for the screening service.
//!
//! This module defines all metrics keys used by the service and provides a
//! helper [`describe_metrics`] to set metadata for each metric using the
//! `metrics` crate.

/// Metrics key for counting text scans, by status.
pub const METRICS_ID_TEXT_SCANS: &str = "hashscreen.service.scan.text";
/// Metrics key for counting successful blinded evaluations.
pub const METRICS_ID_IMAGE_EVALS: &str = "hashscreen.service.scan.image";
/// Metrics key for rejected blinded points.
pub const METRICS_ID_BAD_POINTS: &str = "hashscreen.service.scan.image.bad_point";
/// Metrics key for the duration of a blinded evaluation including the proof.
pub const METRICS_ID_IMAGE_EVAL_DURATION: &str = "hashscreen.service.scan.image.duration";

/// Describe all metrics used by the service.
///
/// This calls the `describe_*` functions from the `metrics` crate to set
/// metadata on the different metrics.
pub fn describe_metrics() {
    metrics::describe_counter!(
        METRICS_ID_TEXT_SCANS,
        metrics::Unit::Count,
        "Number of text scans served"
    );

    metrics::describe_counter!(
        METRICS_ID_IMAGE_EVALS,
        metrics::Unit::Count,
        "Number of blinded OPRF evaluations served"
    );

    metrics::describe_counter!(
        METRICS_ID_BAD_POINTS,
        metrics::Unit::Count,
        "Number of requests rejected because the blinded point did not decode"
    );

    metrics::describe_histogram!(
        METRICS_ID_IMAGE_EVAL_DURATION,
        metrics::Unit::Milliseconds,
        "Duration of one blinded evaluation including proof generation"
    );
}
