#![deny(missing_docs)]
//! Screening server for privacy-preserving perceptual-hash membership tests.
//!
//! The server holds a single OPRF secret `k`, loaded from the environment at
//! startup and immutable afterwards. Per request it decodes the blinded
//! point, evaluates `k·P'`, attaches a Chaum-Pedersen proof of correct
//! evaluation against the published commitment, and wraps the response in a
//! keyed MAC envelope. It keeps no per-client state; concurrent requests
//! share only the immutable key material.
//!
//! Alongside the cryptographic endpoint the server offers a keyword scan for
//! text and publishes the static artifacts clients verify against: the key
//! commitment and the signed evaluated-hash database.
//!
//! [`ScreeningService::init`] performs the startup sequence (secret
//! resolution, key material, keyword filter compilation) and
//! [`ScreeningService::router`] returns the `axum::Router` to serve.

use std::sync::Arc;

use eyre::Context as _;
use hashscreen_core::envelope::EnvelopeKey;
use secrecy::ExposeSecret as _;
use tower_http::trace::TraceLayer;

use crate::config::ServiceConfig;
use crate::services::key_material::KeyMaterial;
use crate::services::text_filter::TextFilter;

pub(crate) mod api;
pub mod config;
pub mod metrics;
pub(crate) mod services;

/// The initialized screening service.
pub struct ScreeningService {
    router: axum::Router,
}

impl ScreeningService {
    /// Initializes the service from its configuration.
    ///
    /// Resolves the secrets (refusing development placeholders outside the
    /// `dev` environment), loads the OPRF key material and precomputes the
    /// public commitment, and compiles the keyword filter.
    pub fn init(config: &ServiceConfig) -> eyre::Result<Self> {
        tracing::info!("loading OPRF key material..");
        let oprf_key = config.resolve_oprf_key()?;
        let key_material = KeyMaterial::from_secret(&oprf_key, &config.key_version)
            .context("while loading key material")?;
        tracing::info!(
            "serving commitment {}",
            key_material.commitment().public_key
        );

        let mac_secret = config.resolve_mac_secret()?;
        let envelope_key = EnvelopeKey::new(mac_secret.expose_secret().as_bytes());

        tracing::info!("compiling keyword filter..");
        let text_filter = Arc::new(
            TextFilter::new(&config.block_keywords, &config.warn_keywords)
                .context("while compiling keyword lists")?,
        );

        let router = api::routes(api::ApiArgs {
            key_material,
            envelope_key,
            text_filter,
            artifact_dir: config.artifact_dir.clone(),
        })
        .layer(TraceLayer::new_for_http());

        Ok(Self { router })
    }

    /// Returns the router to serve.
    pub fn router(self) -> axum::Router {
        self.router
    }
}
