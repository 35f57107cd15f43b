//! Offline generator for the published database artifacts.
//!
//! Reads a raw list of known-bad perceptual hashes, evaluates each under the
//! server's OPRF key and writes the three artifacts the client verifies
//! against: `evaluated_phashes.json`, `database_signature.json` and
//! `server_key_commitment.json`. Run wherever the secrets live; the raw
//! perceptual hashes never appear in the published output.

use std::path::PathBuf;

use clap::Parser;
use eyre::Context as _;
use hashscreen_core::curve;
use hashscreen_core::manifest::ManifestKey;
use hashscreen_core::matcher::DbEntry;
use hashscreen_core::oprf::server::OprfKey;
use hashscreen_core::phash::PHash;
use hashscreen_core::time::epoch_ms;
use hashscreen_types::KeyCommitment;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct DbGenConfig {
    /// The server's secret OPRF scalar as a base-10 string.
    #[clap(long, env = "SERVER_OPRF_KEY", hide_env_values = true)]
    oprf_key: SecretString,

    /// The HMAC key signing the database manifest.
    ///
    /// The default is a development placeholder; deployments must supply a
    /// real secret.
    #[clap(
        long,
        env = "DB_SIGNING_KEY",
        hide_env_values = true,
        default_value = "dev-db-signing-key-do-not-deploy"
    )]
    db_signing_key: SecretString,

    /// Path to the raw database: a JSON array of
    /// `{"file": id, "phash": 16-hex-chars}` entries.
    #[clap(long, env = "HASHSCREEN_RAW_DB")]
    input: PathBuf,

    /// Output directory for the generated artifacts.
    #[clap(long, env = "HASHSCREEN_ARTIFACT_DIR", default_value = "./eHashes")]
    out_dir: PathBuf,

    /// Version label written into the manifest and key commitment.
    #[clap(long, env = "HASHSCREEN_KEY_VERSION", default_value = "1.0.0")]
    version: String,
}

/// One raw entry before evaluation.
#[derive(Debug, Deserialize)]
struct RawEntry {
    file: String,
    phash: PHash,
}

fn main() -> eyre::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("hashscreen=debug,info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = DbGenConfig::parse();
    let key = OprfKey::from_decimal(config.oprf_key.expose_secret())
        .map_err(|err| eyre::eyre!("SERVER_OPRF_KEY is not a usable scalar: {err}"))?;

    tracing::info!("reading raw database from {}", config.input.display());
    let raw = std::fs::read(&config.input).context("while reading raw database")?;
    let raw_entries: Vec<RawEntry> =
        serde_json::from_slice(&raw).context("while parsing raw database")?;
    tracing::info!("evaluating {} entries..", raw_entries.len());

    let entries: Vec<DbEntry> = raw_entries
        .into_iter()
        .map(|entry| DbEntry {
            file: entry.file,
            phash: key.evaluate_unblinded(&entry.phash).to_hex(),
        })
        .collect();

    let db_bytes = serde_json::to_vec(&entries).context("while serializing database")?;
    let manifest =
        ManifestKey::new(config.db_signing_key.expose_secret().as_bytes())
            .sign(&db_bytes, &config.version);
    let commitment = KeyCommitment {
        public_key: curve::encode_point(&key.public_key()),
        timestamp: epoch_ms(),
        version: config.version.clone(),
    };

    std::fs::create_dir_all(&config.out_dir).context("while creating output directory")?;
    let db_path = config.out_dir.join("evaluated_phashes.json");
    let manifest_path = config.out_dir.join("database_signature.json");
    let commitment_path = config.out_dir.join("server_key_commitment.json");

    std::fs::write(&db_path, &db_bytes).context("while writing database")?;
    std::fs::write(&manifest_path, serde_json::to_vec(&manifest)?)
        .context("while writing manifest")?;
    std::fs::write(&commitment_path, serde_json::to_vec(&commitment)?)
        .context("while writing key commitment")?;

    tracing::info!(
        "wrote {}, {} and {}",
        db_path.display(),
        manifest_path.display(),
        commitment_path.display()
    );
    Ok(())
}
