//! Configuration and CLI/environment parsing for the screening service.
//!
//! Secrets arrive through the environment (`SERVER_OPRF_KEY`, `MAC_SECRET`)
//! and are held as [`SecretString`]s. Development placeholders exist so the
//! service can be run locally without provisioning, but they are refused
//! outside the `dev` environment: production startup fails unless real
//! secrets are supplied.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use secrecy::{ExposeSecret, SecretString};

/// The environment the service is running in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Environment {
    /// Production environment. Placeholder secrets are refused.
    Prod,
    /// Development environment.
    Dev,
}

/// Placeholder OPRF key (decimal scalar) for development runs only.
const DEV_OPRF_KEY: &str = "271828182845904523536028747135266249775724709369995";

/// Placeholder MAC secret for development runs only.
const DEV_MAC_SECRET: &str = "dev-mac-secret-do-not-deploy";

/// The configuration of the screening service.
///
/// It can be configured via environment variables or command line arguments
/// using `clap`.
#[derive(Parser, Debug)]
pub struct ServiceConfig {
    /// The environment of the service (either `prod` or `dev`).
    #[clap(long, env = "HASHSCREEN_ENVIRONMENT", default_value = "prod")]
    pub environment: Environment,

    /// The socket address to bind the HTTP server to.
    #[clap(long, env = "HASHSCREEN_BIND_ADDR", default_value = "127.0.0.1:8080")]
    pub bind_addr: SocketAddr,

    /// The server's secret OPRF scalar as a base-10 string.
    ///
    /// Required in production; never logged and never sent anywhere. Only
    /// the commitment `k·G` is published.
    #[clap(long, env = "SERVER_OPRF_KEY", hide_env_values = true)]
    pub oprf_key: Option<SecretString>,

    /// The HMAC secret for response envelopes.
    #[clap(long, env = "MAC_SECRET", hide_env_values = true)]
    pub mac_secret: Option<SecretString>,

    /// Directory holding the published database artifacts
    /// (`evaluated_phashes.json`, `database_signature.json`).
    #[clap(long, env = "HASHSCREEN_ARTIFACT_DIR", default_value = "./eHashes")]
    pub artifact_dir: PathBuf,

    /// Version label published with the key commitment.
    #[clap(long, env = "HASHSCREEN_KEY_VERSION", default_value = "1.0.0")]
    pub key_version: String,

    /// Keywords whose presence blocks a text, comma separated.
    #[clap(
        long,
        env = "HASHSCREEN_BLOCK_KEYWORDS",
        value_delimiter = ',',
        default_value = "forbidden,prohibited"
    )]
    pub block_keywords: Vec<String>,

    /// Keywords whose presence flags a text with a warning, comma separated.
    #[clap(
        long,
        env = "HASHSCREEN_WARN_KEYWORDS",
        value_delimiter = ',',
        default_value = "suspicious,restricted"
    )]
    pub warn_keywords: Vec<String>,
}

impl ServiceConfig {
    /// Resolves the OPRF key secret, falling back to the development
    /// placeholder only in the `dev` environment.
    pub fn resolve_oprf_key(&self) -> eyre::Result<SecretString> {
        resolve_secret(
            self.environment,
            self.oprf_key.as_ref(),
            DEV_OPRF_KEY,
            "SERVER_OPRF_KEY",
        )
    }

    /// Resolves the envelope MAC secret, falling back to the development
    /// placeholder only in the `dev` environment.
    pub fn resolve_mac_secret(&self) -> eyre::Result<SecretString> {
        resolve_secret(
            self.environment,
            self.mac_secret.as_ref(),
            DEV_MAC_SECRET,
            "MAC_SECRET",
        )
    }
}

fn resolve_secret(
    environment: Environment,
    configured: Option<&SecretString>,
    dev_placeholder: &str,
    name: &str,
) -> eyre::Result<SecretString> {
    match configured {
        Some(secret) => {
            if environment == Environment::Prod
                && secret.expose_secret() == dev_placeholder
            {
                eyre::bail!("{name} is set to the development placeholder; refusing to start");
            }
            Ok(SecretString::from(secret.expose_secret()))
        }
        None => match environment {
            Environment::Prod => eyre::bail!("{name} is required in production"),
            Environment::Dev => {
                tracing::warn!("{name} not set, using development placeholder");
                Ok(SecretString::from(dev_placeholder))
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config(environment: Environment) -> ServiceConfig {
        ServiceConfig {
            environment,
            bind_addr: "127.0.0.1:8080".parse().unwrap(),
            oprf_key: None,
            mac_secret: None,
            artifact_dir: PathBuf::from("./eHashes"),
            key_version: "1.0.0".to_owned(),
            block_keywords: vec![],
            warn_keywords: vec![],
        }
    }

    #[test]
    fn production_requires_secrets() {
        let config = base_config(Environment::Prod);
        assert!(config.resolve_oprf_key().is_err());
        assert!(config.resolve_mac_secret().is_err());
    }

    #[test]
    fn production_refuses_placeholders() {
        let mut config = base_config(Environment::Prod);
        config.oprf_key = Some(SecretString::from(DEV_OPRF_KEY));
        assert!(config.resolve_oprf_key().is_err());
    }

    #[test]
    fn dev_falls_back_to_placeholders() {
        let config = base_config(Environment::Dev);
        assert_eq!(
            config.resolve_oprf_key().unwrap().expose_secret(),
            DEV_OPRF_KEY
        );
        assert_eq!(
            config.resolve_mac_secret().unwrap().expose_secret(),
            DEV_MAC_SECRET
        );
    }

    #[test]
    fn production_accepts_real_secrets() {
        let mut config = base_config(Environment::Prod);
        config.oprf_key = Some(SecretString::from("123456789123456789"));
        config.mac_secret = Some(SecretString::from("a-real-secret"));
        assert!(config.resolve_oprf_key().is_ok());
        assert!(config.resolve_mac_secret().is_ok());
    }
}
