//! Integration suite driving the HTTP surface of the screening service.

use std::path::PathBuf;

use axum::http::StatusCode;
use axum_test::multipart::MultipartForm;
use axum_test::TestServer;
use hashscreen_core::envelope::{Envelope, EnvelopeKey};
use hashscreen_core::manifest::ManifestKey;
use hashscreen_core::matcher::DbEntry;
use hashscreen_core::oprf::{client, server::OprfKey};
use hashscreen_core::phash::PHash;
use hashscreen_service::config::{Environment, ServiceConfig};
use hashscreen_service::ScreeningService;
use hashscreen_types::api::v1::{ImageEvalResponse, ScanStatus, TextScanOutcome};
use hashscreen_types::KeyCommitment;
use secrecy::SecretString;

const TEST_OPRF_KEY: &str = "123456789123456789123456789";
const TEST_MAC_SECRET: &str = "test-mac-secret";
const TEST_DB_SIGNING_KEY: &str = "test-db-signing-key";

fn artifact_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("hashscreen-suite-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("can create artifact dir");
    dir
}

fn server_key() -> OprfKey {
    OprfKey::from_decimal(TEST_OPRF_KEY).expect("test key is usable")
}

fn envelope_key() -> EnvelopeKey {
    EnvelopeKey::new(TEST_MAC_SECRET)
}

fn write_artifacts(dir: &PathBuf) -> Vec<DbEntry> {
    let key = server_key();
    let entries = vec![DbEntry {
        file: "img-001".to_owned(),
        phash: key
            .evaluate_unblinded(&"fffefcf8f0e0c080".parse::<PHash>().unwrap())
            .to_hex(),
    }];
    let db_bytes = serde_json::to_vec(&entries).unwrap();
    let manifest = ManifestKey::new(TEST_DB_SIGNING_KEY).sign(&db_bytes, "1.0.0");
    std::fs::write(dir.join("evaluated_phashes.json"), &db_bytes).unwrap();
    std::fs::write(
        dir.join("database_signature.json"),
        serde_json::to_vec(&manifest).unwrap(),
    )
    .unwrap();
    entries
}

fn test_server() -> TestServer {
    let config = ServiceConfig {
        environment: Environment::Prod,
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        oprf_key: Some(SecretString::from(TEST_OPRF_KEY)),
        mac_secret: Some(SecretString::from(TEST_MAC_SECRET)),
        artifact_dir: artifact_dir(),
        key_version: "1.0.0".to_owned(),
        block_keywords: vec!["forbidden".to_owned()],
        warn_keywords: vec!["suspicious".to_owned()],
    };
    let service = ScreeningService::init(&config).expect("service initializes");
    TestServer::new(service.router()).expect("test server builds")
}

#[tokio::test]
async fn text_scan_statuses() {
    let server = test_server();

    let cases = [
        ("nothing to see here", ScanStatus::Safe),
        ("a bit suspicious maybe", ScanStatus::Warning),
        ("clearly FORBIDDEN material", ScanStatus::Blocked),
    ];
    for (text, expected) in cases {
        let response = server
            .post("/api/scan")
            .json(&serde_json::json!({"text": text}))
            .await;
        response.assert_status_ok();
        let envelope: Envelope<TextScanOutcome> = response.json();
        let outcome = envelope_key().open(envelope).expect("envelope opens");
        assert_eq!(outcome.status, expected, "text: {text}");
    }
}

#[tokio::test]
async fn text_scan_envelope_is_tamper_evident() {
    let server = test_server();
    let response = server
        .post("/api/scan")
        .json(&serde_json::json!({"text": "hello"}))
        .await;
    let mut envelope: Envelope<TextScanOutcome> = response.json();

    // Flip the last nibble of the MAC.
    let last = envelope.mac.pop().unwrap();
    envelope.mac.push(if last == '0' { '1' } else { '0' });
    assert!(envelope_key().open(envelope).is_err());
}

#[tokio::test]
async fn blinded_evaluation_roundtrip() {
    let server = test_server();
    let mut rng = rand::thread_rng();
    let key = server_key();
    let phash: PHash = "fffefcf8f0e0c080".parse().unwrap();
    let (blinded, factor) = client::blind(&phash, &mut rng);

    let response = server
        .post("/api/scan/image")
        .multipart(MultipartForm::new().add_text("blindedPoint", blinded.to_hex()))
        .await;
    response.assert_status_ok();
    let envelope: Envelope<ImageEvalResponse> = response.json();
    let payload = envelope_key().open(envelope).expect("envelope opens");

    payload
        .proof
        .verify(&key.public_key(), &blinded, &payload.evaluated_point)
        .expect("proof verifies against the commitment");

    let token = client::unblind(payload.evaluated_point, factor);
    assert_eq!(token, key.evaluate_unblinded(&phash));
}

#[tokio::test]
async fn bad_blinded_point_is_rejected() {
    let server = test_server();

    let response = server
        .post("/api/scan/image")
        .multipart(MultipartForm::new().add_text("blindedPoint", "not-a-point"))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    // The SEC1 identity encoding is also refused.
    let response = server
        .post("/api/scan/image")
        .multipart(MultipartForm::new().add_text("blindedPoint", "00".repeat(33)))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_blinded_point_field_is_rejected() {
    let server = test_server();
    let response = server
        .post("/api/scan/image")
        .multipart(MultipartForm::new().add_text("unrelated", "zz"))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn key_commitment_is_published() {
    let server = test_server();
    let response = server.get("/server_key_commitment.json").await;
    response.assert_status_ok();
    let commitment: KeyCommitment = response.json();
    assert_eq!(
        commitment.public_key,
        hashscreen_core::curve::encode_point(&server_key().public_key())
    );
    assert_eq!(commitment.version, "1.0.0");
}

#[tokio::test]
async fn database_artifacts_are_served_and_verifiable() {
    let dir = artifact_dir();
    let entries = write_artifacts(&dir);
    let server = test_server();

    let db_response = server.get("/eHashes/evaluated_phashes.json").await;
    db_response.assert_status_ok();
    let db_bytes = db_response.as_bytes().to_vec();
    let served: Vec<DbEntry> = serde_json::from_slice(&db_bytes).unwrap();
    assert_eq!(served, entries);

    let manifest_response = server.get("/eHashes/database_signature.json").await;
    manifest_response.assert_status_ok();
    let manifest: hashscreen_core::manifest::DbManifest =
        serde_json::from_slice(manifest_response.as_bytes()).unwrap();
    ManifestKey::new(TEST_DB_SIGNING_KEY)
        .verify(&db_bytes, &manifest)
        .expect("served database verifies against served manifest");
}
