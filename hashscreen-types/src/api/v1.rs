//! # v1 API types
//!
//! Data transfer objects for the two scan endpoints. Every response body is
//! an [`Envelope`](hashscreen_core::envelope::Envelope) around one of the
//! payloads defined here; field names are part of the wire contract and
//! must not drift.

use hashscreen_core::dleq::DleqProof;
use hashscreen_core::oprf::EvaluatedQuery;
use serde::{Deserialize, Serialize};

use crate::ScanVerdict;

/// Request body of `POST /api/scan`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextScanRequest {
    /// The text to scan.
    pub text: String,
}

/// Status of a text scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    /// No keyword matched.
    Safe,
    /// A warning-list keyword matched.
    Warning,
    /// A blocking-list keyword matched.
    Blocked,
}

/// Detail section of a text scan response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanDetail {
    /// Severity label: `none`, `medium` or `high`.
    pub severity: String,
    /// Human-readable explanation, present unless safe.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// The keyword that matched, present unless safe.
    #[serde(rename = "matchedKeyword", skip_serializing_if = "Option::is_none")]
    pub matched_keyword: Option<String>,
}

/// Payload wrapped in the envelope of a `POST /api/scan` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextScanOutcome {
    /// The scan status.
    pub status: ScanStatus,
    /// Severity and match details.
    pub detail: ScanDetail,
}

/// Payload wrapped in the envelope of a `POST /api/scan/image` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageEvalResponse {
    /// The server-evaluated point `k·P'`, compressed-SEC1 hex.
    #[serde(rename = "evaluatedPoint")]
    pub evaluated_point: EvaluatedQuery,
    /// Proof that the evaluation used the committed key.
    pub proof: DleqProof,
}

impl From<ScanVerdict> for TextScanOutcome {
    fn from(verdict: ScanVerdict) -> Self {
        match verdict {
            ScanVerdict::Safe => TextScanOutcome {
                status: ScanStatus::Safe,
                detail: ScanDetail {
                    severity: "none".to_owned(),
                    reason: None,
                    matched_keyword: None,
                },
            },
            ScanVerdict::Warning { reason, keyword } => TextScanOutcome {
                status: ScanStatus::Warning,
                detail: ScanDetail {
                    severity: "medium".to_owned(),
                    reason: Some(reason),
                    matched_keyword: Some(keyword),
                },
            },
            ScanVerdict::Blocked { reason, keyword } => TextScanOutcome {
                status: ScanStatus::Blocked,
                detail: ScanDetail {
                    severity: "high".to_owned(),
                    reason: Some(reason),
                    matched_keyword: Some(keyword),
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use hashscreen_core::dleq;
    use hashscreen_core::oprf::{client, server::OprfKey};
    use hashscreen_core::phash::PHash;

    use crate::ScanVerdict;

    use super::*;

    #[test]
    fn text_outcome_wire_shape() {
        let outcome = TextScanOutcome::from(ScanVerdict::Blocked {
            reason: "contains a blocked keyword".to_owned(),
            keyword: "forbidden".to_owned(),
        });
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "status": "blocked",
                "detail": {
                    "severity": "high",
                    "reason": "contains a blocked keyword",
                    "matchedKeyword": "forbidden",
                }
            })
        );
    }

    #[test]
    fn safe_outcome_omits_optional_fields() {
        let json = serde_json::to_value(TextScanOutcome::from(ScanVerdict::Safe)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"status": "safe", "detail": {"severity": "none"}})
        );
    }

    #[test]
    fn image_response_wire_shape() {
        let mut rng = rand::thread_rng();
        let key = OprfKey::random(&mut rng);
        let phash: PHash = "fffefcf8f0e0c080".parse().unwrap();
        let (blinded, _factor) = client::blind(&phash, &mut rng);
        let (evaluated, proof) = dleq::evaluate_with_proof(&key, &blinded, &mut rng);

        let response = ImageEvalResponse {
            evaluated_point: evaluated,
            proof,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("evaluatedPoint").is_some());
        let proof_json = json.get("proof").unwrap();
        assert!(proof_json.get("challenge").is_some());
        assert!(proof_json.get("response").is_some());
        assert!(
            proof_json
                .get("commitment")
                .and_then(|c| c.as_str())
                .is_some_and(|c| c.split('|').count() == 2)
        );

        let parsed: ImageEvalResponse = serde_json::from_value(json).unwrap();
        parsed
            .proof
            .verify(&key.public_key(), &blinded, &parsed.evaluated_point)
            .unwrap();
    }
}
