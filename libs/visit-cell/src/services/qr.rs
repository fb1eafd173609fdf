use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::models::{Visit, VisitError};

/// Envelope carried inside the booking QR code. Image rendering and
/// scanning happen client-side; this codec only owns the payload text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrPayload {
    pub uid: String,
    pub visit_id: Uuid,
    pub clinic_code: String,
    pub timestamp: DateTime<Utc>,
}

/// Result of reading a scanned payload: the uid always, the visit id only
/// when the JSON envelope parsed cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedScan {
    pub uid: String,
    pub visit_id: Option<Uuid>,
}

pub struct QrCodec {
    clinic_code: String,
}

impl QrCodec {
    pub fn new(clinic_code: &str) -> Self {
        Self {
            clinic_code: clinic_code.to_string(),
        }
    }

    pub fn encode(&self, visit: &Visit) -> Result<String, VisitError> {
        let payload = QrPayload {
            uid: visit.uid.clone(),
            visit_id: visit.id,
            clinic_code: self.clinic_code.clone(),
            timestamp: Utc::now(),
        };

        serde_json::to_string(&payload)
            .map_err(|e| VisitError::InvalidQrPayload(format!("Failed to encode payload: {}", e)))
    }

    /// Decode a scanned payload. A clean JSON envelope with a matching
    /// clinic code yields uid + visit id; anything else falls back to
    /// pulling an `XC-NNN` pattern out of the raw text.
    pub fn decode(&self, scanned: &str) -> Result<DecodedScan, VisitError> {
        if let Ok(payload) = serde_json::from_str::<QrPayload>(scanned) {
            if payload.clinic_code == self.clinic_code {
                return Ok(DecodedScan {
                    uid: payload.uid,
                    visit_id: Some(payload.visit_id),
                });
            }
            debug!(
                "QR clinic code mismatch ({}), falling back to pattern scan",
                payload.clinic_code
            );
        }

        self.extract_uid(scanned)
            .map(|uid| DecodedScan { uid, visit_id: None })
            .ok_or_else(|| {
                VisitError::InvalidQrPayload("No booking identifier in scanned text".to_string())
            })
    }

    fn extract_uid(&self, text: &str) -> Option<String> {
        // Compiled per call; check-in scans are infrequent
        let pattern = Regex::new(r"XC-\d{3,}").ok()?;
        pattern.find(text).map(|m| m.as_str().to_string())
    }
}
