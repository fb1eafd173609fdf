use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{CreatePrescriptionRequest, Prescription, PrescriptionError};

pub struct PrescriptionService {
    supabase: SupabaseClient,
}

impl PrescriptionService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Issue a prescription for a visit and back-link it on the visit row.
    /// The visit must have reached consultation.
    pub async fn create_prescription(
        &self,
        request: CreatePrescriptionRequest,
        auth_token: &str,
    ) -> Result<Prescription, PrescriptionError> {
        if request.medication_text.trim().is_empty() {
            return Err(PrescriptionError::ValidationError(
                "Medication text is required".to_string(),
            ));
        }

        let visit_path = format!(
            "/rest/v1/visits?id=eq.{}&select=id,visit_status",
            request.visit_id
        );
        let visits: Vec<Value> = self
            .supabase
            .request(Method::GET, &visit_path, Some(auth_token), None)
            .await
            .map_err(|e| PrescriptionError::DatabaseError(e.to_string()))?;

        let visit = visits.first().ok_or(PrescriptionError::VisitNotFound)?;
        let visit_status = visit["visit_status"].as_str().unwrap_or_default();
        if visit_status != "in_consultation" && visit_status != "completed" {
            return Err(PrescriptionError::VisitNotConsulted);
        }

        let now = Utc::now();
        let prescription_data = json!({
            "visit_id": request.visit_id,
            "medication_text": request.medication_text,
            "file_url": request.file_url,
            "notes": request.notes,
            "issued_at": now.to_rfc3339(),
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339(),
        });

        let result = self
            .supabase
            .insert("prescriptions", Some(auth_token), prescription_data)
            .await
            .map_err(|e| PrescriptionError::DatabaseError(e.to_string()))?;

        let row = result.into_iter().next().ok_or_else(|| {
            PrescriptionError::DatabaseError("Failed to create prescription".to_string())
        })?;
        let prescription: Prescription = serde_json::from_value(row).map_err(|e| {
            PrescriptionError::DatabaseError(format!("Failed to parse prescription: {}", e))
        })?;

        // Back-link so the tracking page sees the prescription without a join
        let backlink = json!({
            "prescription_id": prescription.id,
            "prescription_url": prescription.file_url,
            "prescription_notes": prescription.notes,
            "updated_at": now.to_rfc3339(),
        });
        self.supabase
            .patch(
                "visits",
                &format!("id=eq.{}", request.visit_id),
                Some(auth_token),
                backlink,
            )
            .await
            .map_err(|e| PrescriptionError::DatabaseError(e.to_string()))?;

        info!(
            "Prescription {} issued for visit {}",
            prescription.id, request.visit_id
        );
        Ok(prescription)
    }

    /// Patient-facing lookup: resolve the booking uid to its visit, then
    /// the prescription.
    pub async fn get_by_visit_uid(&self, uid: &str) -> Result<Prescription, PrescriptionError> {
        debug!("Fetching prescription for visit uid {}", uid);

        let visit_path = format!(
            "/rest/v1/visits?uid=eq.{}&select=id",
            urlencoding::encode(uid)
        );
        let visits: Vec<Value> = self
            .supabase
            .request(Method::GET, &visit_path, None, None)
            .await
            .map_err(|e| PrescriptionError::DatabaseError(e.to_string()))?;

        let visit_id = visits
            .first()
            .and_then(|v| v["id"].as_str())
            .and_then(|id| Uuid::parse_str(id).ok())
            .ok_or(PrescriptionError::VisitNotFound)?;

        let path = format!("/rest/v1/prescriptions?visit_id=eq.{}&limit=1", visit_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| PrescriptionError::DatabaseError(e.to_string()))?;

        let row = result.into_iter().next().ok_or(PrescriptionError::NotFound)?;

        serde_json::from_value(row).map_err(|e| {
            PrescriptionError::DatabaseError(format!("Failed to parse prescription: {}", e))
        })
    }
}
