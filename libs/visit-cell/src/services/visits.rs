use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use reqwest::Method;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use settings_cell::services::settings::SettingsService;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    BookVisitRequest, PaymentMethod, PaymentStatus, StatusUpdateRequest, UpdateVisitRequest,
    Visit, VisitError, VisitSearchQuery, VisitStatus,
};
use crate::services::lifecycle::VisitLifecycleService;
use crate::services::qr::{DecodedScan, QrCodec};
use crate::services::token::TokenAssignmentService;

const TOKEN_RETRY_ATTEMPTS: u32 = 3;

pub struct VisitService {
    supabase: SupabaseClient,
    settings: SettingsService,
    tokens: TokenAssignmentService,
    lifecycle: VisitLifecycleService,
    qr: QrCodec,
}

impl VisitService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            settings: SettingsService::new(config),
            tokens: TokenAssignmentService::new(config),
            lifecycle: VisitLifecycleService::new(),
            qr: QrCodec::new(&config.clinic_code),
        }
    }

    /// Book a visit: reserve the next token for today, persist the record
    /// with booking defaults, and hand back the stored row.
    ///
    /// Two concurrent bookings can race for the same token; the per-day
    /// uniqueness key rejects the loser and we retry with a fresh read,
    /// bounded, before surfacing a booking failure.
    pub async fn book_visit(&self, request: BookVisitRequest) -> Result<Visit, VisitError> {
        self.validate_booking(&request)?;

        let settings = self
            .settings
            .get_settings(None)
            .await
            .map_err(|e| VisitError::DatabaseError(e.to_string()))?;

        match request.payment_method {
            PaymentMethod::Online if !settings.online_payment_enabled => {
                return Err(VisitError::ValidationError(
                    "Online payment is not available".to_string(),
                ));
            }
            PaymentMethod::Clinic if !settings.clinic_payment_enabled => {
                return Err(VisitError::ValidationError(
                    "Pay-at-clinic is not available".to_string(),
                ));
            }
            _ => {}
        }

        let today = Utc::now().date_naive();

        for attempt in 1..=TOKEN_RETRY_ATTEMPTS {
            let assignment = self
                .tokens
                .next_assignment(today, settings.average_consultation_time)
                .await?;

            if let Some(max_tokens) = settings.max_tokens_per_day {
                if assignment.token_number > max_tokens {
                    info!("Daily capacity {} reached for {}", max_tokens, today);
                    return Err(VisitError::CapacityReached);
                }
            }

            let now = Utc::now();
            let visit_data = json!({
                "uid": assignment.uid,
                "token_number": assignment.token_number,
                "visit_date": today,
                "patient_name": request.patient_name.trim(),
                "age": request.age,
                "phone": request.phone,
                "email": request.email,
                "gender": request.gender,
                "address": request.address,
                "reason": request.reason,
                "symptoms": request.symptoms,
                "medical_history": request.medical_history,
                "allergies": request.allergies,
                "medications": request.medications,
                "emergency_contact": request.emergency_contact,
                "payment_method": request.payment_method.to_string(),
                "payment_status": PaymentStatus::Pending.to_string(),
                "payment_amount": settings.consultation_fee,
                "visit_status": VisitStatus::Upcoming.to_string(),
                "queue_position": assignment.queue_position,
                "estimated_time": assignment.estimated_time,
                "created_at": now.to_rfc3339(),
                "updated_at": now.to_rfc3339(),
            });

            match self.supabase.insert("visits", None, visit_data).await {
                Ok(result) => {
                    let row = result.into_iter().next().ok_or_else(|| {
                        VisitError::DatabaseError("Failed to create visit".to_string())
                    })?;
                    let visit: Visit = serde_json::from_value(row).map_err(|e| {
                        VisitError::DatabaseError(format!("Failed to parse created visit: {}", e))
                    })?;

                    info!(
                        "Visit {} booked: token {} for {}",
                        visit.uid, visit.token_number, visit.visit_date
                    );
                    return Ok(visit);
                }
                Err(e) => {
                    let message = e.to_string();
                    let is_conflict =
                        message.contains("Conflict") || message.contains("duplicate key");
                    if is_conflict && attempt < TOKEN_RETRY_ATTEMPTS {
                        warn!(
                            "Token {} for {} lost a booking race (attempt {}), retrying",
                            assignment.token_number, today, attempt
                        );
                        continue;
                    }
                    if is_conflict {
                        return Err(VisitError::TokenConflict);
                    }
                    return Err(VisitError::DatabaseError(message));
                }
            }
        }

        Err(VisitError::TokenConflict)
    }

    /// QR payload for the booking confirmation screen.
    pub fn qr_payload(&self, visit: &Visit) -> Result<String, VisitError> {
        self.qr.encode(visit)
    }

    pub async fn get_visit(&self, visit_id: Uuid, auth_token: Option<&str>) -> Result<Visit, VisitError> {
        debug!("Fetching visit {}", visit_id);

        let path = format!("/rest/v1/visits?id=eq.{}", visit_id);
        self.fetch_single(&path, auth_token).await
    }

    pub async fn get_visit_by_uid(&self, uid: &str, auth_token: Option<&str>) -> Result<Visit, VisitError> {
        debug!("Fetching visit by uid {}", uid);

        let path = format!("/rest/v1/visits?uid=eq.{}", urlencoding::encode(uid));
        self.fetch_single(&path, auth_token).await
    }

    async fn fetch_single(&self, path: &str, auth_token: Option<&str>) -> Result<Visit, VisitError> {
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, path, auth_token, None)
            .await
            .map_err(|e| VisitError::DatabaseError(e.to_string()))?;

        let row = result.into_iter().next().ok_or(VisitError::NotFound)?;

        serde_json::from_value(row)
            .map_err(|e| VisitError::DatabaseError(format!("Failed to parse visit: {}", e)))
    }

    /// Front-desk search: substring across name/uid/phone, optional
    /// status and date-range filters, newest first.
    pub async fn search_visits(
        &self,
        query: VisitSearchQuery,
        auth_token: &str,
    ) -> Result<Vec<Visit>, VisitError> {
        debug!("Searching visits with filters: {:?}", query);

        let mut query_parts = Vec::new();

        if let Some(q) = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let needle = urlencoding::encode(q).into_owned();
            query_parts.push(format!(
                "or=(patient_name.ilike.%{needle}%,uid.ilike.%{needle}%,phone.ilike.%{needle}%)"
            ));
        }
        if let Some(status) = query.status {
            query_parts.push(format!("visit_status=eq.{}", status));
        }
        if let Some(from_date) = query.from_date {
            query_parts.push(format!("visit_date=gte.{}", from_date));
        }
        if let Some(to_date) = query.to_date {
            query_parts.push(format!("visit_date=lte.{}", to_date));
        }

        query_parts.push("order=created_at.desc".to_string());
        query_parts.push(format!("limit={}", query.limit.unwrap_or(50)));
        if let Some(offset) = query.offset {
            query_parts.push(format!("offset={}", offset));
        }

        let path = format!("/rest/v1/visits?{}", query_parts.join("&"));

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| VisitError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Visit>, _>>()
            .map_err(|e| VisitError::DatabaseError(format!("Failed to parse visits: {}", e)))
    }

    /// Partial record update. Queue identity (uid, token, visit_date) is
    /// not touched here; status moves go through `apply_status`.
    pub async fn update_visit(
        &self,
        visit_id: Uuid,
        request: UpdateVisitRequest,
        auth_token: &str,
    ) -> Result<Visit, VisitError> {
        if request.is_empty() {
            return Err(VisitError::ValidationError("Nothing to update".to_string()));
        }
        if let Some(name) = request.patient_name.as_deref() {
            if name.trim().is_empty() {
                return Err(VisitError::ValidationError(
                    "Patient name cannot be empty".to_string(),
                ));
            }
        }
        if let Some(rating) = request.doctor_rating {
            if !(1..=5).contains(&rating) {
                return Err(VisitError::ValidationError(
                    "Rating must be between 1 and 5".to_string(),
                ));
            }
        }

        let mut update_data = serde_json::to_value(&request)
            .ok()
            .and_then(|v| v.as_object().cloned())
            .unwrap_or_default();
        update_data.retain(|_, v| !v.is_null());
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        self.patch_visit(visit_id, update_data, auth_token).await
    }

    /// Apply a lifecycle transition, stamping the timestamps that
    /// transition owns. Out-of-order moves are rejected before any write.
    pub async fn apply_status(
        &self,
        visit_id: Uuid,
        request: StatusUpdateRequest,
        auth_token: &str,
    ) -> Result<Visit, VisitError> {
        let current = self.get_visit(visit_id, Some(auth_token)).await?;

        self.lifecycle
            .validate_status_transition(&current.visit_status, &request.new_status)?;

        let mut patch = self.lifecycle.transition_patch(&request.new_status, Utc::now());
        patch.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let updated = self.patch_visit(visit_id, patch, auth_token).await?;

        info!(
            "Visit {} moved {} -> {}",
            updated.uid, current.visit_status, updated.visit_status
        );
        Ok(updated)
    }

    /// Resolve a scanned QR payload to a visit and check it in.
    pub async fn check_in_scan(&self, scanned: &str, auth_token: &str) -> Result<Visit, VisitError> {
        let DecodedScan { uid, visit_id } = self.qr.decode(scanned)?;

        let visit = match visit_id {
            Some(id) => self.get_visit(id, Some(auth_token)).await?,
            None => self.get_visit_by_uid(&uid, Some(auth_token)).await?,
        };

        self.apply_status(
            visit.id,
            StatusUpdateRequest {
                new_status: VisitStatus::Arrived,
            },
            auth_token,
        )
        .await
    }

    /// Mark a pending visit paid, minting a receipt id. Queue state is
    /// untouched: payment and lifecycle are independent axes.
    pub async fn mark_paid(&self, visit_id: Uuid, auth_token: &str) -> Result<Visit, VisitError> {
        let current = self.get_visit(visit_id, Some(auth_token)).await?;

        if current.payment_status != PaymentStatus::Pending {
            return Err(VisitError::InvalidPaymentState(format!(
                "Visit {} is already {}",
                current.uid, current.payment_status
            )));
        }

        let mut patch = Map::new();
        patch.insert("payment_status".to_string(), json!(PaymentStatus::Paid.to_string()));
        patch.insert("payment_id".to_string(), json!(generate_payment_id()));
        patch.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let updated = self.patch_visit(visit_id, patch, auth_token).await?;
        info!("Visit {} marked paid ({:?})", updated.uid, updated.payment_id);
        Ok(updated)
    }

    pub async fn refund(&self, visit_id: Uuid, auth_token: &str) -> Result<Visit, VisitError> {
        let current = self.get_visit(visit_id, Some(auth_token)).await?;

        if current.payment_status != PaymentStatus::Paid {
            return Err(VisitError::InvalidPaymentState(format!(
                "Only paid visits can be refunded, visit {} is {}",
                current.uid, current.payment_status
            )));
        }

        let mut patch = Map::new();
        patch.insert(
            "payment_status".to_string(),
            json!(PaymentStatus::Refunded.to_string()),
        );
        patch.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let updated = self.patch_visit(visit_id, patch, auth_token).await?;
        info!("Visit {} refunded", updated.uid);
        Ok(updated)
    }

    /// Privileged hard delete for correcting erroneous bookings. Returns
    /// the deleted visit so callers can refresh that day's aggregate.
    pub async fn delete_visit(&self, visit_id: Uuid, auth_token: &str) -> Result<Visit, VisitError> {
        let visit = self.get_visit(visit_id, Some(auth_token)).await?;

        self.supabase
            .delete("visits", &format!("id=eq.{}", visit_id), Some(auth_token))
            .await
            .map_err(|e| VisitError::DatabaseError(e.to_string()))?;

        info!("Visit {} deleted by staff", visit.uid);
        Ok(visit)
    }

    fn validate_booking(&self, request: &BookVisitRequest) -> Result<(), VisitError> {
        if request.patient_name.trim().is_empty() {
            return Err(VisitError::ValidationError(
                "Patient name is required".to_string(),
            ));
        }
        if let Some(age) = request.age {
            if !(0..=130).contains(&age) {
                return Err(VisitError::ValidationError("Invalid age".to_string()));
            }
        }
        Ok(())
    }

    async fn patch_visit(
        &self,
        visit_id: Uuid,
        patch: Map<String, Value>,
        auth_token: &str,
    ) -> Result<Visit, VisitError> {
        let result = self
            .supabase
            .patch(
                "visits",
                &format!("id=eq.{}", visit_id),
                Some(auth_token),
                Value::Object(patch),
            )
            .await
            .map_err(|e| VisitError::DatabaseError(e.to_string()))?;

        let row = result.into_iter().next().ok_or(VisitError::NotFound)?;

        serde_json::from_value(row)
            .map_err(|e| VisitError::DatabaseError(format!("Failed to parse updated visit: {}", e)))
    }
}

fn generate_payment_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();
    format!("PAY-{}", suffix.to_uppercase())
}
