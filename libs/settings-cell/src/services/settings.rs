use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{ClinicSettings, SettingsError, UpdateClinicSettingsRequest};

pub struct SettingsService {
    supabase: SupabaseClient,
}

impl SettingsService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Fetch the singleton settings row. An empty table yields compiled
    /// defaults so the booking page works before the clinic is configured.
    pub async fn get_settings(&self, auth_token: Option<&str>) -> Result<ClinicSettings, SettingsError> {
        debug!("Fetching clinic settings");

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, "/rest/v1/clinic_settings?limit=1", auth_token, None)
            .await
            .map_err(|e| SettingsError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            debug!("No clinic settings row, using defaults");
            return Ok(ClinicSettings::default());
        }

        let settings: ClinicSettings = serde_json::from_value(result[0].clone())
            .map_err(|e| SettingsError::DatabaseError(format!("Failed to parse settings: {}", e)))?;

        Ok(settings)
    }

    /// Partial update of the singleton; inserts the row on first save.
    pub async fn update_settings(
        &self,
        request: UpdateClinicSettingsRequest,
        auth_token: &str,
    ) -> Result<ClinicSettings, SettingsError> {
        self.validate(&request)?;

        let current = self.get_settings(Some(auth_token)).await?;

        let mut update_data = serde_json::Map::new();

        if let Some(clinic_name) = request.clinic_name {
            update_data.insert("clinic_name".to_string(), json!(clinic_name));
        }
        if let Some(clinic_address) = request.clinic_address {
            update_data.insert("clinic_address".to_string(), json!(clinic_address));
        }
        if let Some(clinic_phone) = request.clinic_phone {
            update_data.insert("clinic_phone".to_string(), json!(clinic_phone));
        }
        if let Some(clinic_email) = request.clinic_email {
            update_data.insert("clinic_email".to_string(), json!(clinic_email));
        }
        if let Some(logo_url) = request.logo_url {
            update_data.insert("logo_url".to_string(), json!(logo_url));
        }
        if let Some(doctor_name) = request.doctor_name {
            update_data.insert("doctor_name".to_string(), json!(doctor_name));
        }
        if let Some(doctor_qualifications) = request.doctor_qualifications {
            update_data.insert("doctor_qualifications".to_string(), json!(doctor_qualifications));
        }
        if let Some(doctor_specialization) = request.doctor_specialization {
            update_data.insert("doctor_specialization".to_string(), json!(doctor_specialization));
        }
        if let Some(doctor_photo_url) = request.doctor_photo_url {
            update_data.insert("doctor_photo_url".to_string(), json!(doctor_photo_url));
        }
        if let Some(morning_shift) = request.morning_shift {
            update_data.insert("morning_shift".to_string(), json!(morning_shift));
        }
        if let Some(evening_shift) = request.evening_shift {
            update_data.insert("evening_shift".to_string(), json!(evening_shift));
        }
        if let Some(consultation_fee) = request.consultation_fee {
            update_data.insert("consultation_fee".to_string(), json!(consultation_fee));
        }
        if let Some(average_consultation_time) = request.average_consultation_time {
            update_data.insert(
                "average_consultation_time".to_string(),
                json!(average_consultation_time),
            );
        }
        if let Some(online_payment_enabled) = request.online_payment_enabled {
            update_data.insert("online_payment_enabled".to_string(), json!(online_payment_enabled));
        }
        if let Some(clinic_payment_enabled) = request.clinic_payment_enabled {
            update_data.insert("clinic_payment_enabled".to_string(), json!(clinic_payment_enabled));
        }
        if let Some(max_tokens_per_day) = request.max_tokens_per_day {
            update_data.insert("max_tokens_per_day".to_string(), json!(max_tokens_per_day));
        }
        if let Some(operating_days) = request.operating_days {
            update_data.insert("operating_days".to_string(), json!(operating_days));
        }
        if let Some(holiday_dates) = request.holiday_dates {
            update_data.insert("holiday_dates".to_string(), json!(holiday_dates));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let result = match current.id {
            Some(id) => self
                .supabase
                .patch(
                    "clinic_settings",
                    &format!("id=eq.{}", id),
                    Some(auth_token),
                    Value::Object(update_data),
                )
                .await
                .map_err(|e| SettingsError::DatabaseError(e.to_string()))?,
            None => {
                // First save: start from defaults and overlay the patch
                let mut row = serde_json::to_value(ClinicSettings::default())
                    .map_err(|e| SettingsError::DatabaseError(e.to_string()))?;
                if let Value::Object(base) = &mut row {
                    base.remove("id");
                    base.remove("updated_at");
                    for (k, v) in update_data {
                        base.insert(k, v);
                    }
                }
                self.supabase
                    .insert("clinic_settings", Some(auth_token), row)
                    .await
                    .map_err(|e| SettingsError::DatabaseError(e.to_string()))?
            }
        };

        if result.is_empty() {
            return Err(SettingsError::DatabaseError(
                "Failed to save clinic settings".to_string(),
            ));
        }

        let settings: ClinicSettings = serde_json::from_value(result[0].clone())
            .map_err(|e| SettingsError::DatabaseError(format!("Failed to parse settings: {}", e)))?;

        info!("Clinic settings updated");
        Ok(settings)
    }

    fn validate(&self, request: &UpdateClinicSettingsRequest) -> Result<(), SettingsError> {
        if let Some(fee) = request.consultation_fee {
            if fee < 0.0 {
                return Err(SettingsError::ValidationError(
                    "Consultation fee cannot be negative".to_string(),
                ));
            }
        }
        if let Some(avg) = request.average_consultation_time {
            if avg <= 0 {
                return Err(SettingsError::ValidationError(
                    "Average consultation time must be positive".to_string(),
                ));
            }
        }
        if let Some(max) = request.max_tokens_per_day {
            if max <= 0 {
                return Err(SettingsError::ValidationError(
                    "Daily token capacity must be positive".to_string(),
                ));
            }
        }
        Ok(())
    }
}
