use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use realtime_cell::{ChangeEvent, ChangeFeed, ChangeKind};
use settings_cell::services::settings::SettingsService;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{QueueSummary, SummaryError, VisitSnapshot};

pub struct QueueSummaryAggregator {
    supabase: SupabaseClient,
    settings: SettingsService,
}

impl QueueSummaryAggregator {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            settings: SettingsService::new(config),
        }
    }

    /// Derive the summary for a date from its visit snapshots. Pure: two
    /// runs over the same rows produce the same summary (modulo
    /// `updated_at`), so recomputation is safe to retry or debounce.
    pub fn compute_summary(
        date: NaiveDate,
        visits: &[VisitSnapshot],
        average_consultation_minutes: i32,
    ) -> QueueSummary {
        let total_appointments = visits.len() as i32;
        let total_waiting = visits
            .iter()
            .filter(|v| v.visit_status == "upcoming" || v.visit_status == "arrived")
            .count() as i32;
        let total_completed = visits
            .iter()
            .filter(|v| v.visit_status == "completed")
            .count() as i32;
        let total_cancelled = visits
            .iter()
            .filter(|v| v.visit_status == "cancelled" || v.visit_status == "no_show")
            .count() as i32;
        let current_token = visits
            .iter()
            .find(|v| v.visit_status == "in_consultation")
            .map(|v| v.token_number);
        let total_revenue = visits
            .iter()
            .filter(|v| v.payment_status == "paid")
            .map(|v| v.payment_amount)
            .sum();

        QueueSummary {
            id: None,
            summary_date: date,
            total_appointments,
            total_waiting,
            total_completed,
            total_cancelled,
            current_token,
            estimated_wait_time: total_waiting * average_consultation_minutes,
            total_revenue,
            updated_at: Utc::now(),
        }
    }

    /// Recompute the summary row for a date from a fresh read of its
    /// visits and upsert it keyed by `summary_date`.
    pub async fn recompute(
        &self,
        date: NaiveDate,
        auth_token: Option<&str>,
    ) -> Result<QueueSummary, SummaryError> {
        debug!("Recomputing queue summary for {}", date);

        let path = format!(
            "/rest/v1/visits?visit_date=eq.{}&select=token_number,visit_status,payment_status,payment_amount",
            date
        );
        let visits: Vec<VisitSnapshot> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(|e| SummaryError::DatabaseError(e.to_string()))?;

        let average_minutes = match self.settings.get_settings(auth_token).await {
            Ok(settings) => settings.average_consultation_time,
            Err(e) => {
                warn!("Settings unavailable for aggregation, using default: {}", e);
                15
            }
        };

        let summary = Self::compute_summary(date, &visits, average_minutes);

        let row = json!({
            "summary_date": summary.summary_date,
            "total_appointments": summary.total_appointments,
            "total_waiting": summary.total_waiting,
            "total_completed": summary.total_completed,
            "total_cancelled": summary.total_cancelled,
            "current_token": summary.current_token,
            "estimated_wait_time": summary.estimated_wait_time,
            "total_revenue": summary.total_revenue,
            "updated_at": summary.updated_at.to_rfc3339(),
        });

        let stored = self
            .supabase
            .upsert("queue_summary", "summary_date", auth_token, row)
            .await
            .map_err(|e| SummaryError::DatabaseError(e.to_string()))?;

        let summary = stored
            .first()
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| SummaryError::DatabaseError(format!("Failed to parse summary: {}", e)))?
            .unwrap_or(summary);

        info!(
            "Queue summary for {}: {} booked, {} waiting, current token {:?}",
            date, summary.total_appointments, summary.total_waiting, summary.current_token
        );

        Ok(summary)
    }

    /// Fetch the stored summary for a date, recomputing when the row is
    /// missing (first read of the day).
    pub async fn get_summary(
        &self,
        date: NaiveDate,
        auth_token: Option<&str>,
    ) -> Result<QueueSummary, SummaryError> {
        let path = format!("/rest/v1/queue_summary?summary_date=eq.{}&limit=1", date);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(|e| SummaryError::DatabaseError(e.to_string()))?;

        match result.into_iter().next() {
            Some(row) => serde_json::from_value(row)
                .map_err(|e| SummaryError::DatabaseError(format!("Failed to parse summary: {}", e))),
            None => self.recompute(date, auth_token).await,
        }
    }

    /// Fire-and-forget recompute after a visit mutation. The summary is a
    /// derived cache: failure here is logged and never reaches the caller.
    pub fn refresh_best_effort(config: Arc<AppConfig>, feed: Arc<ChangeFeed>, date: NaiveDate) {
        tokio::spawn(async move {
            let aggregator = QueueSummaryAggregator::new(&config);
            match aggregator.recompute(date, None).await {
                Ok(summary) => {
                    feed.publish(
                        ChangeEvent::new("queue_summary", ChangeKind::Update).with_date(date),
                    );
                    debug!(
                        "Queue summary refreshed for {} ({} waiting)",
                        date, summary.total_waiting
                    );
                }
                Err(e) => {
                    warn!("Queue summary refresh failed for {}: {}", date, e);
                }
            }
        });
    }
}
