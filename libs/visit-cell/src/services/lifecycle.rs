use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::models::{VisitError, VisitStatus};

/// State machine over `visit_status`. Transitions move forward only;
/// cancellation branches off before consultation, no-show is reachable
/// from any non-terminal state.
pub struct VisitLifecycleService;

impl VisitLifecycleService {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_status_transition(
        &self,
        current_status: &VisitStatus,
        new_status: &VisitStatus,
    ) -> Result<(), VisitError> {
        debug!("Validating status transition {} -> {}", current_status, new_status);

        if !self.get_valid_transitions(current_status).contains(new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(VisitError::InvalidStatusTransition {
                from: current_status.to_string(),
                to: new_status.to_string(),
            });
        }

        Ok(())
    }

    pub fn get_valid_transitions(&self, current_status: &VisitStatus) -> Vec<VisitStatus> {
        match current_status {
            VisitStatus::Upcoming => vec![
                VisitStatus::Arrived,
                VisitStatus::Cancelled,
                VisitStatus::NoShow,
            ],
            VisitStatus::Arrived => vec![
                VisitStatus::InConsultation,
                VisitStatus::Cancelled,
                VisitStatus::NoShow,
            ],
            VisitStatus::InConsultation => vec![VisitStatus::Completed, VisitStatus::NoShow],
            // Terminal states
            VisitStatus::Completed => vec![],
            VisitStatus::Cancelled => vec![],
            VisitStatus::NoShow => vec![],
        }
    }

    /// Build the update patch for a validated transition: the new status
    /// plus the timestamp(s) that transition stamps.
    pub fn transition_patch(&self, new_status: &VisitStatus, now: DateTime<Utc>) -> Map<String, Value> {
        let mut patch = Map::new();
        patch.insert("visit_status".to_string(), json!(new_status.to_string()));

        match new_status {
            VisitStatus::Arrived => {
                patch.insert("arrived_at".to_string(), json!(now.to_rfc3339()));
            }
            VisitStatus::InConsultation => {
                patch.insert("consultation_start_time".to_string(), json!(now.to_rfc3339()));
            }
            VisitStatus::Completed => {
                patch.insert("consultation_end_time".to_string(), json!(now.to_rfc3339()));
                patch.insert("completed_at".to_string(), json!(now.to_rfc3339()));
            }
            VisitStatus::Cancelled => {
                patch.insert("cancelled_at".to_string(), json!(now.to_rfc3339()));
            }
            VisitStatus::Upcoming | VisitStatus::NoShow => {}
        }

        patch
    }
}

impl Default for VisitLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}
