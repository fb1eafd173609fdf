use chrono::NaiveDate;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::VisitError;

/// A reserved place in the day's queue: sequential token, display uid,
/// and the wait estimate shown on the booking confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenAssignment {
    pub token_number: i32,
    pub uid: String,
    pub queue_position: i32,
    pub estimated_time: String,
}

pub struct TokenAssignmentService {
    supabase: SupabaseClient,
}

impl TokenAssignmentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Compute the next assignment for a date: one past the day's highest
    /// token, 1 on an empty day.
    ///
    /// Read-then-insert is not serialized against concurrent bookings; the
    /// caller owns the bounded retry when the insert hits the per-day
    /// uniqueness key.
    pub async fn next_assignment(
        &self,
        date: NaiveDate,
        average_consultation_minutes: i32,
    ) -> Result<TokenAssignment, VisitError> {
        let path = format!(
            "/rest/v1/visits?visit_date=eq.{}&select=token_number&order=token_number.desc&limit=1",
            date
        );
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| VisitError::DatabaseError(e.to_string()))?;

        let max_token = rows
            .first()
            .and_then(|row| row["token_number"].as_i64())
            .unwrap_or(0) as i32;

        let next = max_token + 1;
        debug!("Next token for {}: {}", date, next);

        Ok(Self::assignment_for(next, average_consultation_minutes))
    }

    pub fn assignment_for(token_number: i32, average_consultation_minutes: i32) -> TokenAssignment {
        TokenAssignment {
            token_number,
            uid: format_uid(token_number),
            queue_position: token_number,
            estimated_time: estimate_wait(token_number, average_consultation_minutes),
        }
    }
}

pub fn format_uid(token_number: i32) -> String {
    format!("XC-{:03}", token_number)
}

pub fn estimate_wait(token_number: i32, average_consultation_minutes: i32) -> String {
    format!("{} minutes", token_number * average_consultation_minutes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uid_zero_padding() {
        assert_eq!(format_uid(1), "XC-001");
        assert_eq!(format_uid(42), "XC-042");
        assert_eq!(format_uid(999), "XC-999");
        // Past three digits the uid simply grows
        assert_eq!(format_uid(1000), "XC-1000");
    }

    #[test]
    fn test_wait_estimate() {
        assert_eq!(estimate_wait(3, 15), "45 minutes");
        assert_eq!(estimate_wait(1, 20), "20 minutes");
    }

    #[test]
    fn test_sequential_assignments() {
        // Tokens 1..=5 in order, each uid matching its token
        for (previous_max, expected_uid) in
            [(0, "XC-001"), (1, "XC-002"), (2, "XC-003"), (3, "XC-004"), (4, "XC-005")]
        {
            let assignment = TokenAssignmentService::assignment_for(previous_max + 1, 15);
            assert_eq!(assignment.token_number, previous_max + 1);
            assert_eq!(assignment.uid, expected_uid);
            assert_eq!(assignment.queue_position, assignment.token_number);
        }
    }

    #[test]
    fn test_booking_scenario_third_of_the_day() {
        // Two visits exist, max token 2: the next booking gets token 3
        let assignment = TokenAssignmentService::assignment_for(3, 15);
        assert_eq!(assignment.token_number, 3);
        assert_eq!(assignment.uid, "XC-003");
        assert_eq!(assignment.queue_position, 3);
        assert_eq!(assignment.estimated_time, "45 minutes");
    }
}
