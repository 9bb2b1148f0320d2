use serde::{Deserialize, Serialize};

use super::domain::VacancyRecord;

/// Decides which records are worth an alert and how they are worded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertPolicy {
    /// Status text the site shows for a fully booked class.
    pub sold_out_status: String,
    /// Substring a seat label must contain to be watched.
    pub seat_keyword: String,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            sold_out_status: "残席なし".to_string(),
            seat_keyword: "B寝台".to_string(),
        }
    }
}

impl AlertPolicy {
    pub fn qualifies(&self, record: &VacancyRecord) -> bool {
        record.status != self.sold_out_status && record.seat.contains(&self.seat_keyword)
    }

    pub fn message(&self, record: &VacancyRecord) -> String {
        format!("【空席あり】 {} {} {}", record.date, record.time, record.route)
    }
}
