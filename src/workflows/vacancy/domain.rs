use serde::{Deserialize, Serialize};

/// One (train, seat class) observation for a single search result page.
///
/// Every field is kept as the text the site rendered. `status` in particular
/// is free text ("残席なし", "空席あり", a remaining-seat count, ...) because the
/// site's vocabulary is open-ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VacancyRecord {
    pub date: String,
    pub time: String,
    pub route: String,
    pub train: String,
    pub seat: String,
    pub status: String,
}

impl VacancyRecord {
    /// Heading used when listing records grouped by departure.
    pub fn departure_heading(&self) -> String {
        format!("=== {} {} {} ===", self.date, self.time, self.route)
    }

    pub fn summary_line(&self) -> String {
        format!("{}/{}: {}", self.train, self.seat, self.status)
    }
}
