use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const SEARCH_ENDPOINT: &str =
    "https://e5489.jr-odekake.net/e5489/cspc/CBDayTimeArriveSelRsvMyDiaPC";
const RETURN_PAGE: &str = "goyoyaku/campaign/sunriseseto_izumo/form.html";

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("failed to read search plan: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid search plan JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("search #{index} is invalid: {reason}")]
    InvalidSearch { index: usize, reason: String },
}

/// Stations the search form accepts, with their Shift_JIS percent-encoded names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Station {
    #[serde(alias = "東京")]
    Tokyo,
    #[serde(alias = "岡山")]
    Okayama,
}

impl Station {
    pub const fn code(self) -> &'static str {
        match self {
            Self::Tokyo => "%93%8C%8B%9E",
            Self::Okayama => "%89%AA%8ER",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Tokyo => "東京",
            Self::Okayama => "岡山",
        }
    }
}

/// Brief-kana train identifiers understood by the specific-train search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainCode {
    SunriseIzumo,
    SunriseSeto,
    SunriseSetoShort,
    SunriseIzumoShort,
}

impl TrainCode {
    pub const fn code(self) -> &'static str {
        match self {
            Self::SunriseIzumo => "%BB%B2%BD%D3%BB000",
            Self::SunriseSeto => "%BB%BE%C4%BB%20000",
            Self::SunriseSetoShort => "%BB%BE%C4%20%20000",
            Self::SunriseIzumoShort => "%BB%B2%BD%D3%20000",
        }
    }
}

/// One (route, departure, train) query against the reservation site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub from: Station,
    pub to: Station,
    pub date: NaiveDate,
    pub hour: u8,
    pub minute: u8,
    pub train: TrainCode,
}

impl SearchRequest {
    pub fn url(&self) -> String {
        let from = self.from.code();
        let to = self.to.code();
        let params = [
            format!("inputDepartStName={from}"),
            format!("inputArriveStName={to}"),
            "inputType=0".to_string(),
            format!("inputDate={}", self.date.format("%Y%m%d")),
            format!("inputHour={:02}", self.hour),
            format!("inputMinute={:02}", self.minute),
            "inputUniqueDepartSt=1".to_string(),
            "inputUniqueArriveSt=1".to_string(),
            "inputSearchType=2".to_string(),
            format!("inputTransferDepartStName1={from}"),
            format!("inputTransferArriveStName1={to}"),
            "inputTransferDepartStUnique1=1".to_string(),
            "inputTransferArriveStUnique1=1".to_string(),
            "inputTransferTrainType1=0001".to_string(),
            "inputSpecificTrainType1=2".to_string(),
            format!("inputSpecificBriefTrainKana1={}", self.train.code()),
            "SequenceType=0".to_string(),
            format!("inputReturnUrl={RETURN_PAGE}"),
            format!("RTURL=https://www.jr-odekake.net/{RETURN_PAGE}"),
            "undefined=".to_string(),
        ];

        format!("{SEARCH_ENDPOINT}?{}", params.join("&"))
    }

    pub fn describe(&self) -> String {
        format!(
            "{} {:02}:{:02} {}→{} {:?}",
            self.date,
            self.hour,
            self.minute,
            self.from.label(),
            self.to.label(),
            self.train
        )
    }

    fn validate(&self) -> Result<(), String> {
        if self.from == self.to {
            return Err("departure and arrival stations must differ".to_string());
        }
        if self.hour > 23 {
            return Err(format!("hour {} is out of range", self.hour));
        }
        if self.minute > 59 {
            return Err(format!("minute {} is out of range", self.minute));
        }
        Ok(())
    }
}

/// Ordered list of searches run by one poll cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchPlan {
    pub searches: Vec<SearchRequest>,
}

impl SearchPlan {
    pub fn new(searches: Vec<SearchRequest>) -> Result<Self, PlanError> {
        for (index, search) in searches.iter().enumerate() {
            search
                .validate()
                .map_err(|reason| PlanError::InvalidSearch { index, reason })?;
        }
        Ok(Self { searches })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, PlanError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, PlanError> {
        let searches: Vec<SearchRequest> = serde_json::from_reader(reader)?;
        Self::new(searches)
    }

    pub fn len(&self) -> usize {
        self.searches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.searches.is_empty()
    }
}
