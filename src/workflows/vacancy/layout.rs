use scraper::Selector;

use super::extractor::ExtractError;

/// Markup contract of the vacancy result page.
///
/// Selectors are CSS selectors evaluated with `scraper`; `join_key_attr` is the
/// attribute shared by header cells and body cells of the seat table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    pub date_anchor: String,
    pub section: String,
    pub time_fragment: String,
    pub station_heading: String,
    pub train_name: String,
    pub seat_table: String,
    pub join_key_attr: String,
    pub time_separator: String,
    pub route_separator: String,
    pub unknown_train: String,
    pub unknown_facility: String,
}

impl TableLayout {
    /// Layout of the e5489 day/time search result page.
    pub fn e5489() -> Self {
        Self {
            date_anchor: "span.route-options-header__date".to_string(),
            section: "div.route-train-list".to_string(),
            time_fragment: "p.route-train-list__time".to_string(),
            station_heading: "h4.route-train-list__heading".to_string(),
            train_name: "div.route-train-list__train-name".to_string(),
            seat_table: "table.seat-facility".to_string(),
            join_key_attr: "data-search-id".to_string(),
            time_separator: " - ".to_string(),
            route_separator: " → ".to_string(),
            unknown_train: "unknown train".to_string(),
            unknown_facility: "unknown facility".to_string(),
        }
    }
}

impl Default for TableLayout {
    fn default() -> Self {
        Self::e5489()
    }
}

/// Selectors compiled once per extractor.
#[derive(Debug, Clone)]
pub(crate) struct CompiledLayout {
    pub(crate) date_anchor: Selector,
    pub(crate) section: Selector,
    pub(crate) time_fragment: Selector,
    pub(crate) station_heading: Selector,
    pub(crate) train_name: Selector,
    pub(crate) seat_table: Selector,
    pub(crate) header_cell: Selector,
    pub(crate) row: Selector,
    pub(crate) body_cell: Selector,
    pub(crate) icon: Selector,
}

impl CompiledLayout {
    pub(crate) fn compile(layout: &TableLayout) -> Result<Self, ExtractError> {
        Ok(Self {
            date_anchor: compile(&layout.date_anchor)?,
            section: compile(&layout.section)?,
            time_fragment: compile(&layout.time_fragment)?,
            station_heading: compile(&layout.station_heading)?,
            train_name: compile(&layout.train_name)?,
            seat_table: compile(&layout.seat_table)?,
            header_cell: compile("th")?,
            row: compile("tr")?,
            body_cell: compile("td")?,
            icon: compile("img")?,
        })
    }
}

fn compile(selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector).map_err(|err| ExtractError::InvalidSelector {
        selector: selector.to_string(),
        detail: err.to_string(),
    })
}
