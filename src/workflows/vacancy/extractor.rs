use std::collections::HashMap;

use scraper::{ElementRef, Html};
use tracing::debug;

use super::domain::VacancyRecord;
use super::layout::{CompiledLayout, TableLayout};

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The page has no search date; it is an error/redirect page, not a result page.
    #[error("vacancy page is missing its date anchor ({selector})")]
    MissingDateAnchor { selector: String },
    #[error("invalid selector '{selector}': {detail}")]
    InvalidSelector { selector: String, detail: String },
}

/// Fields shared by every record of one train section.
struct SectionContext<'a> {
    date: &'a str,
    time: String,
    route: String,
    train: String,
}

/// Turns a vacancy result page into [`VacancyRecord`]s.
#[derive(Debug, Clone)]
pub struct VacancyExtractor {
    layout: TableLayout,
    selectors: CompiledLayout,
}

impl VacancyExtractor {
    pub fn new(layout: TableLayout) -> Result<Self, ExtractError> {
        let selectors = CompiledLayout::compile(&layout)?;
        Ok(Self { layout, selectors })
    }

    pub fn standard() -> Result<Self, ExtractError> {
        Self::new(TableLayout::e5489())
    }

    /// Extract records in reading order: sections as they appear, then rows
    /// top-to-bottom, then cells left-to-right.
    pub fn extract(&self, document: &str) -> Result<Vec<VacancyRecord>, ExtractError> {
        let html = Html::parse_document(document);

        let date = html
            .select(&self.selectors.date_anchor)
            .next()
            .map(stripped_text)
            .ok_or_else(|| ExtractError::MissingDateAnchor {
                selector: self.layout.date_anchor.clone(),
            })?;

        let mut records = Vec::new();
        for (index, section) in html.select(&self.selectors.section).enumerate() {
            let Some(table) = section.select(&self.selectors.seat_table).next() else {
                debug!(section = index, "train section has no seat table, skipping");
                continue;
            };

            let context = self.section_context(section, &date);
            let definitions = self.seat_definitions(table);
            self.collect_rows(table, &definitions, &context, &mut records);
        }

        debug!(date = %date, records = records.len(), "extracted vacancy records");
        Ok(records)
    }

    fn section_context<'a>(&self, section: ElementRef<'_>, date: &'a str) -> SectionContext<'a> {
        let time = section
            .select(&self.selectors.time_fragment)
            .map(stripped_text)
            .collect::<Vec<_>>()
            .join(self.layout.time_separator.as_str());
        let route = section
            .select(&self.selectors.station_heading)
            .map(stripped_text)
            .collect::<Vec<_>>()
            .join(self.layout.route_separator.as_str());
        let train = section
            .select(&self.selectors.train_name)
            .next()
            .map(stripped_text)
            .unwrap_or_else(|| self.layout.unknown_train.clone());

        SectionContext {
            date,
            time,
            route,
            train,
        }
    }

    /// Join key → seat label, built from the header cells' icon captions.
    fn seat_definitions(&self, table: ElementRef<'_>) -> HashMap<String, String> {
        let mut definitions = HashMap::new();
        for header in table.select(&self.selectors.header_cell) {
            let Some(key) = header.value().attr(&self.layout.join_key_attr) else {
                continue;
            };
            let label = header
                .select(&self.selectors.icon)
                .filter_map(|icon| icon.value().attr("alt"))
                .filter(|alt| !alt.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            definitions.insert(key.to_string(), label);
        }
        definitions
    }

    fn collect_rows(
        &self,
        table: ElementRef<'_>,
        definitions: &HashMap<String, String>,
        context: &SectionContext<'_>,
        records: &mut Vec<VacancyRecord>,
    ) {
        for row in table.select(&self.selectors.row) {
            for cell in row.select(&self.selectors.body_cell) {
                let Some(key) = cell.value().attr(&self.layout.join_key_attr) else {
                    continue;
                };

                let seat = definitions
                    .get(key)
                    .cloned()
                    .unwrap_or_else(|| self.layout.unknown_facility.clone());

                records.push(VacancyRecord {
                    date: context.date.to_string(),
                    time: context.time.clone(),
                    route: context.route.clone(),
                    train: context.train.clone(),
                    seat,
                    status: self.cell_status(cell),
                });
            }
        }
    }

    /// Icon caption first, then the cell's visible text.
    fn cell_status(&self, cell: ElementRef<'_>) -> String {
        cell.select(&self.selectors.icon)
            .next()
            .and_then(|icon| icon.value().attr("alt"))
            .filter(|alt| !alt.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| stripped_text(cell))
    }
}

/// Text content with every fragment trimmed and empty fragments dropped.
fn stripped_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .collect()
}
