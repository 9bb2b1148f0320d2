pub mod domain;
mod extractor;
mod layout;
mod policy;

pub use domain::VacancyRecord;
pub use extractor::{ExtractError, VacancyExtractor};
pub use layout::TableLayout;
pub use policy::AlertPolicy;
