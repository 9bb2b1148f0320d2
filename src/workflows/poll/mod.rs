mod plan;
mod routes;
mod runner;

pub use plan::{PlanError, SearchPlan, SearchRequest, Station, TrainCode};
pub use routes::{alert_routes, DEDUP_WEBHOOK, PLAIN_WEBHOOK, SPEAKER};
pub use runner::{
    AlertRoute, CycleReport, Delivery, MessageTemplate, PageSource, PollRunner,
};
