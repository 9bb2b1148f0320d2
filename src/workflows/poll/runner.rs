use std::time::Duration;

use rand::Rng;
use tracing::{debug, info, warn};

use super::plan::{SearchPlan, SearchRequest};
use crate::config::PacingConfig;
use crate::workflows::notify::{
    DispatchOutcome, HistoryStore, NotificationChannel, NotificationGate,
};
use crate::workflows::transport::{HttpTransport, TransportError};
use crate::workflows::vacancy::{AlertPolicy, ExtractError, VacancyExtractor, VacancyRecord};

/// Where result pages come from.
pub trait PageSource {
    fn fetch(&self, url: &str) -> Result<String, TransportError>;
}

impl PageSource for HttpTransport {
    fn fetch(&self, url: &str) -> Result<String, TransportError> {
        self.get_text(url)
    }
}

/// Wording sent to a route for a qualifying record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageTemplate {
    /// The policy's per-departure message.
    Record,
    /// The same phrase for every record.
    Fixed(String),
}

impl MessageTemplate {
    pub fn render(&self, policy: &AlertPolicy, record: &VacancyRecord) -> String {
        match self {
            Self::Record => policy.message(record),
            Self::Fixed(text) => text.clone(),
        }
    }
}

/// A channel, optionally behind a dedup gate.
#[derive(Debug)]
pub struct AlertRoute {
    channel: Box<dyn NotificationChannel>,
    gate: Option<NotificationGate<Box<dyn HistoryStore>>>,
    template: MessageTemplate,
}

impl AlertRoute {
    /// Every qualifying record is delivered.
    pub fn plain(channel: Box<dyn NotificationChannel>, template: MessageTemplate) -> Self {
        Self {
            channel,
            gate: None,
            template,
        }
    }

    pub fn deduplicated(
        channel: Box<dyn NotificationChannel>,
        gate: NotificationGate<Box<dyn HistoryStore>>,
        template: MessageTemplate,
    ) -> Self {
        Self {
            channel,
            gate: Some(gate),
            template,
        }
    }

    pub fn name(&self) -> &str {
        self.channel.name()
    }

    pub fn is_deduplicated(&self) -> bool {
        self.gate.is_some()
    }

    /// Retention window of the dedup gate, if the route has one.
    pub fn retention(&self) -> Option<chrono::Duration> {
        self.gate.as_ref().map(|gate| gate.retention())
    }

    pub fn template(&self) -> &MessageTemplate {
        &self.template
    }

    pub fn deliver(&self, message: &str) -> DispatchOutcome {
        match &self.gate {
            Some(gate) => gate.dispatch_with_dedup(message, |text| self.channel.send(text)),
            None => match self.channel.send(message) {
                Ok(()) => DispatchOutcome::Sent,
                Err(err) => {
                    warn!(channel = %self.name(), error = %err, "alert delivery failed");
                    DispatchOutcome::SendFailed(err)
                }
            },
        }
    }
}

#[derive(Debug)]
pub struct Delivery {
    pub channel: String,
    pub message: String,
    pub outcome: DispatchOutcome,
}

/// Counters and delivery outcomes of one cycle.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub searches: usize,
    pub fetch_failures: usize,
    pub parse_failures: usize,
    pub records: usize,
    pub qualifying: usize,
    pub deliveries: Vec<Delivery>,
}

impl CycleReport {
    pub fn sent(&self) -> usize {
        self.count(|outcome| matches!(outcome, DispatchOutcome::Sent))
    }

    pub fn suppressed(&self) -> usize {
        self.count(|outcome| matches!(outcome, DispatchOutcome::Suppressed))
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, DispatchOutcome::SendFailed(_)))
    }

    fn count(&self, predicate: impl Fn(&DispatchOutcome) -> bool) -> usize {
        self.deliveries
            .iter()
            .filter(|delivery| predicate(&delivery.outcome))
            .count()
    }
}

/// Runs searches, extracts vacancies and routes qualifying ones to channels.
pub struct PollRunner<P> {
    source: P,
    extractor: VacancyExtractor,
    policy: AlertPolicy,
    routes: Vec<AlertRoute>,
    pacing: PacingConfig,
}

impl<P: PageSource> PollRunner<P> {
    pub fn new(
        source: P,
        extractor: VacancyExtractor,
        policy: AlertPolicy,
        routes: Vec<AlertRoute>,
        pacing: PacingConfig,
    ) -> Self {
        Self {
            source,
            extractor,
            policy,
            routes,
            pacing,
        }
    }

    pub fn routes(&self) -> &[AlertRoute] {
        &self.routes
    }

    pub fn run_cycle(&self, plan: &SearchPlan) -> CycleReport {
        let mut report = CycleReport::default();

        for (index, search) in plan.searches.iter().enumerate() {
            if index > 0 {
                self.pause();
            }
            report.searches += 1;
            self.run_search(search, &mut report);
        }

        info!(
            searches = report.searches,
            records = report.records,
            qualifying = report.qualifying,
            sent = report.sent(),
            suppressed = report.suppressed(),
            failed = report.failed(),
            "poll cycle finished"
        );
        report
    }

    fn run_search(&self, search: &SearchRequest, report: &mut CycleReport) {
        let label = search.describe();
        let url = search.url();
        debug!(search = %label, %url, "fetching vacancy page");

        let page = match self.source.fetch(&url) {
            Ok(page) => page,
            Err(err) => {
                warn!(search = %label, error = %err, "vacancy page fetch failed");
                report.fetch_failures += 1;
                return;
            }
        };

        let records = match self.extractor.extract(&page) {
            Ok(records) => records,
            Err(err) => {
                self.log_parse_failure(&label, &page, &err);
                report.parse_failures += 1;
                return;
            }
        };

        if let Some(first) = records.first() {
            info!("{}", first.departure_heading());
        }
        report.records += records.len();

        for record in &records {
            info!("{}", record.summary_line());
            if !self.policy.qualifies(record) {
                continue;
            }
            report.qualifying += 1;

            for route in &self.routes {
                let message = route.template().render(&self.policy, record);
                let outcome = route.deliver(&message);
                debug!(channel = %route.name(), outcome = outcome.label(), "alert routed");
                report.deliveries.push(Delivery {
                    channel: route.name().to_string(),
                    message,
                    outcome,
                });
            }
        }
    }

    fn log_parse_failure(&self, label: &str, page: &str, err: &ExtractError) {
        warn!(search = %label, error = %err, "vacancy page could not be parsed");
        let excerpt: String = page
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .chars()
            .take(500)
            .collect();
        debug!(search = %label, %excerpt, "unexpected page content");
    }

    fn pause(&self) {
        let PacingConfig {
            min_delay_secs,
            max_delay_secs,
        } = self.pacing;
        if max_delay_secs == 0 {
            return;
        }
        let secs = rand::rng().random_range(min_delay_secs..=max_delay_secs);
        debug!(secs, "pausing between searches");
        std::thread::sleep(Duration::from_secs(secs));
    }
}
