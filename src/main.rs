use clap::{Args, Parser, Subcommand, ValueEnum};
use seat_watch::config::{AppConfig, TransportConfig};
use seat_watch::error::AppError;
use seat_watch::telemetry;
use seat_watch::workflows::notify::{FileHistoryStore, HistoryStore};
use seat_watch::workflows::poll::{alert_routes, AlertRoute, PollRunner, SearchPlan};
use seat_watch::workflows::transport::HttpTransport;
use seat_watch::workflows::vacancy::{VacancyExtractor, VacancyRecord};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "seat-watch",
    about = "Watch sleeper-train seat vacancy and alert through deduplicated channels",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a saved vacancy page and print its records
    Extract(ExtractArgs),
    /// Run one poll cycle over a search plan
    Watch(WatchArgs),
    /// Push a message through the configured alert channels
    Notify(NotifyArgs),
    /// Print the stored alert history of a channel
    History(HistoryArgs),
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// Saved HTML of a day/time search result page
    path: PathBuf,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Csv,
    Json,
}

#[derive(Args, Debug)]
struct WatchArgs {
    /// JSON array of searches (from, to, date, hour, minute, train)
    #[arg(long)]
    plan: PathBuf,
}

#[derive(Args, Debug)]
struct NotifyArgs {
    message: String,
    /// Only deliver through the named channel
    #[arg(long)]
    channel: Option<String>,
}

#[derive(Args, Debug)]
struct HistoryArgs {
    /// Channel name, e.g. webhook_dedup or speaker
    channel: String,
}

fn main() {
    if let Err(err) = run_cli() {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    match cli.command {
        Command::Extract(args) => run_extract(args),
        Command::Watch(args) => run_watch(args, &config),
        Command::Notify(args) => run_notify(args, &config),
        Command::History(args) => run_history(args, &config),
    }
}

fn run_extract(args: ExtractArgs) -> Result<(), AppError> {
    let html = std::fs::read_to_string(&args.path)?;
    let records = VacancyExtractor::standard()?.extract(&html)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.format {
        OutputFormat::Text => render_text(&mut out, &records)?,
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(out);
            for record in &records {
                writer.serialize(record)?;
            }
            writer.flush()?;
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &records)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn render_text(out: &mut impl Write, records: &[VacancyRecord]) -> io::Result<()> {
    let mut heading = None;
    for record in records {
        let current = record.departure_heading();
        if heading.as_ref() != Some(&current) {
            writeln!(out, "{current}")?;
            heading = Some(current);
        }
        writeln!(out, "{}", record.summary_line())?;
    }
    Ok(())
}

fn run_watch(args: WatchArgs, config: &AppConfig) -> Result<(), AppError> {
    let plan = SearchPlan::from_path(&args.plan)?;
    let site = HttpTransport::new(&config.transport)?;
    let notifier = Arc::new(HttpTransport::new(&direct_transport(config))?);
    let routes = alert_routes(config, notifier);

    let runner = PollRunner::new(
        site,
        VacancyExtractor::standard()?,
        config.alerts.clone(),
        routes,
        config.pacing,
    );
    info!(
        searches = plan.len(),
        routes = runner.routes().len(),
        "starting poll cycle"
    );
    let report = runner.run_cycle(&plan);

    println!(
        "searches: {} | records: {} | qualifying: {} | sent: {} | suppressed: {} | failed: {} | fetch errors: {} | parse errors: {}",
        report.searches,
        report.records,
        report.qualifying,
        report.sent(),
        report.suppressed(),
        report.failed(),
        report.fetch_failures,
        report.parse_failures
    );
    Ok(())
}

fn run_notify(args: NotifyArgs, config: &AppConfig) -> Result<(), AppError> {
    let notifier = Arc::new(HttpTransport::new(&direct_transport(config))?);
    let routes = alert_routes(config, notifier);

    let mut delivered = 0;
    for route in routes
        .iter()
        .filter(|route| args.channel.as_deref().map_or(true, |name| name == route.name()))
    {
        let outcome = route.deliver(&args.message);
        println!("{} ({}): {}", route.name(), route_mode(route), outcome.label());
        delivered += 1;
    }

    if delivered == 0 {
        println!("no matching alert channel is configured");
    }
    Ok(())
}

fn run_history(args: HistoryArgs, config: &AppConfig) -> Result<(), AppError> {
    let store = FileHistoryStore::for_channel(&config.history_dir, &args.channel);
    let entries = store.load()?;
    if entries.is_empty() {
        println!("no alerts recorded for {}", args.channel);
    }
    for entry in entries {
        println!("{}  {}  {}", entry.timestamp.to_rfc3339(), entry.hash, entry.message);
    }
    Ok(())
}

fn route_mode(route: &AlertRoute) -> String {
    match route.retention() {
        Some(window) => format!("dedup {}h", window.num_hours()),
        None => "every alert".to_string(),
    }
}

/// Alert channels never go through the site proxy.
fn direct_transport(config: &AppConfig) -> TransportConfig {
    TransportConfig {
        proxy_url: None,
        ..config.transport.clone()
    }
}
