use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::notify::HistoryError;
use crate::workflows::poll::PlanError;
use crate::workflows::transport::TransportError;
use crate::workflows::vacancy::ExtractError;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Extract(ExtractError),
    Plan(PlanError),
    Transport(TransportError),
    History(HistoryError),
    Output(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Extract(err) => write!(f, "extraction error: {}", err),
            AppError::Plan(err) => write!(f, "search plan error: {}", err),
            AppError::Transport(err) => write!(f, "transport error: {}", err),
            AppError::History(err) => write!(f, "history error: {}", err),
            AppError::Output(detail) => write!(f, "output error: {}", detail),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Extract(err) => Some(err),
            AppError::Plan(err) => Some(err),
            AppError::Transport(err) => Some(err),
            AppError::History(err) => Some(err),
            AppError::Output(_) => None,
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<ExtractError> for AppError {
    fn from(value: ExtractError) -> Self {
        Self::Extract(value)
    }
}

impl From<PlanError> for AppError {
    fn from(value: PlanError) -> Self {
        Self::Plan(value)
    }
}

impl From<TransportError> for AppError {
    fn from(value: TransportError) -> Self {
        Self::Transport(value)
    }
}

impl From<HistoryError> for AppError {
    fn from(value: HistoryError) -> Self {
        Self::History(value)
    }
}

impl From<csv::Error> for AppError {
    fn from(value: csv::Error) -> Self {
        Self::Output(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Output(value.to_string())
    }
}
