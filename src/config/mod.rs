use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::workflows::notify::DigestAlgorithm;
use crate::workflows::vacancy::AlertPolicy;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
/// Upper bound for retention windows, ten years.
const MAX_WINDOW_HOURS: u32 = 24 * 366 * 10;
const DEFAULT_SPEAKER_PHRASE: &str = "空席があります。 確認してください。";

/// Top-level configuration for the watcher.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub telemetry: TelemetryConfig,
    pub transport: TransportConfig,
    pub pacing: PacingConfig,
    pub alerts: AlertPolicy,
    pub history_dir: PathBuf,
    pub webhook: WebhookConfig,
    pub speaker: SpeakerConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let log_level = env::var("WATCH_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_file = optional_var("WATCH_LOG_FILE").map(PathBuf::from);

        let transport = TransportConfig {
            proxy_url: optional_var("WATCH_PROXY_URL"),
            user_agent: env::var("WATCH_USER_AGENT")
                .unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string()),
            timeout: Duration::from_secs(parse_var("WATCH_TIMEOUT_SECS", 30u64)?),
        };

        let pacing = PacingConfig {
            min_delay_secs: parse_var("WATCH_DELAY_MIN_SECS", 5u64)?,
            max_delay_secs: parse_var("WATCH_DELAY_MAX_SECS", 20u64)?,
        };
        if pacing.min_delay_secs > pacing.max_delay_secs {
            return Err(ConfigError::InvalidDelayRange {
                min: pacing.min_delay_secs,
                max: pacing.max_delay_secs,
            });
        }

        let mut alerts = AlertPolicy::default();
        if let Some(keyword) = optional_var("WATCH_SEAT_KEYWORD") {
            alerts.seat_keyword = keyword;
        }
        if let Some(status) = optional_var("WATCH_SOLD_OUT_STATUS") {
            alerts.sold_out_status = status;
        }

        let history_dir =
            PathBuf::from(env::var("WATCH_HISTORY_DIR").unwrap_or_else(|_| ".".to_string()));

        let webhook = WebhookConfig {
            plain_url: optional_var("WATCH_WEBHOOK_URL"),
            dedup_url: optional_var("WATCH_DEDUP_WEBHOOK_URL"),
            window: parse_window("WATCH_WEBHOOK_WINDOW_HOURS", 3)?,
            digest: parse_digest("WATCH_WEBHOOK_DIGEST", DigestAlgorithm::Sha256)?,
        };

        let volume = parse_var("WATCH_SPEAKER_VOLUME", 0.5f32)?;
        if !volume.is_finite() {
            return Err(ConfigError::InvalidNumber {
                key: "WATCH_SPEAKER_VOLUME",
                value: volume.to_string(),
            });
        }
        let speaker = SpeakerConfig {
            bridge_url: optional_var("WATCH_SPEAKER_URL"),
            device: optional_var("WATCH_SPEAKER_DEVICE"),
            volume: volume.clamp(0.0, 1.0),
            phrase: env::var("WATCH_SPEAKER_PHRASE")
                .unwrap_or_else(|_| DEFAULT_SPEAKER_PHRASE.to_string()),
            window: parse_window("WATCH_SPEAKER_WINDOW_HOURS", 12)?,
            digest: parse_digest("WATCH_SPEAKER_DIGEST", DigestAlgorithm::Md5)?,
        };

        Ok(Self {
            telemetry: TelemetryConfig {
                log_level,
                log_file,
            },
            transport,
            pacing,
            alerts,
            history_dir,
            webhook,
            speaker,
        })
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

/// HTTP settings for requests against the reservation site.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub proxy_url: Option<String>,
    pub user_agent: String,
    pub timeout: Duration,
}

/// Randomized pause between consecutive searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingConfig {
    pub min_delay_secs: u64,
    pub max_delay_secs: u64,
}

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub plain_url: Option<String>,
    pub dedup_url: Option<String>,
    pub window: chrono::Duration,
    pub digest: DigestAlgorithm,
}

#[derive(Debug, Clone)]
pub struct SpeakerConfig {
    pub bridge_url: Option<String>,
    pub device: Option<String>,
    pub volume: f32,
    pub phrase: String,
    pub window: chrono::Duration,
    pub digest: DigestAlgorithm,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidNumber { key: &'static str, value: String },
    InvalidDigest { key: &'static str, value: String },
    InvalidDelayRange { min: u64, max: u64 },
    WindowTooLong { key: &'static str, hours: u32 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidNumber { key, value } => {
                write!(f, "{key} must be a valid number, got '{value}'")
            }
            ConfigError::InvalidDigest { key, value } => {
                write!(f, "{key} must be 'sha256' or 'md5', got '{value}'")
            }
            ConfigError::InvalidDelayRange { min, max } => write!(
                f,
                "WATCH_DELAY_MIN_SECS ({min}) must not exceed WATCH_DELAY_MAX_SECS ({max})"
            ),
            ConfigError::WindowTooLong { key, hours } => write!(
                f,
                "{key} must be at most {MAX_WINDOW_HOURS} hours, got {hours}"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match optional_var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key, value: raw }),
        None => Ok(default),
    }
}

fn parse_digest(key: &'static str, default: DigestAlgorithm) -> Result<DigestAlgorithm, ConfigError> {
    match optional_var(key) {
        Some(raw) => raw
            .parse::<DigestAlgorithm>()
            .map_err(|_| ConfigError::InvalidDigest { key, value: raw }),
        None => Ok(default),
    }
}

fn parse_window(key: &'static str, default: u32) -> Result<chrono::Duration, ConfigError> {
    let hours = parse_var(key, default)?;
    if hours > MAX_WINDOW_HOURS {
        return Err(ConfigError::WindowTooLong { key, hours });
    }
    Ok(chrono::Duration::hours(i64::from(hours)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    const KEYS: &[&str] = &[
        "WATCH_LOG_LEVEL",
        "WATCH_LOG_FILE",
        "WATCH_HISTORY_DIR",
        "WATCH_PROXY_URL",
        "WATCH_USER_AGENT",
        "WATCH_TIMEOUT_SECS",
        "WATCH_DELAY_MIN_SECS",
        "WATCH_DELAY_MAX_SECS",
        "WATCH_SEAT_KEYWORD",
        "WATCH_SOLD_OUT_STATUS",
        "WATCH_WEBHOOK_URL",
        "WATCH_DEDUP_WEBHOOK_URL",
        "WATCH_WEBHOOK_WINDOW_HOURS",
        "WATCH_WEBHOOK_DIGEST",
        "WATCH_SPEAKER_URL",
        "WATCH_SPEAKER_DEVICE",
        "WATCH_SPEAKER_VOLUME",
        "WATCH_SPEAKER_PHRASE",
        "WATCH_SPEAKER_WINDOW_HOURS",
        "WATCH_SPEAKER_DIGEST",
    ];

    fn reset_env() {
        for key in KEYS {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.telemetry.log_level, "info");
        assert!(config.telemetry.log_file.is_none());
        assert_eq!(config.history_dir, PathBuf::from("."));
        assert_eq!(config.pacing.min_delay_secs, 5);
        assert_eq!(config.pacing.max_delay_secs, 20);
        assert_eq!(config.webhook.window, chrono::Duration::hours(3));
        assert_eq!(config.webhook.digest, DigestAlgorithm::Sha256);
        assert_eq!(config.speaker.window, chrono::Duration::hours(12));
        assert_eq!(config.speaker.digest, DigestAlgorithm::Md5);
        assert_eq!(config.alerts.seat_keyword, "B寝台");
        assert_eq!(config.alerts.sold_out_status, "残席なし");
        assert!(config.transport.proxy_url.is_none());
    }

    #[test]
    fn speaker_volume_is_clamped() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("WATCH_SPEAKER_VOLUME", "3.5");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.speaker.volume, 1.0);
        reset_env();
    }

    #[test]
    fn rejects_inverted_delay_range() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("WATCH_DELAY_MIN_SECS", "30");
        env::set_var("WATCH_DELAY_MAX_SECS", "10");
        match AppConfig::load() {
            Err(ConfigError::InvalidDelayRange { min: 30, max: 10 }) => {}
            other => panic!("expected invalid delay range, got {other:?}"),
        }
        reset_env();
    }

    #[test]
    fn rejects_unknown_digest_names() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("WATCH_WEBHOOK_DIGEST", "crc32");
        match AppConfig::load() {
            Err(ConfigError::InvalidDigest { key, .. }) => assert_eq!(key, "WATCH_WEBHOOK_DIGEST"),
            other => panic!("expected invalid digest, got {other:?}"),
        }
        reset_env();
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("WATCH_WEBHOOK_URL", "   ");
        env::set_var("WATCH_TIMEOUT_SECS", "");
        let config = AppConfig::load().expect("config loads");
        assert!(config.webhook.plain_url.is_none());
        assert_eq!(config.transport.timeout, Duration::from_secs(30));
        reset_env();
    }

    #[test]
    fn rejects_retention_windows_beyond_ten_years() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("WATCH_WEBHOOK_WINDOW_HOURS", "4000000000");
        match AppConfig::load() {
            Err(ConfigError::WindowTooLong { key, hours }) => {
                assert_eq!(key, "WATCH_WEBHOOK_WINDOW_HOURS");
                assert_eq!(hours, 4_000_000_000);
            }
            other => panic!("expected window too long, got {other:?}"),
        }

        env::set_var("WATCH_WEBHOOK_WINDOW_HOURS", "87840");
        let config = AppConfig::load().expect("ten-year window accepted");
        assert_eq!(config.webhook.window, chrono::Duration::hours(87_840));
        reset_env();
    }

    #[test]
    fn rejects_non_finite_speaker_volume() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        for raw in ["NaN", "inf"] {
            env::set_var("WATCH_SPEAKER_VOLUME", raw);
            match AppConfig::load() {
                Err(ConfigError::InvalidNumber { key, .. }) => {
                    assert_eq!(key, "WATCH_SPEAKER_VOLUME")
                }
                other => panic!("expected invalid volume for {raw}, got {other:?}"),
            }
        }
        reset_env();
    }
}
