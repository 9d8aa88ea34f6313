// Settings and configuration management
// Layered: serde defaults -> optional TOML file -> SENTIMENT__* environment

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::markets::DEFAULT_SYMBOLS;
use crate::scoring::ScoreConfig;
use crate::Result;

pub const DEFAULT_CONFIG_FILE: &str = "sentiment";
pub const ENV_PREFIX: &str = "SENTIMENT";

pub const CFTC_API_BASE: &str = "https://publicreporting.cftc.gov/resource/yw9f-hn96.json";
pub const CFTC_REPORT_URL: &str = "https://www.cftc.gov/dea/newcot/FinFutWk.txt";
pub const MYFXBOOK_API_BASE: &str = "https://www.myfxbook.com/api";

#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("retail weight must be within [0, 1], got {0}")]
    RetailWeightOutOfRange(f64),
    #[error("short threshold ({short}) must not exceed long threshold ({long})")]
    ThresholdsCrossed { long: f64, short: f64 },
    #[error("no symbols configured")]
    NoSymbols,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub symbols: Vec<String>,
    pub scoring: ScoringSettings,
    pub refresh: RefreshSettings,
    /// Local CSV the collector appends to
    pub history_path: String,
    pub endpoints: Endpoints,
    pub server: ServerSettings,
    /// Never read from files; filled from the environment only
    #[serde(skip)]
    pub secrets: Secrets,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringSettings {
    pub retail_weight: f64,
    pub long_threshold: f64,
    pub short_threshold: f64,
}

/// Cache lifetimes, in seconds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RefreshSettings {
    pub retail_seconds: u64,
    pub report_seconds: u64,
    pub history_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Endpoints {
    pub cftc_api: String,
    pub cftc_report: String,
    pub myfxbook: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Secrets {
    pub myfxbook_email: Option<String>,
    pub myfxbook_password: Option<String>,
    /// URL or local path of a published history CSV
    pub cot_history_url: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            symbols: DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            scoring: ScoringSettings::default(),
            refresh: RefreshSettings::default(),
            history_path: "cot_history.csv".to_string(),
            endpoints: Endpoints::default(),
            server: ServerSettings::default(),
            secrets: Secrets::default(),
        }
    }
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            retail_weight: 0.6,
            long_threshold: 30.0,
            short_threshold: -30.0,
        }
    }
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            retail_seconds: 300,
            report_seconds: 60 * 60,
            history_seconds: 60 * 10,
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            cftc_api: CFTC_API_BASE.to_string(),
            cftc_report: CFTC_REPORT_URL.to_string(),
            myfxbook: MYFXBOOK_API_BASE.to_string(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8501".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from `path` (required) or `sentiment.toml` (optional),
    /// then the environment, then secrets
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let mut settings: Settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("symbols"),
            )
            .build()?
            .try_deserialize()?;

        settings.secrets = Secrets::from_env();
        settings.symbols = settings
            .symbols
            .iter()
            .map(|s| crate::models::normalize_symbol(s.trim()))
            .filter(|s| !s.is_empty())
            .collect();
        settings.validate()?;

        tracing::debug!("Loaded settings: {:?}", settings);
        Ok(settings)
    }

    pub fn validate(&self) -> std::result::Result<(), SettingsError> {
        if self.symbols.is_empty() {
            return Err(SettingsError::NoSymbols);
        }
        self.score_config().map(|_| ())
    }

    pub fn score_config(&self) -> std::result::Result<ScoreConfig, SettingsError> {
        ScoreConfig::new(
            self.scoring.retail_weight,
            self.scoring.long_threshold,
            self.scoring.short_threshold,
        )
    }

    pub fn has_myfxbook_credentials(&self) -> bool {
        self.secrets.myfxbook_email.is_some() && self.secrets.myfxbook_password.is_some()
    }
}

impl Secrets {
    pub fn from_env() -> Self {
        Self {
            myfxbook_email: read_secret("MYFXBOOK_EMAIL"),
            myfxbook_password: read_secret("MYFXBOOK_PASSWORD"),
            cot_history_url: read_secret("COT_HISTORY_URL"),
        }
    }
}

fn read_secret(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.symbols.len(), 6);
        assert_eq!(settings.scoring.retail_weight, 0.6);
        assert_eq!(settings.refresh.retail_seconds, 300);
        assert_eq!(settings.history_path, "cot_history.csv");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
symbols = ["eur.usd", "US500"]
history_path = "data/cot.csv"

[scoring]
retail_weight = 0.5
long_threshold = 40.0
"#
        )
        .unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.symbols, vec!["EURUSD", "US500"]);
        assert_eq!(settings.history_path, "data/cot.csv");
        assert_eq!(settings.scoring.retail_weight, 0.5);
        assert_eq!(settings.scoring.long_threshold, 40.0);
        // Untouched keys keep their defaults
        assert_eq!(settings.scoring.short_threshold, -30.0);
        assert_eq!(settings.refresh.report_seconds, 3600);
    }

    #[test]
    fn test_load_rejects_invalid_weight() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[scoring]\nretail_weight = 1.5").unwrap();

        assert!(Settings::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_validate_crossed_thresholds() {
        let mut settings = Settings::default();
        settings.scoring.long_threshold = -10.0;
        settings.scoring.short_threshold = 10.0;

        assert_eq!(
            settings.validate(),
            Err(SettingsError::ThresholdsCrossed {
                long: -10.0,
                short: 10.0
            })
        );
    }

    #[test]
    fn test_validate_requires_symbols() {
        let settings = Settings {
            symbols: vec![],
            ..Settings::default()
        };
        assert_eq!(settings.validate(), Err(SettingsError::NoSymbols));
    }
}
