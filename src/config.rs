//! Run configuration.
//!
//! Values come from `pipeline_report.toml` (or `--config`), with defaults for
//! anything left out. Command-line flags override the file.

use crate::error::ReportError;
use crate::funnel::FunnelScheme;
use crate::metrics::RiskScheme;
use crate::util::parse_iso_date;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "pipeline_report.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub data_dir: PathBuf,
    pub deal_sheet: String,
    pub revenue_sheet: String,
    pub cache_ttl_secs: u64,
    pub funnel_scheme: FunnelScheme,
    pub risk_scheme: RiskScheme,
    /// Rows dated before this `YYYY-MM-DD` day are dropped at load time.
    pub min_month: Option<String>,
    pub output_dir: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            deal_sheet: "Base_Data".to_string(),
            revenue_sheet: "Revenue_Summary".to_string(),
            cache_ttl_secs: 600,
            funnel_scheme: FunnelScheme::StatusBased,
            risk_scheme: RiskScheme::ThreeTier,
            min_month: None,
            output_dir: PathBuf::from("."),
        }
    }
}

impl ReportConfig {
    pub fn min_month_date(&self) -> Option<NaiveDate> {
        let raw = self.min_month.as_deref()?;
        let parsed = parse_iso_date(raw);
        if parsed.is_none() {
            log::warn!("Ignoring min_month '{}': expected YYYY-MM-DD", raw);
        }
        parsed
    }
}

/// Parse a TOML document into a config.
pub fn parse_config(contents: &str, path: &Path) -> Result<ReportConfig, ReportError> {
    toml::from_str::<ReportConfig>(contents).map_err(|e| ReportError::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load an explicitly requested config file. A missing file is an error here.
pub fn load_config_from(path: &Path) -> Result<ReportConfig, ReportError> {
    let contents = fs::read_to_string(path)?;
    let config = parse_config(&contents, path)?;
    log::debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Load `pipeline_report.toml` from `dir` if present; otherwise defaults.
/// A malformed file is reported and ignored.
pub fn load_config(dir: &Path) -> ReportConfig {
    let path = dir.join(DEFAULT_CONFIG_FILE);
    match fs::read_to_string(&path) {
        Ok(contents) => match parse_config(&contents, &path) {
            Ok(config) => {
                log::debug!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("{}. Using defaults.", e);
                ReportConfig::default()
            }
        },
        Err(e) => {
            // Only log actual errors, not "file not found"
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("Failed to read config file {}: {}", path.display(), e);
            }
            ReportConfig::default()
        }
    }
}
