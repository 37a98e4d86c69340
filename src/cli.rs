use crate::config::ReportConfig;
use crate::filter::{FilterSelection, TypeSelector};
use crate::funnel::FunnelScheme;
use crate::metrics::RiskScheme;
use clap::{ArgAction, Parser};
use std::collections::BTreeSet;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(name = "pipeline_report", version, about = "C0-C3 sales pipeline dashboard reports")]
pub struct Cli {
    /// Directory holding `<sheet>.csv` exports
    #[arg(long, env = "PIPELINE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Configuration file (defaults to ./pipeline_report.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Deal type to report on (always applied when given)
    #[arg(long = "type")]
    pub deal_type: Option<String>,

    /// Month label such as "Oct 2025" (repeatable)
    #[arg(long = "month")]
    pub months: Vec<String>,

    /// Sales owner (repeatable)
    #[arg(long = "avp")]
    pub avps: Vec<String>,

    /// Brand (repeatable)
    #[arg(long = "brand")]
    pub brands: Vec<String>,

    /// Strategic business unit (repeatable)
    #[arg(long = "sbu")]
    pub sbus: Vec<String>,

    #[arg(long, value_enum)]
    pub funnel_scheme: Option<FunnelScheme>,

    #[arg(long, value_enum)]
    pub risk_scheme: Option<RiskScheme>,

    /// Drop deals dated before this day (YYYY-MM-DD)
    #[arg(long)]
    pub min_month: Option<String>,

    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Compute once, write the exports and exit
    #[arg(long)]
    pub batch: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Overlay explicit flags on a loaded configuration.
    pub fn apply_to(&self, config: &mut ReportConfig) {
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(scheme) = self.funnel_scheme {
            config.funnel_scheme = scheme;
        }
        if let Some(scheme) = self.risk_scheme {
            config.risk_scheme = scheme;
        }
        if let Some(min) = &self.min_month {
            config.min_month = Some(min.clone());
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
    }

    pub fn selection(&self) -> FilterSelection {
        let set = |v: &[String]| -> BTreeSet<String> { v.iter().map(|s| s.trim().to_string()).collect() };
        FilterSelection {
            months: set(&self.months),
            avps: set(&self.avps),
            brands: set(&self.brands),
            sbus: set(&self.sbus),
            deal_type: match &self.deal_type {
                Some(t) => TypeSelector::Radio(t.trim().to_string()),
                None => TypeSelector::default(),
            },
        }
    }

    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}
