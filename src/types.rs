use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::AddAssign;
use tabled::Tabled;

/// Raw currency units per crore; every `Cr` figure in the dashboard is
/// derived with this divisor.
pub const CRORE: f64 = 10_000_000.0;

/// The four pipeline stages. `C0..C3` name both the stage and the monetary
/// column holding its deal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    Ideation,
    Pitch,
    Negotiation,
    Closed,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Ideation, Stage::Pitch, Stage::Negotiation, Stage::Closed];

    pub fn index(self) -> usize {
        match self {
            Stage::Ideation => 0,
            Stage::Pitch => 1,
            Stage::Negotiation => 2,
            Stage::Closed => 3,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Stage::Ideation => "C0",
            Stage::Pitch => "C1",
            Stage::Negotiation => "C2",
            Stage::Closed => "C3",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Ideation => "C0 - Ideation",
            Stage::Pitch => "C1 - Pitch",
            Stage::Negotiation => "C2 - Negotiation",
            Stage::Closed => "C3 - Closed",
        }
    }

    /// Column holding the free-text status used by the status-based funnel.
    pub fn status_column(self) -> &'static str {
        match self {
            Stage::Ideation => "C0 (Ideation/ Brainstorming Stage)",
            Stage::Pitch => "C1 (Pitch Stage)",
            Stage::Negotiation => "C2 (Negotiation Stage)",
            Stage::Closed => "C3 (Deal Closed Stage)",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-stage monetary sums in raw currency units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StageAmounts {
    pub c0: f64,
    pub c1: f64,
    pub c2: f64,
    pub c3: f64,
}

impl StageAmounts {
    pub fn new(c0: f64, c1: f64, c2: f64, c3: f64) -> Self {
        Self { c0, c1, c2, c3 }
    }

    pub fn get(&self, stage: Stage) -> f64 {
        match stage {
            Stage::Ideation => self.c0,
            Stage::Pitch => self.c1,
            Stage::Negotiation => self.c2,
            Stage::Closed => self.c3,
        }
    }

    pub fn set(&mut self, stage: Stage, value: f64) {
        match stage {
            Stage::Ideation => self.c0 = value,
            Stage::Pitch => self.c1 = value,
            Stage::Negotiation => self.c2 = value,
            Stage::Closed => self.c3 = value,
        }
    }

    /// Open pipeline: everything not yet closed (C0 + C1 + C2).
    pub fn pipeline(&self) -> f64 {
        self.c0 + self.c1 + self.c2
    }
}

impl AddAssign for StageAmounts {
    fn add_assign(&mut self, rhs: Self) {
        self.c0 += rhs.c0;
        self.c1 += rhs.c1;
        self.c2 += rhs.c2;
        self.c3 += rhs.c3;
    }
}

/// Calendar month used as the chronological sort key of a time bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn from_date(date: NaiveDate) -> Self {
        Self { year: date.year(), month: date.month() }
    }

    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// Display label such as `Oct 2025`.
    pub fn label(self) -> String {
        match self.first_day() {
            Some(d) => d.format("%b %Y").to_string(),
            None => format!("{:04}-{:02}", self.year, self.month),
        }
    }

    pub fn next(self) -> Self {
        if self.month >= 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }
}

/// Categorical dimensions a deal can be filtered or grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    Avp,
    Brand,
    Type,
    Sbu,
}

impl Dimension {
    pub fn column(self) -> &'static str {
        match self {
            Dimension::Avp => "AVP",
            Dimension::Brand => "Brand Name",
            Dimension::Type => "Type",
            Dimension::Sbu => "SBUs",
        }
    }
}

/// One normalized row of the deal table. Never mutated after loading.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DealRecord {
    /// First day of the deal month, `None` when the cell did not parse.
    pub month: Option<NaiveDate>,
    pub avp: Option<String>,
    pub brand: Option<String>,
    pub deal_type: Option<String>,
    pub sbu: Option<String>,
    pub amounts: StageAmounts,
    /// Raw status text per stage; `None` when the cell was blank.
    pub statuses: [Option<String>; 4],
}

impl DealRecord {
    pub fn month_key(&self) -> Option<MonthKey> {
        self.month.map(MonthKey::from_date)
    }

    pub fn month_label(&self) -> Option<String> {
        self.month_key().map(MonthKey::label)
    }

    pub fn status(&self, stage: Stage) -> Option<&str> {
        self.statuses[stage.index()].as_deref()
    }

    pub fn dimension(&self, dim: Dimension) -> Option<&str> {
        match dim {
            Dimension::Avp => self.avp.as_deref(),
            Dimension::Brand => self.brand.as_deref(),
            Dimension::Type => self.deal_type.as_deref(),
            Dimension::Sbu => self.sbu.as_deref(),
        }
    }
}

/// One SBU row of the revenue summary table, all amounts in raw units.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RevenueSummaryRecord {
    pub sbu: String,
    pub annual_target: f64,
    pub h1_target: f64,
    pub h1_achieved: f64,
    pub h1_deficit: f64,
    pub h2_target: f64,
    pub h2_target_plus_deficit: f64,
    pub balance_h2_target: f64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct PipelineRow {
    #[serde(rename = "Month")]
    #[tabled(rename = "Month")]
    pub month: String,
    #[serde(rename = "C0 - Ideation")]
    #[tabled(rename = "C0 - Ideation")]
    pub c0: String,
    #[serde(rename = "C1 - Pitch")]
    #[tabled(rename = "C1 - Pitch")]
    pub c1: String,
    #[serde(rename = "C2 - Negotiation")]
    #[tabled(rename = "C2 - Negotiation")]
    pub c2: String,
    #[serde(rename = "C3 - Closed")]
    #[tabled(rename = "C3 - Closed")]
    pub c3: String,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct LeaderboardRow {
    #[serde(rename = "Name")]
    #[tabled(rename = "Name")]
    pub name: String,
    #[serde(rename = "C0 - Ideation")]
    #[tabled(rename = "C0 - Ideation")]
    pub c0: String,
    #[serde(rename = "C1 - Pitch")]
    #[tabled(rename = "C1 - Pitch")]
    pub c1: String,
    #[serde(rename = "C2 - Negotiation")]
    #[tabled(rename = "C2 - Negotiation")]
    pub c2: String,
    #[serde(rename = "C3 - Closed")]
    #[tabled(rename = "C3 - Closed")]
    pub c3: String,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct RevenueSummaryRow {
    #[serde(rename = "SBU")]
    #[tabled(rename = "SBU")]
    pub sbu: String,
    #[serde(rename = "Annual Target")]
    #[tabled(rename = "Annual Target")]
    pub annual_target: String,
    #[serde(rename = "H1 Target")]
    #[tabled(rename = "H1 Target")]
    pub h1_target: String,
    #[serde(rename = "H1 Achieved")]
    #[tabled(rename = "H1 Achieved")]
    pub h1_achieved: String,
    #[serde(rename = "H1 Deficit")]
    #[tabled(rename = "H1 Deficit")]
    pub h1_deficit: String,
    #[serde(rename = "H2 Target")]
    #[tabled(rename = "H2 Target")]
    pub h2_target: String,
    #[serde(rename = "H2 Target + Deficit")]
    #[tabled(rename = "H2 Target + Deficit")]
    pub h2_target_plus_deficit: String,
    #[serde(rename = "Balance H2 Target")]
    #[tabled(rename = "Balance H2 Target")]
    pub balance_h2_target: String,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct FunnelRow {
    #[serde(rename = "Stage")]
    #[tabled(rename = "Stage")]
    pub stage: String,
    #[serde(rename = "Deals")]
    #[tabled(rename = "Deals")]
    pub count: usize,
}
