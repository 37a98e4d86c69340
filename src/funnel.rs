//! Funnel classifier: how many deals sit in each pipeline stage.
//!
//! Two schemes exist and they give materially different numbers, so the
//! caller always names the one it wants.

use crate::types::{DealRecord, FunnelRow, Stage};
use serde::{Deserialize, Serialize};

/// Stage-1 statuses that count as "pitched". `C2` is a literal status value
/// found in the sheet, not a stage reference.
pub const PITCH_STATUSES: [&str; 4] = ["C2", "Pitch Completed", "Proposal Sent", "Round 2 Needed"];

pub const LOST_STATUS: &str = "Lost";
pub const WON_STATUS: &str = "Won";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FunnelScheme {
    /// Count by the per-stage status text.
    StatusBased,
    /// Count deals whose stage amount is non-zero.
    AmountBased,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FunnelSnapshot {
    pub scheme: Option<FunnelScheme>,
    /// Deal counts, C0..C3.
    pub counts: [usize; 4],
}

impl FunnelSnapshot {
    pub fn count(&self, stage: Stage) -> usize {
        self.counts[stage.index()]
    }

    /// `(stage name, count)` pairs in fixed stage order.
    pub fn stages(&self) -> Vec<(Stage, usize)> {
        Stage::ALL.iter().map(|s| (*s, self.count(*s))).collect()
    }

    pub fn rows(&self) -> Vec<FunnelRow> {
        self.stages()
            .into_iter()
            .map(|(stage, count)| FunnelRow { stage: stage.label().to_string(), count })
            .collect()
    }
}

/// True when a deal's stage-3 status marks it as won. Case-sensitive.
pub fn is_won(record: &DealRecord) -> bool {
    record.status(Stage::Closed).is_some_and(|s| s.trim() == WON_STATUS)
}

fn in_stage_by_status(record: &DealRecord, stage: Stage) -> bool {
    let status = record.status(stage);
    match stage {
        Stage::Ideation => status.is_some(),
        Stage::Pitch => status.is_some_and(|s| PITCH_STATUSES.contains(&s)),
        Stage::Negotiation => status.is_some_and(|s| {
            let s = s.trim();
            s != LOST_STATUS && !s.is_empty()
        }),
        Stage::Closed => is_won(record),
    }
}

fn in_stage_by_amount(record: &DealRecord, stage: Stage) -> bool {
    record.amounts.get(stage) != 0.0
}

pub fn classify(records: &[&DealRecord], scheme: FunnelScheme) -> FunnelSnapshot {
    let test: fn(&DealRecord, Stage) -> bool = match scheme {
        FunnelScheme::StatusBased => in_stage_by_status,
        FunnelScheme::AmountBased => in_stage_by_amount,
    };
    let counts = Stage::ALL.map(|stage| records.iter().filter(|r| test(r, stage)).count());
    FunnelSnapshot { scheme: Some(scheme), counts }
}
