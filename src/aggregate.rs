use crate::types::{DealRecord, Dimension, LeaderboardRow, MonthKey, PipelineRow, Stage, StageAmounts};
use crate::util::fmt_cr;
use serde::Serialize;
use std::collections::BTreeMap;

pub const TOTAL_LABEL: &str = "TOTAL";

/// Period-over-period changes within ±0.5% are reported as flat.
pub const TREND_DEADBAND_PCT: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodAggregate {
    pub key: MonthKey,
    pub label: String,
    pub amounts: StageAmounts,
}

/// Month buckets in chronological order plus their column-wise total.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PeriodTable {
    pub periods: Vec<PeriodAggregate>,
    pub total: StageAmounts,
}

impl PeriodTable {
    /// Display rows, `TOTAL` last.
    pub fn rows(&self) -> Vec<PipelineRow> {
        self.periods
            .iter()
            .map(|p| pipeline_row(&p.label, &p.amounts))
            .chain(std::iter::once(pipeline_row(TOTAL_LABEL, &self.total)))
            .collect()
    }

    pub fn series(&self, stage: Stage) -> Vec<f64> {
        self.periods.iter().map(|p| p.amounts.get(stage)).collect()
    }
}

fn pipeline_row(label: &str, a: &StageAmounts) -> PipelineRow {
    PipelineRow {
        month: label.to_string(),
        c0: fmt_cr(a.c0),
        c1: fmt_cr(a.c1),
        c2: fmt_cr(a.c2),
        c3: fmt_cr(a.c3),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupAggregate {
    pub name: String,
    pub amounts: StageAmounts,
}

/// Groups of a categorical dimension, sorted by name, plus their total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTable {
    pub dimension: Dimension,
    pub groups: Vec<GroupAggregate>,
    pub total: StageAmounts,
}

impl GroupTable {
    pub fn rows(&self) -> Vec<LeaderboardRow> {
        self.groups
            .iter()
            .map(|g| leaderboard_row(&g.name, &g.amounts))
            .chain(std::iter::once(leaderboard_row(TOTAL_LABEL, &self.total)))
            .collect()
    }

    /// Groups ordered by one stage's sum, largest first; ties keep name order.
    pub fn ranked_by(&self, stage: Stage) -> Vec<&GroupAggregate> {
        let mut ranked: Vec<&GroupAggregate> = self.groups.iter().collect();
        ranked.sort_by(|a, b| b.amounts.get(stage).total_cmp(&a.amounts.get(stage)));
        ranked
    }
}

fn leaderboard_row(name: &str, a: &StageAmounts) -> LeaderboardRow {
    LeaderboardRow {
        name: name.to_string(),
        c0: fmt_cr(a.c0),
        c1: fmt_cr(a.c1),
        c2: fmt_cr(a.c2),
        c3: fmt_cr(a.c3),
    }
}

fn column_total<'a>(amounts: impl Iterator<Item = &'a StageAmounts>) -> StageAmounts {
    let mut total = StageAmounts::default();
    for a in amounts {
        total += *a;
    }
    total
}

/// Column-wise sum over every record, dated or not.
pub fn grand_total(records: &[&DealRecord]) -> StageAmounts {
    column_total(records.iter().map(|r| &r.amounts))
}

/// Sum stage amounts per month. Records without a month are left out, so
/// the TOTAL row here can be below [`grand_total`].
pub fn aggregate_by_month(records: &[&DealRecord]) -> PeriodTable {
    let mut map: BTreeMap<MonthKey, StageAmounts> = BTreeMap::new();
    for r in records {
        if let Some(key) = r.month_key() {
            *map.entry(key).or_default() += r.amounts;
        }
    }
    let periods: Vec<PeriodAggregate> = map
        .into_iter()
        .map(|(key, amounts)| PeriodAggregate { key, label: key.label(), amounts })
        .collect();
    let total = column_total(periods.iter().map(|p| &p.amounts));
    PeriodTable { periods, total }
}

/// Sum stage amounts per value of `dim`. Records with no value are left out.
pub fn aggregate_by_dimension(records: &[&DealRecord], dim: Dimension) -> GroupTable {
    let mut map: BTreeMap<&str, StageAmounts> = BTreeMap::new();
    for r in records {
        if let Some(name) = r.dimension(dim) {
            *map.entry(name).or_default() += r.amounts;
        }
    }
    let groups: Vec<GroupAggregate> = map
        .into_iter()
        .map(|(name, amounts)| GroupAggregate { name: name.to_string(), amounts })
        .collect();
    let total = column_total(groups.iter().map(|g| &g.amounts));
    GroupTable { dimension: dim, groups, total }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrendDirection {
    Up,
    Down,
    Neutral,
}

/// Strictly beyond the deadband is a move; the boundary itself is flat.
pub fn classify_change(change_pct: f64) -> TrendDirection {
    if change_pct > TREND_DEADBAND_PCT {
        TrendDirection::Up
    } else if change_pct < -TREND_DEADBAND_PCT {
        TrendDirection::Down
    } else {
        TrendDirection::Neutral
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendCell {
    /// `None` for the first period or when the prior value is not positive.
    pub change_pct: Option<f64>,
    pub direction: TrendDirection,
}

impl TrendCell {
    const FLAT: TrendCell = TrendCell { change_pct: None, direction: TrendDirection::Neutral };

    pub fn marker(&self) -> String {
        match (self.direction, self.change_pct) {
            (TrendDirection::Up, Some(p)) => format!("▲{:.0}%", p),
            (TrendDirection::Down, Some(p)) => format!("▼{:.0}%", p.abs()),
            _ => "-0%".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodTrend {
    pub label: String,
    /// One cell per stage, C0..C3.
    pub cells: [TrendCell; 4],
}

/// Per-period, per-stage change against the previous period.
pub fn trend_deltas(table: &PeriodTable) -> Vec<PeriodTrend> {
    let mut out = Vec::with_capacity(table.periods.len());
    let mut prev: Option<&StageAmounts> = None;
    for p in &table.periods {
        let cells = Stage::ALL.map(|stage| {
            let Some(before) = prev.map(|a| a.get(stage)) else {
                return TrendCell::FLAT;
            };
            if before <= 0.0 {
                return TrendCell::FLAT;
            }
            let change = (p.amounts.get(stage) - before) / before * 100.0;
            TrendCell { change_pct: Some(change), direction: classify_change(change) }
        });
        out.push(PeriodTrend { label: p.label.clone(), cells });
        prev = Some(&p.amounts);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn deal(month: Option<(i32, u32)>, avp: Option<&str>, amounts: [f64; 4]) -> DealRecord {
        DealRecord {
            month: month.and_then(|(y, m)| NaiveDate::from_ymd_opt(y, m, 1)),
            avp: avp.map(str::to_string),
            amounts: StageAmounts::new(amounts[0], amounts[1], amounts[2], amounts[3]),
            ..DealRecord::default()
        }
    }

    #[test]
    fn months_are_chronological_with_total_last() {
        let records = vec![
            deal(Some((2026, 1)), None, [10.0, 0.0, 0.0, 1.0]),
            deal(Some((2025, 11)), None, [20.0, 5.0, 0.0, 0.0]),
            deal(Some((2026, 1)), None, [5.0, 0.0, 3.0, 0.0]),
            deal(None, None, [1000.0, 0.0, 0.0, 0.0]),
        ];
        let refs: Vec<&DealRecord> = records.iter().collect();
        let table = aggregate_by_month(&refs);
        let labels: Vec<&str> = table.periods.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["Nov 2025", "Jan 2026"]);
        assert_eq!(table.periods[1].amounts, StageAmounts::new(15.0, 0.0, 3.0, 1.0));
        assert_eq!(table.total, StageAmounts::new(35.0, 5.0, 3.0, 1.0));

        let rows = table.rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].month, TOTAL_LABEL);
    }

    #[test]
    fn empty_input_gives_zero_total_row() {
        let table = aggregate_by_month(&[]);
        assert!(table.periods.is_empty());
        let rows = table.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].c0, "₹0.0 Cr");
    }

    #[test]
    fn dimension_groups_are_sorted_and_ranked() {
        let records = vec![
            deal(None, Some("Ravi"), [0.0, 0.0, 0.0, 5.0]),
            deal(None, Some("Asha"), [1.0, 0.0, 0.0, 2.0]),
            deal(None, None, [9.0, 9.0, 9.0, 9.0]),
            deal(None, Some("Ravi"), [0.0, 0.0, 0.0, 1.0]),
        ];
        let refs: Vec<&DealRecord> = records.iter().collect();
        let table = aggregate_by_dimension(&refs, Dimension::Avp);
        let names: Vec<&str> = table.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Asha", "Ravi"]);
        assert_eq!(table.total, StageAmounts::new(1.0, 0.0, 0.0, 8.0));
        assert_eq!(table.ranked_by(Stage::Closed)[0].name, "Ravi");
        assert_eq!(table.rows().last().map(|r| r.name.as_str()), Some(TOTAL_LABEL));
    }

    #[test]
    fn deadband_boundary_is_neutral() {
        assert_eq!(classify_change(0.5), TrendDirection::Neutral);
        assert_eq!(classify_change(-0.5), TrendDirection::Neutral);
        assert_eq!(classify_change(0.500_001), TrendDirection::Up);
        assert_eq!(classify_change(-0.6), TrendDirection::Down);
    }

    #[test]
    fn trend_cells_compare_against_prior_period() {
        let records = vec![
            deal(Some((2025, 10)), None, [200.0, 0.0, 100.0, 50.0]),
            deal(Some((2025, 11)), None, [201.0, 10.0, 50.0, 50.0]),
        ];
        let refs: Vec<&DealRecord> = records.iter().collect();
        let trends = trend_deltas(&aggregate_by_month(&refs));
        assert_eq!(trends[0].cells, [TrendCell::FLAT; 4]);

        let nov = &trends[1].cells;
        // +0.5% exactly.
        assert_eq!(nov[0].direction, TrendDirection::Neutral);
        // Prior value of zero has no defined change.
        assert_eq!(nov[1], TrendCell::FLAT);
        assert_eq!(nov[2].direction, TrendDirection::Down);
        assert_eq!(nov[2].marker(), "▼50%");
        assert_eq!(nov[3].change_pct, Some(0.0));
    }
}
