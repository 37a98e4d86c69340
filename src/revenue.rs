use crate::aggregate::TOTAL_LABEL;
use crate::filter::FilterSelection;
use crate::types::{RevenueSummaryRecord, RevenueSummaryRow};
use crate::util::fmt_cr2;
use serde::Serialize;

/// SBU revenue targets with a TOTAL row, numeric and display forms.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RevenueSummary {
    pub rows: Vec<RevenueSummaryRecord>,
    pub total: RevenueSummaryRecord,
}

impl RevenueSummary {
    pub fn display_rows(&self) -> Vec<RevenueSummaryRow> {
        self.rows.iter().chain(std::iter::once(&self.total)).map(display_row).collect()
    }
}

fn display_row(r: &RevenueSummaryRecord) -> RevenueSummaryRow {
    RevenueSummaryRow {
        sbu: r.sbu.clone(),
        annual_target: fmt_cr2(r.annual_target),
        h1_target: fmt_cr2(r.h1_target),
        h1_achieved: fmt_cr2(r.h1_achieved),
        h1_deficit: fmt_cr2(r.h1_deficit),
        h2_target: fmt_cr2(r.h2_target),
        h2_target_plus_deficit: fmt_cr2(r.h2_target_plus_deficit),
        balance_h2_target: fmt_cr2(r.balance_h2_target),
    }
}

/// Build the summary for the SBUs in the selection (all when none picked).
/// Blank-SBU rows never reach this point; the loader drops them.
pub fn revenue_summary(records: &[RevenueSummaryRecord], selection: &FilterSelection) -> RevenueSummary {
    let rows: Vec<RevenueSummaryRecord> = records
        .iter()
        .filter(|r| !r.sbu.trim().is_empty())
        .filter(|r| selection.sbus.is_empty() || selection.sbus.contains(&r.sbu))
        .cloned()
        .collect();
    let mut total = RevenueSummaryRecord { sbu: TOTAL_LABEL.to_string(), ..RevenueSummaryRecord::default() };
    for r in &rows {
        total.annual_target += r.annual_target;
        total.h1_target += r.h1_target;
        total.h1_achieved += r.h1_achieved;
        total.h1_deficit += r.h1_deficit;
        total.h2_target += r.h2_target;
        total.h2_target_plus_deficit += r.h2_target_plus_deficit;
        total.balance_h2_target += r.balance_h2_target;
    }
    RevenueSummary { rows, total }
}
