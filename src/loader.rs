use crate::error::{FetchError, Warning};
use crate::source::{DataSource, Table};
use crate::types::{DealRecord, Dimension, RevenueSummaryRecord, Stage, StageAmounts};
use crate::util::{is_missing, parse_amount, parse_currency, parse_month_dayfirst};
use chrono::NaiveDate;

pub const MONTH_COLUMN: &str = "Month222";

/// Columns the dashboard expects on the deal sheet. Absence degrades
/// functionality but never aborts a load.
pub const REQUIRED_DEAL_COLUMNS: [&str; 8] = [MONTH_COLUMN, "AVP", "Brand Name", "Type", "C0", "C1", "C2", "C3"];

pub const SBU_COLUMN: &str = "SBU";

/// Revenue summary currency columns, in display order.
pub const REVENUE_COLUMNS: [&str; 7] = [
    "Annual Target",
    "H1 Target",
    "H1 Achieved",
    "H1 Deficit",
    "H2 Target",
    "H2 Target + Deficit",
    "Balance H2 Target",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    /// Rows with no usable cell at all.
    pub skipped_rows: usize,
    /// Rows dated before the configured lower bound.
    pub filtered_rows: usize,
    /// Rows kept without a month; they are left out of month buckets.
    pub undated_rows: usize,
    pub warnings: Vec<Warning>,
}

impl LoadReport {
    pub fn missing_columns(&self) -> Vec<&str> {
        self.warnings
            .iter()
            .filter_map(|w| match w {
                Warning::MissingColumn(c) => Some(c.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn parse_warnings(&self) -> usize {
        self.warnings.iter().filter(|w| matches!(w, Warning::Unparseable { .. })).count()
    }
}

/// Column positions resolved once per table.
struct DealColumns {
    month: Option<usize>,
    avp: Option<usize>,
    brand: Option<usize>,
    deal_type: Option<usize>,
    sbu: Option<usize>,
    amounts: [Option<usize>; 4],
    statuses: [Option<usize>; 4],
}

impl DealColumns {
    fn resolve(table: &Table) -> Self {
        Self {
            month: table.column_index(MONTH_COLUMN),
            avp: table.column_index(Dimension::Avp.column()),
            brand: table.column_index(Dimension::Brand.column()),
            deal_type: table.column_index(Dimension::Type.column()),
            sbu: table.column_index(Dimension::Sbu.column()),
            amounts: Stage::ALL.map(|s| table.column_index(s.code())),
            statuses: Stage::ALL.map(|s| table.column_index(s.status_column())),
        }
    }
}

fn cell(row: &[String], idx: Option<usize>) -> Option<&str> {
    idx.and_then(|i| row.get(i)).map(String::as_str)
}

fn text_cell(row: &[String], idx: Option<usize>) -> Option<String> {
    let raw = cell(row, idx);
    if is_missing(raw) {
        return None;
    }
    let v = raw?.trim();
    if v.is_empty() {
        None
    } else {
        Some(v.to_string())
    }
}

/// Clean raw deal rows into typed records.
///
/// Unparsable amounts become 0 and unparsable months become `None`; both are
/// recorded as warnings. Missing expected columns are recorded too.
pub fn normalize_deals(table: &Table, min_month: Option<NaiveDate>) -> (Vec<DealRecord>, LoadReport) {
    let mut report = LoadReport { total_rows: table.len(), ..LoadReport::default() };
    for col in REQUIRED_DEAL_COLUMNS {
        if table.column_index(col).is_none() {
            report.warnings.push(Warning::MissingColumn(col.to_string()));
        }
    }
    let cols = DealColumns::resolve(table);
    let mut records = Vec::with_capacity(table.len());

    for (i, row) in table.rows.iter().enumerate() {
        // Header is line 1 of the sheet.
        let line = i + 2;
        if row.iter().all(|c| is_missing(Some(c.trim()))) {
            report.skipped_rows += 1;
            continue;
        }

        let raw_month = cell(row, cols.month);
        let month = if is_missing(raw_month) {
            None
        } else {
            let parsed = parse_month_dayfirst(raw_month);
            if parsed.is_none() {
                report.warnings.push(Warning::Unparseable {
                    row: line,
                    column: MONTH_COLUMN.to_string(),
                    value: raw_month.unwrap_or_default().to_string(),
                });
            }
            parsed
        };

        if let (Some(m), Some(lower)) = (month, min_month) {
            if m < lower {
                report.filtered_rows += 1;
                continue;
            }
        }

        let mut amounts = StageAmounts::default();
        for stage in Stage::ALL {
            let raw = cell(row, cols.amounts[stage.index()]);
            if is_missing(raw) || raw.is_some_and(|v| v.trim().is_empty()) {
                continue;
            }
            match parse_amount(raw) {
                Some(v) => amounts.set(stage, v),
                None => report.warnings.push(Warning::Unparseable {
                    row: line,
                    column: stage.code().to_string(),
                    value: raw.unwrap_or_default().to_string(),
                }),
            }
        }

        let statuses = Stage::ALL.map(|s| {
            let raw = cell(row, cols.statuses[s.index()]);
            if is_missing(raw) {
                None
            } else {
                raw.map(str::to_string)
            }
        });

        if month.is_none() {
            report.undated_rows += 1;
        }
        records.push(DealRecord {
            month,
            avp: text_cell(row, cols.avp),
            brand: text_cell(row, cols.brand),
            deal_type: text_cell(row, cols.deal_type),
            sbu: text_cell(row, cols.sbu),
            amounts,
            statuses,
        });
    }

    report.loaded_rows = records.len();
    (records, report)
}

/// Clean the revenue summary sheet. Rows with a blank SBU are dropped.
pub fn normalize_revenue_summary(table: &Table) -> (Vec<RevenueSummaryRecord>, LoadReport) {
    let mut report = LoadReport { total_rows: table.len(), ..LoadReport::default() };
    for col in std::iter::once(SBU_COLUMN).chain(REVENUE_COLUMNS) {
        if table.column_index(col).is_none() {
            report.warnings.push(Warning::MissingColumn(col.to_string()));
        }
    }
    let sbu_idx = table.column_index(SBU_COLUMN);
    let value_idx = REVENUE_COLUMNS.map(|c| table.column_index(c));

    let mut records = Vec::new();
    for (i, row) in table.rows.iter().enumerate() {
        let Some(sbu) = text_cell(row, sbu_idx) else {
            report.skipped_rows += 1;
            continue;
        };
        let mut values = [0.0f64; 7];
        for (slot, (name, idx)) in values.iter_mut().zip(REVENUE_COLUMNS.iter().zip(value_idx)) {
            let raw = cell(row, idx);
            if is_missing(raw) || raw.is_some_and(|v| v.trim().is_empty()) {
                continue;
            }
            match parse_currency(raw) {
                Some(v) => *slot = v,
                None => report.warnings.push(Warning::Unparseable {
                    row: i + 2,
                    column: name.to_string(),
                    value: raw.unwrap_or_default().to_string(),
                }),
            }
        }
        let [annual_target, h1_target, h1_achieved, h1_deficit, h2_target, h2_target_plus_deficit, balance_h2_target] =
            values;
        records.push(RevenueSummaryRecord {
            sbu,
            annual_target,
            h1_target,
            h1_achieved,
            h1_deficit,
            h2_target,
            h2_target_plus_deficit,
            balance_h2_target,
        });
    }
    report.loaded_rows = records.len();
    (records, report)
}

fn log_report(sheet: &str, report: &LoadReport) {
    log::info!(
        "Sheet '{}': {} rows read, {} loaded, {} skipped, {} before lower bound, {} undated",
        sheet,
        report.total_rows,
        report.loaded_rows,
        report.skipped_rows,
        report.filtered_rows,
        report.undated_rows
    );
    for col in report.missing_columns() {
        log::warn!("Sheet '{}': expected column '{}' is missing; dashboard functionality might be limited", sheet, col);
    }
    let parse_warnings = report.parse_warnings();
    if parse_warnings > 0 {
        log::warn!("Sheet '{}': {} cells could not be parsed and were defaulted", sheet, parse_warnings);
    }
}

/// Fetch and normalize the deal sheet.
///
/// An empty sheet, or one where every row was unusable, is a terminal
/// "no data" condition.
pub fn load_deals(
    source: &dyn DataSource,
    sheet: &str,
    min_month: Option<NaiveDate>,
) -> Result<(Vec<DealRecord>, LoadReport), FetchError> {
    let table = source.fetch(sheet)?;
    if table.is_empty() {
        return Err(FetchError::Empty(sheet.to_string()));
    }
    let (records, report) = normalize_deals(&table, min_month);
    log_report(sheet, &report);
    if records.is_empty() {
        if report.skipped_rows == report.total_rows {
            return Err(FetchError::AllRowsUnparseable { sheet: sheet.to_string(), rows: report.total_rows });
        }
        return Err(FetchError::Empty(sheet.to_string()));
    }
    Ok((records, report))
}

pub fn load_revenue_summary(
    source: &dyn DataSource,
    sheet: &str,
) -> Result<(Vec<RevenueSummaryRecord>, LoadReport), FetchError> {
    let table = source.fetch(sheet)?;
    if table.is_empty() {
        return Err(FetchError::Empty(sheet.to_string()));
    }
    let (records, report) = normalize_revenue_summary(&table);
    log_report(sheet, &report);
    Ok((records, report))
}
