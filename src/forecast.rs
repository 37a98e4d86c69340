//! Straight-line projection of monthly series.
//!
//! Ordinary least squares against a 0-based month index, predicted one and
//! two steps past the last observation.

use crate::aggregate::PeriodTable;
use crate::types::{MonthKey, Stage};
use crate::util::{average, ratio, to_crore};
use serde::Serialize;

pub const FORECAST_HORIZON: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FitKind {
    /// Real regression over at least two points.
    Regression,
    /// One point: the slope is undefined, the mean is projected flat.
    Mean,
    /// No points at all: everything is 0.
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub kind: FitKind,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Least squares of `y` against its 0-based index: `y = slope * x + intercept`.
pub fn fit_linear(y: &[f64]) -> LinearFit {
    if y.is_empty() {
        return LinearFit { slope: 0.0, intercept: 0.0, kind: FitKind::Empty };
    }
    if y.len() == 1 {
        return LinearFit { slope: 0.0, intercept: average(y), kind: FitKind::Mean };
    }
    let n = y.len() as f64;
    let sum_x: f64 = (0..y.len()).map(|i| i as f64).sum();
    let sum_y: f64 = y.iter().sum();
    let sum_xx: f64 = (0..y.len()).map(|i| (i as f64).powi(2)).sum();
    let sum_xy: f64 = y.iter().enumerate().map(|(i, v)| i as f64 * v).sum();

    let slope = (n * sum_xy - sum_x * sum_y) / (n * sum_xx - sum_x * sum_x);
    let intercept = (sum_y - slope * sum_x) / n;
    LinearFit { slope, intercept, kind: FitKind::Regression }
}

/// Values for the `steps` indices following the last observation.
pub fn forecast_next(y: &[f64], steps: usize) -> Vec<f64> {
    let fit = fit_linear(y);
    (0..steps).map(|s| fit.predict((y.len() + s) as f64)).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub label: String,
    pub value: f64,
}

/// Monthly pipeline (C0) and closed (C3) values in crore, with projections.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrendSeries {
    pub pipeline_cr: Vec<SeriesPoint>,
    pub closed_cr: Vec<SeriesPoint>,
    /// C0 over C3 per month, 0 when nothing closed.
    pub coverage: Vec<SeriesPoint>,
    pub pipeline_forecast_cr: Vec<SeriesPoint>,
    pub closed_forecast_cr: Vec<SeriesPoint>,
    /// Fewer than two months of history; projections are flat.
    pub insufficient_data: bool,
}

fn future_labels(last: Option<MonthKey>, steps: usize) -> Vec<String> {
    let Some(mut key) = last else {
        return Vec::new();
    };
    (0..steps)
        .map(|_| {
            key = key.next();
            key.label()
        })
        .collect()
}

fn points(labels: &[String], values: &[f64]) -> Vec<SeriesPoint> {
    labels
        .iter()
        .zip(values)
        .map(|(label, value)| SeriesPoint { label: label.clone(), value: *value })
        .collect()
}

pub fn trend_series(table: &PeriodTable) -> TrendSeries {
    let labels: Vec<String> = table.periods.iter().map(|p| p.label.clone()).collect();
    let pipeline: Vec<f64> = table.series(Stage::Ideation).into_iter().map(to_crore).collect();
    let closed: Vec<f64> = table.series(Stage::Closed).into_iter().map(to_crore).collect();
    let coverage: Vec<f64> = table.periods.iter().map(|p| ratio(p.amounts.c0, p.amounts.c3)).collect();

    let future = future_labels(table.periods.last().map(|p| p.key), FORECAST_HORIZON);
    TrendSeries {
        pipeline_forecast_cr: points(&future, &forecast_next(&pipeline, FORECAST_HORIZON)),
        closed_forecast_cr: points(&future, &forecast_next(&closed, FORECAST_HORIZON)),
        pipeline_cr: points(&labels, &pipeline),
        closed_cr: points(&labels, &closed),
        coverage: points(&labels, &coverage),
        insufficient_data: labels.len() < 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate_by_month;
    use crate::types::{DealRecord, StageAmounts};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    #[test]
    fn perfect_line_extends() {
        let fit = fit_linear(&[1.0, 3.0, 5.0]);
        assert_eq!(fit.kind, FitKind::Regression);
        assert_eq!(fit.slope, 2.0);
        assert_eq!(fit.intercept, 1.0);
        assert_eq!(forecast_next(&[1.0, 3.0, 5.0], 2), vec![7.0, 9.0]);
    }

    #[test]
    fn single_point_projects_its_value() {
        let out = forecast_next(&[4.2], 2);
        assert_eq!(out, vec![4.2, 4.2]);
        assert!(out.iter().all(|v| v.is_finite()));
        assert_eq!(fit_linear(&[4.2]).kind, FitKind::Mean);
    }

    #[test]
    fn no_points_projects_zero() {
        assert_eq!(forecast_next(&[], 2), vec![0.0, 0.0]);
    }

    #[test]
    fn noisy_series_uses_least_squares() {
        // x = 0..3, y = 2, 4, 5, 4 → slope 0.7, intercept 2.7
        let fit = fit_linear(&[2.0, 4.0, 5.0, 4.0]);
        assert!((fit.slope - 0.7).abs() < 1e-12);
        assert!((fit.intercept - 2.7).abs() < 1e-12);
    }

    fn month(y: i32, m: u32, c0: f64, c3: f64) -> DealRecord {
        DealRecord {
            month: NaiveDate::from_ymd_opt(y, m, 1),
            amounts: StageAmounts::new(c0, 0.0, 0.0, c3),
            ..DealRecord::default()
        }
    }

    #[test]
    fn series_labels_roll_over_year_end() {
        let records = vec![month(2025, 11, 10_000_000.0, 0.0), month(2025, 12, 20_000_000.0, 10_000_000.0)];
        let refs: Vec<&DealRecord> = records.iter().collect();
        let series = trend_series(&aggregate_by_month(&refs));
        let labels: Vec<&str> = series.pipeline_forecast_cr.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["Jan 2026", "Feb 2026"]);
        assert_eq!(series.pipeline_forecast_cr[0].value, 3.0);
        assert_eq!(series.pipeline_forecast_cr[1].value, 4.0);
        assert_eq!(series.coverage[0].value, 0.0);
        assert_eq!(series.coverage[1].value, 2.0);
        assert!(!series.insufficient_data);
    }

    #[test]
    fn empty_history_has_no_projection() {
        let series = trend_series(&PeriodTable::default());
        assert!(series.pipeline_forecast_cr.is_empty());
        assert!(series.insufficient_data);
    }
}
