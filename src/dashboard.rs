//! One full dashboard computation: filter, aggregate, classify, derive,
//! advise. Pure; the caller owns the selection and re-runs on change.

use crate::aggregate::{aggregate_by_dimension, aggregate_by_month, grand_total, trend_deltas, GroupTable, PeriodTable, PeriodTrend};
use crate::config::ReportConfig;
use crate::filter::{apply_filters, filter_options, FilterOptions, FilterSelection};
use crate::forecast::{trend_series, TrendSeries};
use crate::funnel::{classify, FunnelScheme, FunnelSnapshot};
use crate::insights::{generate_insights, insight_messages, Insight};
use crate::metrics::{compute_metrics, performance_matrix, revenue_treemap, AvpPerformance, BrandShare, PipelineMetrics, RiskScheme};
use crate::revenue::{revenue_summary, RevenueSummary};
use crate::types::{DealRecord, Dimension, PipelineRow, RevenueSummaryRecord, StageAmounts};
use serde::Serialize;

/// Heuristic variants the caller picks explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ComputeOptions {
    pub funnel_scheme: FunnelScheme,
    pub risk_scheme: RiskScheme,
}

impl Default for ComputeOptions {
    fn default() -> Self {
        Self { funnel_scheme: FunnelScheme::StatusBased, risk_scheme: RiskScheme::ThreeTier }
    }
}

impl From<&ReportConfig> for ComputeOptions {
    fn from(config: &ReportConfig) -> Self {
        Self { funnel_scheme: config.funnel_scheme, risk_scheme: config.risk_scheme }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub compute_options: ComputeOptions,
    pub selection: FilterSelection,
    pub filter_options: FilterOptions,
    pub matched_records: usize,
    /// Sum over every matched deal, including those with no month.
    pub grand_total: StageAmounts,
    pub pipeline: PeriodTable,
    pub pipeline_rows: Vec<PipelineRow>,
    pub trends: Vec<PeriodTrend>,
    pub funnel: FunnelSnapshot,
    pub metrics: PipelineMetrics,
    pub insights: Vec<Insight>,
    pub insight_messages: Vec<String>,
    pub avp_leaderboard: GroupTable,
    pub brand_leaderboard: GroupTable,
    pub sbu_leaderboard: GroupTable,
    pub performance: Vec<AvpPerformance>,
    pub brand_treemap: Vec<BrandShare>,
    pub trend_series: TrendSeries,
    pub revenue: Option<RevenueSummary>,
}

impl DashboardView {
    /// True when the selection matched nothing; charts that need rows show
    /// a "no data" state.
    pub fn is_empty(&self) -> bool {
        self.matched_records == 0
    }
}

pub fn compute(
    records: &[DealRecord],
    revenue: &[RevenueSummaryRecord],
    selection: &FilterSelection,
    options: ComputeOptions,
) -> DashboardView {
    let filtered = apply_filters(records, selection);
    let pipeline = aggregate_by_month(&filtered);
    let metrics = compute_metrics(&filtered, options.risk_scheme);
    let insights = generate_insights(&metrics);
    let brand_leaderboard = aggregate_by_dimension(&filtered, Dimension::Brand);

    DashboardView {
        compute_options: options,
        selection: selection.clone(),
        filter_options: filter_options(records),
        matched_records: filtered.len(),
        grand_total: grand_total(&filtered),
        pipeline_rows: pipeline.rows(),
        trends: trend_deltas(&pipeline),
        funnel: classify(&filtered, options.funnel_scheme),
        insight_messages: insight_messages(&insights),
        insights,
        metrics,
        avp_leaderboard: aggregate_by_dimension(&filtered, Dimension::Avp),
        sbu_leaderboard: aggregate_by_dimension(&filtered, Dimension::Sbu),
        performance: performance_matrix(&filtered),
        brand_treemap: revenue_treemap(&brand_leaderboard),
        brand_leaderboard,
        trend_series: trend_series(&pipeline),
        pipeline,
        revenue: (!revenue.is_empty()).then(|| revenue_summary(revenue, selection)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::TOTAL_LABEL;
    use crate::types::StageAmounts;
    use chrono::NaiveDate;

    fn records() -> Vec<DealRecord> {
        vec![
            DealRecord {
                month: NaiveDate::from_ymd_opt(2025, 10, 1),
                avp: Some("Asha".into()),
                brand: Some("Acme".into()),
                deal_type: Some("VAS".into()),
                amounts: StageAmounts::new(100_000_000.0, 0.0, 20_000_000.0, 10_000_000.0),
                statuses: [Some("x".into()), None, Some("Open".into()), Some("Won".into())],
                ..DealRecord::default()
            },
            DealRecord {
                month: NaiveDate::from_ymd_opt(2025, 11, 1),
                avp: Some("Ravi".into()),
                brand: Some("Beta".into()),
                deal_type: Some("Retainer".into()),
                amounts: StageAmounts::new(50_000_000.0, 0.0, 0.0, 0.0),
                statuses: [Some("x".into()), None, None, None],
                ..DealRecord::default()
            },
        ]
    }

    #[test]
    fn radio_type_narrows_every_view() {
        let recs = records();
        let view = compute(&recs, &[], &FilterSelection::default().with_type("VAS"), ComputeOptions::default());
        assert_eq!(view.matched_records, 1);
        assert_eq!(view.pipeline_rows.len(), 2);
        assert_eq!(view.pipeline_rows[1].month, TOTAL_LABEL);
        assert_eq!(view.funnel.counts, [1, 0, 1, 1]);
        assert_eq!(view.avp_leaderboard.groups.len(), 1);
        // Options always describe the full data set.
        assert_eq!(view.filter_options.types, vec!["Retainer", "VAS"]);
        assert!(view.revenue.is_none());
    }

    #[test]
    fn empty_selection_result_is_zero_filled() {
        let recs = records();
        let view = compute(&recs, &[], &FilterSelection::default().with_type("Project"), ComputeOptions::default());
        assert!(view.is_empty());
        assert_eq!(view.pipeline.total, StageAmounts::default());
        assert_eq!(view.funnel.counts, [0; 4]);
        assert!(view.brand_treemap.is_empty());
        assert!(view.insights.is_empty());
        assert_eq!(view.insight_messages.len(), 1);
    }

    #[test]
    fn undated_deals_count_in_money_metrics_but_not_month_rows() {
        let recs = vec![DealRecord {
            avp: Some("Asha".into()),
            brand: Some("Acme".into()),
            amounts: StageAmounts::new(0.0, 30_000_000.0, 40_000_000.0, 20_000_000.0),
            statuses: [None, None, Some("Open".into()), Some("Won".into())],
            ..DealRecord::default()
        }];
        let view = compute(&recs, &[], &FilterSelection::default(), ComputeOptions::default());
        assert_eq!(view.pipeline.total, StageAmounts::default());
        assert_eq!(view.pipeline_rows.len(), 1);
        assert_eq!(view.grand_total, recs[0].amounts);
        assert!((view.metrics.forecast_potential_cr - 2.0).abs() < 1e-9);
        assert!((view.metrics.kpis.realized_cr - 2.0).abs() < 1e-9);
        assert!((view.metrics.kpis.open_pipeline_cr - 7.0).abs() < 1e-9);
        assert_eq!(view.metrics.kpis.won_deals, 1);
        assert!(matches!(view.insights.first(), Some(Insight::Forecast { .. })));
    }
}
