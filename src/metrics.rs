//! Derived pipeline metrics: conversion rates, bottleneck, concentration,
//! top performer, stalled brands, coaching candidates and the deep-dive
//! tables. Every ratio here is defined as 0 when its denominator is 0.

use crate::aggregate::{aggregate_by_dimension, grand_total, GroupAggregate, GroupTable};
use crate::funnel::is_won;
use crate::types::{DealRecord, Dimension, Stage, StageAmounts};
use crate::util::{percent, ratio, to_crore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tabled::Tabled;

/// Brands holding more than 5 Cr of pitch + negotiation value with nothing
/// closed are stalled. Also the minimum pipeline for a coaching callout.
pub const STALLED_PIPELINE_THRESHOLD: f64 = 50_000_000.0;

/// Share of negotiation value assumed to close.
pub const NEGOTIATION_CLOSE_PROBABILITY: f64 = 0.5;

pub const CONCENTRATION_TOP_N: usize = 3;
pub const TREEMAP_TOP_N: usize = 5;
pub const OTHERS_LABEL: &str = "Others";

/// Deals that reached each stage, by presence of the stage status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StagePresence {
    pub ideation: usize,
    pub pitch: usize,
    pub negotiation: usize,
    pub won: usize,
}

pub fn stage_presence(records: &[&DealRecord]) -> StagePresence {
    let present = |stage: Stage| records.iter().filter(|r| r.status(stage).is_some()).count();
    StagePresence {
        ideation: present(Stage::Ideation),
        pitch: present(Stage::Pitch),
        negotiation: present(Stage::Negotiation),
        won: records.iter().filter(|r| is_won(r)).count(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Transition {
    IdeationToPitch,
    PitchToNegotiation,
    NegotiationToClosed,
}

impl Transition {
    pub const ALL: [Transition; 3] =
        [Transition::IdeationToPitch, Transition::PitchToNegotiation, Transition::NegotiationToClosed];

    pub fn label(self) -> &'static str {
        match self {
            Transition::IdeationToPitch => "C0→C1",
            Transition::PitchToNegotiation => "C1→C2",
            Transition::NegotiationToClosed => "C2→C3",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConversionRate {
    pub transition: Transition,
    pub rate_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionMetrics {
    pub presence: StagePresence,
    pub rates: [ConversionRate; 3],
    /// Won deals over ideation deals.
    pub overall_pct: f64,
}

impl ConversionMetrics {
    /// The adjacent transition with the lowest rate; the earliest wins ties.
    pub fn bottleneck(&self) -> ConversionRate {
        let mut worst = self.rates[0];
        for r in &self.rates[1..] {
            if r.rate_pct < worst.rate_pct {
                worst = *r;
            }
        }
        worst
    }
}

pub fn conversion_metrics(records: &[&DealRecord]) -> ConversionMetrics {
    let p = stage_presence(records);
    let counts = [p.ideation, p.pitch, p.negotiation, p.won];
    let rates = [0, 1, 2].map(|i| ConversionRate {
        transition: Transition::ALL[i],
        rate_pct: percent(counts[i + 1] as f64, counts[i] as f64),
    });
    ConversionMetrics { presence: p, rates, overall_pct: percent(p.won as f64, p.ideation as f64) }
}

/// Expected unlock from deals in negotiation, in crore.
pub fn forecast_potential_cr(total: &StageAmounts) -> f64 {
    to_crore(total.c2 * NEGOTIATION_CLOSE_PROBABILITY)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum RiskScheme {
    /// `>50%` HIGH, `>30%` MEDIUM, else LOW; always reported.
    ThreeTier,
    /// `>70%` HIGH, else LOW; reported only when HIGH.
    SingleThreshold,
}

impl RiskScheme {
    pub fn classify(self, ratio_pct: f64) -> RiskLevel {
        match self {
            RiskScheme::ThreeTier if ratio_pct > 50.0 => RiskLevel::High,
            RiskScheme::ThreeTier if ratio_pct > 30.0 => RiskLevel::Medium,
            RiskScheme::ThreeTier => RiskLevel::Low,
            RiskScheme::SingleThreshold if ratio_pct > 70.0 => RiskLevel::High,
            RiskScheme::SingleThreshold => RiskLevel::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskLevel::High => "HIGH",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::Low => "LOW",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Concentration {
    pub scheme: RiskScheme,
    pub ratio_pct: f64,
    pub level: RiskLevel,
    pub top_brands: Vec<String>,
}

/// Share of closed revenue held by the top three brands. `None` when nothing
/// has closed.
pub fn concentration(brands: &GroupTable, scheme: RiskScheme) -> Option<Concentration> {
    let total = brands.total.c3;
    if total <= 0.0 {
        return None;
    }
    let top: Vec<_> = brands.ranked_by(Stage::Closed).into_iter().take(CONCENTRATION_TOP_N).collect();
    let top_sum: f64 = top.iter().map(|g| g.amounts.c3).sum();
    let ratio_pct = percent(top_sum, total);
    Some(Concentration {
        scheme,
        ratio_pct,
        level: scheme.classify(ratio_pct),
        top_brands: top.iter().map(|g| g.name.clone()).collect(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopPerformer {
    pub avp: String,
    pub realized_cr: f64,
    /// Closed value over open pipeline (C0 + C1 + C2).
    pub conversion_pct: f64,
}

pub fn top_performer(avps: &GroupTable) -> Option<TopPerformer> {
    let best = avps.ranked_by(Stage::Closed).into_iter().next()?;
    Some(TopPerformer {
        avp: best.name.clone(),
        realized_cr: to_crore(best.amounts.c3),
        conversion_pct: percent(best.amounts.c3, best.amounts.pipeline()),
    })
}

/// Brands with large pitch + negotiation value and no closures, in name order.
pub fn stalled_brands(brands: &GroupTable) -> Vec<String> {
    brands
        .groups
        .iter()
        .filter(|g| g.amounts.c1 + g.amounts.c2 > STALLED_PIPELINE_THRESHOLD && g.amounts.c3 == 0.0)
        .map(|g| g.name.clone())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoachingOpportunity {
    pub avp: String,
    pub pipeline_cr: f64,
    pub conversion_pct: f64,
    pub team_conversion_pct: f64,
}

/// The owner with the largest open pipeline (at least 5 Cr) who converts
/// below the team rate.
pub fn coaching_opportunity(avps: &GroupTable) -> Option<CoachingOpportunity> {
    let team_pct = percent(avps.total.c3, avps.total.pipeline());
    let mut best: Option<&GroupAggregate> = None;
    for g in &avps.groups {
        let pipeline = g.amounts.pipeline();
        if pipeline < STALLED_PIPELINE_THRESHOLD || percent(g.amounts.c3, pipeline) >= team_pct {
            continue;
        }
        if best.map_or(true, |b| pipeline > b.amounts.pipeline()) {
            best = Some(g);
        }
    }
    best.map(|g| CoachingOpportunity {
        avp: g.name.clone(),
        pipeline_cr: to_crore(g.amounts.pipeline()),
        conversion_pct: percent(g.amounts.c3, g.amounts.pipeline()),
        team_conversion_pct: team_pct,
    })
}

fn two_dp(v: &f64) -> String {
    format!("{:.2}", v)
}

fn one_dp(v: &f64) -> String {
    format!("{:.1}", v)
}

/// One point of the owner performance scatter.
#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct AvpPerformance {
    #[tabled(rename = "AVP")]
    pub avp: String,
    #[tabled(rename = "Total Pipeline (Cr)", display_with = "two_dp")]
    pub total_pipeline_cr: f64,
    #[tabled(rename = "Closed Revenue (Cr)", display_with = "two_dp")]
    pub closed_revenue_cr: f64,
    /// C3 over C0.
    #[tabled(rename = "Conversion Rate (%)", display_with = "one_dp")]
    pub conversion_rate_pct: f64,
    #[tabled(rename = "Deal Count")]
    pub deal_count: usize,
    #[tabled(rename = "Avg Deal Size (Cr)", display_with = "two_dp")]
    pub avg_deal_size_cr: f64,
}

pub fn performance_matrix(records: &[&DealRecord]) -> Vec<AvpPerformance> {
    let mut deals: BTreeMap<&str, usize> = BTreeMap::new();
    for r in records {
        if let Some(avp) = r.avp.as_deref() {
            *deals.entry(avp).or_default() += 1;
        }
    }
    aggregate_by_dimension(records, Dimension::Avp)
        .groups
        .into_iter()
        .map(|g| {
            let deal_count = deals.get(g.name.as_str()).copied().unwrap_or(0);
            let closed_cr = to_crore(g.amounts.c3);
            AvpPerformance {
                total_pipeline_cr: to_crore(g.amounts.pipeline()),
                closed_revenue_cr: closed_cr,
                conversion_rate_pct: percent(g.amounts.c3, g.amounts.c0),
                deal_count,
                avg_deal_size_cr: ratio(closed_cr, deal_count as f64),
                avp: g.name,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct BrandShare {
    #[tabled(rename = "Brand")]
    pub brand: String,
    #[tabled(rename = "Revenue (Cr)", display_with = "two_dp")]
    pub revenue_cr: f64,
    #[tabled(rename = "Share (%)", display_with = "one_dp")]
    pub share_pct: f64,
}

/// Top five brands by closed revenue plus an `Others` bucket when the
/// remainder is positive. Empty when nothing has closed.
pub fn revenue_treemap(brands: &GroupTable) -> Vec<BrandShare> {
    let total = brands.total.c3;
    if total <= 0.0 {
        return Vec::new();
    }
    let ranked = brands.ranked_by(Stage::Closed);
    let share = |name: &str, value: f64| BrandShare {
        brand: name.to_string(),
        revenue_cr: to_crore(value),
        share_pct: percent(value, total),
    };
    let mut out: Vec<BrandShare> =
        ranked.iter().take(TREEMAP_TOP_N).map(|g| share(&g.name, g.amounts.c3)).collect();
    let others: f64 = ranked.iter().skip(TREEMAP_TOP_N).map(|g| g.amounts.c3).sum();
    if others > 0.0 {
        out.push(share(OTHERS_LABEL, others));
    }
    out
}

/// Headline numbers for the deep-dive view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeadlineKpis {
    pub ideation_deals: usize,
    pub won_deals: usize,
    pub overall_conversion_pct: f64,
    pub realized_cr: f64,
    pub open_pipeline_cr: f64,
}

/// Everything the insight battery reads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineMetrics {
    pub conversion: ConversionMetrics,
    pub bottleneck: ConversionRate,
    pub forecast_potential_cr: f64,
    pub concentration: Option<Concentration>,
    pub top_performer: Option<TopPerformer>,
    pub stalled_brands: Vec<String>,
    pub coaching: Option<CoachingOpportunity>,
    pub kpis: HeadlineKpis,
}

/// Derive every metric from the filtered records. Money figures use the
/// grand total, so undated deals count here like they do in the funnel.
pub fn compute_metrics(records: &[&DealRecord], scheme: RiskScheme) -> PipelineMetrics {
    let total = grand_total(records);
    let brands = aggregate_by_dimension(records, Dimension::Brand);
    let avps = aggregate_by_dimension(records, Dimension::Avp);
    let conversion = conversion_metrics(records);
    let kpis = HeadlineKpis {
        ideation_deals: conversion.presence.ideation,
        won_deals: conversion.presence.won,
        overall_conversion_pct: conversion.overall_pct,
        realized_cr: to_crore(total.c3),
        open_pipeline_cr: to_crore(total.pipeline()),
    };
    PipelineMetrics {
        bottleneck: conversion.bottleneck(),
        conversion,
        forecast_potential_cr: forecast_potential_cr(&total),
        concentration: concentration(&brands, scheme),
        top_performer: top_performer(&avps),
        stalled_brands: stalled_brands(&brands),
        coaching: coaching_opportunity(&avps),
        kpis,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn deal(avp: &str, brand: &str, amounts: [f64; 4]) -> DealRecord {
        DealRecord {
            avp: Some(avp.to_string()),
            brand: Some(brand.to_string()),
            amounts: StageAmounts::new(amounts[0], amounts[1], amounts[2], amounts[3]),
            ..DealRecord::default()
        }
    }

    fn statuses(values: [Option<&str>; 4]) -> DealRecord {
        DealRecord { statuses: values.map(|v| v.map(str::to_string)), ..DealRecord::default() }
    }

    fn refs(records: &[DealRecord]) -> Vec<&DealRecord> {
        records.iter().collect()
    }

    #[test]
    fn conversion_uses_presence_counts() {
        let records = vec![
            statuses([Some("a"), Some("Dropped"), Some("Lost"), Some("Won")]),
            statuses([Some("a"), Some("x"), None, None]),
            statuses([Some("a"), None, None, Some(" Won ")]),
            statuses([Some("a"), None, None, Some("won")]),
        ];
        let m = conversion_metrics(&refs(&records));
        assert_eq!(m.presence, StagePresence { ideation: 4, pitch: 2, negotiation: 1, won: 2 });
        assert_eq!(m.rates[0].rate_pct, 50.0);
        assert_eq!(m.rates[1].rate_pct, 50.0);
        assert_eq!(m.rates[2].rate_pct, 200.0);
        assert_eq!(m.overall_pct, 50.0);
        // Ties resolve to the earliest transition.
        assert_eq!(m.bottleneck().transition, Transition::IdeationToPitch);
    }

    #[test]
    fn zero_denominators_give_zero_rates() {
        let m = conversion_metrics(&[]);
        assert!(m.rates.iter().all(|r| r.rate_pct == 0.0));
        assert_eq!(m.overall_pct, 0.0);

        let records = vec![statuses([None, None, None, Some("Won")])];
        let m = conversion_metrics(&refs(&records));
        assert_eq!(m.rates[2].rate_pct, 0.0);
        assert_eq!(m.overall_pct, 0.0);
    }

    #[test]
    fn forecast_potential_is_half_of_negotiation_in_crore() {
        let total = StageAmounts::new(0.0, 0.0, 30_000_000.0, 0.0);
        assert_eq!(forecast_potential_cr(&total), 1.5);
    }

    #[test]
    fn concentration_at_exactly_fifty_thirty_twenty_is_high() {
        let records = vec![
            deal("A", "Acme", [0.0, 0.0, 0.0, 50.0]),
            deal("A", "Beta", [0.0, 0.0, 0.0, 30.0]),
            deal("A", "Core", [0.0, 0.0, 0.0, 20.0]),
        ];
        let brands = aggregate_by_dimension(&refs(&records), Dimension::Brand);
        let c = concentration(&brands, RiskScheme::ThreeTier).unwrap();
        assert_eq!(c.ratio_pct, 100.0);
        assert_eq!(c.level, RiskLevel::High);
        assert_eq!(c.top_brands, vec!["Acme", "Beta", "Core"]);

        let single = concentration(&brands, RiskScheme::SingleThreshold).unwrap();
        assert_eq!(single.level, RiskLevel::High);
    }

    #[test]
    fn risk_thresholds_are_strict() {
        assert_eq!(RiskScheme::ThreeTier.classify(50.0), RiskLevel::Medium);
        assert_eq!(RiskScheme::ThreeTier.classify(30.0), RiskLevel::Low);
        assert_eq!(RiskScheme::ThreeTier.classify(30.1), RiskLevel::Medium);
        assert_eq!(RiskScheme::SingleThreshold.classify(70.0), RiskLevel::Low);
        assert_eq!(RiskScheme::SingleThreshold.classify(60.0), RiskLevel::Low);
        assert_eq!(RiskScheme::SingleThreshold.classify(70.5), RiskLevel::High);
    }

    #[test]
    fn no_closed_revenue_means_no_concentration() {
        let records = vec![deal("A", "Acme", [5.0, 0.0, 0.0, 0.0])];
        let brands = aggregate_by_dimension(&refs(&records), Dimension::Brand);
        assert_eq!(concentration(&brands, RiskScheme::ThreeTier), None);
        assert!(revenue_treemap(&brands).is_empty());
    }

    #[test]
    fn top_performer_guards_zero_pipeline() {
        let records = vec![
            deal("Asha", "Acme", [0.0, 0.0, 0.0, 20_000_000.0]),
            deal("Ravi", "Beta", [10.0, 0.0, 0.0, 5.0]),
        ];
        let avps = aggregate_by_dimension(&refs(&records), Dimension::Avp);
        let top = top_performer(&avps).unwrap();
        assert_eq!(top.avp, "Asha");
        assert_eq!(top.realized_cr, 2.0);
        assert_eq!(top.conversion_pct, 0.0);

        let empty = aggregate_by_dimension(&[], Dimension::Avp);
        assert_eq!(top_performer(&empty), None);
    }

    #[test]
    fn stalled_requires_large_pipeline_and_no_closures() {
        let records = vec![
            deal("A", "Acme", [0.0, 30_000_000.0, 30_000_000.0, 0.0]),
            deal("A", "Beta", [0.0, 30_000_000.0, 30_000_000.0, 1.0]),
            deal("A", "Core", [0.0, 25_000_000.0, 25_000_000.0, 0.0]),
            deal("A", "Dyno", [90_000_000.0, 0.0, 60_000_000.0, 0.0]),
        ];
        let brands = aggregate_by_dimension(&refs(&records), Dimension::Brand);
        assert_eq!(stalled_brands(&brands), vec!["Acme", "Dyno"]);
    }

    #[test]
    fn coaching_picks_largest_underperforming_pipeline() {
        let records = vec![
            deal("Asha", "X", [60_000_000.0, 0.0, 0.0, 30_000_000.0]),
            deal("Ravi", "X", [80_000_000.0, 0.0, 0.0, 1_000_000.0]),
            deal("Meera", "X", [100_000_000.0, 0.0, 0.0, 2_000_000.0]),
            deal("Dev", "X", [1_000_000.0, 0.0, 0.0, 0.0]),
        ];
        let avps = aggregate_by_dimension(&refs(&records), Dimension::Avp);
        let c = coaching_opportunity(&avps).unwrap();
        assert_eq!(c.avp, "Meera");
        assert_eq!(c.pipeline_cr, 10.0);
        assert!((c.conversion_pct - 2.0).abs() < 1e-9);
    }

    #[test]
    fn treemap_buckets_tail_into_others() {
        let records: Vec<DealRecord> = ["A", "B", "C", "D", "E", "F", "G"]
            .iter()
            .enumerate()
            .map(|(i, b)| deal("X", b, [0.0, 0.0, 0.0, 10.0 * (7 - i) as f64]))
            .collect();
        let brands = aggregate_by_dimension(&refs(&records), Dimension::Brand);
        let tree = revenue_treemap(&brands);
        let names: Vec<&str> = tree.iter().map(|s| s.brand.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C", "D", "E", OTHERS_LABEL]);
        // F + G = 20 + 10 of 280.
        assert!((tree[5].share_pct - 30.0 / 280.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn performance_matrix_counts_deals_per_owner() {
        let records = vec![
            deal("Asha", "X", [100_000_000.0, 0.0, 0.0, 20_000_000.0]),
            deal("Asha", "Y", [0.0, 0.0, 0.0, 20_000_000.0]),
            deal("Ravi", "X", [0.0, 0.0, 0.0, 10_000_000.0]),
        ];
        let rows = performance_matrix(&refs(&records));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].deal_count, 2);
        assert!((rows[0].conversion_rate_pct - 40.0).abs() < 1e-9);
        assert_eq!(rows[0].avg_deal_size_cr, 2.0);
        // C0 of zero gives a zero rate rather than infinity.
        assert_eq!(rows[1].conversion_rate_pct, 0.0);
    }
}
