//! Insight generator: a fixed battery of advisory checks over the metrics.
//!
//! Each check stands alone and emits at most one insight. Output order is
//! fixed: forecast, bottleneck, top performer, concentration risk, stalled
//! opportunities, coaching opportunity.

use crate::metrics::{PipelineMetrics, RiskLevel, RiskScheme, Transition};
use serde::Serialize;
use std::fmt;

pub const NO_ANOMALIES: &str = "Dashboard reflects stable performance. No critical anomalies detected.";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Insight {
    Forecast {
        potential_cr: f64,
    },
    Bottleneck {
        transition: Transition,
        rate_pct: f64,
    },
    TopPerformer {
        avp: String,
        realized_cr: f64,
        conversion_pct: f64,
    },
    ConcentrationRisk {
        level: RiskLevel,
        ratio_pct: f64,
    },
    StalledOpportunities {
        count: usize,
        example_brand: String,
    },
    CoachingOpportunity {
        avp: String,
        pipeline_cr: f64,
        conversion_pct: f64,
        team_conversion_pct: f64,
    },
}

impl fmt::Display for Insight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Insight::Forecast { potential_cr } => write!(
                f,
                "Revenue Forecast: Pipeline data suggests a potential unlock of ₹{:.2} Cr from deals \
                 currently in 'Negotiation' (assuming 50% closure probability). Focus on closing these C2 deals.",
                potential_cr
            ),
            Insight::Bottleneck { transition, rate_pct } => write!(
                f,
                "Bottleneck Alert: The lowest conversion rate is at {} stage ({:.1}%). Focus on improving \
                 this transition to unlock pipeline potential.",
                transition, rate_pct
            ),
            Insight::TopPerformer { avp, realized_cr, conversion_pct } => write!(
                f,
                "Top Performer: {} is leading with ₹{:.1} Cr realized value and {:.1}% conversion rate.",
                avp, realized_cr, conversion_pct
            ),
            Insight::ConcentrationRisk { level, ratio_pct } => {
                let advice = match level {
                    RiskLevel::High => "Consider diversifying client base.",
                    RiskLevel::Medium => "Monitor closely.",
                    RiskLevel::Low => "Healthy distribution.",
                };
                write!(
                    f,
                    "Concentration Risk ({}): The top 3 brands contribute {:.1}% of revenue. {}",
                    level, ratio_pct, advice
                )
            }
            Insight::StalledOpportunities { count, example_brand } => write!(
                f,
                "Stalled Opportunities: There are {} brands (e.g., {}) with significant pipeline value \
                 (>₹5 Cr) but zero closures. Immediate review required.",
                count, example_brand
            ),
            Insight::CoachingOpportunity { avp, pipeline_cr, conversion_pct, team_conversion_pct } => write!(
                f,
                "Coaching Opportunity: {} holds ₹{:.1} Cr of open pipeline but converts at {:.1}% against \
                 a team rate of {:.1}%. Pair on the largest open deals.",
                avp, pipeline_cr, conversion_pct, team_conversion_pct
            ),
        }
    }
}

fn forecast(m: &PipelineMetrics) -> Option<Insight> {
    (m.forecast_potential_cr > 0.0).then_some(Insight::Forecast { potential_cr: m.forecast_potential_cr })
}

// A funnel with no ideation deals has no transition worth naming.
fn bottleneck(m: &PipelineMetrics) -> Option<Insight> {
    (m.conversion.presence.ideation > 0).then_some(Insight::Bottleneck {
        transition: m.bottleneck.transition,
        rate_pct: m.bottleneck.rate_pct,
    })
}

fn top_performer(m: &PipelineMetrics) -> Option<Insight> {
    m.top_performer.as_ref().map(|t| Insight::TopPerformer {
        avp: t.avp.clone(),
        realized_cr: t.realized_cr,
        conversion_pct: t.conversion_pct,
    })
}

fn concentration_risk(m: &PipelineMetrics) -> Option<Insight> {
    let c = m.concentration.as_ref()?;
    if c.scheme == RiskScheme::SingleThreshold && c.level != RiskLevel::High {
        return None;
    }
    Some(Insight::ConcentrationRisk { level: c.level, ratio_pct: c.ratio_pct })
}

fn stalled(m: &PipelineMetrics) -> Option<Insight> {
    let example = m.stalled_brands.first()?;
    Some(Insight::StalledOpportunities { count: m.stalled_brands.len(), example_brand: example.clone() })
}

fn coaching(m: &PipelineMetrics) -> Option<Insight> {
    m.coaching.as_ref().map(|c| Insight::CoachingOpportunity {
        avp: c.avp.clone(),
        pipeline_cr: c.pipeline_cr,
        conversion_pct: c.conversion_pct,
        team_conversion_pct: c.team_conversion_pct,
    })
}

pub fn generate_insights(metrics: &PipelineMetrics) -> Vec<Insight> {
    let checks: [fn(&PipelineMetrics) -> Option<Insight>; 6] =
        [forecast, bottleneck, top_performer, concentration_risk, stalled, coaching];
    checks.iter().filter_map(|check| check(metrics)).collect()
}

/// Rendered messages, or the single "no anomalies" line when nothing fired.
pub fn insight_messages(insights: &[Insight]) -> Vec<String> {
    if insights.is_empty() {
        return vec![NO_ANOMALIES.to_string()];
    }
    insights.iter().map(Insight::to_string).collect()
}
