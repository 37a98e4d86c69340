//! Filter engine: user selections applied to the normalized record set.
//!
//! Dimensions combine with AND; values inside one multi-select combine
//! with OR. An empty multi-select does not filter.

use crate::types::{DealRecord, Dimension, MonthKey};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// How the deal `Type` dimension is selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TypeSelector {
    /// Any of the listed types; empty means all.
    MultiSelect(BTreeSet<String>),
    /// Exactly one type, always applied.
    Radio(String),
}

impl Default for TypeSelector {
    fn default() -> Self {
        TypeSelector::MultiSelect(BTreeSet::new())
    }
}

/// The full set of filter choices for one dashboard computation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterSelection {
    /// Month labels such as `Oct 2025`.
    pub months: BTreeSet<String>,
    pub avps: BTreeSet<String>,
    pub brands: BTreeSet<String>,
    pub sbus: BTreeSet<String>,
    pub deal_type: TypeSelector,
}

impl FilterSelection {
    pub fn with_type(mut self, value: impl Into<String>) -> Self {
        self.deal_type = TypeSelector::Radio(value.into());
        self
    }

    pub fn is_unfiltered(&self) -> bool {
        self.months.is_empty()
            && self.avps.is_empty()
            && self.brands.is_empty()
            && self.sbus.is_empty()
            && self.deal_type == TypeSelector::default()
    }

    pub fn matches(&self, record: &DealRecord) -> bool {
        if !self.months.is_empty() {
            match record.month_label() {
                Some(label) if self.months.contains(&label) => {}
                _ => return false,
            }
        }
        let allowed = |set: &BTreeSet<String>, dim: Dimension| {
            set.is_empty() || record.dimension(dim).is_some_and(|v| set.contains(v))
        };
        if !allowed(&self.avps, Dimension::Avp)
            || !allowed(&self.brands, Dimension::Brand)
            || !allowed(&self.sbus, Dimension::Sbu)
        {
            return false;
        }
        match &self.deal_type {
            TypeSelector::MultiSelect(set) => allowed(set, Dimension::Type),
            TypeSelector::Radio(value) => record.deal_type.as_deref() == Some(value.as_str()),
        }
    }
}

/// Records matching every supplied predicate, in input order.
pub fn apply_filters<'a>(records: &'a [DealRecord], selection: &FilterSelection) -> Vec<&'a DealRecord> {
    records.iter().filter(|r| selection.matches(r)).collect()
}

/// Distinct values per filterable dimension, ready for selection widgets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    /// Chronological.
    pub months: Vec<String>,
    pub avps: Vec<String>,
    pub brands: Vec<String>,
    pub types: Vec<String>,
    pub sbus: Vec<String>,
}

pub fn filter_options(records: &[DealRecord]) -> FilterOptions {
    let distinct = |dim: Dimension| -> Vec<String> {
        records
            .iter()
            .filter_map(|r| r.dimension(dim))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    };
    let months: BTreeMap<MonthKey, String> = records
        .iter()
        .filter_map(|r| r.month_key())
        .map(|k| (k, k.label()))
        .collect();
    FilterOptions {
        months: months.into_values().collect(),
        avps: distinct(Dimension::Avp),
        brands: distinct(Dimension::Brand),
        types: distinct(Dimension::Type),
        sbus: distinct(Dimension::Sbu),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn deal(month: Option<(i32, u32)>, avp: &str, brand: &str, ty: &str, sbu: Option<&str>) -> DealRecord {
        DealRecord {
            month: month.and_then(|(y, m)| NaiveDate::from_ymd_opt(y, m, 1)),
            avp: Some(avp.to_string()),
            brand: Some(brand.to_string()),
            deal_type: Some(ty.to_string()),
            sbu: sbu.map(str::to_string),
            ..DealRecord::default()
        }
    }

    fn sample() -> Vec<DealRecord> {
        vec![
            deal(Some((2025, 11)), "Asha", "Acme", "VAS", Some("North")),
            deal(Some((2025, 10)), "Ravi", "Beta", "Retainer", Some("South")),
            deal(Some((2026, 1)), "Asha", "Beta", "VAS", None),
            deal(None, "Meera", "Acme", "VAS", Some("North")),
        ]
    }

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn empty_selection_keeps_everything() {
        let records = sample();
        assert!(FilterSelection::default().is_unfiltered());
        assert_eq!(apply_filters(&records, &FilterSelection::default()).len(), 4);
    }

    #[test]
    fn dimensions_and_together_values_or_together() {
        let records = sample();
        let selection = FilterSelection {
            avps: set(&["Asha", "Meera"]),
            brands: set(&["Acme"]),
            ..FilterSelection::default()
        };
        let hits = apply_filters(&records, &selection);
        let avps: Vec<_> = hits.iter().map(|r| r.avp.as_deref().unwrap()).collect();
        assert_eq!(avps, vec!["Asha", "Meera"]);
    }

    #[test]
    fn month_filter_excludes_undated_rows() {
        let records = sample();
        let selection = FilterSelection { months: set(&["Nov 2025", "Jan 2026"]), ..FilterSelection::default() };
        assert_eq!(apply_filters(&records, &selection).len(), 2);
    }

    #[test]
    fn radio_type_always_applies() {
        let records = sample();
        let selection = FilterSelection::default().with_type("Retainer");
        assert!(!selection.is_unfiltered());
        let hits = apply_filters(&records, &selection);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].avp.as_deref(), Some("Ravi"));

        let none = FilterSelection::default().with_type("Project");
        assert!(apply_filters(&records, &none).is_empty());
    }

    #[test]
    fn sbu_filter_drops_records_without_sbu() {
        let records = sample();
        let selection = FilterSelection { sbus: set(&["North"]), ..FilterSelection::default() };
        assert_eq!(apply_filters(&records, &selection).len(), 2);
    }

    #[test]
    fn options_are_sorted_and_distinct() {
        let options = filter_options(&sample());
        assert_eq!(options.months, vec!["Oct 2025", "Nov 2025", "Jan 2026"]);
        assert_eq!(options.avps, vec!["Asha", "Meera", "Ravi"]);
        assert_eq!(options.brands, vec!["Acme", "Beta"]);
        assert_eq!(options.types, vec!["Retainer", "VAS"]);
        assert_eq!(options.sbus, vec!["North", "South"]);
    }

    #[test]
    fn options_for_missing_column_are_empty() {
        let records = vec![DealRecord::default()];
        assert_eq!(filter_options(&records), FilterOptions::default());
    }
}
