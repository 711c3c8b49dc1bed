use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::deal::{DealSize, Priority, TimeStatus};
use crate::stage::StageId;

/// Named shortcut applied before the general predicate set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickFilter {
    MyDeals,
    HotDeals,
    ClosingSoon,
    StaleDeals,
    Recent,
    #[default]
    All,
}

impl QuickFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MyDeals => "my_deals",
            Self::HotDeals => "hot_deals",
            Self::ClosingSoon => "closing_soon",
            Self::StaleDeals => "stale_deals",
            Self::Recent => "recent",
            Self::All => "all",
        }
    }
}

impl FromStr for QuickFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "my_deals" => Ok(Self::MyDeals),
            "hot_deals" => Ok(Self::HotDeals),
            "closing_soon" => Ok(Self::ClosingSoon),
            "stale_deals" => Ok(Self::StaleDeals),
            "recent" => Ok(Self::Recent),
            "all" => Ok(Self::All),
            _ => Err(format!("Invalid quick filter: {}", s)),
        }
    }
}

/// Deal field a [`DateRange`] applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateField {
    #[default]
    CreatedAt,
    UpdatedAt,
    StageChangedAt,
    ExpectedCloseDate,
}

/// Inclusive calendar-date window (UTC).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default)]
    pub field: DateField,
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to)
    }
}

/// The structured predicate set a board is filtered by.
///
/// Every predicate is ANDed with the others; an absent or empty value places
/// no constraint. `quick_filter` runs as a pre-pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSet {
    pub min_value: Option<Decimal>,
    pub max_value: Option<Decimal>,
    pub min_probability: Option<u8>,
    /// Deal must carry at least one of these tags.
    pub tags: Vec<String>,
    pub date_range: Option<DateRange>,
    pub stage_ids: Vec<StageId>,
    pub priorities: Vec<Priority>,
    pub deal_sizes: Vec<DealSize>,
    pub lead_sources: Vec<String>,
    pub min_days_in_stage: Option<i64>,
    pub max_days_in_stage: Option<i64>,
    pub time_statuses: Vec<TimeStatus>,
    pub quick_filter: QuickFilter,
}

impl FilterSet {
    /// Number of active predicates, quick filter included.
    pub fn active_count(&self) -> usize {
        [
            self.min_value.is_some(),
            self.max_value.is_some(),
            self.min_probability.is_some(),
            !self.tags.is_empty(),
            self.date_range.as_ref().is_some_and(|r| !r.is_unbounded()),
            !self.stage_ids.is_empty(),
            !self.priorities.is_empty(),
            !self.deal_sizes.is_empty(),
            !self.lead_sources.is_empty(),
            self.min_days_in_stage.is_some(),
            self.max_days_in_stage.is_some(),
            !self.time_statuses.is_empty(),
            self.quick_filter != QuickFilter::All,
        ]
        .into_iter()
        .filter(|active| *active)
        .count()
    }

    pub fn is_empty(&self) -> bool {
        self.active_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_set_is_empty() {
        let filters = FilterSet::default();
        assert!(filters.is_empty());
        assert_eq!(filters.quick_filter, QuickFilter::All);
    }

    #[test]
    fn unbounded_date_range_does_not_count() {
        let filters = FilterSet {
            date_range: Some(DateRange::default()),
            ..Default::default()
        };
        assert!(filters.is_empty());
    }

    #[test]
    fn active_count_includes_quick_filter() {
        let filters = FilterSet {
            min_value: Some(Decimal::from(500)),
            priorities: vec![Priority::High],
            quick_filter: QuickFilter::HotDeals,
            ..Default::default()
        };
        assert_eq!(filters.active_count(), 3);
    }

    #[test]
    fn date_range_is_inclusive() {
        let range = DateRange {
            field: DateField::CreatedAt,
            from: NaiveDate::from_ymd_opt(2024, 3, 1),
            to: NaiveDate::from_ymd_opt(2024, 3, 31),
        };
        assert!(range.contains(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()));
        assert!(range.contains(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()));
    }

    #[test]
    fn filter_set_deserializes_partial_json() {
        let filters: FilterSet = serde_json::from_str(
            r#"{"min_value": 500, "quick_filter": "stale_deals", "time_statuses": ["danger"]}"#,
        )
        .unwrap();
        assert_eq!(filters.min_value, Some(Decimal::from(500)));
        assert_eq!(filters.quick_filter, QuickFilter::StaleDeals);
        assert_eq!(filters.time_statuses, vec![TimeStatus::Danger]);
        assert!(filters.tags.is_empty());
    }

    #[test]
    fn quick_filter_parses_names() {
        assert_eq!(
            QuickFilter::from_str("closing_soon").unwrap(),
            QuickFilter::ClosingSoon
        );
        assert!(QuickFilter::from_str("closing-soon").is_err());
    }
}
