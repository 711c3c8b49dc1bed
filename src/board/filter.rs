//! Filter & aggregation engine.
//!
//! [`compute`] is a pure function of (deals, stages, search term, filter
//! set, evaluation context). It groups the retained deals per stage and
//! derives the pipeline value metrics. It never mutates its inputs and is
//! re-run on every change to any of them.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pipeline_common::{DateField, Deal, FilterSet, QuickFilter, Stage, StageId};

use super::metrics::{TimeThresholds, days_in_stage, resolve_probability, weighted_value};

/// Lookback/lookahead window for the time-based quick filters.
pub const QUICK_FILTER_WINDOW_DAYS: i64 = 30;

/// `hot_deals` threshold on resolved probability.
pub const HOT_DEAL_MIN_PROBABILITY: u8 = 50;

/// `hot_deals` threshold on value.
pub const HOT_DEAL_MIN_VALUE: i64 = 5_000;

/// Inputs that are not part of the filter set but that predicates read.
#[derive(Debug, Clone)]
pub struct EvalContext {
    pub now: DateTime<Utc>,
    pub current_user_id: String,
    /// Thresholds used by the `time_statuses` predicate.
    pub card_thresholds: TimeThresholds,
}

impl EvalContext {
    pub fn new(now: DateTime<Utc>, current_user_id: &str) -> Self {
        Self {
            now,
            current_user_id: current_user_id.to_string(),
            card_thresholds: TimeThresholds::CARD,
        }
    }

    pub fn with_card_thresholds(mut self, thresholds: TimeThresholds) -> Self {
        self.card_thresholds = thresholds;
        self
    }

    fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageMetrics {
    pub stage_id: StageId,
    pub count: usize,
    pub value: Decimal,
    pub weighted_value: Decimal,
}

/// Engine output: filtered deals grouped per stage plus derived totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    /// One entry per catalog stage, empty columns included.
    pub by_stage: BTreeMap<StageId, Vec<Deal>>,
    pub total_value: Decimal,
    pub weighted_value: Decimal,
    /// Weighted value excluding stages whose name contains "closed".
    pub active_weighted_value: Decimal,
    /// Catalog order.
    pub per_stage_metrics: Vec<StageMetrics>,
}

impl BoardSnapshot {
    /// Stage ids in catalog order.
    pub fn stage_order(&self) -> impl Iterator<Item = StageId> + '_ {
        self.per_stage_metrics.iter().map(|m| m.stage_id)
    }

    pub fn deals_in(&self, stage_id: StageId) -> &[Deal] {
        self.by_stage
            .get(&stage_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn deal_count(&self) -> usize {
        self.by_stage.values().map(Vec::len).sum()
    }

    pub fn deals(&self) -> impl Iterator<Item = &Deal> {
        self.by_stage.values().flatten()
    }
}

/// Group and aggregate the deals that pass the quick filter and every
/// active predicate.
pub fn compute(
    deals: &[Deal],
    stages: &[Stage],
    search_term: &str,
    filters: &FilterSet,
    ctx: &EvalContext,
) -> BoardSnapshot {
    let stage_index: HashMap<StageId, &Stage> = stages.iter().map(|s| (s.id, s)).collect();
    let mut by_stage: BTreeMap<StageId, Vec<Deal>> =
        stages.iter().map(|s| (s.id, Vec::new())).collect();
    let search = SearchTerm::new(search_term);

    for deal in deals {
        // A deal whose stage is missing from the catalog has no column to
        // live in and is not retained.
        let Some(stage) = stage_index.get(&deal.stage_id).copied() else {
            continue;
        };
        if !passes_quick_filter(deal, stage, filters.quick_filter, ctx) {
            continue;
        }
        if !search.matches(deal) || !passes_predicates(deal, stage, filters, ctx) {
            continue;
        }
        if let Some(column) = by_stage.get_mut(&deal.stage_id) {
            column.push(deal.clone());
        }
    }

    let mut snapshot = BoardSnapshot::default();
    for stage in stages {
        let column = by_stage.get(&stage.id).map(Vec::as_slice).unwrap_or(&[]);
        // Sums saturate at Decimal::MAX.
        let value = column
            .iter()
            .fold(Decimal::ZERO, |acc, d| acc.saturating_add(d.value));
        let weighted = column.iter().fold(Decimal::ZERO, |acc, d| {
            acc.saturating_add(weighted_value(d, Some(stage)))
        });

        snapshot.total_value = snapshot.total_value.saturating_add(value);
        snapshot.weighted_value = snapshot.weighted_value.saturating_add(weighted);
        if !stage.is_closed() {
            snapshot.active_weighted_value =
                snapshot.active_weighted_value.saturating_add(weighted);
        }
        snapshot.per_stage_metrics.push(StageMetrics {
            stage_id: stage.id,
            count: column.len(),
            value,
            weighted_value: weighted,
        });
    }
    snapshot.by_stage = by_stage;
    snapshot
}

fn passes_quick_filter(deal: &Deal, stage: &Stage, quick: QuickFilter, ctx: &EvalContext) -> bool {
    let window = Duration::days(QUICK_FILTER_WINDOW_DAYS);
    match quick {
        QuickFilter::All => true,
        QuickFilter::MyDeals => deal.owner_id == ctx.current_user_id,
        QuickFilter::HotDeals => {
            resolve_probability(deal, Some(stage)) >= HOT_DEAL_MIN_PROBABILITY
                || deal.value >= Decimal::from(HOT_DEAL_MIN_VALUE)
        }
        QuickFilter::ClosingSoon => deal.expected_close_date.is_some_and(|close| {
            let today = ctx.today();
            close >= today && close <= today + window
        }),
        QuickFilter::StaleDeals => deal.stage_changed_at <= ctx.now - window,
        QuickFilter::Recent => deal.created_at >= ctx.now - window,
    }
}

fn passes_predicates(deal: &Deal, stage: &Stage, filters: &FilterSet, ctx: &EvalContext) -> bool {
    if filters.min_value.is_some_and(|min| deal.value < min) {
        return false;
    }
    if filters.max_value.is_some_and(|max| deal.value > max) {
        return false;
    }
    if filters
        .min_probability
        .is_some_and(|min| resolve_probability(deal, Some(stage)) < min)
    {
        return false;
    }
    if !filters.tags.is_empty()
        && !deal
            .tags
            .iter()
            .any(|tag| filters.tags.iter().any(|want| want.eq_ignore_ascii_case(tag)))
    {
        return false;
    }
    if let Some(range) = filters.date_range.as_ref().filter(|r| !r.is_unbounded()) {
        match date_for(deal, range.field) {
            Some(date) if range.contains(date) => {}
            _ => return false,
        }
    }
    if !filters.stage_ids.is_empty() && !filters.stage_ids.contains(&deal.stage_id) {
        return false;
    }
    if !filters.priorities.is_empty()
        && !deal
            .priority
            .is_some_and(|p| filters.priorities.contains(&p))
    {
        return false;
    }
    if !filters.deal_sizes.is_empty() && !filters.deal_sizes.contains(&deal.size()) {
        return false;
    }
    if !filters.lead_sources.is_empty()
        && !deal.lead_source.as_deref().is_some_and(|source| {
            filters
                .lead_sources
                .iter()
                .any(|want| want.eq_ignore_ascii_case(source))
        })
    {
        return false;
    }

    let needs_days = filters.min_days_in_stage.is_some()
        || filters.max_days_in_stage.is_some()
        || !filters.time_statuses.is_empty();
    if needs_days {
        let days = days_in_stage(deal, ctx.now);
        if filters.min_days_in_stage.is_some_and(|min| days < min) {
            return false;
        }
        if filters.max_days_in_stage.is_some_and(|max| days > max) {
            return false;
        }
        if !filters.time_statuses.is_empty()
            && !filters
                .time_statuses
                .contains(&ctx.card_thresholds.classify(days))
        {
            return false;
        }
    }
    true
}

fn date_for(deal: &Deal, field: DateField) -> Option<NaiveDate> {
    match field {
        DateField::CreatedAt => Some(deal.created_at.date_naive()),
        DateField::UpdatedAt => Some(deal.updated_at.date_naive()),
        DateField::StageChangedAt => Some(deal.stage_changed_at.date_naive()),
        DateField::ExpectedCloseDate => deal.expected_close_date,
    }
}

/// Case-insensitive substring match over name, company, contact and the
/// value's decimal text. A blank term matches everything.
struct SearchTerm {
    needle: Option<String>,
}

impl SearchTerm {
    fn new(raw: &str) -> Self {
        let trimmed = raw.trim();
        Self {
            needle: (!trimmed.is_empty()).then(|| trimmed.to_lowercase()),
        }
    }

    fn matches(&self, deal: &Deal) -> bool {
        let Some(needle) = &self.needle else {
            return true;
        };
        deal.name.to_lowercase().contains(needle)
            || deal.company.name.to_lowercase().contains(needle)
            || deal
                .contact
                .as_ref()
                .is_some_and(|c| c.name.to_lowercase().contains(needle))
            || deal.value.to_string().contains(needle.as_str())
    }
}
