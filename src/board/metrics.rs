//! Derived per-deal and per-column values: probability resolution,
//! time-in-stage, age badges and column health.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pipeline_common::{Deal, DealId, Stage, StageId, TimeStatus};

use super::filter::BoardSnapshot;

/// Day thresholds for an age badge. A deal is `Warning` once it has sat
/// *more than* `warning_days` in its stage and `Danger` past `danger_days`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeThresholds {
    pub warning_days: i64,
    pub danger_days: i64,
}

impl TimeThresholds {
    /// Per-card badge.
    pub const CARD: Self = Self {
        warning_days: 14,
        danger_days: 30,
    };

    /// Column header health.
    pub const HEADER: Self = Self {
        warning_days: 30,
        danger_days: 60,
    };

    pub fn classify(&self, days_in_stage: i64) -> TimeStatus {
        if days_in_stage > self.danger_days {
            TimeStatus::Danger
        } else if days_in_stage > self.warning_days {
            TimeStatus::Warning
        } else {
            TimeStatus::Normal
        }
    }
}

impl Default for TimeThresholds {
    fn default() -> Self {
        Self::CARD
    }
}

/// Win probability for a deal: its own value, then the stage default, then 0.
pub fn resolve_probability(deal: &Deal, stage: Option<&Stage>) -> u8 {
    deal.probability
        .or_else(|| stage.and_then(|s| s.default_probability))
        .unwrap_or(0)
        .min(100)
}

/// `value × probability / 100` with the probability resolved as above.
///
/// The factor is at most 1, so the product never exceeds `value`.
pub fn weighted_value(deal: &Deal, stage: Option<&Stage>) -> Decimal {
    let factor = Decimal::new(i64::from(resolve_probability(deal, stage)), 2);
    deal.value.saturating_mul(factor)
}

/// Whole days since the deal entered its current stage. Never negative.
pub fn days_in_stage(deal: &Deal, now: DateTime<Utc>) -> i64 {
    (now - deal.stage_changed_at).num_days().max(0)
}

/// Read-out for a single card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealInsight {
    pub deal_id: DealId,
    pub days_in_stage: i64,
    pub time_status: TimeStatus,
    pub probability: u8,
    pub weighted_value: Decimal,
}

pub fn deal_insight(
    deal: &Deal,
    stage: Option<&Stage>,
    now: DateTime<Utc>,
    thresholds: TimeThresholds,
) -> DealInsight {
    let days = days_in_stage(deal, now);
    DealInsight {
        deal_id: deal.id,
        days_in_stage: days,
        time_status: thresholds.classify(days),
        probability: resolve_probability(deal, stage),
        weighted_value: weighted_value(deal, stage),
    }
}

/// Column header summary of how long deals have been sitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageHealth {
    pub stage_id: StageId,
    pub deal_count: usize,
    pub average_days_in_stage: f64,
    pub oldest_days_in_stage: i64,
    pub warning_count: usize,
    pub danger_count: usize,
    /// Worst status among the column's deals.
    pub status: TimeStatus,
}

/// Health of every column in catalog order, classified with `thresholds`.
pub fn stage_health(
    snapshot: &BoardSnapshot,
    now: DateTime<Utc>,
    thresholds: TimeThresholds,
) -> Vec<StageHealth> {
    snapshot
        .per_stage_metrics
        .iter()
        .map(|metrics| {
            let days: Vec<i64> = snapshot
                .deals_in(metrics.stage_id)
                .iter()
                .map(|deal| days_in_stage(deal, now))
                .collect();
            let statuses: Vec<TimeStatus> = days.iter().map(|d| thresholds.classify(*d)).collect();
            let warning_count = statuses
                .iter()
                .filter(|s| **s == TimeStatus::Warning)
                .count();
            let danger_count = statuses
                .iter()
                .filter(|s| **s == TimeStatus::Danger)
                .count();
            let status = if danger_count > 0 {
                TimeStatus::Danger
            } else if warning_count > 0 {
                TimeStatus::Warning
            } else {
                TimeStatus::Normal
            };
            let average_days_in_stage = if days.is_empty() {
                0.0
            } else {
                days.iter().sum::<i64>() as f64 / days.len() as f64
            };
            StageHealth {
                stage_id: metrics.stage_id,
                deal_count: days.len(),
                average_days_in_stage,
                oldest_days_in_stage: days.iter().copied().max().unwrap_or(0),
                warning_count,
                danger_count,
                status,
            }
        })
        .collect()
}
