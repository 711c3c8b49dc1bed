use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::stage::StageId;

pub type DealId = Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealStatus {
    #[default]
    Active,
    Won,
    Lost,
}

impl DealStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Won => "won",
            Self::Lost => "lost",
        }
    }
}

impl FromStr for DealStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "won" => Ok(Self::Won),
            "lost" => Ok(Self::Lost),
            _ => Err(format!("Invalid deal status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            _ => Err(format!("Invalid priority: {}", s)),
        }
    }
}

/// Size bucket derived from a deal's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealSize {
    Small,
    Medium,
    Large,
    Enterprise,
}

impl DealSize {
    /// `small < 10k <= medium < 50k <= large < 250k <= enterprise`
    pub fn from_value(value: Decimal) -> Self {
        if value < Decimal::from(10_000) {
            Self::Small
        } else if value < Decimal::from(50_000) {
            Self::Medium
        } else if value < Decimal::from(250_000) {
            Self::Large
        } else {
            Self::Enterprise
        }
    }
}

/// Age badge for a deal sitting in its current stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeStatus {
    #[default]
    Normal,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub id: DealId,
    pub name: String,
    pub company: CompanyRef,
    pub contact: Option<ContactRef>,
    pub value: Decimal,
    pub stage_id: StageId,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Reset whenever `stage_id` changes; time-in-stage is measured from here.
    pub stage_changed_at: DateTime<Utc>,
    pub expected_close_date: Option<NaiveDate>,
    pub probability: Option<u8>,
    pub status: DealStatus,
    pub priority: Option<Priority>,
    pub lead_source: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Deal {
    pub fn size(&self) -> DealSize {
        DealSize::from_value(self.value)
    }
}

/// Fields accepted when creating a deal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDeal {
    pub name: String,
    pub company_id: Uuid,
    #[serde(default)]
    pub contact_id: Option<Uuid>,
    pub value: Decimal,
    pub stage_id: StageId,
    pub owner_id: String,
    #[serde(default)]
    pub expected_close_date: Option<NaiveDate>,
    #[serde(default)]
    pub probability: Option<u8>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub lead_source: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Optional deal field a [`DealPatch`] can reset to none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearableField {
    ExpectedCloseDate,
    Probability,
    Priority,
    LeadSource,
}

/// Partial update. `None` leaves the field untouched; stage changes go
/// through the dedicated move operation so `stage_changed_at` stays honest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DealPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<Decimal>,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub expected_close_date: Option<NaiveDate>,
    #[serde(default)]
    pub probability: Option<u8>,
    #[serde(default)]
    pub status: Option<DealStatus>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub lead_source: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    /// Fields reset to none before the values above are applied, so a field
    /// both cleared and set ends up set.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clear: Vec<ClearableField>,
}

impl DealPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.value.is_none()
            && self.owner_id.is_none()
            && self.expected_close_date.is_none()
            && self.probability.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.lead_source.is_none()
            && self.tags.is_none()
            && self.clear.is_empty()
    }

    pub fn clears(&self, field: ClearableField) -> bool {
        self.clear.contains(&field)
    }
}
