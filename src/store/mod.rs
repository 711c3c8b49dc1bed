//! Deal store and stage catalog.
//!
//! The board only talks to storage through the two traits below. The
//! SQLite implementation lives in [`db`]; [`local::DealList`] is the
//! session-side copy of the authoritative deal list.

pub mod db;
pub mod local;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use pipeline_common::{Deal, DealId, DealPatch, NewDeal, Stage, StageId};

use crate::errors::StoreError;

/// Authoritative deal records. Every operation may fail; a failure never
/// implies a partial write.
#[async_trait]
pub trait DealStore: Send + Sync {
    /// Deals visible to `owner`, or every deal when `None`.
    async fn list(&self, owner: Option<&str>) -> Result<Vec<Deal>, StoreError>;

    async fn create(&self, fields: NewDeal) -> Result<Deal, StoreError>;

    async fn update(&self, id: DealId, patch: DealPatch) -> Result<Deal, StoreError>;

    async fn delete(&self, id: DealId) -> Result<(), StoreError>;

    /// Set `stage_id` and reset `stage_changed_at`.
    async fn move_to_stage(
        &self,
        id: DealId,
        stage_id: StageId,
        stage_changed_at: DateTime<Utc>,
    ) -> Result<Deal, StoreError>;
}

/// Ordered pipeline stages, fetched once per session.
#[async_trait]
pub trait StageCatalog: Send + Sync {
    async fn list_stages(&self) -> Result<Vec<Stage>, StoreError>;
}
