use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use uuid::Uuid;

use pipeline_common::{
    ClearableField, CompanyRef, ContactRef, Deal, DealId, DealPatch, DealStatus, NewDeal, Priority,
    Stage, StageId,
};

use super::{DealStore, StageCatalog};
use crate::errors::StoreError;

/// Async-safe handle to the CRM database.
///
/// Wraps `CrmDb` behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`, keeping synchronous SQLite
/// I/O off the async worker threads.
#[derive(Clone)]
pub struct DbHandle {
    inner: Arc<std::sync::Mutex<CrmDb>>,
}

impl DbHandle {
    pub fn new(db: CrmDb) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(db)),
        }
    }

    /// Run a closure with access to the database on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&CrmDb) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db.lock().map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
            f(&guard)
        })
        .await
        .context("DB task panicked")?
    }

    /// Acquire the database mutex synchronously. Used for startup seeding
    /// and tests; never from a hot async path.
    pub fn lock_sync(&self) -> Result<std::sync::MutexGuard<'_, CrmDb>> {
        self.inner
            .lock()
            .map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))
    }
}

pub struct CrmDb {
    conn: Connection,
}

/// Stage catalog written by `seed_default_stages` on an empty database.
pub const DEFAULT_STAGES: [(&str, &str, u8); 6] = [
    ("Lead", "slate", 10),
    ("Qualified", "blue", 25),
    ("Proposal", "indigo", 50),
    ("Negotiation", "amber", 75),
    ("Closed Won", "green", 100),
    ("Closed Lost", "red", 0),
];

/// Largest accepted deal value. Keeps board totals far from `Decimal::MAX`.
pub const MAX_DEAL_VALUE: i64 = 1_000_000_000_000_000;

const DEAL_COLUMNS: &str = "d.id, d.name, d.company_id, c.name, d.contact_id, ct.name, d.value, \
     d.stage_id, d.owner_id, d.created_at, d.updated_at, d.stage_changed_at, \
     d.expected_close_date, d.probability, d.status, d.priority, d.lead_source, d.tags";

const DEAL_FROM: &str = "FROM deals d \
     JOIN companies c ON c.id = d.company_id \
     LEFT JOIN contacts ct ON ct.id = d.contact_id";

impl CrmDb {
    /// Open (or create) a SQLite database at the given path and run migrations.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        self.run_migrations().context("Failed to run migrations")?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS stages (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    color_token TEXT NOT NULL DEFAULT 'slate',
                    order_position INTEGER NOT NULL,
                    default_probability INTEGER
                );

                CREATE TABLE IF NOT EXISTS companies (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS contacts (
                    id TEXT PRIMARY KEY,
                    company_id TEXT NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
                    name TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS deals (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    company_id TEXT NOT NULL REFERENCES companies(id),
                    contact_id TEXT REFERENCES contacts(id) ON DELETE SET NULL,
                    value TEXT NOT NULL,
                    stage_id TEXT NOT NULL REFERENCES stages(id),
                    owner_id TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    stage_changed_at TEXT NOT NULL,
                    expected_close_date TEXT,
                    probability INTEGER,
                    status TEXT NOT NULL DEFAULT 'active',
                    priority TEXT,
                    lead_source TEXT,
                    tags TEXT NOT NULL DEFAULT '[]'
                );

                CREATE INDEX IF NOT EXISTS idx_deals_owner ON deals(owner_id);
                CREATE INDEX IF NOT EXISTS idx_deals_stage ON deals(stage_id);
                CREATE INDEX IF NOT EXISTS idx_stages_order ON stages(order_position);
                ",
            )
            .context("Failed to create tables")?;
        Ok(())
    }

    // ── Stages ────────────────────────────────────────────────────────

    pub fn create_stage(&self, stage: &Stage) -> Result<()> {
        if let Some(p) = stage.default_probability {
            validate_probability(p)?;
        }
        self.conn
            .execute(
                "INSERT INTO stages (id, name, color_token, order_position, default_probability)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    stage.id.to_string(),
                    stage.name,
                    stage.color_token,
                    stage.order_position,
                    stage.default_probability.map(i64::from),
                ],
            )
            .context("Failed to insert stage")?;
        Ok(())
    }

    pub fn list_stages(&self) -> Result<Vec<Stage>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, name, color_token, order_position, default_probability
                 FROM stages ORDER BY order_position, name",
            )
            .context("Failed to prepare list_stages")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(StageRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    color_token: row.get(2)?,
                    order_position: row.get(3)?,
                    default_probability: row.get(4)?,
                })
            })
            .context("Failed to query stages")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read stage rows")?;
        rows.into_iter().map(StageRow::into_stage).collect()
    }

    pub fn stage_exists(&self, id: StageId) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM stages WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to look up stage")?;
        Ok(found.is_some())
    }

    /// Insert the default catalog when no stages exist yet. Returns the
    /// catalog either way.
    pub fn seed_default_stages(&self) -> Result<Vec<Stage>> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM stages", [], |row| row.get(0))
            .context("Failed to count stages")?;
        if count == 0 {
            for (position, (name, color, probability)) in DEFAULT_STAGES.iter().enumerate() {
                self.create_stage(&Stage::new(name, color, position as i32, *probability))?;
            }
        }
        self.list_stages()
    }

    // ── Companies & contacts ──────────────────────────────────────────

    pub fn create_company(&self, name: &str) -> Result<CompanyRef> {
        validate_name("company name", name)?;
        let company = CompanyRef {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
        };
        self.conn
            .execute(
                "INSERT INTO companies (id, name, created_at) VALUES (?1, ?2, ?3)",
                params![company.id.to_string(), company.name, timestamp(&Utc::now())],
            )
            .context("Failed to insert company")?;
        Ok(company)
    }

    pub fn create_contact(&self, company_id: Uuid, name: &str) -> Result<ContactRef> {
        validate_name("contact name", name)?;
        if !self.row_exists("companies", company_id)? {
            return Err(StoreError::UnknownCompany { id: company_id }.into());
        }
        let contact = ContactRef {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
        };
        self.conn
            .execute(
                "INSERT INTO contacts (id, company_id, name, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    contact.id.to_string(),
                    company_id.to_string(),
                    contact.name,
                    timestamp(&Utc::now())
                ],
            )
            .context("Failed to insert contact")?;
        Ok(contact)
    }

    fn row_exists(&self, table: &str, id: Uuid) -> Result<bool> {
        let sql = format!("SELECT 1 FROM {} WHERE id = ?1", table);
        let found: Option<i64> = self
            .conn
            .query_row(&sql, params![id.to_string()], |row| row.get(0))
            .optional()
            .with_context(|| format!("Failed to look up {} row", table))?;
        Ok(found.is_some())
    }

    // ── Deals ─────────────────────────────────────────────────────────

    pub fn list_deals(&self, owner: Option<&str>) -> Result<Vec<Deal>> {
        let sql = format!(
            "SELECT {} {} WHERE (?1 IS NULL OR d.owner_id = ?1) ORDER BY d.created_at, d.id",
            DEAL_COLUMNS, DEAL_FROM
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .context("Failed to prepare list_deals")?;
        let rows = stmt
            .query_map(params![owner], DealRow::from_row)
            .context("Failed to query deals")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read deal rows")?;
        rows.into_iter().map(DealRow::into_deal).collect()
    }

    pub fn get_deal(&self, id: DealId) -> Result<Option<Deal>> {
        let sql = format!("SELECT {} {} WHERE d.id = ?1", DEAL_COLUMNS, DEAL_FROM);
        let row = self
            .conn
            .query_row(&sql, params![id.to_string()], DealRow::from_row)
            .optional()
            .context("Failed to query deal")?;
        row.map(DealRow::into_deal).transpose()
    }

    pub fn create_deal(&self, fields: &NewDeal, now: DateTime<Utc>) -> Result<Deal> {
        validate_name("deal name", &fields.name)?;
        validate_value(fields.value)?;
        if let Some(p) = fields.probability {
            validate_probability(p)?;
        }
        if !self.stage_exists(fields.stage_id)? {
            return Err(StoreError::UnknownStage {
                id: fields.stage_id,
            }
            .into());
        }
        if !self.row_exists("companies", fields.company_id)? {
            return Err(StoreError::UnknownCompany {
                id: fields.company_id,
            }
            .into());
        }
        if let Some(contact_id) = fields.contact_id {
            if !self.row_exists("contacts", contact_id)? {
                return Err(StoreError::UnknownContact { id: contact_id }.into());
            }
        }

        let id = Uuid::new_v4();
        let now_str = timestamp(&now);
        let tags = serde_json::to_string(&fields.tags).context("Failed to encode deal tags")?;
        self.conn
            .execute(
                "INSERT INTO deals (id, name, company_id, contact_id, value, stage_id, owner_id,
                    created_at, updated_at, stage_changed_at, expected_close_date, probability,
                    status, priority, lead_source, tags)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    id.to_string(),
                    fields.name.trim(),
                    fields.company_id.to_string(),
                    fields.contact_id.map(|c| c.to_string()),
                    fields.value.to_string(),
                    fields.stage_id.to_string(),
                    fields.owner_id,
                    now_str,
                    fields.expected_close_date.map(|d| d.to_string()),
                    fields.probability.map(i64::from),
                    DealStatus::Active.as_str(),
                    fields.priority.map(|p| p.as_str()),
                    fields.lead_source,
                    tags,
                ],
            )
            .context("Failed to insert deal")?;
        self.get_deal(id)?.context("Deal not found after insert")
    }

    /// Apply a partial update atomically. Stage is not patchable here.
    pub fn update_deal(&self, id: DealId, patch: &DealPatch, now: DateTime<Utc>) -> Result<Deal> {
        let mut deal = self
            .get_deal(id)?
            .ok_or(StoreError::DealNotFound { id })?;

        for field in &patch.clear {
            match field {
                ClearableField::ExpectedCloseDate => deal.expected_close_date = None,
                ClearableField::Probability => deal.probability = None,
                ClearableField::Priority => deal.priority = None,
                ClearableField::LeadSource => deal.lead_source = None,
            }
        }
        if let Some(name) = &patch.name {
            validate_name("deal name", name)?;
            deal.name = name.trim().to_string();
        }
        if let Some(value) = patch.value {
            validate_value(value)?;
            deal.value = value;
        }
        if let Some(p) = patch.probability {
            validate_probability(p)?;
            deal.probability = Some(p);
        }
        if let Some(owner) = &patch.owner_id {
            deal.owner_id = owner.clone();
        }
        if let Some(date) = patch.expected_close_date {
            deal.expected_close_date = Some(date);
        }
        if let Some(status) = patch.status {
            deal.status = status;
        }
        if let Some(priority) = patch.priority {
            deal.priority = Some(priority);
        }
        if let Some(source) = &patch.lead_source {
            deal.lead_source = Some(source.clone());
        }
        if let Some(tags) = &patch.tags {
            deal.tags = tags.clone();
        }

        let tags = serde_json::to_string(&deal.tags).context("Failed to encode deal tags")?;
        // Safety: DbHandle's Mutex already guarantees single-threaded access.
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;
        tx.execute(
            "UPDATE deals SET name = ?1, value = ?2, owner_id = ?3, expected_close_date = ?4,
                probability = ?5, status = ?6, priority = ?7, lead_source = ?8, tags = ?9,
                updated_at = ?10
             WHERE id = ?11",
            params![
                deal.name,
                deal.value.to_string(),
                deal.owner_id,
                deal.expected_close_date.map(|d| d.to_string()),
                deal.probability.map(i64::from),
                deal.status.as_str(),
                deal.priority.map(|p| p.as_str()),
                deal.lead_source,
                tags,
                timestamp(&now),
                id.to_string(),
            ],
        )
        .context("Failed to update deal")?;
        tx.commit().context("Failed to commit deal update")?;
        self.get_deal(id)?.context("Deal not found after update")
    }

    /// Set a deal's stage and reset its `stage_changed_at`.
    pub fn move_deal(
        &self,
        id: DealId,
        stage_id: StageId,
        stage_changed_at: DateTime<Utc>,
    ) -> Result<Deal> {
        if !self.stage_exists(stage_id)? {
            return Err(StoreError::UnknownStage { id: stage_id }.into());
        }
        let changed_str = timestamp(&stage_changed_at);
        let updated = self
            .conn
            .execute(
                "UPDATE deals SET stage_id = ?1, stage_changed_at = ?2, updated_at = ?2 WHERE id = ?3",
                params![stage_id.to_string(), changed_str, id.to_string()],
            )
            .context("Failed to move deal")?;
        if updated == 0 {
            return Err(StoreError::DealNotFound { id }.into());
        }
        self.get_deal(id)?.context("Deal not found after move")
    }

    pub fn delete_deal(&self, id: DealId) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM deals WHERE id = ?1", params![id.to_string()])
            .context("Failed to delete deal")?;
        Ok(deleted > 0)
    }
}

// ── Store trait implementations ───────────────────────────────────────

#[async_trait]
impl StageCatalog for DbHandle {
    async fn list_stages(&self) -> Result<Vec<Stage>, StoreError> {
        self.call(|db| db.list_stages())
            .await
            .map_err(StoreError::from_anyhow)
    }
}

#[async_trait]
impl DealStore for DbHandle {
    async fn list(&self, owner: Option<&str>) -> Result<Vec<Deal>, StoreError> {
        let owner = owner.map(str::to_string);
        self.call(move |db| db.list_deals(owner.as_deref()))
            .await
            .map_err(StoreError::from_anyhow)
    }

    async fn create(&self, fields: NewDeal) -> Result<Deal, StoreError> {
        self.call(move |db| db.create_deal(&fields, Utc::now()))
            .await
            .map_err(StoreError::from_anyhow)
    }

    async fn update(&self, id: DealId, patch: DealPatch) -> Result<Deal, StoreError> {
        self.call(move |db| db.update_deal(id, &patch, Utc::now()))
            .await
            .map_err(StoreError::from_anyhow)
    }

    async fn delete(&self, id: DealId) -> Result<(), StoreError> {
        let deleted = self
            .call(move |db| db.delete_deal(id))
            .await
            .map_err(StoreError::from_anyhow)?;
        if deleted {
            Ok(())
        } else {
            Err(StoreError::DealNotFound { id })
        }
    }

    async fn move_to_stage(
        &self,
        id: DealId,
        stage_id: StageId,
        stage_changed_at: DateTime<Utc>,
    ) -> Result<Deal, StoreError> {
        self.call(move |db| db.move_deal(id, stage_id, stage_changed_at))
            .await
            .map_err(StoreError::from_anyhow)
    }
}

// ── Validation & encoding helpers ─────────────────────────────────────

fn validate_name(field: &'static str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(StoreError::InvalidField {
            field,
            message: "must not be empty".to_string(),
        }
        .into());
    }
    Ok(())
}

fn validate_value(value: Decimal) -> Result<()> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(StoreError::InvalidField {
            field: "value",
            message: format!("must not be negative (got {})", value),
        }
        .into());
    }
    if value > Decimal::from(MAX_DEAL_VALUE) {
        return Err(StoreError::InvalidField {
            field: "value",
            message: format!("must not exceed {} (got {})", MAX_DEAL_VALUE, value),
        }
        .into());
    }
    Ok(())
}

fn validate_probability(probability: u8) -> Result<()> {
    if probability > 100 {
        return Err(StoreError::InvalidField {
            field: "probability",
            message: format!("must be between 0 and 100 (got {})", probability),
        }
        .into());
    }
    Ok(())
}

/// Fixed-width RFC 3339 so stored timestamps sort lexicographically.
fn timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str, what: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Failed to parse {} timestamp '{}'", what, raw))
}

fn parse_uuid(raw: &str, what: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).with_context(|| format!("Failed to parse {} id '{}'", what, raw))
}

fn parse_probability(raw: Option<i64>) -> Result<Option<u8>> {
    raw.map(|p| u8::try_from(p).context("Stored probability out of range"))
        .transpose()
}

/// Intermediate row struct for stages.
struct StageRow {
    id: String,
    name: String,
    color_token: String,
    order_position: i32,
    default_probability: Option<i64>,
}

impl StageRow {
    fn into_stage(self) -> Result<Stage> {
        Ok(Stage {
            id: parse_uuid(&self.id, "stage")?,
            name: self.name,
            color_token: self.color_token,
            order_position: self.order_position,
            default_probability: parse_probability(self.default_probability)?,
        })
    }
}

/// Intermediate row struct that converts the stored text columns
/// (uuids, decimal value, timestamps, enums, tag JSON) into typed values.
struct DealRow {
    id: String,
    name: String,
    company_id: String,
    company_name: String,
    contact_id: Option<String>,
    contact_name: Option<String>,
    value: String,
    stage_id: String,
    owner_id: String,
    created_at: String,
    updated_at: String,
    stage_changed_at: String,
    expected_close_date: Option<String>,
    probability: Option<i64>,
    status: String,
    priority: Option<String>,
    lead_source: Option<String>,
    tags: String,
}

impl DealRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            company_id: row.get(2)?,
            company_name: row.get(3)?,
            contact_id: row.get(4)?,
            contact_name: row.get(5)?,
            value: row.get(6)?,
            stage_id: row.get(7)?,
            owner_id: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
            stage_changed_at: row.get(11)?,
            expected_close_date: row.get(12)?,
            probability: row.get(13)?,
            status: row.get(14)?,
            priority: row.get(15)?,
            lead_source: row.get(16)?,
            tags: row.get(17)?,
        })
    }

    fn into_deal(self) -> Result<Deal> {
        let contact = match (self.contact_id, self.contact_name) {
            (Some(id), Some(name)) => Some(ContactRef {
                id: parse_uuid(&id, "contact")?,
                name,
            }),
            _ => None,
        };
        let status = DealStatus::from_str(&self.status)
            .map_err(|e| anyhow::anyhow!(e))
            .context("Failed to parse deal status")?;
        let priority = self
            .priority
            .as_deref()
            .map(Priority::from_str)
            .transpose()
            .map_err(|e| anyhow::anyhow!(e))
            .context("Failed to parse deal priority")?;
        let expected_close_date = self
            .expected_close_date
            .as_deref()
            .map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d"))
            .transpose()
            .context("Failed to parse expected close date")?;
        let tags: Vec<String> =
            serde_json::from_str(&self.tags).context("Failed to parse deal tags JSON")?;

        Ok(Deal {
            id: parse_uuid(&self.id, "deal")?,
            name: self.name,
            company: CompanyRef {
                id: parse_uuid(&self.company_id, "company")?,
                name: self.company_name,
            },
            contact,
            value: Decimal::from_str(&self.value)
                .with_context(|| format!("Failed to parse deal value '{}'", self.value))?,
            stage_id: parse_uuid(&self.stage_id, "stage")?,
            owner_id: self.owner_id,
            created_at: parse_timestamp(&self.created_at, "created_at")?,
            updated_at: parse_timestamp(&self.updated_at, "updated_at")?,
            stage_changed_at: parse_timestamp(&self.stage_changed_at, "stage_changed_at")?,
            expected_close_date,
            probability: parse_probability(self.probability)?,
            status,
            priority,
            lead_source: self.lead_source,
            tags,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
