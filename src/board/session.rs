//! Async owner of the board: loads from the store, keeps the engine output
//! and the controller in step with the view, persists completed moves and
//! reconciles the result.
//!
//! All board mutation happens through `&mut self`; the only suspension
//! points are the store calls.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use pipeline_common::{
    Deal, DealId, DealPatch, FilterSet, NewDeal, OwnerScope, QuickFilter, SortMode, Stage, StageId,
    ViewState,
};

use crate::errors::{BoardError, StoreError};
use crate::store::local::DealList;
use crate::store::{DealStore, StageCatalog};

use super::controller::{BoardController, DragOutcome};
use super::filter::{BoardSnapshot, EvalContext, compute};
use super::metrics::{DealInsight, StageHealth, TimeThresholds, deal_insight, stage_health};
use super::notify::{Celebration, LogCelebration, LogNotifier, Notification, Notifier};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoadState {
    #[default]
    NotLoaded,
    Ready,
    /// The last load failed; no board is shown until a reload succeeds.
    Failed(String),
}

/// Result of finishing a gesture through the session.
#[derive(Debug)]
pub enum MoveResult {
    /// The gesture produced nothing to persist.
    NoMove(DragOutcome),
    /// The store confirmed the move; `deal` is the authoritative record.
    Moved { deal: Deal, celebrated: bool },
    /// The store rejected the move and the board was reconciled.
    Failed(BoardError),
}

pub struct BoardSession<S> {
    store: Arc<S>,
    celebration: Arc<dyn Celebration>,
    notifier: Arc<dyn Notifier>,
    view: ViewState,
    card_thresholds: TimeThresholds,
    header_thresholds: TimeThresholds,
    stages: Vec<Stage>,
    deals: DealList,
    snapshot: BoardSnapshot,
    controller: BoardController,
    load_state: LoadState,
    clock: fn() -> DateTime<Utc>,
}

impl<S> BoardSession<S>
where
    S: DealStore + StageCatalog + 'static,
{
    pub fn new(store: Arc<S>, view: ViewState) -> Self {
        let controller = BoardController::new(view.sort_mode);
        Self {
            store,
            celebration: Arc::new(LogCelebration),
            notifier: Arc::new(LogNotifier),
            view,
            card_thresholds: TimeThresholds::CARD,
            header_thresholds: TimeThresholds::HEADER,
            stages: Vec::new(),
            deals: DealList::default(),
            snapshot: BoardSnapshot::default(),
            controller,
            load_state: LoadState::NotLoaded,
            clock: Utc::now,
        }
    }

    pub fn with_celebration(mut self, celebration: Arc<dyn Celebration>) -> Self {
        self.celebration = celebration;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_thresholds(mut self, card: TimeThresholds, header: TimeThresholds) -> Self {
        self.card_thresholds = card;
        self.header_thresholds = header;
        self
    }

    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    // ── Loading ───────────────────────────────────────────────────────

    /// Fetch the stage catalog and the deals visible under the owner scope.
    pub async fn load(&mut self) -> Result<(), BoardError> {
        let fetched = async {
            let stages = self.store.list_stages().await?;
            let deals = self.store.list(self.view.owner_scope.owner_filter()).await?;
            Ok::<_, StoreError>((stages, deals))
        }
        .await;

        match fetched {
            Ok((stages, deals)) => {
                info!(stages = stages.len(), deals = deals.len(), "Board loaded");
                self.stages = stages;
                self.deals.replace_all(deals);
                self.load_state = LoadState::Ready;
                self.recompute();
                Ok(())
            }
            Err(source) => {
                warn!(error = %source, "Board load failed");
                self.load_state = LoadState::Failed(source.to_string());
                self.notifier
                    .notify(Notification::error(format!("Failed to load board: {}", source)));
                Err(BoardError::FetchFailed(source))
            }
        }
    }

    /// Re-fetch the deal list. A failure keeps the current board.
    pub async fn refresh(&mut self) -> Result<(), BoardError> {
        if self.load_state != LoadState::Ready {
            return self.load().await;
        }
        match self.store.list(self.view.owner_scope.owner_filter()).await {
            Ok(deals) => {
                debug!(deals = deals.len(), "Board refreshed");
                self.deals.replace_all(deals);
                self.recompute();
                Ok(())
            }
            Err(source) => {
                warn!(error = %source, "Board refresh failed");
                self.notifier
                    .notify(Notification::error(format!("Failed to refresh board: {}", source)));
                Err(BoardError::FetchFailed(source))
            }
        }
    }

    /// Re-run the engine over the local list and re-seed the controller.
    /// The controller holds the seed back while a gesture is active.
    fn recompute(&mut self) {
        let now = (self.clock)();
        let ctx = EvalContext::new(now, &self.view.current_user_id)
            .with_card_thresholds(self.card_thresholds);
        self.snapshot = compute(
            self.deals.as_slice(),
            &self.stages,
            &self.view.search_term,
            &self.view.filters,
            &ctx,
        );
        self.controller.seed(&self.snapshot, now);
    }

    fn ensure_ready(&self) -> Result<(), BoardError> {
        match self.load_state {
            LoadState::Ready => Ok(()),
            _ => Err(BoardError::NotLoaded),
        }
    }

    // ── Read-outs ─────────────────────────────────────────────────────

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stage(&self, stage_id: StageId) -> Option<&Stage> {
        self.stages.iter().find(|s| s.id == stage_id)
    }

    /// Authoritative deals, unfiltered.
    pub fn deals(&self) -> &[Deal] {
        self.deals.as_slice()
    }

    /// Engine output for the current view. `None` until loaded.
    pub fn snapshot(&self) -> Option<&BoardSnapshot> {
        match self.load_state {
            LoadState::Ready => Some(&self.snapshot),
            _ => None,
        }
    }

    pub fn controller(&self) -> &BoardController {
        &self.controller
    }

    /// Column header health in catalog order.
    pub fn column_health(&self) -> Vec<StageHealth> {
        stage_health(&self.snapshot, (self.clock)(), self.header_thresholds)
    }

    /// Card read-out from the board's copy of the deal.
    pub fn card_insight(&self, deal_id: DealId) -> Option<DealInsight> {
        let deal = self.controller.deal(deal_id)?;
        Some(deal_insight(
            deal,
            self.stage(deal.stage_id),
            (self.clock)(),
            self.card_thresholds,
        ))
    }

    // ── View changes ──────────────────────────────────────────────────

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.view.search_term = term.into();
        self.recompute();
    }

    pub fn set_filters(&mut self, filters: FilterSet) {
        self.view.filters = filters;
        self.recompute();
    }

    pub fn set_quick_filter(&mut self, quick_filter: QuickFilter) {
        self.view.filters.quick_filter = quick_filter;
        self.recompute();
    }

    pub fn clear_filters(&mut self) {
        self.view.filters = FilterSet::default();
        self.recompute();
    }

    pub fn set_sort_mode(&mut self, mode: SortMode) {
        self.view.sort_mode = mode;
        self.controller.set_sort_mode(mode, (self.clock)());
    }

    /// Switching owner scope changes which deals the store returns, so it
    /// triggers a refetch.
    pub async fn set_owner_scope(&mut self, scope: OwnerScope) -> Result<(), BoardError> {
        self.view.owner_scope = scope;
        if self.load_state == LoadState::Ready {
            self.refresh().await
        } else {
            Ok(())
        }
    }

    // ── Gestures ──────────────────────────────────────────────────────

    pub fn drag_start(&mut self, deal_id: DealId) {
        self.controller.drag_start(deal_id);
    }

    pub fn drag_over(&mut self, over_id: Uuid) -> bool {
        self.controller.drag_over(over_id)
    }

    /// Finish the gesture and persist a cross-stage move.
    ///
    /// On failure the board is reconciled with an authoritative refresh; if
    /// that fails too it is re-seeded from the local list, which the failed
    /// move never touched.
    pub async fn drag_end(&mut self, over_id: Option<Uuid>) -> MoveResult {
        let now = (self.clock)();
        let outcome = self.controller.drag_end(over_id, now);
        let DragOutcome::Moved(request) = outcome else {
            return MoveResult::NoMove(outcome);
        };

        info!(
            deal_id = %request.deal_id,
            from = %request.from_stage_id,
            to = %request.to_stage_id,
            "Moving deal"
        );
        let persisted = self
            .store
            .move_to_stage(request.deal_id, request.to_stage_id, request.stage_changed_at)
            .await;

        match persisted {
            Ok(deal) => {
                self.deals.upsert(deal.clone());
                self.recompute();
                let celebrated = match self.stage(deal.stage_id) {
                    Some(stage) if stage.is_closed_won() => {
                        self.celebration.celebrate(&deal, stage);
                        true
                    }
                    _ => false,
                };
                MoveResult::Moved { deal, celebrated }
            }
            Err(source) => {
                warn!(deal_id = %request.deal_id, error = %source, "Move failed, reconciling board");
                self.notifier
                    .notify(Notification::error(format!("Failed to move deal: {}", source)));
                if self.refresh().await.is_err() {
                    self.recompute();
                }
                MoveResult::Failed(BoardError::MutationFailed {
                    operation: "move",
                    source,
                })
            }
        }
    }

    // ── Deal mutations ────────────────────────────────────────────────

    /// Create a deal. The local list only changes once the store confirms.
    pub async fn create_deal(&mut self, fields: NewDeal) -> Result<Deal, BoardError> {
        self.ensure_ready()?;
        let deal = self
            .store
            .create(fields)
            .await
            .map_err(|source| self.mutation_failed("create", source))?;
        if self.in_scope(&deal) {
            self.deals.upsert(deal.clone());
            self.recompute();
        }
        Ok(deal)
    }

    pub async fn update_deal(&mut self, id: DealId, patch: DealPatch) -> Result<Deal, BoardError> {
        self.ensure_ready()?;
        let deal = self
            .store
            .update(id, patch)
            .await
            .map_err(|source| self.mutation_failed("update", source))?;
        if self.in_scope(&deal) {
            self.deals.upsert(deal.clone());
        } else {
            self.deals.remove(deal.id);
        }
        self.recompute();
        Ok(deal)
    }

    pub async fn delete_deal(&mut self, id: DealId) -> Result<(), BoardError> {
        self.ensure_ready()?;
        self.store
            .delete(id)
            .await
            .map_err(|source| self.mutation_failed("delete", source))?;
        self.deals.remove(id);
        self.recompute();
        Ok(())
    }

    fn in_scope(&self, deal: &Deal) -> bool {
        self.view
            .owner_scope
            .owner_filter()
            .is_none_or(|owner| owner == deal.owner_id)
    }

    fn mutation_failed(&self, operation: &'static str, source: StoreError) -> BoardError {
        warn!(operation, error = %source, "Deal mutation failed");
        self.notifier.notify(Notification::error(format!(
            "Failed to {} deal: {}",
            operation, source
        )));
        BoardError::MutationFailed { operation, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::notify::NotificationLevel;
    use crate::board::test_support::{deal_in, fixed_now, stage};
    use async_trait::async_trait;
    use pipeline_common::{CompanyRef, DealStatus, TimeStatus};
    use rust_decimal::Decimal;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockState {
        stages: Vec<Stage>,
        deals: Vec<Deal>,
        fail_list: bool,
        fail_move: bool,
        fail_create: bool,
        list_owners: Vec<Option<String>>,
        move_calls: usize,
    }

    #[derive(Default)]
    struct MockStore {
        state: Mutex<MockState>,
    }

    impl MockStore {
        fn with(stages: Vec<Stage>, deals: Vec<Deal>) -> Arc<Self> {
            Arc::new(Self {
                state: Mutex::new(MockState {
                    stages,
                    deals,
                    ..Default::default()
                }),
            })
        }

        fn set(&self, f: impl FnOnce(&mut MockState)) {
            f(&mut self.state.lock().unwrap());
        }

        fn move_calls(&self) -> usize {
            self.state.lock().unwrap().move_calls
        }
    }

    fn unavailable() -> StoreError {
        StoreError::Database(anyhow::anyhow!("store unavailable"))
    }

    #[async_trait]
    impl StageCatalog for MockStore {
        async fn list_stages(&self) -> Result<Vec<Stage>, StoreError> {
            let state = self.state.lock().unwrap();
            if state.fail_list {
                return Err(unavailable());
            }
            Ok(state.stages.clone())
        }
    }

    #[async_trait]
    impl DealStore for MockStore {
        async fn list(&self, owner: Option<&str>) -> Result<Vec<Deal>, StoreError> {
            let mut state = self.state.lock().unwrap();
            state.list_owners.push(owner.map(str::to_string));
            if state.fail_list {
                return Err(unavailable());
            }
            Ok(state
                .deals
                .iter()
                .filter(|d| owner.is_none_or(|o| o == d.owner_id))
                .cloned()
                .collect())
        }

        async fn create(&self, fields: NewDeal) -> Result<Deal, StoreError> {
            let mut state = self.state.lock().unwrap();
            if state.fail_create {
                return Err(unavailable());
            }
            let now = fixed_now();
            let deal = Deal {
                id: Uuid::new_v4(),
                name: fields.name,
                company: CompanyRef {
                    id: fields.company_id,
                    name: "Acme".into(),
                },
                contact: None,
                value: fields.value,
                stage_id: fields.stage_id,
                owner_id: fields.owner_id,
                created_at: now,
                updated_at: now,
                stage_changed_at: now,
                expected_close_date: fields.expected_close_date,
                probability: fields.probability,
                status: DealStatus::Active,
                priority: fields.priority,
                lead_source: fields.lead_source,
                tags: fields.tags,
            };
            state.deals.push(deal.clone());
            Ok(deal)
        }

        async fn update(&self, id: DealId, patch: DealPatch) -> Result<Deal, StoreError> {
            let mut state = self.state.lock().unwrap();
            let deal = state
                .deals
                .iter_mut()
                .find(|d| d.id == id)
                .ok_or(StoreError::DealNotFound { id })?;
            if let Some(owner) = patch.owner_id {
                deal.owner_id = owner;
            }
            if let Some(name) = patch.name {
                deal.name = name;
            }
            Ok(deal.clone())
        }

        async fn delete(&self, id: DealId) -> Result<(), StoreError> {
            let mut state = self.state.lock().unwrap();
            let before = state.deals.len();
            state.deals.retain(|d| d.id != id);
            if state.deals.len() == before {
                return Err(StoreError::DealNotFound { id });
            }
            Ok(())
        }

        async fn move_to_stage(
            &self,
            id: DealId,
            stage_id: StageId,
            stage_changed_at: DateTime<Utc>,
        ) -> Result<Deal, StoreError> {
            let mut state = self.state.lock().unwrap();
            state.move_calls += 1;
            if state.fail_move {
                return Err(unavailable());
            }
            let deal = state
                .deals
                .iter_mut()
                .find(|d| d.id == id)
                .ok_or(StoreError::DealNotFound { id })?;
            deal.stage_id = stage_id;
            deal.stage_changed_at = stage_changed_at;
            Ok(deal.clone())
        }
    }

    #[derive(Default)]
    struct Recorder {
        celebrated: Mutex<Vec<(DealId, String)>>,
        notifications: Mutex<Vec<Notification>>,
    }

    impl Celebration for Recorder {
        fn celebrate(&self, deal: &Deal, stage: &Stage) {
            self.celebrated
                .lock()
                .unwrap()
                .push((deal.id, stage.name.clone()));
        }
    }

    impl Notifier for Recorder {
        fn notify(&self, notification: Notification) {
            self.notifications.lock().unwrap().push(notification);
        }
    }

    impl Recorder {
        fn celebrations(&self) -> usize {
            self.celebrated.lock().unwrap().len()
        }

        fn errors(&self) -> usize {
            self.notifications
                .lock()
                .unwrap()
                .iter()
                .filter(|n| n.level == NotificationLevel::Error)
                .count()
        }
    }

    struct Fixture {
        store: Arc<MockStore>,
        recorder: Arc<Recorder>,
        lead: Stage,
        won: Stage,
        deal: Deal,
    }

    fn fixture(won_name: &str) -> Fixture {
        let lead = stage("Lead", 0, Some(10));
        let won = stage(won_name, 1, Some(100));
        let deal = deal_in(lead.id, "Acme expansion", 8000);
        let other = deal_in(lead.id, "Globex renewal", 1200);
        Fixture {
            store: MockStore::with(vec![lead.clone(), won.clone()], vec![deal.clone(), other]),
            recorder: Arc::new(Recorder::default()),
            lead,
            won,
            deal,
        }
    }

    fn session(f: &Fixture) -> BoardSession<MockStore> {
        BoardSession::new(f.store.clone(), ViewState::for_user("me"))
            .with_celebration(f.recorder.clone())
            .with_notifier(f.recorder.clone())
            .with_clock(fixed_now)
    }

    async fn loaded(f: &Fixture) -> BoardSession<MockStore> {
        let mut session = session(f);
        session.load().await.unwrap();
        session
    }

    #[tokio::test]
    async fn load_builds_the_board() {
        let f = fixture("Closed Won");
        let session = loaded(&f).await;
        assert_eq!(session.load_state(), &LoadState::Ready);
        let snapshot = session.snapshot().unwrap();
        assert_eq!(snapshot.deals_in(f.lead.id).len(), 2);
        assert_eq!(snapshot.total_value, Decimal::from(9200));
        assert_eq!(session.controller().column(f.lead.id).len(), 2);
    }

    #[tokio::test]
    async fn load_failure_sets_failed_state_and_notifies() {
        let f = fixture("Closed Won");
        f.store.set(|s| s.fail_list = true);
        let mut session = session(&f);
        let err = session.load().await.unwrap_err();
        assert!(matches!(err, BoardError::FetchFailed(_)));
        assert!(matches!(session.load_state(), LoadState::Failed(msg) if msg.contains("unavailable")));
        assert!(session.snapshot().is_none());
        assert_eq!(f.recorder.errors(), 1);
    }

    #[tokio::test]
    async fn plain_won_stage_does_not_celebrate() {
        let f = fixture("Won");
        let mut session = loaded(&f).await;
        session.drag_start(f.deal.id);
        session.drag_over(f.won.id);
        let result = session.drag_end(Some(f.won.id)).await;

        match result {
            MoveResult::Moved { deal, celebrated } => {
                assert_eq!(deal.stage_id, f.won.id);
                assert!(!celebrated);
            }
            other => panic!("Expected Moved, got {:?}", other),
        }
        assert_eq!(f.store.move_calls(), 1);
        assert_eq!(f.recorder.celebrations(), 0);
    }

    #[tokio::test]
    async fn closed_won_move_celebrates_once() {
        let f = fixture("closed_won");
        let mut session = loaded(&f).await;
        session.drag_start(f.deal.id);
        let result = session.drag_end(Some(f.won.id)).await;
        assert!(matches!(result, MoveResult::Moved { celebrated: true, .. }));
        assert_eq!(f.recorder.celebrations(), 1);

        let snapshot = session.snapshot().unwrap();
        assert_eq!(snapshot.deals_in(f.won.id).len(), 1);
        assert_eq!(
            session.deals().iter().find(|d| d.id == f.deal.id).unwrap().stage_changed_at,
            fixed_now()
        );
    }

    #[tokio::test]
    async fn no_op_gesture_never_reaches_the_store() {
        let f = fixture("Closed Won");
        let mut session = loaded(&f).await;
        session.drag_start(f.deal.id);
        let result = session.drag_end(Some(f.deal.id)).await;
        assert!(matches!(result, MoveResult::NoMove(DragOutcome::Unchanged { .. })));
        assert_eq!(f.store.move_calls(), 0);
    }

    #[tokio::test]
    async fn failed_move_is_rolled_back_by_refresh() {
        let f = fixture("Closed Won");
        let mut session = loaded(&f).await;
        f.store.set(|s| s.fail_move = true);

        session.drag_start(f.deal.id);
        session.drag_over(f.won.id);
        assert!(session.controller().column(f.won.id).contains(&f.deal.id));

        let result = session.drag_end(Some(f.won.id)).await;
        assert!(matches!(
            result,
            MoveResult::Failed(BoardError::MutationFailed { operation: "move", .. })
        ));
        assert!(session.controller().column(f.lead.id).contains(&f.deal.id));
        assert!(session.controller().column(f.won.id).is_empty());
        assert_eq!(f.recorder.errors(), 1);
        assert_eq!(f.recorder.celebrations(), 0);
    }

    #[tokio::test]
    async fn failed_move_with_failed_refresh_reseeds_from_local_list() {
        let f = fixture("Closed Won");
        let mut session = loaded(&f).await;
        f.store.set(|s| {
            s.fail_move = true;
            s.fail_list = true;
        });

        session.drag_start(f.deal.id);
        let result = session.drag_end(Some(f.won.id)).await;
        assert!(matches!(result, MoveResult::Failed(_)));
        assert_eq!(session.controller().stage_of(f.deal.id), Some(f.lead.id));
        assert_eq!(session.controller().deal(f.deal.id).unwrap().stage_id, f.lead.id);
        assert_eq!(session.load_state(), &LoadState::Ready);
        assert_eq!(f.recorder.errors(), 2);
    }

    #[tokio::test]
    async fn failed_create_leaves_local_list_untouched() {
        let f = fixture("Closed Won");
        let mut session = loaded(&f).await;
        f.store.set(|s| s.fail_create = true);
        let fields = NewDeal {
            name: "Initech".into(),
            company_id: Uuid::new_v4(),
            contact_id: None,
            value: Decimal::from(500),
            stage_id: f.lead.id,
            owner_id: "me".into(),
            expected_close_date: None,
            probability: None,
            priority: None,
            lead_source: None,
            tags: Vec::new(),
        };
        let err = session.create_deal(fields.clone()).await.unwrap_err();
        assert!(matches!(err, BoardError::MutationFailed { operation: "create", .. }));
        assert_eq!(session.deals().len(), 2);

        f.store.set(|s| s.fail_create = false);
        let created = session.create_deal(fields).await.unwrap();
        assert_eq!(session.deals().len(), 3);
        assert!(session.controller().column(f.lead.id).contains(&created.id));
    }

    #[tokio::test]
    async fn update_moving_deal_out_of_scope_drops_it() {
        let f = fixture("Closed Won");
        let mut session = loaded(&f).await;
        session
            .set_owner_scope(OwnerScope::Owner("me".into()))
            .await
            .unwrap();
        let patch = DealPatch {
            owner_id: Some("someone-else".into()),
            ..Default::default()
        };
        session.update_deal(f.deal.id, patch).await.unwrap();
        assert!(session.deals().iter().all(|d| d.id != f.deal.id));
        assert!(session.controller().stage_of(f.deal.id).is_none());
    }

    #[tokio::test]
    async fn owner_scope_change_refetches_with_owner() {
        let f = fixture("Closed Won");
        let mut session = loaded(&f).await;
        session
            .set_owner_scope(OwnerScope::Owner("me".into()))
            .await
            .unwrap();
        let owners = f.store.state.lock().unwrap().list_owners.clone();
        assert_eq!(owners, vec![None, Some("me".to_string())]);
    }

    #[tokio::test]
    async fn delete_removes_deal_and_missing_deal_errors() {
        let f = fixture("Closed Won");
        let mut session = loaded(&f).await;
        session.delete_deal(f.deal.id).await.unwrap();
        assert_eq!(session.deals().len(), 1);
        let err = session.delete_deal(f.deal.id).await.unwrap_err();
        assert!(matches!(
            err,
            BoardError::MutationFailed { source: StoreError::DealNotFound { .. }, .. }
        ));
    }

    #[tokio::test]
    async fn mutations_require_a_loaded_board() {
        let f = fixture("Closed Won");
        let mut session = session(&f);
        let err = session.delete_deal(f.deal.id).await.unwrap_err();
        assert!(matches!(err, BoardError::NotLoaded));
    }

    #[tokio::test]
    async fn search_and_filters_recompute_the_board() {
        let f = fixture("Closed Won");
        let mut session = loaded(&f).await;
        session.set_search("globex");
        assert_eq!(session.snapshot().unwrap().deal_count(), 1);
        assert_eq!(session.controller().column(f.lead.id).len(), 1);

        session.set_search("");
        session.set_filters(FilterSet {
            min_value: Some(Decimal::from(5000)),
            ..Default::default()
        });
        assert_eq!(session.snapshot().unwrap().deal_count(), 1);
        session.clear_filters();
        assert_eq!(session.snapshot().unwrap().deal_count(), 2);
    }

    #[tokio::test]
    async fn health_and_insight_read_outs() {
        let f = fixture("Closed Won");
        let session = loaded(&f).await;
        let health = session.column_health();
        assert_eq!(health.len(), 2);
        assert_eq!(health[0].deal_count, 2);
        assert_eq!(health[0].status, TimeStatus::Normal);

        let insight = session.card_insight(f.deal.id).unwrap();
        assert_eq!(insight.days_in_stage, 1);
        assert_eq!(insight.probability, 10);
        assert_eq!(insight.weighted_value, Decimal::from(800));
        assert!(session.card_insight(Uuid::new_v4()).is_none());
    }
}
