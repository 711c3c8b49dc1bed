use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

use pipeline_common::{
    DealId, DealPatch, NewDeal, OwnerScope, QuickFilter, SortMode, Stage, StageId, ViewState,
};

use super::ws::{BroadcastCelebration, BroadcastNotifier, WsMessage, broadcast_message};
use crate::board::{
    BoardSession, BoardSnapshot, Celebration, LogCelebration, StageHealth, StageMetrics,
};
use crate::config::BoardSection;
use crate::errors::{BoardError, StoreError};
use crate::store::db::DbHandle;
use crate::store::{DealStore, StageCatalog};

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub db: DbHandle,
    pub ws_tx: broadcast::Sender<String>,
    /// Defaults for board queries: current user, sort and badge thresholds.
    pub board: BoardSection,
}

pub type SharedState = Arc<AppState>;

// ── Request payload types ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateCompanyRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct CreateContactRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct MoveDealRequest {
    pub stage_id: StageId,
}

#[derive(Deserialize)]
pub struct ListDealsQuery {
    pub owner: Option<String>,
}

#[derive(Deserialize)]
pub struct BoardQuery {
    pub owner: Option<String>,
    pub search: Option<String>,
    pub quick_filter: Option<String>,
    pub sort: Option<String>,
}

// ── Response types ────────────────────────────────────────────────────

/// One column of the board in display order.
#[derive(Debug, Serialize)]
pub struct ColumnView {
    pub stage: Stage,
    pub deal_ids: Vec<DealId>,
    pub metrics: Option<StageMetrics>,
}

#[derive(Debug, Serialize)]
pub struct BoardResponse {
    pub view: ViewState,
    pub columns: Vec<ColumnView>,
    pub total_value: Decimal,
    pub weighted_value: Decimal,
    pub active_weighted_value: Decimal,
    pub health: Vec<StageHealth>,
    pub snapshot: BoardSnapshot,
}

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        if err.is_not_found() {
            ApiError::NotFound(err.to_string())
        } else if err.is_invalid_input() {
            ApiError::BadRequest(err.to_string())
        } else {
            ApiError::Internal(err.to_string())
        }
    }
}

impl From<BoardError> for ApiError {
    fn from(err: BoardError) -> Self {
        match err {
            BoardError::FetchFailed(source) | BoardError::MutationFailed { source, .. } => {
                source.into()
            }
            BoardError::NotLoaded => ApiError::Internal(err.to_string()),
        }
    }
}

impl ApiError {
    fn from_anyhow(err: anyhow::Error) -> Self {
        StoreError::from_anyhow(err).into()
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/stages", get(list_stages))
        .route("/api/companies", post(create_company))
        .route("/api/companies/{id}/contacts", post(create_contact))
        .route("/api/deals", get(list_deals).post(create_deal))
        .route(
            "/api/deals/{id}",
            get(get_deal).patch(update_deal).delete(delete_deal),
        )
        .route("/api/deals/{id}/move", patch(move_deal))
        .route("/api/board", get(get_board).post(query_board))
        .route("/health", get(health_check))
}

// ── Helpers ───────────────────────────────────────────────────────────

/// Default view for board queries from this server's configuration.
fn default_view(board: &BoardSection) -> ViewState {
    let mut view = ViewState::for_user(&board.current_user);
    view.sort_mode = board.default_sort;
    view
}

fn view_from_query(board: &BoardSection, query: BoardQuery) -> Result<ViewState, ApiError> {
    let mut view = default_view(board);
    if let Some(owner) = query.owner.filter(|o| !o.trim().is_empty()) {
        view.owner_scope = OwnerScope::Owner(owner);
    }
    if let Some(search) = query.search {
        view.search_term = search;
    }
    if let Some(quick) = query.quick_filter {
        view.filters.quick_filter = quick.parse::<QuickFilter>().map_err(ApiError::BadRequest)?;
    }
    if let Some(sort) = query.sort {
        view.sort_mode = sort.parse::<SortMode>().map_err(ApiError::BadRequest)?;
    }
    Ok(view)
}

/// Load a board session for `view` and flatten it into a response.
async fn build_board(state: &SharedState, view: ViewState) -> Result<BoardResponse, ApiError> {
    let mut session = BoardSession::new(Arc::new(state.db.clone()), view)
        .with_thresholds(
            state.board.card_thresholds(),
            state.board.header_thresholds(),
        )
        .with_notifier(Arc::new(BroadcastNotifier::new(state.ws_tx.clone())));
    session.load().await?;

    let snapshot = session
        .snapshot()
        .cloned()
        .ok_or_else(|| ApiError::from(BoardError::NotLoaded))?;
    let columns = session
        .stages()
        .iter()
        .map(|stage| ColumnView {
            stage: stage.clone(),
            deal_ids: session.controller().column(stage.id).to_vec(),
            metrics: snapshot
                .per_stage_metrics
                .iter()
                .find(|m| m.stage_id == stage.id)
                .cloned(),
        })
        .collect();

    Ok(BoardResponse {
        view: session.view().clone(),
        columns,
        total_value: snapshot.total_value,
        weighted_value: snapshot.weighted_value,
        active_weighted_value: snapshot.active_weighted_value,
        health: session.column_health(),
        snapshot,
    })
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn list_stages(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let stages = state.db.list_stages().await?;
    Ok(Json(stages))
}

async fn create_company(
    State(state): State<SharedState>,
    Json(req): Json<CreateCompanyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let company = state
        .db
        .call(move |db| db.create_company(&req.name))
        .await
        .map_err(ApiError::from_anyhow)?;
    Ok((StatusCode::CREATED, Json(company)))
}

async fn create_contact(
    State(state): State<SharedState>,
    Path(company_id): Path<Uuid>,
    Json(req): Json<CreateContactRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let contact = state
        .db
        .call(move |db| db.create_contact(company_id, &req.name))
        .await
        .map_err(ApiError::from_anyhow)?;
    Ok((StatusCode::CREATED, Json(contact)))
}

async fn list_deals(
    State(state): State<SharedState>,
    Query(query): Query<ListDealsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let deals = state.db.list(query.owner.as_deref()).await?;
    Ok(Json(deals))
}

async fn create_deal(
    State(state): State<SharedState>,
    Json(req): Json<NewDeal>,
) -> Result<impl IntoResponse, ApiError> {
    let deal = state.db.create(req).await?;
    broadcast_message(&state.ws_tx, &WsMessage::DealCreated { deal: deal.clone() });
    Ok((StatusCode::CREATED, Json(deal)))
}

async fn get_deal(
    State(state): State<SharedState>,
    Path(id): Path<DealId>,
) -> Result<impl IntoResponse, ApiError> {
    let deal = state
        .db
        .call(move |db| db.get_deal(id))
        .await
        .map_err(ApiError::from_anyhow)?;
    match deal {
        Some(deal) => Ok(Json(deal)),
        None => Err(StoreError::DealNotFound { id }.into()),
    }
}

async fn update_deal(
    State(state): State<SharedState>,
    Path(id): Path<DealId>,
    Json(req): Json<DealPatch>,
) -> Result<impl IntoResponse, ApiError> {
    if req.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".into()));
    }
    let deal = state.db.update(id, req).await?;
    broadcast_message(&state.ws_tx, &WsMessage::DealUpdated { deal: deal.clone() });
    Ok(Json(deal))
}

async fn delete_deal(
    State(state): State<SharedState>,
    Path(id): Path<DealId>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.delete(id).await?;
    broadcast_message(&state.ws_tx, &WsMessage::DealDeleted { deal_id: id });
    Ok(StatusCode::NO_CONTENT)
}

/// Move a deal to another stage. Moving to the stage it is already in is a
/// no-op and keeps `stage_changed_at`.
async fn move_deal(
    State(state): State<SharedState>,
    Path(id): Path<DealId>,
    Json(req): Json<MoveDealRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let current = state
        .db
        .call(move |db| db.get_deal(id))
        .await
        .map_err(ApiError::from_anyhow)?
        .ok_or(StoreError::DealNotFound { id })?;
    if current.stage_id == req.stage_id {
        return Ok(Json(current));
    }

    let deal = state.db.move_to_stage(id, req.stage_id, Utc::now()).await?;
    info!(deal_id = %id, from = %current.stage_id, to = %deal.stage_id, "Deal moved");
    broadcast_message(
        &state.ws_tx,
        &WsMessage::DealMoved {
            deal_id: id,
            from_stage_id: current.stage_id,
            to_stage_id: deal.stage_id,
            stage_changed_at: deal.stage_changed_at,
        },
    );

    let stages = state.db.list_stages().await?;
    if let Some(stage) = stages
        .iter()
        .find(|s| s.id == deal.stage_id && s.is_closed_won())
    {
        LogCelebration.celebrate(&deal, stage);
        BroadcastCelebration::new(state.ws_tx.clone()).celebrate(&deal, stage);
    }
    Ok(Json(deal))
}

async fn get_board(
    State(state): State<SharedState>,
    Query(query): Query<BoardQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let view = view_from_query(&state.board, query)?;
    Ok(Json(build_board(&state, view).await?))
}

/// Board for an explicit view (filters included) posted as JSON.
async fn query_board(
    State(state): State<SharedState>,
    Json(mut view): Json<ViewState>,
) -> Result<impl IntoResponse, ApiError> {
    if view.current_user_id.trim().is_empty() {
        view.current_user_id = state.board.current_user.clone();
    }
    Ok(Json(build_board(&state, view).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::db::CrmDb;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use pipeline_common::CompanyRef;
    use tower::ServiceExt;

    struct TestApp {
        app: Router,
        db: DbHandle,
        rx: broadcast::Receiver<String>,
        stages: Vec<Stage>,
        company: CompanyRef,
    }

    fn test_app() -> TestApp {
        let db = CrmDb::new_in_memory().unwrap();
        let stages = db.seed_default_stages().unwrap();
        let company = db.create_company("Acme").unwrap();
        let db = DbHandle::new(db);
        let (ws_tx, rx) = broadcast::channel(16);
        let state = Arc::new(AppState {
            db: db.clone(),
            ws_tx,
            board: BoardSection::default(),
        });
        TestApp {
            app: api_router().with_state(state),
            db,
            rx,
            stages,
            company,
        }
    }

    impl TestApp {
        fn stage(&self, name: &str) -> &Stage {
            self.stages.iter().find(|s| s.name == name).unwrap()
        }

        fn new_deal(&self, name: &str, value: i64, stage: &str, owner: &str) -> NewDeal {
            NewDeal {
                name: name.into(),
                company_id: self.company.id,
                contact_id: None,
                value: Decimal::from(value),
                stage_id: self.stage(stage).id,
                owner_id: owner.into(),
                expected_close_date: None,
                probability: None,
                priority: None,
                lead_source: None,
                tags: Vec::new(),
            }
        }

        fn insert_deal(&self, name: &str, value: i64, stage: &str, owner: &str) -> pipeline_common::Deal {
            let fields = self.new_deal(name, value, stage, owner);
            self.db
                .lock_sync()
                .unwrap()
                .create_deal(&fields, Utc::now())
                .unwrap()
        }

        async fn send(&self, method: &str, uri: &str, body: Option<serde_json::Value>) -> Response {
            let builder = Request::builder().method(method).uri(uri);
            let request = match body {
                Some(json) => builder
                    .header("content-type", "application/json")
                    .body(Body::from(json.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };
            self.app.clone().oneshot(request).await.unwrap()
        }
    }

    async fn body_json<T: serde::de::DeserializeOwned>(body: Body) -> T {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn next_event(rx: &mut broadcast::Receiver<String>) -> serde_json::Value {
        serde_json::from_str(&rx.try_recv().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let t = test_app();
        let response = t.send("GET", "/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn test_list_stages_in_catalog_order() {
        let t = test_app();
        let response = t.send("GET", "/api/stages", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let stages: Vec<serde_json::Value> = body_json(response.into_body()).await;
        let names: Vec<_> = stages.iter().map(|s| s["name"].as_str().unwrap()).collect();
        assert_eq!(
            names,
            vec!["Lead", "Qualified", "Proposal", "Negotiation", "Closed Won", "Closed Lost"]
        );
    }

    #[tokio::test]
    async fn test_create_deal_broadcasts_and_lists() {
        let mut t = test_app();
        let fields = t.new_deal("Acme expansion", 12_000, "Lead", "alice");
        let response = t
            .send("POST", "/api/deals", Some(serde_json::to_value(&fields).unwrap()))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let deal: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(deal["name"], "Acme expansion");
        assert_eq!(deal["company"]["name"], "Acme");

        assert_eq!(next_event(&mut t.rx)["type"], "DealCreated");

        t.insert_deal("Other", 100, "Lead", "bob");
        let response = t.send("GET", "/api/deals?owner=alice", None).await;
        let deals: Vec<serde_json::Value> = body_json(response.into_body()).await;
        assert_eq!(deals.len(), 1);
        let response = t.send("GET", "/api/deals", None).await;
        let deals: Vec<serde_json::Value> = body_json(response.into_body()).await;
        assert_eq!(deals.len(), 2);
    }

    #[tokio::test]
    async fn test_create_deal_with_unknown_stage_is_bad_request() {
        let t = test_app();
        let mut fields = t.new_deal("Ghost", 10, "Lead", "alice");
        fields.stage_id = Uuid::new_v4();
        let response = t
            .send("POST", "/api/deals", Some(serde_json::to_value(&fields).unwrap()))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = body_json(response.into_body()).await;
        assert!(body["error"].as_str().unwrap().contains("Stage"));
    }

    #[tokio::test]
    async fn test_create_deal_with_oversized_value_is_bad_request() {
        let t = test_app();
        t.insert_deal("Normal", 1_000, "Proposal", "alice");
        let mut fields = t.new_deal("Whale", 10, "Proposal", "alice");
        fields.value = Decimal::MAX;
        let response = t
            .send("POST", "/api/deals", Some(serde_json::to_value(&fields).unwrap()))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = body_json(response.into_body()).await;
        assert!(body["error"].as_str().unwrap().contains("value"));

        let response = t.send("GET", "/api/board", None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_get_deal_not_found_and_malformed_id() {
        let t = test_app();
        let response = t
            .send("GET", &format!("/api/deals/{}", Uuid::new_v4()), None)
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = t.send("GET", "/api/deals/not-a-uuid", None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_deal() {
        let mut t = test_app();
        let deal = t.insert_deal("Old name", 500, "Lead", "alice");
        let uri = format!("/api/deals/{}", deal.id);

        let response = t
            .send("PATCH", &uri, Some(serde_json::json!({"name": "New name", "probability": 40})))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let updated: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(updated["name"], "New name");
        assert_eq!(updated["probability"], 40);
        assert_eq!(next_event(&mut t.rx)["type"], "DealUpdated");

        let response = t.send("PATCH", &uri, Some(serde_json::json!({}))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = t
            .send("PATCH", &uri, Some(serde_json::json!({"probability": 140})))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = t
            .send("PATCH", &uri, Some(serde_json::json!({"clear": ["probability"]})))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let cleared: serde_json::Value = body_json(response.into_body()).await;
        assert!(cleared["probability"].is_null());
        assert_eq!(cleared["name"], "New name");
    }

    #[tokio::test]
    async fn test_delete_deal() {
        let mut t = test_app();
        let deal = t.insert_deal("Doomed", 500, "Lead", "alice");
        let uri = format!("/api/deals/{}", deal.id);

        let response = t.send("DELETE", &uri, None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(next_event(&mut t.rx)["type"], "DealDeleted");

        let response = t.send("DELETE", &uri, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_move_deal_to_closed_won_broadcasts_win() {
        let mut t = test_app();
        let deal = t.insert_deal("Big one", 80_000, "Negotiation", "alice");
        let won = t.stage("Closed Won").id;

        let response = t
            .send(
                "PATCH",
                &format!("/api/deals/{}/move", deal.id),
                Some(serde_json::json!({"stage_id": won})),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let moved: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(moved["stage_id"], won.to_string());

        let event = next_event(&mut t.rx);
        assert_eq!(event["type"], "DealMoved");
        assert_eq!(event["data"]["from_stage_id"], deal.stage_id.to_string());
        let event = next_event(&mut t.rx);
        assert_eq!(event["type"], "DealWon");
        assert_eq!(event["data"]["stage_name"], "Closed Won");
    }

    #[tokio::test]
    async fn test_move_deal_to_same_stage_is_noop() {
        let mut t = test_app();
        let deal = t.insert_deal("Steady", 100, "Lead", "alice");
        let response = t
            .send(
                "PATCH",
                &format!("/api/deals/{}/move", deal.id),
                Some(serde_json::json!({"stage_id": deal.stage_id})),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(
            body["stage_changed_at"],
            serde_json::to_value(deal.stage_changed_at).unwrap()
        );
        assert!(t.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_move_deal_to_unknown_stage_is_bad_request() {
        let t = test_app();
        let deal = t.insert_deal("Lost", 100, "Lead", "alice");
        let response = t
            .send(
                "PATCH",
                &format!("/api/deals/{}/move", deal.id),
                Some(serde_json::json!({"stage_id": Uuid::new_v4()})),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_company_and_contact() {
        let t = test_app();
        let response = t
            .send("POST", "/api/companies", Some(serde_json::json!({"name": "Globex"})))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let company: serde_json::Value = body_json(response.into_body()).await;

        let uri = format!("/api/companies/{}/contacts", company["id"].as_str().unwrap());
        let response = t.send("POST", &uri, Some(serde_json::json!({"name": "Hank"}))).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let uri = format!("/api/companies/{}/contacts", Uuid::new_v4());
        let response = t.send("POST", &uri, Some(serde_json::json!({"name": "Nobody"}))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_board_groups_and_totals() {
        let t = test_app();
        t.insert_deal("Small", 1_000, "Lead", "me");
        t.insert_deal("Large", 10_000, "Proposal", "someone");
        t.insert_deal("Won", 4_000, "Closed Won", "me");

        let response = t.send("GET", "/api/board", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let board: serde_json::Value = body_json(response.into_body()).await;

        let columns = board["columns"].as_array().unwrap();
        assert_eq!(columns.len(), 6);
        assert_eq!(columns[0]["stage"]["name"], "Lead");
        assert_eq!(columns[0]["deal_ids"].as_array().unwrap().len(), 1);
        assert_eq!(board["health"].as_array().unwrap().len(), 6);

        let total: Decimal = board["total_value"].as_str().unwrap().parse().unwrap();
        assert_eq!(total, Decimal::from(15_000));
        // 1000*10% + 10000*50% + 4000*100%
        let weighted: Decimal = board["weighted_value"].as_str().unwrap().parse().unwrap();
        assert_eq!(weighted, Decimal::from(9_100));
        let active: Decimal = board["active_weighted_value"].as_str().unwrap().parse().unwrap();
        assert_eq!(active, Decimal::from(5_100));
    }

    #[tokio::test]
    async fn test_board_query_parameters() {
        let t = test_app();
        t.insert_deal("Mine", 1_000, "Lead", "me");
        t.insert_deal("Theirs", 9_000, "Lead", "someone");

        let response = t.send("GET", "/api/board?quick_filter=my_deals", None).await;
        let board: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(board["columns"][0]["deal_ids"].as_array().unwrap().len(), 1);

        let response = t.send("GET", "/api/board?search=THEIR&sort=value_desc", None).await;
        let board: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(board["columns"][0]["deal_ids"].as_array().unwrap().len(), 1);
        assert_eq!(board["view"]["sort_mode"], "value_desc");

        let response = t.send("GET", "/api/board?quick_filter=bogus", None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_board_post_with_filters() {
        let t = test_app();
        t.insert_deal("Cheap", 100, "Lead", "me");
        t.insert_deal("Pricey", 50_000, "Lead", "me");

        let view = serde_json::json!({
            "filters": {"min_value": "1000"},
            "sort_mode": "value_asc"
        });
        let response = t.send("POST", "/api/board", Some(view)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let board: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(board["columns"][0]["deal_ids"].as_array().unwrap().len(), 1);
        assert_eq!(board["view"]["current_user_id"], "me");
    }
}
