use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::warn;

use taskboard_common::{BoardId, CardId, ColumnId};

use super::db::SqliteGateway;
use super::drag::DragEvent;
use super::service::BoardService;
use super::ws::{WsMessage, broadcast_message};
use crate::errors::{DragError, StoreError};

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub service: BoardService<SqliteGateway>,
    pub ws_tx: broadcast::Sender<String>,
}

pub type SharedState = Arc<AppState>;

// ── Request payload types ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct TitleRequest {
    pub title: String,
}

#[derive(Deserialize)]
pub struct CreateCardRequest {
    pub title: String,
    pub order: Option<u32>,
}

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let msg = err.to_string();
        match err {
            StoreError::NotFound { .. } => ApiError::NotFound(msg),
            StoreError::AlreadyExists { .. } => ApiError::Conflict(msg),
            StoreError::Validation(_) => ApiError::BadRequest(msg),
            _ => ApiError::Internal(msg),
        }
    }
}

impl From<DragError> for ApiError {
    fn from(err: DragError) -> Self {
        let msg = err.to_string();
        match err {
            DragError::Store(err) => err.into(),
            DragError::Busy { .. } => ApiError::Conflict(msg),
            _ => ApiError::BadRequest(msg),
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/boards", get(list_boards).post(create_board))
        .route(
            "/api/boards/{id}",
            get(get_board).patch(rename_board).delete(delete_board),
        )
        .route("/api/boards/{id}/columns", post(create_column))
        .route("/api/boards/{id}/drag", post(apply_drag))
        .route("/api/boards/{id}/repair", post(repair_board))
        .route(
            "/api/columns/{id}",
            patch(rename_column).delete(delete_column),
        )
        .route("/api/columns/{id}/cards", post(create_card))
        .route("/api/cards/{id}", patch(rename_card).delete(delete_card))
        .route("/health", get(health_check))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn list_boards(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.list_boards().await?))
}

async fn create_board(
    State(state): State<SharedState>,
    Json(req): Json<TitleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let board = state.service.create_board(&req.title).await?;
    Ok((StatusCode::CREATED, Json(board)))
}

async fn get_board(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.board_view(&BoardId::from(id)).await?))
}

async fn rename_board(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<TitleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let board = state
        .service
        .rename_board(&BoardId::from(id), &req.title)
        .await?;
    Ok(Json(board))
}

async fn delete_board(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.service.delete_board(&BoardId::from(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_column(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<TitleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let column = state
        .service
        .create_column(&BoardId::from(id), &req.title)
        .await?;
    Ok((StatusCode::CREATED, Json(column)))
}

async fn apply_drag(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(event): Json<DragEvent>,
) -> Result<impl IntoResponse, ApiError> {
    let board_id = BoardId::from(id);
    let outcome = state.service.apply_drag(&board_id, &event).await?;
    if !outcome.is_complete() {
        warn!(board = %board_id, failed = outcome.failures.len(), "Drag applied partially");
    }
    if !outcome.applied.is_empty() || !outcome.is_complete() {
        broadcast_message(
            &state.ws_tx,
            &WsMessage::DragSettled {
                board_id,
                item_id: event.dragged_item_id.clone(),
                applied: outcome.applied.len(),
                failed: outcome.failures.len(),
            },
        );
    }
    Ok(Json(outcome))
}

async fn repair_board(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state.service.repair_board(&BoardId::from(id)).await?;
    Ok(Json(report))
}

async fn rename_column(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<TitleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let column = state
        .service
        .rename_column(&ColumnId::from(id), &req.title)
        .await?;
    Ok(Json(column))
}

async fn delete_column(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.service.delete_column(&ColumnId::from(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_card(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<CreateCardRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let card = state
        .service
        .create_card(&ColumnId::from(id), &req.title, req.order)
        .await?;
    Ok((StatusCode::CREATED, Json(card)))
}

async fn rename_card(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<TitleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let card = state
        .service
        .rename_card(&CardId::from(id), &req.title)
        .await?;
    Ok(Json(card))
}

async fn delete_card(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.service.delete_card(&CardId::from(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn test_state() -> SharedState {
        let gateway = SqliteGateway::open_in_memory().unwrap();
        let (ws_tx, _) = broadcast::channel(16);
        Arc::new(AppState {
            service: BoardService::new(gateway, "tester"),
            ws_tx,
        })
    }

    fn test_app(state: SharedState) -> Router {
        api_router().with_state(state)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = test_app(test_state());
        let request = Request::builder()
            .method("GET")
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn test_board_lifecycle() {
        let app = test_app(test_state());

        let (status, boards) = send(&app, "GET", "/api/boards", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(boards, json!([]));

        let (status, board) = send(&app, "POST", "/api/boards", Some(json!({"title": "Roadmap"}))).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = board["id"].as_str().unwrap().to_string();

        let (status, renamed) = send(
            &app,
            "PATCH",
            &format!("/api/boards/{id}"),
            Some(json!({"title": "Plan"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(renamed["title"], "Plan");

        let (status, _) = send(&app, "DELETE", &format!("/api/boards/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(&app, "GET", &format!("/api/boards/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn test_blank_title_is_bad_request() {
        let app = test_app(test_state());
        let (status, body) = send(&app, "POST", "/api/boards", Some(json!({"title": "  "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_board_view_nests_columns_and_cards() {
        let app = test_app(test_state());
        let (_, board) = send(&app, "POST", "/api/boards", Some(json!({"title": "Roadmap"}))).await;
        let board_id = board["id"].as_str().unwrap();
        let (status, column) = send(
            &app,
            "POST",
            &format!("/api/boards/{board_id}/columns"),
            Some(json!({"title": "Todo"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let column_id = column["id"].as_str().unwrap();

        for title in ["B", "A"] {
            send(
                &app,
                "POST",
                &format!("/api/columns/{column_id}/cards"),
                Some(json!({"title": title, "order": 0})),
            )
            .await;
        }

        let (status, view) = send(&app, "GET", &format!("/api/boards/{board_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        let cards = &view["columns"][0]["cards"];
        assert_eq!(cards[0]["title"], "A");
        assert_eq!(cards[1]["title"], "B");
        assert_eq!(cards[1]["order"], 1);
    }

    #[tokio::test]
    async fn test_drag_endpoint_moves_card_and_broadcasts() {
        let state = test_state();
        let mut rx = state.ws_tx.subscribe();
        let app = test_app(state.clone());

        let board = state.service.create_board("Roadmap").await.unwrap();
        let todo = state.service.create_column(&board.id, "Todo").await.unwrap();
        let done = state.service.create_column(&board.id, "Done").await.unwrap();
        let a = state.service.create_card(&todo.id, "A", None).await.unwrap();

        let event = json!({
            "dragType": "CARD",
            "draggedItemId": a.id.as_str(),
            "source": { "containerId": todo.id.as_str(), "index": 0 },
            "destination": { "containerId": done.id.as_str() }
        });
        let (status, outcome) = send(
            &app,
            "POST",
            &format!("/api/boards/{}/drag", board.id),
            Some(event),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome["applied"].as_array().unwrap().len(), 1);
        assert_eq!(outcome["failures"], json!([]));

        let msg = rx.recv().await.unwrap();
        let parsed: Value = serde_json::from_str(&msg).unwrap();
        assert_eq!(parsed["type"], "DragSettled");
        assert_eq!(parsed["data"]["applied"], 1);

        let moved = state.service.board_view(&board.id).await.unwrap();
        assert_eq!(moved.columns[1].cards[0].id, a.id);
    }

    #[tokio::test]
    async fn test_drag_with_stale_source_is_rejected() {
        let state = test_state();
        let app = test_app(state.clone());
        let board = state.service.create_board("Roadmap").await.unwrap();
        let todo = state.service.create_column(&board.id, "Todo").await.unwrap();
        let a = state.service.create_card(&todo.id, "A", None).await.unwrap();

        let event = json!({
            "dragType": "CARD",
            "draggedItemId": a.id.as_str(),
            "source": { "containerId": todo.id.as_str(), "index": 3 },
            "destination": { "containerId": todo.id.as_str(), "index": 0 }
        });
        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/boards/{}/drag", board.id),
            Some(event),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Invalid drop target"));
    }

    #[tokio::test]
    async fn test_delete_card_and_repair() {
        let state = test_state();
        let app = test_app(state.clone());
        let board = state.service.create_board("Roadmap").await.unwrap();
        let todo = state.service.create_column(&board.id, "Todo").await.unwrap();
        let a = state.service.create_card(&todo.id, "A", None).await.unwrap();
        state.service.create_card(&todo.id, "B", None).await.unwrap();

        let (status, _) = send(&app, "DELETE", &format!("/api/cards/{}", a.id), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, "DELETE", &format!("/api/cards/{}", a.id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, report) =
            send(&app, "POST", &format!("/api/boards/{}/repair", board.id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report, json!({"columns": 0, "cards": 0}));
    }

    #[test]
    fn test_store_errors_map_to_status() {
        let cases = [
            (StoreError::validation("x"), StatusCode::BAD_REQUEST),
            (StoreError::Closed, StatusCode::INTERNAL_SERVER_ERROR),
            (
                StoreError::not_found(crate::board::gateway::RecordKind::Card, "c"),
                StatusCode::NOT_FOUND,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
        let busy = ApiError::from(DragError::Busy { phase: "resolving" });
        assert_eq!(busy.into_response().status(), StatusCode::CONFLICT);
    }
}
