use crate::models::{Card, CreateCardRequest, UpdateCardRequest};
use crate::service::{CardError, CardService};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use common::AppState;
use serde_json::json;
use std::sync::Arc;

impl IntoResponse for CardError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            CardError::InvalidInput(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            CardError::Rejected(rejection) => (rejection.status(), rejection.body_text()),
            CardError::BadId(PathRejection::FailedToDeserializePathParams(e)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, e.body_text())
            }
            CardError::BadId(rejection) => (rejection.status(), rejection.body_text()),
            CardError::NotFound => (StatusCode::NOT_FOUND, "Card not found".to_string()),
            CardError::Infrastructure(detail) => {
                tracing::error!("Card request failed: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": msg }))).into_response()
    }
}

pub fn cards_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_cards).post(create_card))
        .route("/{id}", get(get_card).put(update_card).delete(delete_card))
        .with_state(state)
}

async fn list_cards(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Card>>, CardError> {
    let cards = CardService::list_cards(&state.db).await?;
    Ok(Json(cards))
}

async fn get_card(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Card>, CardError> {
    let Path(id) = id?;
    let card = CardService::get_card(&state.db, id).await?;
    Ok(Json(card))
}

// Path and body rejections are taken as a `Result` so they render through
// `CardError` like every other failure.
async fn create_card(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateCardRequest>, JsonRejection>,
) -> Result<impl IntoResponse, CardError> {
    let Json(payload) = payload?;
    let card = CardService::create_card(&state.db, payload).await?;
    Ok((StatusCode::CREATED, Json(card)))
}

async fn update_card(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateCardRequest>, JsonRejection>,
) -> Result<Json<Card>, CardError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let card = CardService::update_card(&state.db, id, payload).await?;
    Ok(Json(card))
}

async fn delete_card(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, CardError> {
    let Path(id) = id?;
    CardService::delete_card(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
