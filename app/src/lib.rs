use axum::{routing::get, Json, Router};
use common::{cors::cors_layer, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub const WELCOME_MESSAGE: &str = "Welcome to the Kanban API!";

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);

    Router::<Arc<AppState>>::new()
        .route("/", get(root))
        .nest("/cards", cards::handler::cards_router(state.clone()))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn root() -> Json<Value> {
    Json(json!({ "message": WELCOME_MESSAGE }))
}
