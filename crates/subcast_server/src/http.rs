use axum::{
    extract::rejection::JsonRejection,
    extract::{Path, State},
    http::{header, HeaderName, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use subcast_broker::BrokerError;
use subcast_protocol::code;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{middleware, websocket};

/// The full application router: REST surface, `/ws` upgrade, API-key gate,
/// CORS, request tracing.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/topics", post(create_topic).get(list_topics))
        .route("/topics/:name", delete(delete_topic))
        .route("/ws", get(websocket::ws_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_api_key,
        ))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(middleware::API_KEY_HEADER),
        ])
}

/// Consistent JSON error envelope for the REST surface.
fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({
            "type": "error",
            "error": { "code": code, "message": message },
        })),
    )
        .into_response()
}

async fn root() -> &'static str {
    "OK"
}

async fn health(State(state): State<AppState>) -> Response {
    Json(state.registry.health()).into_response()
}

async fn stats(State(state): State<AppState>) -> Response {
    Json(state.registry.stats()).into_response()
}

async fn list_topics(State(state): State<AppState>) -> Response {
    Json(json!({ "topics": state.registry.list_topics() })).into_response()
}

#[derive(Debug, Deserialize)]
struct CreateTopicRequest {
    #[serde(default)]
    name: String,
}

async fn create_topic(
    State(state): State<AppState>,
    payload: Result<Json<CreateTopicRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(request)) = payload else {
        return error_response(StatusCode::BAD_REQUEST, code::BAD_REQUEST, "name is required");
    };
    let name = request.name.trim();
    if name.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, code::BAD_REQUEST, "name is required");
    }
    match state.registry.create_topic(name) {
        Ok(_) => (
            StatusCode::CREATED,
            Json(json!({ "status": "created", "topic": name })),
        )
            .into_response(),
        Err(BrokerError::TopicExists) => error_response(
            StatusCode::CONFLICT,
            code::CONFLICT,
            "topic already exists",
        ),
        Err(err) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            code::INTERNAL,
            &err.to_string(),
        ),
    }
}

async fn delete_topic(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    match state.registry.delete_topic(&name) {
        Ok(()) => Json(json!({ "status": "deleted", "topic": name })).into_response(),
        Err(BrokerError::TopicNotFound) => error_response(
            StatusCode::NOT_FOUND,
            code::TOPIC_NOT_FOUND,
            "topic not found",
        ),
        Err(err) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            code::INTERNAL,
            &err.to_string(),
        ),
    }
}
