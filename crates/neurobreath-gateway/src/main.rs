//! NeuroBreath assistant gateway: `/api/ai-assistant`, `/api/buddy`, `/health`.
//!
//! Handlers never surface errors as non-JSON responses. Malformed bodies and pipeline panics
//! become the apology payload with status 200.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use neurobreath_core::{Assistant, AssistantConfig, AssistantReply, AssistantRequest, BuddyRequest, ResponsePayload};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinError;
use tower_http::cors::{Any, CorsLayer};
use tracing::Instrument;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone)]
struct AppState {
    assistant: Arc<Assistant>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AssistantConfig::load().map_err(|e| {
        tracing::error!(target: "neurobreath::gateway", error = %e, "configuration failed to load");
        e
    })?;
    let addr: SocketAddr = config.bind_addr.parse().map_err(|e| {
        tracing::error!(target: "neurobreath::gateway", bind_addr = %config.bind_addr, error = %e, "invalid bind address");
        e
    })?;

    tracing::info!(
        target: "neurobreath::gateway",
        version = neurobreath_core::version(),
        environment = ?config.environment,
        model = %config.model.name,
        evidence_lookup = config.evidence_lookup,
        "starting assistant gateway"
    );

    let state = AppState {
        assistant: Arc::new(Assistant::from_config(config)),
    };
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(target: "neurobreath::gateway", %addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(target: "neurobreath::gateway", error = %e, "ctrl-c handler unavailable");
        std::future::pending::<()>().await;
    }
    tracing::info!(target: "neurobreath::gateway", "shutting down");
}

fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/ai-assistant", post(ai_assistant))
        .route("/api/buddy", post(buddy))
        .with_state(state)
        .layer(axum::middleware::from_fn(log_requests))
        .layer(cors)
}

/// Tags each request with a fresh id; the id is echoed in `x-request-id`.
async fn log_requests(request: Request<Body>, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    let span = tracing::info_span!(
        target: "neurobreath::gateway",
        "request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    );
    let started = Instant::now();
    let mut response = next.run(request).instrument(span.clone()).await;
    span.in_scope(|| {
        tracing::info!(
            target: "neurobreath::gateway",
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request finished"
        );
    });
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

async fn health() -> &'static str {
    "OK"
}

fn into_response(reply: AssistantReply) -> Response {
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::OK);
    (status, Json(reply.payload)).into_response()
}

/// Pipeline result, or the apology payload if the task panicked.
fn settle(outcome: Result<AssistantReply, JoinError>) -> Response {
    match outcome {
        Ok(reply) => into_response(reply),
        Err(e) => {
            tracing::error!(target: "neurobreath::gateway", error = %e, "assistant pipeline aborted");
            into_response(AssistantReply::ok(ResponsePayload::fault()))
        }
    }
}

/// POST /api/ai-assistant
async fn ai_assistant(State(state): State<AppState>, body: Bytes) -> Response {
    let req: AssistantRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            tracing::warn!(target: "neurobreath::gateway", error = %e, "malformed assistant request body");
            return into_response(AssistantReply::ok(ResponsePayload::fault()));
        }
    };
    let assistant = Arc::clone(&state.assistant);
    settle(tokio::spawn(async move { assistant.answer(req).await }).await)
}

/// POST /api/buddy. An unreadable body is treated like an empty question.
async fn buddy(State(state): State<AppState>, body: Bytes) -> Response {
    let req: BuddyRequest = serde_json::from_slice(&body).unwrap_or_else(|e| {
        tracing::debug!(target: "neurobreath::gateway", error = %e, "unreadable buddy request body");
        BuddyRequest::default()
    });
    let assistant = Arc::clone(&state.assistant);
    settle(tokio::spawn(async move { assistant.ask_buddy(req).await }).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use neurobreath_core::{ChatMessage, ChatModel, ModelError};
    use tower::ServiceExt;

    /// Model whose completion panics, to exercise the spawned-task fault path.
    struct PanickingModel;

    #[async_trait]
    impl ChatModel for PanickingModel {
        async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, ModelError> {
            panic!("model exploded")
        }
    }

    fn app_with(assistant: Assistant) -> Router {
        build_app(AppState {
            assistant: Arc::new(assistant),
        })
    }

    fn app() -> Router {
        app_with(Assistant::new(AssistantConfig::default()))
    }

    async fn post_json(app: Router, uri: &str, body: &str) -> (StatusCode, serde_json::Value) {
        let req = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        assert!(res.headers().contains_key("x-request-id"));
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_is_ok() {
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"OK");
    }

    #[tokio::test]
    async fn empty_query_is_400() {
        let (status, json) = post_json(app(), "/api/ai-assistant", r#"{"query":""}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["answer"], "Please ask me a question!");
        assert_eq!(json["references"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn emergency_query_returns_signposting() {
        let (status, json) =
            post_json(app(), "/api/ai-assistant", r#"{"query":"I want to kill myself","jurisdiction":"UK"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["answer"].as_str().unwrap().contains("999"));
        assert_eq!(json["safety"]["level"], "emergency");
        assert!(json["references"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unexpected_field_values_still_reach_the_safety_gate() {
        for body in [
            r#"{"query":"I want to kill myself","userRole":"student"}"#,
            r#"{"query":"I want to kill myself","jurisdiction":null}"#,
            r#"{"messages":[{"role":"tool","content":"{}"},{"role":"user","content":"I want to kill myself"}]}"#,
        ] {
            let (status, json) = post_json(app(), "/api/ai-assistant", body).await;
            assert_eq!(status, StatusCode::OK, "{body}");
            assert!(json["answer"].as_str().unwrap().contains("999"), "{body}");
            assert_eq!(json["safety"]["level"], "emergency", "{body}");
        }
    }

    #[tokio::test]
    async fn malformed_body_gets_apology_with_refresh() {
        let (status, json) = post_json(app(), "/api/ai-assistant", "{not json").await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["answer"].as_str().unwrap().starts_with("I apologize for the interruption"));
        assert_eq!(json["recommendedActions"][0]["id"], "refresh");
    }

    #[tokio::test]
    async fn pipeline_panic_gets_apology() {
        let model: Arc<dyn ChatModel> = Arc::new(PanickingModel);
        let app = app_with(Assistant::new(AssistantConfig::default()).with_model(model));
        let (status, json) = post_json(app, "/api/ai-assistant", r#"{"query":"tell me about sleep"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["recommendedActions"][0]["id"], "refresh");
    }

    #[tokio::test]
    async fn buddy_navigation_over_http() {
        let (status, json) = post_json(
            app(),
            "/api/buddy",
            r#"{"question":"where is the focus timer","pathname":"/adhd"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["answer"].as_str().unwrap().contains("**/adhd**"));
        assert_eq!(json["references"][0]["url"], "/adhd");
        assert_eq!(json["references"][0]["isExternal"], false);
    }

    #[tokio::test]
    async fn buddy_unreadable_body_is_treated_as_empty() {
        let (status, json) = post_json(app(), "/api/buddy", "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["answer"], "Please ask me a question!");
    }
}
