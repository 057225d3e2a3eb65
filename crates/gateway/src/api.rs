//! REST endpoints.
//!
//! | Method | Path | Purpose |
//! |--------|------|---------|
//! | POST | `/api/chat` | Answer a message within a session |
//! | POST | `/api/feedback` | Record thumbs-up/down on an answer |
//! | GET | `/api/sessions/{id}` | Inspect a live session |
//! | POST | `/api/index/rebuild` | Recompute and republish the knowledge index |
//! | GET | `/health` | Liveness plus session and index counts |

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use ledgerwise_agent::{ChatOutcome, ChatRequest, FeedbackRequest};
use ledgerwise_core::error::{Error, ErrorKind};
use ledgerwise_core::session::Session;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::SharedState;

/// Build the API router.
pub fn api_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/feedback", post(feedback_handler))
        .route("/api/sessions/{id}", get(session_handler))
        .route("/api/index/rebuild", post(rebuild_index_handler))
        .with_state(state)
}

// ── Response types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Chat failures always echo the session id, `null` when none was resolved.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatErrorResponse {
    pub error: String,
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebuildResponse {
    pub status: String,
    pub indexed_terms: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: i64,
    pub sessions: usize,
    pub indexed_terms: usize,
}

/// HTTP status for a pipeline error.
fn status_for(err: &Error) -> StatusCode {
    match err.kind() {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::UnknownSession => StatusCode::NOT_FOUND,
        ErrorKind::GenerationFailure if err.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::GenerationFailure => StatusCode::BAD_GATEWAY,
        ErrorKind::IndexBuildFailure | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn public_message(err: &Error) -> String {
    match err {
        Error::Session(ledgerwise_core::SessionError::NotFound(_)) => "Session not found".into(),
        Error::InvalidInput(message) => message.clone(),
        other => other.to_string(),
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatOutcome>, (StatusCode, Json<ChatErrorResponse>)> {
    state.pipeline.chat(payload).await.map(Json).map_err(|failure| {
        let status = status_for(&failure.error);
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %failure.error, "Chat request failed");
        }
        (
            status,
            Json(ChatErrorResponse {
                error: public_message(&failure.error),
                session_id: failure.session_id.map(|id| id.to_string()),
            }),
        )
    })
}

async fn feedback_handler(
    State(state): State<SharedState>,
    Json(payload): Json<FeedbackRequest>,
) -> Result<Json<StatusResponse>, (StatusCode, Json<ErrorResponse>)> {
    state
        .pipeline
        .submit_feedback(payload)
        .await
        .map_err(|e| {
            (
                status_for(&e),
                Json(ErrorResponse {
                    error: public_message(&e),
                }),
            )
        })?;

    Ok(Json(StatusResponse {
        status: "success".into(),
    }))
}

async fn session_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Session>, (StatusCode, Json<ErrorResponse>)> {
    state
        .pipeline
        .sessions()
        .snapshot(&id)
        .await
        .map(Json)
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "Session not found".into(),
                }),
            )
        })
}

async fn rebuild_index_handler(
    State(state): State<SharedState>,
) -> Result<Json<RebuildResponse>, (StatusCode, Json<ErrorResponse>)> {
    info!("Index rebuild requested");
    let index = state.pipeline.knowledge().rebuild().await.map_err(|e| {
        let e = Error::from(e);
        error!(error = %e, "Index rebuild failed, previous index kept");
        (
            status_for(&e),
            Json(ErrorResponse {
                error: public_message(&e),
            }),
        )
    })?;

    Ok(Json(RebuildResponse {
        status: "rebuilt".into(),
        indexed_terms: index.len(),
    }))
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        uptime_secs: (chrono::Utc::now() - state.start_time).num_seconds(),
        sessions: state.pipeline.sessions().len().await,
        indexed_terms: state.pipeline.knowledge().indexed_terms().await,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GatewayState;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use ledgerwise_agent::{ChatPipeline, ResponseComposer, SessionStore};
    use ledgerwise_core::knowledge::{KnowledgeEntry, Vector, Vectorizer};
    use ledgerwise_core::provider::{Provider, ProviderRequest, ProviderResponse};
    use ledgerwise_core::error::ProviderError;
    use ledgerwise_core::KnowledgeError;
    use ledgerwise_knowledge::{HashVectorizer, InMemoryIndexStorage, KnowledgeBase, KnowledgeStore};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    /// Lightweight mock provider for gateway tests.
    struct MockProvider {
        result: Result<String, ProviderError>,
    }

    #[async_trait::async_trait]
    impl Provider for MockProvider {
        fn name(&self) -> &str {
            "gateway_mock"
        }

        async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            self.result.clone().map(|text| ProviderResponse {
                text,
                model: request.model,
                usage: None,
            })
        }
    }

    /// Hash vectorizer with a failure switch, for rebuild tests.
    struct FlakyVectorizer {
        inner: HashVectorizer,
        failing: AtomicBool,
    }

    #[async_trait::async_trait]
    impl Vectorizer for FlakyVectorizer {
        fn name(&self) -> &str {
            "flaky"
        }

        fn dimension(&self) -> usize {
            128
        }

        async fn vectorize(&self, text: &str) -> Result<Vector, KnowledgeError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(KnowledgeError::Vectorization("offline".into()));
            }
            self.inner.vectorize(text).await
        }
    }

    fn state_with(result: Result<String, ProviderError>, vectorizer: Arc<dyn Vectorizer>) -> SharedState {
        let knowledge = KnowledgeBase::new(
            KnowledgeStore::new(vec![
                KnowledgeEntry::new("budget", "A plan for your money."),
                KnowledgeEntry::new("saving", "Setting money aside."),
            ]),
            vectorizer,
            Arc::new(InMemoryIndexStorage::new()),
            3,
        );
        let pipeline = ChatPipeline::new(
            Arc::new(knowledge),
            Arc::new(SessionStore::default()),
            ResponseComposer::new(Arc::new(MockProvider { result }), "mock-model"),
        );
        Arc::new(GatewayState::new(Arc::new(pipeline)))
    }

    fn test_state() -> SharedState {
        state_with(
            Ok("Mock answer".into()),
            Arc::new(HashVectorizer::new(128)),
        )
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn chat_creates_session_and_answers() {
        let app = api_router(test_state());
        let response = app
            .oneshot(post_json("/api/chat", serde_json::json!({"message": "how do I save money"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert!(!json["sessionId"].as_str().unwrap().is_empty());
        assert_eq!(json["response"], "Mock answer");
        let terms = json["relevantTerms"].as_array().unwrap();
        assert!(!terms.is_empty() && terms.len() <= 3);
    }

    #[tokio::test]
    async fn chat_without_message_is_bad_request() {
        let app = api_router(test_state());
        let response = app
            .oneshot(post_json("/api/chat", serde_json::json!({"sessionId": "abc"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json: ChatErrorResponse = serde_json::from_value(body_json(response).await).unwrap();
        assert!(json.error.contains("message"));
        assert!(json.session_id.is_none());
    }

    #[tokio::test]
    async fn generation_failure_is_bad_gateway_with_session_id() {
        let state = state_with(
            Err(ProviderError::ApiError {
                status_code: 500,
                message: "upstream exploded".into(),
            }),
            Arc::new(HashVectorizer::new(128)),
        );
        let app = api_router(state.clone());
        let response = app
            .oneshot(post_json("/api/chat", serde_json::json!({"message": "what is a bond?"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let json: ChatErrorResponse = serde_json::from_value(body_json(response).await).unwrap();
        assert!(json.error.contains("upstream exploded"));
        let session_id = json.session_id.unwrap();
        assert!(state.pipeline.sessions().contains(&session_id).await);
    }

    #[tokio::test]
    async fn generation_timeout_is_gateway_timeout() {
        let state = state_with(
            Err(ProviderError::Timeout("60s elapsed".into())),
            Arc::new(HashVectorizer::new(128)),
        );
        let response = api_router(state)
            .oneshot(post_json("/api/chat", serde_json::json!({"message": "etf?"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    /// Indexes normally but times out embedding anything that is not a
    /// `term: definition` line.
    struct QueryTimeoutVectorizer {
        inner: HashVectorizer,
    }

    #[async_trait::async_trait]
    impl Vectorizer for QueryTimeoutVectorizer {
        fn name(&self) -> &str {
            "query_timeout"
        }

        fn dimension(&self) -> usize {
            128
        }

        async fn vectorize(&self, text: &str) -> Result<Vector, KnowledgeError> {
            if text.contains(": ") {
                return self.inner.vectorize(text).await;
            }
            Err(KnowledgeError::Embedding {
                provider: "embedder".into(),
                source: ProviderError::Timeout("embedding timed out".into()),
            })
        }
    }

    #[tokio::test]
    async fn query_embedding_timeout_is_gateway_timeout() {
        let state = state_with(
            Ok("unused".into()),
            Arc::new(QueryTimeoutVectorizer {
                inner: HashVectorizer::new(128),
            }),
        );
        let response = api_router(state.clone())
            .oneshot(post_json("/api/chat", serde_json::json!({"message": "how do I save money"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);

        let json: ChatErrorResponse = serde_json::from_value(body_json(response).await).unwrap();
        assert!(json.error.contains("embedding timed out"));
        assert!(json.session_id.is_some());
        assert_eq!(state.pipeline.knowledge().indexed_terms().await, 2);
    }

    #[tokio::test]
    async fn feedback_unknown_session_is_not_found() {
        let state = test_state();
        let response = api_router(state.clone())
            .oneshot(post_json(
                "/api/feedback",
                serde_json::json!({"sessionId": "ghost", "type": "positive", "messageIndex": 0}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let json: ErrorResponse = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(json.error, "Session not found");
        assert_eq!(state.pipeline.sessions().len().await, 0);
    }

    #[tokio::test]
    async fn feedback_on_live_session_succeeds() {
        let state = test_state();
        let response = api_router(state.clone())
            .oneshot(post_json("/api/chat", serde_json::json!({"message": "budget"})))
            .await
            .unwrap();
        let session_id = body_json(response).await["sessionId"].as_str().unwrap().to_string();

        let response = api_router(state.clone())
            .oneshot(post_json(
                "/api/feedback",
                serde_json::json!({
                    "sessionId": session_id,
                    "type": "positive",
                    "messageIndex": 0,
                    "text": "clear!"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "success");

        let response = api_router(state)
            .oneshot(
                Request::builder()
                    .uri(format!("/api/sessions/{session_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let session = body_json(response).await;
        assert_eq!(session["conversation"].as_array().unwrap().len(), 1);
        assert_eq!(session["conversation"][0]["botText"], "Mock answer");
        assert_eq!(session["feedback"][0]["type"], "positive");
    }

    #[tokio::test]
    async fn session_lookup_not_found() {
        let response = api_router(test_state())
            .oneshot(
                Request::builder()
                    .uri("/api/sessions/nonexistent")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn rebuild_reports_term_count() {
        let response = api_router(test_state())
            .oneshot(post_json("/api/index/rebuild", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json: RebuildResponse = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(json.indexed_terms, 2);
    }

    #[tokio::test]
    async fn failed_rebuild_keeps_serving() {
        let vectorizer = Arc::new(FlakyVectorizer {
            inner: HashVectorizer::new(128),
            failing: AtomicBool::new(false),
        });
        let state = state_with(Ok("ok".into()), vectorizer.clone());
        state.pipeline.knowledge().ensure_index().await.unwrap();

        vectorizer.failing.store(true, Ordering::SeqCst);
        let response = api_router(state.clone())
            .oneshot(post_json("/api/index/rebuild", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(state.pipeline.knowledge().indexed_terms().await, 2);
    }

    #[tokio::test]
    async fn health_reports_counts() {
        let state = test_state();
        api_router(state.clone())
            .oneshot(post_json("/api/chat", serde_json::json!({"message": "saving"})))
            .await
            .unwrap();

        let response = api_router(state)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json: HealthResponse = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(json.status, "ok");
        assert_eq!(json.sessions, 1);
        assert_eq!(json.indexed_terms, 2);
    }

    #[tokio::test]
    async fn full_router_applies_cors() {
        let config = ledgerwise_config::GatewayConfig::default();
        let app = crate::build_router(test_state(), &config);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("origin", "http://example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );
    }
}
