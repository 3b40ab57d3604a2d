//! HTTP/JSON API consumed by the mobile client.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::DefaultBodyLimit;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use nrve_chat::service::canned_reply;
use nrve_chat::{ChatReply, ChatService};
use nrve_core::{respond_to_mood, JournalEntry, JournalStore, NrveError, PromptKind};
use nrve_store::SqliteStore;

/// Search results returned by `GET /api/journal/search`.
const SEARCH_LIMIT: usize = 3;

/// Largest accepted request body.
const BODY_LIMIT_BYTES: usize = 1024 * 1024;

pub struct AppState {
    pub chat: ChatService<SqliteStore>,
    pub started: Instant,
}

impl AppState {
    pub fn new(chat: ChatService<SqliteStore>) -> Self {
        Self {
            chat,
            started: Instant::now(),
        }
    }

    fn store(&self) -> &SqliteStore {
        self.chat.store()
    }
}

type SharedState = Arc<AppState>;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/journal", get(list_entries).post(create_entry))
        .route("/api/journal/search", get(search_entries))
        .route("/api/journal/{id}", delete(delete_entry))
        .route("/api/journal/{id}/favorite", patch(set_favorite))
        .route("/api/mood", post(mood))
        .route("/api/chat", post(chat))
        .route("/api/prompt", post(prompt))
        .route("/api/health", get(health))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(state: SharedState, host: &str, port: u16) -> anyhow::Result<()> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("NRVE server on http://{addr}");
    axum::serve(listener, router(state))
        .await
        .context("server error")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

pub enum ApiError {
    Domain(NrveError),
    /// Rejected by an extractor before the handler ran.
    Rejected(StatusCode, String),
}

impl From<NrveError> for ApiError {
    fn from(e: NrveError) -> Self {
        Self::Domain(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let status = match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        };
        Self::Rejected(status, rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Rejected(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Domain(e) => {
                let status = match &e {
                    NrveError::Validation(_) => StatusCode::BAD_REQUEST,
                    NrveError::NotFound(_) => StatusCode::NOT_FOUND,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status.is_server_error() {
                    error!("request failed: {e}");
                }
                (status, e.to_string())
            }
            Self::Rejected(status, message) => (status, message),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn invalid<M: Into<String>>(message: M) -> ApiError {
    ApiError::Domain(NrveError::Validation(message.into()))
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn required(field: Option<String>, name: &str) -> Result<String, ApiError> {
    field
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| invalid(format!("{name} required")))
}

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct CreateEntryRequest {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub ok: bool,
    pub removed: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct FavoriteRequest {
    #[serde(default)]
    pub favorite: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MoodRequest {
    #[serde(default)]
    pub mood: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MoodResponse {
    pub reply: String,
    pub mood: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptRequest {
    #[serde(default)]
    pub prompt_type: Option<String>,
    #[serde(default)]
    pub input: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReplyResponse {
    pub reply: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub ok: bool,
    pub entries: usize,
    pub uptime_secs: u64,
    pub upstream_failures: u64,
}

// ---------------------------------------------------------------------------
// Journal
// ---------------------------------------------------------------------------

// GET /api/journal
pub async fn list_entries(State(state): State<SharedState>) -> ApiResult<Vec<JournalEntry>> {
    Ok(Json(state.store().list()?))
}

// GET /api/journal/search?q=
pub async fn search_entries(
    State(state): State<SharedState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> ApiResult<Vec<JournalEntry>> {
    let Query(params) = params?;
    let q = params.q.unwrap_or_default();
    Ok(Json(state.store().search(&q, SEARCH_LIMIT)?))
}

// POST /api/journal
pub async fn create_entry(
    State(state): State<SharedState>,
    body: Result<Json<CreateEntryRequest>, JsonRejection>,
) -> ApiResult<JournalEntry> {
    let Json(req) = body?;
    let text = required(req.text, "text")?;
    Ok(Json(state.store().create(&text)?))
}

// DELETE /api/journal/{id}
pub async fn delete_entry(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<DeleteResponse> {
    let removed = state.store().delete(&id)?;
    Ok(Json(DeleteResponse { ok: true, removed }))
}

// PATCH /api/journal/{id}/favorite
pub async fn set_favorite(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    body: Result<Json<FavoriteRequest>, JsonRejection>,
) -> ApiResult<JournalEntry> {
    let Json(req) = body?;
    let favorite = req
        .favorite
        .ok_or_else(|| invalid("favorite required"))?;
    Ok(Json(state.store().set_favorite(&id, favorite)?))
}

// ---------------------------------------------------------------------------
// Mood, chat, prompts
// ---------------------------------------------------------------------------

// POST /api/mood
pub async fn mood(body: Result<Json<MoodRequest>, JsonRejection>) -> ApiResult<MoodResponse> {
    let Json(req) = body?;
    let mood = required(req.mood, "mood")?;
    let reply = respond_to_mood(&mood)?.to_string();
    Ok(Json(MoodResponse { reply, mood }))
}

// POST /api/chat
pub async fn chat(
    State(state): State<SharedState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<ReplyResponse> {
    let Json(req) = body?;
    let message = required(req.message, "message")?;
    let reply = run_blocking(state, move |s| s.chat.reply(&message)).await?;
    Ok(Json(ReplyResponse { reply: reply.reply }))
}

// POST /api/prompt
pub async fn prompt(
    State(state): State<SharedState>,
    body: Result<Json<PromptRequest>, JsonRejection>,
) -> ApiResult<ReplyResponse> {
    let Json(req) = body?;
    let kind: PromptKind = required(req.prompt_type, "promptType")?
        .parse()
        .map_err(invalid)?;
    let input = required(req.input, "input")?;
    let reply = run_blocking(state, move |s| s.chat.guided(kind, &input)).await?;
    Ok(Json(ReplyResponse { reply: reply.reply }))
}

/// Run a model-backed call off the async runtime. A panicking worker still
/// yields a canned reply rather than a 5xx.
async fn run_blocking<F>(state: SharedState, f: F) -> Result<ChatReply, ApiError>
where
    F: FnOnce(&AppState) -> Result<ChatReply, NrveError> + Send + 'static,
{
    match tokio::task::spawn_blocking(move || f(state.as_ref())).await {
        Ok(result) => Ok(result?),
        Err(e) => {
            error!("chat worker failed: {e}");
            Ok(ChatReply {
                reply: canned_reply().to_string(),
                degraded: true,
            })
        }
    }
}

// GET /api/health
pub async fn health(State(state): State<SharedState>) -> ApiResult<HealthResponse> {
    Ok(Json(HealthResponse {
        ok: true,
        entries: state.store().count()?,
        uptime_secs: state.started.elapsed().as_secs(),
        upstream_failures: state.chat.upstream_failures(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nrve_chat::prompt::CANNED_REPLIES;
    use nrve_chat::ChatSettings;
    use nrve_core::{LanguageModel, NrveResult};

    struct EchoModel;

    impl LanguageModel for EchoModel {
        fn generate(&self, prompt: &str) -> NrveResult<String> {
            Ok(format!("echo:{}", prompt.len()))
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    struct DownModel;

    impl LanguageModel for DownModel {
        fn generate(&self, _prompt: &str) -> NrveResult<String> {
            Err(NrveError::Upstream("503 Service Unavailable".into()))
        }

        fn name(&self) -> &str {
            "down"
        }
    }

    fn state_with(model: Option<Arc<dyn LanguageModel>>) -> SharedState {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        Arc::new(AppState::new(ChatService::new(
            store,
            model,
            ChatSettings::default(),
        )))
    }

    fn state() -> SharedState {
        state_with(None)
    }

    fn status_of<T: Serialize>(result: ApiResult<T>) -> StatusCode {
        result.into_response().status()
    }

    async fn create(state: &SharedState, text: &str) -> JournalEntry {
        let req = CreateEntryRequest {
            text: Some(text.into()),
        };
        create_entry(State(state.clone()), Ok(Json(req)))
            .await
            .ok()
            .unwrap()
            .0
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let state = state();
        let a = create(&state, "A older").await;
        let b = create(&state, "B newer\nbody").await;
        assert_eq!(b.title, "B newer");

        let Json(list) = list_entries(State(state.clone())).await.ok().unwrap();
        let ids: Vec<&str> = list.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec![b.id.as_str(), a.id.as_str()]);
    }

    #[tokio::test]
    async fn test_create_missing_text_is_400() {
        let state = state();
        let empty = CreateEntryRequest::default();
        let result = create_entry(State(state.clone()), Ok(Json(empty))).await;
        assert_eq!(status_of(result), StatusCode::BAD_REQUEST);

        let blank = CreateEntryRequest {
            text: Some("  ".into()),
        };
        let result = create_entry(State(state.clone()), Ok(Json(blank))).await;
        assert_eq!(status_of(result), StatusCode::BAD_REQUEST);
        assert_eq!(state.store().count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_search() {
        let state = state();
        for i in 0..4 {
            create(&state, &format!("Walk {i}\nfelt calm")).await;
        }
        create(&state, "Other").await;

        let params = SearchParams {
            q: Some("CALM".into()),
        };
        let Json(hits) = search_entries(State(state.clone()), Ok(Query(params)))
            .await
            .ok()
            .unwrap();
        assert_eq!(hits.len(), 3);

        let Json(none) = search_entries(State(state.clone()), Ok(Query(SearchParams::default())))
            .await
            .ok()
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_delete_reports_removed() {
        let state = state();
        let entry = create(&state, "bye").await;

        let Json(resp) = delete_entry(State(state.clone()), Path(entry.id.clone()))
            .await
            .ok()
            .unwrap();
        assert!(resp.ok);
        assert_eq!(resp.removed, 1);

        let Json(resp) = delete_entry(State(state.clone()), Path(entry.id))
            .await
            .ok()
            .unwrap();
        assert_eq!(resp.removed, 0);
    }

    #[tokio::test]
    async fn test_favorite() {
        let state = state();
        let entry = create(&state, "star").await;

        let req = FavoriteRequest {
            favorite: Some(true),
        };
        let Json(updated) =
            set_favorite(State(state.clone()), Path(entry.id.clone()), Ok(Json(req)))
                .await
                .ok()
                .unwrap();
        assert!(updated.favorite);
        assert!(updated.updated_at > entry.updated_at);

        let req = FavoriteRequest {
            favorite: Some(true),
        };
        let result =
            set_favorite(State(state.clone()), Path("missing".into()), Ok(Json(req))).await;
        assert_eq!(status_of(result), StatusCode::NOT_FOUND);

        let result = set_favorite(
            State(state.clone()),
            Path(entry.id),
            Ok(Json(FavoriteRequest::default())),
        )
        .await;
        assert_eq!(status_of(result), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_mood() {
        let req = MoodRequest {
            mood: Some("Rainy".into()),
        };
        let Json(resp) = mood(Ok(Json(req))).await.ok().unwrap();
        assert_eq!(resp.mood, "Rainy");
        assert!(resp.reply.contains("Rainy days"));

        let result = mood(Ok(Json(MoodRequest::default()))).await;
        assert_eq!(status_of(result), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_chat_uses_model() {
        let state = state_with(Some(Arc::new(EchoModel) as Arc<dyn LanguageModel>));
        let req = ChatRequest {
            message: Some("hello".into()),
        };
        let Json(resp) = chat(State(state.clone()), Ok(Json(req))).await.ok().unwrap();
        assert!(resp.reply.starts_with("echo:"));
    }

    #[tokio::test]
    async fn test_chat_model_failure_is_200() {
        let state = state_with(Some(Arc::new(DownModel) as Arc<dyn LanguageModel>));
        let req = ChatRequest {
            message: Some("hello".into()),
        };
        let result = chat(State(state.clone()), Ok(Json(req))).await;
        let Json(resp) = result.ok().unwrap();
        assert!(CANNED_REPLIES.contains(&resp.reply.as_str()));

        let Json(h) = health(State(state.clone())).await.ok().unwrap();
        assert_eq!(h.upstream_failures, 1);
    }

    #[tokio::test]
    async fn test_chat_missing_message_is_400() {
        let state = state();
        let result = chat(State(state.clone()), Ok(Json(ChatRequest::default()))).await;
        assert_eq!(status_of(result), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_prompt_validation() {
        let state = state_with(Some(Arc::new(EchoModel) as Arc<dyn LanguageModel>));

        let req = PromptRequest {
            prompt_type: Some("poem".into()),
            input: Some("x".into()),
        };
        let result = prompt(State(state.clone()), Ok(Json(req))).await;
        assert_eq!(status_of(result), StatusCode::BAD_REQUEST);

        let req = PromptRequest {
            prompt_type: Some("gratitude".into()),
            input: None,
        };
        let result = prompt(State(state.clone()), Ok(Json(req))).await;
        assert_eq!(status_of(result), StatusCode::BAD_REQUEST);

        let req = PromptRequest {
            prompt_type: Some("gratitude".into()),
            input: Some("my dog".into()),
        };
        let Json(resp) = prompt(State(state.clone()), Ok(Json(req))).await.ok().unwrap();
        assert!(resp.reply.starts_with("echo:"));
    }

    #[test]
    fn test_prompt_request_camel_case() {
        let req: PromptRequest =
            serde_json::from_str(r#"{"promptType":"reframe","input":"I always fail"}"#).unwrap();
        assert_eq!(req.prompt_type.as_deref(), Some("reframe"));
    }

    #[test]
    fn test_router_builds() {
        let _ = router(state());
    }

    #[tokio::test]
    async fn test_bad_query_string_is_json_400() {
        let uri: axum::http::Uri = "http://localhost/api/journal/search?q=a&q=b".parse().unwrap();
        let params = Query::<SearchParams>::try_from_uri(&uri);
        assert!(params.is_err());

        let response = search_entries(State(state()), params).await.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(value["error"].is_string());
    }

    /// Send one raw HTTP/1.1 POST and return the response text.
    async fn post_raw(addr: std::net::SocketAddr, path: &str, body: &[u8]) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        let head = format!(
            "POST {path} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        stream.write_all(head.as_bytes()).await.unwrap();
        let _ = stream.write_all(body).await;

        let mut buf = Vec::new();
        let _ = stream.read_to_end(&mut buf).await;
        String::from_utf8_lossy(&buf).into_owned()
    }

    #[tokio::test]
    async fn test_body_over_one_megabyte_rejected() {
        let state = state();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let text = "x".repeat(BODY_LIMIT_BYTES);
        let body = serde_json::to_vec(&json!({ "text": text })).unwrap();
        let response = post_raw(addr, "/api/journal", &body).await;
        assert!(response.starts_with("HTTP/1.1 413"), "{response}");
        assert_eq!(state.store().count().unwrap(), 0);

        let body = serde_json::to_vec(&json!({ "text": "x".repeat(512 * 1024) })).unwrap();
        let response = post_raw(addr, "/api/journal", &body).await;
        assert!(response.starts_with("HTTP/1.1 200"), "{response}");
        assert_eq!(state.store().count().unwrap(), 1);
    }
}
