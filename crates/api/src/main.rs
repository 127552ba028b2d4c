use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use api::metrics::MetricsSnapshot;
use api::{AppConfig, GraphBuild, Pipeline};
use extract::{OllamaClient, PartialGraph};
use ingest::Paragraph;
use merge::{MergeError, MergedGraph};
use summarize::DocumentSummary;

#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
    ollama: OllamaClient,
}

#[derive(Serialize)]
struct HealthResponse {
    ollama: String,
    model: String,
}

#[derive(Deserialize)]
struct PathRequest {
    path: String,
}

#[derive(Serialize)]
struct ParagraphsResponse {
    paragraphs: Vec<Paragraph>,
}

#[derive(Deserialize)]
struct GraphRequest {
    chunks: Vec<String>,
}

#[derive(Deserialize)]
struct MergeRequest {
    graphs: Vec<PartialGraph>,
}

#[derive(Serialize)]
struct MergeResponse {
    graph: MergedGraph,
    stats: merge::GraphStats,
}

#[derive(Deserialize)]
struct QuestionsRequest {
    summary: Option<String>,
    graph: Option<PartialGraph>,
}

#[derive(Serialize)]
struct QuestionsResponse {
    questions: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;

    // Initialize tracing
    api::init_tracing();

    let bind_addr = config.server.bind_addr.clone();
    let ollama = OllamaClient::with_timeout(
        config.ollama.base_url.clone(),
        config.ollama.model.clone(),
        Duration::from_secs(config.concurrency.request_timeout_secs),
    )?;
    let pipeline = Pipeline::from_config(config)?;

    let state = Arc::new(AppState {
        pipeline: Arc::new(pipeline),
        ollama,
    });

    // Build router
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/paragraphs", post(extract_paragraphs))
        .route("/summarize", post(summarize_document))
        .route("/graph", post(build_graph))
        .route("/merge", post(merge_graphs))
        .route("/questions", post(generate_questions))
        .route("/stats", get(get_stats))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn health_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HealthResponse>, StatusCode> {
    let ollama = &state.ollama;

    // Ollama lists installed models at /api/tags
    let url = format!("{}/api/tags", ollama.base_url());
    let ollama_status = match ollama.http().get(&url).send().await {
        Ok(resp) if resp.status().is_success() => "ok".to_string(),
        Ok(resp) => format!("error: status {}", resp.status()),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        ollama: ollama_status,
        model: ollama.model().to_string(),
    }))
}

async fn extract_paragraphs(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PathRequest>,
) -> Result<Json<ParagraphsResponse>, StatusCode> {
    let path = existing_path(&req.path)?;

    let paragraphs = state.pipeline
        .paragraphs(&path)
        .await
        .map_err(|e| internal_error(&state, "Paragraph extraction", e))?;

    state.pipeline.metrics().record_request(true);
    Ok(Json(ParagraphsResponse { paragraphs }))
}

async fn summarize_document(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PathRequest>,
) -> Result<Json<DocumentSummary>, StatusCode> {
    let path = existing_path(&req.path)?;

    let summary = state.pipeline
        .summarize_document(&path)
        .await
        .map_err(|e| internal_error(&state, "Summarization", e))?;

    state.pipeline.metrics().record_request(true);
    Ok(Json(summary))
}

async fn build_graph(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GraphRequest>,
) -> Result<Json<GraphBuild>, StatusCode> {
    let build = state.pipeline
        .build_graph(req.chunks)
        .await
        .map_err(|e| pipeline_error(&state, "Graph build", e))?;

    state.pipeline.metrics().record_request(true);
    Ok(Json(build))
}

async fn merge_graphs(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MergeRequest>,
) -> Result<Json<MergeResponse>, StatusCode> {
    let graph = state.pipeline
        .merge(&req.graphs)
        .map_err(|e| pipeline_error(&state, "Merge", e))?;

    state.pipeline.metrics().record_request(true);
    let stats = graph.stats();
    Ok(Json(MergeResponse { graph, stats }))
}

async fn generate_questions(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QuestionsRequest>,
) -> Result<Json<QuestionsResponse>, StatusCode> {
    let questions = match (req.summary, req.graph) {
        (Some(summary), _) => state.pipeline.questions_for(&summary).await,
        (None, Some(graph)) => {
            let merged = state.pipeline
                .merge(std::slice::from_ref(&graph))
                .map_err(|e| pipeline_error(&state, "Merge", e))?;
            state.pipeline.questions_for_graph(&merged).await
        }
        (None, None) => return Err(StatusCode::BAD_REQUEST),
    }
    .map_err(|e| internal_error(&state, "Question generation", e))?;

    state.pipeline.metrics().record_request(true);
    Ok(Json(QuestionsResponse { questions }))
}

async fn get_stats(
    State(state): State<Arc<AppState>>,
) -> Json<MetricsSnapshot> {
    Json(state.pipeline.metrics().snapshot())
}

fn existing_path(raw: &str) -> Result<PathBuf, StatusCode> {
    let path = PathBuf::from(raw);
    if !path.exists() {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(path)
}

fn internal_error(state: &AppState, operation: &str, e: anyhow::Error) -> StatusCode {
    tracing::error!(operation, error = %format!("{:#}", e), "Request failed");
    state.pipeline.metrics().record_request(false);
    StatusCode::INTERNAL_SERVER_ERROR
}

/// Merge validation failures are the caller's fault; anything else is ours.
fn pipeline_error(state: &AppState, operation: &str, e: anyhow::Error) -> StatusCode {
    if e.downcast_ref::<MergeError>().is_some() {
        tracing::warn!(operation, error = %format!("{:#}", e), "Rejected invalid graph");
        state.pipeline.metrics().record_request(false);
        return StatusCode::BAD_REQUEST;
    }
    internal_error(state, operation, e)
}
