use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::StatusCode, routing::{get, post}, Json, Router};
use engine::persist::{load_corpus, parse_corpus};
use engine::{
    compare_documents, soft_cosine_measure, word_similarity_by_word, Corpus, CorpusError, DocumentComparison, GraphData,
    GraphEvent, GraphJob, GraphWorker, Stage, WorkerError,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

type ApiError = (StatusCode, String);

#[derive(Deserialize)]
pub struct PairParams {
    pub doc1: String,
    pub doc2: String,
    pub top: Option<usize>,
}

#[derive(Deserialize)]
pub struct WordPairParams {
    pub word1: String,
    pub word2: String,
}

#[derive(Deserialize)]
pub struct DocParams {
    /// Comma-separated words to wrap in `<em>`.
    pub highlight: Option<String>,
}

#[derive(Serialize)]
pub struct SimilarityResponse {
    pub first: String,
    pub second: String,
    pub similarity: f64,
}

#[derive(Serialize)]
pub struct CorpusSummary {
    pub version: String,
    pub words: usize,
    pub documents: usize,
    pub queries: usize,
}

/// Latest state of the graph computation, for clients polling a progress bar.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GraphProgress {
    pub running: bool,
    pub stage: Option<String>,
    pub percent: f64,
    pub error: Option<String>,
}

/// The corpus currently loaded; `generation` changes on every upload.
#[derive(Clone)]
struct Session {
    corpus: Arc<Corpus>,
    generation: u64,
}

#[derive(Clone, Default)]
pub struct AppState {
    session: Arc<RwLock<Option<Session>>>,
    graph: Arc<RwLock<Option<GraphData>>>,
    progress: Arc<RwLock<GraphProgress>>,
    worker: GraphWorker,
}

impl AppState {
    pub fn with_corpus(corpus: Option<Corpus>) -> Self {
        let state = Self::default();
        if let Some(corpus) = corpus {
            state.replace_corpus(corpus);
        }
        state
    }

    fn replace_corpus(&self, corpus: Corpus) -> CorpusSummary {
        let summary = CorpusSummary {
            version: corpus.version.clone(),
            words: corpus.dictionary.len(),
            documents: corpus.texts_bow.len(),
            queries: corpus.results.len(),
        };
        let mut session = self.session.write();
        let generation = session.as_ref().map_or(0, |s| s.generation + 1);
        *session = Some(Session { corpus: Arc::new(corpus), generation });
        *self.graph.write() = None;
        *self.progress.write() = GraphProgress::default();
        summary
    }

    fn session(&self) -> Result<Session, ApiError> {
        self.session
            .read()
            .clone()
            .ok_or_else(|| (StatusCode::PRECONDITION_FAILED, "no corpus loaded".into()))
    }

    fn corpus(&self) -> Result<Arc<Corpus>, ApiError> {
        Ok(self.session()?.corpus)
    }

    /// Runs `update` only if `generation` is still the loaded corpus. The session lock is
    /// held throughout, so an upload cannot interleave with the update.
    fn when_current(&self, generation: u64, update: impl FnOnce()) -> bool {
        let session = self.session.read();
        let current = session.as_ref().map(|s| s.generation) == Some(generation);
        if current {
            update();
        }
        current
    }
}

pub fn build_app(corpus_path: Option<String>) -> Result<Router> {
    let corpus = corpus_path.map(load_corpus).transpose()?;
    Ok(router(AppState::with_corpus(corpus)))
}

pub fn router(app_state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/corpus", post(corpus_handler))
        .route("/similarity", get(similarity_handler))
        .route("/words/similarity", get(word_similarity_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/comparison", get(comparison_handler))
        .route("/graph", post(generate_graph_handler).get(graph_handler))
        .route("/graph/progress", get(progress_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn corpus_error(err: CorpusError) -> ApiError {
    let status = match err {
        CorpusError::DocumentNotFound(_) | CorpusError::WordNotFound(_) => StatusCode::NOT_FOUND,
        CorpusError::Schema(_) => StatusCode::BAD_REQUEST,
    };
    (status, err.to_string())
}

pub async fn corpus_handler(State(state): State<AppState>, body: String) -> Result<Json<CorpusSummary>, ApiError> {
    let corpus = parse_corpus(&body).map_err(corpus_error)?;
    let summary = state.replace_corpus(corpus);
    tracing::info!(version = %summary.version, documents = summary.documents, queries = summary.queries, "corpus replaced");
    Ok(Json(summary))
}

pub async fn similarity_handler(State(state): State<AppState>, Query(params): Query<PairParams>) -> Result<Json<SimilarityResponse>, ApiError> {
    let corpus = state.corpus()?;
    let similarity = soft_cosine_measure(&params.doc1, &params.doc2, &corpus).map_err(corpus_error)?;
    Ok(Json(SimilarityResponse { first: params.doc1, second: params.doc2, similarity }))
}

pub async fn word_similarity_handler(State(state): State<AppState>, Query(params): Query<WordPairParams>) -> Result<Json<SimilarityResponse>, ApiError> {
    let corpus = state.corpus()?;
    let similarity = word_similarity_by_word(&params.word1, &params.word2, &corpus).map_err(corpus_error)?;
    Ok(Json(SimilarityResponse { first: params.word1, second: params.word2, similarity }))
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<String>, Query(params): Query<DocParams>) -> Result<Json<serde_json::Value>, ApiError> {
    let corpus = state.corpus()?;
    let words = corpus.document_words(&doc_id).map_err(corpus_error)?;
    let mut obj = serde_json::json!({
        "doc_id": doc_id,
        "text": words.join(" "),
    });
    if let Some(raw) = params.highlight.as_deref() {
        let terms: HashSet<&str> = raw.split(',').map(str::trim).filter(|t| !t.is_empty()).collect();
        obj["highlighted"] = serde_json::Value::String(highlight_words(&words, &terms));
    }
    Ok(Json(obj))
}

/// HTML-escapes the words and wraps those in `terms` in `<em>`. Matches whole words only.
fn highlight_words(words: &[&str], terms: &HashSet<&str>) -> String {
    words
        .iter()
        .map(|w| {
            let escaped = escape_html(w);
            if terms.contains(w) { format!("<em>{escaped}</em>") } else { escaped }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub async fn comparison_handler(State(state): State<AppState>, Query(params): Query<PairParams>) -> Result<Json<DocumentComparison>, ApiError> {
    let corpus = state.corpus()?;
    let cmp = compare_documents(&params.doc1, &params.doc2, params.top, &corpus).map_err(corpus_error)?;
    Ok(Json(cmp))
}

/// Runs graph generation on the worker and answers with the finished graph.
///
/// The run is followed by a spawned task, so a client that hangs up early does not
/// stop the graph from being stored or leave the progress stuck at `running`.
pub async fn generate_graph_handler(State(state): State<AppState>) -> Result<Json<GraphData>, ApiError> {
    let session = state.session()?;
    let job = state.worker.submit(session.corpus).map_err(|e| match e {
        WorkerError::Busy => (StatusCode::CONFLICT, e.to_string()),
        other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    })?;
    state.when_current(session.generation, || {
        *state.progress.write() = GraphProgress { running: true, stage: Some(Stage::GeneratingNodes.to_string()), percent: 0.0, error: None };
    });

    tokio::spawn(follow_graph_job(state, session.generation, job))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map(Json)
}

/// Mirrors the job's events into the shared state until it ends. Events from a run
/// whose corpus has since been replaced are not recorded.
async fn follow_graph_job(state: AppState, generation: u64, mut job: GraphJob) -> Result<GraphData, ApiError> {
    while let Some(event) = job.recv().await {
        match event {
            GraphEvent::Progress { stage, percent } => {
                state.when_current(generation, || {
                    let mut progress = state.progress.write();
                    progress.stage = Some(stage.to_string());
                    progress.percent = percent;
                });
            }
            GraphEvent::Completed { graph } => {
                let stored = state.when_current(generation, || {
                    *state.graph.write() = Some(graph.clone());
                    *state.progress.write() = GraphProgress { running: false, stage: Some(Stage::CreatingLinks.to_string()), percent: 100.0, error: None };
                });
                if !stored {
                    tracing::info!(generation, "corpus replaced during the run; graph not stored");
                }
                return Ok(graph);
            }
            GraphEvent::Failed { error } => {
                state.when_current(generation, || {
                    let mut progress = state.progress.write();
                    progress.running = false;
                    progress.error = Some(error.to_string());
                });
                return Err((StatusCode::INTERNAL_SERVER_ERROR, error.to_string()));
            }
        }
    }
    let error = WorkerError::Disconnected.to_string();
    state.when_current(generation, || {
        let mut progress = state.progress.write();
        progress.running = false;
        progress.error = Some(error.clone());
    });
    Err((StatusCode::INTERNAL_SERVER_ERROR, error))
}

pub async fn graph_handler(State(state): State<AppState>) -> Result<Json<GraphData>, ApiError> {
    state
        .graph
        .read()
        .clone()
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "graph not generated".into()))
}

pub async fn progress_handler(State(state): State<AppState>) -> Json<GraphProgress> {
    Json(state.progress.read().clone())
}
