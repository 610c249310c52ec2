use anyhow::Result;
use axum::{extract::{Query, State}, http::StatusCode, response::{IntoResponse, Response}, routing::get, Json, Router};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use recommender::recommend::{count_param, HybridRecommendation, TreePickParams};
use recommender::snapshot::{load_meta, load_snapshot, MetaFile, SnapshotPaths};
use recommender::{ItemId, RecError, Snapshot};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer, AllowOrigin};
use tower_http::trace::TraceLayer;

pub const DEFAULT_GENRE: &str = "Action";

#[derive(Clone)]
pub struct AppState {
    /// Never mutated after startup; handlers only read it.
    pub snapshot: Arc<Snapshot>,
    pub rng: Arc<Mutex<StdRng>>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("game not found: {0}")]
    UnknownGame(String),
    #[error(transparent)]
    InvalidParameter(#[from] RecError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::UnknownGame(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn build_app(snapshot_dir: String) -> Result<Router> {
    let snapshot = load_snapshot(&SnapshotPaths::new(&snapshot_dir))?;
    // RECOMMENDER_SEED makes the random tree picks reproducible
    let rng = match std::env::var("RECOMMENDER_SEED").ok().and_then(|s| s.trim().parse::<u64>().ok()) {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    Ok(router(snapshot, rng))
}

/// Reads the snapshot's meta file and logs what is about to be served.
pub fn snapshot_summary(snapshot_dir: &str) -> Result<MetaFile> {
    let meta = load_meta(&SnapshotPaths::new(snapshot_dir))?;
    if meta.games == 0 || meta.graph_edges == 0 {
        tracing::warn!(snapshot_dir, games = meta.games, graph_edges = meta.graph_edges, "snapshot is empty; recommendations will be empty");
    }
    tracing::info!(
        snapshot_dir,
        created_at = %meta.created_at,
        games = meta.games,
        genres = meta.genres,
        graph_nodes = meta.graph_nodes,
        graph_edges = meta.graph_edges,
        "serving snapshot"
    );
    Ok(meta)
}

pub fn router(snapshot: Snapshot, rng: StdRng) -> Router {
    let app_state = AppState { snapshot: Arc::new(snapshot), rng: Arc::new(Mutex::new(rng)) };

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
        .route("/top", get(top_handler))
        .route("/recommend", get(session_handler))
        .route("/recommend/graph", get(graph_handler))
        .route("/recommend/tree", get(tree_handler))
        .route("/recommend/hybrid", get(hybrid_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

#[derive(Deserialize)]
pub struct TopParams {
    pub genre: Option<String>,
    pub k: Option<i64>,
}

#[derive(Serialize)]
pub struct TopResponse {
    pub genre: Option<String>,
    pub games: Vec<String>,
}

pub async fn top_handler(State(state): State<AppState>, Query(params): Query<TopParams>) -> Result<Json<TopResponse>, ApiError> {
    let k = count_param("k", params.k.unwrap_or(10))?;
    let games = match &params.genre {
        Some(genre) => state.snapshot.popularity.top_n_in_category(genre, k),
        None => state.snapshot.popularity.top_n_overall(k),
    };
    Ok(Json(TopResponse { genre: params.genre, games }))
}

#[derive(Deserialize)]
pub struct GraphParams {
    pub game: String,
    pub k: Option<i64>,
}

#[derive(Serialize)]
pub struct GraphResponse {
    pub game_id: ItemId,
    pub games: Vec<String>,
}

pub async fn graph_handler(State(state): State<AppState>, Query(params): Query<GraphParams>) -> Result<Json<GraphResponse>, ApiError> {
    let top_n = count_param("k", params.k.unwrap_or(5))?;
    let game_id = resolve(&state, &params.game)?;
    let games = state.snapshot.recommend_by_graph(&game_id, top_n);
    Ok(Json(GraphResponse { game_id, games }))
}

#[derive(Deserialize)]
pub struct TreeParams {
    pub genre: Option<String>,
    pub picks: Option<i64>,
    pub cutoff: Option<i64>,
}

#[derive(Serialize)]
pub struct TreeResponse {
    pub genre: String,
    pub games: Vec<String>,
}

pub async fn tree_handler(State(state): State<AppState>, Query(params): Query<TreeParams>) -> Result<Json<TreeResponse>, ApiError> {
    let pick = pick_params(params.picks, params.cutoff)?;
    let genre = params.genre.unwrap_or_else(|| DEFAULT_GENRE.to_string());
    let games = state.snapshot.recommend_by_tree(&genre, pick, &mut *state.rng.lock());
    Ok(Json(TreeResponse { genre, games }))
}

#[derive(Deserialize)]
pub struct HybridParams {
    pub game: String,
    pub genre: Option<String>,
    pub picks: Option<i64>,
    pub cutoff: Option<i64>,
}

#[derive(Serialize)]
pub struct HybridResponse {
    pub game_id: ItemId,
    pub genre: String,
    #[serde(flatten)]
    pub hybrid: HybridRecommendation,
}

pub async fn hybrid_handler(State(state): State<AppState>, Query(params): Query<HybridParams>) -> Result<Json<HybridResponse>, ApiError> {
    let pick = pick_params(params.picks, params.cutoff)?;
    let game_id = resolve(&state, &params.game)?;
    let genre = params.genre.unwrap_or_else(|| DEFAULT_GENRE.to_string());
    let hybrid = state.snapshot.hybrid(&game_id, &genre, pick, &mut *state.rng.lock());
    Ok(Json(HybridResponse { game_id, genre, hybrid }))
}

#[derive(Deserialize)]
pub struct SessionParams {
    pub game: String,
    pub genre: Option<String>,
}

/// Everything shown for one "favourite game + genre" query.
#[derive(Serialize)]
pub struct SessionResponse {
    pub game_id: ItemId,
    pub genre: String,
    pub top_in_genre: Vec<String>,
    pub tree: Vec<String>,
    pub graph: Vec<String>,
    pub hybrid: HybridRecommendation,
}

pub async fn session_handler(State(state): State<AppState>, Query(params): Query<SessionParams>) -> Result<Json<SessionResponse>, ApiError> {
    let game_id = resolve(&state, &params.game)?;
    let genre = match params.genre.as_deref().map(str::trim) {
        Some(g) if !g.is_empty() => g.to_string(),
        _ => DEFAULT_GENRE.to_string(),
    };
    let snap = &state.snapshot;
    let pick = TreePickParams::default();
    let top_in_genre = snap.popularity.top10_in_category(&genre);
    let graph = snap.recommend_by_graph(&game_id, 5);
    let (tree, hybrid) = {
        let mut rng = state.rng.lock();
        (snap.recommend_by_tree(&genre, pick, &mut *rng), snap.hybrid(&game_id, &genre, pick, &mut *rng))
    };
    Ok(Json(SessionResponse { game_id, genre, top_in_genre, tree, graph, hybrid }))
}

fn resolve(state: &AppState, name: &str) -> Result<ItemId, ApiError> {
    state.snapshot.resolve(name.trim()).cloned().ok_or_else(|| ApiError::UnknownGame(name.to_string()))
}

fn pick_params(picks: Option<i64>, cutoff: Option<i64>) -> Result<TreePickParams, RecError> {
    let defaults = TreePickParams::default();
    TreePickParams::from_signed(
        picks.unwrap_or(defaults.picks as i64),
        cutoff.unwrap_or(defaults.cutoff as i64),
    )
}
