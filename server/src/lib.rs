use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::{HeaderMap, StatusCode}, response::{IntoResponse, Response}, routing::{get, post}, Json, Router};
use newsrec_core::persist::{load_recommender, IndexPaths};
use newsrec_core::{ArticleId, ArticleSummary, Recommendation, Recommender};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer, AllowOrigin};
use tower_http::trace::TraceLayer;

pub const MAX_COUNT: i64 = 20;

#[derive(Deserialize)]
pub struct RecommendParams {
    #[serde(default = "default_count")]
    pub num_recs: i64,
}

#[derive(Deserialize)]
pub struct FeaturedParams {
    #[serde(default = "default_count")]
    pub num_articles: i64,
}

fn default_count() -> i64 { 5 }

#[derive(Debug, Serialize, Deserialize)]
pub struct FeaturedArticle {
    pub id: ArticleId,
    pub title: String,
    pub date: String,
    pub link: String,
}

#[derive(Clone)]
pub struct AppState {
    pub index_dir: PathBuf,
    /// Swapped wholesale on reload; requests clone the inner Arc and read without holding the lock.
    pub recommender: Arc<RwLock<Arc<Recommender>>>,
    pub admin_token: Option<String>,
}

impl AppState {
    fn current(&self) -> Arc<Recommender> { self.recommender.read().clone() }
}

#[derive(Debug)]
pub enum ApiError {
    NotFound,
    BadRequest(String),
    Unauthorized(String),
    Internal(String),
}

impl From<newsrec_core::Error> for ApiError {
    fn from(err: newsrec_core::Error) -> Self {
        match err {
            newsrec_core::Error::NotFound { .. } => ApiError::NotFound,
            newsrec_core::Error::InvalidArgument(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Article ID not found".to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };
        (status, Json(serde_json::json!({ "detail": detail }))).into_response()
    }
}

pub fn build_app(index_dir: String) -> Result<Router> {
    // Load the precomputed index at startup
    let recommender = load_recommender(&IndexPaths::new(&index_dir))?;
    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    let state = AppState {
        index_dir: PathBuf::from(&index_dir),
        recommender: Arc::new(RwLock::new(Arc::new(recommender))),
        admin_token,
    };
    Ok(router(state))
}

pub fn router(state: AppState) -> Router {
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
        .route("/articles", get(articles_handler))
        .route("/recommend/:article_id", get(recommend_handler))
        .route("/featured", get(featured_handler))
        .route("/index/reload", post(reload_handler))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn check_count(name: &str, value: i64) -> Result<usize, ApiError> {
    if (1..=MAX_COUNT).contains(&value) {
        Ok(value as usize)
    } else {
        Err(ApiError::BadRequest(format!("{name} must be between 1 and {MAX_COUNT}")))
    }
}

pub async fn articles_handler(State(state): State<AppState>) -> Json<Vec<ArticleSummary>> {
    Json(state.current().list_articles())
}

pub async fn recommend_handler(
    State(state): State<AppState>,
    Path(article_id): Path<i64>,
    Query(params): Query<RecommendParams>,
) -> Result<Json<Vec<Recommendation>>, ApiError> {
    let article_id = ArticleId::try_from(article_id).map_err(|_| ApiError::NotFound)?;
    let n = check_count("num_recs", params.num_recs)?;
    Ok(Json(state.current().recommend(article_id, n)?))
}

pub async fn featured_handler(
    State(state): State<AppState>,
    Query(params): Query<FeaturedParams>,
) -> Result<Json<Vec<FeaturedArticle>>, ApiError> {
    let k = check_count("num_articles", params.num_articles)?;
    Ok(Json(featured(&state.current(), k)?))
}

fn featured(recommender: &Recommender, k: usize) -> Result<Vec<FeaturedArticle>, ApiError> {
    let mut rng = rand::rng();
    Ok(recommender
        .featured(k, &mut rng)?
        .into_iter()
        .map(|a| FeaturedArticle { id: a.id, title: a.title.clone(), date: a.date.clone(), link: a.link.clone() })
        .collect())
}

// --- Admin endpoints ---
async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    let dir = state.index_dir.clone();
    let loaded = tokio::task::spawn_blocking(move || load_recommender(&IndexPaths::new(dir)))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    // On failure the previously loaded index keeps serving.
    let recommender = loaded.map_err(|e| ApiError::Internal(format!("reload failed: {e:#}")))?;
    let num_articles = recommender.corpus().len();
    *state.recommender.write() = Arc::new(recommender);
    tracing::info!(num_articles, "index reloaded");
    Ok(Json(serde_json::json!({ "num_articles": num_articles })))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err(ApiError::Unauthorized("ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err(ApiError::Unauthorized("invalid admin token".into()))
    }
}
