use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    error::AppResult,
    models::{MovieRecord, UiState},
    seed,
};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Serialize)]
pub struct Snapshot {
    state: UiState,
    results: Vec<MovieRecord>,
}

type Accepted = (StatusCode, Json<Snapshot>);

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/state", get(snapshot))
        .route("/reset", post(reset))
        .route("/movies", get(list_movies))
        .route("/movies/{id}", get(get_movie))
        .route("/movies/seed", post(seed_movies))
        .route("/movies/import", post(import_movies))
        .route("/movies/clear", post(clear_movies))
        .route("/search/title", post(search_title))
        .route("/search/save", post(save_title))
        .route("/search/local/title", post(local_title))
        .route("/search/local/actor", post(local_actor))
        .route("/search/web", post(web_search))
        .with_state(state)
}

fn current(state: &AppState) -> Snapshot {
    Snapshot {
        state: state.coordinator.current_state(),
        results: state.coordinator.current_results(),
    }
}

fn accepted(state: &AppState) -> Accepted {
    (StatusCode::ACCEPTED, Json(current(state)))
}

pub async fn snapshot(State(state): State<Arc<AppState>>) -> Json<Snapshot> {
    Json(current(&state))
}

pub async fn reset(State(state): State<Arc<AppState>>) -> Json<Snapshot> {
    state.coordinator.reset();
    Json(current(&state))
}

pub async fn list_movies(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<MovieRecord>>> {
    let movies = state.catalog.list_all().next().await.transpose()?.unwrap_or_default();
    Ok(Json(movies))
}

pub async fn get_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<MovieRecord>> {
    Ok(Json(state.catalog.get_by_id(&id).await?))
}

pub async fn seed_movies(State(state): State<Arc<AppState>>) -> Accepted {
    state.coordinator.add_seed_movies(seed::predefined_movies());
    accepted(&state)
}

pub async fn import_movies(State(state): State<Arc<AppState>>, body: String) -> AppResult<Accepted> {
    let movies = seed::parse_pipe_delimited(&body)?;
    state.coordinator.add_seed_movies(movies);
    Ok(accepted(&state))
}

pub async fn clear_movies(State(state): State<Arc<AppState>>) -> AppResult<StatusCode> {
    state.catalog.clear_all().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn search_title(State(state): State<Arc<AppState>>, Query(q): Query<SearchQuery>) -> Accepted {
    state.coordinator.search_by_title(&q.q);
    accepted(&state)
}

pub async fn save_title(State(state): State<Arc<AppState>>, Query(q): Query<SearchQuery>) -> Accepted {
    state.coordinator.save_by_title(&q.q);
    accepted(&state)
}

pub async fn local_title(State(state): State<Arc<AppState>>, Query(q): Query<SearchQuery>) -> Accepted {
    state.coordinator.list_local_by_title(&q.q);
    accepted(&state)
}

pub async fn local_actor(State(state): State<Arc<AppState>>, Query(q): Query<SearchQuery>) -> Accepted {
    state.coordinator.list_local_by_actor(&q.q);
    accepted(&state)
}

pub async fn web_search(State(state): State<Arc<AppState>>, Query(q): Query<SearchQuery>) -> Accepted {
    state.coordinator.web_search(&q.q);
    accepted(&state)
}
