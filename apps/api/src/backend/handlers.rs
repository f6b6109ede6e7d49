use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::job::{JobRecord, JobSearchQuery};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CountryQuery {
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    "US".to_string()
}

/// GET /api/v1/jobs
pub async fn handle_search_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobSearchQuery>,
) -> Result<Json<Vec<JobRecord>>, AppError> {
    Ok(Json(state.backend.search_jobs(&query).await?))
}

/// GET /api/v1/lookups/states?country=
pub async fn handle_states(
    State(state): State<AppState>,
    Query(query): Query<CountryQuery>,
) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(state.backend.states_by_country(&query.country).await?))
}

/// GET /api/v1/lookups/skills
pub async fn handle_skills(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(state.backend.skills().await?))
}
