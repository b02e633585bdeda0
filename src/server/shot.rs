use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{ApiError, AppState};
use crate::db::{AnalysisSummary, ShotAnalysisRepository, ShotOwner};
use crate::models::{analyze as assess, ShotAssessment, ShotObservation};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(flatten)]
    observation: ShotObservation,
    revier_id: Option<String>,
    user_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    success: bool,
    analysis_id: String,
    #[serde(flatten)]
    assessment: ShotAssessment,
}

/// `POST /api/shot-analysis`
pub async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let Json(request) = payload?;
    let assessment = assess(&request.observation);

    let mut owner = ShotOwner::default();
    if let Some(revier_id) = request.revier_id {
        owner.revier_id = revier_id;
    }
    if let Some(user_id) = request.user_id {
        owner.user_id = user_id;
    }

    let recorded = ShotAnalysisRepository::new(state.pool.clone())
        .record(&request.observation, &assessment, &owner)
        .await?;
    tracing::info!(
        analysis_id = %recorded.analysis_id,
        hit_zone = %assessment.hit_zone,
        "shot analysed"
    );

    Ok(Json(AnalyzeResponse {
        success: true,
        analysis_id: recorded.analysis_id,
        assessment,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryParams {
    user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    analyses: Vec<AnalysisSummary>,
}

/// `GET /api/shot-analysis`
pub async fn history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let analyses = ShotAnalysisRepository::new(state.pool.clone())
        .history(params.user_id.as_deref(), state.config.history_limit)
        .await?;
    Ok(Json(HistoryResponse { analyses }))
}
