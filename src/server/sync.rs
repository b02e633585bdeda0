use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use super::{ApiError, AppState};
use crate::db::RecordStore;
use crate::models::SyncTable;
use crate::sync::protocol::{ACTION_PULL, ACTION_PUSH};
use crate::sync::{pull, push, FeedResponse, PullResponse, PushResponse, SyncRequest};

/// `POST /api/sync`
///
/// Push items are decoded one by one, so a malformed change is reported
/// in `errors` without failing the request. Pull is not paged: its
/// timestamp becomes the client's checkpoint and must cover every row.
pub async fn sync(
    State(state): State<AppState>,
    payload: Result<Json<SyncRequest<Value>>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let store = RecordStore::new(state.pool.clone());

    match request.action.as_str() {
        ACTION_PUSH => {
            let outcome = push::push_json(&store, &request.changes).await;
            Ok(Json(PushResponse {
                success: outcome.is_clean(),
                processed: outcome.processed,
                errors: outcome.errors,
            })
            .into_response())
        }
        ACTION_PULL => {
            let outcome = pull::pull(
                &store,
                request.last_sync_timestamp.as_deref(),
                &SyncTable::ALL,
                None,
            )
            .await;
            Ok(Json(PullResponse {
                success: outcome.errors.is_empty(),
                changes: outcome.changes,
                timestamp: outcome.timestamp,
                errors: outcome.errors,
            })
            .into_response())
        }
        other => Err(ApiError::InvalidAction(other.to_string())),
    }
}

#[derive(Debug, Deserialize)]
pub struct FeedParams {
    since: Option<String>,
}

/// `GET /api/sync`: read-only feed over the tables shown in the web client.
pub async fn feed(
    State(state): State<AppState>,
    Query(params): Query<FeedParams>,
) -> Json<FeedResponse> {
    let store = RecordStore::new(state.pool.clone());
    let outcome = pull::pull(
        &store,
        params.since.as_deref(),
        &SyncTable::FEED,
        Some(state.config.pull_page_size),
    )
    .await;

    Json(FeedResponse {
        changes: outcome.changes,
        timestamp: outcome.timestamp,
        errors: outcome.errors,
    })
}
