//! Broadcast list, detail and per-recipient log endpoints.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use database::{Audience, Broadcast, BroadcastLog, BroadcastStatus, ContentType, Recipient};

use crate::error::{AdminError, Result};
use crate::state::AppState;

/// One broadcast with live counters.
#[derive(Clone, Serialize)]
pub struct BroadcastSummary {
    pub id: i64,
    pub audience: Audience,
    pub content_type: ContentType,
    pub status: BroadcastStatus,
    pub total_recipients: i64,
    pub sent_count: i64,
    pub failed_count: i64,
    pub success_rate: f64,
    pub created_at: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
}

impl From<&Broadcast> for BroadcastSummary {
    fn from(broadcast: &Broadcast) -> Self {
        Self {
            id: broadcast.id,
            audience: broadcast.audience,
            content_type: broadcast.content_type,
            status: broadcast.status,
            total_recipients: broadcast.total_recipients,
            sent_count: broadcast.sent_count,
            failed_count: broadcast.failed_count,
            success_rate: broadcast.success_rate(),
            created_at: broadcast.created_at.clone(),
            started_at: broadcast.started_at.clone(),
            completed_at: broadcast.completed_at.clone(),
        }
    }
}

/// Full broadcast detail including the content and recipient snapshot.
#[derive(Clone, Serialize)]
pub struct BroadcastDetail {
    #[serde(flatten)]
    pub summary: BroadcastSummary,
    pub text: String,
    pub file_id: String,
    pub created_by_telegram_id: Option<i64>,
    pub recipients: Vec<Recipient>,
}

/// List all broadcasts, newest first.
pub async fn list_api(State(state): State<AppState>) -> Result<Json<Vec<BroadcastSummary>>> {
    let broadcasts = database::broadcast::list_broadcasts(state.db.pool()).await?;
    let summaries = broadcasts.iter().map(BroadcastSummary::from).collect();
    Ok(Json(summaries))
}

/// Get one broadcast with its recipient snapshot.
pub async fn detail_api(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<BroadcastDetail>> {
    let broadcast = database::broadcast::get_broadcast(state.db.pool(), id).await?;
    let recipients = broadcast
        .recipient_list()
        .map_err(|e| AdminError::Internal(format!("Bad recipient snapshot: {e}")))?;

    Ok(Json(BroadcastDetail {
        summary: BroadcastSummary::from(&broadcast),
        text: broadcast.text,
        file_id: broadcast.file_id,
        created_by_telegram_id: broadcast.created_by_telegram_id,
        recipients,
    }))
}

/// List the per-recipient delivery log of a broadcast.
pub async fn logs_api(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<BroadcastLog>>> {
    // 404 for an unknown broadcast rather than an empty list.
    database::broadcast::get_broadcast(state.db.pool(), id).await?;
    let logs = database::delivery_log::list_for_broadcast(state.db.pool(), id).await?;
    Ok(Json(logs))
}
