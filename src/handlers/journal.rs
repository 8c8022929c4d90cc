use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::domain::JournalEntry;
use crate::error::AppError;
use crate::AppState;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

#[derive(Debug, Deserialize)]
pub struct JournalQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// `GET /liqpay/journal`: newest callback attempts first.
pub async fn list_journal(
    State(state): State<AppState>,
    Query(query): Query<JournalQuery>,
) -> Result<Json<Vec<JournalEntry>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    let offset = query.offset.unwrap_or(0);
    if limit <= 0 {
        return Err(AppError::BadRequest("limit must be positive".to_string()));
    }
    if offset < 0 {
        return Err(AppError::BadRequest("offset must not be negative".to_string()));
    }

    let entries = state.journal.list(limit.min(MAX_LIMIT), offset).await?;
    Ok(Json(entries))
}
