//! Listing and download handlers.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use radar_common::{RadarError, TimeRange};
use serde::Deserialize;
use tracing::debug;

use super::ApiError;
use crate::archive::ArchiveEntry;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl ListQuery {
    fn range(&self) -> Result<TimeRange, RadarError> {
        let start = self
            .start
            .as_deref()
            .ok_or_else(|| RadarError::MissingParameter("start".to_string()))?;
        let end = self
            .end
            .as_deref()
            .ok_or_else(|| RadarError::MissingParameter("end".to_string()))?;
        TimeRange::parse(start, end).map_err(|e| RadarError::InvalidTime(e.to_string()))
    }
}

/// GET /api/:product/list?start=&end= - Images captured in a time range
pub async fn list_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(product): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ArchiveEntry>>, ApiError> {
    let range = query.range()?;
    let entries = state.archive.list(&product, &range).await?;
    debug!(product = %product, count = entries.len(), "Listed archive");
    Ok(Json(entries))
}

/// GET /api/:product/:filename - One published image
pub async fn fetch_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((product, file_name)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let bytes = state.archive.fetch(&product, &file_name).await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], bytes).into_response())
}
