// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Visit query routes for billing/audit consumers.

use crate::error::Result;
use crate::models::{LocationVisit, VisitFilter};
use crate::services::store_call;
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/visits", get(list_visits))
}

#[derive(Serialize)]
pub struct VisitsResponse {
    pub visits: Vec<LocationVisit>,
    pub total: usize,
}

/// Visit records filtered by vehicle/geofence/shipment/status,
/// newest entries first.
async fn list_visits(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<VisitFilter>,
) -> Result<Json<VisitsResponse>> {
    let visits = store_call(
        state.config.store_query_timeout,
        state.store.visits(&filter),
    )
    .await?;

    Ok(Json(VisitsResponse {
        total: visits.len(),
        visits,
    }))
}
