// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP surface tests over the full router.

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use common::{seed_vehicle, test_state};
use fleet_tracker::AppState;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

fn test_app() -> (Router, Arc<AppState>) {
    let state = test_state();
    (fleet_tracker::routes::create_router(state.clone()), state)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn health_endpoint_responds() {
    let (app, _state) = test_app();
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn record_position_round_trip() {
    let (app, state) = test_app();
    let vehicle = seed_vehicle(&state, Uuid::new_v4()).await;

    let response = app
        .oneshot(post_json(
            "/api/positions",
            json!({
                "vehicle_id": vehicle.id,
                "latitude": -33.86,
                "longitude": 151.20,
                "timestamp": "2024-01-15T09:00:00Z",
                "speed": 42.5,
                "source": "MOBILE_APP"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["vehicle_id"], vehicle.id.to_string());
    assert_eq!(body["position_advanced"], true);
    assert_eq!(body["last_known_latitude"], -33.86);
}

#[tokio::test]
async fn record_position_rejects_bad_latitude() {
    let (app, state) = test_app();
    let vehicle = seed_vehicle(&state, Uuid::new_v4()).await;

    let response = app
        .oneshot(post_json(
            "/api/positions",
            json!({
                "vehicle_id": vehicle.id,
                "latitude": 95.0,
                "longitude": 151.20,
                "timestamp": "2024-01-15T09:00:00Z"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn record_position_unknown_vehicle_is_404() {
    let (app, _state) = test_app();

    let response = app
        .oneshot(post_json(
            "/api/positions",
            json!({
                "vehicle_id": Uuid::new_v4(),
                "latitude": -33.86,
                "longitude": 151.20,
                "timestamp": "2024-01-15T09:00:00Z"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn vehicle_history_is_newest_first() {
    let (app, state) = test_app();
    let vehicle = seed_vehicle(&state, Uuid::new_v4()).await;

    for (i, hour) in ["08", "09", "10"].iter().enumerate() {
        state
            .ingest
            .record_position(common::position_request(
                vehicle.id,
                -33.86 + i as f64 * 0.01,
                151.20,
                &format!("2024-01-15T{}:00:00Z", hour),
            ))
            .await
            .unwrap();
    }

    let response = app
        .oneshot(get(&format!("/api/vehicles/{}/history?limit=2", vehicle.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let samples = body["samples"].as_array().unwrap();
    assert_eq!(samples.len(), 2);
    assert_eq!(samples[0]["timestamp"], "2024-01-15T10:00:00Z");
    assert_eq!(samples[1]["timestamp"], "2024-01-15T09:00:00Z");
}

#[tokio::test]
async fn fleet_view_and_bounds_queries() {
    let (app, state) = test_app();
    let company = Uuid::new_v4();
    let vehicle = seed_vehicle(&state, company).await;
    state
        .ingest
        .record_position(common::position_request(
            vehicle.id,
            -33.86,
            151.20,
            &fleet_tracker::time_utils::format_utc_rfc3339(chrono::Utc::now()),
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(get(&format!(
            "/api/map/fleet?min_lat=-34.0&min_lng=150.9&max_lat=-33.7&max_lng=151.4&zoom=15&company_id={}",
            company
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["type"], "FeatureCollection");
    assert_eq!(body["metadata"]["display_mode"], "individual");
    assert_eq!(body["metadata"]["feature_count"], 1);

    // Inverted bounds are a validation error
    let response = app
        .clone()
        .oneshot(get(
            "/api/map/fleet?min_lat=-33.0&min_lng=150.9&max_lat=-34.0&max_lng=151.4&zoom=15",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Bounds endpoint returns null until the aggregate is materialized
    let response = app
        .clone()
        .oneshot(get(&format!("/api/map/bounds?company_id={}", company)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    state.store.refresh_fleet_summary(None).await.unwrap();
    let response = app
        .oneshot(get(&format!("/api/map/bounds?company_id={}", company)))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["min_lat"], -33.86);
    assert_eq!(body["max_lng"], 151.2);
}

#[tokio::test]
async fn visits_endpoint_filters_by_status() {
    let (app, state) = test_app();
    let company = Uuid::new_v4();
    let vehicle = seed_vehicle(&state, company).await;
    common::seed_fence(
        &state,
        company,
        -33.86,
        151.20,
        fleet_tracker::models::FencePolicy::Inclusion,
    )
    .await;

    state
        .ingest
        .record_position(common::position_request(
            vehicle.id,
            -33.86,
            151.20,
            "2024-01-15T09:00:00Z",
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(get(&format!(
            "/api/visits?vehicle_id={}&status=ACTIVE",
            vehicle.id
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["visits"][0]["status"], "ACTIVE");

    let response = app
        .oneshot(get(&format!(
            "/api/visits?vehicle_id={}&status=COMPLETED",
            vehicle.id
        )))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn admin_invalidate_and_stats() {
    let (app, _state) = test_app();

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/admin/cache/invalidate",
            json!({"center_lat": -33.86, "center_lng": 151.20, "radius_km": 5.0}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/admin/cache/invalidate",
            json!({"center_lat": 123.0, "center_lng": 151.20}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.oneshot(get("/api/admin/cache/stats")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["backend"], "memory");
}

#[tokio::test]
async fn admin_geofence_upsert_detects_visits_and_invalidates_tiles() {
    let (app, state) = test_app();
    let company = Uuid::new_v4();
    let vehicle = seed_vehicle(&state, company).await;

    // Warm a viewport covering the future fence area
    let viewport = fleet_tracker::models::BoundingBox::new(-34.0, 150.9, -33.7, 151.4);
    state
        .map
        .get_fleet_view(&viewport, 10, Some(company))
        .await
        .unwrap();
    assert!(state.cache.get_map(&viewport, 10, Some(company)).await.is_some());

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/admin/geofences",
            json!({
                "company_id": company,
                "name": "Harbour Terminal",
                "location_type": "PORT",
                "boundary": {
                    "type": "Polygon",
                    "coordinates": [[
                        [151.19, -33.87], [151.21, -33.87],
                        [151.21, -33.85], [151.19, -33.85],
                        [151.19, -33.87]
                    ]]
                },
                "demurrage_enabled": true,
                "free_time_hours": 2.0,
                "demurrage_rate_per_hour": 50.0
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let fence_id: Uuid = body["geofence_id"].as_str().unwrap().parse().unwrap();
    assert!(state.store.get_geofence(fence_id).await.unwrap().is_some());

    // The fence edit invalidated the covering viewport entry
    assert!(state.cache.get_map(&viewport, 10, Some(company)).await.is_none());

    // And the fence is live for ingestion
    let recorded = state
        .ingest
        .record_position(common::position_request(
            vehicle.id,
            -33.86,
            151.20,
            "2024-01-15T09:00:00Z",
        ))
        .await
        .unwrap();
    assert_eq!(recorded.geofence_events, 1);

    // Malformed boundaries are rejected
    let response = app
        .oneshot(post_json(
            "/api/admin/geofences",
            json!({
                "company_id": company,
                "name": "Bad Fence",
                "boundary": {"type": "Point", "coordinates": [151.2, -33.86]}
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn emergency_alert_reaches_fleet_subscribers() {
    let (app, state) = test_app();
    let company = Uuid::new_v4();
    let vehicle = seed_vehicle(&state, company).await;

    let mut fleet_rx = state
        .hub
        .subscribe(&fleet_tracker::services::broadcast::fleet_group(company));

    let response = app
        .oneshot(post_json(
            "/api/alerts/emergency",
            json!({
                "vehicle_id": vehicle.id,
                "alert_type": "BREAKDOWN",
                "message": "Engine failure on the M1",
                "latitude": -33.86,
                "longitude": 151.20
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    match fleet_rx.recv().await.unwrap() {
        fleet_tracker::services::broadcast::TrackingEvent::EmergencyAlert {
            vehicle_id,
            alert_type,
            ..
        } => {
            assert_eq!(vehicle_id, vehicle.id);
            assert_eq!(alert_type, "BREAKDOWN");
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn admin_force_refresh_debounces() {
    let (app, _state) = test_app();

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/admin/maintenance/refresh",
            json!({"job": "refresh_fleet_summary"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["scheduled"], true);

    // Unknown job names are rejected
    let response = app
        .oneshot(post_json(
            "/api/admin/maintenance/refresh",
            json!({"job": "reticulate_splines"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
