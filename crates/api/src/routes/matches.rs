use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use match_events_core::analytics;
use match_events_core::reconcile::{LiveMatchHandle, MatchSnapshot};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const MAX_MATCH_ID_LEN: usize = 128;
const DEFAULT_RECENT: usize = 10;

/// Match event routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/matches/{match_id}/events", get(list_events))
        .route("/v1/matches/{match_id}/events/{event_id}", delete(delete_event))
        .route("/v1/matches/{match_id}/segments", get(segments))
        .route("/v1/matches/{match_id}/stats", get(stats))
        .route("/v1/matches/{match_id}/reload", post(reload))
}

#[derive(Debug, Deserialize)]
struct SegmentQuery {
    interval: Option<f64>,
    duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct StatsQuery {
    recent: Option<usize>,
}

fn validate_match_id(match_id: &str) -> ApiResult<()> {
    let valid = !match_id.is_empty()
        && match_id.len() <= MAX_MATCH_ID_LEN
        && match_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!("invalid match id: {match_id:?}")))
    }
}

/// Snapshot once the initial load has finished (successfully or not).
async fn loaded_snapshot(handle: &LiveMatchHandle) -> MatchSnapshot {
    let mut snapshots = handle.watch();
    let loaded = snapshots
        .wait_for(|snapshot| !snapshot.loading)
        .await
        .map(|snapshot| snapshot.clone());
    loaded.unwrap_or_else(|_| handle.snapshot())
}

async fn follow(state: &AppState, match_id: &str) -> ApiResult<MatchSnapshot> {
    validate_match_id(match_id)?;
    let handle = state.live_match(match_id);
    Ok(loaded_snapshot(&handle).await)
}

async fn list_events(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
) -> ApiResult<Json<MatchSnapshot>> {
    Ok(Json(follow(&state, &match_id).await?))
}

/// Positive spans must give a usable layout; zero, negative or NaN spans
/// just mean "no segments".
fn validate_spans(interval: f64, duration: f64) -> ApiResult<()> {
    let positive = interval > 0.0 && duration > 0.0;
    if positive && analytics::segment_count(interval, duration).is_none() {
        return Err(ApiError::BadRequest(format!(
            "interval {interval} and duration {duration} need more than {} segments",
            analytics::MAX_SEGMENTS
        )));
    }
    Ok(())
}

async fn segments(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
    Query(query): Query<SegmentQuery>,
) -> ApiResult<Json<Value>> {
    let interval = query.interval.unwrap_or(state.config().default_interval_minutes);
    let duration = query
        .duration
        .unwrap_or(state.config().default_match_duration_minutes);
    validate_spans(interval, duration)?;

    let snapshot = follow(&state, &match_id).await?;
    let segments = snapshot.segments(interval, duration);
    let segment_stats = analytics::aggregate_segments(&segments);
    Ok(Json(json!({
        "matchId": snapshot.match_id,
        "intervalMinutes": interval,
        "matchDurationMinutes": duration,
        "segments": segments,
        "segmentStats": segment_stats,
    })))
}

async fn stats(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Json<Value>> {
    let snapshot = follow(&state, &match_id).await?;
    let recent = analytics::recent(&snapshot.events, query.recent.unwrap_or(DEFAULT_RECENT));

    Ok(Json(json!({
        "matchId": snapshot.match_id,
        "loading": snapshot.loading,
        "connected": snapshot.connected,
        "statistics": snapshot.statistics(),
        "recent": recent,
    })))
}

async fn delete_event(
    State(state): State<AppState>,
    Path((match_id, event_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    validate_match_id(&match_id)?;
    let handle = state.live_match(&match_id);
    loaded_snapshot(&handle).await;

    handle.delete_event(event_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn reload(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
) -> ApiResult<Json<MatchSnapshot>> {
    validate_match_id(&match_id)?;
    let handle = state.live_match(&match_id);
    loaded_snapshot(&handle).await;

    handle.reload().await?;
    Ok(Json(handle.snapshot()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use match_events_core::events::{ChangeFeed, ChangeNotification};
    use match_events_core::model::{Coordinates, EventType, MatchEvent, Team};
    use match_events_core::store::MemoryEventStore;
    use serde_json::Map;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn event(id: &str, timestamp: f64, event_type: EventType, data: Value) -> MatchEvent {
        let event_data = match data {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        MatchEvent {
            id: id.to_string(),
            match_id: "m1".to_string(),
            event_type,
            timestamp,
            team: Some(Team::Home),
            player_id: Some(10),
            coordinates: Coordinates::default(),
            created_by: "tracker".to_string(),
            created_at: None,
            event_data,
        }
    }

    fn app(store: Arc<MemoryEventStore>) -> (Router, AppState) {
        let state = AppState::new(store, AppConfig::for_tests(), ChangeFeed::new(16));
        (crate::routes::build_router(state.clone()), state)
    }

    async fn call(router: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
        let response = router
            .clone()
            .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn sample_store() -> Arc<MemoryEventStore> {
        Arc::new(MemoryEventStore::with_events([
            event("p1", 50.0, EventType::Pass, json!({"success": true})),
            event("p2", 310.0, EventType::Pass, json!({"success": false})),
            event("s1", 600.0, EventType::Shot, json!({"on_target": true})),
        ]))
    }

    #[tokio::test]
    async fn lists_loaded_events() {
        let (router, state) = app(sample_store());

        let (status, body) = call(&router, "GET", "/v1/matches/m1/events").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["loading"], json!(false));
        assert_eq!(body["events"].as_array().unwrap().len(), 3);
        assert_eq!(body["events"][0]["id"], json!("p1"));
        assert_eq!(state.live_match_count(), 1);

        state.shutdown_live_matches().await;
    }

    #[tokio::test]
    async fn segments_use_query_or_defaults() {
        let (router, state) = app(sample_store());

        let (status, body) = call(&router, "GET", "/v1/matches/m1/segments").await;
        assert_eq!(status, StatusCode::OK);
        let segments = body["segments"].as_array().unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0]["events"].as_array().unwrap().len(), 1);
        // s1 sits exactly on the final whistle.
        assert_eq!(segments[1]["events"].as_array().unwrap().len(), 2);

        let (_, body) = call(&router, "GET", "/v1/matches/m1/segments?interval=0").await;
        assert!(body["segments"].as_array().unwrap().is_empty());

        state.shutdown_live_matches().await;
    }

    #[tokio::test]
    async fn segments_carry_per_interval_stats() {
        let (router, state) = app(sample_store());

        let (_, body) = call(&router, "GET", "/v1/matches/m1/segments").await;
        let stats = body["segmentStats"].as_array().unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0]["home"]["passesAttempted"], json!(1));
        assert_eq!(stats[0]["home"]["passesCompleted"], json!(1));
        assert_eq!(stats[1]["home"]["shots"], json!(1));
        assert_eq!(stats[1]["home"]["shotsOnTarget"], json!(1));
        assert_eq!(stats[1]["players"][0]["playerId"], json!(10));

        state.shutdown_live_matches().await;
    }

    #[tokio::test]
    async fn unusable_spans_are_rejected() {
        let (router, state) = app(sample_store());

        for uri in [
            "/v1/matches/m1/segments?interval=1&duration=1e307",
            "/v1/matches/m1/segments?interval=1e-300&duration=1",
            "/v1/matches/m1/segments?interval=0.001&duration=90",
        ] {
            let (status, body) = call(&router, "GET", uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["error"]["type"], json!("badRequest"));
        }
        assert_eq!(state.live_match_count(), 0);

        let (status, body) = call(&router, "GET", "/v1/matches/m1/segments?interval=-5").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["segments"].as_array().unwrap().is_empty());

        state.shutdown_live_matches().await;
    }

    #[tokio::test]
    async fn delete_is_scoped_to_the_match_in_the_path() {
        let store = sample_store();
        let mut other = event("o1", 20.0, EventType::Pass, json!({}));
        other.match_id = "m2".to_string();
        store.insert(other);
        let (router, state) = app(store.clone());

        let (status, _) = call(&router, "DELETE", "/v1/matches/m1/events/o1").await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(store.len(), 4);

        let (_, body) = call(&router, "GET", "/v1/matches/m2/events").await;
        assert_eq!(body["events"][0]["id"], json!("o1"));

        state.shutdown_live_matches().await;
    }

    #[tokio::test]
    async fn stats_report_rates_and_recent_events() {
        let (router, state) = app(sample_store());

        let (status, body) = call(&router, "GET", "/v1/matches/m1/stats?recent=2").await;
        assert_eq!(status, StatusCode::OK);
        let stats = &body["statistics"];
        assert_eq!(stats["totalEvents"], json!(3));
        assert_eq!(stats["passCompletion"]["home"]["rate"], json!(50.0));
        assert_eq!(stats["shotsOnTarget"]["home"]["rate"], json!(100.0));
        assert_eq!(stats["shotsOnTarget"]["away"]["rate"], Value::Null);
        assert_eq!(body["recent"][0]["id"], json!("s1"));
        assert_eq!(body["recent"].as_array().unwrap().len(), 2);

        state.shutdown_live_matches().await;
    }

    #[tokio::test]
    async fn delete_removes_event() {
        let store = sample_store();
        let (router, state) = app(store.clone());

        let (status, _) = call(&router, "DELETE", "/v1/matches/m1/events/p2").await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(store.len(), 2);

        let (_, body) = call(&router, "GET", "/v1/matches/m1/events").await;
        assert_eq!(body["events"].as_array().unwrap().len(), 2);

        state.shutdown_live_matches().await;
    }

    #[tokio::test]
    async fn failed_delete_is_surfaced() {
        let store = sample_store();
        store.fail_deletes(true);
        let (router, state) = app(store);

        let (status, body) = call(&router, "DELETE", "/v1/matches/m1/events/p2").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["type"], json!("deleteFailed"));

        let (_, body) = call(&router, "GET", "/v1/matches/m1/events").await;
        assert_eq!(body["events"].as_array().unwrap().len(), 3);
        assert_eq!(body["lastError"], json!("Could not delete event"));

        state.shutdown_live_matches().await;
    }

    #[tokio::test]
    async fn feed_changes_show_up_in_later_reads() {
        let (router, state) = app(sample_store());
        call(&router, "GET", "/v1/matches/m1/events").await;

        let handle = state.live_match("m1");
        state
            .change_feed()
            .publish(ChangeNotification::Insert(event("g1", 700.0, EventType::Goal, json!({}))));
        handle
            .watch()
            .wait_for(|s| s.events.len() == 4)
            .await
            .unwrap();

        let (_, body) = call(&router, "GET", "/v1/matches/m1/events").await;
        assert_eq!(body["events"][3]["id"], json!("g1"));

        state.shutdown_live_matches().await;
    }

    #[tokio::test]
    async fn health_reports_live_matches() {
        let (router, state) = app(sample_store());
        call(&router, "GET", "/v1/matches/m1/events").await;

        let (status, body) = call(&router, "GET", "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!("ok"));
        assert_eq!(body["liveMatches"], json!(1));
        assert_eq!(body["subscribers"], json!(1));

        state.shutdown_live_matches().await;
    }

    #[tokio::test]
    async fn rejects_malformed_match_ids_and_unknown_routes() {
        let (router, _state) = app(sample_store());

        let (status, body) = call(&router, "GET", "/v1/matches/bad%20id/events").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], json!("badRequest"));

        let (status, body) = call(&router, "GET", "/v1/nowhere").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["statusCode"], json!(404));
    }
}
