//! Leaderboard sync against a mocked PostgREST endpoint.

use chrono::{DateTime, FixedOffset, TimeZone};
use mockito::Matcher;
use neckline_core::leaderboard::RefreshOutcome;
use neckline_core::{
    CompletionOutcome, Config, CoreError, DataPaths, RestRemoteStore, TimeSlot, Tracker,
};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

const PATH: &str = "/rest/v1/leaderboard_users";

fn at(day: u32, hour: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(0)
        .unwrap()
        .with_ymd_and_hms(2025, 6, day, hour, 0, 0)
        .unwrap()
}

fn open(dir: &TempDir, server: &mockito::Server) -> Tracker {
    let remote = RestRemoteStore::new(&server.url(), "leaderboard_users", Some("key".into())).unwrap();
    Tracker::open(DataPaths::new(dir.path()), Config::default(), Arc::new(remote))
}

fn row(device: &str, name: &str, sessions: u32) -> serde_json::Value {
    json!({
        "device_id": device,
        "username": name,
        "country_code": "GB",
        "total_sessions": sessions,
        "month_year": "2025-06",
        "last_updated": "2025-06-10T08:00:00Z"
    })
}

fn top_query() -> Matcher {
    Matcher::AllOf(vec![
        Matcher::UrlEncoded("month_year".into(), "eq.2025-06".into()),
        Matcher::UrlEncoded("order".into(), "total_sessions.desc".into()),
    ])
}

#[tokio::test]
async fn join_and_complete_push_then_pull() {
    let dir = TempDir::new().unwrap();
    let mut server = mockito::Server::new_async().await;
    let mut tracker = open(&dir, &server);
    let device_id = tracker.profile().device_id.clone();

    let upsert = server
        .mock("POST", PATH)
        .match_query(Matcher::Any)
        .with_status(201)
        .expect(2)
        .create_async()
        .await;
    let top = server
        .mock("GET", PATH)
        .match_query(top_query())
        .with_status(200)
        .with_body(json!([row("neckline-other", "kim", 12), row(&device_id, "sam", 1)]).to_string())
        .expect(2)
        .create_async()
        .await;

    let report = tracker.join_leaderboard("sam", Some("gb"), &at(10, 9)).await.unwrap();
    assert!(report.is_ok(), "{:?}", report.errors);

    let id = tracker.exercises()[0].id;
    let outcome = tracker
        .complete_exercise(id, None, TimeSlot::Quick, &at(10, 9))
        .await
        .unwrap();
    let CompletionOutcome::Completed(completed) = outcome else {
        panic!("completion declined");
    };
    assert!(completed.leaderboard.is_ok());

    upsert.assert_async().await;
    top.assert_async().await;

    let snapshot = tracker.leaderboard_snapshot();
    assert_eq!(snapshot.own_rank, Some(2));
    assert_eq!(snapshot.month.as_deref(), Some("2025-06"));
    assert!(snapshot.rows[1].is_you);
    assert_eq!(tracker.profile().last_synced_month.as_deref(), Some("2025-06"));
}

#[tokio::test]
async fn own_rank_outside_top_counts_rows_above() {
    let dir = TempDir::new().unwrap();
    let mut server = mockito::Server::new_async().await;
    let mut tracker = open(&dir, &server);
    let device_id = tracker.profile().device_id.clone();

    server
        .mock("POST", PATH)
        .match_query(Matcher::Any)
        .with_status(201)
        .create_async()
        .await;
    server
        .mock("GET", PATH)
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("order".into(), "total_sessions.desc".into()),
            Matcher::UrlEncoded("limit".into(), "100".into()),
        ]))
        .with_status(200)
        .with_body(json!([row("a", "a", 50), row("b", "b", 50)]).to_string())
        .create_async()
        .await;
    server
        .mock("GET", PATH)
        .match_query(Matcher::UrlEncoded("device_id".into(), format!("eq.{device_id}")))
        .with_status(200)
        .with_body(json!([row(&device_id, "sam", 40)]).to_string())
        .create_async()
        .await;
    let above = server
        .mock("GET", PATH)
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("total_sessions".into(), "gt.40".into()),
            Matcher::UrlEncoded("limit".into(), "0".into()),
        ]))
        .match_header("prefer", "count=exact")
        .with_status(200)
        .with_header("content-range", "*/2")
        .with_body("[]")
        .create_async()
        .await;

    tracker.join_leaderboard("sam", None, &at(10, 9)).await.unwrap();

    above.assert_async().await;
    assert_eq!(tracker.leaderboard_snapshot().own_rank, Some(3));
}

#[tokio::test]
async fn failed_refresh_keeps_previous_snapshot() {
    let dir = TempDir::new().unwrap();
    let mut server = mockito::Server::new_async().await;
    let mut tracker = open(&dir, &server);
    let device_id = tracker.profile().device_id.clone();

    server
        .mock("POST", PATH)
        .match_query(Matcher::Any)
        .with_status(201)
        .create_async()
        .await;
    let ok = server
        .mock("GET", PATH)
        .match_query(top_query())
        .with_status(200)
        .with_body(json!([row(&device_id, "sam", 0)]).to_string())
        .create_async()
        .await;
    tracker.join_leaderboard("sam", None, &at(10, 9)).await.unwrap();
    ok.assert_async().await;
    ok.remove_async().await;

    server
        .mock("GET", PATH)
        .match_query(Matcher::Any)
        .with_status(503)
        .with_body("maintenance")
        .create_async()
        .await;

    // inside the refresh interval nothing is requested
    assert_eq!(
        tracker.refresh_leaderboard(&at(10, 9), false).await.unwrap(),
        RefreshOutcome::Throttled
    );

    let err = tracker.refresh_leaderboard(&at(10, 10), true).await.unwrap_err();
    assert!(matches!(err, CoreError::Remote(_)));

    let snapshot = tracker.leaderboard_snapshot();
    assert_eq!(snapshot.rows.len(), 1);
    assert_eq!(snapshot.own_rank, Some(1));
    assert!(snapshot.last_error.unwrap().contains("503"));
}

#[tokio::test]
async fn opted_out_tracker_never_calls_remote() {
    let dir = TempDir::new().unwrap();
    let mut server = mockito::Server::new_async().await;
    let mut tracker = open(&dir, &server);
    let post = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let get = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let id = tracker.exercises()[0].id;
    tracker
        .complete_exercise(id, None, TimeSlot::Quick, &at(10, 9))
        .await
        .unwrap();

    post.assert_async().await;
    get.assert_async().await;
}
