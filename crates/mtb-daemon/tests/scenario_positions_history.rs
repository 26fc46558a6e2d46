//! Scenario: GET /positions and GET /history.
//!
//! # Invariants under test
//!
//! - "Nothing" from the terminal is an empty list, never an error.
//! - Rows are relayed verbatim; rows the terminal could not structure are
//!   relayed as strings.
//! - `/history?days=N` asks the terminal for exactly `[now - N days, now)`.

use std::sync::Arc;

use axum::http::{Request, StatusCode};
use chrono::{TimeDelta, Utc};
use http_body_util::BodyExt;
use mtb_config::ApiKey;
use mtb_daemon::{routes, state};
use mtb_terminal::{
    testkit::ScriptedTerminal, Terminal, TerminalError, TerminalHandle, TerminalRecord,
};
use serde_json::{json, Value};
use tower::ServiceExt; // oneshot

const KEY: &str = "query-key";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn get(term: &ScriptedTerminal, uri: &str) -> (StatusCode, Value) {
    let worker_side = term.clone();
    let handle = TerminalHandle::start(move || Ok(Box::new(worker_side) as Box<dyn Terminal>))
        .await
        .expect("terminal start");
    let router = routes::build_router(Arc::new(state::AppState::new(handle, ApiKey::new(KEY))));

    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .header("x-api-key", KEY)
        .body(axum::body::Body::empty())
        .unwrap();
    let resp = router.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let bytes = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    (
        status,
        serde_json::from_slice(&bytes).expect("body is not valid JSON"),
    )
}

// ---------------------------------------------------------------------------
// /positions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn positions_none_is_empty_list() {
    let term = ScriptedTerminal::new().with_positions(None);
    let (status, json) = get(&term, "/positions").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"positions": []}));
}

#[tokio::test]
async fn positions_are_relayed_with_string_fallback() {
    let term = ScriptedTerminal::new().with_positions(Some(vec![
        TerminalRecord::from_fields([
            ("ticket", json!(501)),
            ("symbol", json!("EURUSD")),
            ("volume", json!(0.1)),
        ]),
        TerminalRecord::Raw("TradePosition(ticket=502)".into()),
    ]));
    let (status, json) = get(&term, "/positions").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json["positions"],
        json!([
            {"ticket": 501, "symbol": "EURUSD", "volume": 0.1},
            "TradePosition(ticket=502)"
        ])
    );
}

#[tokio::test]
async fn positions_terminal_failure_is_500() {
    let term = ScriptedTerminal::new()
        .failing_calls_with(TerminalError::Disconnected("gateway unreachable".into()));
    let (status, json) = get(&term, "/positions").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["detail"].as_str().unwrap().contains("gateway unreachable"));
}

// ---------------------------------------------------------------------------
// /history
// ---------------------------------------------------------------------------

#[tokio::test]
async fn history_none_is_empty_list() {
    let term = ScriptedTerminal::new().with_deals(None);
    let (status, json) = get(&term, "/history").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"history": []}));
}

#[tokio::test]
async fn history_window_is_exactly_n_days_ending_now() {
    let term = ScriptedTerminal::new().with_deals(Some(vec![]));

    let before = Utc::now();
    let (status, _) = get(&term, "/history?days=3").await;
    let after = Utc::now();
    assert_eq!(status, StatusCode::OK);

    let windows = term.history_windows();
    assert_eq!(windows.len(), 1);
    let (from, to) = windows[0];
    assert_eq!(to - from, TimeDelta::days(3));
    assert!(before <= to && to <= after, "window must end at request time");
}

#[tokio::test]
async fn history_defaults_to_seven_days() {
    let term = ScriptedTerminal::new().with_deals(Some(vec![]));
    let (status, _) = get(&term, "/history").await;
    assert_eq!(status, StatusCode::OK);

    let (from, to) = term.history_windows()[0];
    assert_eq!(to - from, TimeDelta::days(7));
}

#[tokio::test]
async fn history_deals_are_relayed() {
    let term = ScriptedTerminal::new().with_deals(Some(vec![TerminalRecord::from_fields([
        ("ticket", json!(9001)),
        ("entry", json!(0)),
        ("profit", json!(12.5)),
    ])]));
    let (status, json) = get(&term, "/history?days=30").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json["history"],
        json!([{"ticket": 9001, "entry": 0, "profit": 12.5}])
    );
}

#[tokio::test]
async fn history_bad_days_is_400_without_terminal_call() {
    for uri in ["/history?days=-1", "/history?days=abc", "/history?days=1.5"] {
        let term = ScriptedTerminal::new().with_deals(Some(vec![]));
        let (status, _) = get(&term, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(term.calls_after_startup().is_empty(), "{uri}");
    }
}
