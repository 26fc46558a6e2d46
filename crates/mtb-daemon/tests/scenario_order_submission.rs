//! Scenario: POST /order.
//!
//! Covers the translation from the HTTP body to the terminal's market-order
//! request (price side, defaults, synonyms, falsy stops), validation that
//! must happen before any terminal call, and the mapping of terminal failures
//! to HTTP statuses.

use std::sync::Arc;

use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use mtb_config::ApiKey;
use mtb_daemon::{routes, state};
use mtb_terminal::{
    testkit::ScriptedTerminal, OrderType, Terminal, TerminalError, TerminalHandle, TerminalRecord,
    TradeAction,
};
use serde_json::{json, Value};
use tower::ServiceExt; // oneshot

const KEY: &str = "order-key";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn eurusd() -> ScriptedTerminal {
    ScriptedTerminal::new()
        .with_symbol("EURUSD", true)
        .with_tick("EURUSD", 1.0998, 1.1000)
        .with_order_result(TerminalRecord::from_fields([
            ("retcode", json!(10009)),
            ("deal", json!(2)),
            ("order", json!(1)),
            ("price", json!(1.1)),
            ("comment", json!("Request executed")),
        ]))
}

async fn post_order(term: &ScriptedTerminal, body: &str) -> (StatusCode, Value) {
    let worker_side = term.clone();
    let handle = TerminalHandle::start(move || Ok(Box::new(worker_side) as Box<dyn Terminal>))
        .await
        .expect("terminal start");
    let router = routes::build_router(Arc::new(state::AppState::new(handle, ApiKey::new(KEY))));

    let req = Request::builder()
        .method("POST")
        .uri("/order")
        .header("x-api-key", KEY)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap();
    let resp = router.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let bytes = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    let json = serde_json::from_slice(&bytes).expect("body is not valid JSON");
    (status, json)
}

// ---------------------------------------------------------------------------
// Price / side translation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn buy_is_priced_at_ask() {
    let term = eurusd();
    let (status, json) =
        post_order(&term, r#"{"symbol":"EURUSD","side":"buy","volume":0.1}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["order_result"]["retcode"], 10009);

    let sent = term.sent_requests();
    assert_eq!(sent.len(), 1);
    let r = &sent[0];
    assert_eq!(r.action, TradeAction::Deal);
    assert_eq!(r.symbol, "EURUSD");
    assert_eq!(r.volume, 0.1);
    assert_eq!(r.order_type, OrderType::Buy);
    assert_eq!(r.price, 1.1000);
    assert_eq!(r.deviation, 10);
    assert_eq!(r.magic, 123456);
    assert_eq!(r.comment, "api_trade");
}

#[tokio::test]
async fn sell_is_priced_at_bid() {
    let term = eurusd();
    let (status, _) = post_order(&term, r#"{"symbol":"EURUSD","side":"sell","volume":0.1}"#).await;

    assert_eq!(status, StatusCode::OK);
    let r = &term.sent_requests()[0];
    assert_eq!(r.order_type, OrderType::Sell);
    assert_eq!(r.price, 1.0998);
}

#[tokio::test]
async fn terminal_result_fields_pass_through_in_order() {
    let term = eurusd();
    let (_, json) = post_order(&term, r#"{"symbol":"EURUSD","side":"buy"}"#).await;

    let keys: Vec<&str> = json["order_result"]
        .as_object()
        .expect("order_result is an object")
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(keys, ["retcode", "deal", "order", "price", "comment"]);
}

// ---------------------------------------------------------------------------
// Defaults and synonyms
// ---------------------------------------------------------------------------

#[tokio::test]
async fn volume_defaults_to_one_hundredth_lot() {
    let term = eurusd();
    let (status, _) = post_order(&term, r#"{"symbol":"EURUSD","side":"buy"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(term.sent_requests()[0].volume, 0.01);
}

#[tokio::test]
async fn lots_is_used_when_volume_absent() {
    let term = eurusd();
    let (status, _) = post_order(&term, r#"{"symbol":"EURUSD","side":"buy","lots":0.25}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(term.sent_requests()[0].volume, 0.25);
}

#[tokio::test]
async fn absent_or_falsy_stops_are_sent_as_zero() {
    let term = eurusd();
    post_order(&term, r#"{"symbol":"EURUSD","side":"buy"}"#).await;
    post_order(&term, r#"{"symbol":"EURUSD","side":"buy","stopLoss":0,"takeProfit":""}"#).await;
    post_order(&term, r#"{"symbol":"EURUSD","side":"buy","stopLoss":null,"takeProfit":false}"#).await;

    let sent = term.sent_requests();
    assert_eq!(sent.len(), 3);
    for r in sent {
        assert_eq!(r.sl, 0.0);
        assert_eq!(r.tp, 0.0);
    }
}

#[tokio::test]
async fn explicit_stops_and_deviation_are_forwarded() {
    let term = eurusd();
    let (status, _) = post_order(
        &term,
        r#"{"symbol":"EURUSD","side":"buy","stopLoss":1.09,"takeProfit":"1.12","deviation":25}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let r = &term.sent_requests()[0];
    assert_eq!(r.sl, 1.09);
    assert_eq!(r.tp, 1.12);
    assert_eq!(r.deviation, 25);
}

// ---------------------------------------------------------------------------
// Validation happens before any terminal call
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalid_side_is_400_without_terminal_call() {
    for body in [
        r#"{"symbol":"EURUSD","side":"hold"}"#,
        r#"{"symbol":"EURUSD","side":"Buy"}"#,
        r#"{"symbol":"EURUSD"}"#,
    ] {
        let term = eurusd();
        let (status, json) = post_order(&term, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(json["detail"], "symbol and side required");
        assert!(term.calls_after_startup().is_empty(), "{body}");
    }
}

#[tokio::test]
async fn missing_symbol_is_400_without_terminal_call() {
    let term = eurusd();
    let (status, _) = post_order(&term, r#"{"side":"buy"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(term.calls_after_startup().is_empty());
}

#[tokio::test]
async fn malformed_body_is_400() {
    for body in ["", "{not json", "[1,2]", r#"{"symbol":"EURUSD","side":"buy","volume":"abc"}"#] {
        let term = eurusd();
        let (status, _) = post_order(&term, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body:?}");
        assert!(term.calls_after_startup().is_empty());
    }
}

#[tokio::test]
async fn positional_array_body_is_400_without_terminal_call() {
    // Well-typed for the struct's field order, so only the shape check stops it.
    let term = eurusd();
    let (status, json) = post_order(&term, r#"["EURUSD","buy",5.0]"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["detail"], "request body must be a JSON object");
    assert!(term.calls_after_startup().is_empty());
    assert!(term.sent_requests().is_empty());
}

// ---------------------------------------------------------------------------
// Terminal-side outcomes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_symbol_is_400() {
    let term = eurusd();
    let (status, json) = post_order(&term, r#"{"symbol":"NOPE","side":"buy"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["detail"], "Symbol NOPE not found in terminal");
    assert_eq!(term.calls_after_startup(), ["symbol_info"]);
}

#[tokio::test]
async fn hidden_symbol_is_selected_before_tick() {
    let term = ScriptedTerminal::new()
        .with_symbol("XAUUSD", false)
        .with_tick("XAUUSD", 2300.1, 2300.5)
        .with_order_result(TerminalRecord::from_fields([("retcode", json!(10009))]));
    let (status, _) = post_order(&term, r#"{"symbol":"XAUUSD","side":"buy"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        term.calls_after_startup(),
        ["symbol_info", "symbol_select", "symbol_info_tick", "order_send"]
    );
}

#[tokio::test]
async fn failed_select_is_not_fatal() {
    let term = ScriptedTerminal::new()
        .with_symbol("XAUUSD", false)
        .with_tick("XAUUSD", 2300.1, 2300.5)
        .with_order_result(TerminalRecord::from_fields([("retcode", json!(10009))]))
        .failing_select();
    let (status, json) = post_order(&term, r#"{"symbol":"XAUUSD","side":"sell"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["order_result"]["retcode"], 10009);
    assert_eq!(
        term.calls_after_startup(),
        ["symbol_info", "symbol_select", "symbol_info_tick", "order_send"]
    );
    assert_eq!(term.sent_requests()[0].price, 2300.1);
}

#[tokio::test]
async fn missing_tick_is_500() {
    let term = ScriptedTerminal::new().with_symbol("EURUSD", true);
    let (status, json) = post_order(&term, r#"{"symbol":"EURUSD","side":"buy"}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["detail"], "Could not get tick for symbol");
    assert!(term.sent_requests().is_empty());
}

#[tokio::test]
async fn send_returning_nothing_is_500_with_last_error() {
    let term = ScriptedTerminal::new()
        .with_symbol("EURUSD", true)
        .with_tick("EURUSD", 1.0998, 1.1)
        .with_last_error(-8, "Terminal: Auto-trading disabled");
    let (status, json) = post_order(&term, r#"{"symbol":"EURUSD","side":"buy"}"#).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], -8);
    let detail = json["detail"].as_str().unwrap();
    assert!(detail.starts_with("Order send returned None"), "{detail}");
    assert!(detail.contains("Auto-trading disabled"), "{detail}");
    // exactly one attempt, no retry
    assert_eq!(term.sent_requests().len(), 1);
}

#[tokio::test]
async fn terminal_rejection_is_500_with_terminal_code() {
    let term = eurusd().failing_calls_with(TerminalError::Rejected {
        code: -10004,
        message: "No IPC connection".into(),
    });
    let (status, json) = post_order(&term, r#"{"symbol":"EURUSD","side":"buy"}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], -10004);
}

#[tokio::test]
async fn undecodable_result_falls_back_to_raw_string() {
    let term = ScriptedTerminal::new()
        .with_symbol("EURUSD", true)
        .with_tick("EURUSD", 1.0998, 1.1)
        .with_order_result(TerminalRecord::Raw("OrderSendResult(retcode=10009)".into()));
    let (status, json) = post_order(&term, r#"{"symbol":"EURUSD","side":"buy"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["order_result"], json!({"raw": "OrderSendResult(retcode=10009)"}));
}
