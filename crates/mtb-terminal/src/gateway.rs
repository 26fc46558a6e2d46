//! Terminal backend that drives a live MT5 terminal through a terminal-side
//! JSON/HTTP automation gateway.
//!
//! Wire contract (one POST per terminal function):
//!
//! ```text
//! POST {base_url}/{function}      body: JSON object of named arguments
//! 200  {"result": <value | null>}
//! 4xx/5xx or 200  {"error": {"code": <int>, "message": <str>}}
//! ```
//!
//! `null` results map to `Ok(None)` exactly like the terminal API returning
//! nothing. Record-valued results are decoded with
//! [`TerminalRecord::from_value`], so rows the gateway cannot name (tuples,
//! strings) still reach the caller as a dump.
//!
//! The client is blocking. Construct and drop it on the terminal worker
//! thread only.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::debug;

use crate::adapter::{Result, Terminal};
use crate::error::TerminalError;
use crate::record::TerminalRecord;
use crate::types::{SymbolInfo, TerminalErrorCode, Tick, TradeRequest};

pub struct GatewayTerminal {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl GatewayTerminal {
    pub fn connect(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TerminalError::Disconnected(format!("gateway client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn invoke(&self, function: &str, args: Value) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, function);
        debug!(%url, "gateway call");

        let resp = self
            .client
            .post(&url)
            .json(&args)
            .send()
            .map_err(|e| TerminalError::Disconnected(format!("{function}: {e}")))?;

        let status = resp.status();
        let body: Value = match resp.json() {
            Ok(v) => v,
            Err(e) if status.is_success() => {
                return Err(TerminalError::Protocol(format!("{function}: {e}")))
            }
            Err(_) => return Err(unavailable(function, status)),
        };

        decode_reply(function, status, body)
    }
}

/// Unwrap the `{"result": ..}` / `{"error": ..}` envelope.
///
/// A `result` is only trusted on a 2xx status.
pub(crate) fn decode_reply(
    function: &str,
    status: reqwest::StatusCode,
    body: Value,
) -> Result<Value> {
    let Value::Object(mut map) = body else {
        if !status.is_success() {
            return Err(unavailable(function, status));
        }
        return Err(TerminalError::Protocol(format!(
            "{function}: reply is not an object"
        )));
    };

    if let Some(err) = map.remove("error").filter(|e| !e.is_null()) {
        let code = err.get("code").and_then(Value::as_i64).unwrap_or(-1);
        let message = err
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string());
        return Err(TerminalError::Rejected { code, message });
    }

    if !status.is_success() {
        return Err(unavailable(function, status));
    }

    map.remove("result").ok_or_else(|| {
        TerminalError::Protocol(format!("{function}: reply has neither result nor error"))
    })
}

fn unavailable(function: &str, status: reqwest::StatusCode) -> TerminalError {
    TerminalError::Disconnected(format!("{function}: gateway returned HTTP {status}"))
}

fn decode_symbol_info(symbol: &str, v: Value) -> Result<Option<SymbolInfo>> {
    match v {
        Value::Null => Ok(None),
        Value::Object(m) => Ok(Some(SymbolInfo {
            name: m
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or(symbol)
                .to_string(),
            visible: m.get("visible").and_then(Value::as_bool).unwrap_or(false),
        })),
        other => Err(TerminalError::Protocol(format!(
            "symbol_info: expected object, got {other}"
        ))),
    }
}

fn decode_tick(v: Value) -> Result<Option<Tick>> {
    match v {
        Value::Null => Ok(None),
        Value::Object(m) => {
            let price = |field: &str| {
                m.get(field).and_then(Value::as_f64).ok_or_else(|| {
                    TerminalError::Protocol(format!("symbol_info_tick: missing numeric '{field}'"))
                })
            };
            Ok(Some(Tick {
                time: m.get("time").and_then(Value::as_i64).unwrap_or(0),
                bid: price("bid")?,
                ask: price("ask")?,
            }))
        }
        other => Err(TerminalError::Protocol(format!(
            "symbol_info_tick: expected object, got {other}"
        ))),
    }
}

fn decode_records(function: &str, v: Value) -> Result<Option<Vec<TerminalRecord>>> {
    match v {
        Value::Null => Ok(None),
        Value::Array(rows) => Ok(Some(rows.into_iter().map(TerminalRecord::from_value).collect())),
        other => Err(TerminalError::Protocol(format!(
            "{function}: expected array, got {other}"
        ))),
    }
}

fn decode_error_code(v: Value) -> Result<TerminalErrorCode> {
    match &v {
        Value::Array(pair) if pair.len() == 2 => {
            if let (Some(code), Some(message)) = (pair[0].as_i64(), pair[1].as_str()) {
                return Ok(TerminalErrorCode::new(code, message));
            }
        }
        Value::Object(m) => {
            if let Some(code) = m.get("code").and_then(Value::as_i64) {
                let message = m.get("message").and_then(Value::as_str).unwrap_or("");
                return Ok(TerminalErrorCode::new(code, message));
            }
        }
        _ => {}
    }
    Err(TerminalError::Protocol(format!(
        "last_error: unexpected shape {v}"
    )))
}

impl Terminal for GatewayTerminal {
    fn initialize(&mut self) -> Result<bool> {
        let v = self.invoke("initialize", json!({}))?;
        Ok(v.as_bool().unwrap_or(false))
    }

    fn shutdown(&mut self) {
        if let Err(e) = self.invoke("shutdown", json!({})) {
            debug!(error = %e, "gateway shutdown call failed");
        }
    }

    fn last_error(&mut self) -> Result<TerminalErrorCode> {
        decode_error_code(self.invoke("last_error", json!({}))?)
    }

    fn symbol_info(&mut self, symbol: &str) -> Result<Option<SymbolInfo>> {
        decode_symbol_info(symbol, self.invoke("symbol_info", json!({ "symbol": symbol }))?)
    }

    fn symbol_select(&mut self, symbol: &str, enable: bool) -> Result<bool> {
        let v = self.invoke("symbol_select", json!({ "symbol": symbol, "enable": enable }))?;
        Ok(v.as_bool().unwrap_or(false))
    }

    fn symbol_info_tick(&mut self, symbol: &str) -> Result<Option<Tick>> {
        decode_tick(self.invoke("symbol_info_tick", json!({ "symbol": symbol }))?)
    }

    fn order_send(&mut self, request: &TradeRequest) -> Result<Option<TerminalRecord>> {
        let v = self.invoke("order_send", json!({ "request": request.to_wire() }))?;
        Ok(match v {
            Value::Null => None,
            other => Some(TerminalRecord::from_value(other)),
        })
    }

    fn positions_get(&mut self) -> Result<Option<Vec<TerminalRecord>>> {
        decode_records("positions_get", self.invoke("positions_get", json!({}))?)
    }

    fn history_deals_get(
        &mut self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Option<Vec<TerminalRecord>>> {
        let args = json!({ "date_from": from.timestamp(), "date_to": to.timestamp() });
        decode_records("history_deals_get", self.invoke("history_deals_get", args)?)
    }
}
