//! Request and response types for all mtb-daemon HTTP endpoints.
//!
//! Order bodies are decoded leniently, the way the bridge's existing clients
//! send them: numbers may arrive as JSON numbers or numeric strings, `lots`
//! stands in for `volume`, and a JSON `null` counts as "not supplied".

use mtb_terminal::{OrderRequest, Side};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BridgeError;

pub const DEFAULT_VOLUME: f64 = 0.01;
pub const DEFAULT_DEVIATION: u32 = 10;
pub const DEFAULT_HISTORY_DAYS: i64 = 7;

// ---------------------------------------------------------------------------
// /health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub connected: bool,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
    /// Terminal diagnostic code, for upstream failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
}

// ---------------------------------------------------------------------------
// POST /order
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Deserialize)]
pub struct OrderBody {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub volume: Option<Value>,
    #[serde(default)]
    pub lots: Option<Value>,
    #[serde(default, rename = "stopLoss")]
    pub stop_loss: Option<Value>,
    #[serde(default, rename = "takeProfit")]
    pub take_profit: Option<Value>,
    #[serde(default)]
    pub deviation: Option<Value>,
}

impl OrderBody {
    /// Decode a request body. Only a JSON object is accepted; serde would
    /// otherwise fill the fields positionally from an array.
    pub fn from_json(raw: &[u8]) -> Result<Self, BridgeError> {
        let value: Value = serde_json::from_slice(raw)
            .map_err(|e| BridgeError::Validation(format!("invalid JSON body: {e}")))?;
        if !value.is_object() {
            return Err(BridgeError::Validation(
                "request body must be a JSON object".to_string(),
            ));
        }
        serde_json::from_value(value)
            .map_err(|e| BridgeError::Validation(format!("invalid JSON body: {e}")))
    }

    /// Validate into an [`OrderRequest`]. Never touches the terminal.
    pub fn into_order_request(self) -> Result<OrderRequest, BridgeError> {
        let symbol = self.symbol.filter(|s| !s.is_empty());
        let side = self.side.as_deref().and_then(Side::parse);
        let (Some(symbol), Some(side)) = (symbol, side) else {
            return Err(BridgeError::Validation("symbol and side required".to_string()));
        };

        let volume = match self.volume.or(self.lots) {
            Some(v) => decimal("volume", &v)?,
            None => DEFAULT_VOLUME,
        };
        if volume <= 0.0 {
            return Err(BridgeError::Validation(
                "volume must be a positive number".to_string(),
            ));
        }

        let deviation = match self.deviation {
            Some(v) => whole("deviation", &v)?,
            None => DEFAULT_DEVIATION,
        };

        Ok(OrderRequest {
            symbol,
            side,
            volume,
            stop_loss: optional_price("stopLoss", self.stop_loss)?,
            take_profit: optional_price("takeProfit", self.take_profit)?,
            deviation,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    pub order_result: Value,
}

// ---------------------------------------------------------------------------
// GET /positions, GET /history
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionsResponse {
    pub positions: Vec<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    pub days: Option<i64>,
}

impl HistoryQuery {
    /// Lookback in days; default 7, must be >= 0.
    pub fn lookback_days(&self) -> Result<u32, BridgeError> {
        let days = self.days.unwrap_or(DEFAULT_HISTORY_DAYS);
        u32::try_from(days)
            .map_err(|_| BridgeError::Validation("days must be a non-negative integer".to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub history: Vec<Value>,
}

// ---------------------------------------------------------------------------
// Lenient numeric decoding
// ---------------------------------------------------------------------------

fn invalid(field: &str, what: &str) -> BridgeError {
    BridgeError::Validation(format!("{field} must be {what}"))
}

/// Finite decimal from a JSON number or numeric string.
fn decimal(field: &str, v: &Value) -> Result<f64, BridgeError> {
    let parsed = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|x| x.is_finite())
        .ok_or_else(|| invalid(field, "a number"))
}

/// Non-negative integer from a JSON number (fractions truncate) or an
/// integer string.
fn whole(field: &str, v: &Value) -> Result<u32, BridgeError> {
    let parsed = match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|x| x.is_finite()).map(|x| x.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed
        .and_then(|x| u32::try_from(x).ok())
        .ok_or_else(|| invalid(field, "a non-negative integer"))
}

/// Absent or falsy (`false`, `0`, `""`, `[]`, `{}`) means "none" and is sent
/// to the terminal as 0.0.
fn optional_price(field: &str, v: Option<Value>) -> Result<f64, BridgeError> {
    let Some(v) = v else {
        return Ok(0.0);
    };
    let falsy = match &v {
        Value::Null | Value::Bool(false) => true,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(true) => false,
    };
    if falsy {
        return Ok(0.0);
    }
    decimal(field, &v)
}
