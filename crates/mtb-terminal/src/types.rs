use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde_json::{json, Value};

/// Magic number stamped on every order the bridge submits.
pub const BRIDGE_MAGIC: u64 = 123_456;

/// Comment stamped on every order the bridge submits.
pub const BRIDGE_COMMENT: &str = "api_trade";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Accepts exactly `"buy"` or `"sell"`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "buy" => Some(Side::Buy),
            "sell" => Some(Side::Sell),
            _ => None,
        }
    }

    pub fn order_type(self) -> OrderType {
        match self {
            Side::Buy => OrderType::Buy,
            Side::Sell => OrderType::Sell,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// Terminal order types used by the bridge (market orders only).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OrderType {
    Buy,
    Sell,
}

impl OrderType {
    /// `ORDER_TYPE_BUY` / `ORDER_TYPE_SELL`.
    pub fn code(self) -> u32 {
        match self {
            OrderType::Buy => 0,
            OrderType::Sell => 1,
        }
    }
}

/// Terminal trade actions used by the bridge.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TradeAction {
    /// Immediate market execution (`TRADE_ACTION_DEAL`).
    Deal,
}

impl TradeAction {
    pub fn code(self) -> u32 {
        match self {
            TradeAction::Deal => 1,
        }
    }
}

/// The request handed to the terminal's `order_send`.
#[derive(Clone, Debug, PartialEq)]
pub struct TradeRequest {
    pub action: TradeAction,
    pub symbol: String,
    pub volume: f64,
    pub order_type: OrderType,
    pub price: f64,
    /// 0.0 = no stop-loss.
    pub sl: f64,
    /// 0.0 = no take-profit.
    pub tp: f64,
    pub deviation: u32,
    pub magic: u64,
    pub comment: String,
}

impl TradeRequest {
    /// Terminal-native request dictionary (numeric action / type constants).
    pub fn to_wire(&self) -> Value {
        json!({
            "action": self.action.code(),
            "symbol": self.symbol,
            "volume": self.volume,
            "type": self.order_type.code(),
            "price": self.price,
            "sl": self.sl,
            "tp": self.tp,
            "deviation": self.deviation,
            "magic": self.magic,
            "comment": self.comment,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SymbolInfo {
    pub name: String,
    /// Enabled in Market Watch. Ticks are only streamed for visible symbols.
    pub visible: bool,
}

/// Point-in-time quote.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Tick {
    /// Unix seconds.
    pub time: i64,
    pub bid: f64,
    pub ask: f64,
}

impl Tick {
    /// Price a market order on `side` executes at: ask for buys, bid for sells.
    pub fn price_for(&self, side: Side) -> f64 {
        match side {
            Side::Buy => self.ask,
            Side::Sell => self.bid,
        }
    }
}

/// The terminal's `last_error()` pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TerminalErrorCode {
    pub code: i64,
    pub message: String,
}

impl TerminalErrorCode {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn success() -> Self {
        Self::new(1, "Success")
    }
}

impl fmt::Display for TerminalErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, '{}')", self.code, self.message)
    }
}

/// Half-open UTC interval `[from, to)` for deal history queries.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HistoryWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl HistoryWindow {
    /// `[now - days, now)`. Saturates at the earliest representable instant.
    pub fn last_days(now: DateTime<Utc>, days: u32) -> Self {
        let from = TimeDelta::try_days(i64::from(days))
            .and_then(|span| now.checked_sub_signed(span))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self { from, to: now }
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.from <= t && t < self.to
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn side_parse_is_exact() {
        assert_eq!(Side::parse("buy"), Some(Side::Buy));
        assert_eq!(Side::parse("sell"), Some(Side::Sell));
        assert_eq!(Side::parse("BUY"), None);
        assert_eq!(Side::parse(" sell"), None);
        assert_eq!(Side::parse("hold"), None);
    }

    #[test]
    fn tick_price_follows_side() {
        let t = Tick {
            time: 0,
            bid: 1.0998,
            ask: 1.1,
        };
        assert_eq!(t.price_for(Side::Buy), 1.1);
        assert_eq!(t.price_for(Side::Sell), 1.0998);
    }

    #[test]
    fn wire_request_uses_terminal_constants() {
        let req = TradeRequest {
            action: TradeAction::Deal,
            symbol: "EURUSD".into(),
            volume: 0.1,
            order_type: OrderType::Sell,
            price: 1.0998,
            sl: 0.0,
            tp: 0.0,
            deviation: 10,
            magic: BRIDGE_MAGIC,
            comment: BRIDGE_COMMENT.into(),
        };
        let w = req.to_wire();
        assert_eq!(w["action"], 1);
        assert_eq!(w["type"], 1);
        assert_eq!(w["magic"], 123456);
        assert_eq!(w["comment"], "api_trade");
    }

    #[test]
    fn history_window_is_half_open() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        let w = HistoryWindow::last_days(now, 3);
        assert_eq!(w.from, Utc.with_ymd_and_hms(2024, 5, 7, 12, 0, 0).unwrap());
        assert_eq!(w.to, now);
        assert!(w.contains(w.from));
        assert!(!w.contains(now));
    }

    #[test]
    fn history_window_saturates_instead_of_panicking() {
        let w = HistoryWindow::last_days(Utc::now(), u32::MAX);
        assert_eq!(w.from, DateTime::<Utc>::MIN_UTC);
    }

    #[test]
    fn error_code_displays_like_a_tuple() {
        let e = TerminalErrorCode::new(-10004, "No IPC connection");
        assert_eq!(e.to_string(), "(-10004, 'No IPC connection')");
    }
}
