//! Deterministic in-memory "paper" terminal.
//!
//! Design decisions (kept simple):
//! - Market orders fill immediately at the request price; no partial fills.
//! - Tickets are sequential from 1. Each fill consumes three: order, deal, position.
//! - Hedging account model: every fill opens its own position.
//! - Ticks are only served for symbols that are visible in Market Watch.
//! - After `shutdown()` every call behaves like a dropped IPC link until the
//!   next successful `initialize()`.
//! - There is no close path, so state is bounded instead: once the open
//!   position limit is reached fills are refused with retcode 10040, and only
//!   the most recent deals are retained. Dev and test use only.
//!
//! Result / position / deal records use the terminal's field names so callers
//! see the same shapes they would get from a live terminal.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::adapter::{Result, Terminal};
use crate::record::TerminalRecord;
use crate::types::{OrderType, SymbolInfo, TerminalErrorCode, Tick, TradeRequest};

const RETCODE_DONE: i64 = 10009;
const RETCODE_INVALID: i64 = 10013;
const RETCODE_INVALID_VOLUME: i64 = 10014;
const RETCODE_LIMIT_POSITIONS: i64 = 10040;

const DEFAULT_POSITION_LIMIT: usize = 1_000;
const DEFAULT_DEAL_RETENTION: usize = 10_000;

/// Deal entry direction: position opened.
const DEAL_ENTRY_IN: u32 = 0;

#[derive(Clone, Debug)]
struct PaperSymbol {
    visible: bool,
    /// `(bid, ask)`; `None` = no quote yet.
    quote: Option<(f64, f64)>,
}

#[derive(Clone, Debug)]
struct PaperDeal {
    time: DateTime<Utc>,
    record: TerminalRecord,
}

#[derive(Clone, Debug)]
pub struct PaperTerminal {
    symbols: BTreeMap<String, PaperSymbol>,
    positions: BTreeMap<u64, TerminalRecord>, // keyed by position ticket
    deals: Vec<PaperDeal>,
    position_limit: usize,
    deal_retention: usize,
    next_ticket: u64,
    next_request_id: u64,
    connected: bool,
    trading_enabled: bool,
    accept_initialize: bool,
    last_error: TerminalErrorCode,
}

impl Default for PaperTerminal {
    fn default() -> Self {
        Self::new()
    }
}

impl PaperTerminal {
    pub fn new() -> Self {
        Self {
            symbols: BTreeMap::new(),
            positions: BTreeMap::new(),
            deals: Vec::new(),
            position_limit: DEFAULT_POSITION_LIMIT,
            deal_retention: DEFAULT_DEAL_RETENTION,
            next_ticket: 1,
            next_request_id: 1,
            connected: false,
            trading_enabled: true,
            accept_initialize: true,
            last_error: TerminalErrorCode::success(),
        }
    }

    /// Register (or overwrite) a symbol with a two-sided quote.
    pub fn add_symbol(&mut self, name: impl Into<String>, bid: f64, ask: f64, visible: bool) {
        self.symbols.insert(
            name.into(),
            PaperSymbol {
                visible,
                quote: Some((bid, ask)),
            },
        );
    }

    /// Drop the current quote so no tick is available for `symbol`.
    pub fn clear_quote(&mut self, symbol: &str) {
        if let Some(s) = self.symbols.get_mut(symbol) {
            s.quote = None;
        }
    }

    /// Simulate the terminal's "AutoTrading" button being off.
    pub fn disable_trading(&mut self) {
        self.trading_enabled = false;
    }

    /// Make every later `initialize()` fail, as if the terminal were closed.
    pub fn refuse_reconnect(&mut self) {
        self.accept_initialize = false;
    }

    /// Insert a historical deal settled at `time`.
    pub fn seed_deal(&mut self, time: DateTime<Utc>, record: TerminalRecord) {
        self.push_deal(PaperDeal { time, record });
    }

    /// Override the open-position limit and the number of deals retained.
    pub fn set_limits(&mut self, positions: usize, deals: usize) {
        self.position_limit = positions;
        self.deal_retention = deals;
        self.trim_deals();
    }

    fn push_deal(&mut self, deal: PaperDeal) {
        self.deals.push(deal);
        self.trim_deals();
    }

    fn trim_deals(&mut self) {
        let excess = self.deals.len().saturating_sub(self.deal_retention);
        self.deals.drain(..excess);
    }

    fn fail(&mut self, code: i64, message: &str) {
        self.last_error = TerminalErrorCode::new(code, message);
    }

    fn ensure_connected(&mut self) -> bool {
        if !self.connected {
            self.fail(-10004, "No IPC connection");
        }
        self.connected
    }

    fn take_ticket(&mut self) -> u64 {
        let t = self.next_ticket;
        self.next_ticket += 1;
        t
    }

    fn result_record(
        &mut self,
        retcode: i64,
        deal: u64,
        order: u64,
        req: &TradeRequest,
        comment: &str,
    ) -> TerminalRecord {
        let (bid, ask) = self
            .symbols
            .get(&req.symbol)
            .and_then(|s| s.quote)
            .unwrap_or((0.0, 0.0));
        let request_id = self.next_request_id;
        self.next_request_id += 1;
        let filled = retcode == RETCODE_DONE;
        TerminalRecord::from_fields([
            ("retcode", json!(retcode)),
            ("deal", json!(deal)),
            ("order", json!(order)),
            ("volume", json!(if filled { req.volume } else { 0.0 })),
            ("price", json!(if filled { req.price } else { 0.0 })),
            ("bid", json!(bid)),
            ("ask", json!(ask)),
            ("comment", json!(comment)),
            ("request_id", json!(request_id)),
            ("retcode_external", json!(0)),
            ("request", req.to_wire()),
        ])
    }

    fn fill(&mut self, req: &TradeRequest) -> TerminalRecord {
        let order = self.take_ticket();
        let deal = self.take_ticket();
        let position = self.take_ticket();
        let now = Utc::now();
        let ts = now.timestamp();
        let current = self
            .symbols
            .get(&req.symbol)
            .and_then(|s| s.quote)
            .map(|(bid, ask)| match req.order_type {
                OrderType::Buy => bid,
                OrderType::Sell => ask,
            })
            .unwrap_or(req.price);

        self.positions.insert(
            position,
            TerminalRecord::from_fields([
                ("ticket", json!(position)),
                ("time", json!(ts)),
                ("type", json!(req.order_type.code())),
                ("magic", json!(req.magic)),
                ("identifier", json!(position)),
                ("volume", json!(req.volume)),
                ("price_open", json!(req.price)),
                ("sl", json!(req.sl)),
                ("tp", json!(req.tp)),
                ("price_current", json!(current)),
                ("profit", json!(0.0)),
                ("symbol", json!(req.symbol)),
                ("comment", json!(req.comment)),
            ]),
        );

        self.push_deal(PaperDeal {
            time: now,
            record: TerminalRecord::from_fields([
                ("ticket", json!(deal)),
                ("order", json!(order)),
                ("time", json!(ts)),
                ("type", json!(req.order_type.code())),
                ("entry", json!(DEAL_ENTRY_IN)),
                ("magic", json!(req.magic)),
                ("position_id", json!(position)),
                ("volume", json!(req.volume)),
                ("price", json!(req.price)),
                ("profit", json!(0.0)),
                ("symbol", json!(req.symbol)),
                ("comment", json!(req.comment)),
            ]),
        });

        self.result_record(RETCODE_DONE, deal, order, req, "Request executed")
    }
}

impl Terminal for PaperTerminal {
    fn initialize(&mut self) -> Result<bool> {
        if !self.accept_initialize {
            self.connected = false;
            self.fail(-10003, "IPC initialize failed, MetaTrader 5 x64 not found");
            return Ok(false);
        }
        self.connected = true;
        self.last_error = TerminalErrorCode::success();
        Ok(true)
    }

    fn shutdown(&mut self) {
        self.connected = false;
    }

    fn last_error(&mut self) -> Result<TerminalErrorCode> {
        Ok(self.last_error.clone())
    }

    fn symbol_info(&mut self, symbol: &str) -> Result<Option<SymbolInfo>> {
        if !self.ensure_connected() {
            return Ok(None);
        }
        Ok(self.symbols.get(symbol).map(|s| SymbolInfo {
            name: symbol.to_string(),
            visible: s.visible,
        }))
    }

    fn symbol_select(&mut self, symbol: &str, enable: bool) -> Result<bool> {
        if !self.ensure_connected() {
            return Ok(false);
        }
        match self.symbols.get_mut(symbol) {
            Some(s) => {
                s.visible = enable;
                Ok(true)
            }
            None => {
                self.fail(-1, "Terminal: Call failed");
                Ok(false)
            }
        }
    }

    fn symbol_info_tick(&mut self, symbol: &str) -> Result<Option<Tick>> {
        if !self.ensure_connected() {
            return Ok(None);
        }
        let tick = self
            .symbols
            .get(symbol)
            .filter(|s| s.visible)
            .and_then(|s| s.quote)
            .map(|(bid, ask)| Tick {
                time: Utc::now().timestamp(),
                bid,
                ask,
            });
        Ok(tick)
    }

    fn order_send(&mut self, request: &TradeRequest) -> Result<Option<TerminalRecord>> {
        if !self.ensure_connected() {
            return Ok(None);
        }
        if !self.trading_enabled {
            self.fail(-8, "Terminal: Auto-trading disabled");
            return Ok(None);
        }
        let visible = match self.symbols.get(&request.symbol) {
            Some(s) => s.visible,
            None => {
                self.fail(-2, "Terminal: Invalid params");
                return Ok(None);
            }
        };
        if !visible {
            return Ok(Some(self.result_record(
                RETCODE_INVALID,
                0,
                0,
                request,
                "Invalid request",
            )));
        }
        if !(request.volume.is_finite() && request.volume > 0.0) {
            return Ok(Some(self.result_record(
                RETCODE_INVALID_VOLUME,
                0,
                0,
                request,
                "Invalid volume",
            )));
        }
        if self.positions.len() >= self.position_limit {
            return Ok(Some(self.result_record(
                RETCODE_LIMIT_POSITIONS,
                0,
                0,
                request,
                "Position limit reached",
            )));
        }
        Ok(Some(self.fill(request)))
    }

    fn positions_get(&mut self) -> Result<Option<Vec<TerminalRecord>>> {
        if !self.ensure_connected() {
            return Ok(None);
        }
        Ok(Some(self.positions.values().cloned().collect()))
    }

    fn history_deals_get(
        &mut self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Option<Vec<TerminalRecord>>> {
        if !self.ensure_connected() {
            return Ok(None);
        }
        Ok(Some(
            self.deals
                .iter()
                .filter(|d| from <= d.time && d.time < to)
                .map(|d| d.record.clone())
                .collect(),
        ))
    }
}
