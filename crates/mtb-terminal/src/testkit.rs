//! Scripted terminal double for tests in this and downstream crates.
//!
//! Clones share state: keep one clone in the test, move another into the
//! worker, then assert on what the worker did through the kept clone.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::adapter::{Result, Terminal};
use crate::error::TerminalError;
use crate::record::TerminalRecord;
use crate::types::{SymbolInfo, TerminalErrorCode, Tick, TradeRequest};

#[derive(Debug)]
struct Script {
    initialize_ok: bool,
    select_ok: bool,
    symbols: BTreeMap<String, bool>,
    ticks: BTreeMap<String, (f64, f64)>,
    order_result: Option<TerminalRecord>,
    positions: Option<Vec<TerminalRecord>>,
    deals: Option<Vec<TerminalRecord>>,
    last_error: TerminalErrorCode,
    fail_with: Option<TerminalError>,

    calls: Vec<String>,
    sent: Vec<TradeRequest>,
    history_windows: Vec<(DateTime<Utc>, DateTime<Utc>)>,
    shut_down: bool,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            initialize_ok: true,
            select_ok: true,
            symbols: BTreeMap::new(),
            ticks: BTreeMap::new(),
            order_result: None,
            positions: None,
            deals: None,
            last_error: TerminalErrorCode::success(),
            fail_with: None,
            calls: Vec::new(),
            sent: Vec::new(),
            history_windows: Vec::new(),
            shut_down: false,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ScriptedTerminal {
    inner: Arc<Mutex<Script>>,
}

impl ScriptedTerminal {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        // A panicking test thread must not hide the recorded calls.
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn with_symbol(self, name: &str, visible: bool) -> Self {
        self.script().symbols.insert(name.to_string(), visible);
        self
    }

    pub fn with_tick(self, name: &str, bid: f64, ask: f64) -> Self {
        self.script().ticks.insert(name.to_string(), (bid, ask));
        self
    }

    pub fn with_order_result(self, record: TerminalRecord) -> Self {
        self.script().order_result = Some(record);
        self
    }

    pub fn with_positions(self, rows: Option<Vec<TerminalRecord>>) -> Self {
        self.script().positions = rows;
        self
    }

    pub fn with_deals(self, rows: Option<Vec<TerminalRecord>>) -> Self {
        self.script().deals = rows;
        self
    }

    pub fn with_last_error(self, code: i64, message: &str) -> Self {
        self.script().last_error = TerminalErrorCode::new(code, message);
        self
    }

    /// Every data call (everything except `initialize`, `shutdown` and
    /// `last_error`) fails with `err`.
    pub fn failing_calls_with(self, err: TerminalError) -> Self {
        self.script().fail_with = Some(err);
        self
    }

    /// `symbol_select` returns false and leaves visibility unchanged.
    pub fn failing_select(self) -> Self {
        self.script().select_ok = false;
        self
    }

    /// Every later `initialize()` returns false.
    pub fn failing_initialize(self) -> Self {
        self.script().initialize_ok = false;
        self
    }

    /// Names of terminal functions invoked, in order.
    pub fn calls(&self) -> Vec<String> {
        self.script().calls.clone()
    }

    /// Calls other than `initialize` (startup always runs one).
    pub fn calls_after_startup(&self) -> Vec<String> {
        self.calls().into_iter().filter(|c| c != "initialize").collect()
    }

    pub fn sent_requests(&self) -> Vec<TradeRequest> {
        self.script().sent.clone()
    }

    pub fn history_windows(&self) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
        self.script().history_windows.clone()
    }

    pub fn was_shut_down(&self) -> bool {
        self.script().shut_down
    }

    fn record(&self, call: &str) -> MutexGuard<'_, Script> {
        let mut s = self.script();
        s.calls.push(call.to_string());
        s
    }

    /// Like `record`, but honours `failing_calls_with`.
    fn data_call(&self, call: &str) -> Result<MutexGuard<'_, Script>> {
        let s = self.record(call);
        if let Some(err) = s.fail_with.clone() {
            return Err(err);
        }
        Ok(s)
    }
}

impl Terminal for ScriptedTerminal {
    fn initialize(&mut self) -> Result<bool> {
        Ok(self.record("initialize").initialize_ok)
    }

    fn shutdown(&mut self) {
        self.record("shutdown").shut_down = true;
    }

    fn last_error(&mut self) -> Result<TerminalErrorCode> {
        Ok(self.record("last_error").last_error.clone())
    }

    fn symbol_info(&mut self, symbol: &str) -> Result<Option<SymbolInfo>> {
        let s = self.data_call("symbol_info")?;
        Ok(s.symbols.get(symbol).map(|visible| SymbolInfo {
            name: symbol.to_string(),
            visible: *visible,
        }))
    }

    fn symbol_select(&mut self, symbol: &str, enable: bool) -> Result<bool> {
        let mut s = self.data_call("symbol_select")?;
        if !s.select_ok {
            return Ok(false);
        }
        match s.symbols.get_mut(symbol) {
            Some(visible) => {
                *visible = enable;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn symbol_info_tick(&mut self, symbol: &str) -> Result<Option<Tick>> {
        let s = self.data_call("symbol_info_tick")?;
        Ok(s.ticks.get(symbol).map(|(bid, ask)| Tick {
            time: 0,
            bid: *bid,
            ask: *ask,
        }))
    }

    fn order_send(&mut self, request: &TradeRequest) -> Result<Option<TerminalRecord>> {
        let mut s = self.data_call("order_send")?;
        s.sent.push(request.clone());
        Ok(s.order_result.clone())
    }

    fn positions_get(&mut self) -> Result<Option<Vec<TerminalRecord>>> {
        Ok(self.data_call("positions_get")?.positions.clone())
    }

    fn history_deals_get(
        &mut self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Option<Vec<TerminalRecord>>> {
        let mut s = self.data_call("history_deals_get")?;
        s.history_windows.push((from, to));
        Ok(s.deals.clone())
    }
}
