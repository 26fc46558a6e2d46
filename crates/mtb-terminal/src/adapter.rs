//! The terminal automation interface, as seen by the bridge.
//!
//! Methods mirror the terminal's own API one-to-one: a call that "yields
//! nothing" on the terminal side is `Ok(None)` here, and transport or
//! terminal-level failures are `Err`. Implementations are driven from a single
//! worker thread (see [`crate::worker`]) and never called concurrently, which
//! is why every method takes `&mut self`.

use chrono::{DateTime, Utc};

use crate::error::TerminalError;
use crate::record::TerminalRecord;
use crate::types::{SymbolInfo, TerminalErrorCode, Tick, TradeRequest};

/// Convenience alias used throughout this module.
pub type Result<T> = std::result::Result<T, TerminalError>;

/// Trait that all terminal backends implement (paper, gateway, test doubles).
pub trait Terminal: Send {
    /// Connect (or re-confirm the connection). Idempotent on the terminal side.
    fn initialize(&mut self) -> Result<bool>;

    /// Release the connection. Best-effort; never fails.
    fn shutdown(&mut self);

    /// Diagnostic for the most recent failed call.
    fn last_error(&mut self) -> Result<TerminalErrorCode>;

    fn symbol_info(&mut self, symbol: &str) -> Result<Option<SymbolInfo>>;

    /// Add (`enable = true`) or remove a symbol from Market Watch.
    fn symbol_select(&mut self, symbol: &str, enable: bool) -> Result<bool>;

    fn symbol_info_tick(&mut self, symbol: &str) -> Result<Option<Tick>>;

    fn order_send(&mut self, request: &TradeRequest) -> Result<Option<TerminalRecord>>;

    fn positions_get(&mut self) -> Result<Option<Vec<TerminalRecord>>>;

    /// Deals settled within `[from, to)`.
    fn history_deals_get(
        &mut self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Option<Vec<TerminalRecord>>>;
}
