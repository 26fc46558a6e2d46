//! Bridge operations composed from raw terminal calls.
//!
//! Each function is meant to run as ONE job on the terminal worker, so a
//! multi-step sequence (symbol lookup, select, tick, send) never interleaves
//! with another request's terminal calls.

use tracing::{info, warn};

use crate::adapter::Terminal;
use crate::error::{OrderError, TerminalError};
use crate::record::TerminalRecord;
use crate::types::{
    HistoryWindow, Side, TerminalErrorCode, TradeAction, TradeRequest, BRIDGE_COMMENT,
    BRIDGE_MAGIC,
};

/// Validated market-order intent.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    /// Lots; always > 0.
    pub volume: f64,
    /// 0.0 = none.
    pub stop_loss: f64,
    /// 0.0 = none.
    pub take_profit: f64,
    /// Max slippage in price steps.
    pub deviation: u32,
}

/// What was sent and what the terminal answered.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedOrder {
    pub request: TradeRequest,
    pub result: TerminalRecord,
}

/// Submit a market order at the current best price.
///
/// Sequence:
/// 1. `symbol_info` (unknown symbol -> [`OrderError::UnknownSymbol`])
/// 2. `symbol_select(symbol, true)` if the symbol is not in Market Watch
/// 3. `symbol_info_tick` (none -> [`OrderError::NoTick`])
/// 4. `order_send` with ask (buy) or bid (sell), once, no retry
///
/// The terminal's result is returned verbatim, including failure retcodes.
pub fn place_market_order(
    terminal: &mut dyn Terminal,
    req: &OrderRequest,
) -> Result<PlacedOrder, OrderError> {
    let info = terminal
        .symbol_info(&req.symbol)?
        .ok_or_else(|| OrderError::UnknownSymbol(req.symbol.clone()))?;

    if !info.visible && !terminal.symbol_select(&req.symbol, true)? {
        warn!(symbol = %req.symbol, "symbol_select failed; continuing to tick lookup");
    }

    let tick = terminal
        .symbol_info_tick(&req.symbol)?
        .ok_or_else(|| OrderError::NoTick(req.symbol.clone()))?;

    let request = TradeRequest {
        action: TradeAction::Deal,
        symbol: req.symbol.clone(),
        volume: req.volume,
        order_type: req.side.order_type(),
        price: tick.price_for(req.side),
        sl: req.stop_loss,
        tp: req.take_profit,
        deviation: req.deviation,
        magic: BRIDGE_MAGIC,
        comment: BRIDGE_COMMENT.to_string(),
    };

    let Some(result) = terminal.order_send(&request)? else {
        let diag = last_error_or_unknown(terminal);
        return Err(OrderError::SendReturnedNothing(diag));
    };

    info!(
        symbol = %request.symbol,
        side = %req.side,
        volume = request.volume,
        price = request.price,
        retcode = ?result.get("retcode"),
        "order_send"
    );

    Ok(PlacedOrder { request, result })
}

/// Open positions; "nothing" from the terminal is an empty list.
pub fn open_positions(terminal: &mut dyn Terminal) -> Result<Vec<TerminalRecord>, TerminalError> {
    Ok(terminal.positions_get()?.unwrap_or_default())
}

/// Deals settled within `window`; "nothing" from the terminal is an empty list.
pub fn deal_history(
    terminal: &mut dyn Terminal,
    window: HistoryWindow,
) -> Result<Vec<TerminalRecord>, TerminalError> {
    Ok(terminal
        .history_deals_get(window.from, window.to)?
        .unwrap_or_default())
}

/// Re-run `initialize()` and report whether the terminal is reachable.
pub fn probe_connection(terminal: &mut dyn Terminal) -> bool {
    match terminal.initialize() {
        Ok(connected) => connected,
        Err(e) => {
            warn!(error = %e, "initialize() probe failed");
            false
        }
    }
}

fn last_error_or_unknown(terminal: &mut dyn Terminal) -> TerminalErrorCode {
    terminal
        .last_error()
        .unwrap_or_else(|e| TerminalErrorCode::new(-1, e.to_string()))
}

// ---------------------------------------------------------------------------
// Internal unit tests
// ---------------------------------------------------------------------------
