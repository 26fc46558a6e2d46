//! mtb-terminal: the bridge's view of the MT5 trading terminal.
//!
//! - [`Terminal`]: the automation interface, one method per terminal function.
//! - [`TerminalHandle`]: the single worker that owns the terminal and
//!   serializes every call into it.
//! - [`ops`]: bridge operations (market order, positions, deal history,
//!   connection probe) composed from terminal calls.
//! - Backends: [`PaperTerminal`] (in-memory) and [`GatewayTerminal`]
//!   (live terminal behind a JSON/HTTP gateway).

pub mod adapter;
pub mod error;
pub mod gateway;
pub mod ops;
pub mod paper;
pub mod record;
pub mod types;
pub mod worker;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

pub use adapter::Terminal;
pub use error::{OrderError, TerminalError};
pub use gateway::GatewayTerminal;
pub use ops::{OrderRequest, PlacedOrder};
pub use paper::PaperTerminal;
pub use record::TerminalRecord;
pub use types::{
    HistoryWindow, OrderType, Side, SymbolInfo, TerminalErrorCode, Tick, TradeAction,
    TradeRequest, BRIDGE_COMMENT, BRIDGE_MAGIC,
};
pub use worker::TerminalHandle;
