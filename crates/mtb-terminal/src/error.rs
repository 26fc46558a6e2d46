use thiserror::Error;

use crate::types::TerminalErrorCode;

/// Failure talking to the terminal itself.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TerminalError {
    /// Transport to the terminal is down (process gone, gateway unreachable).
    #[error("terminal unavailable: {0}")]
    Disconnected(String),

    /// The terminal answered with its own structured failure code.
    #[error("terminal rejected call: ({code}, '{message}')")]
    Rejected { code: i64, message: String },

    /// The terminal answered, but not in a shape the bridge understands.
    #[error("unexpected terminal reply: {0}")]
    Protocol(String),

    /// `initialize()` returned false at startup.
    #[error("initialize() failed, error code = {0}")]
    InitializeFailed(TerminalErrorCode),

    /// The terminal worker thread is no longer running.
    #[error("terminal worker stopped")]
    WorkerStopped,
}

/// Failure of the order-submission sequence.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    #[error("Symbol {0} not found in terminal")]
    UnknownSymbol(String),

    #[error("Could not get tick for symbol")]
    NoTick(String),

    /// `order_send` returned nothing; carries the terminal's `last_error()`.
    #[error("Order send returned None. last_error: {0}")]
    SendReturnedNothing(TerminalErrorCode),

    #[error(transparent)]
    Terminal(#[from] TerminalError),
}
