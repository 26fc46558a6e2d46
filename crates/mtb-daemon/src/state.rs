//! Shared runtime state for mtb-daemon.
//!
//! `AppState` is built once in `main` and handed to every handler as
//! `State<Arc<AppState>>`. It owns no terminal itself: the terminal lives on
//! the worker behind [`TerminalHandle`].

use mtb_config::{ApiKey, TerminalBackend};
use mtb_terminal::{GatewayTerminal, PaperTerminal, Terminal, TerminalError, TerminalHandle};

#[derive(Clone)]
pub struct AppState {
    /// Single access point to the terminal.
    pub terminal: TerminalHandle,
    /// Shared secret for protected routes.
    pub api_key: ApiKey,
}

impl AppState {
    pub fn new(terminal: TerminalHandle, api_key: ApiKey) -> Self {
        Self { terminal, api_key }
    }
}

/// Build the backend selected by config. The returned closure runs on the
/// terminal worker thread, so blocking clients are created off the runtime.
pub fn backend_factory(
    backend: &TerminalBackend,
) -> impl FnOnce() -> Result<Box<dyn Terminal>, TerminalError> + Send + 'static {
    let backend = backend.clone();
    move || match backend {
        TerminalBackend::Paper { symbols } => {
            let mut paper = PaperTerminal::new();
            for s in symbols {
                paper.add_symbol(s.name, s.bid, s.ask, s.visible);
            }
            Ok(Box::new(paper) as Box<dyn Terminal>)
        }
        TerminalBackend::Gateway { base_url, timeout } => {
            let gw = GatewayTerminal::connect(base_url, timeout)?;
            Ok(Box::new(gw) as Box<dyn Terminal>)
        }
    }
}
