//! Runtime configuration for the MT5 bridge.
//!
//! All settings come from environment variables and are resolved exactly once
//! at startup into a [`BridgeConfig`]. Do not scatter `std::env::var` calls
//! across the codebase; pass the resolved config into constructors instead.
//!
//! Error messages reference the env var **NAME**, never its value.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

pub mod api_key;

pub use api_key::{ApiKey, DEFAULT_API_KEY};

// ---------------------------------------------------------------------------
// Env var names
// ---------------------------------------------------------------------------

pub const ENV_API_KEY: &str = "MT5_BRIDGE_KEY";
pub const ENV_STRICT_KEY: &str = "MT5_BRIDGE_STRICT_KEY";
pub const ENV_ADDR: &str = "MT5_BRIDGE_ADDR";
pub const ENV_TERMINAL: &str = "MT5_BRIDGE_TERMINAL";
pub const ENV_GATEWAY_URL: &str = "MT5_BRIDGE_GATEWAY_URL";
pub const ENV_GATEWAY_TIMEOUT_MS: &str = "MT5_BRIDGE_GATEWAY_TIMEOUT_MS";
pub const ENV_PAPER_SYMBOLS: &str = "MT5_BRIDGE_PAPER_SYMBOLS";

const DEFAULT_ADDR: &str = "127.0.0.1:8000";
const DEFAULT_GATEWAY_URL: &str = "http://127.0.0.1:8228";
const DEFAULT_GATEWAY_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_PAPER_SYMBOLS: &str =
    "EURUSD:1.0998:1.1000,GBPUSD:1.2698:1.2700,USDJPY:149.98:150.00";

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// One row of the paper terminal's symbol table.
#[derive(Debug, Clone, PartialEq)]
pub struct PaperSymbolSpec {
    pub name: String,
    pub bid: f64,
    pub ask: f64,
    /// Whether the symbol starts out enabled in Market Watch.
    pub visible: bool,
}

/// Which terminal backend the daemon drives.
#[derive(Debug, Clone, PartialEq)]
pub enum TerminalBackend {
    /// Deterministic in-memory terminal.
    Paper { symbols: Vec<PaperSymbolSpec> },
    /// Terminal-side JSON/HTTP automation gateway.
    Gateway { base_url: String, timeout: Duration },
}

/// Everything the daemon needs at boot.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub bind_addr: SocketAddr,
    pub api_key: ApiKey,
    pub terminal: TerminalBackend,
}

impl BridgeConfig {
    /// Resolve from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve through an arbitrary lookup (tests pass a map; `from_env`
    /// passes `std::env::var`). Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = ApiKey::new(get(ENV_API_KEY).unwrap_or_else(|| DEFAULT_API_KEY.to_string()));
        let strict = get(ENV_STRICT_KEY)
            .map(|v| parse_flag(ENV_STRICT_KEY, &v))
            .transpose()?
            .unwrap_or(false);
        if strict && api_key.is_insecure_default() {
            bail!(
                "CONFIG_INSECURE_KEY: '{}' is set, but '{}' is unset or still the default placeholder",
                ENV_STRICT_KEY,
                ENV_API_KEY,
            );
        }

        let addr_raw = get(ENV_ADDR).unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let bind_addr: SocketAddr = addr_raw
            .trim()
            .parse()
            .with_context(|| format!("CONFIG_INVALID: '{}' is not a socket address", ENV_ADDR))?;

        let backend = get(ENV_TERMINAL).unwrap_or_else(|| "paper".to_string());
        let terminal = match backend.trim().to_ascii_lowercase().as_str() {
            "paper" => {
                let table = get(ENV_PAPER_SYMBOLS).unwrap_or_else(|| DEFAULT_PAPER_SYMBOLS.to_string());
                TerminalBackend::Paper {
                    symbols: parse_paper_symbols(&table)?,
                }
            }
            "gateway" => {
                let base_url = get(ENV_GATEWAY_URL)
                    .unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_string())
                    .trim()
                    .trim_end_matches('/')
                    .to_string();
                if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
                    bail!(
                        "CONFIG_INVALID: '{}' must be an http(s) URL",
                        ENV_GATEWAY_URL
                    );
                }
                let timeout_ms = match get(ENV_GATEWAY_TIMEOUT_MS) {
                    Some(v) => v.trim().parse::<u64>().with_context(|| {
                        format!(
                            "CONFIG_INVALID: '{}' must be a whole number of milliseconds",
                            ENV_GATEWAY_TIMEOUT_MS
                        )
                    })?,
                    None => DEFAULT_GATEWAY_TIMEOUT_MS,
                };
                TerminalBackend::Gateway {
                    base_url,
                    timeout: Duration::from_millis(timeout_ms),
                }
            }
            other => bail!(
                "CONFIG_INVALID: '{}' has unknown backend '{}'; expected one of: paper | gateway",
                ENV_TERMINAL,
                other,
            ),
        };

        Ok(Self {
            bind_addr,
            api_key,
            terminal,
        })
    }
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

fn parse_flag(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => bail!("CONFIG_INVALID: '{}' must be a boolean flag", name),
    }
}

/// Parse `NAME:BID:ASK[:hidden]` entries separated by commas.
pub fn parse_paper_symbols(raw: &str) -> Result<Vec<PaperSymbolSpec>> {
    let mut out = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let parts: Vec<&str> = entry.split(':').map(str::trim).collect();
        let (name, bid, ask, visible) = match parts.as_slice() {
            [name, bid, ask] => (*name, *bid, *ask, true),
            [name, bid, ask, "hidden"] => (*name, *bid, *ask, false),
            _ => bail!(
                "CONFIG_INVALID: '{}' entry '{}' must look like NAME:BID:ASK[:hidden]",
                ENV_PAPER_SYMBOLS,
                entry,
            ),
        };
        let bid: f64 = bid.parse().with_context(|| {
            format!("CONFIG_INVALID: '{}' entry '{}' has a non-numeric bid", ENV_PAPER_SYMBOLS, entry)
        })?;
        let ask: f64 = ask.parse().with_context(|| {
            format!("CONFIG_INVALID: '{}' entry '{}' has a non-numeric ask", ENV_PAPER_SYMBOLS, entry)
        })?;
        if name.is_empty() || !(bid > 0.0 && ask >= bid) {
            bail!(
                "CONFIG_INVALID: '{}' entry '{}' needs a name and 0 < bid <= ask",
                ENV_PAPER_SYMBOLS,
                entry,
            );
        }
        out.push(PaperSymbolSpec {
            name: name.to_string(),
            bid,
            ask,
            visible,
        });
    }
    Ok(out)
}
