//! Terminal worker: the SINGLE access point to the terminal.
//!
//! # Invariants
//! - The backend lives on one dedicated OS thread for its whole lifetime. It
//!   is constructed there, used there, and shut down there.
//! - Jobs run strictly one at a time in submission order; no two terminal
//!   calls ever overlap.
//! - `initialize()` must succeed before [`TerminalHandle::start`] returns;
//!   otherwise the thread exits and startup fails.
//! - The backend's `shutdown()` runs exactly once: on
//!   [`TerminalHandle::shutdown`], or when the last handle is dropped.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};

use crate::adapter::Terminal;
use crate::error::TerminalError;
use crate::types::TerminalErrorCode;

type Job = Box<dyn FnOnce(&mut dyn Terminal) + Send>;

enum Command {
    Run(Job),
    Shutdown,
}

/// Cloneable handle to the terminal worker.
#[derive(Clone)]
pub struct TerminalHandle {
    tx: mpsc::UnboundedSender<Command>,
    thread: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl TerminalHandle {
    /// Spawn the worker, build the backend on it and run `initialize()`.
    ///
    /// # Errors
    /// - the factory's error, if the backend cannot be built;
    /// - [`TerminalError::InitializeFailed`] carrying `last_error()` if
    ///   `initialize()` returns false;
    /// - any transport error raised by `initialize()` itself.
    pub async fn start<F>(factory: F) -> Result<Self, TerminalError>
    where
        F: FnOnce() -> Result<Box<dyn Terminal>, TerminalError> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel::<Command>();
        let (ready_tx, ready_rx) = oneshot::channel::<Result<(), TerminalError>>();

        let thread = std::thread::Builder::new()
            .name("terminal-worker".to_string())
            .spawn(move || run_worker(factory, rx, ready_tx))
            .map_err(|e| TerminalError::Disconnected(format!("spawn terminal worker: {e}")))?;

        // On failure the worker has already returned; the thread is detached.
        ready_rx.await.unwrap_or(Err(TerminalError::WorkerStopped))?;

        Ok(Self {
            tx,
            thread: Arc::new(Mutex::new(Some(thread))),
        })
    }

    /// Run `f` against the terminal on the worker and await its result.
    pub async fn call<R, F>(&self, f: F) -> Result<R, TerminalError>
    where
        F: FnOnce(&mut dyn Terminal) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move |terminal| {
            let _ = reply_tx.send(f(terminal));
        });
        self.tx
            .send(Command::Run(job))
            .map_err(|_| TerminalError::WorkerStopped)?;
        reply_rx.await.map_err(|_| TerminalError::WorkerStopped)
    }

    /// Release the terminal and wait for the worker to exit. Idempotent.
    ///
    /// Jobs queued before this call still run first.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown);
        let thread = self.thread.lock().ok().and_then(|mut slot| slot.take());
        if let Some(thread) = thread {
            if tokio::task::spawn_blocking(move || thread.join()).await.is_err() {
                error!("terminal worker join failed");
            }
        }
    }
}

fn run_worker<F>(
    factory: F,
    mut rx: mpsc::UnboundedReceiver<Command>,
    ready: oneshot::Sender<Result<(), TerminalError>>,
) where
    F: FnOnce() -> Result<Box<dyn Terminal>, TerminalError>,
{
    let mut terminal = match factory() {
        Ok(t) => t,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    match terminal.initialize() {
        Ok(true) => {}
        Ok(false) => {
            let code = terminal
                .last_error()
                .unwrap_or_else(|e| TerminalErrorCode::new(-1, e.to_string()));
            let _ = ready.send(Err(TerminalError::InitializeFailed(code)));
            return;
        }
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    }

    info!("terminal initialized");
    if ready.send(Ok(())).is_err() {
        terminal.shutdown();
        return;
    }

    while let Some(cmd) = rx.blocking_recv() {
        match cmd {
            Command::Run(job) => {
                let t: &mut dyn Terminal = terminal.as_mut();
                if panic::catch_unwind(AssertUnwindSafe(|| job(t))).is_err() {
                    error!("terminal job panicked; worker continues");
                }
            }
            Command::Shutdown => break,
        }
    }

    terminal.shutdown();
    info!("terminal shut down");
}
