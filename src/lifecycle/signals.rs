//! OS signal handling.
//!
//! # Responsibilities
//! - Wait for SIGINT/SIGTERM (Ctrl-C elsewhere)
//! - Report which signal arrived
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Interrupt and terminate trigger the same shutdown
//! - Single-shot: nothing re-arms after the first signal

use std::fmt;

use async_trait::async_trait;
use tokio::sync::watch;

/// The signal that started shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownSignal::Interrupt => write!(f, "interrupt"),
            ShutdownSignal::Terminate => write!(f, "terminate"),
        }
    }
}

/// Source of the shutdown trigger.
#[async_trait]
pub trait SignalHandler: Send + Sync {
    /// Wait until a shutdown signal arrives.
    async fn wait(&self) -> ShutdownSignal;
}

/// Listens for process signals.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsSignalHandler;

#[cfg(unix)]
#[async_trait]
impl SignalHandler for OsSignalHandler {
    async fn wait(&self) -> ShutdownSignal {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigint, mut sigterm) =
            match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
                (Ok(sigint), Ok(sigterm)) => (sigint, sigterm),
                (Err(e), _) | (_, Err(e)) => {
                    tracing::error!(error = %e, "Failed to install signal handlers, using Ctrl-C only");
                    return ctrl_c().await;
                }
            };

        tokio::select! {
            _ = sigint.recv() => ShutdownSignal::Interrupt,
            _ = sigterm.recv() => ShutdownSignal::Terminate,
        }
    }
}

#[cfg(not(unix))]
#[async_trait]
impl SignalHandler for OsSignalHandler {
    async fn wait(&self) -> ShutdownSignal {
        ctrl_c().await
    }
}

async fn ctrl_c() -> ShutdownSignal {
    match tokio::signal::ctrl_c().await {
        Ok(()) => ShutdownSignal::Interrupt,
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C; shutdown must be external");
            std::future::pending().await
        }
    }
}

/// Signal handler triggered from code.
pub struct ManualSignal {
    tx: watch::Sender<Option<ShutdownSignal>>,
}

impl ManualSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// Fire the signal. Only the first call has an effect.
    pub fn trigger(&self, signal: ShutdownSignal) {
        self.tx.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(signal);
                true
            } else {
                false
            }
        });
    }
}

impl Default for ManualSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SignalHandler for ManualSignal {
    async fn wait(&self) -> ShutdownSignal {
        let mut rx = self.tx.subscribe();
        let received = match rx.wait_for(Option::is_some).await {
            Ok(current) => *current,
            Err(_) => None,
        };
        match received {
            Some(signal) => signal,
            None => std::future::pending().await,
        }
    }
}
