// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Shared cancel trigger
//!
//! The same trigger backs `Query::cancel`, an interactive interrupt handler
//! and any other caller holding a clone. Firing it cancels the armed token
//! once; later firings are no-ops until it is armed again.

use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Exit status used when a repeated interrupt abandons the process
pub const INTERRUPT_EXIT_CODE: i32 = 130;

/// What an interrupt should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// Cancel the armed query and keep running
    Cancel,
    /// Stop waiting for a graceful shutdown
    Exit,
}

#[derive(Debug, Clone, Default)]
pub struct CancelTrigger {
    token: Arc<Mutex<Option<CancellationToken>>>,
}

impl CancelTrigger {
    /// Unarmed trigger
    pub fn new() -> Self {
        Self::default()
    }

    /// Trigger armed with `token`
    pub fn armed(token: CancellationToken) -> Self {
        let trigger = Self::new();
        trigger.set(token);
        trigger
    }

    /// Arm the trigger, replacing any previously armed token
    pub fn set(&self, token: CancellationToken) {
        *self.token.lock() = Some(token);
    }

    /// Disarm without cancelling
    pub fn clear(&self) {
        self.token.lock().take();
    }

    /// Cancel the armed token. Returns `false` if nothing was armed.
    pub fn cancel(&self) -> bool {
        match self.token.lock().take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.token.lock().is_some()
    }

    /// Fire the trigger once `signal` completes
    pub fn cancel_on<F>(&self, signal: F) -> JoinHandle<bool>
    where
        F: Future + Send + 'static,
    {
        let trigger = self.clone();
        tokio::spawn(async move {
            let _ = signal.await;
            trigger.cancel()
        })
    }

    /// Handle the `received`-th interrupt (counting from 1). The first one
    /// fires the trigger; any later one asks the process to exit.
    pub fn interrupt(&self, received: usize) -> Interrupt {
        if received > 1 {
            return Interrupt::Exit;
        }
        if self.cancel() {
            log::info!("interrupt received, cancelling query");
        }
        Interrupt::Cancel
    }

    /// Fire the trigger on the first Ctrl-C. A second Ctrl-C exits the
    /// process with status 130, for when shutdown itself stalls.
    pub fn listen_for_interrupt(&self) -> JoinHandle<()> {
        let trigger = self.clone();
        tokio::spawn(async move {
            let mut received = 0;
            loop {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    log::warn!("unable to listen for interrupts: {}", e);
                    return;
                }
                received += 1;
                if trigger.interrupt(received) == Interrupt::Exit {
                    log::warn!("second interrupt received, exiting");
                    std::process::exit(INTERRUPT_EXIT_CODE);
                }
            }
        })
    }
}
