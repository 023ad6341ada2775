//! Ctrl-C routing.
//!
//! Once tokio registers its SIGINT handler it stays installed for the rest of
//! the process, so a single listener lives for the whole run. A Ctrl-C during
//! an index build cancels that build (the previous index stays active); any
//! other Ctrl-C ends the process with the conventional status 130.

use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use tracing::info;

/// Exit status for a process stopped by SIGINT.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Shared slot holding the token of the build currently running, if any.
#[derive(Clone, Default)]
pub struct Interrupts {
    build: Arc<Mutex<Option<CancellationToken>>>,
}

impl Interrupts {
    /// Start the process-wide Ctrl-C listener.
    pub fn install() -> Self {
        let interrupts = Self::default();
        let routed = interrupts.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if routed.cancel_build() {
                    info!("cancelling index build; press Ctrl-C again to quit");
                } else {
                    std::process::exit(INTERRUPTED_EXIT_CODE);
                }
            }
        });
        interrupts
    }

    /// Run `build` with a token that the next Ctrl-C cancels.
    pub async fn cancellable<T, F, Fut>(&self, build: F) -> T
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = T>,
    {
        let token = CancellationToken::new();
        self.set_build(Some(token.clone()));
        let output = build(token).await;
        self.set_build(None);
        output
    }

    /// Cancel the running build. Returns `false` when none is registered.
    pub fn cancel_build(&self) -> bool {
        let token = match self.build.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match token {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn set_build(&self, token: Option<CancellationToken>) {
        match self.build.lock() {
            Ok(mut slot) => *slot = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }
}
