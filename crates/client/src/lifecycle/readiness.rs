//! Install completion signal.

use std::sync::Arc;

use pantry_core::Error;
use tokio::sync::watch;

/// Where install stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallState {
    Pending,
    Ready,
    Failed(String),
}

/// Shared view of the install state.
///
/// Clones observe the same signal. The sender lives inside the signal, so
/// waiting never fails because the installer went away.
#[derive(Debug, Clone)]
pub struct Readiness {
    tx: Arc<watch::Sender<InstallState>>,
}

impl Readiness {
    /// A signal that has not settled yet.
    pub fn pending() -> Self {
        let (tx, _rx) = watch::channel(InstallState::Pending);
        Self { tx: Arc::new(tx) }
    }

    /// A signal that is already ready, for engines whose stores were
    /// populated elsewhere.
    pub fn ready() -> Self {
        let readiness = Self::pending();
        readiness.settle(InstallState::Ready);
        readiness
    }

    pub fn state(&self) -> InstallState {
        self.tx.borrow().clone()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == InstallState::Ready
    }

    pub(crate) fn settle(&self, state: InstallState) {
        self.tx.send_replace(state);
    }

    /// Wait until install settles.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotReady` if install failed.
    pub async fn wait(&self) -> Result<(), Error> {
        let mut rx = self.tx.subscribe();
        let settled = {
            let state = rx
                .wait_for(|state| *state != InstallState::Pending)
                .await
                .map_err(|_| Error::NotReady("install signal closed".into()))?;
            InstallState::clone(&state)
        };

        match settled {
            InstallState::Failed(reason) => Err(Error::NotReady(reason)),
            _ => Ok(()),
        }
    }
}
