//! ToolContext - execution context for tools

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::session::SessionDeps;

/// Shared handle to the session a turn operates on
///
/// Tool calls run strictly one after another, so the lock is only ever
/// contended by the turn owner reading the session back after a tool returns.
#[derive(Debug, Clone)]
pub struct ToolContext {
    session: Arc<Mutex<SessionDeps>>,
}

impl ToolContext {
    pub fn new(session: SessionDeps) -> Self {
        debug!("ToolContext::new: called");
        Self {
            session: Arc::new(Mutex::new(session)),
        }
    }

    /// Lock the session for reading or mutation
    pub async fn session(&self) -> MutexGuard<'_, SessionDeps> {
        self.session.lock().await
    }

    /// Manifest text as of now
    pub async fn manifest(&self) -> String {
        self.session.lock().await.yaml_content.clone()
    }

    /// Take the session back once the turn is over
    ///
    /// Falls back to a clone of the state when another handle is still alive.
    pub async fn into_session(self) -> SessionDeps {
        match Arc::try_unwrap(self.session) {
            Ok(mutex) => mutex.into_inner(),
            Err(shared) => {
                debug!("ToolContext::into_session: context still shared, cloning state");
                let guard = shared.lock().await;
                guard.clone()
            }
        }
    }
}
