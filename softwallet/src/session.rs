use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

use crate::account::{Account, Address};
use crate::errors::{BindError, ProviderError};
use crate::provider::{ProviderHandle, SessionContext, SignedTransaction, TransactionRequest};

struct BoundSession {
    /// Held so the signing material lives exactly as long as the binding.
    _account: Account,
    provider: Arc<dyn ProviderHandle>,
    context: SessionContext,
}

#[derive(Default)]
enum SessionState {
    #[default]
    Empty,
    Binding,
    Bound(BoundSession),
}

/// One account bound to one provider instance.
///
/// A session accepts a single bind. Rebinding requires `teardown` first or a
/// fresh session.
pub struct Session {
    state: RwLock<SessionState>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(SessionState::Empty),
        }
    }

    pub fn is_bound(&self) -> bool {
        matches!(*self.state.read(), SessionState::Bound(_))
    }

    pub fn is_binding(&self) -> bool {
        matches!(*self.state.read(), SessionState::Binding)
    }

    pub fn context(&self) -> Option<SessionContext> {
        match &*self.state.read() {
            SessionState::Bound(bound) => Some(bound.context.clone()),
            _ => None,
        }
    }

    pub fn address(&self) -> Option<Address> {
        match &*self.state.read() {
            SessionState::Bound(bound) => Some(bound.context.address),
            _ => None,
        }
    }

    pub fn provider(&self) -> Option<Arc<dyn ProviderHandle>> {
        match &*self.state.read() {
            SessionState::Bound(bound) => Some(Arc::clone(&bound.provider)),
            _ => None,
        }
    }

    pub async fn sign_transaction(
        &self,
        request: &TransactionRequest,
    ) -> Result<SignedTransaction, ProviderError> {
        let provider = self.provider().ok_or(ProviderError::NotInitialized)?;
        provider.sign_transaction(request).await
    }

    /// Shut the provider down and drop the account. No-op unless bound.
    pub async fn teardown(&self) {
        let released = {
            let mut state = self.state.write();
            match std::mem::take(&mut *state) {
                SessionState::Bound(bound) => Some(bound),
                SessionState::Binding => {
                    *state = SessionState::Binding;
                    None
                }
                SessionState::Empty => None,
            }
        };

        if let Some(bound) = released {
            bound.provider.shutdown().await;
            log::info!(
                "Session {} torn down for {}",
                bound.context.session_id,
                bound.context.address
            );
        }
    }

    /// Reserve the session for a bind. The reservation is released on drop
    /// unless completed.
    pub(crate) fn begin_bind(&self) -> Result<BindGuard<'_>, BindError> {
        let mut state = self.state.write();
        match *state {
            SessionState::Empty => {
                *state = SessionState::Binding;
                Ok(BindGuard {
                    session: self,
                    completed: false,
                })
            }
            SessionState::Binding => Err(BindError::BindInProgress),
            SessionState::Bound(_) => Err(BindError::AlreadyBound),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.state.read() {
            SessionState::Empty => "empty".to_string(),
            SessionState::Binding => "binding".to_string(),
            SessionState::Bound(bound) => format!("bound({})", bound.context.address),
        };
        f.debug_struct("Session").field("state", &state).finish()
    }
}

pub(crate) struct BindGuard<'a> {
    session: &'a Session,
    completed: bool,
}

impl BindGuard<'_> {
    pub(crate) fn complete(
        mut self,
        account: Account,
        provider: Arc<dyn ProviderHandle>,
        context: SessionContext,
    ) {
        *self.session.state.write() = SessionState::Bound(BoundSession {
            _account: account,
            provider,
            context,
        });
        self.completed = true;
    }
}

impl Drop for BindGuard<'_> {
    fn drop(&mut self) {
        if !self.completed {
            let mut state = self.session.state.write();
            if matches!(*state, SessionState::Binding) {
                *state = SessionState::Empty;
            }
        }
    }
}
