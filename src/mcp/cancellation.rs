//! In-flight tool call tracking for `notifications/cancelled`.
//!
//! Each `tools/call` registers its request id and receives a guard holding the
//! call's cancellation token. Dropping the guard unregisters the call, so a late
//! cancellation for a finished request is a no-op.
//!
//! A manager is one cancellation scope. The stdio transport uses a single scope;
//! the HTTP transport gives every session its own, derived from a shutdown token
//! so stopping the server still reaches every in-flight call.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::mcp::protocol::JsonRpcId;

/// Cancellation tokens of in-flight calls, by request id
#[derive(Debug, Default)]
pub struct CancellationManager {
    tokens: DashMap<JsonRpcId, (u64, CancellationToken)>,
    next_generation: AtomicU64,
    parent: CancellationToken,
}

impl CancellationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// A scope whose calls are also cancelled when `parent` is
    pub fn child_of(parent: &CancellationToken) -> Self {
        Self { parent: parent.child_token(), ..Self::default() }
    }

    /// Track `request_id` until the returned guard is dropped
    pub fn register(self: &Arc<Self>, request_id: JsonRpcId) -> CallGuard {
        let token = self.parent.child_token();
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        if let Some((_, previous)) =
            self.tokens.insert(request_id.clone(), (generation, token.clone()))
        {
            debug!(request_id = %request_id, "Request id reused while in flight");
            previous.cancel();
        }

        CallGuard { manager: Arc::clone(self), request_id, generation, token }
    }

    /// Cancel the call registered under `request_id`. Returns whether one was found.
    pub fn cancel(&self, request_id: &JsonRpcId) -> bool {
        match self.tokens.get(request_id) {
            Some(entry) => {
                entry.value().1.cancel();
                debug!(request_id = %request_id, "Cancelled in-flight call");
                true
            }
            None => {
                debug!(request_id = %request_id, "No in-flight call to cancel");
                false
            }
        }
    }

    /// Cancel every in-flight call
    pub fn cancel_all(&self) {
        for entry in self.tokens.iter() {
            entry.value().1.cancel();
        }
    }

    pub fn active_count(&self) -> usize {
        self.tokens.len()
    }

    fn complete(&self, request_id: &JsonRpcId, generation: u64) {
        // A reused id may have replaced our entry; leave that one alone
        self.tokens.remove_if(request_id, |_, (current, _)| *current == generation);
    }
}

/// Registration of one in-flight call
#[derive(Debug)]
pub struct CallGuard {
    manager: Arc<CancellationManager>,
    request_id: JsonRpcId,
    generation: u64,
    token: CancellationToken,
}

impl CallGuard {
    /// Token that fires when the call is cancelled
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        self.manager.complete(&self.request_id, self.generation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_cancel() {
        let manager = Arc::new(CancellationManager::new());
        let guard = manager.register(JsonRpcId::Number(1));
        let token = guard.token();

        assert_eq!(manager.active_count(), 1);
        assert!(!token.is_cancelled());
        assert!(manager.cancel(&JsonRpcId::Number(1)));
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_guard_drop_unregisters() {
        let manager = Arc::new(CancellationManager::new());
        {
            let _guard = manager.register(JsonRpcId::String("a".into()));
            assert_eq!(manager.active_count(), 1);
        }
        assert_eq!(manager.active_count(), 0);
        assert!(!manager.cancel(&JsonRpcId::String("a".into())));
    }

    #[test]
    fn test_cancel_unknown_id() {
        let manager = CancellationManager::new();
        assert!(!manager.cancel(&JsonRpcId::Number(999)));
    }

    #[test]
    fn test_cancel_all() {
        let manager = Arc::new(CancellationManager::new());
        let a = manager.register(JsonRpcId::Number(1));
        let b = manager.register(JsonRpcId::Number(2));
        manager.cancel_all();
        assert!(a.token().is_cancelled());
        assert!(b.token().is_cancelled());
    }

    #[test]
    fn test_child_scopes_are_independent() {
        let shutdown = CancellationToken::new();
        let first = Arc::new(CancellationManager::child_of(&shutdown));
        let second = Arc::new(CancellationManager::child_of(&shutdown));
        let a = first.register(JsonRpcId::Number(1));
        let b = second.register(JsonRpcId::Number(1));

        assert!(!a.token().is_cancelled());
        assert!(first.cancel(&JsonRpcId::Number(1)));
        assert!(a.token().is_cancelled());
        assert!(!b.token().is_cancelled());

        shutdown.cancel();
        assert!(b.token().is_cancelled());
    }

    #[test]
    fn test_reused_id_keeps_newer_registration() {
        let manager = Arc::new(CancellationManager::new());
        let first = manager.register(JsonRpcId::Number(5));
        let second = manager.register(JsonRpcId::Number(5));

        assert!(first.token().is_cancelled());
        drop(first);
        assert_eq!(manager.active_count(), 1);
        assert!(manager.cancel(&JsonRpcId::Number(5)));
        assert!(second.token().is_cancelled());
    }
}
