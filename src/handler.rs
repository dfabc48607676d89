//! # Participant Handlers
//!
//! The participant's application callback ([`MessageHandlerPort`]) and the
//! resolution path commands use to find it.
//!
//! Resolution is memoized in a [`HandlerCache`] keyed by role, service and
//! operation. Commands for the same operation may resolve concurrently; the
//! first handler stored for a key wins and every later lookup sees it.

use crate::error::{HandlerError, SbbError};
use crate::exchange::{CallContext, Message, Role, Scope};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Message as delivered to the participant
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub exchange_id: Uuid,
    pub service_id: String,
    pub operation: String,
    pub role: Role,
    pub scope: Scope,
    pub message: Message,
    pub context: CallContext,
}

/// The participant's application callback
#[async_trait]
pub trait MessageHandlerPort: Send + Sync {
    async fn handle_message(&self, incoming: IncomingMessage) -> Result<(), HandlerError>;

    async fn handle_error(&self, error: SbbError, context: &CallContext)
        -> Result<(), HandlerError>;

    /// Must-understand headers this participant can process
    fn understood_headers(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Lookup key for handler resolution
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandlerKey {
    pub role: Role,
    pub service_id: String,
    pub operation: String,
}

impl HandlerKey {
    pub fn new(role: Role, service_id: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            role,
            service_id: service_id.into(),
            operation: operation.into(),
        }
    }
}

impl fmt::Display for HandlerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.role, self.service_id, self.operation)
    }
}

/// Resolves the participant handler for an operation
pub trait HandlerResolver: Send + Sync {
    fn resolve(&self, key: &HandlerKey) -> Option<Arc<dyn MessageHandlerPort>>;
}

/// Registry-backed resolver
#[derive(Default)]
pub struct StaticHandlerResolver {
    handlers: RwLock<HashMap<HandlerKey, Arc<dyn MessageHandlerPort>>>,
}

impl StaticHandlerResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous one for the same key
    pub fn register(
        &self,
        role: Role,
        service_id: &str,
        operation: &str,
        handler: Arc<dyn MessageHandlerPort>,
    ) {
        let key = HandlerKey::new(role, service_id, operation);
        info!(key = %key, "Registering message handler");

        if self.handlers.write().insert(key.clone(), handler).is_some() {
            warn!(key = %key, "Handler already registered, replacing");
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }
}

impl HandlerResolver for StaticHandlerResolver {
    fn resolve(&self, key: &HandlerKey) -> Option<Arc<dyn MessageHandlerPort>> {
        self.handlers.read().get(key).cloned()
    }
}

/// Establish-once memoization in front of a [`HandlerResolver`]
pub struct HandlerCache {
    resolver: Arc<dyn HandlerResolver>,
    cache: DashMap<HandlerKey, Arc<dyn MessageHandlerPort>>,
}

impl HandlerCache {
    pub fn new(resolver: Arc<dyn HandlerResolver>) -> Self {
        Self {
            resolver,
            cache: DashMap::new(),
        }
    }

    /// Resolve a handler; misses are not cached so late registrations are seen
    pub fn resolve(&self, key: &HandlerKey) -> Option<Arc<dyn MessageHandlerPort>> {
        if let Some(handler) = self.cache.get(key) {
            return Some(Arc::clone(handler.value()));
        }

        let resolved = self.resolver.resolve(key)?;
        let handler = self
            .cache
            .entry(key.clone())
            .or_insert(resolved)
            .value()
            .clone();

        debug!(key = %key, "Message handler resolved and cached");
        Some(handler)
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

impl fmt::Debug for HandlerCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerCache")
            .field("cached", &self.cache.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NoopHandler;

    #[async_trait]
    impl MessageHandlerPort for NoopHandler {
        async fn handle_message(&self, _incoming: IncomingMessage) -> Result<(), HandlerError> {
            Ok(())
        }

        async fn handle_error(
            &self,
            _error: SbbError,
            _context: &CallContext,
        ) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    struct CountingResolver {
        inner: StaticHandlerResolver,
        lookups: AtomicUsize,
    }

    impl HandlerResolver for CountingResolver {
        fn resolve(&self, key: &HandlerKey) -> Option<Arc<dyn MessageHandlerPort>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.resolve(key)
        }
    }

    #[test]
    fn test_cache_memoizes_hits() {
        let inner = StaticHandlerResolver::new();
        inner.register(Role::Receiver, "billing", "charge", Arc::new(NoopHandler));
        let resolver = Arc::new(CountingResolver {
            inner,
            lookups: AtomicUsize::new(0),
        });
        let cache = HandlerCache::new(resolver.clone());
        let key = HandlerKey::new(Role::Receiver, "billing", "charge");

        let first = cache.resolve(&key).unwrap();
        let second = cache.resolve(&key).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(resolver.lookups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cache_does_not_remember_misses() {
        let resolver = Arc::new(StaticHandlerResolver::new());
        let cache = HandlerCache::new(resolver.clone());
        let key = HandlerKey::new(Role::Receiver, "billing", "charge");

        assert!(cache.resolve(&key).is_none());

        resolver.register(Role::Receiver, "billing", "charge", Arc::new(NoopHandler));
        assert!(cache.resolve(&key).is_some());
        assert_eq!(cache.cached_len(), 1);
    }

    #[test]
    fn test_role_is_part_of_the_key() {
        let resolver = Arc::new(StaticHandlerResolver::new());
        resolver.register(Role::Sender, "billing", "charge", Arc::new(NoopHandler));
        let cache = HandlerCache::new(resolver);

        assert!(cache
            .resolve(&HandlerKey::new(Role::Receiver, "billing", "charge"))
            .is_none());
        assert!(cache
            .resolve(&HandlerKey::new(Role::Sender, "billing", "charge"))
            .is_some());
    }

    #[test]
    fn test_concurrent_first_resolution_converges() {
        let resolver = Arc::new(StaticHandlerResolver::new());
        resolver.register(Role::Receiver, "billing", "charge", Arc::new(NoopHandler));
        let cache = Arc::new(HandlerCache::new(resolver));
        let key = HandlerKey::new(Role::Receiver, "billing", "charge");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let key = key.clone();
                std::thread::spawn(move || cache.resolve(&key).unwrap())
            })
            .collect();
        let resolved: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let canonical = cache.resolve(&key).unwrap();
        assert!(resolved.iter().all(|h| Arc::ptr_eq(h, &canonical)));
    }
}
