//! Inbound frame fan-out.
//!
//! The registry is a pure dispatcher: decode a frame, call every registered
//! handler in registration order, synchronously. It keeps no message state;
//! deduplication belongs to the feed store.

use ember_common::{parse_frame, ChatMessage};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::debug;

type Handler = Arc<dyn Fn(&ChatMessage) + Send + Sync>;

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    /// Kept in registration order.
    handlers: Vec<(u64, Handler)>,
}

#[derive(Clone, Default)]
pub struct HandlerRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler invoked once per distinct inbound frame. Dropping
    /// the returned guard removes exactly this handler.
    pub fn register<F>(&self, handler: F) -> HandlerGuard
    where
        F: Fn(&ChatMessage) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.handlers.push((id, Arc::new(handler)));
        HandlerGuard {
            registry: Arc::downgrade(&self.inner),
            id,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode one text frame and fan it out. Returns false when the frame is
    /// malformed; the frame is dropped and the connection is untouched.
    pub fn dispatch_text(&self, text: &str) -> bool {
        let Some(message) = parse_frame(text) else {
            debug!("[Dispatch] dropping malformed frame ({} bytes)", text.len());
            return false;
        };
        // Snapshot under the lock, invoke outside it, so a handler may
        // register or unsubscribe without deadlocking.
        let handlers: Vec<Handler> = self
            .inner
            .lock()
            .handlers
            .iter()
            .map(|(_, h)| h.clone())
            .collect();
        for handler in handlers {
            handler(&message);
        }
        true
    }
}

/// Removes its handler when dropped. Hold it for as long as the consuming
/// view is mounted; a leaked handler double-delivers on the next mount.
pub struct HandlerGuard {
    registry: Weak<Mutex<RegistryInner>>,
    id: u64,
}

impl HandlerGuard {
    /// Explicit form of dropping the guard.
    pub fn unsubscribe(self) {}
}

impl Drop for HandlerGuard {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.lock().handlers.retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    fn frame(id: &str) -> String {
        format!(
            r#"{{"id":"{id}","author_name":"steve","timestamp":"2025-11-02T10:00:00Z"}}"#
        )
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let registry = HandlerRegistry::new();
        let seen = Arc::new(StdMutex::new(Vec::new()));

        let s1 = seen.clone();
        let _g1 = registry.register(move |_| s1.lock().unwrap().push("first"));
        let s2 = seen.clone();
        let _g2 = registry.register(move |_| s2.lock().unwrap().push("second"));

        assert!(registry.dispatch_text(&frame("a")));
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn dropping_guard_removes_only_that_handler() {
        let registry = HandlerRegistry::new();
        let seen = Arc::new(StdMutex::new(Vec::new()));

        let s1 = seen.clone();
        let g1 = registry.register(move |m| s1.lock().unwrap().push(format!("a:{}", m.id)));
        let s2 = seen.clone();
        let _g2 = registry.register(move |m| s2.lock().unwrap().push(format!("b:{}", m.id)));

        registry.dispatch_text(&frame("1"));
        drop(g1);
        registry.dispatch_text(&frame("2"));

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["a:1".to_string(), "b:1".to_string(), "b:2".to_string()]
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn malformed_frame_is_dropped_without_dispatch() {
        let registry = HandlerRegistry::new();
        let seen = Arc::new(StdMutex::new(0u32));
        let s = seen.clone();
        let _g = registry.register(move |_| *s.lock().unwrap() += 1);

        assert!(!registry.dispatch_text("{ not json"));
        assert!(!registry.dispatch_text(r#"{"id":"x"}"#)); // missing fields
        assert_eq!(*seen.lock().unwrap(), 0);

        assert!(registry.dispatch_text(&frame("ok")));
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[test]
    fn handler_may_unsubscribe_during_dispatch() {
        let registry = HandlerRegistry::new();
        let slot: Arc<StdMutex<Option<HandlerGuard>>> = Arc::new(StdMutex::new(None));

        let slot2 = slot.clone();
        let guard = registry.register(move |_| {
            // Drop our own guard mid-dispatch; must not deadlock.
            slot2.lock().unwrap().take();
        });
        *slot.lock().unwrap() = Some(guard);

        registry.dispatch_text(&frame("a"));
        assert_eq!(registry.len(), 0);
    }
}
