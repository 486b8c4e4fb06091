//! Synchronous publish/subscribe registry.
//!
//! [`EventEmitter`] maps an event key to the ordered list of handlers
//! registered for it. Dispatch works on a snapshot of that list (see
//! [`EventEmitter::handlers`]), so a handler can register or remove handlers,
//! itself included, while it is being called.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::rc::{Rc, Weak};

/// Identifies one registration in an [`EventEmitter`].
pub type HandlerId = u64;

struct Handlers<K, H: ?Sized> {
    next_id: HandlerId,
    handlers: HashMap<K, Vec<(HandlerId, Rc<H>)>>,
}

impl<K: Eq + Hash, H: ?Sized> Handlers<K, H> {
    fn remove(&mut self, event: &K, id: HandlerId) -> bool {
        let Some(handlers) = self.handlers.get_mut(event) else {
            return false;
        };

        let len = handlers.len();
        handlers.retain(|(handler_id, _)| *handler_id != id);
        let removed = handlers.len() != len;

        if handlers.is_empty() {
            self.handlers.remove(event);
        }
        removed
    }
}

/// Registry of handlers of type `H` keyed by event `K`.
///
/// Handlers are called in registration order. The emitter is single threaded;
/// clones share the same registry.
pub struct EventEmitter<K, H: ?Sized> {
    registry: Rc<RefCell<Handlers<K, H>>>,
}

impl<K: Eq + Hash + Clone, H: ?Sized> EventEmitter<K, H> {
    pub fn new() -> Self {
        Self {
            registry: Rc::new(RefCell::new(Handlers {
                next_id: 0,
                handlers: HashMap::new(),
            })),
        }
    }

    /// Registers `handler` for `event`.
    ///
    /// The returned [`Subscription`] removes the handler when
    /// [`unsubscribe`](Subscription::unsubscribe) is called. Dropping it keeps
    /// the handler registered.
    pub fn on(&self, event: K, handler: Rc<H>) -> Subscription<K, H> {
        let mut registry = self.registry.borrow_mut();
        registry.next_id += 1;
        let id = registry.next_id;
        registry
            .handlers
            .entry(event.clone())
            .or_default()
            .push((id, handler));

        Subscription {
            event,
            id,
            registry: Rc::downgrade(&self.registry),
        }
    }

    /// Removes the handler registered as `id` for `event`.
    ///
    /// Returns false if no such handler is registered.
    pub fn off(&self, event: &K, id: HandlerId) -> bool {
        self.registry.borrow_mut().remove(event, id)
    }

    /// Returns a snapshot of the handlers registered for `event`, in
    /// registration order.
    ///
    /// The registry is not borrowed while the snapshot is in use, so calling
    /// the handlers may change the registrations. Changes only take effect for
    /// the next snapshot.
    pub fn handlers(&self, event: &K) -> Vec<Rc<H>> {
        self.registry
            .borrow()
            .handlers
            .get(event)
            .map(|handlers| handlers.iter().map(|(_, h)| Rc::clone(h)).collect())
            .unwrap_or_default()
    }

    pub fn listener_count(&self, event: &K) -> usize {
        self.registry
            .borrow()
            .handlers
            .get(event)
            .map_or(0, Vec::len)
    }

    /// Removes every handler of every event.
    pub fn clear(&self) {
        self.registry.borrow_mut().handlers.clear();
    }
}

impl<K: Eq + Hash + Clone, H: ?Sized> Default for EventEmitter<K, H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, H: ?Sized> Clone for EventEmitter<K, H> {
    fn clone(&self) -> Self {
        Self {
            registry: Rc::clone(&self.registry),
        }
    }
}

impl<K: fmt::Debug, H: ?Sized> fmt::Debug for EventEmitter<K, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.borrow();
        let mut map = f.debug_map();
        for (event, handlers) in &registry.handlers {
            map.entry(event, &handlers.len());
        }
        map.finish()
    }
}

/// Handle of a handler registered with [`EventEmitter::on`].
pub struct Subscription<K, H: ?Sized> {
    event: K,
    id: HandlerId,
    registry: Weak<RefCell<Handlers<K, H>>>,
}

impl<K: Eq + Hash, H: ?Sized> Subscription<K, H> {
    pub fn id(&self) -> HandlerId {
        self.id
    }

    pub fn event(&self) -> &K {
        &self.event
    }

    /// Removes the handler from its emitter.
    ///
    /// Returns false if it was already removed or the emitter is gone.
    pub fn unsubscribe(self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.borrow_mut().remove(&self.event, self.id),
            None => false,
        }
    }
}

impl<K: fmt::Debug, H: ?Sized> fmt::Debug for Subscription<K, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("event", &self.event)
            .field("id", &self.id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    type Handler = dyn Fn(u32);

    fn dispatch(emitter: &EventEmitter<&'static str, Handler>, event: &'static str, value: u32) {
        for handler in emitter.handlers(&event) {
            handler(value);
        }
    }

    #[test]
    fn test_handlers_are_called_in_order() {
        let emitter: EventEmitter<&'static str, Handler> = EventEmitter::new();
        let calls = Rc::new(RefCell::new(vec![]));

        for name in ["first", "second"] {
            let calls = Rc::clone(&calls);
            emitter.on("audio", Rc::new(move |v: u32| calls.borrow_mut().push((name, v))));
        }
        let other = Rc::clone(&calls);
        emitter.on("video", Rc::new(move |v: u32| other.borrow_mut().push(("video", v))));

        dispatch(&emitter, "audio", 1);
        assert_eq!(*calls.borrow(), vec![("first", 1), ("second", 1)]);
        assert_eq!(emitter.listener_count(&"audio"), 2);
        assert_eq!(emitter.listener_count(&"video"), 1);
        assert_eq!(emitter.listener_count(&"data"), 0);
    }

    #[test]
    fn test_unsubscribe() {
        let emitter: EventEmitter<&'static str, Handler> = EventEmitter::new();
        let count = Rc::new(Cell::new(0));

        let counter = Rc::clone(&count);
        let subscription = emitter.on("audio", Rc::new(move |_| counter.set(counter.get() + 1)));
        let id = subscription.id();

        dispatch(&emitter, "audio", 0);
        assert!(subscription.unsubscribe());
        dispatch(&emitter, "audio", 0);

        assert_eq!(count.get(), 1);
        assert_eq!(emitter.listener_count(&"audio"), 0);
        assert!(!emitter.off(&"audio", id));
    }

    #[test]
    fn test_unsubscribe_during_dispatch() {
        let emitter: EventEmitter<&'static str, Handler> = EventEmitter::new();
        let calls = Rc::new(RefCell::new(vec![]));
        let own_subscription: Rc<RefCell<Option<Subscription<&'static str, Handler>>>> =
            Rc::new(RefCell::new(None));

        let first_calls = Rc::clone(&calls);
        let first_subscription = Rc::clone(&own_subscription);
        let subscription = emitter.on(
            "audio",
            Rc::new(move |v: u32| {
                first_calls.borrow_mut().push(("once", v));
                if let Some(subscription) = first_subscription.borrow_mut().take() {
                    subscription.unsubscribe();
                }
            }),
        );
        *own_subscription.borrow_mut() = Some(subscription);

        let second_calls = Rc::clone(&calls);
        emitter.on(
            "audio",
            Rc::new(move |v: u32| second_calls.borrow_mut().push(("always", v))),
        );

        dispatch(&emitter, "audio", 1);
        dispatch(&emitter, "audio", 2);

        assert_eq!(
            *calls.borrow(),
            vec![("once", 1), ("always", 1), ("always", 2)]
        );
    }

    #[test]
    fn test_subscription_outlives_emitter() {
        let emitter: EventEmitter<&'static str, Handler> = EventEmitter::new();
        let subscription = emitter.on("audio", Rc::new(|_| {}));

        emitter.clear();
        assert_eq!(emitter.listener_count(&"audio"), 0);

        drop(emitter);
        assert!(!subscription.unsubscribe());
    }
}
