//! Typed publish/subscribe with disposable subscriptions.
//!
//! Every `subscribe` call returns a [`Subscription`]. Dropping or disposing it
//! removes the listener. Owners that hold many subscriptions collect them in a
//! [`CompositeSubscription`] and release them together on teardown.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

type Listener<E> = Rc<dyn Fn(&E)>;

struct ListenerEntry<E> {
    id: u64,
    once: bool,
    callback: Listener<E>,
}

struct Listeners<E> {
    next_id: Cell<u64>,
    entries: RefCell<Vec<ListenerEntry<E>>>,
}

impl<E> Listeners<E> {
    fn remove(&self, id: u64) -> bool {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        entries.len() != before
    }

    fn contains(&self, id: u64) -> bool {
        self.entries.borrow().iter().any(|entry| entry.id == id)
    }
}

/// Event source for one event type.
pub struct Emitter<E> {
    listeners: Rc<Listeners<E>>,
}

impl<E: 'static> Default for Emitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Emitter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("listeners", &self.listeners.entries.borrow().len())
            .finish()
    }
}

impl<E: 'static> Emitter<E> {
    pub fn new() -> Self {
        Self {
            listeners: Rc::new(Listeners {
                next_id: Cell::new(1),
                entries: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Registers a listener invoked on every emission.
    pub fn subscribe(&self, callback: impl Fn(&E) + 'static) -> Subscription {
        self.register(Rc::new(callback), false)
    }

    /// Registers a listener invoked on the next emission only.
    pub fn subscribe_once(&self, callback: impl Fn(&E) + 'static) -> Subscription {
        self.register(Rc::new(callback), true)
    }

    fn register(&self, callback: Listener<E>, once: bool) -> Subscription {
        let id = self.listeners.next_id.get();
        self.listeners.next_id.set(id + 1);
        self.listeners
            .entries
            .borrow_mut()
            .push(ListenerEntry { id, once, callback });

        let weak: Weak<Listeners<E>> = Rc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = weak.upgrade() {
                listeners.remove(id);
            }
        })
    }

    /// Delivers `event` to the current listeners in registration order.
    ///
    /// Listeners may subscribe or dispose during delivery. A listener disposed
    /// by an earlier one in the same round is skipped.
    pub fn emit(&self, event: &E) {
        let snapshot: Vec<(u64, bool, Listener<E>)> = self
            .listeners
            .entries
            .borrow()
            .iter()
            .map(|entry| (entry.id, entry.once, Rc::clone(&entry.callback)))
            .collect();

        for (id, once, callback) in snapshot {
            if once {
                if !self.listeners.remove(id) {
                    continue;
                }
            } else if !self.listeners.contains(id) {
                continue;
            }
            callback(event);
        }
    }

    /// Drops every listener.
    pub fn clear(&self) {
        // Take the entries out first so listener destructors run unborrowed.
        let entries = std::mem::take(&mut *self.listeners.entries.borrow_mut());
        drop(entries);
    }

    /// Returns the number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.entries.borrow().len()
    }
}

/// Disposer token for one registration.
#[must_use = "dropping a Subscription disposes it immediately"]
pub struct Subscription {
    dispose: Option<Box<dyn FnOnce()>>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl Subscription {
    /// Wraps a disposal action.
    pub fn new(dispose: impl FnOnce() + 'static) -> Self {
        Self {
            dispose: Some(Box::new(dispose)),
        }
    }

    /// A subscription with nothing to release.
    pub fn empty() -> Self {
        Self { dispose: None }
    }

    /// Runs the disposal action. Later calls do nothing.
    pub fn dispose(&mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.dispose.is_none()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// A group of subscriptions released together.
#[derive(Debug, Default)]
pub struct CompositeSubscription {
    subscriptions: RefCell<Vec<Subscription>>,
    disposed: Cell<bool>,
}

impl CompositeSubscription {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a subscription. Adding to a disposed group disposes it at once.
    pub fn add(&self, subscription: Subscription) {
        if self.disposed.get() {
            drop(subscription);
            return;
        }
        self.subscriptions.borrow_mut().push(subscription);
    }

    /// Disposes every subscription in the group and refuses new ones.
    pub fn dispose(&self) {
        self.disposed.set(true);
        self.release();
    }

    /// Disposes the current members but keeps accepting new ones.
    pub fn clear(&self) {
        self.release();
    }

    fn release(&self) {
        // Disposers may touch other emitters; run them outside the borrow.
        let subscriptions = std::mem::take(&mut *self.subscriptions.borrow_mut());
        drop(subscriptions);
    }

    pub fn len(&self) -> usize {
        self.subscriptions.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }
}

impl Drop for CompositeSubscription {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_reaches_listeners_in_order() {
        let emitter: Emitter<u32> = Emitter::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let s1 = {
            let seen = seen.clone();
            emitter.subscribe(move |v| seen.borrow_mut().push(("a", *v)))
        };
        let s2 = {
            let seen = seen.clone();
            emitter.subscribe(move |v| seen.borrow_mut().push(("b", *v)))
        };

        emitter.emit(&7);
        assert_eq!(*seen.borrow(), vec![("a", 7), ("b", 7)]);
        drop((s1, s2));
    }

    #[test]
    fn test_dropping_subscription_unsubscribes() {
        let emitter: Emitter<()> = Emitter::new();
        let count = Rc::new(Cell::new(0));

        let sub = {
            let count = count.clone();
            emitter.subscribe(move |_| count.set(count.get() + 1))
        };
        emitter.emit(&());
        drop(sub);
        emitter.emit(&());

        assert_eq!(count.get(), 1);
        assert_eq!(emitter.listener_count(), 0);
    }

    #[test]
    fn test_subscribe_once() {
        let emitter: Emitter<()> = Emitter::new();
        let count = Rc::new(Cell::new(0));
        let _sub = {
            let count = count.clone();
            emitter.subscribe_once(move |_| count.set(count.get() + 1))
        };

        emitter.emit(&());
        emitter.emit(&());
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_listener_can_subscribe_during_emit() {
        let emitter: Rc<Emitter<()>> = Rc::new(Emitter::new());
        let late = Rc::new(RefCell::new(Vec::new()));

        let _sub = {
            let emitter2 = emitter.clone();
            let late = late.clone();
            emitter.subscribe(move |_| {
                late.borrow_mut().push(emitter2.subscribe(|_| {}));
            })
        };

        emitter.emit(&());
        assert_eq!(emitter.listener_count(), 2);
    }

    #[test]
    fn test_composite_dispose() {
        let emitter: Emitter<()> = Emitter::new();
        let group = CompositeSubscription::new();
        group.add(emitter.subscribe(|_| {}));
        group.add(emitter.subscribe(|_| {}));
        assert_eq!(emitter.listener_count(), 2);

        group.dispose();
        assert_eq!(emitter.listener_count(), 0);
        assert!(group.is_disposed());

        group.add(emitter.subscribe(|_| {}));
        assert_eq!(emitter.listener_count(), 0);
    }

    #[test]
    fn test_composite_clear_keeps_accepting() {
        let emitter: Emitter<()> = Emitter::new();
        let group = CompositeSubscription::new();
        group.add(emitter.subscribe(|_| {}));
        group.clear();
        group.add(emitter.subscribe(|_| {}));
        assert_eq!(emitter.listener_count(), 1);
        assert!(!group.is_disposed());
    }
}
