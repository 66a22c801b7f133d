//! Synchronous publish/subscribe.
//!
//! A [`Publisher`] fans one event out to every live subscriber, in subscription order,
//! on the calling thread. Subscribing hands back a [`Subscription`]; dropping it
//! unsubscribes. A subscription can be muted for a scope with
//! [`Subscription::suppress`], which is how a controller keeps its own side effects
//! (zooming the canvas, rebuilding its group) from re-entering its handlers.
//!
//! # Examples
//!
//! ```ignore
//! let bus: Publisher<u32> = Publisher::new();
//! let sub = bus.subscribe(|v| println!("got {v}"));
//! bus.emit(&1);            // prints
//! {
//!     let _quiet = sub.suppress();
//!     bus.emit(&2);        // skipped
//! }
//! drop(sub);
//! bus.emit(&3);            // nobody listening
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

type Handler<E> = Rc<dyn Fn(&E)>;

#[derive(Default)]
struct SlotState {
    muted: Cell<u32>,
    active: Cell<bool>,
}

impl SlotState {
    fn should_fire(&self) -> bool {
        self.active.get() && self.muted.get() == 0
    }
}

struct Slot<E> {
    id: u64,
    state: Rc<SlotState>,
    handler: Handler<E>,
}

struct Inner<E> {
    next_id: Cell<u64>,
    slots: RefCell<Vec<Slot<E>>>,
}

/// Cloneable handle to a shared list of subscribers.
pub struct Publisher<E> {
    inner: Rc<Inner<E>>,
}

impl<E> Clone for Publisher<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E: 'static> Default for Publisher<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Publisher<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("subscribers", &self.inner.slots.borrow().len())
            .finish()
    }
}

impl<E: 'static> Publisher<E> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(Inner {
                next_id: Cell::new(0),
                slots: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Register a handler. It stays registered until the returned value is dropped.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&E) + 'static,
    {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);

        let state = Rc::new(SlotState::default());
        state.active.set(true);
        self.inner.slots.borrow_mut().push(Slot {
            id,
            state: Rc::clone(&state),
            handler: Rc::new(handler),
        });

        let weak: Weak<Inner<E>> = Rc::downgrade(&self.inner);
        Subscription {
            state,
            detach: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.slots.borrow_mut().retain(|slot| slot.id != id);
                }
            })),
        }
    }

    /// Deliver `event` to every subscriber that is active and not suppressed.
    ///
    /// The subscriber list is snapshotted first, so handlers may subscribe, unsubscribe
    /// or emit again. Each handler's mute state is checked right before it runs.
    pub fn emit(&self, event: &E) {
        let snapshot: Vec<(Rc<SlotState>, Handler<E>)> = self
            .inner
            .slots
            .borrow()
            .iter()
            .map(|slot| (Rc::clone(&slot.state), Rc::clone(&slot.handler)))
            .collect();

        for (state, handler) in snapshot {
            if state.should_fire() {
                handler(event);
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.slots.borrow().len()
    }
}

/// Live registration of a handler on a [`Publisher`].
pub struct Subscription {
    state: Rc<SlotState>,
    detach: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Mute this handler until the returned guard is dropped. Guards nest.
    pub fn suppress(&self) -> Suppressed {
        self.state.muted.set(self.state.muted.get() + 1);
        Suppressed {
            state: Rc::clone(&self.state),
        }
    }

    pub fn is_suppressed(&self) -> bool {
        self.state.muted.get() > 0
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.state.active.set(false);
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("suppressed", &self.is_suppressed())
            .finish()
    }
}

/// Scope guard returned by [`Subscription::suppress`]. Unmutes on drop, including
/// when unwinding out of an early return.
#[must_use = "the handler is unmuted as soon as the guard is dropped"]
pub struct Suppressed {
    state: Rc<SlotState>,
}

impl Drop for Suppressed {
    fn drop(&mut self) {
        self.state.muted.set(self.state.muted.get().saturating_sub(1));
    }
}
