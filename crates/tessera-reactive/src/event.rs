//! Typed multicast.
//!
//! [`EventHub`] is a single-threaded listener list. Emission iterates a
//! snapshot, so listeners may subscribe or unsubscribe from inside a
//! callback, and a panicking listener does not stop the others.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::error::run_guarded;

/// Identifies a listener registered on an [`EventHub`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<E> = Rc<dyn Fn(&E)>;

/// Ordered set of listeners for events of type `E`.
pub struct EventHub<E> {
	listeners: RefCell<Vec<(ListenerId, Listener<E>)>>,
	next_id: Cell<u64>,
}

impl<E> Default for EventHub<E> {
	fn default() -> Self {
		Self {
			listeners: RefCell::new(Vec::new()),
			next_id: Cell::new(0),
		}
	}
}

impl<E> fmt::Debug for EventHub<E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EventHub")
			.field("listeners", &self.len())
			.finish()
	}
}

impl<E> EventHub<E> {
	/// Creates a hub with no listeners.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `listener` and returns its id.
	pub fn subscribe<F>(&self, listener: F) -> ListenerId
	where
		F: Fn(&E) + 'static,
	{
		let id = ListenerId(self.next_id.get());
		self.next_id.set(id.0 + 1);
		self.listeners.borrow_mut().push((id, Rc::new(listener)));
		id
	}

	/// Removes the listener. Returns `false` if it was not registered.
	pub fn unsubscribe(&self, id: ListenerId) -> bool {
		let mut listeners = self.listeners.borrow_mut();
		let before = listeners.len();
		listeners.retain(|(listener_id, _)| *listener_id != id);
		listeners.len() < before
	}

	/// Calls every listener registered at the time of the call, in
	/// registration order. Returns how many completed without panicking.
	pub fn emit(&self, event: &E) -> usize {
		let snapshot: Vec<Listener<E>> = self
			.listeners
			.borrow()
			.iter()
			.map(|(_, listener)| Rc::clone(listener))
			.collect();
		snapshot
			.into_iter()
			.filter_map(|listener| run_guarded("event listener", || listener(event)))
			.count()
	}

	/// Returns the number of listeners.
	pub fn len(&self) -> usize {
		self.listeners.borrow().len()
	}

	/// Returns whether no listener is registered.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_emit_reaches_each_listener_once() {
		// Arrange
		let hub = EventHub::<u32>::new();
		let seen = Rc::new(RefCell::new(Vec::new()));
		for tag in ["a", "b"] {
			let seen = Rc::clone(&seen);
			hub.subscribe(move |value: &u32| seen.borrow_mut().push((tag, *value)));
		}

		// Act
		let delivered = hub.emit(&7);

		// Assert
		assert_eq!(delivered, 2);
		assert_eq!(*seen.borrow(), vec![("a", 7), ("b", 7)]);
	}

	#[rstest]
	fn test_unsubscribe_removes_listener() {
		let hub = EventHub::<()>::new();
		let id = hub.subscribe(|_| {});
		assert!(hub.unsubscribe(id));
		assert!(!hub.unsubscribe(id));
		assert!(hub.is_empty());
	}

	#[rstest]
	fn test_panicking_listener_does_not_stop_others() {
		// Arrange
		let hub = EventHub::<()>::new();
		let reached = Rc::new(Cell::new(false));
		hub.subscribe(|_| panic!("listener failed"));
		{
			let reached = Rc::clone(&reached);
			hub.subscribe(move |_| reached.set(true));
		}

		// Act
		let delivered = hub.emit(&());

		// Assert
		assert_eq!(delivered, 1);
		assert!(reached.get());
	}

	#[rstest]
	fn test_listener_may_unsubscribe_itself_during_emit() {
		// Arrange
		let hub = Rc::new(EventHub::<()>::new());
		let slot: Rc<Cell<Option<ListenerId>>> = Rc::new(Cell::new(None));
		let id = {
			let inner = Rc::clone(&hub);
			let slot = Rc::clone(&slot);
			hub.subscribe(move |_| {
				if let Some(id) = slot.get() {
					inner.unsubscribe(id);
				}
			})
		};
		slot.set(Some(id));

		// Act
		hub.emit(&());

		// Assert
		assert!(hub.is_empty());
	}
}
