//! Navigation history capability.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tessera_reactive::{EventHub, ListenerId};

/// Browser-history collaborator.
///
/// `push` and `replace` are issued by the router itself and do not notify
/// listeners. Location changes made outside the router (back/forward, a
/// typed hash) do.
pub trait History {
	/// Returns the current location (path plus query string).
	fn location(&self) -> String;

	/// Appends a new entry.
	fn push(&self, path: &str);

	/// Overwrites the current entry.
	fn replace(&self, path: &str);

	/// Registers a listener for external location changes.
	fn listen(&self, listener: Box<dyn Fn(&str)>) -> ListenerId;

	/// Removes a listener.
	fn unlisten(&self, id: ListenerId) -> bool;
}

struct MemoryHistoryInner {
	entries: RefCell<Vec<String>>,
	index: Cell<usize>,
	listeners: EventHub<String>,
}

/// In-process [`History`] for native hosts and tests.
#[derive(Clone)]
pub struct MemoryHistory {
	inner: Rc<MemoryHistoryInner>,
}

impl fmt::Debug for MemoryHistory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MemoryHistory")
			.field("entries", &self.inner.entries.borrow())
			.field("index", &self.inner.index.get())
			.finish()
	}
}

impl Default for MemoryHistory {
	fn default() -> Self {
		Self::new("/")
	}
}

impl MemoryHistory {
	/// Creates a history positioned at `initial`.
	pub fn new(initial: impl Into<String>) -> Self {
		Self {
			inner: Rc::new(MemoryHistoryInner {
				entries: RefCell::new(vec![initial.into()]),
				index: Cell::new(0),
				listeners: EventHub::new(),
			}),
		}
	}

	/// Returns every entry, oldest first.
	pub fn entries(&self) -> Vec<String> {
		self.inner.entries.borrow().clone()
	}

	/// Steps back one entry and notifies listeners.
	///
	/// Returns `false` at the first entry.
	pub fn back(&self) -> bool {
		let index = self.inner.index.get();
		if index == 0 {
			return false;
		}
		self.go_to(index - 1);
		true
	}

	/// Steps forward one entry and notifies listeners.
	///
	/// Returns `false` at the last entry.
	pub fn forward(&self) -> bool {
		let index = self.inner.index.get();
		if index + 1 >= self.inner.entries.borrow().len() {
			return false;
		}
		self.go_to(index + 1);
		true
	}

	/// Simulates the user changing the location directly.
	pub fn set_location(&self, path: impl Into<String>) {
		self.push(&path.into());
		self.notify();
	}

	fn go_to(&self, index: usize) {
		self.inner.index.set(index);
		self.notify();
	}

	fn notify(&self) {
		let location = self.location();
		tracing::debug!(location = %location, "history location changed");
		self.inner.listeners.emit(&location);
	}
}

impl History for MemoryHistory {
	fn location(&self) -> String {
		let entries = self.inner.entries.borrow();
		entries.get(self.inner.index.get()).cloned().unwrap_or_else(|| "/".to_string())
	}

	fn push(&self, path: &str) {
		let mut entries = self.inner.entries.borrow_mut();
		let index = self.inner.index.get();
		entries.truncate(index + 1);
		entries.push(path.to_string());
		self.inner.index.set(entries.len() - 1);
	}

	fn replace(&self, path: &str) {
		let mut entries = self.inner.entries.borrow_mut();
		let index = self.inner.index.get();
		match entries.get_mut(index) {
			Some(entry) => *entry = path.to_string(),
			None => entries.push(path.to_string()),
		}
	}

	fn listen(&self, listener: Box<dyn Fn(&str)>) -> ListenerId {
		self.inner.listeners.subscribe(move |location: &String| listener(location))
	}

	fn unlisten(&self, id: ListenerId) -> bool {
		self.inner.listeners.unsubscribe(id)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_push_truncates_forward_entries() {
		// Arrange
		let history = MemoryHistory::new("/");
		history.push("/a");
		history.push("/b");
		history.back();

		// Act
		history.push("/c");

		// Assert
		assert_eq!(history.entries(), ["/", "/a", "/c"]);
		assert_eq!(history.location(), "/c");
		assert!(!history.forward());
	}

	#[rstest]
	fn test_only_external_changes_notify() {
		// Arrange
		let history = MemoryHistory::new("/");
		let seen = Rc::new(RefCell::new(Vec::new()));
		history.listen(Box::new({
			let seen = Rc::clone(&seen);
			move |location| seen.borrow_mut().push(location.to_string())
		}));

		// Act
		history.push("/a");
		history.replace("/b");
		history.back();
		history.set_location("/typed");

		// Assert
		assert_eq!(*seen.borrow(), ["/", "/typed"]);
	}

	#[rstest]
	fn test_unlisten() {
		let history = MemoryHistory::default();
		let id = history.listen(Box::new(|_| {}));
		assert!(history.unlisten(id));
		assert!(!history.unlisten(id));
	}
}
