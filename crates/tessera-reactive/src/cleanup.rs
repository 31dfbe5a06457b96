//! Effect teardown handles.
//!
//! A [`CleanupHandle`] wraps the teardown closure returned by an effect body.
//! The same handle can be held by the effect slot and by the external render
//! layer's per-node cleanup map; whichever side runs it first wins and the
//! other call becomes a no-op.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::run_guarded;
use crate::instance::NodeHandle;

type CleanupFn = Box<dyn FnOnce() + 'static>;

/// A run-at-most-once teardown callback.
#[derive(Clone)]
pub struct CleanupHandle {
	inner: Rc<RefCell<Option<CleanupFn>>>,
}

impl CleanupHandle {
	/// Wraps a teardown closure.
	pub fn new<F>(cleanup: F) -> Self
	where
		F: FnOnce() + 'static,
	{
		Self {
			inner: Rc::new(RefCell::new(Some(Box::new(cleanup)))),
		}
	}

	/// Runs the teardown if it has not run yet.
	///
	/// A panic inside the teardown is logged and swallowed. Returns `true` if
	/// this call consumed the closure.
	pub fn run(&self) -> bool {
		let cleanup = self.inner.borrow_mut().take();
		match cleanup {
			Some(cleanup) => {
				run_guarded("effect cleanup", cleanup);
				true
			}
			None => false,
		}
	}

	/// Returns whether the teardown is still waiting to run.
	pub fn is_pending(&self) -> bool {
		self.inner.borrow().is_some()
	}

	/// Returns whether both handles share the same closure.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}
}

impl fmt::Debug for CleanupHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CleanupHandle")
			.field("pending", &self.is_pending())
			.finish()
	}
}

/// The external render layer's cleanup map, keyed by DOM node.
///
/// Effects owned by an instance with an owning node register their teardown
/// here so that removing the node also tears the effect down.
pub trait CleanupRegistry {
	/// Associates `cleanup` with `node`.
	fn register(&self, node: NodeHandle, cleanup: CleanupHandle);
}
