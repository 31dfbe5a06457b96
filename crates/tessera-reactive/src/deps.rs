//! Dependency comparison for effects and memoised values.
//!
//! Dependencies are any `PartialEq + 'static` value, usually a tuple. They are
//! stored type-erased in the slot and compared against the next render's
//! value. A missing list, either side, always counts as changed.

use std::any::Any;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

/// Returns whether `next` differs from the stored `prev` dependencies.
pub(crate) fn deps_changed<D>(prev: Option<&dyn Any>, next: Option<&D>) -> bool
where
	D: PartialEq + 'static,
{
	match (prev, next) {
		(Some(prev), Some(next)) => match prev.downcast_ref::<D>() {
			Some(prev) => prev != next,
			None => true,
		},
		_ => true,
	}
}

/// Wraps a shared value so that equality means "same allocation".
///
/// Use it for state or dependencies whose identity matters more than their
/// contents, such as callbacks or large collections replaced wholesale.
pub struct ByRef<T: ?Sized>(pub Rc<T>);

impl<T> ByRef<T> {
	/// Allocates `value` behind a fresh identity.
	pub fn new(value: T) -> Self {
		Self(Rc::new(value))
	}
}

impl<T: ?Sized> Clone for ByRef<T> {
	fn clone(&self) -> Self {
		Self(Rc::clone(&self.0))
	}
}

impl<T: ?Sized> PartialEq for ByRef<T> {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

impl<T: ?Sized> Eq for ByRef<T> {}

impl<T: ?Sized> Deref for ByRef<T> {
	type Target = T;

	fn deref(&self) -> &T {
		&self.0
	}
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for ByRef<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("ByRef").field(&&*self.0).finish()
	}
}
