//! Ref hook: use_ref

use std::cell::{self, RefCell};
use std::fmt;
use std::rc::Rc;

use super::Hooks;
use crate::error::HookError;
use crate::instance::{Slot, SlotKind};

impl Hooks {
	/// Creates a mutable cell that persists across renders.
	///
	/// This is the React-like equivalent of `useRef`. Every render returns a
	/// handle to the same cell, and writing to it never schedules a render.
	///
	/// # Example
	///
	/// ```ignore
	/// let renders = hooks.use_ref(0_u32)?;
	/// *renders.borrow_mut() += 1;
	/// ```
	pub fn use_ref<T>(&self, initial: T) -> Result<Ref<T>, HookError>
	where
		T: 'static,
	{
		let cursor = self.slot(SlotKind::Ref)?;
		if !cursor.initialized {
			cursor.init(Slot::Ref(Rc::new(RefCell::new(initial))));
		}

		let cell = match cursor.instance.slots().borrow().get(cursor.index) {
			Some(Slot::Ref(cell)) => Rc::clone(cell).downcast::<RefCell<T>>().ok(),
			_ => None,
		};
		let inner = cell.ok_or_else(|| cursor.type_mismatch::<T>())?;
		Ok(Ref { inner })
	}
}

/// Handle returned by [`Hooks::use_ref`].
pub struct Ref<T> {
	inner: Rc<RefCell<T>>,
}

impl<T> Ref<T> {
	/// Borrows the current value.
	pub fn borrow(&self) -> cell::Ref<'_, T> {
		self.inner.borrow()
	}

	/// Mutably borrows the current value.
	pub fn borrow_mut(&self) -> cell::RefMut<'_, T> {
		self.inner.borrow_mut()
	}

	/// Replaces the value, returning the old one.
	pub fn replace(&self, value: T) -> T {
		self.inner.replace(value)
	}

	/// Returns whether both handles address the same cell.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}
}

impl<T: Clone> Ref<T> {
	/// Returns a clone of the current value.
	pub fn get(&self) -> T {
		self.inner.borrow().clone()
	}
}

impl<T> Clone for Ref<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Rc::clone(&self.inner),
		}
	}
}

impl<T: fmt::Debug> fmt::Debug for Ref<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Ref").field(&self.inner.borrow()).finish()
	}
}
