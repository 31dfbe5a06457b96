//! Cloneable callback wrapper.
//!
//! `Callback` wraps a function in an `Rc`, making it cheap to clone while
//! keeping a stable identity that `use_callback` preserves across renders.
//!
//! ## Example
//!
//! ```ignore
//! let on_toggle = hooks.use_callback(
//!     {
//!         let set_open = set_open.clone();
//!         move |open: bool| set_open.set(open)
//!     },
//!     Some(()),
//! )?;
//! on_toggle.call(true);
//! ```

use std::fmt;
use std::rc::Rc;

/// A cloneable `Fn(Args) -> Ret` with identity comparison.
pub struct Callback<Args = (), Ret = ()> {
	inner: Rc<dyn Fn(Args) -> Ret + 'static>,
}

impl<Args, Ret> Callback<Args, Ret> {
	/// Wraps `f`.
	pub fn new<F>(f: F) -> Self
	where
		F: Fn(Args) -> Ret + 'static,
	{
		Self { inner: Rc::new(f) }
	}

	/// Invokes the callback.
	pub fn call(&self, args: Args) -> Ret {
		(self.inner)(args)
	}

	/// Returns whether both callbacks share the same function allocation.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}
}

impl<Args, Ret> Clone for Callback<Args, Ret> {
	fn clone(&self) -> Self {
		Self {
			inner: Rc::clone(&self.inner),
		}
	}
}

impl<Args, Ret> PartialEq for Callback<Args, Ret> {
	fn eq(&self, other: &Self) -> bool {
		self.ptr_eq(other)
	}
}

impl<Args, Ret> fmt::Debug for Callback<Args, Ret> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Callback")
			.field("ptr", &Rc::as_ptr(&self.inner).cast::<()>())
			.finish()
	}
}
