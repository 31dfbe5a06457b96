//! State hook: use_state

use std::fmt;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

use super::Hooks;
use crate::error::HookError;
use crate::instance::{Instance, Slot, SlotKind};
use crate::scheduler::RenderScheduler;

impl Hooks {
	/// Declares a piece of component state.
	///
	/// This is the React-like equivalent of `useState`. The initial value is
	/// used on the first render only; later renders return the stored value.
	///
	/// # Returns
	///
	/// A tuple of the current value and a [`SetState`] handle. Setting a value
	/// equal to the current one is a no-op; any other value replaces it and
	/// schedules a render.
	///
	/// # Errors
	///
	/// [`HookError::InvalidHookContext`] outside a component body,
	/// [`HookError::SlotKindMismatch`] if the hook order changed.
	///
	/// # Example
	///
	/// ```ignore
	/// let (count, set_count) = hooks.use_state(0)?;
	/// set_count.update(|n| n + 1);
	/// ```
	pub fn use_state<T>(&self, initial: T) -> Result<(T, SetState<T>), HookError>
	where
		T: Clone + PartialEq + 'static,
	{
		self.use_state_with(move || initial)
	}

	/// Like [`use_state`](Self::use_state), computing the initial value lazily.
	///
	/// `init` runs on the first render only.
	pub fn use_state_with<T, F>(&self, init: F) -> Result<(T, SetState<T>), HookError>
	where
		T: Clone + PartialEq + 'static,
		F: FnOnce() -> T,
	{
		let cursor = self.slot(SlotKind::State)?;
		if !cursor.initialized {
			cursor.init(Slot::State(Box::new(init())));
		}

		let value = match cursor.instance.slots().borrow().get(cursor.index) {
			Some(Slot::State(value)) => value.downcast_ref::<T>().cloned(),
			_ => None,
		}
		.ok_or_else(|| cursor.type_mismatch::<T>())?;

		let setter = SetState {
			instance: Rc::downgrade(&cursor.instance),
			index: cursor.index,
			scheduler: self.scheduler(),
			_marker: PhantomData,
		};
		Ok((value, setter))
	}
}

/// Setter returned by [`Hooks::use_state`].
///
/// The handle stays valid across renders. Once the owning instance is
/// unmounted or dropped, every call is ignored.
pub struct SetState<T> {
	instance: Weak<Instance>,
	index: usize,
	scheduler: Rc<dyn RenderScheduler>,
	_marker: PhantomData<fn(T)>,
}

impl<T> Clone for SetState<T> {
	fn clone(&self) -> Self {
		Self {
			instance: Weak::clone(&self.instance),
			index: self.index,
			scheduler: Rc::clone(&self.scheduler),
			_marker: PhantomData,
		}
	}
}

impl<T> fmt::Debug for SetState<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SetState")
			.field("index", &self.index)
			.field("alive", &(self.instance.strong_count() > 0))
			.finish()
	}
}

impl<T> SetState<T>
where
	T: Clone + PartialEq + 'static,
{
	/// Replaces the state with `value`.
	pub fn set(&self, value: T) {
		self.update(move |_| value);
	}

	/// Replaces the state with `f(previous)`.
	///
	/// `f` runs with no slot borrowed, so it may read other state freely.
	pub fn update<F>(&self, f: F)
	where
		F: FnOnce(&T) -> T,
	{
		let Some(instance) = self.instance.upgrade() else {
			tracing::trace!(index = self.index, "state update on dropped instance ignored");
			return;
		};
		if !instance.is_mounted() {
			tracing::debug!(instance = %instance.id(), index = self.index, "state update on unmounted instance ignored");
			return;
		}

		let previous = match instance.slots().borrow().get(self.index) {
			Some(Slot::State(value)) => value.downcast_ref::<T>().cloned(),
			_ => None,
		};
		let Some(previous) = previous else {
			tracing::warn!(instance = %instance.id(), index = self.index, "state slot no longer holds this setter's type");
			return;
		};

		let next = f(&previous);
		if next == previous {
			tracing::trace!(instance = %instance.id(), index = self.index, "state unchanged; bailing out");
			return;
		}

		if let Some(Slot::State(value)) = instance.slots().borrow_mut().get_mut(self.index) {
			*value = Box::new(next);
		}
		self.scheduler.schedule_render();
	}
}
