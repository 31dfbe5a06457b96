//! Reducer hook: use_reducer

use std::fmt;
use std::rc::{Rc, Weak};

use super::Hooks;
use crate::error::HookError;
use crate::instance::{Instance, Slot, SlotKind};
use crate::scheduler::RenderScheduler;

type ReducerFn<S, A> = Rc<dyn Fn(&S, A) -> S>;

struct ReducerState<S, A> {
	state: S,
	reducer: ReducerFn<S, A>,
}

impl Hooks {
	/// Manages state through a reducer function.
	///
	/// This is the React-like equivalent of `useReducer`. Every dispatch runs
	/// the reducer from the latest render against the current state, stores
	/// the result and schedules a render, even when the result is equal.
	///
	/// # Example
	///
	/// ```ignore
	/// enum Action { Add(String), Clear }
	///
	/// let (items, dispatch) = hooks.use_reducer(
	///     |items: &Vec<String>, action: Action| match action {
	///         Action::Add(item) => { let mut next = items.clone(); next.push(item); next }
	///         Action::Clear => Vec::new(),
	///     },
	///     Vec::new(),
	/// )?;
	/// dispatch.dispatch(Action::Add("milk".into()));
	/// ```
	pub fn use_reducer<S, A, R>(&self, reducer: R, initial: S) -> Result<(S, Dispatch<A>), HookError>
	where
		S: Clone + 'static,
		A: 'static,
		R: Fn(&S, A) -> S + 'static,
	{
		self.use_reducer_with_init(reducer, initial, |state| state)
	}

	/// Like [`use_reducer`](Self::use_reducer), deriving the initial state as
	/// `init(arg)` on the first render.
	pub fn use_reducer_with_init<S, A, R, I, F>(
		&self,
		reducer: R,
		arg: I,
		init: F,
	) -> Result<(S, Dispatch<A>), HookError>
	where
		S: Clone + 'static,
		A: 'static,
		R: Fn(&S, A) -> S + 'static,
		F: FnOnce(I) -> S,
	{
		let cursor = self.slot(SlotKind::Reducer)?;
		let reducer: ReducerFn<S, A> = Rc::new(reducer);
		if !cursor.initialized {
			cursor.init(Slot::Reducer(Box::new(ReducerState {
				state: init(arg),
				reducer: Rc::clone(&reducer),
			})));
		}

		// The latest reducer replaces the stored one so dispatch sees fresh captures.
		let state = match cursor.instance.slots().borrow_mut().get_mut(cursor.index) {
			Some(Slot::Reducer(slot)) => slot.downcast_mut::<ReducerState<S, A>>().map(|slot| {
				slot.reducer = reducer;
				slot.state.clone()
			}),
			_ => None,
		};
		let state = state.ok_or_else(|| cursor.type_mismatch::<S>())?;

		let dispatch = Dispatch::bind::<S>(
			Rc::downgrade(&cursor.instance),
			cursor.index,
			self.scheduler(),
		);
		Ok((state, dispatch))
	}
}

/// Dispatcher returned by [`Hooks::use_reducer`].
pub struct Dispatch<A> {
	inner: Rc<dyn Fn(A)>,
}

impl<A: 'static> Dispatch<A> {
	fn bind<S>(instance: Weak<Instance>, index: usize, scheduler: Rc<dyn RenderScheduler>) -> Self
	where
		S: Clone + 'static,
	{
		let inner = move |action: A| {
			let Some(instance) = instance.upgrade() else {
				return;
			};
			if !instance.is_mounted() {
				tracing::debug!(instance = %instance.id(), index, "dispatch on unmounted instance ignored");
				return;
			}

			let current = match instance.slots().borrow().get(index) {
				Some(Slot::Reducer(slot)) => slot
					.downcast_ref::<ReducerState<S, A>>()
					.map(|slot| (slot.state.clone(), Rc::clone(&slot.reducer))),
				_ => None,
			};
			let Some((state, reducer)) = current else {
				tracing::warn!(instance = %instance.id(), index, "reducer slot no longer holds this dispatcher's type");
				return;
			};

			let next = reducer(&state, action);
			if let Some(Slot::Reducer(slot)) = instance.slots().borrow_mut().get_mut(index) {
				if let Some(slot) = slot.downcast_mut::<ReducerState<S, A>>() {
					slot.state = next;
				}
			}
			scheduler.schedule_render();
		};
		Self {
			inner: Rc::new(inner),
		}
	}
}

impl<A> Dispatch<A> {
	/// Sends `action` to the reducer.
	pub fn dispatch(&self, action: A) {
		(self.inner)(action)
	}
}

impl<A> Clone for Dispatch<A> {
	fn clone(&self) -> Self {
		Self {
			inner: Rc::clone(&self.inner),
		}
	}
}

impl<A> fmt::Debug for Dispatch<A> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Dispatch").finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use crate::{Instance, Runtime};
	use rstest::rstest;

	#[derive(Debug)]
	enum Counter {
		Increment,
		Reset,
	}

	fn reduce(count: &i32, action: Counter) -> i32 {
		match action {
			Counter::Increment => count + 1,
			Counter::Reset => 0,
		}
	}

	#[rstest]
	fn test_dispatch_applies_reducer() {
		// Arrange
		let runtime = Runtime::new();
		let instance = Instance::new();
		let (_, dispatch) = runtime
			.render_component(&instance, |hooks| hooks.use_reducer(reduce, 10))
			.unwrap();

		// Act
		dispatch.dispatch(Counter::Increment);
		dispatch.dispatch(Counter::Increment);
		let (count, _) = runtime
			.render_component(&instance, |hooks| hooks.use_reducer(reduce, 10))
			.unwrap();

		// Assert
		assert_eq!(count, 12);
	}

	#[rstest]
	fn test_dispatch_always_schedules() {
		// Arrange
		let runtime = Runtime::new();
		let instance = Instance::new();
		let (_, dispatch) = runtime
			.render_component(&instance, |hooks| hooks.use_reducer(reduce, 0))
			.unwrap();

		// Act
		dispatch.dispatch(Counter::Reset);

		// Assert
		assert!(runtime.scheduler().is_pending());
	}

	#[rstest]
	fn test_init_function_derives_initial_state() {
		let runtime = Runtime::new();
		let instance = Instance::new();
		let (count, _) = runtime
			.render_component(&instance, |hooks| {
				hooks.use_reducer_with_init(reduce, "42", |raw: &str| raw.parse().unwrap_or(0))
			})
			.unwrap();
		assert_eq!(count, 42);
	}
}
