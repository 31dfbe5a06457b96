//! Debounce hook: use_debounce

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use super::{Hooks, Ref, SetState};
use crate::error::HookError;
use crate::timer::{TimerHost, TimerId};

impl Hooks {
	/// Returns `value` once it has stopped changing for `delay`.
	///
	/// Every change of `value` (or `delay`) restarts a timer on the
	/// installed [`TimerHost`]; only when a timer fires is the debounced
	/// value committed, which re-renders the component. Unmounting or a
	/// further change clears the pending timer.
	///
	/// Without a timer host the value is committed immediately.
	///
	/// # Example
	///
	/// ```ignore
	/// let search = hooks.use_debounce(input.clone(), Duration::from_millis(300))?;
	/// if submitted {
	///     search.cancel.cancel();
	/// }
	/// ```
	pub fn use_debounce<T>(&self, value: T, delay: Duration) -> Result<Debounced<T>, HookError>
	where
		T: Clone + PartialEq + 'static,
	{
		let (debounced, set_debounced) = self.use_state(value.clone())?;
		let pending = self.use_ref(None::<TimerId>)?;

		let effect = {
			let timer = self.timer.clone();
			let pending = pending.clone();
			let set_debounced = set_debounced.clone();
			let value = value.clone();
			move || {
				let Some(timer) = timer else {
					tracing::warn!("no timer host installed; committing debounced value immediately");
					set_debounced.set(value);
					return None;
				};
				if let Some(previous) = pending.replace(None) {
					timer.clear_timeout(previous);
				}
				let fire = {
					let pending = pending.clone();
					move || {
						pending.replace(None);
						set_debounced.set(value);
					}
				};
				pending.replace(Some(timer.set_timeout(delay, Box::new(fire))));
				Some(move || {
					if let Some(id) = pending.replace(None) {
						timer.clear_timeout(id);
					}
				})
			}
		};
		self.use_effect(effect, Some((value.clone(), delay)))?;

		Ok(Debounced {
			value: debounced,
			cancel: DebounceCancel {
				timer: self.timer.clone(),
				pending,
				set_debounced,
				latest: value,
			},
		})
	}
}

/// Result of [`Hooks::use_debounce`].
#[derive(Debug, Clone)]
pub struct Debounced<T> {
	/// The last committed value.
	pub value: T,
	/// Flushes the pending change.
	pub cancel: DebounceCancel<T>,
}

/// Stops a pending debounce timer.
pub struct DebounceCancel<T> {
	timer: Option<Rc<dyn TimerHost>>,
	pending: Ref<Option<TimerId>>,
	set_debounced: SetState<T>,
	latest: T,
}

impl<T> DebounceCancel<T>
where
	T: Clone + PartialEq + 'static,
{
	/// Clears the pending timer and commits the latest value right away.
	///
	/// Returns `false` when nothing was pending.
	pub fn cancel(&self) -> bool {
		let Some(id) = self.pending.replace(None) else {
			return false;
		};
		if let Some(timer) = &self.timer {
			timer.clear_timeout(id);
		}
		self.set_debounced.set(self.latest.clone());
		true
	}

	/// Returns whether a timer is waiting to commit a value.
	pub fn is_pending(&self) -> bool {
		self.pending.borrow().is_some()
	}
}

impl<T: Clone> Clone for DebounceCancel<T> {
	fn clone(&self) -> Self {
		Self {
			timer: self.timer.clone(),
			pending: self.pending.clone(),
			set_debounced: self.set_debounced.clone(),
			latest: self.latest.clone(),
		}
	}
}

impl<T> fmt::Debug for DebounceCancel<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DebounceCancel")
			.field("pending", &self.pending.borrow().is_some())
			.finish()
	}
}
