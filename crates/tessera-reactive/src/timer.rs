//! Delayed callbacks.
//!
//! [`TimerHost`] is the host's `setTimeout`/`clearTimeout` pair. Native hosts
//! and tests use [`ManualTimer`], a virtual clock that only moves when
//! [`advance`](ManualTimer::advance) is called.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::error::run_guarded;

/// Identifier of a pending timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

/// Host capability that runs a callback after a delay.
pub trait TimerHost {
	/// Queues `callback` to run once `delay` has elapsed.
	fn set_timeout(&self, delay: Duration, callback: Box<dyn FnOnce()>) -> TimerId;

	/// Cancels a pending timer. Returns `false` if it already fired or was
	/// cleared.
	fn clear_timeout(&self, id: TimerId) -> bool;
}

type Timeout = Box<dyn FnOnce()>;

#[derive(Default)]
struct ManualTimerInner {
	now: Cell<Duration>,
	next_id: Cell<u64>,
	// Keyed by (deadline, id) so equal deadlines fire in registration order.
	pending: RefCell<BTreeMap<(Duration, TimerId), Timeout>>,
}

/// Virtual-clock [`TimerHost`].
#[derive(Clone, Default)]
pub struct ManualTimer {
	inner: Rc<ManualTimerInner>,
}

impl fmt::Debug for ManualTimer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ManualTimer")
			.field("now", &self.now())
			.field("pending", &self.pending())
			.finish()
	}
}

impl ManualTimer {
	/// Creates a clock at zero with no timers.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the virtual time elapsed so far.
	pub fn now(&self) -> Duration {
		self.inner.now.get()
	}

	/// Returns the number of timers waiting to fire.
	pub fn pending(&self) -> usize {
		self.inner.pending.borrow().len()
	}

	/// Moves the clock forward by `by`, firing every timer that falls due.
	///
	/// Timers set by a firing callback fire in the same call when their
	/// deadline is still within range. Returns the number of timers fired.
	pub fn advance(&self, by: Duration) -> usize {
		let target = self.now() + by;
		let mut fired = 0;
		loop {
			let due = {
				let mut pending = self.inner.pending.borrow_mut();
				let next = pending.first_key_value().map(|(&(deadline, _), _)| deadline);
				match next {
					Some(deadline) if deadline <= target => pending.pop_first(),
					_ => None,
				}
			};
			let Some(((deadline, id), callback)) = due else {
				break;
			};
			self.inner.now.set(deadline);
			tracing::trace!(timer = id.0, ?deadline, "timer fired");
			run_guarded("timer callback", callback);
			fired += 1;
		}
		self.inner.now.set(target);
		fired
	}
}

impl TimerHost for ManualTimer {
	fn set_timeout(&self, delay: Duration, callback: Box<dyn FnOnce()>) -> TimerId {
		let id = TimerId(self.inner.next_id.get());
		self.inner.next_id.set(id.0 + 1);
		let deadline = self.now() + delay;
		self.inner.pending.borrow_mut().insert((deadline, id), callback);
		id
	}

	fn clear_timeout(&self, id: TimerId) -> bool {
		let mut pending = self.inner.pending.borrow_mut();
		let key = pending.keys().find(|(_, pending_id)| *pending_id == id).copied();
		key.and_then(|key| pending.remove(&key)).is_some()
	}
}
