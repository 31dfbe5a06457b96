//! Hook engine.
//!
//! [`Hooks`] implements the seven hook primitives on top of the instance
//! registry. Every primitive reads or initialises the slot at the active
//! instance's cursor and advances the cursor by one, so the *n*-th hook call
//! of a component body always addresses the *n*-th slot.
//!
//! ## Available Hooks
//!
//! | Hook | Slot | Re-render |
//! |------|------|-----------|
//! | [`Hooks::use_state`] | state value | on unequal `set` |
//! | [`Hooks::use_reducer`] | reducer state | on every dispatch |
//! | [`Hooks::use_ref`] | shared cell | never |
//! | [`Hooks::use_effect`] | deps + cleanup | never |
//! | [`Hooks::use_layout_effect`] | deps + cleanup | never |
//! | [`Hooks::use_memo`] | deps + value | never |
//! | [`Hooks::use_callback`] | deps + callback | never |
//!
//! [`Hooks::use_debounce`] is composed from `use_state`, `use_ref` and
//! `use_effect` and needs a [`TimerHost`].
//!
//! ## Rules of Hooks
//!
//! 1. Call hooks only while a component instance is active, i.e. inside
//!    [`Runtime::render_component`](crate::Runtime::render_component) or an
//!    [`InstanceStack::enter`](crate::InstanceStack::enter) bracket.
//! 2. Call them unconditionally and in the same order on every render.
//!
//! Breaking rule 1 yields [`HookError::InvalidHookContext`]; breaking rule 2
//! is detected when the slot kind changes and yields
//! [`HookError::SlotKindMismatch`].

mod debounce;
mod effect;
mod memo;
mod reducer;
mod ref_hook;
mod state;

pub use debounce::{DebounceCancel, Debounced};
pub use reducer::Dispatch;
pub use ref_hook::Ref;
pub use state::SetState;

use std::fmt;
use std::rc::Rc;

use futures::future::LocalBoxFuture;

use crate::cleanup::CleanupRegistry;
use crate::error::HookError;
use crate::instance::{InstanceHandle, InstanceProvider, Slot, SlotKind};
use crate::scheduler::RenderScheduler;
use crate::spawn::Spawner;
use crate::tasks::MicrotaskQueue;
use crate::timer::TimerHost;

/// The hook engine.
///
/// Capabilities are injected at construction; cloning is cheap and every
/// clone addresses the same instance stack and scheduler.
#[derive(Clone)]
pub struct Hooks {
	instances: Rc<dyn InstanceProvider>,
	scheduler: Rc<dyn RenderScheduler>,
	microtasks: MicrotaskQueue,
	cleanup_registry: Option<Rc<dyn CleanupRegistry>>,
	spawner: Option<Rc<dyn Spawner>>,
	timer: Option<Rc<dyn TimerHost>>,
}

impl fmt::Debug for Hooks {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Hooks")
			.field("microtasks", &self.microtasks)
			.field("cleanup_registry", &self.cleanup_registry.is_some())
			.field("spawner", &self.spawner.is_some())
			.field("timer", &self.timer.is_some())
			.finish()
	}
}

impl Hooks {
	/// Creates a hook engine.
	///
	/// # Arguments
	///
	/// * `instances` - Yields the instance whose body is executing
	/// * `scheduler` - Notified when state changes need a re-render
	/// * `microtasks` - Queue that passive effect bodies are deferred to
	pub fn new(
		instances: Rc<dyn InstanceProvider>,
		scheduler: Rc<dyn RenderScheduler>,
		microtasks: MicrotaskQueue,
	) -> Self {
		Self {
			instances,
			scheduler,
			microtasks,
			cleanup_registry: None,
			spawner: None,
			timer: None,
		}
	}

	/// Registers effect teardowns in the external per-node cleanup map.
	pub fn with_cleanup_registry(mut self, registry: Rc<dyn CleanupRegistry>) -> Self {
		self.cleanup_registry = Some(registry);
		self
	}

	/// Installs the spawner used by asynchronous hooks.
	pub fn with_spawner(mut self, spawner: Rc<dyn Spawner>) -> Self {
		self.spawner = Some(spawner);
		self
	}

	/// Installs the timer host used by [`use_debounce`](Self::use_debounce).
	pub fn with_timer(mut self, timer: Rc<dyn TimerHost>) -> Self {
		self.timer = Some(timer);
		self
	}

	/// Returns the scheduler capability.
	pub fn scheduler(&self) -> Rc<dyn RenderScheduler> {
		Rc::clone(&self.scheduler)
	}

	/// Returns the microtask queue passive effects are deferred to.
	pub fn microtasks(&self) -> &MicrotaskQueue {
		&self.microtasks
	}

	/// Runs `future` on the installed spawner.
	///
	/// Returns `false` and drops the future when no spawner is installed.
	pub fn spawn(&self, future: LocalBoxFuture<'static, ()>) -> bool {
		match &self.spawner {
			Some(spawner) => {
				spawner.spawn(future);
				true
			}
			None => {
				tracing::warn!("no spawner installed; dropping asynchronous hook task");
				false
			}
		}
	}

	/// Claims the slot at the active instance's cursor.
	fn slot(&self, kind: SlotKind) -> Result<SlotCursor, HookError> {
		let instance = self
			.instances
			.current_instance()
			.ok_or(HookError::InvalidHookContext)?;
		let index = instance.advance();
		let existing = instance.slots().borrow().get(index).map(Slot::kind);
		let initialized = match existing {
			None => false,
			Some(found) if found != kind => {
				tracing::error!(instance = %instance.id(), index, %found, expected = %kind, "hook order changed between renders");
				return Err(HookError::SlotKindMismatch {
					index,
					expected: kind,
					found,
				});
			}
			Some(_) => true,
		};
		tracing::trace!(instance = %instance.id(), index, %kind, initialized, "hook slot");
		Ok(SlotCursor {
			instance,
			index,
			initialized,
		})
	}
}

/// The slot a primitive is working on.
struct SlotCursor {
	instance: InstanceHandle,
	index: usize,
	initialized: bool,
}

impl SlotCursor {
	/// Appends the freshly initialised slot.
	fn init(&self, slot: Slot) {
		let mut slots = self.instance.slots().borrow_mut();
		debug_assert_eq!(slots.len(), self.index, "hook slots appended out of order");
		slots.push(slot);
	}

	fn type_mismatch<T>(&self) -> HookError {
		HookError::SlotTypeMismatch {
			index: self.index,
			expected: std::any::type_name::<T>(),
		}
	}
}
