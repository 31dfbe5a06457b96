//! Effect hooks: use_effect and use_layout_effect
//!
//! Both hooks share one change policy: the body re-runs only when the
//! dependency value differs from the previous render's (a missing dependency
//! list always counts as a change). Before a replacement body runs, the
//! cleanup returned by the previous body runs exactly once.
//!
//! Passive effects are deferred to the microtask queue and never run inside
//! the render pass. Layout effects run synchronously within the hook call.

use std::any::Any;
use std::rc::{Rc, Weak};

use super::Hooks;
use crate::cleanup::{CleanupHandle, CleanupRegistry};
use crate::deps::deps_changed;
use crate::error::{HookError, run_guarded};
use crate::instance::{EffectSlot, EffectTiming, Instance, Slot, SlotKind};

type EffectBody = Box<dyn FnOnce() -> Option<CleanupHandle>>;

impl Hooks {
	/// Runs a side effect after render.
	///
	/// This is the React-like equivalent of `useEffect`. The body may return a
	/// cleanup closure, which runs before the next body or on unmount.
	///
	/// # Arguments
	///
	/// * `effect` - The effect body, returning an optional cleanup
	/// * `deps` - Dependency value; `None` re-runs the effect on every render
	///
	/// # Example
	///
	/// ```ignore
	/// hooks.use_effect(
	///     {
	///         let client = client.clone();
	///         move || {
	///             let subscription = client.subscribe("todos", |_| {});
	///             Some(move || subscription.unsubscribe())
	///         }
	///     },
	///     Some(()),
	/// )?;
	/// ```
	pub fn use_effect<F, C, D>(&self, effect: F, deps: Option<D>) -> Result<(), HookError>
	where
		F: FnOnce() -> Option<C> + 'static,
		C: FnOnce() + 'static,
		D: PartialEq + 'static,
	{
		self.effect_hook(EffectTiming::Passive, effect, deps)
	}

	/// Runs a side effect synchronously within the hook call.
	///
	/// This is the React-like equivalent of `useLayoutEffect`: same signature
	/// and change policy as [`use_effect`](Self::use_effect), but the body is
	/// not deferred. Prefer `use_effect` unless the body must observe or
	/// mutate layout before paint.
	pub fn use_layout_effect<F, C, D>(&self, effect: F, deps: Option<D>) -> Result<(), HookError>
	where
		F: FnOnce() -> Option<C> + 'static,
		C: FnOnce() + 'static,
		D: PartialEq + 'static,
	{
		self.effect_hook(EffectTiming::Layout, effect, deps)
	}

	fn effect_hook<F, C, D>(
		&self,
		timing: EffectTiming,
		effect: F,
		deps: Option<D>,
	) -> Result<(), HookError>
	where
		F: FnOnce() -> Option<C> + 'static,
		C: FnOnce() + 'static,
		D: PartialEq + 'static,
	{
		let cursor = self.slot(SlotKind::Effect)?;
		if !cursor.initialized {
			cursor.init(Slot::Effect(EffectSlot {
				deps: None,
				cleanup: None,
				timing,
			}));
		}

		// Deps are recorded at render time; the previous cleanup is taken out
		// of the slot before it runs so it cannot run twice.
		let previous_cleanup = {
			let mut slots = cursor.instance.slots().borrow_mut();
			let Some(Slot::Effect(slot)) = slots.get_mut(cursor.index) else {
				return Err(cursor.type_mismatch::<EffectSlot>());
			};
			if cursor.initialized && !deps_changed(slot.deps.as_deref(), deps.as_ref()) {
				tracing::trace!(instance = %cursor.instance.id(), index = cursor.index, "effect deps unchanged");
				return Ok(());
			}
			slot.deps = deps.map(|deps| Box::new(deps) as Box<dyn Any>);
			slot.timing = timing;
			slot.cleanup.take()
		};
		if let Some(cleanup) = previous_cleanup {
			cleanup.run();
		}

		let job = EffectJob {
			instance: Rc::downgrade(&cursor.instance),
			index: cursor.index,
			registry: self.cleanup_registry.clone(),
			body: Box::new(move || effect().map(CleanupHandle::new)),
		};
		match timing {
			EffectTiming::Layout => job.run(),
			EffectTiming::Passive => self.microtasks.enqueue(move || job.run()),
		}
		Ok(())
	}
}

/// A pending effect body bound to its slot.
struct EffectJob {
	instance: Weak<Instance>,
	index: usize,
	registry: Option<Rc<dyn CleanupRegistry>>,
	body: EffectBody,
}

impl EffectJob {
	fn run(self) {
		let Some(instance) = self.instance.upgrade() else {
			return;
		};
		if !instance.is_mounted() {
			tracing::trace!(instance = %instance.id(), index = self.index, "skipping effect of unmounted instance");
			return;
		}

		// A body queued earlier in the same burst may have stored a cleanup
		// that has not been torn down yet.
		if let Some(stale) = take_cleanup(&instance, self.index) {
			stale.run();
		}

		let Some(Some(cleanup)) = run_guarded("effect body", self.body) else {
			return;
		};

		if !instance.is_mounted() {
			// The body unmounted its own instance.
			cleanup.run();
			return;
		}
		if let Some(Slot::Effect(slot)) = instance.slots().borrow_mut().get_mut(self.index) {
			slot.cleanup = Some(cleanup.clone());
		}
		if let (Some(registry), Some(node)) = (&self.registry, instance.owning_node()) {
			registry.register(node, cleanup);
		}
	}
}

fn take_cleanup(instance: &Instance, index: usize) -> Option<CleanupHandle> {
	match instance.slots().borrow_mut().get_mut(index) {
		Some(Slot::Effect(slot)) => slot.cleanup.take(),
		_ => None,
	}
}
