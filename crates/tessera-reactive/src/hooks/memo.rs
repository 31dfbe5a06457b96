//! Memoization hooks: use_memo and use_callback

use std::any::Any;

use super::Hooks;
use crate::callback::Callback;
use crate::deps::deps_changed;
use crate::error::HookError;
use crate::instance::{MemoSlot, Slot, SlotKind};

impl Hooks {
	/// Caches a computed value between renders.
	///
	/// This is the React-like equivalent of `useMemo`. `factory` runs on the
	/// first render and whenever `deps` differs from the previous render's;
	/// otherwise the cached value is returned.
	///
	/// # Example
	///
	/// ```ignore
	/// let visible = hooks.use_memo(
	///     || todos.iter().filter(|todo| !todo.done).cloned().collect::<Vec<_>>(),
	///     Some(todos.clone()),
	/// )?;
	/// ```
	pub fn use_memo<T, F, D>(&self, factory: F, deps: Option<D>) -> Result<T, HookError>
	where
		T: Clone + 'static,
		F: FnOnce() -> T,
		D: PartialEq + 'static,
	{
		self.memo_hook(SlotKind::Memo, factory, deps)
	}

	/// Caches a callback between renders.
	///
	/// Returns the same [`Callback`] (by identity) until `deps` changes, so
	/// children comparing props by identity do not see a new handler.
	pub fn use_callback<Args, Ret, F, D>(
		&self,
		f: F,
		deps: Option<D>,
	) -> Result<Callback<Args, Ret>, HookError>
	where
		Args: 'static,
		Ret: 'static,
		F: Fn(Args) -> Ret + 'static,
		D: PartialEq + 'static,
	{
		self.memo_hook(SlotKind::Callback, move || Callback::new(f), deps)
	}

	fn memo_hook<T, F, D>(&self, kind: SlotKind, factory: F, deps: Option<D>) -> Result<T, HookError>
	where
		T: Clone + 'static,
		F: FnOnce() -> T,
		D: PartialEq + 'static,
	{
		let cursor = self.slot(kind)?;
		if cursor.initialized {
			let slots = cursor.instance.slots().borrow();
			if let Some(Slot::Memo(memo) | Slot::Callback(memo)) = slots.get(cursor.index) {
				if !deps_changed(memo.deps.as_deref(), deps.as_ref()) {
					return memo
						.value
						.downcast_ref::<T>()
						.cloned()
						.ok_or_else(|| cursor.type_mismatch::<T>());
				}
			}
		}

		tracing::trace!(instance = %cursor.instance.id(), index = cursor.index, %kind, "recomputing memoized value");
		let value = factory();
		let memo = MemoSlot {
			deps: deps.map(|deps| Box::new(deps) as Box<dyn Any>),
			value: Box::new(value.clone()),
		};
		let slot = match kind {
			SlotKind::Callback => Slot::Callback(memo),
			_ => Slot::Memo(memo),
		};
		if cursor.initialized {
			if let Some(existing) = cursor.instance.slots().borrow_mut().get_mut(cursor.index) {
				*existing = slot;
			}
		} else {
			cursor.init(slot);
		}
		Ok(value)
	}
}
