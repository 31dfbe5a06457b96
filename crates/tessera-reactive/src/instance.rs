//! Instance registry.
//!
//! An [`Instance`] is the per-mounted-component record that holds the ordered
//! hook slots and the cursor used to address them. The external render layer
//! owns instances and brackets every component invocation with
//! [`InstanceStack::enter`], which resets the cursor and makes the instance
//! visible to the hook engine until the returned guard is dropped.
//!
//! ## Slot discipline
//!
//! Slots are appended lazily on first use and never removed while the
//! instance lives. The slot at index *n* always belongs to the *n*-th hook
//! call of the component body, so hooks must be called unconditionally and in
//! the same order on every render. A changed order is caught when the slot
//! kind at a position differs from the primitive being called.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::cleanup::CleanupHandle;

/// Unique identifier of a component instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceId(u64);

impl InstanceId {
	fn next() -> Self {
		static COUNTER: AtomicU64 = AtomicU64::new(1);
		Self(COUNTER.fetch_add(1, Ordering::Relaxed))
	}

	/// Returns the raw identifier.
	pub fn get(self) -> u64 {
		self.0
	}
}

impl fmt::Display for InstanceId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// Opaque handle to the DOM node owned by the external render layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeHandle(pub u64);

/// Kind tag of a hook slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
	/// Created by `use_state`.
	State,
	/// Created by `use_reducer`.
	Reducer,
	/// Created by `use_ref`.
	Ref,
	/// Created by `use_effect` or `use_layout_effect`.
	Effect,
	/// Created by `use_memo`.
	Memo,
	/// Created by `use_callback`.
	Callback,
}

impl fmt::Display for SlotKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::State => "use_state",
			Self::Reducer => "use_reducer",
			Self::Ref => "use_ref",
			Self::Effect => "use_effect",
			Self::Memo => "use_memo",
			Self::Callback => "use_callback",
		};
		f.write_str(name)
	}
}

/// Effect execution timing.
///
/// Layout effects run synchronously inside the hook call, passive effects are
/// deferred to the microtask queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EffectTiming {
	/// Runs synchronously (`use_layout_effect`).
	Layout,
	/// Runs after the current microtask boundary (`use_effect`).
	#[default]
	Passive,
}

pub(crate) type Deps = Option<Box<dyn Any>>;

pub(crate) struct EffectSlot {
	pub(crate) deps: Deps,
	pub(crate) cleanup: Option<CleanupHandle>,
	pub(crate) timing: EffectTiming,
}

pub(crate) struct MemoSlot {
	pub(crate) deps: Deps,
	pub(crate) value: Box<dyn Any>,
}

/// One hook's persisted state.
pub(crate) enum Slot {
	State(Box<dyn Any>),
	Reducer(Box<dyn Any>),
	Ref(Rc<dyn Any>),
	Effect(EffectSlot),
	Memo(MemoSlot),
	Callback(MemoSlot),
}

impl Slot {
	pub(crate) fn kind(&self) -> SlotKind {
		match self {
			Self::State(_) => SlotKind::State,
			Self::Reducer(_) => SlotKind::Reducer,
			Self::Ref(_) => SlotKind::Ref,
			Self::Effect(_) => SlotKind::Effect,
			Self::Memo(_) => SlotKind::Memo,
			Self::Callback(_) => SlotKind::Callback,
		}
	}
}

/// Shared handle to an [`Instance`].
pub type InstanceHandle = Rc<Instance>;

/// Per-component-occurrence record of hook slots.
pub struct Instance {
	id: InstanceId,
	slots: RefCell<Vec<Slot>>,
	cursor: Cell<usize>,
	owning_node: Cell<Option<NodeHandle>>,
	mounted: Cell<bool>,
}

impl fmt::Debug for Instance {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Instance")
			.field("id", &self.id)
			.field("slot_kinds", &self.slot_kinds())
			.field("cursor", &self.cursor.get())
			.field("owning_node", &self.owning_node.get())
			.field("mounted", &self.mounted.get())
			.finish()
	}
}

impl Instance {
	/// Creates a mounted instance with no owning node.
	pub fn new() -> InstanceHandle {
		Rc::new(Self {
			id: InstanceId::next(),
			slots: RefCell::new(Vec::new()),
			cursor: Cell::new(0),
			owning_node: Cell::new(None),
			mounted: Cell::new(true),
		})
	}

	/// Creates a mounted instance bound to a DOM node.
	pub fn with_node(node: NodeHandle) -> InstanceHandle {
		let instance = Self::new();
		instance.owning_node.set(Some(node));
		instance
	}

	/// Returns the instance identifier.
	pub fn id(&self) -> InstanceId {
		self.id
	}

	/// Returns the DOM node this instance rendered into, if known.
	pub fn owning_node(&self) -> Option<NodeHandle> {
		self.owning_node.get()
	}

	/// Records the DOM node this instance rendered into.
	pub fn set_owning_node(&self, node: Option<NodeHandle>) {
		self.owning_node.set(node);
	}

	/// Returns the current cursor position.
	pub fn cursor(&self) -> usize {
		self.cursor.get()
	}

	/// Returns the number of allocated slots.
	pub fn slot_count(&self) -> usize {
		self.slots.borrow().len()
	}

	/// Returns the kind of every slot in order.
	pub fn slot_kinds(&self) -> Vec<SlotKind> {
		self.slots.borrow().iter().map(Slot::kind).collect()
	}

	/// Returns whether the instance is still mounted.
	pub fn is_mounted(&self) -> bool {
		self.mounted.get()
	}

	/// Tears the instance down.
	///
	/// Every stored effect cleanup runs once, in slot order. Setters and
	/// queued passive effects of an unmounted instance become no-ops.
	pub fn unmount(&self) {
		if !self.mounted.replace(false) {
			return;
		}
		let cleanups = self.take_cleanups();
		tracing::debug!(instance = %self.id, cleanups = cleanups.len(), "unmounting instance");
		for cleanup in cleanups {
			cleanup.run();
		}
	}

	/// Drops every slot after running pending effect cleanups.
	///
	/// The next render starts from a blank slot arena.
	pub fn reset(&self) {
		let cleanups = self.take_cleanups();
		for cleanup in cleanups {
			cleanup.run();
		}
		self.slots.borrow_mut().clear();
		self.cursor.set(0);
		self.mounted.set(true);
		tracing::debug!(instance = %self.id, "instance slots reset");
	}

	fn take_cleanups(&self) -> Vec<CleanupHandle> {
		self.slots
			.borrow_mut()
			.iter_mut()
			.filter_map(|slot| match slot {
				Slot::Effect(effect) => effect.cleanup.take(),
				_ => None,
			})
			.collect()
	}

	pub(crate) fn begin_render(&self) {
		self.cursor.set(0);
	}

	pub(crate) fn advance(&self) -> usize {
		let index = self.cursor.get();
		self.cursor.set(index + 1);
		index
	}

	pub(crate) fn slots(&self) -> &RefCell<Vec<Slot>> {
		&self.slots
	}
}

/// Capability that yields the instance whose body is currently executing.
pub trait InstanceProvider {
	/// Returns the active instance, or `None` outside any component body.
	fn current_instance(&self) -> Option<InstanceHandle>;
}

/// Stack of instances being rendered.
///
/// Nested component invocations push on entry and pop on exit so that hook
/// calls always address the innermost instance.
#[derive(Clone, Default)]
pub struct InstanceStack {
	stack: Rc<RefCell<Vec<InstanceHandle>>>,
}

impl fmt::Debug for InstanceStack {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("InstanceStack")
			.field("depth", &self.depth())
			.finish()
	}
}

impl InstanceStack {
	/// Creates an empty stack.
	pub fn new() -> Self {
		Self::default()
	}

	/// Pushes `instance`, resetting its cursor.
	///
	/// The instance stays current until the returned guard is dropped.
	pub fn enter(&self, instance: &InstanceHandle) -> InstanceGuard {
		instance.begin_render();
		self.stack.borrow_mut().push(Rc::clone(instance));
		tracing::trace!(instance = %instance.id(), depth = self.depth(), "entered instance");
		InstanceGuard {
			stack: self.clone(),
			id: instance.id(),
		}
	}

	/// Returns the number of active instances.
	pub fn depth(&self) -> usize {
		self.stack.borrow().len()
	}
}

impl InstanceProvider for InstanceStack {
	fn current_instance(&self) -> Option<InstanceHandle> {
		self.stack.borrow().last().cloned()
	}
}

/// Pops its instance off the [`InstanceStack`] when dropped.
#[must_use = "the instance is popped as soon as the guard is dropped"]
pub struct InstanceGuard {
	stack: InstanceStack,
	id: InstanceId,
}

impl Drop for InstanceGuard {
	fn drop(&mut self) {
		let popped = self.stack.stack.borrow_mut().pop();
		debug_assert_eq!(
			popped.as_ref().map(|instance| instance.id()),
			Some(self.id),
			"instance stack popped out of order"
		);
		tracing::trace!(instance = %self.id, "left instance");
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_instance_ids_are_unique() {
		let a = Instance::new();
		let b = Instance::new();
		assert_ne!(a.id(), b.id());
	}

	#[rstest]
	fn test_enter_resets_cursor_and_pops_on_drop() {
		let stack = InstanceStack::new();
		let instance = Instance::new();
		instance.advance();
		instance.advance();

		{
			let _guard = stack.enter(&instance);
			assert_eq!(instance.cursor(), 0);
			assert_eq!(stack.depth(), 1);
			let current = stack.current_instance().unwrap();
			assert!(Rc::ptr_eq(&current, &instance));
		}

		assert_eq!(stack.depth(), 0);
		assert!(stack.current_instance().is_none());
	}

	#[rstest]
	fn test_nested_instances_resolve_innermost() {
		let stack = InstanceStack::new();
		let parent = Instance::new();
		let child = Instance::new();

		let _parent_guard = stack.enter(&parent);
		{
			let _child_guard = stack.enter(&child);
			assert_eq!(stack.current_instance().unwrap().id(), child.id());
		}
		assert_eq!(stack.current_instance().unwrap().id(), parent.id());
	}

	#[rstest]
	fn test_with_node_records_owning_node() {
		let instance = Instance::with_node(NodeHandle(9));
		assert_eq!(instance.owning_node(), Some(NodeHandle(9)));
		instance.set_owning_node(None);
		assert_eq!(instance.owning_node(), None);
	}

	#[rstest]
	fn test_unmount_is_idempotent() {
		let instance = Instance::new();
		instance.unmount();
		instance.unmount();
		assert!(!instance.is_mounted());
	}

	#[rstest]
	#[case(SlotKind::State, "use_state")]
	#[case(SlotKind::Reducer, "use_reducer")]
	#[case(SlotKind::Ref, "use_ref")]
	#[case(SlotKind::Effect, "use_effect")]
	#[case(SlotKind::Memo, "use_memo")]
	#[case(SlotKind::Callback, "use_callback")]
	fn test_slot_kind_display(#[case] kind: SlotKind, #[case] expected: &str) {
		assert_eq!(kind.to_string(), expected);
	}
}
