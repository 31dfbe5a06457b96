//! Render capability.
//!
//! The router paints through [`Renderer`]. Two implementations live here:
//!
//! - [`StringRenderer`] serializes each tree with
//!   [`render_to_string`](crate::ssr::render_to_string); components run once
//!   without an instance, so it suits server rendering only.
//! - [`MemoryRenderer`] keeps one hook [`Instance`] per component occurrence,
//!   runs every component inside the runtime's instance stack and unmounts
//!   occurrences that disappear. It is the in-process stand-in for a DOM
//!   renderer.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use tessera_reactive::{
	CleanupHandle, CleanupRegistry, Instance, InstanceHandle, NodeHandle, RenderError, Runtime,
};

use crate::ssr::render_to_string;
use crate::view::{DomEvent, View};

/// Lazily built view tree.
pub type ViewThunk = Rc<dyn Fn() -> View>;

/// Paints view trees.
pub trait Renderer {
	/// Builds the tree from `view` and paints it.
	///
	/// # Errors
	///
	/// Any failure while building or painting the tree.
	fn render(&self, view: ViewThunk) -> Result<(), RenderError>;
}

#[derive(Default)]
struct Output {
	html: RefCell<Option<String>>,
	renders: Cell<u64>,
}

impl Output {
	fn record(&self, html: String) {
		*self.html.borrow_mut() = Some(html);
		self.renders.set(self.renders.get() + 1);
	}
}

/// Renderer producing HTML strings.
#[derive(Clone, Default)]
pub struct StringRenderer {
	output: Rc<Output>,
}

impl fmt::Debug for StringRenderer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("StringRenderer")
			.field("renders", &self.output.renders.get())
			.finish()
	}
}

impl StringRenderer {
	/// Creates a renderer with no output yet.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the markup of the last render.
	pub fn last_html(&self) -> Option<String> {
		self.output.html.borrow().clone()
	}

	/// Returns how many renders completed.
	pub fn render_count(&self) -> u64 {
		self.output.renders.get()
	}
}

impl Renderer for StringRenderer {
	fn render(&self, view: ViewThunk) -> Result<(), RenderError> {
		self.output.record(render_to_string(&view()));
		Ok(())
	}
}

/// Effect teardowns keyed by the node they belong to.
#[derive(Clone, Default)]
pub struct NodeCleanups {
	nodes: Rc<RefCell<HashMap<NodeHandle, Vec<CleanupHandle>>>>,
}

impl fmt::Debug for NodeCleanups {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("NodeCleanups")
			.field("nodes", &self.nodes.borrow().len())
			.finish()
	}
}

impl NodeCleanups {
	/// Creates an empty map.
	pub fn new() -> Self {
		Self::default()
	}

	/// Runs and forgets every teardown registered for `node`.
	///
	/// Returns how many teardowns ran now.
	pub fn run_node(&self, node: NodeHandle) -> usize {
		let handles = self.nodes.borrow_mut().remove(&node).unwrap_or_default();
		handles.iter().filter(|handle| handle.run()).count()
	}

	/// Returns how many teardowns for `node` have not run yet.
	pub fn pending(&self, node: NodeHandle) -> usize {
		self.nodes
			.borrow()
			.get(&node)
			.map_or(0, |handles| handles.iter().filter(|handle| handle.is_pending()).count())
	}
}

impl CleanupRegistry for NodeCleanups {
	fn register(&self, node: NodeHandle, cleanup: CleanupHandle) {
		let mut nodes = self.nodes.borrow_mut();
		let handles = nodes.entry(node).or_default();
		// Re-running an effect hands in a fresh handle; drop spent ones.
		handles.retain(CleanupHandle::is_pending);
		handles.push(cleanup);
	}
}

struct MemoryRendererInner {
	runtime: Runtime,
	cleanups: NodeCleanups,
	instances: RefCell<HashMap<String, InstanceHandle>>,
	next_node: Cell<u64>,
	tree: RefCell<Option<View>>,
	output: Output,
	rendering: Cell<bool>,
}

/// Stateful in-memory renderer.
///
/// Component occurrences are identified by their position: the chain of
/// enclosing component names plus the occurrence index among equally named
/// siblings. An occurrence keeps its instance, and therefore its hook state,
/// for as long as it keeps appearing at the same position.
#[derive(Clone)]
pub struct MemoryRenderer {
	inner: Rc<MemoryRendererInner>,
}

impl fmt::Debug for MemoryRenderer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MemoryRenderer")
			.field("instances", &self.inner.instances.borrow().len())
			.field("renders", &self.inner.output.renders.get())
			.finish()
	}
}

impl MemoryRenderer {
	/// Creates a renderer running components on `runtime`.
	///
	/// `cleanups` must be the registry the runtime's hooks register effect
	/// teardowns with.
	pub fn new(runtime: Runtime, cleanups: NodeCleanups) -> Self {
		Self {
			inner: Rc::new(MemoryRendererInner {
				runtime,
				cleanups,
				instances: RefCell::new(HashMap::new()),
				next_node: Cell::new(1),
				tree: RefCell::new(None),
				output: Output::default(),
				rendering: Cell::new(false),
			}),
		}
	}

	/// Returns the markup of the last render.
	pub fn last_html(&self) -> Option<String> {
		self.inner.output.html.borrow().clone()
	}

	/// Returns how many renders completed.
	pub fn render_count(&self) -> u64 {
		self.inner.output.renders.get()
	}

	/// Returns the number of mounted component occurrences.
	pub fn mounted(&self) -> usize {
		self.inner.instances.borrow().len()
	}

	/// Returns the instance mounted at `key`, e.g. `"/todos#0"`.
	pub fn instance(&self, key: &str) -> Option<InstanceHandle> {
		self.inner.instances.borrow().get(key).cloned()
	}

	/// Delivers `event` to the handler of the element with attribute
	/// `id` in the last rendered tree.
	///
	/// Returns `false` when no such element or handler exists.
	pub fn dispatch(&self, id: &str, event: DomEvent) -> bool {
		let handler = self
			.inner
			.tree
			.borrow()
			.as_ref()
			.and_then(|tree| tree.find_by_id(id))
			.and_then(|element| element.handler(&event.kind));
		match handler {
			Some(handler) => {
				handler(&event);
				true
			}
			None => {
				tracing::debug!(id, kind = %event.kind, "no handler for dispatched event");
				false
			}
		}
	}

	/// Unmounts every occurrence.
	pub fn unmount_all(&self) {
		let instances: Vec<_> = self.inner.instances.borrow_mut().drain().collect();
		for (key, instance) in instances {
			self.unmount(&key, &instance);
		}
	}

	fn unmount(&self, key: &str, instance: &InstanceHandle) {
		tracing::debug!(key, instance = %instance.id(), "unmounting component");
		if let Some(node) = instance.owning_node() {
			self.inner.cleanups.run_node(node);
		}
		instance.unmount();
	}

	fn resolve(&self, view: View, parent: &str, seen: &mut HashSet<String>) -> Result<View, RenderError> {
		match view {
			View::Component(component) => {
				let base = format!("{parent}/{}", component.name());
				let key = (0..)
					.map(|index| format!("{base}#{index}"))
					.find(|key| !seen.contains(key))
					.unwrap_or(base);
				seen.insert(key.clone());

				let instance = self.instance_for(&key);
				let output = self
					.inner
					.runtime
					.render_component(&instance, |_| component.render())?;
				self.resolve(output, &key, seen)
			}
			View::Element(element) => {
				let children = element
					.child_views()
					.iter()
					.cloned()
					.map(|child| self.resolve(child, parent, seen))
					.collect::<Result<Vec<_>, _>>()?;
				Ok(View::Element(element.with_children(children)))
			}
			View::Fragment(children) => {
				let children = children
					.into_iter()
					.map(|child| self.resolve(child, parent, seen))
					.collect::<Result<Vec<_>, _>>()?;
				Ok(View::Fragment(children))
			}
			other => Ok(other),
		}
	}

	fn instance_for(&self, key: &str) -> InstanceHandle {
		if let Some(instance) = self.inner.instances.borrow().get(key) {
			return Rc::clone(instance);
		}
		let node = NodeHandle(self.inner.next_node.get());
		self.inner.next_node.set(node.0 + 1);
		let instance = Instance::with_node(node);
		tracing::debug!(key, instance = %instance.id(), "mounting component");
		self.inner
			.instances
			.borrow_mut()
			.insert(key.to_string(), Rc::clone(&instance));
		instance
	}
}

impl Renderer for MemoryRenderer {
	fn render(&self, view: ViewThunk) -> Result<(), RenderError> {
		if self.inner.rendering.replace(true) {
			return Err(RenderError::failed("render requested while a render is in progress"));
		}
		let mut seen = HashSet::new();
		let resolved = self.resolve(view(), "", &mut seen);
		self.inner.rendering.set(false);
		let resolved = resolved?;

		let stale: Vec<(String, InstanceHandle)> = {
			let mut instances = self.inner.instances.borrow_mut();
			let keys: Vec<String> = instances
				.keys()
				.filter(|key| !seen.contains(*key))
				.cloned()
				.collect();
			keys.into_iter()
				.filter_map(|key| instances.remove(&key).map(|instance| (key, instance)))
				.collect()
		};
		for (key, instance) in &stale {
			self.unmount(key, instance);
		}

		self.inner.output.record(render_to_string(&resolved));
		*self.inner.tree.borrow_mut() = Some(resolved);
		Ok(())
	}
}
