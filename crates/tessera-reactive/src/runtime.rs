//! Runtime bundle.
//!
//! [`Runtime`] wires the instance stack, scheduler, microtask queue, spawner
//! and hook engine together. It is the explicit context object that replaces
//! process-wide singletons: everything that needs the hook engine receives a
//! `Runtime` (or its [`Hooks`]) by value.
//!
//! ## Driving the runtime
//!
//! Native hosts and tests drive the runtime by hand:
//!
//! ```ignore
//! let runtime = Runtime::new();
//! runtime.set_render_entry(Rc::new(move || app.render()));
//! runtime.scheduler().schedule_render();
//! runtime.run_until_idle();
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use futures::executor::LocalPool;
use futures::future::LocalBoxFuture;

use crate::cleanup::CleanupRegistry;
use crate::hooks::Hooks;
use crate::instance::{InstanceHandle, InstanceStack};
use crate::scheduler::{FrameHost, ManualFrameHost, RenderEntry, Scheduler};
use crate::spawn::Spawner;
use crate::tasks::MicrotaskQueue;
use crate::timer::{ManualTimer, TimerHost};

/// Upper bound on drain rounds in [`Runtime::run_until_idle`].
pub const MAX_IDLE_ROUNDS: usize = 1_000;

/// The reactive runtime context.
#[derive(Clone)]
pub struct Runtime {
	instances: InstanceStack,
	scheduler: Scheduler,
	microtasks: MicrotaskQueue,
	hooks: Hooks,
	frames: Option<ManualFrameHost>,
	timers: Option<ManualTimer>,
	pool: Option<Rc<RefCell<LocalPool>>>,
}

impl fmt::Debug for Runtime {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Runtime")
			.field("instances", &self.instances)
			.field("scheduler", &self.scheduler)
			.field("microtasks", &self.microtasks)
			.field("manual_frames", &self.frames.is_some())
			.field("manual_timers", &self.timers.is_some())
			.field("local_pool", &self.pool.is_some())
			.finish()
	}
}

impl Default for Runtime {
	fn default() -> Self {
		Self::new()
	}
}

impl Runtime {
	/// Creates a runtime driven by a [`ManualFrameHost`] and a local pool.
	pub fn new() -> Self {
		Self::builder().build()
	}

	/// Returns a builder for injecting host capabilities.
	pub fn builder() -> RuntimeBuilder {
		RuntimeBuilder::default()
	}

	/// Returns the hook engine.
	pub fn hooks(&self) -> &Hooks {
		&self.hooks
	}

	/// Returns the instance stack.
	pub fn instances(&self) -> &InstanceStack {
		&self.instances
	}

	/// Returns the render scheduler.
	pub fn scheduler(&self) -> &Scheduler {
		&self.scheduler
	}

	/// Returns the microtask queue.
	pub fn microtasks(&self) -> &MicrotaskQueue {
		&self.microtasks
	}

	/// Installs the application's render entry.
	pub fn set_render_entry(&self, entry: Rc<dyn RenderEntry>) {
		self.scheduler.set_render_entry(entry);
	}

	/// Invokes `body` with `instance` active.
	///
	/// The instance's cursor is reset on entry and the instance is popped when
	/// `body` returns, including on unwind.
	pub fn render_component<R>(&self, instance: &InstanceHandle, body: impl FnOnce(&Hooks) -> R) -> R {
		let _guard = self.instances.enter(instance);
		body(&self.hooks)
	}

	/// Runs `future` on the runtime's spawner.
	pub fn spawn(&self, future: LocalBoxFuture<'static, ()>) -> bool {
		self.hooks.spawn(future)
	}

	/// Drains the microtask queue.
	pub fn run_microtasks(&self) -> usize {
		self.microtasks.run_all()
	}

	/// Fires queued frames on the manual frame host.
	///
	/// Returns 0 when the runtime was built with an external frame host.
	pub fn tick_frame(&self) -> usize {
		self.frames.as_ref().map_or(0, ManualFrameHost::tick)
	}

	/// Moves the manual timer's clock forward, firing due timers.
	///
	/// Returns 0 when the runtime was built with an external timer host.
	/// State set by the fired timers renders on the next
	/// [`run_until_idle`](Self::run_until_idle).
	pub fn advance_time(&self, by: std::time::Duration) -> usize {
		self.timers.as_ref().map_or(0, |timers| timers.advance(by))
	}

	/// Runs spawned tasks on the owned pool until none can progress.
	///
	/// Returns the number of tasks that completed.
	pub fn run_tasks(&self) -> usize {
		let Some(pool) = &self.pool else {
			return 0;
		};
		let Ok(mut pool) = pool.try_borrow_mut() else {
			tracing::warn!("local pool is already running; skipping nested drain");
			return 0;
		};
		let mut completed = 0;
		while pool.try_run_one() {
			completed += 1;
		}
		completed
	}

	/// Alternates microtasks, spawned tasks and frames until nothing is left.
	///
	/// Returns the number of rounds that made progress.
	pub fn run_until_idle(&self) -> usize {
		for round in 0..MAX_IDLE_ROUNDS {
			let progressed = self.run_microtasks() + self.run_tasks() + self.tick_frame();
			if progressed == 0 {
				return round;
			}
		}
		tracing::warn!(rounds = MAX_IDLE_ROUNDS, "runtime still busy after maximum drain rounds");
		MAX_IDLE_ROUNDS
	}
}

impl Spawner for Runtime {
	fn spawn(&self, future: LocalBoxFuture<'static, ()>) {
		self.hooks.spawn(future);
	}
}

/// Builder for [`Runtime`].
#[derive(Default)]
pub struct RuntimeBuilder {
	frame_host: Option<Rc<dyn FrameHost>>,
	cleanup_registry: Option<Rc<dyn CleanupRegistry>>,
	spawner: Option<Rc<dyn Spawner>>,
	timer: Option<Rc<dyn TimerHost>>,
}

impl RuntimeBuilder {
	/// Uses an external frame host instead of a [`ManualFrameHost`].
	pub fn frame_host(mut self, host: Rc<dyn FrameHost>) -> Self {
		self.frame_host = Some(host);
		self
	}

	/// Registers effect teardowns with the external cleanup map.
	pub fn cleanup_registry(mut self, registry: Rc<dyn CleanupRegistry>) -> Self {
		self.cleanup_registry = Some(registry);
		self
	}

	/// Uses an external spawner instead of an owned local pool.
	pub fn spawner(mut self, spawner: Rc<dyn Spawner>) -> Self {
		self.spawner = Some(spawner);
		self
	}

	/// Uses an external timer host instead of a [`ManualTimer`].
	pub fn timer(mut self, timer: Rc<dyn TimerHost>) -> Self {
		self.timer = Some(timer);
		self
	}

	/// Builds the runtime.
	pub fn build(self) -> Runtime {
		let (host, frames): (Rc<dyn FrameHost>, _) = match self.frame_host {
			Some(host) => (host, None),
			None => {
				let manual = ManualFrameHost::new();
				(Rc::new(manual.clone()), Some(manual))
			}
		};
		let (spawner, pool): (Rc<dyn Spawner>, _) = match self.spawner {
			Some(spawner) => (spawner, None),
			None => {
				let pool = LocalPool::new();
				(Rc::new(pool.spawner()), Some(Rc::new(RefCell::new(pool))))
			}
		};

		let (timer, timers): (Rc<dyn TimerHost>, _) = match self.timer {
			Some(timer) => (timer, None),
			None => {
				let manual = ManualTimer::new();
				(Rc::new(manual.clone()), Some(manual))
			}
		};

		let instances = InstanceStack::new();
		let scheduler = Scheduler::new(host);
		let microtasks = MicrotaskQueue::new();
		let mut hooks = Hooks::new(
			Rc::new(instances.clone()),
			Rc::new(scheduler.clone()),
			microtasks.clone(),
		)
		.with_spawner(spawner)
		.with_timer(timer);
		if let Some(registry) = self.cleanup_registry {
			hooks = hooks.with_cleanup_registry(registry);
		}

		tracing::debug!(
			manual_frames = frames.is_some(),
			manual_timers = timers.is_some(),
			local_pool = pool.is_some(),
			"runtime initialised"
		);
		Runtime {
			instances,
			scheduler,
			microtasks,
			hooks,
			frames,
			timers,
			pool,
		}
	}
}
