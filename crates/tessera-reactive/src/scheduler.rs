//! Render scheduler.
//!
//! State changes never render synchronously. Each change calls
//! [`RenderScheduler::schedule_render`], and the [`Scheduler`] coalesces every
//! request made before the next frame into exactly one call of the
//! application's [`RenderEntry`].
//!
//! ## Frame lifecycle
//!
//! 1. The first `schedule_render` sets the pending flag and requests a frame
//!    from the [`FrameHost`].
//! 2. Further requests while pending are no-ops.
//! 3. When the frame fires, the pending flag is cleared and then the render
//!    entry runs. A render may therefore schedule a further frame.
//! 4. Errors and panics from the render entry are logged and swallowed.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use crate::error::{RenderError, run_guarded};

/// Capability to request a re-render of the application.
pub trait RenderScheduler {
	/// Requests a render before the next frame.
	fn schedule_render(&self);
}

/// Host capability that runs a callback before the next paint.
pub trait FrameHost {
	/// Queues `callback` to run on the next frame.
	fn request_frame(&self, callback: Box<dyn FnOnce()>);
}

/// The application's top-level render entry point.
pub trait RenderEntry {
	/// Renders the whole application.
	fn render_app(&self) -> Result<(), RenderError>;
}

impl<F> RenderEntry for F
where
	F: Fn() -> Result<(), RenderError>,
{
	fn render_app(&self) -> Result<(), RenderError> {
		self()
	}
}

struct SchedulerInner {
	pending: Cell<bool>,
	requested: Cell<u64>,
	rendered: Cell<u64>,
	host: Rc<dyn FrameHost>,
	entry: RefCell<Option<Rc<dyn RenderEntry>>>,
}

/// Frame-coalescing [`RenderScheduler`].
#[derive(Clone)]
pub struct Scheduler {
	inner: Rc<SchedulerInner>,
}

impl fmt::Debug for Scheduler {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Scheduler")
			.field("pending", &self.is_pending())
			.field("frames_requested", &self.frames_requested())
			.field("render_count", &self.render_count())
			.finish()
	}
}

impl Scheduler {
	/// Creates a scheduler that requests frames from `host`.
	pub fn new(host: Rc<dyn FrameHost>) -> Self {
		Self {
			inner: Rc::new(SchedulerInner {
				pending: Cell::new(false),
				requested: Cell::new(0),
				rendered: Cell::new(0),
				host,
				entry: RefCell::new(None),
			}),
		}
	}

	/// Installs the application's render entry.
	pub fn set_render_entry(&self, entry: Rc<dyn RenderEntry>) {
		*self.inner.entry.borrow_mut() = Some(entry);
	}

	/// Returns whether a frame has been requested but not yet fired.
	pub fn is_pending(&self) -> bool {
		self.inner.pending.get()
	}

	/// Returns how many frames have been requested.
	pub fn frames_requested(&self) -> u64 {
		self.inner.requested.get()
	}

	/// Returns how many times the render entry has run.
	pub fn render_count(&self) -> u64 {
		self.inner.rendered.get()
	}

	fn flush(inner: &SchedulerInner) {
		inner.pending.set(false);
		let entry = inner.entry.borrow().clone();
		let Some(entry) = entry else {
			tracing::warn!("frame fired with no render entry installed");
			return;
		};
		inner.rendered.set(inner.rendered.get() + 1);
		tracing::debug!(render = inner.rendered.get(), "rendering application");
		match run_guarded("render_app", || entry.render_app()) {
			Some(Ok(())) => {}
			Some(Err(err)) => tracing::error!(error = %err, "application render failed"),
			// Panic already logged by run_guarded.
			None => {}
		}
	}
}

impl RenderScheduler for Scheduler {
	fn schedule_render(&self) {
		if self.inner.pending.replace(true) {
			tracing::trace!("render already pending");
			return;
		}
		self.inner.requested.set(self.inner.requested.get() + 1);
		let weak = Rc::downgrade(&self.inner);
		self.inner.host.request_frame(Box::new(move || {
			if let Some(inner) = weak.upgrade() {
				Self::flush(&inner);
			}
		}));
	}
}

/// In-process [`FrameHost`] driven by explicit [`tick`](Self::tick) calls.
#[derive(Clone, Default)]
pub struct ManualFrameHost {
	frames: Rc<RefCell<VecDeque<Box<dyn FnOnce()>>>>,
}

impl fmt::Debug for ManualFrameHost {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ManualFrameHost")
			.field("queued", &self.queued())
			.finish()
	}
}

impl ManualFrameHost {
	/// Creates a host with no queued frames.
	pub fn new() -> Self {
		Self::default()
	}

	/// Fires the frames queued before this call.
	///
	/// Frames requested while ticking run on the next tick. Returns the
	/// number of frames fired.
	pub fn tick(&self) -> usize {
		let frames: Vec<_> = self.frames.borrow_mut().drain(..).collect();
		let fired = frames.len();
		for frame in frames {
			frame();
		}
		fired
	}

	/// Returns the number of frames waiting for the next tick.
	pub fn queued(&self) -> usize {
		self.frames.borrow().len()
	}
}

impl FrameHost for ManualFrameHost {
	fn request_frame(&self, callback: Box<dyn FnOnce()>) {
		self.frames.borrow_mut().push_back(callback);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};

	struct Harness {
		host: ManualFrameHost,
		scheduler: Scheduler,
		renders: Rc<Cell<u32>>,
	}

	#[fixture]
	fn harness() -> Harness {
		let host = ManualFrameHost::new();
		let scheduler = Scheduler::new(Rc::new(host.clone()));
		let renders = Rc::new(Cell::new(0));
		let counter = Rc::clone(&renders);
		scheduler.set_render_entry(Rc::new(move || -> Result<(), RenderError> {
			counter.set(counter.get() + 1);
			Ok(())
		}));
		Harness {
			host,
			scheduler,
			renders,
		}
	}

	#[rstest]
	fn test_burst_coalesces_into_one_frame(harness: Harness) {
		// Act
		harness.scheduler.schedule_render();
		harness.scheduler.schedule_render();
		harness.scheduler.schedule_render();

		// Assert
		assert_eq!(harness.host.queued(), 1);
		assert_eq!(harness.renders.get(), 0);
		harness.host.tick();
		assert_eq!(harness.renders.get(), 1);
		assert!(!harness.scheduler.is_pending());
	}

	#[rstest]
	fn test_pending_clears_before_render(harness: Harness) {
		// Arrange
		let host = harness.host.clone();
		let scheduler = harness.scheduler.clone();
		let observed = Rc::new(Cell::new(true));
		let seen = Rc::clone(&observed);
		let inner = scheduler.clone();
		scheduler.set_render_entry(Rc::new(move || -> Result<(), RenderError> {
			seen.set(inner.is_pending());
			inner.schedule_render();
			Ok(())
		}));

		// Act
		scheduler.schedule_render();
		host.tick();

		// Assert
		assert!(!observed.get());
		assert_eq!(host.queued(), 1);
		assert_eq!(scheduler.frames_requested(), 2);
	}

	#[rstest]
	fn test_render_error_is_swallowed(harness: Harness) {
		// Arrange
		harness
			.scheduler
			.set_render_entry(Rc::new(|| -> Result<(), RenderError> {
				Err(RenderError::failed("vdom exploded"))
			}));

		// Act
		harness.scheduler.schedule_render();
		harness.host.tick();

		// Assert
		assert_eq!(harness.scheduler.render_count(), 1);
		harness.scheduler.schedule_render();
		assert_eq!(harness.host.queued(), 1);
	}

	#[rstest]
	fn test_render_panic_is_swallowed(harness: Harness) {
		// Arrange
		harness
			.scheduler
			.set_render_entry(Rc::new(|| -> Result<(), RenderError> { panic!("boom") }));

		// Act
		harness.scheduler.schedule_render();
		harness.host.tick();

		// Assert
		assert!(!harness.scheduler.is_pending());
	}
}
