//! Microtask queue.
//!
//! Passive effects are not run inside the render pass. They are queued here
//! and run when the host drains the queue, which stands in for the browser's
//! microtask checkpoint.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

type Task = Box<dyn FnOnce() + 'static>;

/// FIFO queue of deferred callbacks.
#[derive(Clone, Default)]
pub struct MicrotaskQueue {
	tasks: Rc<RefCell<VecDeque<Task>>>,
}

impl fmt::Debug for MicrotaskQueue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MicrotaskQueue")
			.field("len", &self.len())
			.finish()
	}
}

impl MicrotaskQueue {
	/// Creates an empty queue.
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a task.
	pub fn enqueue<F>(&self, task: F)
	where
		F: FnOnce() + 'static,
	{
		self.tasks.borrow_mut().push_back(Box::new(task));
	}

	/// Runs queued tasks until the queue is empty.
	///
	/// Tasks enqueued while draining run in the same call. Returns the number
	/// of tasks executed.
	pub fn run_all(&self) -> usize {
		let mut executed = 0;
		loop {
			// The borrow ends before the task runs so tasks may enqueue more.
			let next = self.tasks.borrow_mut().pop_front();
			let Some(task) = next else {
				break;
			};
			task();
			executed += 1;
		}
		if executed > 0 {
			tracing::trace!(executed, "drained microtask queue");
		}
		executed
	}

	/// Returns the number of queued tasks.
	pub fn len(&self) -> usize {
		self.tasks.borrow().len()
	}

	/// Returns whether no task is queued.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_tasks_run_in_fifo_order() {
		// Arrange
		let queue = MicrotaskQueue::new();
		let log = Rc::new(RefCell::new(Vec::new()));
		for i in 0..3 {
			let log = Rc::clone(&log);
			queue.enqueue(move || log.borrow_mut().push(i));
		}

		// Act
		let executed = queue.run_all();

		// Assert
		assert_eq!(executed, 3);
		assert_eq!(*log.borrow(), vec![0, 1, 2]);
		assert!(queue.is_empty());
	}

	#[rstest]
	fn test_tasks_enqueued_while_draining_run_in_same_pass() {
		// Arrange
		let queue = MicrotaskQueue::new();
		let hits = Rc::new(RefCell::new(0));
		{
			let queue_inner = queue.clone();
			let hits = Rc::clone(&hits);
			queue.enqueue(move || {
				*hits.borrow_mut() += 1;
				let hits = Rc::clone(&hits);
				queue_inner.enqueue(move || *hits.borrow_mut() += 1);
			});
		}

		// Act
		let executed = queue.run_all();

		// Assert
		assert_eq!(executed, 2);
		assert_eq!(*hits.borrow(), 2);
	}
}
