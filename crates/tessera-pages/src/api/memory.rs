//! In-process todo store.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use async_trait::async_trait;

use super::{ApiError, Todo, TodoApi};

#[derive(Default)]
struct Store {
	rows: RefCell<Vec<(u64, String)>>,
	next_id: Cell<u64>,
	failing: Cell<bool>,
	requests: Cell<usize>,
}

/// Todo storage kept in memory, ids assigned sequentially.
///
/// Cloning yields another handle to the same store.
#[derive(Clone, Default)]
pub struct InMemoryTodoStore {
	store: Rc<Store>,
}

impl std::fmt::Debug for InMemoryTodoStore {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("InMemoryTodoStore")
			.field("rows", &self.store.rows.borrow().len())
			.field("failing", &self.store.failing.get())
			.finish()
	}
}

impl InMemoryTodoStore {
	/// Creates an empty store.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a store holding `texts`, inserted in order.
	pub fn with_todos<I, S>(texts: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let store = Self::new();
		for text in texts {
			store.insert(text.into());
		}
		store
	}

	/// Makes every following request fail with a 500 status.
	pub fn set_failing(&self, failing: bool) {
		self.store.failing.set(failing);
	}

	/// Returns how many requests were made.
	pub fn requests(&self) -> usize {
		self.store.requests.get()
	}

	/// Returns the stored todos, newest first, without counting a request.
	pub fn snapshot(&self) -> Vec<Todo> {
		self.store
			.rows
			.borrow()
			.iter()
			.rev()
			.map(|(id, text)| Todo::new(id.to_string(), text.clone()))
			.collect()
	}

	fn insert(&self, text: String) -> u64 {
		let id = self.store.next_id.get() + 1;
		self.store.next_id.set(id);
		self.store.rows.borrow_mut().push((id, text));
		id
	}

	fn begin(&self) -> Result<(), ApiError> {
		self.store.requests.set(self.store.requests.get() + 1);
		if self.store.failing.get() {
			return Err(ApiError::Status {
				status: 500,
				message: "store unavailable".to_string(),
			});
		}
		Ok(())
	}
}

#[async_trait(?Send)]
impl TodoApi for InMemoryTodoStore {
	async fn list(&self) -> Result<Vec<Todo>, ApiError> {
		self.begin()?;
		Ok(self.snapshot())
	}

	async fn create(&self, text: &str) -> Result<(), ApiError> {
		self.begin()?;
		let id = self.insert(text.to_string());
		tracing::debug!(id, "todo created");
		Ok(())
	}

	async fn remove(&self, id: &str) -> Result<(), ApiError> {
		self.begin()?;
		let mut rows = self.store.rows.borrow_mut();
		let before = rows.len();
		rows.retain(|(row_id, _)| row_id.to_string() != id);
		tracing::debug!(id, removed = before - rows.len(), "todo removed");
		Ok(())
	}
}
