//! `use_query`: subscribe a component to a cache entry.

use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tessera_reactive::{HookError, Hooks, Ref};

use super::{QueryClient, QueryError, QueryStatus};

type FetchTask = Rc<dyn Fn() -> LocalBoxFuture<'static, ()>>;

/// What [`use_query`] returns to the component.
#[derive(Clone)]
pub struct QueryResult {
	/// Cached data, or an empty array while none is cached.
	pub data: Value,
	/// `Success` when data is cached, `Loading` otherwise.
	pub status: QueryStatus,
	/// Whether the entry has been invalidated since it was last set.
	pub stale: bool,
	/// Re-runs the fetcher on demand.
	pub refetch: Refetch,
}

impl QueryResult {
	/// Decodes the data as `T`.
	pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, QueryError> {
		Ok(serde_json::from_value(self.data.clone())?)
	}

	/// Returns whether the data is still loading.
	pub fn is_loading(&self) -> bool {
		self.status == QueryStatus::Loading
	}
}

impl fmt::Debug for QueryResult {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("QueryResult")
			.field("data", &self.data)
			.field("status", &self.status)
			.field("stale", &self.stale)
			.finish_non_exhaustive()
	}
}

/// Handle that re-runs the latest fetcher of a [`use_query`] call.
#[derive(Clone)]
pub struct Refetch {
	hooks: Hooks,
	task: Ref<FetchTask>,
}

impl Refetch {
	/// Spawns the fetcher; the cache is updated when it completes.
	pub fn refetch(&self) {
		let task = self.task.get();
		self.hooks.spawn(task());
	}
}

/// Subscribes the calling component to the cache entry under `key`.
///
/// On mount and whenever `key` changes, the component subscribes to the
/// entry and, if no data is cached, spawns `fetcher` through the hook
/// engine's spawner. Each notification bumps a counter state, so cache
/// changes re-render the component. The subscription is removed in the
/// effect cleanup.
///
/// A failed fetch is logged and the key invalidated; nothing is retried.
///
/// # Example
///
/// ```ignore
/// let todos = use_query(hooks, &client, "todos:list", move || {
///     let api = api.clone();
///     async move { api.list().await }
/// })?;
/// if todos.is_loading() {
///     return Ok(View::element("p").child("Loading todos...").into_view());
/// }
/// ```
pub fn use_query<T, E, F, Fut>(
	hooks: &Hooks,
	client: &QueryClient,
	key: &str,
	fetcher: F,
) -> Result<QueryResult, HookError>
where
	F: Fn() -> Fut + 'static,
	Fut: Future<Output = Result<T, E>> + 'static,
	T: Serialize + 'static,
	E: Into<Box<dyn StdError>> + 'static,
{
	let (_, set_version) = hooks.use_state(0_u64)?;

	let task = fetch_task(client, key, fetcher);
	let latest = hooks.use_ref(Rc::clone(&task))?;
	latest.replace(task);

	hooks.use_effect(
		{
			let hooks = hooks.clone();
			let client = client.clone();
			let key = key.to_string();
			let latest = latest.clone();
			move || {
				let subscription = client.subscribe(key.clone(), move |_| {
					set_version.update(|version| version.wrapping_add(1));
				});
				if client.get_query_data(&key).is_none() {
					let task = latest.get();
					hooks.spawn(task());
				}
				Some(move || subscription.unsubscribe())
			}
		},
		Some(key.to_string()),
	)?;

	let data = client.get_query_data(key);
	let stale = client.status(key) == Some(QueryStatus::Stale);
	let status = if data.is_some() {
		QueryStatus::Success
	} else {
		QueryStatus::Loading
	};
	Ok(QueryResult {
		data: data.unwrap_or_else(|| Value::Array(Vec::new())),
		status,
		stale,
		refetch: Refetch {
			hooks: hooks.clone(),
			task: latest,
		},
	})
}

fn fetch_task<T, E, F, Fut>(client: &QueryClient, key: &str, fetcher: F) -> FetchTask
where
	F: Fn() -> Fut + 'static,
	Fut: Future<Output = Result<T, E>> + 'static,
	T: Serialize + 'static,
	E: Into<Box<dyn StdError>> + 'static,
{
	let client = client.clone();
	let key = key.to_string();
	let fetcher = Rc::new(fetcher);
	Rc::new(move || {
		let client = client.clone();
		let key = key.clone();
		let fetcher = Rc::clone(&fetcher);
		async move {
			if let Err(err) = client.prefetch(key.clone(), || fetcher()).await {
				tracing::warn!(%key, error = %err, "query fetch failed; invalidating");
				client.invalidate_queries(&key);
			}
		}
		.boxed_local()
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;
	use std::cell::Cell;
	use tessera_reactive::{Instance, InstanceHandle, Runtime};

	fn render(
		runtime: &Runtime,
		instance: &InstanceHandle,
		client: &QueryClient,
		calls: &Rc<Cell<u32>>,
	) -> QueryResult {
		runtime
			.render_component(instance, |hooks| {
				let calls = Rc::clone(calls);
				use_query(hooks, client, "todos", move || {
					calls.set(calls.get() + 1);
					async { Ok::<_, String>(json!(["a"])) }
				})
			})
			.unwrap()
	}

	#[rstest]
	fn test_fetches_when_empty_then_rerenders() {
		// Arrange
		let runtime = Runtime::new();
		let instance = Instance::new();
		let client = QueryClient::new();
		let calls = Rc::new(Cell::new(0));

		// Act
		let first = render(&runtime, &instance, &client, &calls);
		runtime.run_until_idle();
		let second = render(&runtime, &instance, &client, &calls);

		// Assert
		assert!(first.is_loading());
		assert_eq!(first.data, json!([]));
		assert_eq!(second.status, QueryStatus::Success);
		assert_eq!(second.data, json!(["a"]));
		assert_eq!(calls.get(), 1);
		assert_eq!(runtime.scheduler().frames_requested(), 1);
	}

	#[rstest]
	fn test_cached_data_skips_fetch() {
		// Arrange
		let runtime = Runtime::new();
		let instance = Instance::new();
		let client = QueryClient::new();
		client.set_query_data("todos", json!(["cached"]));
		let calls = Rc::new(Cell::new(0));

		// Act
		let result = render(&runtime, &instance, &client, &calls);
		runtime.run_until_idle();

		// Assert
		assert_eq!(result.data, json!(["cached"]));
		assert_eq!(calls.get(), 0);
	}

	#[rstest]
	fn test_unmount_unsubscribes() {
		// Arrange
		let runtime = Runtime::new();
		let instance = Instance::new();
		let client = QueryClient::new();
		client.set_query_data("todos", json!([]));
		let calls = Rc::new(Cell::new(0));
		render(&runtime, &instance, &client, &calls);
		runtime.run_until_idle();
		assert_eq!(client.subscriber_count("todos"), 1);

		// Act
		instance.unmount();

		// Assert
		assert_eq!(client.subscriber_count("todos"), 0);
	}

	#[rstest]
	fn test_refetch_runs_latest_fetcher() {
		// Arrange
		let runtime = Runtime::new();
		let instance = Instance::new();
		let client = QueryClient::new();
		client.set_query_data("todos", json!([]));
		let calls = Rc::new(Cell::new(0));
		let result = render(&runtime, &instance, &client, &calls);

		// Act
		result.refetch.refetch();
		runtime.run_until_idle();

		// Assert
		assert_eq!(calls.get(), 1);
		assert_eq!(client.get_query_data("todos"), Some(json!(["a"])));
	}
}
