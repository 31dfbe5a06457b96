//! Query cache.
//!
//! [`QueryClient`] is a key-addressed cache of JSON data with per-key status
//! and subscriber sets. It is an explicit context object: clone it into every
//! component, loader or handler that needs it; all clones share one cache.
//!
//! ## Status lifecycle
//!
//! ```text
//! Idle ──prefetch──▶ Loading ──fetch ok──▶ Success ──invalidate──▶ Stale
//!   │                    │                   ▲                      │
//!   │                    └──fetch error──▶ (previous status)        │
//!   └───────────set_query_data / hydrate─────┴──────set_query_data──┘
//! ```
//!
//! Subscribers are notified synchronously after `set_query_data` and
//! `invalidate_queries`, never while the cache is borrowed, so callbacks may
//! read or write the cache.

mod hook;
mod snapshot;

pub use hook::{QueryResult, Refetch, use_query};
pub use snapshot::{STORE_VAR, Snapshot};

use std::cell::RefCell;
use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::rc::{Rc, Weak};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tessera_reactive::{EventHub, ListenerId};

/// Errors raised by the query cache.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
	/// The fetcher failed.
	#[error("fetching query `{key}` failed: {cause}")]
	Fetch {
		/// Query key.
		key: String,
		/// The fetcher's error.
		#[source]
		cause: Box<dyn StdError>,
	},

	/// Data could not be converted to or from JSON.
	#[error("query data serialization failed: {0}")]
	Serialization(#[from] serde_json::Error),
}

/// Status of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
	/// Created by a subscriber; never fetched.
	Idle,
	/// A prefetch is in flight.
	Loading,
	/// Holds fresh data.
	Success,
	/// Holds data that should be refetched.
	Stale,
}

impl fmt::Display for QueryStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let status = match self {
			Self::Idle => "idle",
			Self::Loading => "loading",
			Self::Success => "success",
			Self::Stale => "stale",
		};
		f.write_str(status)
	}
}

/// Notification delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryEvent {
	/// Key of the entry that changed.
	pub key: String,
	/// The entry's new status.
	pub status: QueryStatus,
}

/// New data for [`QueryClient::set_query_data`].
pub enum QueryUpdate {
	/// Replaces the data with a literal value.
	Replace(Value),
	/// Computes the data from the prior value (an empty array if none).
	Update(Box<dyn FnOnce(Value) -> Value>),
}

impl QueryUpdate {
	/// Creates a functional update.
	pub fn with<F>(f: F) -> Self
	where
		F: FnOnce(Value) -> Value + 'static,
	{
		Self::Update(Box::new(f))
	}
}

impl From<Value> for QueryUpdate {
	fn from(value: Value) -> Self {
		Self::Replace(value)
	}
}

impl fmt::Debug for QueryUpdate {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Replace(value) => f.debug_tuple("Replace").field(value).finish(),
			Self::Update(_) => f.write_str("Update(..)"),
		}
	}
}

type Subscribers = Rc<EventHub<QueryEvent>>;

struct CacheEntry {
	data: Option<Value>,
	status: QueryStatus,
	subscribers: Subscribers,
}

impl CacheEntry {
	fn new(data: Option<Value>, status: QueryStatus) -> Self {
		Self {
			data,
			status,
			subscribers: Rc::new(EventHub::new()),
		}
	}
}

/// Handle returned by [`QueryClient::subscribe`].
#[must_use = "dropping a subscription does not unsubscribe; call `unsubscribe`"]
pub struct Subscription {
	key: String,
	hub: Weak<EventHub<QueryEvent>>,
	id: ListenerId,
}

impl Subscription {
	/// Returns the subscribed key.
	pub fn key(&self) -> &str {
		&self.key
	}

	/// Removes the callback from the entry's subscriber set.
	///
	/// A no-op if the entry was replaced by `hydrate` in the meantime.
	pub fn unsubscribe(self) {
		if let Some(hub) = self.hub.upgrade() {
			hub.unsubscribe(self.id);
			tracing::trace!(key = %self.key, "query subscriber removed");
		}
	}
}

impl fmt::Debug for Subscription {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscription")
			.field("key", &self.key)
			.field("id", &self.id)
			.finish()
	}
}

/// The query cache.
#[derive(Clone, Default)]
pub struct QueryClient {
	cache: Rc<RefCell<HashMap<String, CacheEntry>>>,
}

impl fmt::Debug for QueryClient {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let cache = self.cache.borrow();
		let mut keys: Vec<_> = cache.keys().collect();
		keys.sort();
		f.debug_struct("QueryClient").field("keys", &keys).finish()
	}
}

impl QueryClient {
	/// Creates an empty cache.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns a clone of the data stored under `key`.
	pub fn get_query_data(&self, key: &str) -> Option<Value> {
		self.cache
			.borrow()
			.get(key)
			.and_then(|entry| entry.data.clone())
	}

	/// Returns the data under `key` decoded as `T`.
	pub fn get_query_data_as<T>(&self, key: &str) -> Result<Option<T>, QueryError>
	where
		T: DeserializeOwned,
	{
		self.get_query_data(key)
			.map(serde_json::from_value)
			.transpose()
			.map_err(QueryError::from)
	}

	/// Returns the status of the entry under `key`.
	pub fn status(&self, key: &str) -> Option<QueryStatus> {
		self.cache.borrow().get(key).map(|entry| entry.status)
	}

	/// Returns the number of subscribers of `key`.
	pub fn subscriber_count(&self, key: &str) -> usize {
		self.cache
			.borrow()
			.get(key)
			.map_or(0, |entry| entry.subscribers.len())
	}

	/// Returns whether an entry exists under `key`.
	pub fn contains_key(&self, key: &str) -> bool {
		self.cache.borrow().contains_key(key)
	}

	/// Stores data under `key`, marks it `Success` and notifies subscribers.
	///
	/// A functional update receives the prior data, or an empty array when
	/// the entry holds none. The entry is created if missing.
	pub fn set_query_data(&self, key: impl Into<String>, update: impl Into<QueryUpdate>) {
		let key = key.into();
		let next = match update.into() {
			QueryUpdate::Replace(value) => value,
			QueryUpdate::Update(f) => {
				let prior = self
					.get_query_data(&key)
					.unwrap_or_else(|| Value::Array(Vec::new()));
				f(prior)
			}
		};

		let subscribers = {
			let mut cache = self.cache.borrow_mut();
			let entry = cache
				.entry(key.clone())
				.or_insert_with(|| CacheEntry::new(None, QueryStatus::Idle));
			entry.data = Some(next);
			entry.status = QueryStatus::Success;
			Rc::clone(&entry.subscribers)
		};
		tracing::debug!(%key, subscribers = subscribers.len(), "query data set");
		subscribers.emit(&QueryEvent {
			key,
			status: QueryStatus::Success,
		});
	}

	/// Typed functional update of the data under `key`.
	///
	/// The prior data (an empty array if none) is decoded as `T`, passed to
	/// `f`, and the result stored as with [`set_query_data`](Self::set_query_data).
	pub fn update_query_data<T, F>(&self, key: impl Into<String>, f: F) -> Result<(), QueryError>
	where
		T: Serialize + DeserializeOwned,
		F: FnOnce(T) -> T,
	{
		let key = key.into();
		let prior = self
			.get_query_data(&key)
			.unwrap_or_else(|| Value::Array(Vec::new()));
		let next = serde_json::to_value(f(serde_json::from_value(prior)?))?;
		self.set_query_data(key, next);
		Ok(())
	}

	/// Marks the entry under exactly `key` as `Stale` and notifies its
	/// subscribers. Data is untouched; an unknown key is a no-op.
	pub fn invalidate_queries(&self, key: &str) {
		let subscribers = {
			let mut cache = self.cache.borrow_mut();
			let Some(entry) = cache.get_mut(key) else {
				tracing::trace!(key, "invalidate on unknown query ignored");
				return;
			};
			entry.status = QueryStatus::Stale;
			Rc::clone(&entry.subscribers)
		};
		tracing::debug!(key, subscribers = subscribers.len(), "query invalidated");
		subscribers.emit(&QueryEvent {
			key: key.to_string(),
			status: QueryStatus::Stale,
		});
	}

	/// Adds `callback` to the subscribers of `key`.
	///
	/// A missing entry is created `Idle` with no data.
	pub fn subscribe<F>(&self, key: impl Into<String>, callback: F) -> Subscription
	where
		F: Fn(&QueryEvent) + 'static,
	{
		let key = key.into();
		let hub = {
			let mut cache = self.cache.borrow_mut();
			let entry = cache
				.entry(key.clone())
				.or_insert_with(|| CacheEntry::new(None, QueryStatus::Idle));
			Rc::clone(&entry.subscribers)
		};
		let id = hub.subscribe(callback);
		tracing::trace!(%key, "query subscriber added");
		Subscription {
			key,
			hub: Rc::downgrade(&hub),
			id,
		}
	}

	/// Runs `fetcher` and stores its result under `key`.
	///
	/// The fetcher always runs, even when fresh data is cached. While it is in
	/// flight the entry is `Loading`; on failure the previous status is
	/// restored and the error returned.
	///
	/// Subscribers are not notified of the `Loading` transition nor of the
	/// restore, only of the committed data. A `Stale` entry therefore stays
	/// observably stale until a fetch succeeds, and a subscriber that
	/// refetches on `Stale` is not re-triggered by its own failed attempt.
	pub async fn prefetch<T, E, F, Fut>(&self, key: impl Into<String>, fetcher: F) -> Result<Value, QueryError>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<T, E>>,
		T: Serialize,
		E: Into<Box<dyn StdError>>,
	{
		let key = key.into();
		let previous = self.mark_loading(&key);
		tracing::debug!(%key, "prefetching query");

		let data = match fetcher().await {
			Ok(data) => serde_json::to_value(data),
			Err(err) => {
				self.restore_status(&key, previous);
				return Err(QueryError::Fetch {
					key,
					cause: err.into(),
				});
			}
		};
		let data = match data {
			Ok(data) => data,
			Err(err) => {
				self.restore_status(&key, previous);
				return Err(err.into());
			}
		};

		self.set_query_data(key, data.clone());
		Ok(data)
	}

	fn mark_loading(&self, key: &str) -> QueryStatus {
		let mut cache = self.cache.borrow_mut();
		let entry = cache
			.entry(key.to_string())
			.or_insert_with(|| CacheEntry::new(None, QueryStatus::Idle));
		std::mem::replace(&mut entry.status, QueryStatus::Loading)
	}

	fn restore_status(&self, key: &str, status: QueryStatus) {
		if let Some(entry) = self.cache.borrow_mut().get_mut(key) {
			if entry.status == QueryStatus::Loading {
				entry.status = status;
			}
		}
	}

	/// Bulk-loads a snapshot.
	///
	/// Every key in `snapshot` is replaced by a `Success` entry with a fresh
	/// subscriber set. Keys absent from the snapshot are untouched.
	pub fn hydrate(&self, snapshot: Snapshot) {
		let mut cache = self.cache.borrow_mut();
		let count = snapshot.len();
		for (key, data) in snapshot {
			cache.insert(key, CacheEntry::new(Some(data), QueryStatus::Success));
		}
		tracing::debug!(entries = count, "query cache hydrated");
	}

	/// Exports every entry holding data.
	pub fn dehydrate(&self) -> Snapshot {
		self.cache
			.borrow()
			.iter()
			.filter_map(|(key, entry)| entry.data.clone().map(|data| (key.clone(), data)))
			.collect()
	}
}
