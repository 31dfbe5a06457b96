//! Integration tests for the query cache.

use std::cell::RefCell;
use std::rc::Rc;

use futures::executor::block_on;
use rstest::{fixture, rstest};
use serde_json::{Value, json};
use tessera_pages::query::{QueryClient, QueryEvent, QueryStatus, QueryUpdate, Snapshot};
use tessera_pages::ssr::{DocumentOptions, render_document};

#[fixture]
fn client() -> QueryClient {
	QueryClient::new()
}

fn record(client: &QueryClient, key: &str) -> Rc<RefCell<Vec<QueryEvent>>> {
	let events = Rc::new(RefCell::new(Vec::new()));
	let sink = Rc::clone(&events);
	// Subscriptions stay registered until unsubscribed.
	let _subscription = client.subscribe(key, move |event: &QueryEvent| sink.borrow_mut().push(event.clone()));
	events
}

#[rstest]
fn test_hydrate_of_dehydrated_snapshot_restores_every_key(client: QueryClient) {
	// Arrange
	client.set_query_data("todos:list", json!([{"id": "1", "text": "x"}]));
	client.set_query_data("user", json!({"name": "ada"}));
	let snapshot = Snapshot::from_json(&client.dehydrate().to_json().unwrap()).unwrap();

	// Act
	let fresh = QueryClient::new();
	fresh.hydrate(snapshot);

	// Assert
	for key in ["todos:list", "user"] {
		assert_eq!(fresh.get_query_data(key), client.get_query_data(key));
		assert_eq!(fresh.status(key), Some(QueryStatus::Success));
	}
}

#[rstest]
fn test_invalidate_marks_stale_and_notifies_each_subscriber_once(client: QueryClient) {
	// Arrange
	client.set_query_data("todos", json!(["a"]));
	let first = record(&client, "todos");
	let second = record(&client, "todos");

	// Act
	client.invalidate_queries("todos");

	// Assert
	assert_eq!(client.status("todos"), Some(QueryStatus::Stale));
	assert_eq!(client.get_query_data("todos"), Some(json!(["a"])));
	assert_eq!(first.borrow().len(), 1);
	assert_eq!(second.borrow().len(), 1);
	assert_eq!(first.borrow()[0].status, QueryStatus::Stale);
}

#[rstest]
fn test_invalidate_is_exact_match(client: QueryClient) {
	client.set_query_data("todos:list", json!([]));
	client.set_query_data("todos", json!([]));

	client.invalidate_queries("todos");

	assert_eq!(client.status("todos"), Some(QueryStatus::Stale));
	assert_eq!(client.status("todos:list"), Some(QueryStatus::Success));
}

#[rstest]
fn test_optimistic_append_on_empty_list(client: QueryClient) {
	// Arrange
	client.set_query_data("todos", json!([]));
	let events = record(&client, "todos");

	// Act
	client.set_query_data(
		"todos",
		QueryUpdate::with(|prev| {
			let mut items = prev.as_array().cloned().unwrap_or_default();
			items.push(json!({"id": "temp-1", "text": "x"}));
			Value::Array(items)
		}),
	);

	// Assert
	assert_eq!(client.get_query_data("todos"), Some(json!([{"id": "temp-1", "text": "x"}])));
	assert_eq!(client.status("todos"), Some(QueryStatus::Success));
	assert_eq!(events.borrow().len(), 1);
}

#[rstest]
fn test_prefetch_always_fetches(client: QueryClient) {
	// Arrange
	client.set_query_data("n", json!(1));

	// Act
	let data = block_on(client.prefetch("n", || async { Ok::<_, std::io::Error>(2) })).unwrap();

	// Assert
	assert_eq!(data, json!(2));
	assert_eq!(client.get_query_data("n"), Some(json!(2)));
}

#[rstest]
fn test_prefetch_notifies_only_the_committed_data(client: QueryClient) {
	// Arrange
	let events = record(&client, "n");

	// Act
	block_on(client.prefetch("n", || async { Ok::<_, std::io::Error>(3) })).unwrap();

	// Assert
	let statuses: Vec<QueryStatus> = events.borrow().iter().map(|event| event.status).collect();
	assert_eq!(statuses, [QueryStatus::Success]);
}

#[rstest]
fn test_failed_prefetch_keeps_stale_entry_silent(client: QueryClient) {
	// Arrange
	client.set_query_data("n", json!(1));
	client.invalidate_queries("n");
	let events = record(&client, "n");

	// Act
	let result = block_on(client.prefetch("n", || async {
		Err::<i32, _>(std::io::Error::other("offline"))
	}));

	// Assert
	assert!(result.is_err());
	assert_eq!(client.status("n"), Some(QueryStatus::Stale));
	assert_eq!(client.get_query_data("n"), Some(json!(1)));
	assert!(events.borrow().is_empty());
}

#[rstest]
fn test_document_embeds_dehydrated_cache(client: QueryClient) {
	// Arrange
	client.set_query_data("todos:list", json!([{"id": "1", "text": "</script>"}]));

	// Act
	let html = render_document("<p>hi</p>", &client.dehydrate(), &DocumentOptions::default());

	// Assert
	assert!(html.contains("<title>Todo App</title>"));
	assert!(html.contains("<div id=\"app\"><p>hi</p></div>"));
	assert!(html.contains("window.__STORE__ = {"));
	assert!(!html.contains("\"</script>\""));
}
