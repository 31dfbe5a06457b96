//! The todo page.
//!
//! Lists todos through the query cache and edits them optimistically: the
//! cache is updated first, the backend call runs in the background, and the
//! list is invalidated so it refetches from the backend afterwards.

use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use futures::FutureExt;
use serde_json::{Value, json};
use tessera_pages::api::{TEMP_ID_PREFIX, Todo, TodoApi};
use tessera_pages::query::QueryUpdate;
use tessera_pages::{DomEvent, IntoView, QueryClient, RouteDef, View, use_query};
use tessera_reactive::{Hooks, RenderError};

/// Cache key of the todo list.
pub const TODOS_KEY: &str = "todos:list";

/// Todo list component.
#[derive(Clone)]
pub struct TodoPage {
	hooks: Hooks,
	client: QueryClient,
	api: Rc<dyn TodoApi>,
}

impl std::fmt::Debug for TodoPage {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TodoPage").finish_non_exhaustive()
	}
}

impl TodoPage {
	/// Creates the page.
	pub fn new(hooks: Hooks, client: QueryClient, api: Rc<dyn TodoApi>) -> Self {
		Self { hooks, client, api }
	}

	/// Returns the page as a component occurrence.
	pub fn view(&self) -> View {
		let page = self.clone();
		View::component("todo-app", move || page.render())
	}

	/// Returns a route rendering the page at `path`.
	pub fn route(&self, path: &str) -> RouteDef {
		let page = self.clone();
		RouteDef::new(path).title("Todo App").component(move |_| Ok(page.view()))
	}

	fn render(&self) -> Result<View, RenderError> {
		let api = Rc::clone(&self.api);
		let todos = use_query(&self.hooks, &self.client, TODOS_KEY, move || {
			let api = Rc::clone(&api);
			async move { api.list().await }
		})?;
		let (input, set_input) = self.hooks.use_state(String::new())?;

		let refetch = todos.refetch.clone();
		let stale = todos.stale;
		self.hooks.use_effect(
			move || {
				if stale {
					refetch.refetch();
				}
				None::<fn()>
			},
			Some(stale),
		)?;

		if todos.is_loading() {
			return Ok(View::element("p").child("Loading todos...").into_view());
		}

		let items: Vec<Todo> = todos.data_as().unwrap_or_else(|err| {
			tracing::warn!(error = %err, "todo list has an unexpected shape");
			Vec::new()
		});

		let on_input = {
			let set_input = set_input.clone();
			move |event: &DomEvent| set_input.set(event.value.clone().unwrap_or_default())
		};

		let on_add = {
			let page = self.clone();
			let input = input.clone();
			move |_: &DomEvent| {
				page.add(&input);
				set_input.set(String::new());
			}
		};

		let list = items.into_iter().map(|todo| {
			let page = self.clone();
			let id = todo.id.clone();
			View::element("li").child(View::element("span").child(todo.text)).child(
				View::element("button")
					.attr("id", format!("todo-remove-{}", todo.id))
					.on("click", move |_| page.remove(&id))
					.child("×"),
			)
		});

		Ok(View::element("div")
			.class("todo-app")
			.child(View::element("h1").child("Todo App"))
			.child(
				View::element("input")
					.attr("id", "todo-input")
					.attr("value", input)
					.on("input", on_input),
			)
			.child(
				View::element("button")
					.attr("id", "todo-add")
					.on("click", on_add)
					.child("Add"),
			)
			.child(View::element("ul").children(list))
			.into_view())
	}

	fn add(&self, text: &str) {
		if text.trim().is_empty() {
			return;
		}
		let placeholder = Todo::new(format!("{TEMP_ID_PREFIX}{}", now_millis()), text);
		self.client.set_query_data(
			TODOS_KEY,
			QueryUpdate::with(move |prev| {
				let mut items = prev.as_array().cloned().unwrap_or_default();
				items.push(json!({ "id": placeholder.id, "text": placeholder.text }));
				Value::Array(items)
			}),
		);

		let api = Rc::clone(&self.api);
		let client = self.client.clone();
		let text = text.to_string();
		self.hooks.spawn(
			async move {
				if let Err(err) = api.create(&text).await {
					tracing::warn!(error = %err, "creating todo failed");
				}
				client.invalidate_queries(TODOS_KEY);
			}
			.boxed_local(),
		);
	}

	fn remove(&self, id: &str) {
		let removed = id.to_string();
		self.client.set_query_data(
			TODOS_KEY,
			QueryUpdate::with(move |prev| {
				let items = prev.as_array().cloned().unwrap_or_default();
				Value::Array(
					items
						.into_iter()
						.filter(|item| item.get("id").and_then(Value::as_str) != Some(removed.as_str()))
						.collect(),
				)
			}),
		);

		let api = Rc::clone(&self.api);
		let client = self.client.clone();
		let id = id.to_string();
		self.hooks.spawn(
			async move {
				if let Err(err) = api.remove(&id).await {
					tracing::warn!(%id, error = %err, "removing todo failed");
					client.invalidate_queries(TODOS_KEY);
				}
			}
			.boxed_local(),
		);
	}
}

fn now_millis() -> u128 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|elapsed| elapsed.as_millis())
		.unwrap_or_default()
}
