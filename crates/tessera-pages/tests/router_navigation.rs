//! Integration tests for route matching, loaders and navigation.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use futures::channel::oneshot;
use futures::executor::{LocalPool, block_on};
use futures::task::LocalSpawnExt;
use rstest::{fixture, rstest};
use serde_json::{Value, json};
use tessera_pages::router::{
	History, LoaderError, MemoryHistory, NavigationOutcome, RouteDef, RouteProps, RouteStatus, Router,
	RouterOptions,
};
use tessera_pages::{IntoView, Renderer, StringRenderer, View, ViewThunk};
use tessera_reactive::RenderError;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

struct Harness {
	router: Router,
	renderer: StringRenderer,
	history: MemoryHistory,
}

fn harness_with(options: RouterOptions) -> Harness {
	let renderer = StringRenderer::new();
	let history = MemoryHistory::new("/");
	let router = Router::builder(Rc::new(renderer.clone()), Rc::new(history.clone()))
		.options(options)
		.build();
	Harness {
		router,
		renderer,
		history,
	}
}

#[fixture]
fn harness() -> Harness {
	harness_with(RouterOptions::default())
}

fn page(label: &'static str) -> impl Fn(RouteProps) -> Result<View, RenderError> {
	move |_| Ok(View::text(label))
}

fn layout(label: &'static str) -> impl Fn(RouteProps) -> Result<View, RenderError> {
	move |props: RouteProps| Ok(View::element("div").attr("id", label).child(props.outlet()).into_view())
}

fn status_page(props: RouteProps) -> Result<View, RenderError> {
	let text = match (&props.status, &props.data, &props.error) {
		(RouteStatus::Loading, _, _) => "loading".to_string(),
		(RouteStatus::Error, _, Some(err)) => format!("error: {err}"),
		(_, Some(data), _) => data.to_string(),
		_ => "empty".to_string(),
	};
	Ok(View::text(text))
}

#[rstest]
fn test_nested_routes_match_as_ancestor_chain(harness: Harness) {
	// Arrange
	harness
		.router
		.add(RouteDef::new("/a").component(layout("a")).child(RouteDef::new("b").component(page("b"))))
		.unwrap();

	// Act
	let chain = harness.router.match_routes("/a/b");

	// Assert
	let paths: Vec<&str> = chain.iter().map(|matched| matched.route.path()).collect();
	assert_eq!(paths, ["/a", "/a/b"]);
}

#[rstest]
fn test_param_child_captures_one_segment(harness: Harness) {
	// Arrange
	harness
		.router
		.add(RouteDef::new("/a").component(layout("a")).child(RouteDef::new(":id").component(page("item"))))
		.unwrap();

	// Act
	let outcome = block_on(harness.router.navigate_to("/a/x/y")).unwrap();

	// Assert
	assert_eq!(outcome, NavigationOutcome::Navigated("/a/x/y".to_string()));
	let current = harness.router.current_route().unwrap();
	assert_eq!(current.chain.len(), 2);
	assert_eq!(current.params.get("id").map(String::as_str), Some("x"));
}

#[rstest]
fn test_flat_routes_and_not_found(harness: Harness) {
	// Arrange
	harness.router.add_route("/", page("A")).unwrap();
	harness.router.add_route("/about", page("B")).unwrap();

	// Act
	let about: Vec<String> = harness
		.router
		.match_routes("/about")
		.iter()
		.map(|matched| matched.route.path().to_string())
		.collect();
	let missing = harness.router.match_routes("/missing");
	block_on(harness.router.navigate_to("/missing")).unwrap();

	// Assert
	assert_eq!(about, ["/about"]);
	assert!(missing.is_empty());
	assert_eq!(
		harness.renderer.last_html().as_deref(),
		Some("<div>404 - Not Found: /missing</div>")
	);
	assert!(harness.router.current_route().unwrap().is_not_found());
}

#[rstest]
fn test_custom_not_found_receives_pathname(harness: Harness) {
	harness
		.router
		.set_not_found(|pathname| Ok(View::element("h1").child(format!("nothing at {pathname}")).into_view()));

	block_on(harness.router.navigate_to("/nope?x=1")).unwrap();

	assert_eq!(harness.renderer.last_html().as_deref(), Some("<h1>nothing at /nope</h1>"));
}

#[rstest]
fn test_loader_data_and_query_reach_the_page(harness: Harness) {
	// Arrange
	harness
		.router
		.add(
			RouteDef::new("/users/:id")
				.component(status_page)
				.loader(|ctx| async move {
					Ok(json!({
						"id": ctx.params.get("id"),
						"tab": ctx.query.get("tab"),
					}))
				}),
		)
		.unwrap();

	// Act
	block_on(harness.router.navigate_to("/users/7?tab=posts")).unwrap();

	// Assert
	let current = harness.router.current_route().unwrap();
	assert_eq!(current.status, RouteStatus::Success);
	assert_eq!(current.data, Some(json!({"id": "7", "tab": "posts"})));
	assert_eq!(current.query.get("tab").map(String::as_str), Some("posts"));
}

#[rstest]
fn test_loader_failure_still_renders_with_error(harness: Harness) {
	// Arrange
	harness
		.router
		.add(
			RouteDef::new("/broken")
				.component(status_page)
				.loader(|_| async { Err::<Value, _>(LoaderError::from("backend down")) }),
		)
		.unwrap();

	// Act
	block_on(harness.router.navigate_to("/broken")).unwrap();

	// Assert
	let current = harness.router.current_route().unwrap();
	assert_eq!(current.status, RouteStatus::Error);
	assert_eq!(current.error, Some(LoaderError::from("backend down")));
	assert_eq!(harness.renderer.last_html().as_deref(), Some("error: backend down"));
}

#[rstest]
fn test_loading_phase_paints_before_loader_resolves() {
	// Arrange
	let harness = harness_with(RouterOptions {
		render_loading_phase: true,
		..RouterOptions::default()
	});
	harness
		.router
		.add(RouteDef::new("/data").component(status_page).loader(|_| async { Ok(json!(1)) }))
		.unwrap();

	// Act
	block_on(harness.router.navigate_to("/data")).unwrap();

	// Assert
	assert_eq!(harness.renderer.render_count(), 2);
	assert_eq!(harness.renderer.last_html().as_deref(), Some("1"));
}

#[rstest]
fn test_last_navigation_wins(harness: Harness) {
	// Arrange
	let (release, gate) = oneshot::channel::<()>();
	let gate = Rc::new(RefCell::new(Some(gate)));
	harness
		.router
		.add(RouteDef::new("/slow").component(status_page).loader(move |_| {
			let gate = gate.borrow_mut().take();
			async move {
				if let Some(gate) = gate {
					gate.await.map_err(|_| LoaderError::from("gate dropped"))?;
				}
				Ok(json!("slow"))
			}
		}))
		.unwrap();
	harness.router.add_route("/fast", page("fast")).unwrap();

	let mut pool = LocalPool::new();
	let slow_outcome = Rc::new(RefCell::new(None));
	pool.spawner()
		.spawn_local({
			let router = harness.router.clone();
			let slow_outcome = Rc::clone(&slow_outcome);
			async move {
				let outcome = router.navigate_to("/slow").await;
				*slow_outcome.borrow_mut() = Some(outcome);
			}
		})
		.unwrap();
	pool.run_until_stalled();

	// Act
	block_on(harness.router.navigate_to("/fast")).unwrap();
	release.send(()).unwrap();
	pool.run_until_stalled();

	// Assert
	assert_eq!(*slow_outcome.borrow(), Some(Ok(NavigationOutcome::Superseded)));
	assert_eq!(harness.renderer.last_html().as_deref(), Some("fast"));
	assert_eq!(harness.router.current_path().as_deref(), Some("/fast"));
}

#[rstest]
fn test_after_each_sees_previous_path(harness: Harness) {
	// Arrange
	harness.router.add_route("/", page("home")).unwrap();
	harness.router.add_route("/about", page("about")).unwrap();
	let seen = Rc::new(RefCell::new(Vec::new()));
	harness.router.after_each({
		let seen = Rc::clone(&seen);
		move |route, from| {
			seen.borrow_mut()
				.push(format!("{} <- {}", route.location, from.unwrap_or("none")));
		}
	});

	// Act
	block_on(harness.router.init()).unwrap();
	block_on(harness.router.navigate_to("/about")).unwrap();

	// Assert
	assert_eq!(*seen.borrow(), ["/ <- none", "/about <- /"]);
}

#[rstest]
fn test_history_change_rerenders_through_listener() {
	// Arrange
	let renderer = StringRenderer::new();
	let history = MemoryHistory::new("/");
	let mut pool = LocalPool::new();
	let router = Router::builder(Rc::new(renderer.clone()), Rc::new(history.clone()))
		.spawner(Rc::new(pool.spawner()))
		.build();
	router.add_route("/", page("home")).unwrap();
	router.add_route("/about", page("about")).unwrap();
	block_on(router.init()).unwrap();
	block_on(router.navigate_to("/about")).unwrap();

	// Act
	history.back();
	pool.run_until_stalled();

	// Assert
	assert_eq!(renderer.last_html().as_deref(), Some("home"));
	assert_eq!(router.current_path().as_deref(), Some("/"));
}

#[rstest]
fn test_nested_layouts_render_through_outlets(harness: Harness) {
	// Arrange
	harness
		.router
		.add(
			RouteDef::new("/")
				.component(layout("shell"))
				.child(RouteDef::new("settings").component(layout("settings")).child(
					RouteDef::new("profile").component(page("profile")),
				)),
		)
		.unwrap();

	// Act
	block_on(harness.router.navigate_to("/settings/profile")).unwrap();

	// Assert
	assert_eq!(
		harness.renderer.last_html().as_deref(),
		Some("<div id=\"shell\"><div id=\"settings\">profile</div></div>")
	);
	assert_eq!(harness.history.location(), "/settings/profile");
}

fn shell_with_settings(harness: &Harness) {
	harness
		.router
		.add(
			RouteDef::new("/")
				.component(layout("shell"))
				.child(RouteDef::new("settings").component(page("settings"))),
		)
		.unwrap();
}

#[rstest]
fn test_unknown_path_under_root_layout_renders_not_found(harness: Harness) {
	// Arrange
	shell_with_settings(&harness);

	// Act
	block_on(harness.router.navigate_to("/missing")).unwrap();

	// Assert
	assert!(harness.router.current_route().unwrap().is_not_found());
	assert_eq!(
		harness.renderer.last_html().as_deref(),
		Some("<div>404 - Not Found: /missing</div>")
	);
}

#[rstest]
fn test_root_layout_does_not_shadow_later_top_level_route(harness: Harness) {
	// Arrange
	shell_with_settings(&harness);
	harness.router.add_route("/about", page("about")).unwrap();

	// Act
	block_on(harness.router.navigate_to("/about")).unwrap();

	// Assert
	let current = harness.router.current_route().unwrap();
	let chain: Vec<&str> = current.chain.iter().map(|matched| matched.route.path()).collect();
	assert_eq!(chain, ["/about"]);
	assert_eq!(harness.renderer.last_html().as_deref(), Some("about"));
}

#[rstest]
fn test_root_layout_alone_renders_at_root(harness: Harness) {
	// Arrange
	shell_with_settings(&harness);

	// Act
	block_on(harness.router.init()).unwrap();

	// Assert
	assert!(!harness.router.current_route().unwrap().is_not_found());
	assert_eq!(harness.renderer.last_html().as_deref(), Some("<div id=\"shell\"></div>"));
}

/// A tracing layer that captures log lines as `[LEVEL] message`.
struct LogCapture {
	logs: Arc<Mutex<Vec<String>>>,
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for LogCapture {
	fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
		struct MessageVisitor {
			message: String,
		}

		impl tracing::field::Visit for MessageVisitor {
			fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
				if field.name() == "message" {
					self.message = format!("{:?}", value);
				}
			}
		}

		let mut visitor = MessageVisitor {
			message: String::new(),
		};
		event.record(&mut visitor);
		self.logs
			.lock()
			.unwrap()
			.push(format!("[{}] {}", event.metadata().level(), visitor.message));
	}
}

struct DetachedRenderer;

impl Renderer for DetachedRenderer {
	fn render(&self, _view: ViewThunk) -> Result<(), RenderError> {
		Err(RenderError::failed("mount point missing"))
	}
}

#[rstest]
fn test_render_failure_is_logged_and_swallowed() {
	// Arrange
	let logs = Arc::new(Mutex::new(Vec::new()));
	let capture = LogCapture {
		logs: Arc::clone(&logs),
	};
	let _guard = tracing_subscriber::registry().with(capture).set_default();
	let router = Router::new(Rc::new(DetachedRenderer), Rc::new(MemoryHistory::default()));
	router.add_route("/x", page("x")).unwrap();
	let after_each_calls = Rc::new(RefCell::new(0));
	router.after_each({
		let calls = Rc::clone(&after_each_calls);
		move |_, _| *calls.borrow_mut() += 1
	});

	// Act
	let outcome = block_on(router.navigate_to("/x")).unwrap();

	// Assert
	assert_eq!(outcome, NavigationOutcome::Navigated("/x".to_string()));
	assert_eq!(*after_each_calls.borrow(), 0);
	let logs = logs.lock().unwrap();
	assert!(logs.iter().any(|line| line == "[ERROR] route render failed"));
}
