//! Router state machine.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use futures::FutureExt;
use serde_json::Value;
use tessera_reactive::{ListenerId, RenderError, Spawner};

use super::history::History;
use super::route::{
	LoaderContext, LoaderError, MatchedRoute, Route, RouteDef, RouteProps, RouteStatus, compose,
	match_routes, merge_params,
};
use super::{HistoryMode, RouterError, RouterOptions};
use crate::render::{Renderer, ViewThunk};
use crate::view::{DomEvent, IntoView, View};

/// Renders unmatched paths. Receives the raw pathname.
pub type NotFound = Rc<dyn Fn(&str) -> Result<View, RenderError>>;

/// Guard consulted before every navigation.
pub type BeforeEach = Rc<dyn Fn(&NavigationRequest) -> NavigationDecision>;

/// Hook fired after every successful render with the previous path.
pub type AfterEach = Rc<dyn Fn(&CurrentRoute, Option<&str>)>;

/// A pending navigation shown to the `before_each` guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRequest {
	/// Target location.
	pub to: String,
	/// Location being left, `None` on the first navigation.
	pub from: Option<String>,
}

/// Verdict of the `before_each` guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationDecision {
	/// Continue to the requested location.
	Proceed,
	/// Navigate somewhere else instead.
	Redirect(String),
	/// Stay where we are.
	Cancel,
}

/// How a navigation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
	/// The location was rendered. Carries the final location after redirects.
	Navigated(String),
	/// The target equals the current location.
	Unchanged,
	/// The guard cancelled the navigation.
	Cancelled,
	/// A newer navigation started while the loader was running.
	Superseded,
}

/// The rendered route.
#[derive(Debug, Clone)]
pub struct CurrentRoute {
	/// Location including the query string.
	pub location: String,
	/// Location without the query string.
	pub pathname: String,
	/// Matched chain, ancestor first. Empty for the not-found page.
	pub chain: Vec<MatchedRoute>,
	/// Parameters merged across the chain.
	pub params: HashMap<String, String>,
	/// Parsed query string.
	pub query: HashMap<String, String>,
	/// Loader status.
	pub status: RouteStatus,
	/// Loader data.
	pub data: Option<Value>,
	/// Loader failure.
	pub error: Option<LoaderError>,
	/// Title of the deepest route declaring one.
	pub title: Option<String>,
}

impl CurrentRoute {
	/// Returns the deepest matched route.
	pub fn route(&self) -> Option<&Rc<Route>> {
		self.chain.last().map(|matched| &matched.route)
	}

	/// Returns whether the not-found page was rendered.
	pub fn is_not_found(&self) -> bool {
		self.chain.is_empty()
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HistoryWrite {
	Push,
	Replace,
	Skip,
}

enum RenderStep {
	Rendered,
	Redirect(String),
	Superseded,
}

struct RouterInner {
	routes: RefCell<Vec<Rc<Route>>>,
	not_found: RefCell<NotFound>,
	before_each: RefCell<Option<BeforeEach>>,
	after_each: RefCell<Option<AfterEach>>,
	renderer: Rc<dyn Renderer>,
	history: Rc<dyn History>,
	spawner: Option<Rc<dyn Spawner>>,
	options: RouterOptions,
	current_path: RefCell<Option<String>>,
	current: RefCell<Option<CurrentRoute>>,
	generation: Cell<u64>,
	listener: Cell<Option<ListenerId>>,
	last_view: RefCell<Option<ViewThunk>>,
}

/// Nested client-side router.
///
/// Cloning yields another handle to the same router.
#[derive(Clone)]
pub struct Router {
	inner: Rc<RouterInner>,
}

impl fmt::Debug for Router {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Router")
			.field("routes", &self.inner.routes.borrow().len())
			.field("current_path", &self.inner.current_path.borrow())
			.field("generation", &self.inner.generation.get())
			.field("options", &self.inner.options)
			.finish()
	}
}

/// Non-owning handle to a [`Router`].
#[derive(Clone)]
pub struct WeakRouter {
	inner: Weak<RouterInner>,
}

impl WeakRouter {
	/// Returns the router if it is still alive.
	pub fn upgrade(&self) -> Option<Router> {
		Router::upgrade(&self.inner)
	}
}

impl fmt::Debug for WeakRouter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WeakRouter")
			.field("alive", &(self.inner.strong_count() > 0))
			.finish()
	}
}

/// Builder for [`Router`].
pub struct RouterBuilder {
	renderer: Rc<dyn Renderer>,
	history: Rc<dyn History>,
	spawner: Option<Rc<dyn Spawner>>,
	options: RouterOptions,
}

impl RouterBuilder {
	/// Sets the router options.
	pub fn options(mut self, options: RouterOptions) -> Self {
		self.options = options;
		self
	}

	/// Sets the spawner driving navigations started by history listeners
	/// and links.
	pub fn spawner(mut self, spawner: Rc<dyn Spawner>) -> Self {
		self.spawner = Some(spawner);
		self
	}

	/// Builds the router.
	pub fn build(self) -> Router {
		Router {
			inner: Rc::new(RouterInner {
				routes: RefCell::new(Vec::new()),
				not_found: RefCell::new(Rc::new(default_not_found)),
				before_each: RefCell::new(None),
				after_each: RefCell::new(None),
				renderer: self.renderer,
				history: self.history,
				spawner: self.spawner,
				options: self.options,
				current_path: RefCell::new(None),
				current: RefCell::new(None),
				generation: Cell::new(0),
				listener: Cell::new(None),
				last_view: RefCell::new(None),
			}),
		}
	}
}

fn default_not_found(pathname: &str) -> Result<View, RenderError> {
	Ok(View::element("div")
		.child(format!("404 - Not Found: {pathname}"))
		.into_view())
}

impl Router {
	/// Creates a router with default options and no spawner.
	pub fn new(renderer: Rc<dyn Renderer>, history: Rc<dyn History>) -> Self {
		Self::builder(renderer, history).build()
	}

	/// Returns a builder.
	pub fn builder(renderer: Rc<dyn Renderer>, history: Rc<dyn History>) -> RouterBuilder {
		RouterBuilder {
			renderer,
			history,
			spawner: None,
			options: RouterOptions::default(),
		}
	}

	/// Returns a handle that does not keep the router alive.
	pub fn downgrade(&self) -> WeakRouter {
		WeakRouter {
			inner: Rc::downgrade(&self.inner),
		}
	}

	/// Registers a flat route.
	///
	/// # Errors
	///
	/// [`RouterError::InvalidPattern`] if `path` does not compile.
	pub fn add_route<F>(&self, path: &str, component: F) -> Result<(), RouterError>
	where
		F: Fn(RouteProps) -> Result<View, RenderError> + 'static,
	{
		self.add(RouteDef::new(path).component(component))
	}

	/// Registers a route tree.
	///
	/// # Errors
	///
	/// [`RouterError::InvalidPattern`] if any path in the tree does not
	/// compile. Nothing is registered in that case.
	pub fn add(&self, def: RouteDef) -> Result<(), RouterError> {
		let route = Route::compile(def)?;
		tracing::debug!(path = %route.path(), children = route.children().len(), "route registered");
		self.inner.routes.borrow_mut().push(route);
		Ok(())
	}

	/// Replaces the not-found page.
	pub fn set_not_found<F>(&self, component: F)
	where
		F: Fn(&str) -> Result<View, RenderError> + 'static,
	{
		*self.inner.not_found.borrow_mut() = Rc::new(component);
	}

	/// Installs the navigation guard.
	pub fn before_each<F>(&self, guard: F)
	where
		F: Fn(&NavigationRequest) -> NavigationDecision + 'static,
	{
		*self.inner.before_each.borrow_mut() = Some(Rc::new(guard));
	}

	/// Installs the post-render hook.
	pub fn after_each<F>(&self, hook: F)
	where
		F: Fn(&CurrentRoute, Option<&str>) + 'static,
	{
		*self.inner.after_each.borrow_mut() = Some(Rc::new(hook));
	}

	/// Returns the registered top-level routes.
	pub fn routes(&self) -> Vec<Rc<Route>> {
		self.inner.routes.borrow().clone()
	}

	/// Matches `pathname` against the registered routes.
	pub fn match_routes(&self, pathname: &str) -> Vec<MatchedRoute> {
		match_routes(&self.inner.routes.borrow(), pathname)
	}

	/// Returns the router options.
	pub fn options(&self) -> &RouterOptions {
		&self.inner.options
	}

	/// Returns the location being rendered or last rendered.
	pub fn current_path(&self) -> Option<String> {
		self.inner.current_path.borrow().clone()
	}

	/// Returns the last rendered route.
	pub fn current_route(&self) -> Option<CurrentRoute> {
		self.inner.current.borrow().clone()
	}

	/// Returns whether a history listener is installed.
	pub fn is_listening(&self) -> bool {
		self.inner.listener.get().is_some()
	}

	/// Wires the history listener (once) and renders the current location.
	///
	/// # Errors
	///
	/// [`RouterError::RedirectLoop`] if redirects do not settle.
	pub async fn init(&self) -> Result<NavigationOutcome, RouterError> {
		if self.inner.listener.get().is_none() {
			let router = Rc::downgrade(&self.inner);
			let id = self.inner.history.listen(Box::new(move |location| {
				if let Some(router) = Router::upgrade(&router) {
					router.spawn_sync(location.to_string());
				}
			}));
			self.inner.listener.set(Some(id));
			tracing::debug!("history listener installed");
		}
		self.sync_to_location().await
	}

	/// Renders whatever location the history currently reports.
	///
	/// The guard is not consulted, matching a back/forward step.
	///
	/// # Errors
	///
	/// [`RouterError::RedirectLoop`] if redirects do not settle.
	pub async fn sync_to_location(&self) -> Result<NavigationOutcome, RouterError> {
		let location = self.inner.history.location();
		let from = self.current_path();
		self.run_navigation(location, from, HistoryWrite::Skip, false).await
	}

	/// Navigates to `url`.
	///
	/// A no-op when `url` is the current location. Otherwise the guard is
	/// consulted, the location is pushed onto the history and the route is
	/// rendered.
	///
	/// # Errors
	///
	/// [`RouterError::RedirectLoop`] if guard or route redirects exceed
	/// [`RouterOptions::max_redirects`].
	pub async fn navigate_to(&self, url: &str) -> Result<NavigationOutcome, RouterError> {
		let from = self.current_path();
		if from.as_deref() == Some(url) {
			tracing::trace!(url, "navigation to current location ignored");
			return Ok(NavigationOutcome::Unchanged);
		}
		self.run_navigation(url.to_string(), from, HistoryWrite::Push, true).await
	}

	/// Starts [`navigate_to`](Self::navigate_to) on the spawner.
	///
	/// Returns `false` when no spawner is configured.
	pub fn navigate(&self, url: impl Into<String>) -> bool {
		let router = self.clone();
		let url = url.into();
		self.spawn(async move {
			if let Err(err) = router.navigate_to(&url).await {
				tracing::error!(error = %err, "navigation failed");
			}
		})
	}

	/// Renders the current location again, re-running its loader.
	///
	/// # Errors
	///
	/// [`RouterError::RedirectLoop`] if redirects do not settle.
	pub async fn reload(&self) -> Result<NavigationOutcome, RouterError> {
		match self.current_path() {
			Some(location) => self.run_navigation(location, None, HistoryWrite::Skip, false).await,
			None => self.sync_to_location().await,
		}
	}

	/// Repaints the last rendered tree without running loaders.
	pub fn rerender(&self) {
		if let Err(err) = self.repaint() {
			tracing::error!(error = %err, "route rerender failed");
		}
	}

	/// Paints the last rendered tree again.
	///
	/// This is the render entry point handed to the scheduler so that hook
	/// state changes repaint the active route.
	///
	/// # Errors
	///
	/// Whatever the renderer reports.
	pub fn repaint(&self) -> Result<(), RenderError> {
		let thunk = self.inner.last_view.borrow().clone();
		match thunk {
			Some(thunk) => self.inner.renderer.render(thunk),
			None => Ok(()),
		}
	}

	/// Decides whether a click on a link to `href` is handled by the router.
	///
	/// Returns the location to navigate to, or `None` to let the browser
	/// follow the link. Links with a `target` attribute are never handled.
	pub fn intercept_link(&self, href: &str, has_target: bool) -> Option<String> {
		if has_target || href.is_empty() {
			return None;
		}
		match self.inner.options.mode {
			HistoryMode::Hash => {
				if let Some(path) = href.strip_prefix('#').filter(|path| path.starts_with('/')) {
					Some(path.to_string())
				} else if href.starts_with('/') {
					Some(href.to_string())
				} else {
					None
				}
			}
			HistoryMode::Path => {
				if href.starts_with('/') {
					return Some(href.to_string());
				}
				let origin = self.inner.options.origin.as_deref()?;
				let rest = href.strip_prefix(origin)?;
				if rest.is_empty() {
					Some("/".to_string())
				} else if rest.starts_with('/') {
					Some(rest.to_string())
				} else {
					None
				}
			}
		}
	}

	/// Builds an anchor that navigates through the router when clicked.
	pub fn link(&self, to: impl Into<String>, label: impl IntoView) -> View {
		let to = to.into();
		let router = Rc::downgrade(&self.inner);
		let target = to.clone();
		View::element("a")
			.attr("href", to)
			.on("click", move |_event: &DomEvent| {
				let Some(router) = Router::upgrade(&router) else {
					return;
				};
				if let Some(location) = router.intercept_link(&target, false) {
					router.navigate(location);
				}
			})
			.child(label)
			.into_view()
	}

	fn upgrade(inner: &Weak<RouterInner>) -> Option<Self> {
		inner.upgrade().map(|inner| Self { inner })
	}

	fn spawn(&self, future: impl std::future::Future<Output = ()> + 'static) -> bool {
		match &self.inner.spawner {
			Some(spawner) => {
				spawner.spawn(future.boxed_local());
				true
			}
			None => {
				tracing::warn!("router has no spawner; navigation dropped");
				false
			}
		}
	}

	fn spawn_sync(&self, location: String) {
		let router = self.clone();
		self.spawn(async move {
			let from = router.current_path();
			if from.as_deref() == Some(location.as_str()) {
				return;
			}
			if let Err(err) = router.run_navigation(location, from, HistoryWrite::Skip, false).await {
				tracing::error!(error = %err, "history navigation failed");
			}
		});
	}

	fn count_hop(&self, hops: usize, target: &str) -> Result<usize, RouterError> {
		let hops = hops + 1;
		if hops > self.inner.options.max_redirects {
			tracing::error!(path = target, hops, "redirect limit exceeded");
			return Err(RouterError::RedirectLoop {
				path: target.to_string(),
				hops,
			});
		}
		Ok(hops)
	}

	async fn run_navigation(
		&self,
		mut target: String,
		from: Option<String>,
		mut write: HistoryWrite,
		mut guarded: bool,
	) -> Result<NavigationOutcome, RouterError> {
		let mut hops = 0;
		loop {
			if guarded {
				let guard = self.inner.before_each.borrow().clone();
				let decision = match guard {
					Some(guard) => guard(&NavigationRequest {
						to: target.clone(),
						from: from.clone(),
					}),
					None => NavigationDecision::Proceed,
				};
				match decision {
					NavigationDecision::Proceed => {}
					NavigationDecision::Cancel => {
						tracing::debug!(to = %target, "navigation cancelled by guard");
						return Ok(NavigationOutcome::Cancelled);
					}
					NavigationDecision::Redirect(next) => {
						tracing::debug!(from = %target, to = %next, "guard redirected navigation");
						hops = self.count_hop(hops, &next)?;
						if from.as_deref() == Some(next.as_str()) {
							return Ok(NavigationOutcome::Unchanged);
						}
						target = next;
						continue;
					}
				}
			}

			match write {
				HistoryWrite::Push => self.inner.history.push(&target),
				HistoryWrite::Replace => self.inner.history.replace(&target),
				HistoryWrite::Skip => {}
			}

			match self.render_route(&target, from.as_deref()).await {
				RenderStep::Rendered => return Ok(NavigationOutcome::Navigated(target)),
				RenderStep::Superseded => return Ok(NavigationOutcome::Superseded),
				RenderStep::Redirect(next) => {
					tracing::debug!(from = %target, to = %next, "route redirect");
					hops = self.count_hop(hops, &next)?;
					target = next;
					write = HistoryWrite::Replace;
					guarded = true;
				}
			}
		}
	}

	async fn render_route(&self, location: &str, from: Option<&str>) -> RenderStep {
		let generation = self.inner.generation.get() + 1;
		self.inner.generation.set(generation);
		*self.inner.current_path.borrow_mut() = Some(location.to_string());

		let (pathname, search) = location.split_once('?').unwrap_or((location, ""));
		let query = parse_query(search);
		let chain = self.match_routes(pathname);

		let Some(deepest) = chain.last().map(|matched| Rc::clone(&matched.route)) else {
			tracing::debug!(pathname, "no route matched");
			let not_found = self.inner.not_found.borrow().clone();
			let missing = pathname.to_string();
			let thunk: ViewThunk = Rc::new(move || {
				let not_found = Rc::clone(&not_found);
				let missing = missing.clone();
				View::component("not-found", move || not_found(&missing))
			});
			let current = CurrentRoute {
				location: location.to_string(),
				pathname: pathname.to_string(),
				chain,
				params: HashMap::new(),
				query,
				status: RouteStatus::Success,
				data: None,
				error: None,
				title: None,
			};
			self.commit(thunk, current, from);
			return RenderStep::Rendered;
		};

		if let Some(redirect) = deepest.redirect() {
			return RenderStep::Redirect(redirect.to_string());
		}

		let params = merge_params(&chain);
		let mut props = RouteProps::default();
		props.params = params.clone();
		props.query = query.clone();
		props.status = RouteStatus::Success;

		if let Some(loader) = deepest.loader().cloned() {
			if self.inner.options.render_loading_phase {
				let mut loading = props.clone();
				loading.status = RouteStatus::Loading;
				self.paint(route_thunk(&chain, loading));
			}

			tracing::debug!(route = %deepest.path(), "running route loader");
			let result = loader(LoaderContext {
				params: params.clone(),
				query: query.clone(),
				route_path: deepest.path().to_string(),
				meta: deepest.meta().clone(),
			})
			.await;

			if self.inner.generation.get() != generation {
				tracing::debug!(location, "discarding loader result of superseded navigation");
				return RenderStep::Superseded;
			}

			match result {
				Ok(data) => props.data = Some(data),
				Err(err) => {
					tracing::warn!(route = %deepest.path(), error = %err, "route loader failed");
					props.status = RouteStatus::Error;
					props.error = Some(err);
				}
			}
		}

		let current = CurrentRoute {
			location: location.to_string(),
			pathname: pathname.to_string(),
			params,
			query,
			status: props.status,
			data: props.data.clone(),
			error: props.error.clone(),
			title: chain
				.iter()
				.rev()
				.find_map(|matched| matched.route.title().map(str::to_string)),
			chain: chain.clone(),
		};
		self.commit(route_thunk(&chain, props), current, from);
		RenderStep::Rendered
	}

	fn commit(&self, thunk: ViewThunk, current: CurrentRoute, from: Option<&str>) {
		let painted = self.paint(thunk);
		tracing::debug!(location = %current.location, status = ?current.status, "route rendered");
		*self.inner.current.borrow_mut() = Some(current.clone());
		if painted {
			let hook = self.inner.after_each.borrow().clone();
			if let Some(hook) = hook {
				hook(&current, from);
			}
		}
	}

	fn paint(&self, thunk: ViewThunk) -> bool {
		*self.inner.last_view.borrow_mut() = Some(Rc::clone(&thunk));
		match self.inner.renderer.render(thunk) {
			Ok(()) => true,
			Err(err) => {
				tracing::error!(error = %err, "route render failed");
				false
			}
		}
	}
}

impl Drop for RouterInner {
	fn drop(&mut self) {
		if let Some(id) = self.listener.take() {
			self.history.unlisten(id);
		}
	}
}

fn route_thunk(chain: &[MatchedRoute], props: RouteProps) -> ViewThunk {
	let tree = compose(chain);
	Rc::new(move || tree(props.clone()))
}

fn parse_query(search: &str) -> HashMap<String, String> {
	if search.is_empty() {
		return HashMap::new();
	}
	match serde_urlencoded::from_str::<Vec<(String, String)>>(search) {
		Ok(pairs) => pairs.into_iter().collect(),
		Err(err) => {
			tracing::warn!(search, error = %err, "ignoring malformed query string");
			HashMap::new()
		}
	}
}
