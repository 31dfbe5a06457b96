//! Route definitions, matching and outlet composition.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tessera_reactive::RenderError;

use super::RouterError;
use super::pattern::{PathPattern, join_paths};
use crate::view::View;

/// A route component.
pub type RouteComponent = Rc<dyn Fn(RouteProps) -> Result<View, RenderError>>;

/// A route data loader.
pub type Loader = Rc<dyn Fn(LoaderContext) -> LocalBoxFuture<'static, Result<Value, LoaderError>>>;

type OutletFn = Rc<dyn Fn(Map<String, Value>) -> View>;

/// Error produced by a route loader.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct LoaderError {
	message: String,
}

impl LoaderError {
	/// Creates a loader error.
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
		}
	}

	/// Returns the error message.
	pub fn message(&self) -> &str {
		&self.message
	}
}

impl From<&str> for LoaderError {
	fn from(message: &str) -> Self {
		Self::new(message)
	}
}

impl From<String> for LoaderError {
	fn from(message: String) -> Self {
		Self::new(message)
	}
}

/// Lifecycle status of the rendered route's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteStatus {
	/// Nothing rendered yet.
	#[default]
	Idle,
	/// The loader is running.
	Loading,
	/// Ready; the loader (if any) succeeded.
	Success,
	/// The loader failed; see [`RouteProps::error`].
	Error,
}

/// Input passed to a [`Loader`].
#[derive(Debug, Clone)]
pub struct LoaderContext {
	/// Path parameters merged across the matched chain.
	pub params: HashMap<String, String>,
	/// Parsed query string.
	pub query: HashMap<String, String>,
	/// Full path of the route owning the loader.
	pub route_path: String,
	/// Meta of the route owning the loader.
	pub meta: Map<String, Value>,
}

/// Props every route component receives.
#[derive(Clone, Default)]
pub struct RouteProps {
	/// Path parameters merged across the matched chain.
	pub params: HashMap<String, String>,
	/// Parsed query string.
	pub query: HashMap<String, String>,
	/// Data returned by the deepest route's loader.
	pub data: Option<Value>,
	/// Loader status.
	pub status: RouteStatus,
	/// Loader failure, when `status` is [`RouteStatus::Error`].
	pub error: Option<LoaderError>,
	/// Extra props merged in by an ancestor through [`outlet_with`](Self::outlet_with).
	pub extra: Map<String, Value>,
	outlet: Option<OutletFn>,
}

impl fmt::Debug for RouteProps {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RouteProps")
			.field("params", &self.params)
			.field("query", &self.query)
			.field("data", &self.data)
			.field("status", &self.status)
			.field("error", &self.error)
			.field("extra", &self.extra)
			.field("has_outlet", &self.outlet.is_some())
			.finish()
	}
}

impl RouteProps {
	/// Returns a path parameter.
	pub fn param(&self, name: &str) -> Option<&str> {
		self.params.get(name).map(String::as_str)
	}

	/// Renders the next deeper route of the matched chain.
	///
	/// Renders nothing at the deepest route.
	pub fn outlet(&self) -> View {
		self.outlet_with(Map::new())
	}

	/// Like [`outlet`](Self::outlet), merging `extra` into the child's props.
	pub fn outlet_with(&self, extra: Map<String, Value>) -> View {
		match &self.outlet {
			Some(outlet) => outlet(extra),
			None => View::Empty,
		}
	}

	/// Returns whether a deeper route exists.
	pub fn has_outlet(&self) -> bool {
		self.outlet.is_some()
	}
}

/// Builder describing a route.
///
/// # Example
///
/// ```ignore
/// let def = RouteDef::new("/users")
///     .component(users_layout)
///     .child(RouteDef::new(":id").component(user_detail).loader(load_user))
///     .meta("requires_auth", true);
/// router.add(def)?;
/// ```
#[derive(Clone, Default)]
pub struct RouteDef {
	path: String,
	component: Option<RouteComponent>,
	loader: Option<Loader>,
	children: Vec<RouteDef>,
	meta: Map<String, Value>,
	redirect: Option<String>,
	title: Option<String>,
}

impl fmt::Debug for RouteDef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RouteDef")
			.field("path", &self.path)
			.field("has_component", &self.component.is_some())
			.field("has_loader", &self.loader.is_some())
			.field("children", &self.children)
			.field("meta", &self.meta)
			.field("redirect", &self.redirect)
			.field("title", &self.title)
			.finish()
	}
}

impl RouteDef {
	/// Starts a definition for `path`. Child paths are relative to the parent.
	pub fn new(path: impl Into<String>) -> Self {
		Self {
			path: path.into(),
			..Self::default()
		}
	}

	/// Sets the component.
	pub fn component<F>(mut self, component: F) -> Self
	where
		F: Fn(RouteProps) -> Result<View, RenderError> + 'static,
	{
		self.component = Some(Rc::new(component));
		self
	}

	/// Sets the data loader. Only the deepest matched route's loader runs.
	pub fn loader<F, Fut>(mut self, loader: F) -> Self
	where
		F: Fn(LoaderContext) -> Fut + 'static,
		Fut: Future<Output = Result<Value, LoaderError>> + 'static,
	{
		self.loader = Some(Rc::new(move |context| loader(context).boxed_local()));
		self
	}

	/// Adds a child route.
	pub fn child(mut self, child: RouteDef) -> Self {
		self.children.push(child);
		self
	}

	/// Adds child routes.
	pub fn children(mut self, children: impl IntoIterator<Item = RouteDef>) -> Self {
		self.children.extend(children);
		self
	}

	/// Adds a meta entry.
	pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.meta.insert(key.into(), value.into());
		self
	}

	/// Redirects to `target` instead of rendering.
	pub fn redirect(mut self, target: impl Into<String>) -> Self {
		self.redirect = Some(target.into());
		self
	}

	/// Sets the document title shown while the route is active.
	pub fn title(mut self, title: impl Into<String>) -> Self {
		self.title = Some(title.into());
		self
	}
}

/// A compiled route.
pub struct Route {
	path: String,
	pattern: PathPattern,
	component: Option<RouteComponent>,
	loader: Option<Loader>,
	children: Vec<Rc<Route>>,
	parent: Option<String>,
	meta: Map<String, Value>,
	redirect: Option<String>,
	title: Option<String>,
}

impl fmt::Debug for Route {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Route")
			.field("path", &self.path)
			.field("pattern", &self.pattern)
			.field("parent", &self.parent)
			.field("children", &self.children)
			.field("has_loader", &self.loader.is_some())
			.field("redirect", &self.redirect)
			.finish()
	}
}

impl Route {
	/// Compiles a top-level definition and its descendants.
	pub(crate) fn compile(def: RouteDef) -> Result<Rc<Self>, RouterError> {
		Self::compile_nested(def, None)
	}

	fn compile_nested(def: RouteDef, parent: Option<&str>) -> Result<Rc<Self>, RouterError> {
		let path = match parent {
			Some(parent) => join_paths(parent, &def.path),
			None => def.path,
		};
		// Leaf routes registered at the top level must match the whole path.
		let exact = parent.is_none() && def.children.is_empty();
		let pattern = PathPattern::new(&path, exact)?;
		let children = def
			.children
			.into_iter()
			.map(|child| Self::compile_nested(child, Some(&path)))
			.collect::<Result<Vec<_>, _>>()?;

		Ok(Rc::new(Self {
			pattern,
			component: def.component,
			loader: def.loader,
			children,
			parent: parent.map(str::to_string),
			meta: def.meta,
			redirect: def.redirect,
			title: def.title,
			path,
		}))
	}

	/// Returns the full path.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// Returns the compiled pattern.
	pub fn pattern(&self) -> &PathPattern {
		&self.pattern
	}

	/// Returns the child routes.
	pub fn children(&self) -> &[Rc<Route>] {
		&self.children
	}

	/// Returns the parent route's full path.
	pub fn parent(&self) -> Option<&str> {
		self.parent.as_deref()
	}

	/// Returns the route meta.
	pub fn meta(&self) -> &Map<String, Value> {
		&self.meta
	}

	/// Returns the redirect target.
	pub fn redirect(&self) -> Option<&str> {
		self.redirect.as_deref()
	}

	/// Returns the route title.
	pub fn title(&self) -> Option<&str> {
		self.title.as_deref()
	}

	/// Returns whether the route has a loader.
	pub fn has_loader(&self) -> bool {
		self.loader.is_some()
	}

	pub(crate) fn loader(&self) -> Option<&Loader> {
		self.loader.as_ref()
	}
}

/// One level of a matched route chain.
#[derive(Debug, Clone)]
pub struct MatchedRoute {
	/// The matched route.
	pub route: Rc<Route>,
	/// Parameters captured by this route's own pattern.
	pub params: HashMap<String, String>,
}

/// Matches `pathname` against `routes`.
///
/// At each level routes are tried in registration order and their children
/// searched beneath them. A route with children only matches when one of
/// its descendants matches or its own pattern covers the whole path;
/// otherwise the next sibling is tried. Returns the chain from ancestor to
/// descendant; empty when nothing matches.
pub fn match_routes(routes: &[Rc<Route>], pathname: &str) -> Vec<MatchedRoute> {
	match_level(routes, pathname).unwrap_or_default()
}

fn match_level(level: &[Rc<Route>], pathname: &str) -> Option<Vec<MatchedRoute>> {
	level.iter().find_map(|route| {
		let params = route.pattern.matches(pathname)?;
		let mut chain = vec![MatchedRoute {
			route: Rc::clone(route),
			params,
		}];
		if !route.children.is_empty() {
			match match_level(route.children(), pathname) {
				Some(descendants) => chain.extend(descendants),
				None if route.pattern.covers(pathname) => {}
				None => return None,
			}
		}
		Some(chain)
	})
}

/// Merges the parameters of a chain; deeper routes win on conflicts.
pub fn merge_params(chain: &[MatchedRoute]) -> HashMap<String, String> {
	chain
		.iter()
		.flat_map(|matched| matched.params.clone())
		.collect()
}

/// Builds the rendering function for a matched chain.
///
/// Each route becomes a component occurrence whose props carry an outlet
/// rendering the next deeper route with the same props plus any extras.
/// A route without a component renders its outlet directly.
pub(crate) fn compose(chain: &[MatchedRoute]) -> Rc<dyn Fn(RouteProps) -> View> {
	let mut node: Option<Rc<dyn Fn(RouteProps) -> View>> = None;
	for matched in chain.iter().rev() {
		let child = node.take();
		let route = Rc::clone(&matched.route);
		node = Some(Rc::new(move |props: RouteProps| {
			let mut own = props.clone();
			own.outlet = child.as_ref().map(|child| {
				let child = Rc::clone(child);
				let outlet: OutletFn = Rc::new(move |extra: Map<String, Value>| {
					let mut next = props.clone();
					next.extra.extend(extra);
					child(next)
				});
				outlet
			});
			match &route.component {
				Some(component) => {
					let component = Rc::clone(component);
					View::component(route.path().to_string(), move || component(own.clone()))
				}
				None => own.outlet(),
			}
		}));
	}
	node.unwrap_or_else(|| Rc::new(|_| View::Empty))
}
