//! Client-side router.
//!
//! Routes are registered as a tree of [`RouteDef`]s. A navigation resolves
//! the matched chain, awaits the deepest route's loader, then paints the
//! composed tree through the [`Renderer`](crate::render::Renderer)
//! capability:
//!
//! ```text
//! Idle -> Matching -> (Loading -> Loaded | LoadError) -> Rendered
//! ```
//!
//! Navigations carry a generation number; a loader result that arrives after
//! a newer navigation started is discarded, so the last navigation wins.

mod core;
mod history;
mod pattern;
mod route;

use serde::{Deserialize, Serialize};

pub use self::core::{
	AfterEach, BeforeEach, CurrentRoute, NavigationDecision, NavigationOutcome, NavigationRequest,
	NotFound, Router, RouterBuilder, WeakRouter,
};
pub use history::{History, MemoryHistory};
pub use pattern::PathPattern;
pub use route::{
	Loader, LoaderContext, LoaderError, MatchedRoute, Route, RouteComponent, RouteDef, RouteProps,
	RouteStatus, match_routes, merge_params,
};

/// Errors raised by the router.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouterError {
	/// A route path could not be compiled.
	#[error("invalid route pattern `{pattern}`: {reason}")]
	InvalidPattern {
		/// The offending path.
		pattern: String,
		/// Why it was rejected.
		reason: String,
	},

	/// Redirects kept bouncing past the configured limit.
	#[error("redirect loop detected while navigating to `{path}` ({hops} hops)")]
	RedirectLoop {
		/// The last redirect target.
		path: String,
		/// Redirects followed before giving up.
		hops: usize,
	},
}

/// How locations are written to the address bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryMode {
	/// `#/path` fragments.
	#[default]
	Hash,
	/// Real paths through the history API.
	Path,
}

/// Router configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterOptions {
	/// Address bar mode, used for link interception.
	pub mode: HistoryMode,
	/// Paint once with `RouteStatus::Loading` before awaiting a loader.
	pub render_loading_phase: bool,
	/// Document origin; absolute links on it are intercepted in path mode.
	pub origin: Option<String>,
	/// Maximum redirects followed by one navigation.
	pub max_redirects: usize,
}

impl Default for RouterOptions {
	fn default() -> Self {
		Self {
			mode: HistoryMode::Hash,
			render_loading_phase: false,
			origin: None,
			max_redirects: 8,
		}
	}
}
