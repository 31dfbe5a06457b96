//! # Tessera Pages
//!
//! Views, server rendering, the query cache and the router for Tessera.
//!
//! Components are plain closures returning a [`View`]. They reach hook state
//! through a [`Hooks`](tessera_reactive::Hooks) handle captured at
//! construction; the [`MemoryRenderer`](render::MemoryRenderer) (or a DOM
//! renderer implementing [`Renderer`](render::Renderer)) keeps one hook
//! instance per component occurrence.
//!
//! ## Modules
//!
//! - [`view`]: view tree and element builders
//! - [`ssr`]: HTML serialization and the hydration document shell
//! - [`query`]: keyed async data cache and [`use_query`](query::use_query)
//! - [`router`]: nested routes, loaders and guards
//! - [`render`]: the render capability and in-memory renderers
//! - [`api`]: todo CRUD collaborator

pub mod api;
pub mod query;
pub mod render;
pub mod router;
pub mod ssr;
pub mod view;

pub use query::{QueryClient, QueryError, QueryResult, QueryStatus, Snapshot, use_query};
pub use render::{MemoryRenderer, NodeCleanups, Renderer, StringRenderer, ViewThunk};
pub use router::{
	HistoryMode, MemoryHistory, NavigationDecision, NavigationOutcome, RouteDef, RouteProps,
	RouteStatus, Router, RouterError, RouterOptions,
};
pub use ssr::{DocumentOptions, render_document, render_to_string};
pub use view::{DomEvent, IntoView, View};
