//! # Tessera
//!
//! A small client-side application runtime: hook-based components, batched
//! rendering, a keyed query cache and a nested router.
//!
//! This crate re-exports the building blocks and adds the application layer:
//!
//! - [`settings`]: TOML settings
//! - [`logging`]: subscriber installation
//! - [`app`]: the [`App`] bundle wiring runtime, cache and router
//! - [`todo`]: the todo list page
//! - [`server`]: server rendering with an embedded cache snapshot
//!
//! ## Quick start
//!
//! ```ignore
//! use tessera::prelude::*;
//!
//! let settings = Settings::from_file("tessera.toml")?;
//! tessera::logging::init(&settings.logging)?;
//!
//! let app = App::new(settings);
//! let page = TodoPage::new(app.hooks().clone(), app.client().clone(), Rc::new(InMemoryTodoStore::new()));
//! app.router().add(page.route("/"))?;
//! app.start();
//! app.run_until_idle();
//! ```

pub mod app;
pub mod logging;
pub mod server;
pub mod settings;
pub mod todo;

pub use tessera_pages as pages;
pub use tessera_reactive as reactive;

pub use app::App;
pub use settings::{LogSettings, Settings, SettingsError};

/// Commonly used items.
pub mod prelude {
	pub use crate::app::App;
	pub use crate::settings::Settings;
	pub use crate::todo::{TODOS_KEY, TodoPage};
	pub use tessera_pages::api::{InMemoryTodoStore, Todo, TodoApi};
	pub use tessera_pages::router::{NavigationDecision, RouteDef, RouteProps, Router};
	pub use tessera_pages::{DomEvent, IntoView, QueryClient, QueryStatus, View, use_query};
	pub use tessera_reactive::{Hooks, RenderError, Runtime};
}
