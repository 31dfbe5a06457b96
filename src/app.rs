//! Application bundle.
//!
//! [`App`] wires one runtime, query cache, history, renderer and router
//! together. Hook state changes repaint the active route through the
//! scheduler; navigations and fetches run on the runtime's local pool.
//!
//! ```ignore
//! let app = App::new(Settings::default());
//! let page = TodoPage::new(app.hooks().clone(), app.client().clone(), api);
//! app.router().add(page.route("/"))?;
//! app.start();
//! app.run_until_idle();
//! ```

use std::rc::Rc;

use futures::FutureExt;
use tessera_pages::{
	DocumentOptions, DomEvent, MemoryHistory, MemoryRenderer, NodeCleanups, QueryClient, QueryError,
	Router, Snapshot, render_document,
};
use tessera_reactive::{Hooks, RenderError, Runtime};

use crate::settings::Settings;

/// A running application.
#[derive(Clone)]
pub struct App {
	runtime: Runtime,
	client: QueryClient,
	history: MemoryHistory,
	renderer: MemoryRenderer,
	router: Router,
	document: DocumentOptions,
}

impl std::fmt::Debug for App {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("App")
			.field("runtime", &self.runtime)
			.field("router", &self.router)
			.field("renderer", &self.renderer)
			.finish_non_exhaustive()
	}
}

impl App {
	/// Creates an application positioned at `/`.
	pub fn new(settings: Settings) -> Self {
		Self::with_location(settings, "/")
	}

	/// Creates an application whose history starts at `location`.
	pub fn with_location(settings: Settings, location: &str) -> Self {
		let cleanups = NodeCleanups::new();
		let runtime = Runtime::builder()
			.cleanup_registry(Rc::new(cleanups.clone()))
			.build();
		let renderer = MemoryRenderer::new(runtime.clone(), cleanups);
		let history = MemoryHistory::new(location);
		let router = Router::builder(Rc::new(renderer.clone()), Rc::new(history.clone()))
			.options(settings.router)
			.spawner(Rc::new(runtime.clone()))
			.build();

		let entry = router.downgrade();
		runtime.set_render_entry(Rc::new(move || -> Result<(), RenderError> {
			match entry.upgrade() {
				Some(router) => router.repaint(),
				None => Ok(()),
			}
		}));

		Self {
			runtime,
			client: QueryClient::new(),
			history,
			renderer,
			router,
			document: settings.document,
		}
	}

	/// Returns the reactive runtime.
	pub fn runtime(&self) -> &Runtime {
		&self.runtime
	}

	/// Returns the hook engine components capture.
	pub fn hooks(&self) -> &Hooks {
		self.runtime.hooks()
	}

	/// Returns the query cache.
	pub fn client(&self) -> &QueryClient {
		&self.client
	}

	/// Returns the router.
	pub fn router(&self) -> &Router {
		&self.router
	}

	/// Returns the navigation history.
	pub fn history(&self) -> &MemoryHistory {
		&self.history
	}

	/// Returns the renderer.
	pub fn renderer(&self) -> &MemoryRenderer {
		&self.renderer
	}

	/// Adopts a server snapshot. Call before [`start`](Self::start).
	pub fn hydrate(&self, snapshot: Snapshot) {
		self.client.hydrate(snapshot);
	}

	/// Adopts a snapshot serialized as JSON.
	///
	/// # Errors
	///
	/// [`QueryError::Serialization`] if `json` is not a JSON object.
	pub fn hydrate_json(&self, json: &str) -> Result<(), QueryError> {
		self.hydrate(Snapshot::from_json(json)?);
		Ok(())
	}

	/// Spawns the router's initial render.
	///
	/// Returns `false` when the runtime has no spawner.
	pub fn start(&self) -> bool {
		let router = self.router.clone();
		self.runtime.spawn(
			async move {
				if let Err(err) = router.init().await {
					tracing::error!(error = %err, "initial navigation failed");
				}
			}
			.boxed_local(),
		)
	}

	/// Spawns a navigation to `url`.
	pub fn navigate(&self, url: impl Into<String>) -> bool {
		self.router.navigate(url)
	}

	/// Drives effects, tasks and frames until the app settles.
	pub fn run_until_idle(&self) -> usize {
		self.runtime.run_until_idle()
	}

	/// Delivers a DOM event to the element with attribute `id`.
	pub fn dispatch(&self, id: &str, event: DomEvent) -> bool {
		self.renderer.dispatch(id, event)
	}

	/// Returns the markup of the last paint.
	pub fn html(&self) -> Option<String> {
		self.renderer.last_html()
	}

	/// Returns the last paint wrapped in the document shell with the
	/// dehydrated cache embedded.
	pub fn document(&self) -> String {
		let markup = self.html().unwrap_or_default();
		render_document(&markup, &self.client.dehydrate(), &self.document)
	}

	/// Unmounts every component, running their effect cleanups.
	pub fn shutdown(&self) {
		self.renderer.unmount_all();
		self.runtime.run_until_idle();
	}
}
