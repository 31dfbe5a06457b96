//! Server rendering of the todo page.

use std::rc::Rc;

use tessera_pages::api::TodoApi;
use tessera_pages::{
	DocumentOptions, MemoryRenderer, NodeCleanups, QueryClient, QueryError, Renderer, render_document,
};
use tessera_reactive::Runtime;

use crate::todo::{TODOS_KEY, TodoPage};

/// Renders the todo page into a complete HTML document.
///
/// The list is fetched first, so the markup already shows it and the
/// embedded snapshot lets the client hydrate without refetching. Effects are
/// never run.
///
/// # Errors
///
/// [`QueryError::Fetch`] when listing todos fails.
pub async fn render_todo_document(api: Rc<dyn TodoApi>, options: &DocumentOptions) -> Result<String, QueryError> {
	let client = QueryClient::new();
	let lister = Rc::clone(&api);
	client.prefetch(TODOS_KEY, || async move { lister.list().await }).await?;

	let cleanups = NodeCleanups::new();
	let runtime = Runtime::builder()
		.cleanup_registry(Rc::new(cleanups.clone()))
		.build();
	let renderer = MemoryRenderer::new(runtime.clone(), cleanups);
	let page = TodoPage::new(runtime.hooks().clone(), client.clone(), api);
	if let Err(err) = renderer.render(Rc::new(move || page.view())) {
		tracing::error!(error = %err, "server render of the todo page failed");
	}
	let markup = renderer.last_html().unwrap_or_default();
	renderer.unmount_all();

	Ok(render_document(&markup, &client.dehydrate(), options))
}
