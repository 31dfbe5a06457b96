//! HTML document shell.

use serde::{Deserialize, Serialize};

use super::html_escape;
use crate::query::Snapshot;

/// Options for [`render_document`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentOptions {
	/// Document title.
	pub title: String,
	/// Value of the `lang` attribute on `<html>`.
	pub lang: String,
	/// Module script that boots the client, if any.
	pub client_entry: Option<String>,
	/// Id of the mount element.
	pub mount_id: String,
}

impl Default for DocumentOptions {
	fn default() -> Self {
		Self {
			title: "Todo App".to_string(),
			lang: "en".to_string(),
			client_entry: None,
			mount_id: "app".to_string(),
		}
	}
}

/// Wraps server-rendered `markup` in a complete HTML page.
///
/// The page embeds `snapshot` as `window.__STORE__` so the client can
/// hydrate its query cache before the first render.
pub fn render_document(markup: &str, snapshot: &Snapshot, options: &DocumentOptions) -> String {
	let entry = options
		.client_entry
		.as_deref()
		.map(|src| {
			format!(
				"\n  <script type=\"module\" src=\"{}\"></script>",
				html_escape(src)
			)
		})
		.unwrap_or_default();
	format!(
		"<!doctype html>\n<html lang=\"{lang}\">\n<head>\n  <meta charset=\"utf-8\"/>\n  <title>{title}</title>\n</head>\n<body>\n  <div id=\"{mount}\">{markup}</div>\n  {store}{entry}\n</body>\n</html>",
		lang = html_escape(&options.lang),
		title = html_escape(&options.title),
		mount = html_escape(&options.mount_id),
		store = snapshot.to_script_tag(),
	)
}
