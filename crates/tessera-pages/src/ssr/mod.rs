//! Server-side rendering.
//!
//! [`render_to_string`] turns a [`View`] into HTML markup. Components are
//! invoked exactly once with no instance active, so hooks are unavailable
//! and no effects run; a component that fails renders nothing.
//! [`render_document`] wraps the markup in a full HTML page that embeds the
//! dehydrated query cache for client-side hydration.

mod document;

pub use document::{DocumentOptions, render_document};

use std::borrow::Cow;

use crate::view::{AttrValue, View};

/// Renders the view to an HTML string.
pub fn render_to_string(view: &View) -> String {
	let mut output = String::new();
	render_into(view, &mut output);
	output
}

fn render_into(view: &View, output: &mut String) {
	match view {
		View::Element(element) => {
			output.push('<');
			output.push_str(element.tag_name());
			for (name, value) in element.attrs() {
				render_attr(name, value, output);
			}

			if element.is_void() {
				output.push_str(" />");
			} else {
				output.push('>');
				for child in element.child_views() {
					render_into(child, output);
				}
				output.push_str("</");
				output.push_str(element.tag_name());
				output.push('>');
			}
		}
		View::Text(text) => output.push_str(&html_escape(text)),
		View::Fragment(children) => {
			for child in children {
				render_into(child, output);
			}
		}
		View::Component(component) => match component.render() {
			Ok(view) => render_into(&view, output),
			Err(err) => {
				tracing::error!(component = component.name(), error = %err, "component failed during server render");
			}
		},
		View::Empty => {}
	}
}

fn render_attr(name: &str, value: &AttrValue, output: &mut String) {
	if name.starts_with("on") {
		return;
	}
	let name = if name == "className" { "class" } else { name };
	match value {
		AttrValue::Text(text) => push_attr(name, text, output),
		AttrValue::Bool(true) => {
			output.push(' ');
			output.push_str(name);
		}
		AttrValue::Style(declarations) if !declarations.is_empty() => {
			let css = declarations
				.iter()
				.map(|(property, value)| format!("{property}:{value}"))
				.collect::<Vec<_>>()
				.join(";");
			push_attr(name, &css, output);
		}
		AttrValue::Style(_) | AttrValue::Bool(false) | AttrValue::Null | AttrValue::Handler(_) => {}
	}
}

fn push_attr(name: &str, value: &str, output: &mut String) {
	output.push(' ');
	output.push_str(name);
	output.push_str("=\"");
	output.push_str(&html_escape(value));
	output.push('"');
}

/// Escapes HTML special characters.
pub(crate) fn html_escape(s: &str) -> Cow<'_, str> {
	if s.contains(['&', '<', '>', '"', '\'']) {
		let mut escaped = String::with_capacity(s.len() + 8);
		for c in s.chars() {
			match c {
				'&' => escaped.push_str("&amp;"),
				'<' => escaped.push_str("&lt;"),
				'>' => escaped.push_str("&gt;"),
				'"' => escaped.push_str("&quot;"),
				'\'' => escaped.push_str("&#x27;"),
				_ => escaped.push(c),
			}
		}
		Cow::Owned(escaped)
	} else {
		Cow::Borrowed(s)
	}
}
