//! View tree.
//!
//! [`View`] is the renderable description handed to the external render
//! layer. Elements carry typed attribute values so that the string renderer
//! and the DOM layer can apply the same attribute rules: `className` maps to
//! `class`, style maps become inline CSS, handlers never reach markup.

use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use tessera_reactive::RenderError;

/// A DOM event as seen by a view handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomEvent {
	/// Event name without the `on` prefix, e.g. `"click"`.
	pub kind: String,
	/// The target's current value, for form controls.
	pub value: Option<String>,
}

impl DomEvent {
	/// Creates an event of `kind` with no target value.
	pub fn new(kind: impl Into<String>) -> Self {
		Self {
			kind: kind.into(),
			value: None,
		}
	}

	/// Sets the target value.
	pub fn with_value(mut self, value: impl Into<String>) -> Self {
		self.value = Some(value.into());
		self
	}
}

/// Event handler attached to an element.
pub type EventHandler = Rc<dyn Fn(&DomEvent)>;

/// Component body producing a view.
pub type ComponentFn = Rc<dyn Fn() -> Result<View, RenderError>>;

/// An attribute value.
#[derive(Clone)]
pub enum AttrValue {
	/// Plain text value.
	Text(Cow<'static, str>),
	/// Boolean attribute; `true` renders bare, `false` renders nothing.
	Bool(bool),
	/// Inline style declarations in insertion order.
	Style(Vec<(String, String)>),
	/// Absent value; renders nothing.
	Null,
	/// Event handler; never rendered as markup.
	Handler(EventHandler),
}

impl fmt::Debug for AttrValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
			Self::Bool(value) => f.debug_tuple("Bool").field(value).finish(),
			Self::Style(style) => f.debug_tuple("Style").field(style).finish(),
			Self::Null => f.write_str("Null"),
			Self::Handler(_) => f.write_str("Handler(..)"),
		}
	}
}

impl From<&'static str> for AttrValue {
	fn from(value: &'static str) -> Self {
		Self::Text(Cow::Borrowed(value))
	}
}

impl From<String> for AttrValue {
	fn from(value: String) -> Self {
		Self::Text(Cow::Owned(value))
	}
}

impl From<bool> for AttrValue {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
	fn from(value: Option<T>) -> Self {
		value.map_or(Self::Null, Into::into)
	}
}

/// A unified representation of renderable content.
#[derive(Debug, Clone)]
pub enum View {
	/// A DOM element.
	Element(ElementView),
	/// A text node.
	Text(Cow<'static, str>),
	/// A fragment containing multiple views (no wrapper element).
	Fragment(Vec<View>),
	/// A component occurrence, rendered by the render layer.
	Component(ComponentView),
	/// An empty view (renders nothing).
	Empty,
}

/// Represents a DOM element in the view tree.
#[derive(Debug, Clone)]
pub struct ElementView {
	tag: Cow<'static, str>,
	attrs: Vec<(Cow<'static, str>, AttrValue)>,
	children: Vec<View>,
	is_void: bool,
}

impl ElementView {
	/// Creates a new element view.
	pub fn new(tag: impl Into<Cow<'static, str>>) -> Self {
		let tag = tag.into();
		let is_void = matches!(
			tag.as_ref(),
			"area"
				| "base" | "br"
				| "col" | "embed"
				| "hr" | "img"
				| "input" | "link"
				| "meta" | "source"
				| "track" | "wbr"
		);
		Self {
			tag,
			attrs: Vec::new(),
			children: Vec::new(),
			is_void,
		}
	}

	/// Adds an attribute.
	pub fn attr(mut self, name: impl Into<Cow<'static, str>>, value: impl Into<AttrValue>) -> Self {
		self.attrs.push((name.into(), value.into()));
		self
	}

	/// Sets the `className` attribute.
	pub fn class(self, class: impl Into<AttrValue>) -> Self {
		self.attr("className", class)
	}

	/// Sets the inline style from `(property, value)` pairs.
	pub fn style<K, V>(self, declarations: impl IntoIterator<Item = (K, V)>) -> Self
	where
		K: Into<String>,
		V: Into<String>,
	{
		let declarations = declarations
			.into_iter()
			.map(|(property, value)| (property.into(), value.into()))
			.collect();
		self.attr("style", AttrValue::Style(declarations))
	}

	/// Attaches a handler for `event` (stored as `on{event}`).
	pub fn on<F>(self, event: &str, handler: F) -> Self
	where
		F: Fn(&DomEvent) + 'static,
	{
		self.attr(format!("on{event}"), AttrValue::Handler(Rc::new(handler)))
	}

	/// Adds a child view.
	pub fn child(mut self, child: impl IntoView) -> Self {
		self.children.push(child.into_view());
		self
	}

	/// Adds multiple child views.
	pub fn children(mut self, children: impl IntoIterator<Item = impl IntoView>) -> Self {
		self.children
			.extend(children.into_iter().map(IntoView::into_view));
		self
	}

	/// Returns the tag name.
	pub fn tag_name(&self) -> &str {
		&self.tag
	}

	/// Returns the attributes.
	pub fn attrs(&self) -> &[(Cow<'static, str>, AttrValue)] {
		&self.attrs
	}

	/// Returns the child views.
	pub fn child_views(&self) -> &[View] {
		&self.children
	}

	/// Returns whether this is a void element.
	pub fn is_void(&self) -> bool {
		self.is_void
	}

	/// Returns the handler registered for `event`.
	pub fn handler(&self, event: &str) -> Option<EventHandler> {
		let name = format!("on{event}");
		self.attrs.iter().find_map(|(key, value)| match value {
			AttrValue::Handler(handler) if key.eq_ignore_ascii_case(&name) => Some(Rc::clone(handler)),
			_ => None,
		})
	}

	pub(crate) fn with_children(mut self, children: Vec<View>) -> Self {
		self.children = children;
		self
	}
}

/// A component occurrence in the view tree.
#[derive(Clone)]
pub struct ComponentView {
	name: Cow<'static, str>,
	render: ComponentFn,
}

impl fmt::Debug for ComponentView {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ComponentView")
			.field("name", &self.name)
			.finish_non_exhaustive()
	}
}

impl ComponentView {
	/// Creates a component occurrence named `name`.
	pub fn new<F>(name: impl Into<Cow<'static, str>>, render: F) -> Self
	where
		F: Fn() -> Result<View, RenderError> + 'static,
	{
		Self {
			name: name.into(),
			render: Rc::new(render),
		}
	}

	/// Returns the component name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Invokes the component body.
	pub fn render(&self) -> Result<View, RenderError> {
		(self.render)()
	}
}

impl View {
	/// Creates an element view.
	pub fn element(tag: impl Into<Cow<'static, str>>) -> ElementView {
		ElementView::new(tag)
	}

	/// Creates a text view.
	pub fn text(content: impl Into<Cow<'static, str>>) -> Self {
		Self::Text(content.into())
	}

	/// Creates a fragment view.
	pub fn fragment(children: impl IntoIterator<Item = impl IntoView>) -> Self {
		Self::Fragment(children.into_iter().map(IntoView::into_view).collect())
	}

	/// Creates a component view.
	pub fn component<F>(name: impl Into<Cow<'static, str>>, render: F) -> Self
	where
		F: Fn() -> Result<View, RenderError> + 'static,
	{
		Self::Component(ComponentView::new(name, render))
	}

	/// Creates an empty view.
	pub fn empty() -> Self {
		Self::Empty
	}

	/// Finds the first element with attribute `id` equal to `id`.
	pub fn find_by_id(&self, id: &str) -> Option<&ElementView> {
		match self {
			Self::Element(element) => {
				let matches = element.attrs().iter().any(|(key, value)| {
					key == "id" && matches!(value, AttrValue::Text(text) if text == id)
				});
				if matches {
					return Some(element);
				}
				element.child_views().iter().find_map(|child| child.find_by_id(id))
			}
			Self::Fragment(children) => children.iter().find_map(|child| child.find_by_id(id)),
			_ => None,
		}
	}
}

/// Trait for types that can be converted into a View.
pub trait IntoView {
	/// Converts self into a View.
	fn into_view(self) -> View;
}

impl IntoView for View {
	fn into_view(self) -> View {
		self
	}
}

impl IntoView for ElementView {
	fn into_view(self) -> View {
		View::Element(self)
	}
}

impl IntoView for ComponentView {
	fn into_view(self) -> View {
		View::Component(self)
	}
}

impl IntoView for String {
	fn into_view(self) -> View {
		View::Text(Cow::Owned(self))
	}
}

impl IntoView for &'static str {
	fn into_view(self) -> View {
		View::Text(Cow::Borrowed(self))
	}
}

impl<T: IntoView> IntoView for Option<T> {
	fn into_view(self) -> View {
		match self {
			Some(v) => v.into_view(),
			None => View::Empty,
		}
	}
}

impl<T: IntoView> IntoView for Vec<T> {
	fn into_view(self) -> View {
		View::Fragment(self.into_iter().map(IntoView::into_view).collect())
	}
}

impl IntoView for () {
	fn into_view(self) -> View {
		View::Empty
	}
}

impl<A: IntoView, B: IntoView> IntoView for (A, B) {
	fn into_view(self) -> View {
		View::Fragment(vec![self.0.into_view(), self.1.into_view()])
	}
}

impl<A: IntoView, B: IntoView, C: IntoView> IntoView for (A, B, C) {
	fn into_view(self) -> View {
		View::Fragment(vec![
			self.0.into_view(),
			self.1.into_view(),
			self.2.into_view(),
		])
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::cell::Cell;

	#[rstest]
	#[case("br", true)]
	#[case("img", true)]
	#[case("input", true)]
	#[case("div", false)]
	#[case("span", false)]
	fn test_void_element_detection(#[case] tag: &'static str, #[case] expected: bool) {
		assert_eq!(ElementView::new(tag).is_void(), expected);
	}

	#[rstest]
	fn test_class_is_stored_as_class_name() {
		let element = ElementView::new("div").class("todo-app");
		assert_eq!(element.attrs()[0].0, "className");
	}

	#[rstest]
	fn test_handler_lookup() {
		// Arrange
		let clicks = Rc::new(Cell::new(0));
		let counter = Rc::clone(&clicks);
		let button = ElementView::new("button").on("click", move |_| counter.set(counter.get() + 1));

		// Act
		let handler = button.handler("click").unwrap();
		handler(&DomEvent::new("click"));

		// Assert
		assert_eq!(clicks.get(), 1);
		assert!(button.handler("input").is_none());
	}

	#[rstest]
	fn test_option_attr_maps_none_to_null() {
		let value: AttrValue = None::<String>.into();
		assert!(matches!(value, AttrValue::Null));
	}

	#[rstest]
	fn test_find_by_id_descends_into_fragments() {
		let view = View::fragment([
			View::element("p").into_view(),
			View::element("ul")
				.child(View::element("li").attr("id", "second"))
				.into_view(),
		]);
		assert_eq!(view.find_by_id("second").unwrap().tag_name(), "li");
		assert!(view.find_by_id("missing").is_none());
	}
}
