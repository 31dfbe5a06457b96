//! Route path patterns.
//!
//! Patterns are plain paths in which a `:name` segment captures one path
//! segment. A pattern is compiled in one of two modes:
//!
//! - **exact**: the whole pathname must match (top-level leaf routes);
//! - **prefix**: the pattern must match a leading run of whole segments, so
//!   descendant routes can consume the rest (parents and nested routes).

use std::collections::HashMap;
use std::fmt;

use regex::Regex;

use super::RouterError;

/// A compiled path pattern.
#[derive(Clone)]
pub struct PathPattern {
	source: String,
	regex: Regex,
	param_names: Vec<String>,
	exact: bool,
}

impl fmt::Debug for PathPattern {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PathPattern")
			.field("source", &self.source)
			.field("regex", &self.regex.as_str())
			.field("param_names", &self.param_names)
			.field("exact", &self.exact)
			.finish()
	}
}

impl PathPattern {
	/// Compiles `path`.
	///
	/// # Errors
	///
	/// [`RouterError::InvalidPattern`] if the generated expression is
	/// rejected, e.g. because a parameter name is empty.
	pub fn new(path: &str, exact: bool) -> Result<Self, RouterError> {
		let trimmed = path.trim_end_matches('/');
		let mut param_names = Vec::new();
		let mut body = String::new();
		for (index, segment) in trimmed.split('/').enumerate() {
			if index > 0 {
				body.push('/');
			}
			match segment.strip_prefix(':') {
				Some(name) if !name.is_empty() => {
					param_names.push(name.to_string());
					body.push_str("([^/]+)");
				}
				Some(_) => {
					return Err(RouterError::InvalidPattern {
						pattern: path.to_string(),
						reason: "parameter segment without a name".to_string(),
					});
				}
				None => body.push_str(&regex::escape(segment)),
			}
		}

		let expression = if exact {
			format!("^{body}/?$")
		} else {
			format!("^{body}(?:/|$)")
		};
		let regex = Regex::new(&expression).map_err(|err| RouterError::InvalidPattern {
			pattern: path.to_string(),
			reason: err.to_string(),
		})?;

		Ok(Self {
			source: path.to_string(),
			regex,
			param_names,
			exact,
		})
	}

	/// Returns the pattern as written.
	pub fn source(&self) -> &str {
		&self.source
	}

	/// Returns the parameter names in order of appearance.
	pub fn param_names(&self) -> &[String] {
		&self.param_names
	}

	/// Returns whether the whole pathname must match.
	pub fn is_exact(&self) -> bool {
		self.exact
	}

	/// Matches `pathname`, returning the captured parameters.
	pub fn matches(&self, pathname: &str) -> Option<HashMap<String, String>> {
		let captures = self.regex.captures(pathname)?;
		Some(
			self.param_names
				.iter()
				.enumerate()
				.filter_map(|(index, name)| {
					captures
						.get(index + 1)
						.map(|value| (name.clone(), value.as_str().to_string()))
				})
				.collect(),
		)
	}

	/// Returns whether the pattern consumes all of `pathname`.
	///
	/// Always true for exact patterns that match. A prefix pattern covers
	/// the path only when nothing but a trailing slash is left over.
	pub fn covers(&self, pathname: &str) -> bool {
		self.regex
			.find(pathname)
			.is_some_and(|found| pathname[found.end()..].trim_start_matches('/').is_empty())
	}
}

/// Joins a child path onto its parent, collapsing repeated slashes.
pub(crate) fn join_paths(parent: &str, child: &str) -> String {
	let joined = format!(
		"{}/{}",
		parent.trim_end_matches('/'),
		child.trim_start_matches('/')
	);
	let mut normalized = String::with_capacity(joined.len());
	let mut previous_slash = false;
	for c in joined.chars() {
		if c == '/' && previous_slash {
			continue;
		}
		previous_slash = c == '/';
		normalized.push(c);
	}
	normalized
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("/", "/", true)]
	#[case("/", "/about", false)]
	#[case("/about", "/about", true)]
	#[case("/about", "/about/", true)]
	#[case("/about", "/about/team", false)]
	#[case("/users/:id", "/users/42", true)]
	#[case("/users/:id", "/users/", false)]
	fn test_exact_matching(#[case] pattern: &str, #[case] path: &str, #[case] expected: bool) {
		let pattern = PathPattern::new(pattern, true).unwrap();
		assert_eq!(pattern.matches(path).is_some(), expected);
	}

	#[rstest]
	#[case("/a", "/a", true)]
	#[case("/a", "/a/b", true)]
	#[case("/a", "/ab", false)]
	#[case("/", "/anything", true)]
	fn test_prefix_matching(#[case] pattern: &str, #[case] path: &str, #[case] expected: bool) {
		let pattern = PathPattern::new(pattern, false).unwrap();
		assert_eq!(pattern.matches(path).is_some(), expected);
	}

	#[rstest]
	#[case("/", "/", true)]
	#[case("/", "/missing", false)]
	#[case("/a", "/a", true)]
	#[case("/a", "/a/", true)]
	#[case("/a", "/a/b", false)]
	#[case("/a", "/b", false)]
	fn test_prefix_covers_whole_path(#[case] pattern: &str, #[case] path: &str, #[case] expected: bool) {
		let pattern = PathPattern::new(pattern, false).unwrap();
		assert_eq!(pattern.covers(path), expected);
	}

	#[rstest]
	fn test_params_are_captured() {
		let pattern = PathPattern::new("/a/:id/:tab", false).unwrap();
		let params = pattern.matches("/a/x/y/z").unwrap();
		assert_eq!(params.get("id").map(String::as_str), Some("x"));
		assert_eq!(params.get("tab").map(String::as_str), Some("y"));
		assert_eq!(pattern.param_names(), ["id", "tab"]);
	}

	#[rstest]
	fn test_literal_segments_are_escaped() {
		let pattern = PathPattern::new("/files/a.b", true).unwrap();
		assert!(pattern.matches("/files/a.b").is_some());
		assert!(pattern.matches("/files/aXb").is_none());
	}

	#[rstest]
	fn test_unnamed_parameter_is_rejected() {
		assert!(matches!(
			PathPattern::new("/users/:", true),
			Err(RouterError::InvalidPattern { .. })
		));
	}

	#[rstest]
	#[case("/a", "b", "/a/b")]
	#[case("/a/", "/b", "/a/b")]
	#[case("/", "about", "/about")]
	#[case("/a//", "//b//c", "/a/b/c")]
	fn test_join_paths(#[case] parent: &str, #[case] child: &str, #[case] expected: &str) {
		assert_eq!(join_paths(parent, child), expected);
	}
}
