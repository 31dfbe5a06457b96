//! Todo CRUD collaborator.
//!
//! [`TodoApi`] is the narrow I/O contract the todo page talks to. The wire
//! format is a JSON array of `{id, text}` objects, newest first. Backends
//! may encode ids as numbers or strings; both decode to a string id.

mod memory;

#[cfg(feature = "http")]
mod http;

pub use memory::InMemoryTodoStore;

#[cfg(feature = "http")]
pub use http::HttpTodoApi;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

/// A todo item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
	/// Identifier; `temp-*` for optimistic entries not yet stored.
	#[serde(deserialize_with = "id_from_number_or_string")]
	pub id: String,
	/// Todo text.
	pub text: String,
}

impl Todo {
	/// Creates a todo.
	pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			text: text.into(),
		}
	}

	/// Returns whether the todo is an optimistic placeholder.
	pub fn is_temporary(&self) -> bool {
		self.id.starts_with(TEMP_ID_PREFIX)
	}
}

/// Prefix of optimistic ids.
pub const TEMP_ID_PREFIX: &str = "temp-";

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
	Number(u64),
	Text(String),
}

fn id_from_number_or_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(match RawId::deserialize(deserializer)? {
		RawId::Number(id) => id.to_string(),
		RawId::Text(id) => id,
	})
}

/// Errors raised by a [`TodoApi`].
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
	/// The backend answered with a non-success status.
	#[error("todo request failed with status {status}: {message}")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Error message reported by the backend.
		message: String,
	},

	/// The request never produced a response.
	#[error("todo request could not be sent: {0}")]
	Transport(String),

	/// The response body was not the expected JSON.
	#[error("todo response could not be decoded: {0}")]
	Decode(#[from] serde_json::Error),
}

/// Todo CRUD operations.
#[async_trait(?Send)]
pub trait TodoApi {
	/// Lists todos, newest first.
	async fn list(&self) -> Result<Vec<Todo>, ApiError>;

	/// Creates a todo.
	async fn create(&self, text: &str) -> Result<(), ApiError>;

	/// Removes a todo. Removing an unknown id succeeds.
	async fn remove(&self, id: &str) -> Result<(), ApiError>;
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(r#"{"id": 7, "text": "write docs"}"#, "7")]
	#[case(r#"{"id": "temp-1", "text": "write docs"}"#, "temp-1")]
	fn test_todo_id_accepts_numbers_and_strings(#[case] json: &str, #[case] expected: &str) {
		let todo: Todo = serde_json::from_str(json).unwrap();
		assert_eq!(todo.id, expected);
		assert_eq!(todo.text, "write docs");
	}

	#[rstest]
	fn test_temporary_ids() {
		assert!(Todo::new("temp-42", "x").is_temporary());
		assert!(!Todo::new("42", "x").is_temporary());
	}

	#[rstest]
	fn test_status_error_display() {
		let err = ApiError::Status {
			status: 500,
			message: "boom".to_string(),
		};
		assert_eq!(err.to_string(), "todo request failed with status 500: boom");
	}
}
