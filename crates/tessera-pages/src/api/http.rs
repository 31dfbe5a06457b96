//! HTTP todo backend.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::json;

use super::{ApiError, Todo, TodoApi};

/// Default resource path.
pub const DEFAULT_TODOS_PATH: &str = "/api/todos";

/// [`TodoApi`] over HTTP.
///
/// `GET` lists, `POST {text}` creates and `DELETE {id}` removes, all on the
/// same resource URL. Non-2xx responses become [`ApiError::Status`].
///
/// On native targets the futures must be driven by a tokio runtime.
#[derive(Debug, Clone)]
pub struct HttpTodoApi {
	client: Client,
	url: String,
}

impl HttpTodoApi {
	/// Creates a client for `base_url` + [`DEFAULT_TODOS_PATH`].
	pub fn new(base_url: &str) -> Self {
		Self::with_client(Client::new(), format!("{}{DEFAULT_TODOS_PATH}", base_url.trim_end_matches('/')))
	}

	/// Creates a client for the resource at `url` using `client`.
	pub fn with_client(client: Client, url: impl Into<String>) -> Self {
		Self {
			client,
			url: url.into(),
		}
	}

	/// Returns the resource URL.
	pub fn url(&self) -> &str {
		&self.url
	}

	async fn check(response: Response) -> Result<Response, ApiError> {
		let status = response.status();
		if status.is_success() {
			return Ok(response);
		}
		let message = response
			.text()
			.await
			.unwrap_or_else(|err| err.to_string());
		tracing::warn!(status = status.as_u16(), %message, "todo request rejected");
		Err(ApiError::Status {
			status: status.as_u16(),
			message,
		})
	}
}

fn transport(err: reqwest::Error) -> ApiError {
	ApiError::Transport(err.to_string())
}

#[async_trait(?Send)]
impl TodoApi for HttpTodoApi {
	async fn list(&self) -> Result<Vec<Todo>, ApiError> {
		let response = self.client.get(&self.url).send().await.map_err(transport)?;
		let body = Self::check(response).await?.bytes().await.map_err(transport)?;
		Ok(serde_json::from_slice(&body)?)
	}

	async fn create(&self, text: &str) -> Result<(), ApiError> {
		let response = self
			.client
			.post(&self.url)
			.json(&json!({ "text": text }))
			.send()
			.await
			.map_err(transport)?;
		Self::check(response).await?;
		Ok(())
	}

	async fn remove(&self, id: &str) -> Result<(), ApiError> {
		let response = self
			.client
			.delete(&self.url)
			.json(&json!({ "id": id }))
			.send()
			.await
			.map_err(transport)?;
		Self::check(response).await?;
		Ok(())
	}
}
