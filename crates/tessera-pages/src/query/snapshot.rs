//! Dehydrated cache snapshot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The global JavaScript variable the snapshot is embedded under.
pub const STORE_VAR: &str = "__STORE__";

/// Key → data map exchanged between server and client.
///
/// Serialises as a plain JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(BTreeMap<String, Value>);

impl Snapshot {
	/// Creates an empty snapshot.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds an entry.
	pub fn insert(&mut self, key: impl Into<String>, data: Value) {
		self.0.insert(key.into(), data);
	}

	/// Gets the data stored under `key`.
	pub fn get(&self, key: &str) -> Option<&Value> {
		self.0.get(key)
	}

	/// Returns the number of entries.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Checks if the snapshot is empty.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Iterates entries in key order.
	pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
		self.0.iter()
	}

	/// Serializes the snapshot to JSON.
	pub fn to_json(&self) -> Result<String, serde_json::Error> {
		serde_json::to_string(self)
	}

	/// Deserializes a snapshot from JSON.
	pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(json)
	}

	/// Generates a `<script>` tag assigning the snapshot to `window.__STORE__`.
	///
	/// `</` is escaped so embedded data cannot close the script element.
	pub fn to_script_tag(&self) -> String {
		let json = self.to_json().unwrap_or_else(|err| {
			tracing::error!(error = %err, "failed to serialize cache snapshot");
			"{}".to_string()
		});
		format!(
			"<script>\n    window.{} = {};\n  </script>",
			STORE_VAR,
			json.replace("</", "<\\/")
		)
	}
}

impl FromIterator<(String, Value)> for Snapshot {
	fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
		Self(iter.into_iter().collect())
	}
}

impl IntoIterator for Snapshot {
	type Item = (String, Value);
	type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

	fn into_iter(self) -> Self::IntoIter {
		self.0.into_iter()
	}
}
