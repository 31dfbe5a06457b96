//! Error types for the hook engine and the render scheduler.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::instance::SlotKind;

/// Errors raised by hook primitives.
///
/// These are programmer errors: a hook called outside a component body, or a
/// component whose hook call order changed between renders. Callers are
/// expected to propagate them with `?` rather than recover.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HookError {
	/// A hook primitive was invoked while no component instance was active.
	#[error("hooks must be called inside a component body")]
	InvalidHookContext,

	/// The slot at `index` was created by a different primitive.
	#[error(
		"hook slot {index} was created by `{found}` but `{expected}` was called; hook call order must not change between renders"
	)]
	SlotKindMismatch {
		/// Slot position.
		index: usize,
		/// The primitive that was called.
		expected: SlotKind,
		/// The primitive that created the slot.
		found: SlotKind,
	},

	/// The slot at `index` holds a value of another type.
	#[error("hook slot {index} does not hold a value of type `{expected}`")]
	SlotTypeMismatch {
		/// Slot position.
		index: usize,
		/// Requested type name.
		expected: &'static str,
	},
}

/// Error returned by a render entry point.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
	/// A component body failed with a hook error.
	#[error("component render failed: {0}")]
	Hook(#[from] HookError),

	/// The external render layer reported a failure.
	#[error("render failed: {0}")]
	Failed(String),
}

impl RenderError {
	/// Creates a [`RenderError::Failed`] from a message.
	pub fn failed(message: impl Into<String>) -> Self {
		Self::Failed(message.into())
	}
}

/// Runs `f`, catching a panic and logging it under `site`.
///
/// Returns `None` when `f` panicked.
pub(crate) fn run_guarded<R>(site: &'static str, f: impl FnOnce() -> R) -> Option<R> {
	match catch_unwind(AssertUnwindSafe(f)) {
		Ok(value) => Some(value),
		Err(payload) => {
			tracing::error!(site, panic = %panic_message(payload.as_ref()), "user callback panicked; continuing");
			None
		}
	}
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(message) = payload.downcast_ref::<&str>() {
		(*message).to_string()
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message.clone()
	} else {
		"non-string panic payload".to_string()
	}
}
