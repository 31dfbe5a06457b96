//! Local task spawning.

use futures::future::LocalBoxFuture;
use futures::task::LocalSpawnExt;

/// Capability that drives `!Send` futures on the host's event loop.
pub trait Spawner {
	/// Schedules `future` to run to completion.
	fn spawn(&self, future: LocalBoxFuture<'static, ()>);
}

impl Spawner for futures::executor::LocalSpawner {
	fn spawn(&self, future: LocalBoxFuture<'static, ()>) {
		if let Err(err) = self.spawn_local(future) {
			tracing::error!(error = %err, "failed to spawn local task");
		}
	}
}
