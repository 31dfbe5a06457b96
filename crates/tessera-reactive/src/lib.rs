//! # Tessera Reactive
//!
//! Hook-based component state for Tessera.
//!
//! This crate provides the instance registry, the seven hook primitives and
//! the batched render scheduler. Rendering itself is external: the render
//! layer owns component instances, brackets each component call with
//! [`InstanceStack::enter`], and installs a [`RenderEntry`] that the
//! [`Scheduler`] invokes once per frame.
//!
//! ## Architecture
//!
//! 1. **Instance registry**: per-component slot arena and cursor
//! 2. **Hook engine**: [`Hooks`], addressing slots by call order
//! 3. **Scheduler**: coalesces state changes into one render per frame
//! 4. **Microtasks**: deferral point for passive effects
//! 5. **Timers**: delayed callbacks for debounced values
//!
//! ## Example
//!
//! ```ignore
//! use tessera_reactive::{Instance, Runtime};
//!
//! let runtime = Runtime::new();
//! let counter = Instance::new();
//!
//! let (count, set_count) = runtime.render_component(&counter, |hooks| hooks.use_state(0))?;
//! set_count.set(count + 1);
//! runtime.run_until_idle();
//! ```

pub mod callback;
pub mod cleanup;
pub mod deps;
pub mod error;
pub mod event;
pub mod hooks;
pub mod instance;
pub mod runtime;
pub mod scheduler;
pub mod spawn;
pub mod tasks;
pub mod timer;

pub use callback::Callback;
pub use cleanup::{CleanupHandle, CleanupRegistry};
pub use deps::ByRef;
pub use error::{HookError, RenderError};
pub use event::{EventHub, ListenerId};
pub use hooks::{DebounceCancel, Debounced, Dispatch, Hooks, Ref, SetState};
pub use instance::{
	EffectTiming, Instance, InstanceGuard, InstanceHandle, InstanceId, InstanceProvider,
	InstanceStack, NodeHandle, SlotKind,
};
pub use runtime::{Runtime, RuntimeBuilder};
pub use scheduler::{FrameHost, ManualFrameHost, RenderEntry, RenderScheduler, Scheduler};
pub use spawn::Spawner;
pub use tasks::MicrotaskQueue;
pub use timer::{ManualTimer, TimerHost, TimerId};
