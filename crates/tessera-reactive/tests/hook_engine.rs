//! Integration tests for the hook engine and render scheduler.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rstest::{fixture, rstest};
use tessera_reactive::{
	Debounced, HookError, Hooks, Instance, InstanceHandle, RenderError, Runtime, SetState, SlotKind,
};
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// A tracing layer that captures log lines as `[LEVEL] message`.
struct LogCapture {
	logs: Arc<Mutex<Vec<String>>>,
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for LogCapture {
	fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
		struct MessageVisitor {
			message: String,
		}

		impl tracing::field::Visit for MessageVisitor {
			fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
				if field.name() == "message" {
					self.message = format!("{:?}", value);
				}
			}
		}

		let mut visitor = MessageVisitor {
			message: String::new(),
		};
		event.record(&mut visitor);
		self.logs
			.lock()
			.unwrap()
			.push(format!("[{}] {}", event.metadata().level(), visitor.message));
	}
}

struct Counter {
	runtime: Runtime,
	instance: InstanceHandle,
	renders: Rc<Cell<u32>>,
}

#[fixture]
fn counter() -> Counter {
	let runtime = Runtime::new();
	let renders = Rc::new(Cell::new(0));
	let counter = Rc::clone(&renders);
	runtime.set_render_entry(Rc::new(move || -> Result<(), RenderError> {
		counter.set(counter.get() + 1);
		Ok(())
	}));
	Counter {
		runtime,
		instance: Instance::new(),
		renders,
	}
}

/// A component calling three hooks in a fixed order.
fn profile(hooks: &Hooks) -> Result<(String, SetState<String>, u32, SetState<u32>), HookError> {
	let (name, set_name) = hooks.use_state("anonymous".to_string())?;
	let visits = hooks.use_ref(0_u32)?;
	*visits.borrow_mut() += 1;
	let (age, set_age) = hooks.use_state(30_u32)?;
	Ok((name, set_name, age, set_age))
}

#[rstest]
fn test_nth_hook_call_addresses_nth_slot(counter: Counter) {
	// Arrange
	let (_, set_name, _, set_age) = counter
		.runtime
		.render_component(&counter.instance, profile)
		.unwrap();

	// Act
	set_age.set(31);
	set_name.set("ada".to_string());
	let (name, _, age, _) = counter
		.runtime
		.render_component(&counter.instance, profile)
		.unwrap();

	// Assert
	assert_eq!(name, "ada");
	assert_eq!(age, 31);
	assert_eq!(
		counter.instance.slot_kinds(),
		vec![SlotKind::State, SlotKind::Ref, SlotKind::State]
	);
}

#[rstest]
fn test_equal_set_never_schedules_and_burst_renders_once(counter: Counter) {
	// Arrange
	let (_, set_name, _, set_age) = counter
		.runtime
		.render_component(&counter.instance, profile)
		.unwrap();

	// Act
	set_name.set("anonymous".to_string());
	counter.runtime.run_until_idle();
	let renders_after_equal = counter.renders.get();
	set_age.set(40);
	set_age.set(41);
	set_name.set("grace".to_string());
	counter.runtime.run_until_idle();

	// Assert
	assert_eq!(renders_after_equal, 0);
	assert_eq!(counter.renders.get(), 1);
	assert_eq!(counter.runtime.scheduler().frames_requested(), 1);
}

#[rstest]
fn test_effect_cleanup_ordering_across_dep_changes(counter: Counter) {
	// Arrange
	let log = Rc::new(RefCell::new(Vec::new()));
	let render = |query: &'static str| {
		counter
			.runtime
			.render_component(&counter.instance, |hooks| {
				let log = Rc::clone(&log);
				hooks.use_effect(
					move || {
						log.borrow_mut().push(format!("subscribe {query}"));
						Some(move || log.borrow_mut().push(format!("unsubscribe {query}")))
					},
					Some(query),
				)
			})
			.unwrap();
		counter.runtime.run_until_idle();
	};

	// Act
	render("todos");
	render("todos");
	render("users");
	counter.instance.unmount();

	// Assert
	assert_eq!(
		*log.borrow(),
		vec![
			"subscribe todos",
			"unsubscribe todos",
			"subscribe users",
			"unsubscribe users",
		]
	);
}

#[rstest]
fn test_hooks_outside_component_body_fail(counter: Counter) {
	let hooks = counter.runtime.hooks();
	assert_eq!(hooks.use_ref(0).unwrap_err(), HookError::InvalidHookContext);
	assert_eq!(
		hooks.use_effect(|| None::<fn()>, None::<()>).unwrap_err(),
		HookError::InvalidHookContext
	);
}

#[rstest]
fn test_nested_components_keep_separate_slots(counter: Counter) {
	// Arrange
	let child = Instance::new();

	// Act
	let (parent_value, child_value) = counter.runtime.render_component(&counter.instance, |hooks| {
		let (parent_value, _) = hooks.use_state(1).unwrap();
		let child_value = counter
			.runtime
			.render_component(&child, |hooks| hooks.use_state("child").map(|(value, _)| value))
			.unwrap();
		(parent_value, child_value)
	});

	// Assert
	assert_eq!(parent_value, 1);
	assert_eq!(child_value, "child");
	assert_eq!(counter.instance.slot_count(), 1);
	assert_eq!(child.slot_count(), 1);
}

fn failing_teardown() {
	panic!("teardown failed");
}

#[rstest]
fn test_cleanup_panic_is_logged_and_swallowed(counter: Counter) {
	// Arrange
	let logs = Arc::new(Mutex::new(Vec::new()));
	let capture = LogCapture { logs: logs.clone() };
	let _guard = tracing_subscriber::registry().with(capture).set_default();
	counter
		.runtime
		.render_component(&counter.instance, |hooks| {
			hooks.use_layout_effect(|| Some(failing_teardown as fn()), None::<()>)
		})
		.unwrap();

	// Act
	counter.instance.unmount();

	// Assert
	let captured = logs.lock().unwrap();
	assert!(
		captured
			.iter()
			.any(|log| log.contains("ERROR") && log.contains("user callback panicked")),
		"expected a swallowed panic to be logged, got: {:?}",
		*captured
	);
}

const DEBOUNCE: Duration = Duration::from_millis(300);

fn debounced_search(counter: &Counter, query: &'static str) -> Debounced<&'static str> {
	let debounced = counter
		.runtime
		.render_component(&counter.instance, |hooks| hooks.use_debounce(query, DEBOUNCE))
		.unwrap();
	counter.runtime.run_until_idle();
	debounced
}

#[rstest]
fn test_debounce_commits_only_the_last_value_of_a_burst(counter: Counter) {
	// Arrange
	debounced_search(&counter, "r");

	// Act
	debounced_search(&counter, "ru");
	counter.runtime.advance_time(Duration::from_millis(100));
	let during_burst = debounced_search(&counter, "rus");
	let last = debounced_search(&counter, "rust");
	let fired_early = counter.runtime.advance_time(Duration::from_millis(299));
	let fired = counter.runtime.advance_time(Duration::from_millis(1));
	counter.runtime.run_until_idle();

	// Assert
	assert_eq!(during_burst.value, "r");
	assert_eq!(last.value, "r");
	assert_eq!(fired_early, 0);
	assert_eq!(fired, 1);
	assert_eq!(counter.renders.get(), 1);
	assert_eq!(debounced_search(&counter, "rust").value, "rust");
}

#[rstest]
fn test_debounce_cancel_commits_latest_value_immediately(counter: Counter) {
	// Arrange
	debounced_search(&counter, "a");
	let pending = debounced_search(&counter, "ab");

	// Act
	let cancelled = pending.cancel.cancel();

	// Assert
	assert!(cancelled);
	assert!(!pending.cancel.is_pending());
	assert!(!pending.cancel.cancel());
	assert_eq!(counter.runtime.advance_time(DEBOUNCE * 2), 0);
	assert_eq!(debounced_search(&counter, "ab").value, "ab");
}

#[rstest]
fn test_debounce_timer_is_cleared_on_unmount(counter: Counter) {
	// Arrange
	debounced_search(&counter, "a");
	let pending = debounced_search(&counter, "b");

	// Act
	counter.instance.unmount();

	// Assert
	assert!(!pending.cancel.is_pending());
	assert_eq!(counter.runtime.advance_time(DEBOUNCE), 0);
	counter.runtime.run_until_idle();
	assert_eq!(counter.renders.get(), 0);
}
