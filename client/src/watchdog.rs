use crate::{
	banner::Banner,
	config::Config,
	health::Checker,
	monitor::{ConnState, Monitor, Observer},
};
use futures::task::{LocalSpawn, LocalSpawnExt};
use std::{
	cell::{Cell, RefCell},
	rc::Rc,
};

/// Cancels a scheduled task
pub trait Cancel {
	fn cancel(self: Box<Self>);
}

/// Schedules a repeating callback
pub trait Ticker {
	fn every(&self, period_ms: u32, tick: Box<dyn FnMut()>) -> Box<dyn Cancel>;
}

/// Browser timer backed by `setInterval`
pub struct IntervalTicker;

impl Cancel for gloo::timers::callback::Interval {
	fn cancel(self: Box<Self>) {
		// Dropping clears the interval
		drop(self);
	}
}

impl Ticker for IntervalTicker {
	fn every(
		&self,
		period_ms: u32,
		mut tick: Box<dyn FnMut()>,
	) -> Box<dyn Cancel> {
		Box::new(gloo::timers::callback::Interval::new(period_ms, move || {
			tick()
		}))
	}
}

/// Issues health checks and applies their outcomes to a shared monitor
pub struct Watchdog<B: Banner> {
	monitor: Rc<RefCell<Monitor<B>>>,
	checker: Rc<dyn Checker>,
	spawner: Rc<dyn LocalSpawn>,
	observer: Option<Rc<Observer>>,

	// Readable while the monitor is borrowed
	state: Rc<Cell<ConnState>>,
}

// Derive would require B: Clone
impl<B: Banner> Clone for Watchdog<B> {
	fn clone(&self) -> Self {
		Self {
			monitor: self.monitor.clone(),
			checker: self.checker.clone(),
			spawner: self.spawner.clone(),
			observer: self.observer.clone(),
			state: self.state.clone(),
		}
	}
}

impl<B: Banner + 'static> Watchdog<B> {
	pub fn new(
		monitor: Monitor<B>,
		checker: Rc<dyn Checker>,
		spawner: Rc<dyn LocalSpawn>,
		observer: Option<Observer>,
	) -> Self {
		Self {
			state: Rc::new(Cell::new(monitor.state())),
			monitor: Rc::new(RefCell::new(monitor)),
			checker,
			spawner,
			observer: observer.map(Rc::new),
		}
	}

	/// Start a single health check. Its outcome is applied on completion.
	///
	/// Checks are not serialized. Completions of overlapping checks are
	/// applied in the order they arrive.
	pub fn check_once(&self) {
		let w = self.clone();
		let check = self.checker.check();
		let res = self.spawner.spawn_local(async move {
			let outcome = check.await;
			let applied = w.monitor.borrow_mut().apply(outcome);
			if let Some(t) = applied {
				w.state.set(t.to);

				// Observers may call back into the handle
				if let Some(o) = &w.observer {
					o(t);
				}
			}
		});
		if let Err(e) = res {
			log::error!("could not spawn health check: {:?}", e);
		}
	}

	#[inline]
	pub fn state(&self) -> ConnState {
		self.state.get()
	}
}

/// Cancels the repeating schedule on stop or drop
pub struct Guard {
	task: Option<Box<dyn Cancel>>,
	state: Box<dyn Fn() -> ConnState>,
}

impl Guard {
	/// Cancel further checks. Idempotent.
	pub fn stop(&mut self) {
		if let Some(t) = self.task.take() {
			log::debug!("stopping connectivity monitor");
			t.cancel();
		}
	}

	#[inline]
	pub fn is_running(&self) -> bool {
		self.task.is_some()
	}

	/// Current connection state of the monitor
	pub fn state(&self) -> ConnState {
		(self.state)()
	}
}

impl Drop for Guard {
	fn drop(&mut self) {
		self.stop();
	}
}

/// Run an immediate health check and then one every configured interval.
///
/// Returns None without doing anything, if the monitor is disabled.
pub fn start<B: Banner + 'static>(
	config: &Config,
	banner: B,
	checker: Rc<dyn Checker>,
	spawner: Rc<dyn LocalSpawn>,
	ticker: &dyn Ticker,
	observer: Option<Observer>,
) -> Option<Guard> {
	if !config.enabled {
		log::info!("disconnect alert disabled");
		return None;
	}

	let w = Watchdog::new(
		Monitor::new(banner, config.message.clone()),
		checker,
		spawner,
		observer,
	);

	log::info!(
		"starting connectivity monitor with {}ms interval",
		config.ping_interval_ms
	);
	w.check_once();
	let task = ticker.every(config.ping_interval_ms, {
		let w = w.clone();
		Box::new(move || w.check_once())
	});

	Some(Guard {
		task: Some(task),
		state: Box::new(move || w.state()),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		banner::testing::{Call, Recorder},
		monitor::{
			Outcome::{self, *},
			Transition,
		},
	};
	use futures::{
		channel::oneshot,
		executor::LocalPool,
		future::{FutureExt, LocalBoxFuture},
	};
	use std::collections::VecDeque;

	/// Replays scripted outcomes, defaulting to success
	#[derive(Default)]
	struct Script {
		outcomes: RefCell<VecDeque<Outcome>>,
		attempts: Cell<usize>,
	}

	impl Script {
		fn new(outcomes: &[Outcome]) -> Rc<Self> {
			Rc::new(Self {
				outcomes: RefCell::new(outcomes.iter().copied().collect()),
				attempts: Cell::new(0),
			})
		}
	}

	impl Checker for Script {
		fn check(&self) -> LocalBoxFuture<'static, Outcome> {
			self.attempts.set(self.attempts.get() + 1);
			let o = self.outcomes.borrow_mut().pop_front().unwrap_or(Success);
			futures::future::ready(o).boxed_local()
		}
	}

	/// Completes checks in the order the test resolves them
	#[derive(Default)]
	struct Manual {
		pending: RefCell<Vec<oneshot::Sender<Outcome>>>,
	}

	impl Checker for Manual {
		fn check(&self) -> LocalBoxFuture<'static, Outcome> {
			let (tx, rx) = oneshot::channel();
			self.pending.borrow_mut().push(tx);
			rx.map(|r| r.unwrap_or(Failure)).boxed_local()
		}
	}

	/// Fires ticks on demand
	#[derive(Default, Clone)]
	struct ManualTicker {
		tick: Rc<RefCell<Option<Box<dyn FnMut()>>>>,
		period: Rc<Cell<u32>>,
		cancelled: Rc<Cell<bool>>,
	}

	struct ManualTask(Rc<Cell<bool>>);

	impl Cancel for ManualTask {
		fn cancel(self: Box<Self>) {
			self.0.set(true);
		}
	}

	impl Ticker for ManualTicker {
		fn every(
			&self,
			period_ms: u32,
			tick: Box<dyn FnMut()>,
		) -> Box<dyn Cancel> {
			self.period.set(period_ms);
			*self.tick.borrow_mut() = Some(tick);
			Box::new(ManualTask(self.cancelled.clone()))
		}
	}

	impl ManualTicker {
		/// Simulate a period elapsing
		fn elapse(&self) {
			if self.cancelled.get() {
				return;
			}
			if let Some(t) = self.tick.borrow_mut().as_mut() {
				t();
			}
		}
	}

	fn config(enabled: bool) -> Config {
		Config {
			enabled,
			ping_interval_ms: 5000,
			message: "Custom test disconnect message".into(),
			require_ok_body: true,
		}
	}

	struct Harness<K: Checker> {
		pool: LocalPool,
		ticker: ManualTicker,
		banner: Recorder,
		checker: Rc<K>,
	}

	impl<K: Checker + 'static> Harness<K> {
		fn new(checker: Rc<K>) -> Self {
			Self {
				pool: LocalPool::new(),
				ticker: Default::default(),
				banner: Default::default(),
				checker,
			}
		}

		fn start(&self, enabled: bool) -> Option<Guard> {
			start(
				&config(enabled),
				self.banner.clone(),
				self.checker.clone(),
				Rc::new(self.pool.spawner()),
				&self.ticker,
				None,
			)
		}

		fn elapse(&mut self) {
			self.ticker.elapse();
			self.pool.run_until_stalled();
		}
	}

	#[test]
	fn disabled_does_nothing() {
		let mut h = Harness::new(Script::new(&[Failure]));
		assert!(h.start(false).is_none());
		h.elapse();
		assert_eq!(h.checker.attempts.get(), 0);
		assert!(h.ticker.tick.borrow().is_none());
		assert!(h.banner.calls.borrow().is_empty());
	}

	#[test]
	fn checks_immediately_then_every_interval() {
		let mut h = Harness::new(Script::new(&[]));
		let _g = h.start(true).unwrap();
		assert_eq!(h.ticker.period.get(), 5000);

		h.pool.run_until_stalled();
		assert_eq!(h.checker.attempts.get(), 1);
		for k in 1..=5 {
			h.elapse();
			assert_eq!(h.checker.attempts.get(), k + 1);
		}
	}

	#[test]
	fn outage_and_recovery() {
		let mut h = Harness::new(Script::new(&[Failure, Failure, Success]));
		let g = h.start(true).unwrap();
		h.pool.run_until_stalled();

		// Shown within the first tick
		assert_eq!(g.state(), ConnState::Failed);
		assert!(h.banner.visible());

		// Second failure does not duplicate the banner
		h.elapse();
		assert_eq!(h.banner.shows(), 1);

		h.elapse();
		assert_eq!(g.state(), ConnState::Healthy);
		assert_eq!(
			&*h.banner.calls.borrow(),
			&[
				Call::Show("Custom test disconnect message".into()),
				Call::Hide
			]
		);
	}

	#[test]
	fn stop_prevents_further_checks() {
		let mut h = Harness::new(Script::new(&[]));
		let mut g = h.start(true).unwrap();
		h.pool.run_until_stalled();
		assert!(g.is_running());

		g.stop();
		g.stop();
		assert!(!g.is_running());
		h.elapse();
		h.elapse();
		assert_eq!(h.checker.attempts.get(), 1);
	}

	#[test]
	fn drop_cancels_schedule() {
		let mut h = Harness::new(Script::new(&[]));
		drop(h.start(true));
		assert!(h.ticker.cancelled.get());
		h.elapse();
		assert_eq!(h.checker.attempts.get(), 1);
	}

	#[test]
	fn stale_failure_overrides_newer_success() {
		// Completions arrive out of tick order. Without per-check sequence
		// numbers the last arrival wins.
		let mut h = Harness::new(Rc::new(Manual::default()));
		let g = h.start(true).unwrap();
		h.elapse();
		h.elapse();

		let mut pending: Vec<_> = h.checker.pending.borrow_mut().drain(..).collect();
		assert_eq!(pending.len(), 3);

		pending.remove(0).send(Failure).unwrap();
		h.pool.run_until_stalled();
		assert_eq!(g.state(), ConnState::Failed);

		pending.pop().unwrap().send(Success).unwrap();
		h.pool.run_until_stalled();
		assert_eq!(g.state(), ConnState::Healthy);

		pending.pop().unwrap().send(Failure).unwrap();
		h.pool.run_until_stalled();
		assert_eq!(g.state(), ConnState::Failed);
		assert!(h.banner.visible());
		assert_eq!(h.banner.shows(), 2);
	}

	#[test]
	fn observer_is_notified() {
		let h = Harness::new(Script::new(&[Failure]));
		let seen = Rc::new(Cell::new(0));
		let seen_ = seen.clone();
		let mut pool = h.pool;
		let _g = start(
			&config(true),
			h.banner.clone(),
			h.checker.clone(),
			Rc::new(pool.spawner()),
			&h.ticker,
			Some(Box::new(move |t: Transition| {
				assert_eq!(t.to, ConnState::Failed);
				seen_.set(seen_.get() + 1);
			})),
		);
		pool.run_until_stalled();
		assert_eq!(seen.get(), 1);
	}

	#[test]
	fn observer_can_read_handle_state() {
		let h = Harness::new(Script::new(&[Failure, Success]));
		let guard: Rc<RefCell<Option<Guard>>> = Default::default();
		let seen = Rc::new(RefCell::new(Vec::new()));
		let mut pool = h.pool;
		let ticker = h.ticker.clone();

		let (guard_, seen_) = (guard.clone(), seen.clone());
		*guard.borrow_mut() = start(
			&config(true),
			h.banner.clone(),
			h.checker.clone(),
			Rc::new(pool.spawner()),
			&h.ticker,
			Some(Box::new(move |t: Transition| {
				let state = guard_.borrow().as_ref().map(|g| g.state());
				seen_.borrow_mut().push((t.to, state));
			})),
		);
		pool.run_until_stalled();
		ticker.elapse();
		pool.run_until_stalled();

		assert_eq!(
			&*seen.borrow(),
			&[
				(ConnState::Failed, Some(ConnState::Failed)),
				(ConnState::Healthy, Some(ConnState::Healthy)),
			]
		);
	}

	#[test]
	fn observer_can_stop_monitor() {
		let h = Harness::new(Script::new(&[Failure]));
		let guard: Rc<RefCell<Option<Guard>>> = Default::default();
		let mut pool = h.pool;

		let guard_ = guard.clone();
		*guard.borrow_mut() = start(
			&config(true),
			h.banner.clone(),
			h.checker.clone(),
			Rc::new(pool.spawner()),
			&h.ticker,
			Some(Box::new(move |_: Transition| {
				guard_.borrow_mut().take();
			})),
		);
		pool.run_until_stalled();
		assert!(guard.borrow().is_none());
		assert!(h.ticker.cancelled.get());

		h.ticker.elapse();
		pool.run_until_stalled();
		assert_eq!(h.checker.attempts.get(), 1);
	}
}
