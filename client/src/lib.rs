mod banner;
mod config;
mod fsm;
mod health;
mod monitor;
mod util;
mod watchdog;

use banner::{Banner, DomBanner, HostBanner, PluginApi};
use config::Settings;
use futures::task::{LocalFutureObj, LocalSpawn, SpawnError};
use std::{cell::RefCell, rc::Rc};
use wasm_bindgen::prelude::*;

/// Runs spawned futures on the browser's microtask queue
struct Spawner;

impl LocalSpawn for Spawner {
	fn spawn_local_obj(
		&self,
		future: LocalFutureObj<'static, ()>,
	) -> Result<(), SpawnError> {
		wasm_bindgen_futures::spawn_local(future);
		Ok(())
	}
}

/// Handle of a running connectivity monitor.
///
/// Stops the monitor on `stop()`, when freed or when the page is hidden on
/// navigation.
#[wasm_bindgen]
pub struct MonitorHandle {
	guard: Rc<RefCell<Option<watchdog::Guard>>>,

	// Detached on drop
	#[allow(unused)]
	pagehide: Option<gloo::events::EventListener>,
}

#[wasm_bindgen]
impl MonitorHandle {
	/// Cancel further health checks
	pub fn stop(&mut self) {
		if let Some(mut g) = self.guard.borrow_mut().take() {
			g.stop();
		}
		self.pagehide = None;
	}

	/// Return, if health checks are still scheduled
	#[wasm_bindgen(getter)]
	pub fn running(&self) -> bool {
		self.guard
			.borrow()
			.as_ref()
			.map(|g| g.is_running())
			.unwrap_or(false)
	}

	/// Current connection state name. Empty, if the monitor is not running.
	#[wasm_bindgen(getter)]
	pub fn state(&self) -> String {
		self.guard
			.borrow()
			.as_ref()
			.map(|g| g.state().as_str().to_owned())
			.unwrap_or_default()
	}
}

impl MonitorHandle {
	fn new(guard: Option<watchdog::Guard>) -> util::Result<Self> {
		let running = guard.is_some();
		let guard = Rc::new(RefCell::new(guard));
		let pagehide = if running {
			let guard = guard.clone();
			let win = util::window()?;

			// Fires for pages entering the back/forward cache as well
			Some(gloo::events::EventListener::new(&win, "pagehide", move |_| {
				guard.borrow_mut().take();
			}))
		} else {
			None
		};
		Ok(Self { guard, pagehide })
	}
}

/// Wrap an optional JS function as a transition observer
fn js_observer(f: Option<js_sys::Function>) -> Option<monitor::Observer> {
	f.map(|f| -> monitor::Observer {
		Box::new(move |t: monitor::Transition| {
			util::log_error_res(f.call2(
				&JsValue::NULL,
				&t.from.as_str().into(),
				&t.to.as_str().into(),
			))
		})
	})
}

fn run(
	settings: Settings,
	api: Option<PluginApi>,
	observer: Option<js_sys::Function>,
) -> util::Result<MonitorHandle> {
	let conf = settings.into_config()?;
	let banner: Box<dyn Banner> = match api {
		Some(api) => Box::new(HostBanner::new(api)),
		None => Box::new(DomBanner::new(banner::Document)),
	};
	MonitorHandle::new(watchdog::start(
		&conf,
		banner,
		Rc::new(health::HealthCheck::new(conf.require_ok_body)),
		Rc::new(Spawner),
		&watchdog::IntervalTicker,
		js_observer(observer),
	))
}

/// Start the connectivity monitor with settings passed by the host.
///
/// Uses the host's banner service, if `api` is passed, and injects its own
/// banner element otherwise.
#[wasm_bindgen]
pub fn start(
	settings: JsValue,
	api: Option<PluginApi>,
	observer: Option<js_sys::Function>,
) -> Result<MonitorHandle, JsValue> {
	Ok(run(Settings::from_js(&settings)?, api, observer)?)
}

/// Like `start`, but reads settings embedded in the page
#[wasm_bindgen]
pub fn start_from_page(
	api: Option<PluginApi>,
	observer: Option<js_sys::Function>,
) -> Result<MonitorHandle, JsValue> {
	Ok(run(Settings::from_page()?, api, observer)?)
}

#[wasm_bindgen(start)]
pub fn main_js() {
	console_error_panic_hook::set_once();
	wasm_logger::init(wasm_logger::Config::default());
}
