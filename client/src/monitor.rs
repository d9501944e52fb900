use crate::banner::Banner;
use crate::fsm::FSM;

/// Reachability of the server as last observed
#[repr(u8)]
#[derive(Eq, PartialEq, Hash, Copy, Clone, Debug)]
pub enum ConnState {
	Healthy,
	Failed,
}

impl Default for ConnState {
	fn default() -> Self {
		Self::Healthy
	}
}

impl ConnState {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Healthy => "healthy",
			Self::Failed => "failed",
		}
	}
}

/// Collapsed result of a single health check
#[repr(u8)]
#[derive(Eq, PartialEq, Hash, Copy, Clone, Debug)]
pub enum Outcome {
	Success,
	Failure,
}

/// Applied state change passed to observers
#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub struct Transition {
	pub from: ConnState,
	pub to: ConnState,
}

/// Called on every applied state transition
pub type Observer = Box<dyn Fn(Transition)>;

struct Ctx<B: Banner> {
	banner: B,
	message: String,
}

/// Owns the connection state and drives the banner on state changes
pub struct Monitor<B: Banner> {
	fsm: FSM<Ctx<B>, ConnState, Outcome>,
	ctx: Ctx<B>,
}

impl<B: Banner> Monitor<B> {
	pub fn new(banner: B, message: String) -> Self {
		use ConnState::*;

		// A banner that could not be updated keeps the current state, so the
		// next check with the same outcome retries
		let mut fsm: FSM<Ctx<B>, ConnState, Outcome> = FSM::new(Healthy);
		fsm.set_transitions(&[Healthy], &[Outcome::Failure], |c, s, _| {
			match c.banner.show(&c.message) {
				Ok(_) => {
					log::warn!("server unreachable");
					Failed
				}
				Err(e) => {
					log::error!("could not show disconnect banner: {}", e);
					s
				}
			}
		});
		fsm.set_transitions(&[Failed], &[Outcome::Success], |c, s, _| {
			match c.banner.hide() {
				Ok(_) => {
					log::info!("server reachable again");
					Healthy
				}
				Err(e) => {
					log::error!("could not hide disconnect banner: {}", e);
					s
				}
			}
		});

		Self {
			fsm,
			ctx: Ctx { banner, message },
		}
	}

	/// Apply the outcome of a health check.
	/// Returns the transition, if the state changed.
	pub fn apply(&mut self, outcome: Outcome) -> Option<Transition> {
		let from = self.fsm.feed(&mut self.ctx, outcome)?;
		Some(Transition {
			from,
			to: self.fsm.state(),
		})
	}

	#[inline]
	pub fn state(&self) -> ConnState {
		self.fsm.state()
	}
}
