use std::collections::HashMap;
use std::hash::Hash;

// Run, when an event fires on a particular state.
// Returns the next state of the FSM.
type TransitionHandler<C, S, E> = fn(&mut C, S, E) -> S;

// Configurable Finite State Machine.
// Enables defining transitions from a set of states.
//
// Events fired on a state with no registered transition are ignored and leave
// the state unchanged. Handlers may also keep the current state by returning it.
//
// C: Context passed to transition handlers
// S: State type
// E: Event type
pub struct FSM<C, S: Eq + Hash + Copy, E: Eq + Hash + Copy> {
	transition_handlers: HashMap<(S, E), TransitionHandler<C, S, E>>,

	// Current state of the FSM
	state: S,
}

impl<C, S: Eq + Hash + Copy, E: Eq + Hash + Copy> FSM<C, S, E> {
	// Create new FSM with a given start state
	pub fn new(state: S) -> Self {
		Self {
			transition_handlers: HashMap::new(),
			state,
		}
	}

	// Specify source state and event sets that transition the FSM into another
	// state by calling handler.
	//
	// The handler receives the context, the current FSM state and fired event
	// and must return the next state of the FSM.
	pub fn set_transitions(
		&mut self,
		states: &[S],
		events: &[E],
		handler: TransitionHandler<C, S, E>,
	) {
		for s in states {
			for e in events {
				self.transition_handlers.insert((*s, *e), handler);
			}
		}
	}

	// Feed an event into the FSM.
	// Returns the previous state, if the state of the FSM changed.
	//
	// Nothing is notified from within feed(), so callers can release any
	// borrows of the FSM before acting on the change.
	pub fn feed(&mut self, ctx: &mut C, event: E) -> Option<S> {
		let handler = *self.transition_handlers.get(&(self.state, event))?;
		let prev = self.state;
		self.state = handler(ctx, prev, event);
		if prev == self.state {
			None
		} else {
			Some(prev)
		}
	}

	// Return current state of FSM
	pub fn state(&self) -> S {
		self.state
	}
}

#[test]
fn basic_operation() {
	let mut fsm: FSM<u32, u8, u8> = FSM::new(0);
	let mut fed = 0;

	fn handle(fed: &mut u32, state: u8, event: u8) -> u8 {
		assert_eq!(state, 0);
		assert_eq!(event, 1);
		*fed += 1;
		3
	}

	fsm.set_transitions(&[0], &[1], handle);
	assert_eq!(fsm.feed(&mut fed, 1), Some(0));
	assert_eq!(fsm.state(), 3);
	assert_eq!(fed, 1);

	// No transition registered from 3
	assert_eq!(fsm.feed(&mut fed, 1), None);
	assert_eq!(fsm.state(), 3);
	assert_eq!(fed, 1);
}

#[test]
fn handler_keeps_state() {
	let mut fsm: FSM<(), u8, u8> = FSM::new(0);
	fsm.set_transitions(&[0], &[1], |_, _, _| 1);
	fsm.set_transitions(&[1], &[0], |_, _, _| 0);
	fsm.set_transitions(&[1], &[2], |_, s, _| s);

	let changes: Vec<_> = [1, 1, 2, 0, 0]
		.iter()
		.map(|e| fsm.feed(&mut (), *e))
		.collect();
	assert_eq!(changes, vec![Some(0), None, None, Some(1), None]);
	assert_eq!(fsm.state(), 0);
}
