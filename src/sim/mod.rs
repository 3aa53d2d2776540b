//! Runtime side of the simulator: per instantiation state, the event driven propagation engine,
//! the locking discipline between edits and steps, and the simulation driver on top.
mod event;
mod listener;
mod lock;
mod project;
mod propagator;
mod simulation;
mod state_tree;
mod test_vector;
pub use event::*;
pub use listener::*;
pub use lock::{hierarchy, with_hierarchy, Circuit, CircuitPermit, LockManager, PermitSet};
pub use project::*;
pub use propagator::*;
pub use simulation::*;
pub use state_tree::*;
pub use test_vector::*;
