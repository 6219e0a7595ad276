//! Session lanes (turn serialization) and per-session state.

pub mod queue;
pub mod registry;

pub use queue::{LaneStatus, LaneTicket, QueueError, TurnQueue};
pub use registry::{SessionHandle, SessionRegistry, SessionSnapshot, SessionState, lock_session};
