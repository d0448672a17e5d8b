//! Event bus and spectator-facing event payloads.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
