//! Event system for the coding task engine.
//!
//! Workflow components publish lifecycle events here; consumers
//! (dashboards, log sinks) subscribe. Publishing never blocks and never
//! fails: with no subscribers the event is simply dropped.

mod bus;
mod types;

pub use bus::EventBus;
pub use types::*;
