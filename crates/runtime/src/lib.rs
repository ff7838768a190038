pub mod event_bus;
pub mod timers;

pub use event_bus::*;
pub use timers::*;
