pub mod store;
pub mod trace;
pub mod undo;

pub use store::*;
pub use trace::*;
pub use undo::*;
