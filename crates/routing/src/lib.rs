pub mod coordinator;
pub mod protocol;
pub mod service;
pub mod session;

pub use coordinator::*;
pub use protocol::*;
pub use service::*;
pub use session::*;
