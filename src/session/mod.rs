//! Session tracking and lifecycle handling

mod manager;
mod registry;

pub use manager::{SessionManager, SessionTransport};
pub use registry::{Session, SessionId, SessionRegistry};
