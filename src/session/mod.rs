// ABOUTME: Session module - the MCP session lifecycle and its tool catalog.
// ABOUTME: Open, handshake, discover, call, close; one request at a time.

mod catalog;
mod session;

pub use catalog::ToolCatalog;
pub use session::{Session, SessionState, with_session};

#[cfg(test)]
pub(crate) mod mock;
