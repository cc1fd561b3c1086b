//! Client for the todo sync server.
//!
//! - [`TodoClient`]: typed access to the REST API
//! - [`TodoTools`]: the named actions an agent invokes, returning readable text
//! - [`SyncListener`]: live change feed over WebSocket

mod error;
mod http;
mod listener;
mod tools;

pub use error::ClientError;
pub use http::{TodoClient, USER_AGENT};
pub use listener::SyncListener;
pub use tools::{TodoTools, NOT_FOUND_MESSAGE};
