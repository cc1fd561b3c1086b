//! Todo list service with live synchronization.
//!
//! The server keeps todos in memory, exposes CRUD over HTTP and pushes every
//! change to clients connected on `/ws`. The client half talks to that
//! server the way an external agent does.

pub mod client;
pub mod models;
pub mod protocol;
pub mod server;

pub use client::{ClientError, SyncListener, TodoClient, TodoTools};
pub use models::{Todo, TodoDraft};
pub use protocol::ServerMessage;
pub use server::{router, AppState, SyncHub};
