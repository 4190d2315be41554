//! Offline-capable sync: wire protocol, client state, and the cycle engine.

pub mod client;
pub mod engine;
pub mod protocol;
pub mod scheduler;
pub mod state;
pub mod store;

pub use client::{SyncClientError, SyncHttpClient};
pub use engine::{SyncEngine, SyncReport};
pub use state::{SyncState, SyncStatus};
pub use store::SyncSession;
