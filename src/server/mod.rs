//! Sync server: coordinator semantics plus the axum routes over them.

mod coordinator;
mod routes;

pub use coordinator::Coordinator;
pub use routes::{router, AppState};
