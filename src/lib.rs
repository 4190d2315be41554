pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod server;
pub mod sync;
pub mod transform;
