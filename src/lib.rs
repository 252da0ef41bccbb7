//! query-bridge library exports

pub mod buffer;
pub mod cache;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod logger;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;
pub mod tasks;
pub mod transform;
