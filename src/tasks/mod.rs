//! Background tasks spawned from `main`

pub mod cache_sweep;
pub mod log_flush;
pub mod retention;
