pub mod common;
pub mod config;
pub mod inbox;
pub mod pool;
pub mod session;
