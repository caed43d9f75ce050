pub mod config;
pub mod db;
pub mod delta_log;
pub mod error;
pub mod handlers;
pub mod room;
pub mod store;
pub mod sync;
