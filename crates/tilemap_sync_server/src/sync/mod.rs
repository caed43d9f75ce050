//! Room state synchronization.

pub mod cursor;
pub mod fanout;
pub mod service;

pub use fanout::{CommittedBatch, FanOut};
pub use service::{CatchUpResponse, InitResponse, SubmitOutcome, SyncService};
