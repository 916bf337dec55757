pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod model;
pub mod notify;
pub mod reconcile;
pub mod router;
pub mod storage;
