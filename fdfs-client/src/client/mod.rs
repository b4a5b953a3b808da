//! Tracker and storage clients.

mod connection;
pub mod storage;
pub mod tracker;

pub use connection::ResponseStream;
pub use storage::{FileId, StorageClient};
pub use tracker::{TrackerClient, UploadTarget};
