//! Async client for FastDFS tracker and storage servers.
//!
//! A [`TrackerClient`] tells you which storage server to talk to; a
//! [`StorageClient`] moves file content and metadata. Each handle owns one
//! TCP connection and runs one exchange at a time.
//!
//! ```no_run
//! use std::io::Cursor;
//!
//! # async fn demo() -> Result<(), fdfs_client::ClientError> {
//! let mut tracker = fdfs_client::open_tracker("127.0.0.1:22122").await?;
//! let target = tracker.locate_upload_target().await?;
//!
//! let mut storage = fdfs_client::open_storage(&target.addr).await?;
//! let id = storage
//!     .upload(target.store_path_index, Cursor::new(b"hello"), 5, "txt")
//!     .await?;
//!
//! let data = storage.download_to_vec(&id.group, &id.path, 0, 0).await?;
//! assert_eq!(data, b"hello");
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod logging;

pub use client::{FileId, ResponseStream, StorageClient, TrackerClient, UploadTarget};
pub use config::ClientConfig;
pub use error::ClientError;
pub use fdfs_protocol::{FileMeta, GroupStat, MetadataMode};

/// Connect to a tracker with default settings.
pub async fn open_tracker(addr: &str) -> Result<TrackerClient, ClientError> {
    TrackerClient::connect(addr).await
}

/// Connect to a storage server with default settings.
pub async fn open_storage(addr: &str) -> Result<StorageClient, ClientError> {
    StorageClient::connect(addr).await
}
