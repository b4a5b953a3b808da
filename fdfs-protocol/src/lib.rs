//! Wire protocol for FastDFS tracker and storage servers.
//!
//! This crate defines the binary frame format shared by both server roles,
//! the fixed-layout records carried in frame bodies, and the metadata
//! encoding used for per-file attributes.
//!
//! # Frame Format
//!
//! ```text
//! +----------+---------+--------+------------------+
//! |  Length  | Command | Status |       Body       |
//! |  u64 BE  |   u8    |   u8   |    (variable)    |
//! +----------+---------+--------+------------------+
//! |  8 bytes | 1 byte  | 1 byte |  Length bytes    |
//! ```
//!
//! # Example
//!
//! ```rust
//! use fdfs_protocol::{Command, DownloadHeader, Frame, GroupName, HEADER_SIZE};
//!
//! # async fn demo() -> Result<(), fdfs_protocol::ProtocolError> {
//! let mut frame = Frame::new(Command::StorageDownload);
//! frame.put_fixed(&DownloadHeader {
//!     offset: 0,
//!     length: 0,
//!     group: GroupName::new("group1"),
//! });
//! frame.put_slice(b"M00/00/00/file.txt");
//!
//! let mut wire = Vec::new();
//! frame.encode(&mut wire).await?;
//! assert_eq!(wire.len(), HEADER_SIZE + 32 + 18);
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod error;
pub mod field;
pub mod metadata;
pub mod types;

pub use codec::{BodyReader, Frame, FrameHeader, HEADER_SIZE};
pub use error::{FrameStatus, ProtocolError, STATUS_NOT_FOUND};
pub use field::{FileExtName, FixedStr, GroupName, IpText};
pub use metadata::{marshal, unmarshal, FileMeta};
pub use types::{
    Command, DownloadHeader, FixedLayout, GroupStat, MetadataHeader, MetadataMode, StorageAddr,
    StoreTarget, UploadHeader, FIELD_SEPARATOR, FILE_EXT_NAME_MAX_LEN, GROUP_NAME_MAX_LEN,
    GROUP_STAT_NAME_LEN, IP_ADDRESS_LEN, RECORD_SEPARATOR,
};
