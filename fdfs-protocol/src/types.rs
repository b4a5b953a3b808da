//! Command codes, field widths and fixed-layout records.

use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::field::{FileExtName, FixedStr, GroupName, IpText};

/// Width of a group name field.
pub const GROUP_NAME_MAX_LEN: usize = 16;

/// Width of an IP address text field.
pub const IP_ADDRESS_LEN: usize = 15;

/// Width of a file extension field.
pub const FILE_EXT_NAME_MAX_LEN: usize = 6;

/// Width of the group name inside a group stat record (one extra NUL byte).
pub const GROUP_STAT_NAME_LEN: usize = GROUP_NAME_MAX_LEN + 1;

/// Separates metadata records.
pub const RECORD_SEPARATOR: u8 = 0x01;

/// Separates a metadata key from its value.
pub const FIELD_SEPARATOR: u8 = 0x02;

/// Command codes carried in the header command byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    StorageUpload = 11,
    StorageDelete = 12,
    StorageSetMetadata = 13,
    StorageDownload = 14,
    StorageGetMetadata = 15,
    TrackerListGroups = 91,
    /// Command byte servers put on every reply.
    Response = 100,
    TrackerQueryStoreWithoutGroup = 101,
    TrackerQueryFetch = 102,
    TrackerQueryStoreWithGroup = 104,
}

impl TryFrom<u8> for Command {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, u8> {
        match value {
            11 => Ok(Command::StorageUpload),
            12 => Ok(Command::StorageDelete),
            13 => Ok(Command::StorageSetMetadata),
            14 => Ok(Command::StorageDownload),
            15 => Ok(Command::StorageGetMetadata),
            91 => Ok(Command::TrackerListGroups),
            100 => Ok(Command::Response),
            101 => Ok(Command::TrackerQueryStoreWithoutGroup),
            102 => Ok(Command::TrackerQueryFetch),
            104 => Ok(Command::TrackerQueryStoreWithGroup),
            _ => Err(value),
        }
    }
}

impl From<Command> for u8 {
    fn from(value: Command) -> Self {
        value as u8
    }
}

/// A record with a fixed big-endian layout inside a frame body.
pub trait FixedLayout: Sized {
    /// Encoded size in bytes.
    const SIZE: usize;

    /// Append the record to `buf`.
    fn put(&self, buf: &mut BytesMut);

    /// Decode the record. `buf` must hold at least [`Self::SIZE`] bytes.
    fn get<B: Buf>(buf: &mut B) -> Result<Self, ProtocolError>;
}

/// Address of a storage server as returned by the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageAddr {
    pub group: String,
    pub ip: String,
    pub port: u64,
}

impl StorageAddr {
    /// `ip:port` form suitable for connecting.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

impl FixedLayout for StorageAddr {
    const SIZE: usize = GROUP_NAME_MAX_LEN + IP_ADDRESS_LEN + 8;

    fn put(&self, buf: &mut BytesMut) {
        GroupName::new(&self.group).put(buf);
        IpText::new(&self.ip).put(buf);
        buf.put_u64(self.port);
    }

    fn get<B: Buf>(buf: &mut B) -> Result<Self, ProtocolError> {
        let group = GroupName::get(buf).to_text();
        let ip = IpText::get(buf).to_text();
        let port = buf.get_u64();
        Ok(StorageAddr { group, ip, port })
    }
}

/// Storage server selected for an upload, with the store path to use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreTarget {
    pub server: StorageAddr,
    pub store_path_index: u8,
}

impl FixedLayout for StoreTarget {
    const SIZE: usize = StorageAddr::SIZE + 1;

    fn put(&self, buf: &mut BytesMut) {
        self.server.put(buf);
        buf.put_u8(self.store_path_index);
    }

    fn get<B: Buf>(buf: &mut B) -> Result<Self, ProtocolError> {
        let server = StorageAddr::get(buf)?;
        let store_path_index = buf.get_u8();
        Ok(StoreTarget {
            server,
            store_path_index,
        })
    }
}

/// Per-group statistics from the tracker's group listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupStat {
    pub name: String,
    pub total_mb: u64,
    pub free_mb: u64,
    pub trunk_free_mb: u64,
    pub server_count: u64,
    pub storage_port: u64,
    pub storage_http_port: u64,
    pub active_count: u64,
    pub current_write_server: u64,
    pub store_path_count: u64,
    pub subdir_count_per_path: u64,
    pub current_trunk_file_id: u64,
}

impl FixedLayout for GroupStat {
    const SIZE: usize = GROUP_STAT_NAME_LEN + 11 * 8;

    fn put(&self, buf: &mut BytesMut) {
        FixedStr::<{ GROUP_STAT_NAME_LEN }>::new(&self.name).put(buf);
        buf.put_u64(self.total_mb);
        buf.put_u64(self.free_mb);
        buf.put_u64(self.trunk_free_mb);
        buf.put_u64(self.server_count);
        buf.put_u64(self.storage_port);
        buf.put_u64(self.storage_http_port);
        buf.put_u64(self.active_count);
        buf.put_u64(self.current_write_server);
        buf.put_u64(self.store_path_count);
        buf.put_u64(self.subdir_count_per_path);
        buf.put_u64(self.current_trunk_file_id);
    }

    fn get<B: Buf>(buf: &mut B) -> Result<Self, ProtocolError> {
        Ok(GroupStat {
            name: FixedStr::<{ GROUP_STAT_NAME_LEN }>::get(buf).to_text(),
            total_mb: buf.get_u64(),
            free_mb: buf.get_u64(),
            trunk_free_mb: buf.get_u64(),
            server_count: buf.get_u64(),
            storage_port: buf.get_u64(),
            storage_http_port: buf.get_u64(),
            active_count: buf.get_u64(),
            current_write_server: buf.get_u64(),
            store_path_count: buf.get_u64(),
            subdir_count_per_path: buf.get_u64(),
            current_trunk_file_id: buf.get_u64(),
        })
    }
}

/// Fixed prefix of an upload request. The file content follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadHeader {
    pub store_path_index: u8,
    pub file_size: u64,
    pub ext: FileExtName,
}

impl FixedLayout for UploadHeader {
    const SIZE: usize = 1 + 8 + FILE_EXT_NAME_MAX_LEN;

    fn put(&self, buf: &mut BytesMut) {
        buf.put_u8(self.store_path_index);
        buf.put_u64(self.file_size);
        self.ext.put(buf);
    }

    fn get<B: Buf>(buf: &mut B) -> Result<Self, ProtocolError> {
        Ok(UploadHeader {
            store_path_index: buf.get_u8(),
            file_size: buf.get_u64(),
            ext: FileExtName::get(buf),
        })
    }
}

/// Fixed prefix of a download request. The file path follows it.
///
/// A `length` of zero means "to the end of the file".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadHeader {
    pub offset: u64,
    pub length: u64,
    pub group: GroupName,
}

impl FixedLayout for DownloadHeader {
    const SIZE: usize = 8 + 8 + GROUP_NAME_MAX_LEN;

    fn put(&self, buf: &mut BytesMut) {
        buf.put_u64(self.offset);
        buf.put_u64(self.length);
        self.group.put(buf);
    }

    fn get<B: Buf>(buf: &mut B) -> Result<Self, ProtocolError> {
        Ok(DownloadHeader {
            offset: buf.get_u64(),
            length: buf.get_u64(),
            group: GroupName::get(buf),
        })
    }
}

/// How new metadata combines with what the server already stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetadataMode {
    /// Replace all existing metadata.
    Overwrite,
    /// Update the given keys and keep the rest.
    Merge,
}

impl From<MetadataMode> for u8 {
    fn from(value: MetadataMode) -> Self {
        match value {
            MetadataMode::Overwrite => b'O',
            MetadataMode::Merge => b'M',
        }
    }
}

impl TryFrom<u8> for MetadataMode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, u8> {
        match value {
            b'O' => Ok(MetadataMode::Overwrite),
            b'M' => Ok(MetadataMode::Merge),
            _ => Err(value),
        }
    }
}

/// Fixed prefix of a set-metadata request.
///
/// The path (`path_len` bytes) and the marshalled metadata (`meta_len`
/// bytes) follow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataHeader {
    pub path_len: u64,
    pub meta_len: u64,
    pub mode: MetadataMode,
    pub group: GroupName,
}

impl FixedLayout for MetadataHeader {
    const SIZE: usize = 8 + 8 + 1 + GROUP_NAME_MAX_LEN;

    fn put(&self, buf: &mut BytesMut) {
        buf.put_u64(self.path_len);
        buf.put_u64(self.meta_len);
        buf.put_u8(self.mode.into());
        self.group.put(buf);
    }

    fn get<B: Buf>(buf: &mut B) -> Result<Self, ProtocolError> {
        let path_len = buf.get_u64();
        let meta_len = buf.get_u64();
        let flag = buf.get_u8();
        let mode = MetadataMode::try_from(flag)
            .map_err(|v| ProtocolError::DecodeError(format!("unknown metadata mode 0x{:02X}", v)))?;
        Ok(MetadataHeader {
            path_len,
            meta_len,
            mode,
            group: GroupName::get(buf),
        })
    }
}
