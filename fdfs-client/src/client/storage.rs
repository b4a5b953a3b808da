//! Storage client: file transfer and metadata on one storage server.

use std::fmt;

use log::{debug, info};
use tokio::io::AsyncRead;

use fdfs_protocol::{
    marshal, unmarshal, Command, DownloadHeader, FileExtName, FileMeta, GroupName, MetadataHeader,
    MetadataMode, UploadHeader,
};

use crate::client::connection::{Connection, ResponseStream};
use crate::config::ClientConfig;
use crate::error::ClientError;

/// Location of a stored file as assigned by the storage server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileId {
    pub group: String,
    /// Path inside the group, e.g. `M00/00/00/wKgBCl...txt`.
    pub path: String,
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group, self.path)
    }
}

/// Connection to one storage server.
pub struct StorageClient {
    conn: Connection,
}

impl StorageClient {
    /// Connect to the storage server at `addr` with default settings.
    pub async fn connect(addr: &str) -> Result<Self, ClientError> {
        Self::connect_with(addr, &ClientConfig::default()).await
    }

    /// Connect to the storage server at `addr`.
    pub async fn connect_with(addr: &str, config: &ClientConfig) -> Result<Self, ClientError> {
        let conn = Connection::open(addr, config).await?;
        Ok(Self { conn })
    }

    pub fn addr(&self) -> &str {
        self.conn.addr()
    }

    /// Upload `size` bytes read from `content`.
    ///
    /// The content is streamed onto the socket and never buffered whole.
    /// `ext` is cut to six bytes. If `content` ends early the connection is
    /// left mid-frame and the client should be dropped.
    pub async fn upload<A>(
        &mut self,
        store_path_index: u8,
        content: A,
        size: u64,
        ext: &str,
    ) -> Result<FileId, ClientError>
    where
        A: AsyncRead + Unpin,
    {
        let frame = self.conn.begin(Command::StorageUpload);
        frame.put_fixed(&UploadHeader {
            store_path_index,
            file_size: size,
            ext: FileExtName::new(ext),
        });
        self.conn.send_with_attachment(content, size).await?;

        let mut body = self.conn.receive().await?;
        let group: GroupName = body.read_fixed().await?;
        let path = body.read_remaining().await?;
        drop(body);

        let id = FileId {
            group: group.to_text(),
            path: String::from_utf8_lossy(&path).into_owned(),
        };
        info!("Uploaded {} bytes to {} as {}", size, self.conn.addr(), id);
        Ok(id)
    }

    /// Download `length` bytes of `path` starting at `offset`.
    ///
    /// A `length` of zero reads to the end of the file. The returned stream
    /// borrows this client until it is dropped; any part of it left unread
    /// is skipped before the next request.
    pub async fn download(
        &mut self,
        group: &str,
        path: &str,
        offset: u64,
        length: u64,
    ) -> Result<ResponseStream<'_>, ClientError> {
        let frame = self.conn.begin(Command::StorageDownload);
        frame.put_fixed(&DownloadHeader {
            offset,
            length,
            group: GroupName::new(group),
        });
        frame.put_slice(path.as_bytes());
        self.conn.send().await?;

        debug!("Downloading {}/{} (offset={}, length={})", group, path, offset, length);
        self.conn.receive().await
    }

    /// Download into memory.
    pub async fn download_to_vec(
        &mut self,
        group: &str,
        path: &str,
        offset: u64,
        length: u64,
    ) -> Result<Vec<u8>, ClientError> {
        let mut stream = self.download(group, path, offset, length).await?;
        let data = stream.read_remaining().await?;
        Ok(data)
    }

    /// Delete a stored file.
    pub async fn delete(&mut self, group: &str, path: &str) -> Result<(), ClientError> {
        let frame = self.conn.begin(Command::StorageDelete);
        frame.put_fixed(&GroupName::new(group));
        frame.put_slice(path.as_bytes());
        self.conn.send().await?;

        let mut body = self.conn.receive().await?;
        body.discard().await?;
        info!("Deleted {}/{}", group, path);
        Ok(())
    }

    /// Store metadata for a file, replacing or merging per `mode`.
    pub async fn set_metadata(
        &mut self,
        group: &str,
        path: &str,
        meta: &FileMeta,
        mode: MetadataMode,
    ) -> Result<(), ClientError> {
        let encoded = marshal(Some(meta));

        let frame = self.conn.begin(Command::StorageSetMetadata);
        frame.put_fixed(&MetadataHeader {
            path_len: path.len() as u64,
            meta_len: encoded.len() as u64,
            mode,
            group: GroupName::new(group),
        });
        frame.put_slice(path.as_bytes());
        frame.put_slice(&encoded);
        self.conn.send().await?;

        let mut body = self.conn.receive().await?;
        body.discard().await?;
        debug!("Set {} metadata entries on {}/{} ({:?})", meta.len(), group, path, mode);
        Ok(())
    }

    /// Fetch the metadata stored for a file.
    pub async fn get_metadata(&mut self, group: &str, path: &str) -> Result<FileMeta, ClientError> {
        let frame = self.conn.begin(Command::StorageGetMetadata);
        frame.put_fixed(&GroupName::new(group));
        frame.put_slice(path.as_bytes());
        self.conn.send().await?;

        let mut body = self.conn.receive().await?;
        let raw = body.read_remaining().await?;
        Ok(unmarshal(&raw))
    }

    /// Close the connection.
    pub async fn close(self) -> Result<(), ClientError> {
        info!("Closing storage connection to {}", self.conn.addr());
        self.conn.close().await
    }
}
