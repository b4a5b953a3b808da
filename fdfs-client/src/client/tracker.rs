//! Tracker client: asks the cluster which storage server to use.

use log::{debug, info};

use fdfs_protocol::{Command, GroupName, GroupStat, StorageAddr, StoreTarget};

use crate::client::connection::Connection;
use crate::config::ClientConfig;
use crate::error::ClientError;

/// Storage server chosen by the tracker for an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    /// Group the file will belong to.
    pub group: String,
    /// Storage server address as `ip:port`.
    pub addr: String,
    /// Store path on that server to pass to the upload.
    pub store_path_index: u8,
}

impl From<StoreTarget> for UploadTarget {
    fn from(target: StoreTarget) -> Self {
        UploadTarget {
            addr: target.server.addr(),
            group: target.server.group,
            store_path_index: target.store_path_index,
        }
    }
}

/// Connection to one tracker server.
pub struct TrackerClient {
    conn: Connection,
}

impl TrackerClient {
    /// Connect to the tracker at `addr` with default settings.
    pub async fn connect(addr: &str) -> Result<Self, ClientError> {
        Self::connect_with(addr, &ClientConfig::default()).await
    }

    /// Connect to the tracker at `addr`.
    pub async fn connect_with(addr: &str, config: &ClientConfig) -> Result<Self, ClientError> {
        let conn = Connection::open(addr, config).await?;
        Ok(Self { conn })
    }

    /// Connect to the first tracker listed in `config`.
    pub async fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let addr = config.tracker_server()?;
        Self::connect_with(addr, config).await
    }

    pub fn addr(&self) -> &str {
        self.conn.addr()
    }

    /// Ask for a storage server to upload to, in any group.
    pub async fn locate_upload_target(&mut self) -> Result<UploadTarget, ClientError> {
        self.conn.begin(Command::TrackerQueryStoreWithoutGroup);
        self.query_store().await
    }

    /// Ask for a storage server to upload to inside `group`.
    pub async fn locate_upload_target_in_group(
        &mut self,
        group: &str,
    ) -> Result<UploadTarget, ClientError> {
        let frame = self.conn.begin(Command::TrackerQueryStoreWithGroup);
        frame.put_fixed(&GroupName::new(group));
        self.query_store().await
    }

    async fn query_store(&mut self) -> Result<UploadTarget, ClientError> {
        self.conn.send().await?;

        let mut body = self.conn.receive().await?;
        let target: StoreTarget = body.read_fixed().await?;
        debug!(
            "Upload target: group={}, addr={}, store_path_index={}",
            target.server.group,
            target.server.addr(),
            target.store_path_index
        );
        Ok(target.into())
    }

    /// Ask for a storage server to download from. Returns `ip:port`.
    pub async fn locate_download_source(&mut self) -> Result<String, ClientError> {
        self.conn.begin(Command::TrackerQueryFetch);
        self.conn.send().await?;

        let mut body = self.conn.receive().await?;
        let server: StorageAddr = body.read_fixed().await?;
        debug!("Download source: group={}, addr={}", server.group, server.addr());
        Ok(server.addr())
    }

    /// List every group known to the tracker.
    pub async fn list_groups(&mut self) -> Result<Vec<GroupStat>, ClientError> {
        self.conn.begin(Command::TrackerListGroups);
        self.conn.send().await?;

        let mut body = self.conn.receive().await?;
        let mut groups = Vec::new();
        while body.remaining() > 0 {
            groups.push(body.read_fixed::<GroupStat>().await?);
        }
        drop(body);
        debug!("Tracker {} reports {} groups", self.conn.addr(), groups.len());
        Ok(groups)
    }

    /// Close the connection.
    pub async fn close(self) -> Result<(), ClientError> {
        info!("Closing tracker connection to {}", self.conn.addr());
        self.conn.close().await
    }
}
