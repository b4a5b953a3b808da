//! In-process tracker and storage servers for the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use fdfs_protocol::{
    marshal, unmarshal, Command, DownloadHeader, FileMeta, FixedLayout, Frame, FrameHeader,
    GroupName, GroupStat, MetadataHeader, MetadataMode, StorageAddr, StoreTarget, UploadHeader,
    HEADER_SIZE, STATUS_NOT_FOUND,
};

pub const GROUP: &str = "group1";

/// Status the mock servers use for a malformed request.
pub const STATUS_INVALID: u8 = 22;

pub struct Reply {
    pub status: u8,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn ok(body: Vec<u8>) -> Self {
        Reply { status: 0, body }
    }

    pub fn empty() -> Self {
        Reply::ok(Vec::new())
    }

    pub fn status(status: u8) -> Self {
        Reply {
            status,
            body: Vec::new(),
        }
    }
}

/// Read one request. Returns `None` once the client hangs up.
pub async fn read_request(stream: &mut TcpStream) -> io::Result<Option<(FrameHeader, Vec<u8>)>> {
    let mut raw = [0u8; HEADER_SIZE];
    match stream.read_exact(&mut raw).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let header = FrameHeader::from_bytes(&raw);
    let mut body = vec![0u8; header.length as usize];
    stream.read_exact(&mut body).await?;
    Ok(Some((header, body)))
}

pub async fn write_reply(stream: &mut TcpStream, reply: Reply) -> io::Result<()> {
    let mut frame = Frame::new(Command::Response);
    frame.set_status(reply.status);
    frame.put_slice(&reply.body);
    frame.encode(stream).await.map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    stream.flush().await
}

/// Raw bytes of a reply frame, for servers that misbehave on purpose.
pub fn raw_reply(status: u8, body: &[u8]) -> Vec<u8> {
    let header = FrameHeader {
        length: body.len() as u64,
        command: Command::Response.into(),
        status,
    };
    let mut out = header.to_bytes().to_vec();
    out.extend_from_slice(body);
    out
}

fn encode<T: FixedLayout>(record: &T) -> Vec<u8> {
    let mut buf = BytesMut::new();
    record.put(&mut buf);
    buf.to_vec()
}

fn split_group_path(body: &[u8]) -> Option<(String, String)> {
    if body.len() < GroupName::WIDTH {
        return None;
    }
    let group = GroupName::from_bytes(&body[..GroupName::WIDTH]).to_text();
    let path = String::from_utf8_lossy(&body[GroupName::WIDTH..]).into_owned();
    Some((group, path))
}

#[derive(Debug, Default, Clone)]
pub struct StoredFile {
    pub content: Vec<u8>,
    pub meta: FileMeta,
}

/// Storage server keeping files in memory under group [`GROUP`].
pub struct MockStorage {
    pub addr: SocketAddr,
    pub files: Arc<Mutex<HashMap<String, StoredFile>>>,
    /// Commands received so far, in order.
    pub commands: Arc<Mutex<Vec<u8>>>,
}

impl MockStorage {
    pub async fn spawn() -> MockStorage {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let files: Arc<Mutex<HashMap<String, StoredFile>>> = Arc::default();
        let commands: Arc<Mutex<Vec<u8>>> = Arc::default();
        let counter = Arc::new(AtomicU32::new(0));

        let (f, c) = (files.clone(), commands.clone());
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let (files, commands, counter) = (f.clone(), c.clone(), counter.clone());
                tokio::spawn(async move {
                    while let Ok(Some((header, body))) = read_request(&mut stream).await {
                        commands.lock().unwrap().push(header.command);
                        let reply = handle_storage(&files, &counter, header.command, &body);
                        if write_reply(&mut stream, reply).await.is_err() {
                            break;
                        }
                    }
                });
            }
        });

        MockStorage {
            addr,
            files,
            commands,
        }
    }

    pub fn addr(&self) -> String {
        self.addr.to_string()
    }

    pub fn insert(&self, path: &str, content: &[u8]) {
        self.files.lock().unwrap().insert(
            path.to_string(),
            StoredFile {
                content: content.to_vec(),
                meta: FileMeta::new(),
            },
        );
    }

    pub fn content(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path).map(|f| f.content.clone())
    }

    pub fn commands(&self) -> Vec<u8> {
        self.commands.lock().unwrap().clone()
    }
}

fn handle_storage(
    files: &Mutex<HashMap<String, StoredFile>>,
    counter: &AtomicU32,
    command: u8,
    body: &[u8],
) -> Reply {
    match Command::try_from(command) {
        Ok(Command::StorageUpload) => {
            if body.len() < UploadHeader::SIZE {
                return Reply::status(STATUS_INVALID);
            }
            let header = UploadHeader::get(&mut &body[..UploadHeader::SIZE]).unwrap();
            let content = &body[UploadHeader::SIZE..];
            if content.len() as u64 != header.file_size {
                return Reply::status(STATUS_INVALID);
            }

            let n = counter.fetch_add(1, Ordering::SeqCst);
            let path = format!("M00/00/{:02X}/file{:04}.{}", header.store_path_index, n, header.ext.to_text());
            files.lock().unwrap().insert(
                path.clone(),
                StoredFile {
                    content: content.to_vec(),
                    meta: FileMeta::new(),
                },
            );

            let mut reply = encode(&GroupName::new(GROUP));
            reply.extend_from_slice(path.as_bytes());
            Reply::ok(reply)
        }
        Ok(Command::StorageDownload) => {
            if body.len() < DownloadHeader::SIZE {
                return Reply::status(STATUS_INVALID);
            }
            let header = DownloadHeader::get(&mut &body[..DownloadHeader::SIZE]).unwrap();
            let path = String::from_utf8_lossy(&body[DownloadHeader::SIZE..]).into_owned();
            if header.group.to_text() != GROUP {
                return Reply::status(STATUS_NOT_FOUND);
            }

            let files = files.lock().unwrap();
            let Some(file) = files.get(&path) else {
                return Reply::status(STATUS_NOT_FOUND);
            };
            let start = header.offset as usize;
            let end = if header.length == 0 {
                file.content.len()
            } else {
                start + header.length as usize
            };
            if start > file.content.len() || end > file.content.len() {
                return Reply::status(STATUS_INVALID);
            }
            Reply::ok(file.content[start..end].to_vec())
        }
        Ok(Command::StorageDelete) => {
            let Some((group, path)) = split_group_path(body) else {
                return Reply::status(STATUS_INVALID);
            };
            if group != GROUP || files.lock().unwrap().remove(&path).is_none() {
                return Reply::status(STATUS_NOT_FOUND);
            }
            Reply::empty()
        }
        Ok(Command::StorageSetMetadata) => {
            if body.len() < MetadataHeader::SIZE {
                return Reply::status(STATUS_INVALID);
            }
            let header = MetadataHeader::get(&mut &body[..MetadataHeader::SIZE]).unwrap();
            let rest = &body[MetadataHeader::SIZE..];
            let path_len = header.path_len as usize;
            if rest.len() != path_len + header.meta_len as usize {
                return Reply::status(STATUS_INVALID);
            }
            let path = String::from_utf8_lossy(&rest[..path_len]).into_owned();
            let meta = unmarshal(&rest[path_len..]);

            let mut files = files.lock().unwrap();
            let Some(file) = files.get_mut(&path) else {
                return Reply::status(STATUS_NOT_FOUND);
            };
            match header.mode {
                MetadataMode::Overwrite => file.meta = meta,
                MetadataMode::Merge => file.meta.extend(meta),
            }
            Reply::empty()
        }
        Ok(Command::StorageGetMetadata) => {
            let Some((_, path)) = split_group_path(body) else {
                return Reply::status(STATUS_INVALID);
            };
            match files.lock().unwrap().get(&path) {
                Some(file) => Reply::ok(marshal(Some(&file.meta)).to_vec()),
                None => Reply::status(STATUS_NOT_FOUND),
            }
        }
        _ => Reply::status(STATUS_INVALID),
    }
}

/// Tracker that always points at one storage server.
pub struct MockTracker {
    pub addr: SocketAddr,
}

impl MockTracker {
    pub async fn spawn(storage: SocketAddr) -> MockTracker {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    while let Ok(Some((header, body))) = read_request(&mut stream).await {
                        let reply = handle_tracker(storage, header.command, &body);
                        if write_reply(&mut stream, reply).await.is_err() {
                            break;
                        }
                    }
                });
            }
        });

        MockTracker { addr }
    }

    pub fn addr(&self) -> String {
        self.addr.to_string()
    }
}

pub fn group_stats() -> Vec<GroupStat> {
    vec![
        GroupStat {
            name: GROUP.to_string(),
            total_mb: 4096,
            free_mb: 1024,
            server_count: 2,
            storage_port: 23000,
            active_count: 2,
            store_path_count: 1,
            subdir_count_per_path: 256,
            ..Default::default()
        },
        GroupStat {
            name: "group2".to_string(),
            total_mb: 2048,
            free_mb: 2048,
            server_count: 1,
            storage_port: 23000,
            active_count: 1,
            store_path_count: 2,
            subdir_count_per_path: 256,
            ..Default::default()
        },
    ]
}

fn handle_tracker(storage: SocketAddr, command: u8, body: &[u8]) -> Reply {
    let server = StorageAddr {
        group: GROUP.to_string(),
        ip: storage.ip().to_string(),
        port: u64::from(storage.port()),
    };
    let target = StoreTarget {
        server: server.clone(),
        store_path_index: 0,
    };

    match Command::try_from(command) {
        Ok(Command::TrackerQueryStoreWithoutGroup) => Reply::ok(encode(&target)),
        Ok(Command::TrackerQueryStoreWithGroup) => {
            if body.len() != GroupName::WIDTH {
                return Reply::status(STATUS_INVALID);
            }
            if GroupName::from_bytes(body).to_text() != GROUP {
                return Reply::status(STATUS_NOT_FOUND);
            }
            Reply::ok(encode(&target))
        }
        Ok(Command::TrackerQueryFetch) => Reply::ok(encode(&server)),
        Ok(Command::TrackerListGroups) => {
            let mut out = Vec::new();
            for stat in group_stats() {
                out.extend(encode(&stat));
            }
            Reply::ok(out)
        }
        _ => Reply::status(STATUS_INVALID),
    }
}

/// Server that answers the n-th request with the n-th raw reply, then hangs up.
pub async fn spawn_scripted(replies: Vec<Vec<u8>>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        if let Ok((mut stream, _)) = listener.accept().await {
            for reply in replies {
                match read_request(&mut stream).await {
                    Ok(Some(_)) => {}
                    _ => return,
                }
                if stream.write_all(&reply).await.is_err() {
                    return;
                }
            }
        }
    });

    addr
}
