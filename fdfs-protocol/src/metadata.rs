//! Flat encoding for per-file metadata.
//!
//! Each entry is written as `key 0x02 value 0x01`. Nothing is escaped, so
//! keys and values must not contain either separator byte.

use std::collections::HashMap;

use bytes::{BufMut, Bytes, BytesMut};

use crate::types::{FIELD_SEPARATOR, RECORD_SEPARATOR};

/// Metadata attached to a stored file.
pub type FileMeta = HashMap<String, String>;

/// Encode `meta`. `None` and an empty map both produce no bytes.
pub fn marshal(meta: Option<&FileMeta>) -> Bytes {
    let meta = match meta {
        Some(m) if !m.is_empty() => m,
        _ => return Bytes::new(),
    };

    let size = meta.iter().map(|(k, v)| k.len() + v.len() + 2).sum();
    let mut buf = BytesMut::with_capacity(size);
    for (key, value) in meta {
        buf.put_slice(key.as_bytes());
        buf.put_u8(FIELD_SEPARATOR);
        buf.put_slice(value.as_bytes());
        buf.put_u8(RECORD_SEPARATOR);
    }
    buf.freeze()
}

/// Decode metadata produced by [`marshal`] or returned by a storage server.
///
/// Empty records are skipped. A record without a field separator becomes a
/// key with an empty value. Later duplicates win.
pub fn unmarshal(raw: &[u8]) -> FileMeta {
    let mut meta = FileMeta::new();
    for record in raw.split(|&b| b == RECORD_SEPARATOR) {
        if record.is_empty() {
            continue;
        }
        let (key, value) = match record.iter().position(|&b| b == FIELD_SEPARATOR) {
            Some(pos) => (&record[..pos], &record[pos + 1..]),
            None => (record, &[][..]),
        };
        meta.insert(
            String::from_utf8_lossy(key).into_owned(),
            String::from_utf8_lossy(value).into_owned(),
        );
    }
    meta
}
