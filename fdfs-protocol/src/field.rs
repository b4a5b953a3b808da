//! Fixed-width, NUL-padded text fields.
//!
//! Group names, IP addresses and file extensions travel as byte arrays of a
//! fixed width. Writing truncates to the width and zero-pads; reading stops
//! at the first NUL.

use std::fmt;

use bytes::{Buf, BufMut, BytesMut};

use crate::error::ProtocolError;
use crate::types::{FixedLayout, FILE_EXT_NAME_MAX_LEN, GROUP_NAME_MAX_LEN, IP_ADDRESS_LEN};

/// A text field occupying exactly `N` bytes on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedStr<const N: usize>([u8; N]);

/// 16-byte group name field.
pub type GroupName = FixedStr<GROUP_NAME_MAX_LEN>;

/// 15-byte IP address text field.
pub type IpText = FixedStr<IP_ADDRESS_LEN>;

/// 6-byte file extension field.
pub type FileExtName = FixedStr<FILE_EXT_NAME_MAX_LEN>;

impl<const N: usize> FixedStr<N> {
    /// Width of the field on the wire.
    pub const WIDTH: usize = N;

    /// Build a field from `text`, keeping at most the first `N` bytes.
    pub fn new(text: &str) -> Self {
        Self::from_bytes(text.as_bytes())
    }

    /// Build a field from raw bytes, truncating or zero-padding to `N`.
    pub fn from_bytes(raw: &[u8]) -> Self {
        let mut field = [0u8; N];
        let n = raw.len().min(N);
        field[..n].copy_from_slice(&raw[..n]);
        Self(field)
    }

    /// The full padded field as sent on the wire.
    pub fn as_bytes(&self) -> &[u8; N] {
        &self.0
    }

    /// Bytes before the first NUL.
    pub fn trimmed(&self) -> &[u8] {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(N);
        &self.0[..end]
    }

    /// Logical text value with padding removed.
    ///
    /// Invalid UTF-8 is replaced rather than rejected; server-supplied fields
    /// are passed through without validation.
    pub fn to_text(&self) -> String {
        String::from_utf8_lossy(self.trimmed()).into_owned()
    }

    pub fn put<B: BufMut>(&self, buf: &mut B) {
        buf.put_slice(&self.0);
    }

    /// Read `N` bytes from `buf`. The caller guarantees they are available.
    pub fn get<B: Buf>(buf: &mut B) -> Self {
        let mut field = [0u8; N];
        buf.copy_to_slice(&mut field);
        Self(field)
    }
}

impl<const N: usize> FixedLayout for FixedStr<N> {
    const SIZE: usize = N;

    fn put(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.0);
    }

    fn get<B: Buf>(buf: &mut B) -> Result<Self, ProtocolError> {
        Ok(FixedStr::get(buf))
    }
}

impl<const N: usize> Default for FixedStr<N> {
    fn default() -> Self {
        Self([0u8; N])
    }
}

impl<const N: usize> From<&str> for FixedStr<N> {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl<const N: usize> fmt::Debug for FixedStr<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FixedStr<{}>({:?})", N, String::from_utf8_lossy(self.trimmed()))
    }
}

impl<const N: usize> fmt::Display for FixedStr<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.trimmed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn test_extension_truncated_to_width() {
        let ext = FileExtName::new("abcdefgh");
        assert_eq!(ext.as_bytes(), b"abcdef");
        assert_eq!(ext.to_text(), "abcdef");
    }

    #[test]
    fn test_extension_zero_padded() {
        let ext = FileExtName::new("jpg");
        assert_eq!(ext.as_bytes(), &[b'j', b'p', b'g', 0, 0, 0]);
        assert_eq!(ext.trimmed(), b"jpg");
    }

    #[test]
    fn test_empty_field_is_all_zero() {
        let ext = FileExtName::new("");
        assert_eq!(ext.as_bytes(), &[0u8; 6]);
        assert_eq!(ext, FileExtName::default());
        assert_eq!(ext.to_text(), "");
    }

    #[test]
    fn test_group_read_stops_at_nul() {
        let mut raw = BytesMut::new();
        raw.extend_from_slice(b"group1");
        raw.extend_from_slice(&[0u8; 10]);
        raw.extend_from_slice(b"tail");

        let mut buf = raw.freeze();
        let group = GroupName::get(&mut buf);
        assert_eq!(group.to_text(), "group1");
        assert_eq!(&buf[..], b"tail");
    }

    #[test]
    fn test_put_writes_full_width() {
        let mut buf = BytesMut::new();
        IpText::new("10.0.0.1").put(&mut buf);
        assert_eq!(buf.len(), IpText::WIDTH);
        assert_eq!(&buf[..8], b"10.0.0.1");
        assert!(buf[8..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_full_width_field_has_no_terminator() {
        let group = GroupName::new("0123456789abcdef");
        assert_eq!(group.trimmed().len(), 16);
        assert_eq!(group.to_string(), "0123456789abcdef");
    }
}
