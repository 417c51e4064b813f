//! Blob (raw disc image) access.

use std::{
    fmt, fs,
    fs::File,
    io::{BufReader, Read, Seek, SeekFrom},
    path::Path,
};

use crate::{Error, Result, ResultContext};

/// SHA-1 hash bytes
pub type HashBytes = [u8; 20];

/// AES key bytes
pub type KeyBytes = [u8; 16];

/// Decrypts data in-place using AES-128-CBC with the given key and IV.
pub(crate) fn aes_decrypt(key: &KeyBytes, iv: KeyBytes, data: &mut [u8]) {
    use aes::cipher::{block_padding::NoPadding, BlockDecryptMut, KeyIvInit};
    <cbc::Decryptor<aes::Aes128>>::new(key.into(), &aes::Block::from(iv))
        .decrypt_padded_mut::<NoPadding>(data)
        .unwrap(); // Safe: using NoPadding
}

/// The underlying storage format of a disc image blob.
///
/// This crate only provides [`StreamBlob`] for plain images; compressed and
/// container formats are expected to implement [`BlobReader`] externally and
/// report their format here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlobType {
    /// Raw disc image (ISO/GCM)
    #[default]
    Plain,
    /// CISO container
    Ciso,
    /// GCZ compressed image
    Gcz,
    /// WBFS container
    Wbfs,
    /// WIA / RVZ container
    Wia,
}

impl fmt::Display for BlobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlobType::Plain => write!(f, "Plain"),
            BlobType::Ciso => write!(f, "CISO"),
            BlobType::Gcz => write!(f, "GCZ"),
            BlobType::Wbfs => write!(f, "WBFS"),
            BlobType::Wia => write!(f, "WIA"),
        }
    }
}

/// Random-access reader over a raw disc image.
///
/// All reads are absolute. Failures surface as `false` / `None`, never as
/// panics; a short read is a failure. Every multi-byte scalar on disc is
/// big-endian, so the provided scalar helpers decode accordingly.
///
/// Implementations are used from a single thread at a time; `Send` is
/// required so a volume can move across threads, but no synchronization is
/// expected of the reader itself.
pub trait BlobReader: Send {
    /// Reads exactly `out.len()` bytes at `offset`.
    ///
    /// Returns `false` on any I/O error or short read, in which case the
    /// contents of `out` are unspecified.
    fn read(&mut self, offset: u64, out: &mut [u8]) -> bool;

    /// The size of the disc data this blob decodes to.
    fn data_size(&self) -> u64;

    /// The size of the blob itself on disk.
    fn raw_size(&self) -> u64;

    /// The blob's underlying storage format.
    fn blob_type(&self) -> BlobType;

    /// Reads the byte at `offset`.
    #[inline]
    fn read_be_u8(&mut self, offset: u64) -> Option<u8> {
        let mut buf = [0u8; 1];
        self.read(offset, &mut buf).then(|| buf[0])
    }

    /// Reads a big-endian `u16` at `offset`.
    #[inline]
    fn read_be_u16(&mut self, offset: u64) -> Option<u16> {
        let mut buf = [0u8; 2];
        self.read(offset, &mut buf).then(|| u16::from_be_bytes(buf))
    }

    /// Reads a big-endian `u32` at `offset`.
    #[inline]
    fn read_be_u32(&mut self, offset: u64) -> Option<u32> {
        let mut buf = [0u8; 4];
        self.read(offset, &mut buf).then(|| u32::from_be_bytes(buf))
    }

    /// Reads a big-endian `u64` at `offset`.
    #[inline]
    fn read_be_u64(&mut self, offset: u64) -> Option<u64> {
        let mut buf = [0u8; 8];
        self.read(offset, &mut buf).then(|| u64::from_be_bytes(buf))
    }
}

/// A plain (uncompressed) disc image backed by any seekable stream.
pub struct StreamBlob<R> {
    stream: R,
    size: u64,
}

impl<R> StreamBlob<R>
where R: Read + Seek + Send
{
    /// Wraps a stream, probing its total size.
    pub fn new(mut stream: R) -> Result<Self> {
        let size = stream.seek(SeekFrom::End(0)).context("Probing stream size")?;
        Ok(Self { stream, size })
    }
}

impl<R> BlobReader for StreamBlob<R>
where R: Read + Seek + Send
{
    fn read(&mut self, offset: u64, out: &mut [u8]) -> bool {
        self.stream.seek(SeekFrom::Start(offset)).is_ok() && self.stream.read_exact(out).is_ok()
    }

    #[inline]
    fn data_size(&self) -> u64 { self.size }

    #[inline]
    fn raw_size(&self) -> u64 { self.size }

    #[inline]
    fn blob_type(&self) -> BlobType { BlobType::Plain }
}

/// Opens a plain disc image from a filesystem path.
pub(crate) fn open(filename: &Path) -> Result<StreamBlob<BufReader<File>>> {
    let path = fs::canonicalize(filename)
        .with_context(|| format!("Failed to open {}", filename.display()))?;
    let meta =
        fs::metadata(&path).with_context(|| format!("Failed to open {}", filename.display()))?;
    if !meta.is_file() {
        return Err(Error::DiscFormat(format!("Input is not a file: {}", filename.display())));
    }
    let file =
        File::open(&path).with_context(|| format!("Failed to open {}", filename.display()))?;
    StreamBlob::new(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn scalar_reads_are_big_endian() {
        let mut blob = StreamBlob::new(Cursor::new(vec![0x01, 0x02, 0x03, 0x04, 0x05])).unwrap();
        assert_eq!(blob.read_be_u8(0), Some(0x01));
        assert_eq!(blob.read_be_u16(1), Some(0x0203));
        assert_eq!(blob.read_be_u32(0), Some(0x01020304));
        assert_eq!(blob.read_be_u32(1), Some(0x02030405));
    }

    #[test]
    fn short_reads_fail() {
        let mut blob = StreamBlob::new(Cursor::new(vec![0u8; 8])).unwrap();
        assert_eq!(blob.data_size(), 8);
        let mut buf = [0u8; 4];
        assert!(blob.read(4, &mut buf));
        assert!(!blob.read(5, &mut buf));
        assert_eq!(blob.read_be_u64(1), None);
    }
}
