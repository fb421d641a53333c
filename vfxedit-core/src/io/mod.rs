//! # Chunk codec
//!
//! Containers are trees of chunks. Every chunk is a 4-byte ASCII tag, a little-endian `i32` length counting
//! the whole chunk *including* its 8 byte header, then `length - 8` bytes of payload. The payload is either
//! scalar data or more chunks of the same shape, zero-padded to a 4 byte boundary with the padding counted
//! in `length`. A reader that does not recognize a tag can always skip it by its length.

pub mod decode;
pub mod encode;
pub mod incremental;

pub use decode::{read_chunks, read_nested, ChunkReader};
pub use encode::{write_chunk, ChunkWriter};

use std::io::{Read, Result as IOResult, Seek, Write};

/// Size of the tag + length header.
pub const HEADER_LEN: u64 = 8;
/// Payloads are padded to a multiple of this.
pub const ALIGNMENT: u32 = 4;

#[derive(PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ChunkID(pub [u8; 4]);
impl ChunkID {
    pub const AVFX: Self = Self::from_name("AVFX");
    /// Tags shorter than four characters are padded with NUL.
    #[must_use]
    pub const fn from_name(name: &str) -> Self {
        let bytes = name.as_bytes();
        let mut id = [0; 4];
        let mut i = 0;
        while i < bytes.len() && i < 4 {
            id[i] = bytes[i];
            i += 1;
        }
        Self(id)
    }
    /// The tag as text, without NUL padding. None if it is not valid UTF-8.
    #[must_use]
    pub fn id_str(&self) -> Option<&str> {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(4);
        std::str::from_utf8(&self.0[..end]).ok()
    }
}
impl std::fmt::Display for ChunkID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Write as a string if possible, otherwise as a hex string.
        if let Some(str) = self.id_str() {
            f.write_str(str)
        } else {
            write!(f, "{:x?}", self.0)
        }
    }
}
impl std::fmt::Debug for ChunkID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ChunkID({self})")
    }
}
impl std::ops::Deref for ChunkID {
    type Target = [u8];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("truncated chunk header at offset {offset:#x} while reading {within}")]
    TruncatedHeader { offset: u64, within: ChunkID },
    #[error("chunk {id} at offset {offset:#x} declares length {len}, but {available} bytes are available")]
    LengthOutOfBounds {
        id: ChunkID,
        offset: u64,
        len: i32,
        available: u64,
    },
    #[error("field {id} at offset {offset:#x} needs {need} bytes, payload has {have}")]
    FieldTooShort {
        id: ChunkID,
        offset: u64,
        need: u32,
        have: u32,
    },
    #[error("expected root chunk {expected}, found {found}")]
    UnexpectedRoot { expected: ChunkID, found: ChunkID },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A readable, seekable stream that knows where it sits within the whole document,
/// so decode errors can name absolute byte offsets.
pub trait Source: Read + Seek {
    /// Offset of the current position from the start of the document.
    fn absolute_position(&mut self) -> IOResult<u64>;
}
impl<T: AsRef<[u8]>> Source for std::io::Cursor<T> {
    fn absolute_position(&mut self) -> IOResult<u64> {
        Ok(self.position())
    }
}
impl<S: Source + ?Sized> Source for &mut S {
    fn absolute_position(&mut self) -> IOResult<u64> {
        (**self).absolute_position()
    }
}

/// A byte slice that was cut out of a larger document at `base`.
pub struct SliceSource<'a> {
    inner: std::io::Cursor<&'a [u8]>,
    base: u64,
}
impl<'a> SliceSource<'a> {
    #[must_use]
    pub fn new(bytes: &'a [u8], base: u64) -> Self {
        Self {
            inner: std::io::Cursor::new(bytes),
            base,
        }
    }
    #[must_use]
    pub fn len(&self) -> u64 {
        self.inner.get_ref().len() as u64
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.get_ref().is_empty()
    }
}
impl Read for SliceSource<'_> {
    fn read(&mut self, buf: &mut [u8]) -> IOResult<usize> {
        self.inner.read(buf)
    }
}
impl Seek for SliceSource<'_> {
    fn seek(&mut self, pos: std::io::SeekFrom) -> IOResult<u64> {
        self.inner.seek(pos)
    }
}
impl Source for SliceSource<'_> {
    fn absolute_position(&mut self) -> IOResult<u64> {
        Ok(self.base + self.inner.position())
    }
}

/// A writable, seekable stream. Chunk lengths are backpatched, so plain `Write` is not enough.
pub trait Sink: Write + Seek {}
impl<T: Write + Seek + ?Sized> Sink for T {}

/// A chunk the codec does not interpret, kept byte-for-byte so it can be re-emitted verbatim.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RawChunk {
    pub id: ChunkID,
    /// The payload as found, including any padding.
    pub payload: Vec<u8>,
}
impl RawChunk {
    /// Capture the rest of this chunk's payload.
    pub fn capture<R: Source>(chunk: &mut ChunkReader<R>) -> Result<Self, DecodeError> {
        Ok(Self {
            id: chunk.id(),
            payload: chunk.read_remaining()?,
        })
    }
    /// Emit the chunk exactly as captured. The length is the captured payload plus the header, no padding added.
    pub fn write(&self, writer: &mut dyn Sink) -> IOResult<()> {
        use az::CheckedAs;
        let len: i32 = (self.payload.len() as u64 + HEADER_LEN)
            .checked_as()
            .ok_or_else(|| std::io::Error::other(format!("chunk {} exceeded 2GiB", self.id)))?;
        writer.write_all(&self.id.0)?;
        writer.write_all(&len.to_le_bytes())?;
        writer.write_all(&self.payload)
    }
}

/// Outcome of re-encoding a freshly loaded document and comparing it to its source bytes.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Verification {
    /// Re-encoding reproduced the source exactly.
    Verified,
    /// The encodings differ, first at `offset`.
    Mismatch {
        offset: usize,
        original_len: usize,
        encoded_len: usize,
    },
    /// Verification was not run.
    Skipped,
}
impl Verification {
    #[must_use]
    pub fn compare(original: &[u8], encoded: &[u8]) -> Self {
        let first_difference = original
            .iter()
            .zip(encoded)
            .position(|(a, b)| a != b)
            .or_else(|| (original.len() != encoded.len()).then(|| original.len().min(encoded.len())));
        match first_difference {
            None => Self::Verified,
            Some(offset) => Self::Mismatch {
                offset,
                original_len: original.len(),
                encoded_len: encoded.len(),
            },
        }
    }
    #[must_use]
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified)
    }
    /// First differing byte offset, if any.
    #[must_use]
    pub fn mismatch_offset(&self) -> Option<usize> {
        match self {
            Self::Mismatch { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}
impl std::fmt::Display for Verification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Verified => f.write_str("verified"),
            Self::Mismatch {
                offset,
                original_len,
                encoded_len,
            } => write!(
                f,
                "unverified: first difference at {offset:#x} (source {original_len} bytes, encoded {encoded_len} bytes)"
            ),
            Self::Skipped => f.write_str("not verified"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn short_names_pad_with_nul() {
        let id = ChunkID::from_name("bAD");
        assert_eq!(id.0, *b"bAD\0");
        assert_eq!(id.to_string(), "bAD");
        assert_eq!(ChunkID::AVFX.to_string(), "AVFX");
    }
    #[test]
    fn non_utf8_displays_as_hex() {
        let id = ChunkID([0xFF, 0xFE, 0x00, 0x01]);
        assert!(id.id_str().is_none());
        assert_eq!(id.to_string(), "[ff, fe, 0, 1]");
    }
    #[test]
    fn verification_offsets() {
        assert_eq!(Verification::compare(b"abcd", b"abcd"), Verification::Verified);
        assert_eq!(
            Verification::compare(b"abcd", b"abXd").mismatch_offset(),
            Some(2)
        );
        // A strict prefix differs where the shorter one ends.
        assert_eq!(
            Verification::compare(b"abcd", b"ab").mismatch_offset(),
            Some(2)
        );
        assert_eq!(
            Verification::compare(b"ab", b"abcd").mismatch_offset(),
            Some(2)
        );
    }
    #[test]
    fn raw_chunk_is_verbatim() {
        let raw = RawChunk {
            id: ChunkID::from_name("Data"),
            payload: vec![1, 2, 3],
        };
        let mut out = std::io::Cursor::new(Vec::new());
        raw.write(&mut out).unwrap();
        assert_eq!(out.into_inner(), b"Data\x0b\0\0\0\x01\x02\x03");
    }
}
