use super::{ChunkID, DecodeError, Source, HEADER_LEN};
use az::CheckedAs;
use std::io::{Error as IOError, ErrorKind as IOErrorKind, Read, Result as IOResult, Seek, SeekFrom};

/// A view over a single chunk's payload. Reads EOF at the end of the payload,
/// and seeks are relative to the payload start.
pub struct ChunkReader<R> {
    id: ChunkID,
    /// Absolute offset of this chunk's header.
    offset: u64,
    /// How far into the payload we've read. Zero is the basis
    /// for Seeks, and reads will EOF at cursor == len.
    cursor: u32,
    len: u32,
    reader: R,
}
impl<R: Source> ChunkReader<R> {
    /// Read a chunk header at the current position. `available` is how many bytes the enclosing
    /// container still has room for, and `within` names that container for error reports.
    pub fn new(mut reader: R, available: u64, within: ChunkID) -> Result<Self, DecodeError> {
        let offset = reader.absolute_position()?;
        let truncated = || DecodeError::TruncatedHeader { offset, within };
        if available < HEADER_LEN {
            return Err(truncated());
        }
        let mut header = [0; 8];
        reader.read_exact(&mut header).map_err(|e| {
            if e.kind() == IOErrorKind::UnexpectedEof {
                truncated()
            } else {
                e.into()
            }
        })?;
        let id = ChunkID([header[0], header[1], header[2], header[3]]);
        let len = i32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        // The length counts the header, so anything shorter than it can't be a chunk.
        let payload_len = len
            .checked_as::<u64>()
            .filter(|&len| len >= HEADER_LEN && len <= available)
            .and_then(|len| (len - HEADER_LEN).checked_as::<u32>())
            .ok_or(DecodeError::LengthOutOfBounds {
                id,
                offset,
                len,
                available,
            })?;

        Ok(Self {
            id,
            offset,
            cursor: 0,
            len: payload_len,
            reader,
        })
    }
    #[must_use]
    pub fn id(&self) -> ChunkID {
        self.id
    }
    /// Absolute offset of the chunk header.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }
    /// Absolute offset of the first payload byte.
    #[must_use]
    pub fn payload_offset(&self) -> u64 {
        self.offset + HEADER_LEN
    }
    /// Size of chunk payload
    #[must_use]
    pub fn data_len(&self) -> u32 {
        self.len
    }
    /// Size the the chunk including ID and length sections
    #[must_use]
    pub fn self_len(&self) -> u64 {
        u64::from(self.len) + HEADER_LEN
    }
    /// Payload bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.len - self.cursor
    }
    /// Read everything from the cursor to the end of the payload.
    pub fn read_remaining(&mut self) -> IOResult<Vec<u8>> {
        let mut bytes = vec![0; self.remaining() as usize];
        self.read_exact(&mut bytes)?;
        Ok(bytes)
    }
    /// Advance the inner reader to the end of this chunk, returning it.
    pub fn skip(mut self) -> IOResult<R> {
        let remaining = self.remaining();
        self.reader.seek(SeekFrom::Current(i64::from(remaining)))?;
        Ok(self.reader)
    }
}
impl<R: Read> Read for ChunkReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> IOResult<usize> {
        let max_bytes = self.len - self.cursor;
        let clamped_buf_len = buf.len().min(max_bytes as usize);
        let clamped_buf = &mut buf[..clamped_buf_len];

        let num_read = self.reader.read(clamped_buf)?;

        // Add to cursor, ensure that inner reader didn't do a silly.
        self.cursor += num_read
            .checked_as::<u32>()
            .ok_or_else(|| IOError::other("internal reader violated len requirements"))?;
        debug_assert!(self.cursor <= self.len);

        Ok(num_read)
    }
}
impl<R: Read + Seek> Seek for ChunkReader<R> {
    /// Seek the stream within this reader's address space. Seeks past-the-end are clamped.
    fn seek(&mut self, pos: SeekFrom) -> IOResult<u64> {
        let new_cursor = match pos {
            SeekFrom::Current(delta) => i64::from(self.cursor).checked_add(delta),
            SeekFrom::End(delta) => i64::from(self.len).checked_add(delta),
            SeekFrom::Start(pos) => pos.checked_as(),
        }
        .ok_or_else(|| IOError::other("seek with overflow"))?;
        // Seek-before-start is an error
        if new_cursor < 0 {
            return Err(IOError::other("seek past-the-start"));
        }
        // Clamp to end
        let new_cursor = new_cursor.min(i64::from(self.len));
        let diff = new_cursor - i64::from(self.cursor);

        // Seek underlying stream by the clamped diff, update own cursor.
        self.reader.seek(SeekFrom::Current(diff))?;
        // In range of u32 - clamped to len above.
        self.cursor = new_cursor as u32;

        Ok(u64::from(self.cursor))
    }
    fn stream_position(&mut self) -> IOResult<u64> {
        Ok(u64::from(self.cursor))
    }
}
impl<R: Source> Source for ChunkReader<R> {
    fn absolute_position(&mut self) -> IOResult<u64> {
        Ok(self.payload_offset() + u64::from(self.cursor))
    }
}

/// Scan `bounds` bytes of consecutive chunks, handing each to `visit` positioned at its payload start.
///
/// Whatever the visitor consumes, the stream is moved to the end of the chunk afterwards, so
/// partially-read or ignored chunks never desynchronize the scan.
pub fn read_chunks<F>(
    reader: &mut dyn Source,
    bounds: u64,
    within: ChunkID,
    mut visit: F,
) -> Result<(), DecodeError>
where
    F: FnMut(&mut ChunkReader<&mut dyn Source>) -> Result<(), DecodeError>,
{
    let mut consumed = 0;
    while consumed < bounds {
        let sub: &mut dyn Source = &mut *reader;
        let mut chunk = ChunkReader::new(sub, bounds - consumed, within)?;
        visit(&mut chunk)?;
        consumed += chunk.self_len();
        chunk.skip()?;
    }
    Ok(())
}

/// Scan the rest of `chunk`'s payload as nested chunks.
pub fn read_nested<R, F>(chunk: &mut ChunkReader<R>, visit: F) -> Result<(), DecodeError>
where
    R: Source,
    F: FnMut(&mut ChunkReader<&mut dyn Source>) -> Result<(), DecodeError>,
{
    let bounds = u64::from(chunk.remaining());
    let within = chunk.id();
    read_chunks(chunk, bounds, within, visit)
}
