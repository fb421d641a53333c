use super::{ChunkID, Sink, ALIGNMENT, HEADER_LEN};
use az::CheckedAs;
use std::io::{Error as IOError, Result as IOResult, Seek, SeekFrom, Write};

/// A chunk of dynamic length. The length field is reserved up front and backpatched,
/// which is why the inner writer must be `Seek`.
pub struct ChunkWriter<W: Write + Seek> {
    id: ChunkID,
    /// Position within the payload.
    cursor: u32,
    /// Furthest payload byte written so far.
    len: u32,
    needs_finish: bool,
    writer: W,
}
impl<W: Write + Seek> ChunkWriter<W> {
    const ZEROS: [u8; ALIGNMENT as usize] = [0; ALIGNMENT as usize];
    /// Write the tag and a zeroed length field.
    pub fn new(mut writer: W, id: ChunkID) -> IOResult<Self> {
        let start_data: [u8; 8] = [id[0], id[1], id[2], id[3], 0, 0, 0, 0];
        writer.write_all(&start_data)?;

        Ok(Self {
            id,
            cursor: 0,
            len: 0,
            needs_finish: true,
            writer,
        })
    }
    #[must_use]
    pub fn id(&self) -> ChunkID {
        self.id
    }
    /// Pad to alignment and patch the length. Prefer this over Drop, as it reports errors.
    pub fn finish(mut self) -> IOResult<()> {
        self.pad()?;
        self.update_len()?;
        self.needs_finish = false;
        Ok(())
    }
    /// Move to the end of the payload and zero-fill up to the next aligned boundary.
    fn pad(&mut self) -> IOResult<()> {
        self.seek(SeekFrom::End(0))?;
        let padding = (ALIGNMENT - self.len % ALIGNMENT) % ALIGNMENT;
        self.write_all(&Self::ZEROS[..padding as usize])
    }
    /// Write the total length, header included, into the reserved field.
    fn update_len(&mut self) -> IOResult<()> {
        let total: i32 = (u64::from(self.len) + HEADER_LEN)
            .checked_as()
            .ok_or_else(|| IOError::other(format!("chunk {} exceeded 2GiB", self.id)))?;
        let length_offs = i64::from(self.cursor);

        self.writer.seek(SeekFrom::Current(-length_offs - 4))?;
        self.writer.write_all(&total.to_le_bytes())?;
        self.writer.seek(SeekFrom::Current(length_offs))?;
        Ok(())
    }
}
impl<W: Write + Seek> Drop for ChunkWriter<W> {
    fn drop(&mut self) {
        // Inspired by std::io::BufWriter, errors at implicit closure are ignored.
        if self.needs_finish {
            log::warn!("chunk {} closed without finish", self.id);
            let _ = self.pad().and_then(|()| self.update_len());
        }
    }
}
impl<W: Write + Seek> Write for ChunkWriter<W> {
    fn write(&mut self, buf: &[u8]) -> IOResult<usize> {
        let written = self.writer.write(buf)?;
        // Check that self.cursor + written doesn't overflow u32
        self.cursor = written
            .checked_as()
            .and_then(|written| self.cursor.checked_add(written))
            .ok_or_else(|| IOError::other("inner writer overflowed chunk"))?;
        self.len = self.len.max(self.cursor);
        Ok(written)
    }
    fn flush(&mut self) -> IOResult<()> {
        self.writer.flush()
    }
}
impl<W: Write + Seek> Seek for ChunkWriter<W> {
    /// Seek the stream within this chunk's payload. Behavior of seeks past-the-end are deferred to the writer.
    fn seek(&mut self, pos: SeekFrom) -> IOResult<u64> {
        let add_with_overflow = || IOError::other("seek with overflow");
        let new_cursor: i64 = match pos {
            SeekFrom::End(delta) => i64::from(self.len).checked_add(delta),
            SeekFrom::Current(delta) => i64::from(self.cursor).checked_add(delta),
            SeekFrom::Start(delta) => delta.checked_as(),
        }
        .ok_or_else(add_with_overflow)?;

        if new_cursor < 0 {
            return Err(IOError::other("seek past-the-start"));
        }
        let Some(new_cursor) = new_cursor.checked_as::<u32>() else {
            return Err(add_with_overflow());
        };

        let delta = i64::from(new_cursor) - i64::from(self.cursor);
        self.writer.seek(SeekFrom::Current(delta))?;

        self.cursor = new_cursor;
        Ok(u64::from(self.cursor))
    }
    fn stream_position(&mut self) -> IOResult<u64> {
        Ok(u64::from(self.cursor))
    }
}

/// Write one chunk: tag, reserved length, `payload`, then padding and the backpatched length.
pub fn write_chunk<F>(writer: &mut dyn Sink, id: ChunkID, payload: F) -> IOResult<()>
where
    F: FnOnce(&mut dyn Sink) -> IOResult<()>,
{
    let mut chunk = ChunkWriter::new(writer, id)?;
    payload(&mut chunk)?;
    chunk.finish()
}
