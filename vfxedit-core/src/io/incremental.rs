//! # Cumulative snapshot lists
//!
//! Some ordered lists are stored as a run of N chunks sharing one tag, where chunk *k* holds a complete
//! copy of elements `0..=k`. Only the longest chunk carries information; the rest exist because readers
//! of the format index them by position.
//!
//! Two lists may share one run, in which case every chunk is prefixed by the whole first list and the
//! second list is whatever follows it.

use super::{read_chunks, write_chunk, ChunkID, ChunkReader, DecodeError, Sink, SliceSource, Source};
use std::io::Result as IOResult;
use std::ops::Range;

/// Gathers the chunks of one cumulative run as they are encountered.
pub struct SnapshotCollector {
    tag: ChunkID,
    chunks: usize,
    consistent: bool,
    longest: Option<(Vec<u8>, u64)>,
}
impl SnapshotCollector {
    #[must_use]
    pub fn new(tag: ChunkID) -> Self {
        Self {
            tag,
            chunks: 0,
            consistent: true,
            longest: None,
        }
    }
    #[must_use]
    pub fn tag(&self) -> ChunkID {
        self.tag
    }
    /// Take the rest of this chunk as the next snapshot.
    pub fn offer<R: Source>(&mut self, chunk: &mut ChunkReader<R>) -> Result<(), DecodeError> {
        let offset = chunk.absolute_position()?;
        let payload = chunk.read_remaining()?;
        self.chunks += 1;
        match &self.longest {
            Some((longest, _)) if payload.len() >= longest.len() => {
                // Each snapshot must strictly extend the previous.
                if payload.len() == longest.len() || !payload.starts_with(longest) {
                    self.consistent = false;
                }
                self.longest = Some((payload, offset));
            }
            Some(_) => {
                // Shrunk. Keep the longest we've seen.
                self.consistent = false;
            }
            None => self.longest = Some((payload, offset)),
        }
        Ok(())
    }
    /// The authoritative snapshot, or None if the run was absent.
    #[must_use]
    pub fn finish(self) -> Option<Snapshot> {
        let (payload, offset) = self.longest?;
        Some(Snapshot {
            tag: self.tag,
            payload,
            offset,
            chunks: self.chunks,
            consistent: self.consistent,
        })
    }
}

/// The longest chunk of a cumulative run.
#[derive(Debug)]
pub struct Snapshot {
    pub tag: ChunkID,
    pub payload: Vec<u8>,
    /// Absolute offset of the payload within the document.
    pub offset: u64,
    /// How many chunks made up the run.
    pub chunks: usize,
    /// False if some chunk was not a strict extension of the one before it.
    pub consistent: bool,
}
impl Snapshot {
    /// Split the payload into element byte ranges. Every element is a run of chunks opened by a `leader` chunk.
    pub fn elements(&self, leader: ChunkID) -> Result<Vec<Range<usize>>, DecodeError> {
        let mut source = SliceSource::new(&self.payload, self.offset);
        let len = source.len();
        let mut elements: Vec<Range<usize>> = Vec::new();
        read_chunks(&mut source, len, self.tag, |chunk| {
            // Relative to our own payload.
            let start = (chunk.offset() - self.offset) as usize;
            let end = start + chunk.self_len() as usize;
            match elements.last_mut() {
                Some(current) if chunk.id() != leader => current.end = end,
                _ => elements.push(start..end),
            }
            Ok(())
        })?;
        Ok(elements)
    }
    /// A source over one element's bytes, keeping absolute offsets for errors.
    #[must_use]
    pub fn element_source(&self, range: Range<usize>) -> SliceSource<'_> {
        let base = self.offset + range.start as u64;
        SliceSource::new(&self.payload[range], base)
    }
}

/// Split a shared run at the length of the first list. Returns the elements belonging to the second list,
/// or None if the run is shorter than the first list.
#[must_use]
pub fn split_shared(
    mut elements: Vec<Range<usize>>,
    first_len: usize,
) -> Option<Vec<Range<usize>>> {
    if elements.len() < first_len {
        None
    } else {
        Some(elements.split_off(first_len))
    }
}

/// Encode every element separately, so each can be repeated across snapshots without re-encoding.
pub fn encode_elements<T, F>(items: &[T], mut encode: F) -> IOResult<Vec<Vec<u8>>>
where
    F: FnMut(&T, &mut dyn Sink) -> IOResult<()>,
{
    items
        .iter()
        .map(|item| {
            let mut out = std::io::Cursor::new(Vec::new());
            encode(item, &mut out)?;
            Ok(out.into_inner())
        })
        .collect()
}

/// Emit one chunk per element, chunk k holding `prefix` then elements `0..=k`.
pub fn write_cumulative(
    writer: &mut dyn Sink,
    tag: ChunkID,
    prefix: &[Vec<u8>],
    elements: &[Vec<u8>],
) -> IOResult<()> {
    for k in 0..elements.len() {
        write_chunk(writer, tag, |w| {
            for element in prefix.iter().chain(&elements[..=k]) {
                w.write_all(element)?;
            }
            Ok(())
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    const ITEM: ChunkID = ChunkID::from_name("Item");
    const ENABLED: ChunkID = ChunkID::from_name("bEna");
    const START: ChunkID = ChunkID::from_name("StTm");

    fn element(start: i32) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        write_chunk(&mut out, ENABLED, |w| w.write_all(&[1])).unwrap();
        write_chunk(&mut out, START, |w| w.write_all(&start.to_le_bytes())).unwrap();
        out.into_inner()
    }
    fn collect(bytes: &[u8]) -> Option<Snapshot> {
        let mut source = SliceSource::new(bytes, 0);
        let len = source.len();
        let mut collector = SnapshotCollector::new(ITEM);
        read_chunks(&mut source, len, ChunkID::AVFX, |chunk| {
            assert_eq!(chunk.id(), ITEM);
            collector.offer(chunk)
        })
        .unwrap();
        collector.finish()
    }

    #[test]
    fn three_elements_three_snapshots() {
        let (a, b, c) = (element(10), element(20), element(30));
        let elements = vec![a.clone(), b.clone(), c.clone()];
        let mut out = Cursor::new(Vec::new());
        write_cumulative(&mut out, ITEM, &[], &elements).unwrap();
        let bytes = out.into_inner();

        // Payloads are [A], [A,B], [A,B,C].
        let mut source = SliceSource::new(&bytes, 0);
        let mut payloads = Vec::new();
        read_chunks(&mut source, bytes.len() as u64, ChunkID::AVFX, |chunk| {
            payloads.push(chunk.read_remaining()?);
            Ok(())
        })
        .unwrap();
        assert_eq!(
            payloads,
            [
                a.clone(),
                [a.clone(), b.clone()].concat(),
                [a.clone(), b.clone(), c.clone()].concat()
            ]
        );

        // Only the last one is kept, and it splits back into the three elements.
        let snapshot = collect(&bytes).unwrap();
        assert!(snapshot.consistent);
        assert_eq!(snapshot.chunks, 3);
        let ranges = snapshot.elements(ENABLED).unwrap();
        let recovered: Vec<_> = ranges
            .into_iter()
            .map(|range| snapshot.payload[range].to_vec())
            .collect();
        assert_eq!(recovered, elements);
    }
    #[test]
    fn shared_run_splits_at_first_list() {
        let particles = vec![element(1), element(2)];
        let emitters = vec![element(3)];
        let mut out = Cursor::new(Vec::new());
        write_cumulative(&mut out, ITEM, &particles, &emitters).unwrap();
        let bytes = out.into_inner();

        let snapshot = collect(&bytes).unwrap();
        assert_eq!(snapshot.chunks, 1);
        let ranges = snapshot.elements(ENABLED).unwrap();
        assert_eq!(ranges.len(), 3);
        let tail = split_shared(ranges, particles.len()).unwrap();
        assert_eq!(tail.len(), 1);
        assert_eq!(snapshot.payload[tail[0].clone()], emitters[0][..]);
        // Asking for more than the run has fails.
        assert!(split_shared(snapshot.elements(ENABLED).unwrap(), 4).is_none());
    }
    #[test]
    fn longest_chunk_wins_when_malformed() {
        let (a, b) = (element(1), element(2));
        let mut out = Cursor::new(Vec::new());
        // Longest first, then a stray shorter copy.
        write_chunk(&mut out, ITEM, |w| w.write_all(&[a.clone(), b.clone()].concat())).unwrap();
        write_chunk(&mut out, ITEM, |w| w.write_all(&a)).unwrap();
        let bytes = out.into_inner();

        let snapshot = collect(&bytes).unwrap();
        assert!(!snapshot.consistent);
        assert_eq!(snapshot.payload, [a, b].concat());
        assert_eq!(snapshot.elements(ENABLED).unwrap().len(), 2);
    }
    #[test]
    fn absent_run() {
        assert!(SnapshotCollector::new(ITEM).finish().is_none());
    }
}
