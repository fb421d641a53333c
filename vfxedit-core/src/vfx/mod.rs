//! # VFX document
//!
//! A visual-effect container: root header fields, one node group per [`NodeKind`], and every chunk the codec
//! does not interpret. Decoding builds the graph, resolves selectors once all groups are populated, and
//! optionally re-encodes to check the result reproduces the source.

pub mod commands;
pub mod enums;
pub mod items;
pub mod nodes;
pub mod writer;

use crate::field::{self, DynField, Field, NullableBool, Scalar};
use crate::io::{self, ChunkID, ChunkReader, DecodeError, RawChunk, Sink, Verification};
use crate::state::graph::{Graph, NodeKey, SelectorKey};
use commands::{FieldOwner, FieldTarget};
use enums::NodeKind;
use nodes::{FieldLocation, NodePayload};
use strum::IntoEnumIterator;

pub type VfxGraph = Graph<NodeKind, NodePayload>;

/// The literal of a selector, for encoding.
pub(crate) fn literal(graph: &VfxGraph, key: SelectorKey) -> std::io::Result<&Field<i32>> {
    graph
        .selector(key)
        .map(|entry| entry.literal())
        .ok_or_else(|| std::io::Error::other(format!("{key} not found in graph")))
}
/// Write a field even when it is unset, since it marks where an element starts.
pub(crate) fn write_leader(
    field: &Field<NullableBool>,
    writer: &mut dyn Sink,
) -> std::io::Result<()> {
    io::write_chunk(writer, field.id(), |mut w| field.value_or_default().encode(&mut w))
}
pub(crate) fn write_extra(extra: &[RawChunk], writer: &mut dyn Sink) -> std::io::Result<()> {
    extra.iter().try_for_each(|chunk| chunk.write(writer))
}
/// Write a count derived from the model. Counts are never stored.
pub(crate) fn write_count(writer: &mut dyn Sink, tag: ChunkID, len: usize) -> std::io::Result<()> {
    use az::CheckedAs;
    let count: i32 = len
        .checked_as()
        .ok_or_else(|| std::io::Error::other(format!("{tag} count {len} exceeds i32")))?;
    io::write_chunk(writer, tag, |mut w| count.encode(&mut w))
}

/// Something unusual found while loading that did not prevent it.
/// Any of these means a save will not reproduce the source.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum LoadIssue {
    /// A run shared by two lists holds fewer elements than the first list.
    TruncatedSharedList {
        tag: ChunkID,
        offset: u64,
        elements: usize,
        prefix: usize,
    },
    /// The chunks of a cumulative run disagree with each other or with the element count.
    MalformedList {
        tag: ChunkID,
        offset: u64,
        chunks: usize,
        elements: usize,
    },
    /// A selector literal named no node. It was reset to `-1`.
    SelectorOutOfRange {
        owner: NodeKind,
        owner_idx: usize,
        target: NodeKind,
        literal: i32,
    },
}
impl std::fmt::Display for LoadIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TruncatedSharedList {
                tag,
                offset,
                elements,
                prefix,
            } => write!(
                f,
                "{tag} run at {offset:#x} has {elements} elements, fewer than its {prefix} element prefix"
            ),
            Self::MalformedList {
                tag,
                offset,
                chunks,
                elements,
            } => write!(
                f,
                "{tag} run at {offset:#x} has {chunks} chunks for {elements} elements"
            ),
            Self::SelectorOutOfRange {
                owner,
                owner_idx,
                target,
                literal,
            } => write!(
                f,
                "{owner} {owner_idx} selects {target} {literal}, which does not exist"
            ),
        }
    }
}

/// What loading found out about a document.
#[derive(Clone, PartialEq, Debug)]
pub struct LoadReport {
    pub verification: Verification,
    pub issues: Vec<LoadIssue>,
}
impl LoadReport {
    /// Whether saving the unedited document reproduces the source exactly.
    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.verification.is_verified() && self.issues.is_empty()
    }
}

/// Scalars at the root of the container.
#[derive(Clone, PartialEq, Debug)]
pub struct Header {
    pub version: Field<i32>,
    pub depth_offset_perspective: Field<NullableBool>,
    pub clip_box_culling: Field<NullableBool>,
    pub far_ground: Field<NullableBool>,
    pub total_scale: Field<NullableBool>,
    pub apply_shadow: Field<NullableBool>,
    pub culling: Field<NullableBool>,
    pub bias_z_scale: Field<f32>,
}
impl Header {
    fn new(present: bool) -> Self {
        fn make<T: Scalar>(id: &str, default: T, present: bool) -> Field<T> {
            if present {
                Field::new(id, default)
            } else {
                Field::unset(id, default)
            }
        }
        Self {
            version: make("Ver", 0x2011_0913, present),
            depth_offset_perspective: make("bDFP", NullableBool::False, present),
            clip_box_culling: make("bCBC", NullableBool::False, present),
            far_ground: make("bFG", NullableBool::False, present),
            total_scale: make("bTS", NullableBool::False, present),
            apply_shadow: make("bASH", NullableBool::False, present),
            culling: make("bCul", NullableBool::False, present),
            bias_z_scale: make("BZS", 0.0, present),
        }
    }
    #[must_use]
    pub fn fields(&self) -> Vec<&dyn DynField> {
        vec![
            &self.version,
            &self.depth_offset_perspective,
            &self.clip_box_culling,
            &self.far_ground,
            &self.total_scale,
            &self.apply_shadow,
            &self.culling,
            &self.bias_z_scale,
        ]
    }
    pub fn fields_mut(&mut self) -> Vec<&mut dyn DynField> {
        vec![
            &mut self.version,
            &mut self.depth_offset_perspective,
            &mut self.clip_box_culling,
            &mut self.far_ground,
            &mut self.total_scale,
            &mut self.apply_shadow,
            &mut self.culling,
            &mut self.bias_z_scale,
        ]
    }
}

pub struct Document {
    pub header: Header,
    pub graph: VfxGraph,
    /// Root chunks with no known meaning, written after the nodes.
    pub extra: Vec<RawChunk>,
    /// Bytes following the root chunk.
    pub trailing: Vec<u8>,
    report: LoadReport,
}
impl Default for Document {
    fn default() -> Self {
        Self {
            header: Header::new(true),
            graph: VfxGraph::new(),
            extra: Vec::new(),
            trailing: Vec::new(),
            report: LoadReport {
                verification: Verification::Skipped,
                issues: Vec::new(),
            },
        }
    }
}
impl Document {
    /// An empty document with default header values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    /// Decode a container, then, if `verify`, re-encode it and compare against `bytes`.
    pub fn load(bytes: &[u8], verify: bool) -> Result<Self, DecodeError> {
        let mut document = Self::decode(bytes)?;
        if verify {
            let encoded = document.encode()?;
            let verification = Verification::compare(bytes, &encoded);
            if let Verification::Mismatch { offset, .. } = verification {
                log::warn!("re-encoding differs from the source at {offset:#x}");
            }
            document.report.verification = verification;
        }
        for issue in &document.report.issues {
            log::warn!("{issue}");
        }
        Ok(document)
    }
    /// Decode without verifying.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut cursor = std::io::Cursor::new(bytes);
        let mut root = ChunkReader::new(&mut cursor, bytes.len() as u64, ChunkID::AVFX)?;
        if root.id() != ChunkID::AVFX {
            return Err(DecodeError::UnexpectedRoot {
                expected: ChunkID::AVFX,
                found: root.id(),
            });
        }
        let root_len = root.self_len();

        let mut header = Header::new(false);
        let mut graph = VfxGraph::new();
        let mut extra = Vec::new();
        let mut issues = Vec::new();
        io::read_nested(&mut root, |sub| {
            if field::read_matching(&mut header.fields_mut(), sub)? {
                return Ok(());
            }
            let id = sub.id();
            if NodeKind::iter().any(|kind| kind.count_tag() == id) {
                return Ok(());
            }
            let Some(kind) = NodeKind::from_tag(id) else {
                extra.push(RawChunk::capture(sub)?);
                return Ok(());
            };
            let assigned = sub.data_len() > 0;
            graph.build_appended(kind, assigned, |alloc| {
                if assigned {
                    NodePayload::decode(kind, alloc, sub, &mut issues)
                } else {
                    Ok(NodePayload::new(kind, alloc, false))
                }
            })?;
            Ok(())
        })?;
        let trailing = usize::try_from(root_len)
            .ok()
            .and_then(|end| bytes.get(end..))
            .unwrap_or_default()
            .to_vec();

        for (sel, literal) in graph.initialize() {
            let Some(entry) = graph.selector(sel) else {
                continue;
            };
            let owner = entry.owner();
            let Some(node) = graph.node(owner) else {
                continue;
            };
            issues.push(LoadIssue::SelectorOutOfRange {
                owner: node.group(),
                owner_idx: graph.index_of(owner).unwrap_or_default(),
                target: entry.target_group(),
                literal,
            });
        }
        log::debug!(
            "decoded {} bytes: {}, {} unknown root chunks, {} trailing bytes",
            bytes.len(),
            NodeKind::iter()
                .map(|kind| format!("{} {kind}", graph.group(kind).len()))
                .collect::<Vec<_>>()
                .join(", "),
            extra.len(),
            trailing.len()
        );

        Ok(Self {
            header,
            graph,
            extra,
            trailing,
            report: LoadReport {
                verification: Verification::Skipped,
                issues,
            },
        })
    }
    #[must_use]
    pub fn report(&self) -> &LoadReport {
        &self.report
    }
    pub fn encode(&self) -> std::io::Result<Vec<u8>> {
        let mut out = std::io::Cursor::new(Vec::new());
        self.encode_into(&mut out)?;
        Ok(out.into_inner())
    }
    pub fn encode_into(&self, writer: &mut dyn Sink) -> std::io::Result<()> {
        io::write_chunk(writer, ChunkID::AVFX, |w| {
            field::write_fields(w, &self.header.fields())?;
            for kind in NodeKind::iter() {
                write_count(w, kind.count_tag(), self.graph.group(kind).len())?;
            }
            for kind in NodeKind::iter() {
                for &key in self.graph.group(kind) {
                    let node = self
                        .graph
                        .node(key)
                        .ok_or_else(|| std::io::Error::other(format!("{key} not found in graph")))?;
                    io::write_chunk(w, kind.tag(), |w| {
                        if node.is_assigned() {
                            node.payload.encode(&self.graph, w)
                        } else {
                            Ok(())
                        }
                    })?;
                }
            }
            write_extra(&self.extra, w)
        })?;
        writer.write_all(&self.trailing)
    }
    /// The node at a position in its group.
    #[must_use]
    pub fn node_at(&self, kind: NodeKind, idx: usize) -> Option<NodeKey> {
        self.graph.group(kind).get(idx).copied()
    }
    /// Name shown for a node, its own if it has one or `"<Kind> <idx>"`.
    #[must_use]
    pub fn display_name(&self, key: NodeKey) -> Option<String> {
        let node = self.graph.node(key)?;
        if let Some(name) = node.name() {
            return Some(name.to_owned());
        }
        let idx = self.graph.index_of(key)?;
        Some(format!("{} {idx}", node.group()))
    }
    /// Every field at a location.
    #[must_use]
    pub fn fields(&self, owner: FieldOwner, location: &FieldLocation) -> Option<Vec<&dyn DynField>> {
        match owner {
            FieldOwner::Header => {
                (*location == FieldLocation::Direct).then(|| self.header.fields())
            }
            FieldOwner::Node(key) => self.graph.node(key)?.payload.fields(location),
        }
    }
    #[must_use]
    pub fn field(&self, target: &FieldTarget) -> Option<&dyn DynField> {
        self.fields(target.owner, &target.location)?
            .into_iter()
            .find(|field| field.id() == target.id)
    }
    pub(crate) fn field_mut(&mut self, target: &FieldTarget) -> Option<&mut dyn DynField> {
        let fields = match target.owner {
            FieldOwner::Header => {
                (target.location == FieldLocation::Direct).then(|| self.header.fields_mut())?
            }
            FieldOwner::Node(key) => self.graph.payload_mut(key)?.fields_mut(&target.location)?,
        };
        fields.into_iter().find(|field| field.id() == target.id)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::field::FieldState;

    fn chunk(tag: &str, payload: &[u8]) -> Vec<u8> {
        let mut payload = payload.to_vec();
        while payload.len() % 4 != 0 {
            payload.push(0);
        }
        let mut out = ChunkID::from_name(tag).0.to_vec();
        out.extend_from_slice(&(payload.len() as i32 + 8).to_le_bytes());
        out.extend(payload);
        out
    }
    fn int(tag: &str, value: i32) -> Vec<u8> {
        chunk(tag, &value.to_le_bytes())
    }
    fn counts(counts: [i32; 7]) -> Vec<u8> {
        NodeKind::iter()
            .zip(counts)
            .flat_map(|(kind, count)| int(kind.count_tag().id_str().unwrap(), count))
            .collect()
    }

    #[test]
    fn wrong_root_is_fatal() {
        let bytes = chunk("RIFF", &[]);
        assert!(matches!(
            Document::decode(&bytes),
            Err(DecodeError::UnexpectedRoot { .. })
        ));
    }
    #[test]
    fn truncated_root_reports_offset() {
        let mut bytes = chunk("AVFX", &int("Ver", 1));
        bytes.truncate(14);
        assert!(matches!(
            Document::decode(&bytes),
            Err(DecodeError::LengthOutOfBounds { offset: 0, .. })
        ));
    }
    #[test]
    fn minimal_document_verifies() {
        let mut body = int("Ver", 7);
        body.extend(counts([0, 0, 0, 0, 0, 1, 0]));
        body.extend(chunk("Bind", &int("Life", 30)));
        body.extend(chunk("Zzzz", b"opaque"));
        let mut bytes = chunk("AVFX", &body);
        bytes.extend_from_slice(b"tail");

        let document = Document::load(&bytes, true).unwrap();
        assert!(document.report().is_verified(), "{}", document.report().verification);
        assert_eq!(document.trailing, b"tail");
        assert_eq!(document.extra.len(), 1);
        assert_eq!(document.header.far_ground.state(), &FieldState::Unset);

        let binder = document.node_at(NodeKind::Binder, 0).unwrap();
        assert_eq!(document.display_name(binder).as_deref(), Some("Binder 0"));
        let NodePayload::Binder(payload) = &document.graph.node(binder).unwrap().payload else {
            panic!("not a binder");
        };
        assert_eq!(payload.life.get(), Some(&30));
        assert!(!payload.rotation.is_assigned());
    }
    #[test]
    fn empty_node_is_unassigned() {
        let mut body = counts([0, 0, 0, 0, 0, 0, 1]);
        body.extend(chunk("Tex", &[]));
        let bytes = chunk("AVFX", &body);
        let document = Document::load(&bytes, true).unwrap();
        let texture = document.node_at(NodeKind::Texture, 0).unwrap();
        assert!(!document.graph.node(texture).unwrap().is_assigned());
        assert!(document.report().is_verified());
    }
    #[test]
    fn repeated_texture_block_stays_opaque() {
        let block = chunk("TC1", &int("TxNo", -1));
        let mut body = counts([0, 0, 0, 1, 0, 0, 0]);
        body.extend(chunk("Ptcl", &[block.clone(), block].concat()));
        let bytes = chunk("AVFX", &body);
        let document = Document::load(&bytes, true).unwrap();
        let particle = document.node_at(NodeKind::Particle, 0).unwrap();
        let node = document.graph.node(particle).unwrap();
        // One selector per block slot, none for the repeat.
        assert_eq!(node.selectors().len(), 2);
        let NodePayload::Particle(payload) = &node.payload else {
            panic!("not a particle");
        };
        assert_eq!(payload.extra.len(), 1);
        assert!(document.report().is_verified(), "{}", document.report().verification);
    }
    #[test]
    fn out_of_range_literal_is_reported_and_cleared() {
        let mut body = counts([0, 1, 0, 0, 0, 0, 0]);
        body.extend(chunk("TmLn", &int("BnNo", 4)));
        let bytes = chunk("AVFX", &body);
        let document = Document::load(&bytes, true).unwrap();
        assert_eq!(
            document.report().issues,
            [LoadIssue::SelectorOutOfRange {
                owner: NodeKind::Timeline,
                owner_idx: 0,
                target: NodeKind::Binder,
                literal: 4,
            }]
        );
        assert!(!document.report().is_verified());
        assert!(document.report().verification.mismatch_offset().is_some());
    }
}
