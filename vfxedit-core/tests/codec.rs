use proptest::prelude::*;
use smallvec::SmallVec;
use std::io::Write;
use strum::IntoEnumIterator;
use vfxedit_core::commands::Command;
use vfxedit_core::field::{FieldState, FixedString, ScalarValue};
use vfxedit_core::io::{decode::read_nested, read_chunks, write_chunk, ChunkID, DecodeError, Sink};
use vfxedit_core::queue::DocumentCommandQueue;
use vfxedit_core::state::graph::writer::GraphWriter;
use vfxedit_core::state::DocumentInfo;
use vfxedit_core::vfx::commands::FieldTarget;
use vfxedit_core::vfx::enums::NodeKind;
use vfxedit_core::vfx::items::ItemList;
use vfxedit_core::vfx::nodes::NodePayload;
use vfxedit_core::vfx::writer::VfxWriter;
use vfxedit_core::vfx::Document;

fn chunk(w: &mut dyn Sink, tag: &str, payload: &[u8]) -> std::io::Result<()> {
    write_chunk(w, ChunkID::from_name(tag), |w| w.write_all(payload))
}
fn counts(w: &mut dyn Sink, binders: i32) -> std::io::Result<()> {
    for kind in NodeKind::iter() {
        let count = if kind == NodeKind::Binder { binders } else { 0 };
        write_chunk(w, kind.count_tag(), |w| w.write_all(&count.to_le_bytes()))?;
    }
    Ok(())
}
/// A container holding one binder with only its lifetime set.
fn sparse_container(life: i32) -> Vec<u8> {
    let mut out = std::io::Cursor::new(Vec::new());
    write_chunk(&mut out, ChunkID::AVFX, |w| {
        chunk(w, "Ver", &0x2011_0913i32.to_le_bytes())?;
        counts(w, 1)?;
        chunk(w, "Bind", &{
            let mut node = std::io::Cursor::new(Vec::new());
            chunk(&mut node, "Life", &life.to_le_bytes())?;
            node.into_inner()
        })
    })
    .unwrap();
    out.into_inner()
}

#[test]
fn absent_fields_stay_absent_through_edits() {
    let document = Document::load(&sparse_container(30), true).unwrap();
    assert!(document.report().is_verified());
    let queue = DocumentCommandQueue::from_document(document, DocumentInfo::default(), 10);
    let binder = queue
        .read(|state| state.document.node_at(NodeKind::Binder, 0))
        .unwrap();
    queue
        .write_with(|writer| {
            writer
                .vfx()
                .set_value(FieldTarget::node(binder, "Life"), ScalarValue::Int(5))
        })
        .unwrap();

    let encoded = queue.read(|state| state.document.encode()).unwrap();
    assert_eq!(encoded, sparse_container(5));
    let reloaded = Document::load(&encoded, true).unwrap();
    let binder = reloaded.node_at(NodeKind::Binder, 0).unwrap();
    let state = |target: FieldTarget| reloaded.field(&target).map(|field| field.value_state());
    assert_eq!(state(FieldTarget::node(binder, "bStG")), Some(FieldState::Unset));
    assert_eq!(state(FieldTarget::header("bFG")), Some(FieldState::Unset));
    assert_eq!(
        state(FieldTarget::node(binder, "Life")),
        Some(FieldState::Value(ScalarValue::Int(5)))
    );
}

#[test]
fn reordered_fields_load_but_do_not_verify() {
    let mut out = std::io::Cursor::new(Vec::new());
    write_chunk(&mut out, ChunkID::AVFX, |w| {
        chunk(w, "bDFP", &[1])?;
        chunk(w, "Ver", &7i32.to_le_bytes())?;
        counts(w, 0)
    })
    .unwrap();
    let bytes = out.into_inner();

    let document = Document::load(&bytes, true).unwrap();
    // Right after the root header, where `Ver` is written first.
    assert_eq!(document.report().verification.mismatch_offset(), Some(8));
    assert!(!document.report().is_verified());
    assert_eq!(document.header.version.get(), Some(&7));
    assert_eq!(document.header.depth_offset_perspective.get_bool(), Some(true));

    // Without verification nothing is known.
    let unverified = Document::load(&bytes, false).unwrap();
    assert!(!unverified.report().is_verified());
    assert_eq!(unverified.report().verification.mismatch_offset(), None);
}

#[test]
fn truncation_is_fatal() {
    let bytes = sparse_container(1);
    assert!(matches!(
        Document::load(&bytes[..5], true),
        Err(DecodeError::TruncatedHeader { offset: 0, within }) if within == ChunkID::AVFX
    ));
    match Document::load(&bytes[..bytes.len() - 4], true) {
        Err(DecodeError::LengthOutOfBounds { id, offset, .. }) => {
            assert_eq!(id, ChunkID::AVFX);
            assert_eq!(offset, 0);
        }
        Err(other) => panic!("wrong error: {other}"),
        Ok(_) => panic!("truncated container loaded"),
    }
}

/// Payloads of every timeline item chunk, in order.
fn timeline_item_payloads(bytes: &[u8]) -> Vec<Vec<u8>> {
    let mut source = std::io::Cursor::new(bytes);
    let mut payloads = Vec::new();
    read_chunks(&mut source, bytes.len() as u64, ChunkID::AVFX, |root| {
        read_nested(root, |node| {
            if node.id() == NodeKind::Timeline.tag() {
                read_nested(node, |sub| {
                    if sub.id() == ItemList::TimelineItems.tag() {
                        payloads.push(sub.read_remaining()?);
                    }
                    Ok(())
                })?;
            }
            Ok(())
        })
    })
    .unwrap();
    payloads
}

#[test]
fn timeline_items_written_cumulatively() {
    let mut document = Document::new();
    let mut commands: SmallVec<[Command; 8]> = SmallVec::new();
    let timeline = GraphWriter::new(&mut commands, &mut document.graph)
        .insert_new(NodeKind::Timeline, 0)
        .unwrap();
    let mut writer = VfxWriter::new(&mut commands, &mut document);
    for (idx, start) in [10, 20, 30].into_iter().enumerate() {
        writer
            .insert_item(timeline, ItemList::TimelineItems, idx)
            .unwrap();
        writer
            .set_value(
                FieldTarget::item(timeline, ItemList::TimelineItems, idx, "StTm"),
                ScalarValue::Int(start),
            )
            .unwrap();
    }
    let bytes = document.encode().unwrap();

    let payloads = timeline_item_payloads(&bytes);
    assert_eq!(payloads.len(), 3);
    let element = payloads[0].len();
    for (k, payload) in payloads.iter().enumerate() {
        assert_eq!(payload.len(), element * (k + 1));
        assert!(payloads[2].starts_with(payload));
    }

    let reloaded = Document::load(&bytes, true).unwrap();
    assert!(reloaded.report().is_verified());
    let timeline = reloaded.node_at(NodeKind::Timeline, 0).unwrap();
    let NodePayload::Timeline(payload) = &reloaded.graph.node(timeline).unwrap().payload else {
        panic!("not a timeline");
    };
    let starts: Vec<_> = payload
        .items
        .iter()
        .map(|item| *item.start_time.value_or_default())
        .collect();
    assert_eq!(starts, [10, 20, 30]);
}

#[test]
fn save_records_path() {
    let path = std::env::temp_dir().join(format!("vfxedit-save-{}.avfx", std::process::id()));
    let queue = DocumentCommandQueue::from_document(Document::new(), DocumentInfo::default(), 10);
    queue
        .write_with(|writer| writer.graph().insert_new(NodeKind::Effector, 0))
        .unwrap();
    assert!(queue.is_dirty());
    queue.save_to(&path).unwrap();
    assert!(!queue.is_dirty());
    assert_eq!(queue.read(|state| state.info.path.clone()), Some(path.clone()));

    let bytes = std::fs::read(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    let document = Document::load(&bytes, true).unwrap();
    assert!(document.report().is_verified());
    assert_eq!(document.graph.group(NodeKind::Effector).len(), 1);
}

/// One random edit. Positions are taken modulo whatever is there at the time.
#[derive(Clone, Debug)]
enum Edit {
    Insert(NodeKind, usize),
    Remove(NodeKind, usize),
    Unassign(NodeKind, usize),
    Life(usize, i32),
    Path(usize, String),
    Scale(f32),
    Bind(usize, Option<usize>),
    AddItem(ItemList, usize),
}
fn edit() -> impl Strategy<Value = Edit> {
    let kind = prop::sample::select(NodeKind::iter().collect::<Vec<_>>());
    let list = prop::sample::select(vec![
        ItemList::SchedulerItems,
        ItemList::SchedulerTriggers,
        ItemList::TimelineItems,
        ItemList::ParticleItems,
        ItemList::EmitterItems,
    ]);
    prop_oneof![
        4 => (kind.clone(), 0..8usize).prop_map(|(kind, at)| Edit::Insert(kind, at)),
        1 => (kind.clone(), 0..8usize).prop_map(|(kind, at)| Edit::Remove(kind, at)),
        1 => (kind, 0..8usize).prop_map(|(kind, at)| Edit::Unassign(kind, at)),
        1 => (0..8usize, any::<i32>()).prop_map(|(at, life)| Edit::Life(at, life)),
        1 => (0..8usize, "[a-z0-9_/.]{0,24}").prop_map(|(at, path)| Edit::Path(at, path)),
        1 => any::<f32>().prop_map(Edit::Scale),
        2 => (0..8usize, prop::option::of(0..8usize)).prop_map(|(at, to)| Edit::Bind(at, to)),
        2 => (list, 0..8usize).prop_map(|(list, at)| Edit::AddItem(list, at)),
    ]
}
fn nth(document: &Document, kind: NodeKind, at: usize) -> Option<vfxedit_core::state::graph::NodeKey> {
    let len = document.graph.group(kind).len();
    (len > 0).then(|| document.node_at(kind, at % len)).flatten()
}
/// Apply an edit. Edits that make no sense for the current document are ignored.
fn apply(document: &mut Document, edit: &Edit) {
    let mut commands: SmallVec<[Command; 4]> = SmallVec::new();
    match edit {
        Edit::Insert(kind, at) => {
            let idx = at % (document.graph.group(*kind).len() + 1);
            GraphWriter::new(&mut commands, &mut document.graph)
                .insert_new(*kind, idx)
                .unwrap();
        }
        Edit::Remove(kind, at) => {
            if let Some(node) = nth(document, *kind, *at) {
                GraphWriter::new(&mut commands, &mut document.graph)
                    .remove_node(node)
                    .unwrap();
            }
        }
        Edit::Unassign(kind, at) => {
            if let Some(node) = nth(document, *kind, *at) {
                GraphWriter::new(&mut commands, &mut document.graph)
                    .set_assigned(node, false)
                    .unwrap();
            }
        }
        Edit::Life(at, life) => {
            if let Some(node) = nth(document, NodeKind::Binder, *at) {
                VfxWriter::new(&mut commands, document)
                    .set_value(FieldTarget::node(node, "Life"), ScalarValue::Int((*life).into()))
                    .unwrap();
            }
        }
        Edit::Path(at, path) => {
            if let Some(node) = nth(document, NodeKind::Texture, *at) {
                VfxWriter::new(&mut commands, document)
                    .set_value(
                        FieldTarget::node(node, "Path"),
                        ScalarValue::Text(FixedString::from_text(path)),
                    )
                    .unwrap();
            }
        }
        Edit::Scale(scale) => {
            VfxWriter::new(&mut commands, document)
                .set_value(FieldTarget::header("BZS"), ScalarValue::Float(*scale))
                .unwrap();
        }
        Edit::Bind(at, to) => {
            let Some(timeline) = nth(document, NodeKind::Timeline, *at) else {
                return;
            };
            let target = to.and_then(|to| nth(document, NodeKind::Binder, to));
            let NodePayload::Timeline(payload) = &document.graph.node(timeline).unwrap().payload
            else {
                unreachable!()
            };
            let selector = payload.binder;
            GraphWriter::new(&mut commands, &mut document.graph)
                .select(selector, target)
                .unwrap();
        }
        Edit::AddItem(list, at) => {
            let Some(node) = nth(document, list.owner(), *at) else {
                return;
            };
            let len = document
                .graph
                .node(node)
                .and_then(|entry| entry.payload.list_len(*list))
                .unwrap();
            VfxWriter::new(&mut commands, document)
                .insert_item(node, *list, len)
                .unwrap();
        }
    }
}

proptest! {
    #[test]
    fn edited_documents_round_trip(edits in prop::collection::vec(edit(), 0..32)) {
        let mut document = Document::new();
        for edit in &edits {
            apply(&mut document, edit);
        }
        let bytes = document.encode().unwrap();
        let loaded = Document::load(&bytes, true).unwrap();
        prop_assert!(
            loaded.report().is_verified(),
            "{} {:?}",
            loaded.report().verification,
            loaded.report().issues
        );
        prop_assert_eq!(loaded.encode().unwrap(), bytes);
        for kind in NodeKind::iter() {
            prop_assert_eq!(loaded.graph.group(kind).len(), document.graph.group(kind).len());
        }
    }
}
