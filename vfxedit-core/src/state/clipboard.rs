//! # Clipboard
//!
//! Copies the scalar values of a node by value, so they can be pasted onto another node of any open document.
//! Nothing here refers back into the source document.

use crate::commands::{CommandError, VfxCommand};
use crate::field::{FieldState, ScalarValue};
use crate::io::ChunkID;
use crate::queue::writer::CommandWrite;
use crate::state::graph::NodeKey;
use crate::vfx::commands::{FieldOwner, FieldTarget};
use crate::vfx::enums::NodeKind;
use crate::vfx::nodes::FieldLocation;
use crate::vfx::writer::VfxWriter;
use crate::vfx::Document;

#[derive(Clone, PartialEq, Debug)]
pub struct FieldClipboard {
    source: NodeKind,
    values: Vec<(ChunkID, FieldState<ScalarValue>)>,
}
impl FieldClipboard {
    /// Copy every assigned field directly in a node. None if there is no such node.
    #[must_use]
    pub fn copy(document: &Document, node: NodeKey) -> Option<Self> {
        let entry = document.graph.node(node)?;
        let values = entry
            .payload
            .direct_fields()
            .into_iter()
            .filter(|field| field.is_assigned())
            .map(|field| (field.id(), field.value_state()))
            .collect();
        Some(Self {
            source: entry.group(),
            values,
        })
    }
    /// Kind of node the values were copied from.
    #[must_use]
    pub fn source(&self) -> NodeKind {
        self.source
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
    /// Write the copied values onto `node`. Tags the node does not have are skipped.
    /// Returns how many fields changed.
    pub fn paste<W: CommandWrite<VfxCommand>>(
        &self,
        writer: &mut VfxWriter<'_, W>,
        node: NodeKey,
    ) -> Result<usize, CommandError> {
        let mut changed = 0;
        for (id, state) in &self.values {
            let target = FieldTarget {
                owner: FieldOwner::Node(node),
                location: FieldLocation::Direct,
                id: *id,
            };
            if writer.field(&target).is_none() {
                continue;
            }
            if writer.set_field(target, state.clone())? {
                changed += 1;
            }
        }
        if changed == 0 {
            log::debug!("paste onto {node} changed nothing");
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::vfx::nodes::NodePayload;

    fn document_with(kind: NodeKind, edit: impl FnOnce(&mut NodePayload)) -> (Document, NodeKey) {
        let mut document = Document::new();
        let key = document
            .graph
            .build_appended(kind, true, |alloc| {
                let mut payload = NodePayload::new(kind, alloc, false);
                edit(&mut payload);
                Ok::<_, ()>(payload)
            })
            .unwrap();
        document.graph.initialize();
        (document, key)
    }

    #[test]
    fn paste_across_documents_and_kinds() {
        let (source, from) = document_with(NodeKind::Particle, |payload| {
            let NodePayload::Particle(particle) = payload else {
                unreachable!()
            };
            particle.loop_start.set(4);
            particle.loop_end.set(9);
        });
        let clipboard = FieldClipboard::copy(&source, from).unwrap();
        assert_eq!(clipboard.len(), 2);
        assert_eq!(clipboard.source(), NodeKind::Particle);

        let (mut target, to) = document_with(NodeKind::Effector, |_| ());
        let mut sink = smallvec::SmallVec::<[crate::commands::Command; 1]>::new();
        let mut writer = VfxWriter::new(&mut sink, &mut target);
        assert_eq!(clipboard.paste(&mut writer, to).unwrap(), 2);
        // Same values again change nothing.
        assert_eq!(clipboard.paste(&mut writer, to).unwrap(), 0);
        assert_eq!(sink.len(), 2);

        let (mut texture_doc, texture) = document_with(NodeKind::Texture, |_| ());
        let mut writer = VfxWriter::new(&mut sink, &mut texture_doc);
        // Textures have neither tag.
        assert_eq!(clipboard.paste(&mut writer, texture).unwrap(), 0);
    }
}
