use super::items::{Item, ItemList};
pub use super::nodes::{BlockSlot, FieldLocation};
use super::Document;
use crate::field::{FieldState, ScalarValue};
use crate::io::ChunkID;
use crate::state::graph::NodeKey;

/// What holds a field.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum FieldOwner {
    Header,
    Node(NodeKey),
}

/// Address of one scalar field of a document.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct FieldTarget {
    pub owner: FieldOwner,
    pub location: FieldLocation,
    pub id: ChunkID,
}
impl FieldTarget {
    #[must_use]
    pub fn header(id: &str) -> Self {
        Self {
            owner: FieldOwner::Header,
            location: FieldLocation::Direct,
            id: ChunkID::from_name(id),
        }
    }
    #[must_use]
    pub fn node(node: NodeKey, id: &str) -> Self {
        Self {
            owner: FieldOwner::Node(node),
            location: FieldLocation::Direct,
            id: ChunkID::from_name(id),
        }
    }
    #[must_use]
    pub fn item(node: NodeKey, list: ItemList, idx: usize, id: &str) -> Self {
        Self {
            owner: FieldOwner::Node(node),
            location: FieldLocation::Item { list, idx },
            id: ChunkID::from_name(id),
        }
    }
    #[must_use]
    pub fn block(node: NodeKey, slot: BlockSlot, id: &str) -> Self {
        Self {
            owner: FieldOwner::Node(node),
            location: FieldLocation::Block(slot),
            id: ChunkID::from_name(id),
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum Command {
    FieldChanged {
        target: FieldTarget,
        from: FieldState<ScalarValue>,
        to: FieldState<ScalarValue>,
    },
    /// An element went into a node's list at `idx`. Its selectors are enabled while it is there.
    ItemInserted {
        node: NodeKey,
        list: ItemList,
        idx: usize,
        item: Item,
    },
    ItemRemoved {
        node: NodeKey,
        list: ItemList,
        idx: usize,
        item: Item,
    },
    BlockAssigned {
        node: NodeKey,
        block: BlockSlot,
        from: bool,
        to: bool,
    },
}

impl Document {
    fn insert_item(
        &mut self,
        node: NodeKey,
        list: ItemList,
        idx: usize,
        item: &Item,
    ) -> Result<(), crate::commands::CommandError> {
        use crate::commands::CommandError;
        let selectors = item.selectors();
        self.graph.can_enable(&selectors)?;
        self.graph
            .payload_mut(node)
            .ok_or(CommandError::UnknownResource)?
            .insert_item(list, idx, item)?;
        for sel in selectors {
            self.graph.set_enabled(sel, true)?;
        }
        self.graph.mark_outdated(node);
        Ok(())
    }
    fn remove_item(
        &mut self,
        node: NodeKey,
        list: ItemList,
        idx: usize,
        item: &Item,
    ) -> Result<(), crate::commands::CommandError> {
        use crate::commands::CommandError;
        let selectors = item.selectors();
        if selectors.iter().any(|&sel| self.graph.selector(sel).is_none()) {
            return Err(CommandError::UnknownResource);
        }
        self.graph
            .payload_mut(node)
            .ok_or(CommandError::UnknownResource)?
            .remove_item(list, idx, item)?;
        for sel in selectors {
            if let Err(err) = self.graph.set_enabled(sel, false) {
                log::warn!("failed to disable {sel} of removed item: {err}");
            }
        }
        self.graph.mark_outdated(node);
        Ok(())
    }
}

impl crate::commands::CommandConsumer<Command> for Document {
    fn apply(
        &mut self,
        command: crate::commands::DoUndo<'_, Command>,
    ) -> Result<(), crate::commands::CommandError> {
        use crate::commands::{CommandError, DoUndo};

        match command {
            DoUndo::Do(Command::FieldChanged { target, from, to })
            | DoUndo::Undo(Command::FieldChanged {
                target,
                from: to,
                to: from,
            }) => {
                let field = self
                    .field_mut(target)
                    .ok_or(CommandError::UnknownResource)?;
                if field.value_state() != *from {
                    return Err(CommandError::MismatchedState);
                }
                if !field.set_value_state(to) {
                    return Err(CommandError::MismatchedState);
                }
                if let FieldOwner::Node(node) = target.owner {
                    self.graph.mark_outdated(node);
                }
                Ok(())
            }
            DoUndo::Do(Command::ItemInserted {
                node,
                list,
                idx,
                item,
            })
            | DoUndo::Undo(Command::ItemRemoved {
                node,
                list,
                idx,
                item,
            }) => self.insert_item(*node, *list, *idx, item),
            DoUndo::Undo(Command::ItemInserted {
                node,
                list,
                idx,
                item,
            })
            | DoUndo::Do(Command::ItemRemoved {
                node,
                list,
                idx,
                item,
            }) => self.remove_item(*node, *list, *idx, item),
            DoUndo::Do(Command::BlockAssigned {
                node,
                block,
                from,
                to,
            })
            | DoUndo::Undo(Command::BlockAssigned {
                node,
                block,
                from: to,
                to: from,
            }) => {
                let slot = self
                    .graph
                    .node(*node)
                    .and_then(|entry| entry.payload.block(*block))
                    .ok_or(CommandError::UnknownResource)?;
                if slot.assigned != *from {
                    return Err(CommandError::MismatchedState);
                }
                let texture = slot.texture;
                if *to {
                    self.graph.can_enable(&[texture])?;
                }
                self.graph.set_enabled(texture, *to)?;
                if let Some(slot) = self
                    .graph
                    .payload_mut(*node)
                    .and_then(|payload| payload.block_mut(*block))
                {
                    slot.assigned = *to;
                }
                self.graph.mark_outdated(*node);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::commands::{CommandConsumer, CommandError, DoUndo};
    use crate::vfx::enums::NodeKind;
    use crate::vfx::nodes::NodePayload;

    fn document_with(kinds: &[NodeKind]) -> (Document, Vec<NodeKey>) {
        let mut document = Document::new();
        let keys = kinds
            .iter()
            .map(|&kind| {
                document
                    .graph
                    .build_appended(kind, true, |alloc| {
                        Ok::<_, ()>(NodePayload::new(kind, alloc, true))
                    })
                    .unwrap()
            })
            .collect();
        document.graph.initialize();
        (document, keys)
    }

    #[test]
    fn field_change_checks_state() {
        let (mut document, keys) = document_with(&[NodeKind::Binder]);
        let target = FieldTarget::node(keys[0], "Life");
        let command = Command::FieldChanged {
            target: target.clone(),
            from: FieldState::Default,
            to: FieldState::Value(ScalarValue::Int(12)),
        };
        document.apply(DoUndo::Do(&command)).unwrap();
        assert_eq!(
            document.field(&target).unwrap().value_state(),
            FieldState::Value(ScalarValue::Int(12))
        );
        assert!(document.graph.node(keys[0]).unwrap().is_outdated());
        // Already applied.
        assert!(matches!(
            document.apply(DoUndo::Do(&command)),
            Err(CommandError::MismatchedState)
        ));
        document.apply(DoUndo::Undo(&command)).unwrap();
        assert_eq!(
            document.field(&target).unwrap().value_state(),
            FieldState::Default
        );

        let wrong_type = Command::FieldChanged {
            target,
            from: FieldState::Default,
            to: FieldState::Value(ScalarValue::Float(1.0)),
        };
        assert!(document.apply(DoUndo::Do(&wrong_type)).is_err());
    }
    #[test]
    fn removed_item_releases_its_edge() {
        let (mut document, keys) = document_with(&[NodeKind::Scheduler, NodeKind::Timeline]);
        let (scheduler, timeline) = (keys[0], keys[1]);
        let mut alloc = document.graph.detached_selectors(scheduler).unwrap();
        let item = Item::new(&mut alloc, ItemList::SchedulerItems);
        let sel = item.selectors()[0];
        let insert = Command::ItemInserted {
            node: scheduler,
            list: ItemList::SchedulerItems,
            idx: 0,
            item,
        };
        document.apply(DoUndo::Do(&insert)).unwrap();
        assert!(document.graph.selector(sel).unwrap().is_enabled());
        document.graph.select(sel, Some(timeline)).unwrap();
        assert_eq!(document.graph.incoming(timeline), [sel]);

        let Some(item) = document
            .graph
            .node(scheduler)
            .unwrap()
            .payload
            .item(ItemList::SchedulerItems, 0)
        else {
            panic!("item missing");
        };
        let remove = Command::ItemRemoved {
            node: scheduler,
            list: ItemList::SchedulerItems,
            idx: 0,
            item,
        };
        document.apply(DoUndo::Do(&remove)).unwrap();
        assert!(document.graph.incoming(timeline).is_empty());
        // The reference is remembered.
        assert_eq!(document.graph.selector(sel).unwrap().selected(), Some(timeline));

        document.apply(DoUndo::Undo(&remove)).unwrap();
        assert_eq!(document.graph.incoming(timeline), [sel]);
        assert_eq!(
            document.graph.selector(sel).unwrap().literal().get(),
            Some(&0)
        );
    }
    #[test]
    fn block_assignment_toggles_selector() {
        let (mut document, keys) = document_with(&[NodeKind::Particle, NodeKind::Texture]);
        let (particle, texture) = (keys[0], keys[1]);
        let block = |document: &Document| {
            document
                .graph
                .node(particle)
                .unwrap()
                .payload
                .block(BlockSlot::Normal)
                .cloned()
                .unwrap()
        };
        assert!(!block(&document).assigned);
        let command = Command::BlockAssigned {
            node: particle,
            block: BlockSlot::Normal,
            from: false,
            to: true,
        };
        document.apply(DoUndo::Do(&command)).unwrap();
        let sel = block(&document).texture;
        assert!(block(&document).assigned);
        document.graph.select(sel, Some(texture)).unwrap();
        assert_eq!(document.graph.outgoing(particle).count(), 1);

        document.apply(DoUndo::Undo(&command)).unwrap();
        assert!(!block(&document).assigned);
        assert_eq!(document.graph.outgoing(particle).count(), 0);
    }
}
