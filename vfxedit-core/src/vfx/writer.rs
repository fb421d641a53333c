use super::commands::{BlockSlot, Command, FieldTarget};
use super::items::{Item, ItemList};
use super::Document;
use crate::commands::{CommandConsumer, CommandError, DoUndo};
use crate::field::{FieldState, ScalarValue};
use crate::queue::writer::CommandWrite;
use crate::state::graph::NodeKey;

/// Edits document content, recording a command for each change.
pub struct VfxWriter<'a, W: CommandWrite<Command>> {
    writer: W,
    document: &'a mut Document,
}
impl<W: CommandWrite<Command>> std::ops::Deref for VfxWriter<'_, W> {
    type Target = Document;
    fn deref(&self) -> &Self::Target {
        self.document
    }
}
impl<'a, W: CommandWrite<Command>> VfxWriter<'a, W> {
    pub fn new(writer: W, document: &'a mut Document) -> Self {
        Self { writer, document }
    }
    fn commit(&mut self, command: Command) -> Result<(), CommandError> {
        self.document.apply(DoUndo::Do(&command))?;
        self.writer.write(command);
        Ok(())
    }
    /// Change a field's state. Returns false, recording nothing, if it already had it.
    pub fn set_field(
        &mut self,
        target: FieldTarget,
        to: FieldState<ScalarValue>,
    ) -> Result<bool, CommandError> {
        let from = self
            .document
            .field(&target)
            .ok_or(CommandError::UnknownResource)?
            .value_state();
        if from == to {
            return Ok(false);
        }
        self.commit(Command::FieldChanged { target, from, to })?;
        Ok(true)
    }
    /// Give a field an explicit value.
    pub fn set_value(
        &mut self,
        target: FieldTarget,
        value: ScalarValue,
    ) -> Result<bool, CommandError> {
        self.set_field(target, FieldState::Value(value))
    }
    /// Insert a fresh element at `idx` of one of a node's lists.
    pub fn insert_item(
        &mut self,
        node: NodeKey,
        list: ItemList,
        idx: usize,
    ) -> Result<(), CommandError> {
        let len = self
            .document
            .graph
            .node(node)
            .and_then(|entry| entry.payload.list_len(list))
            .ok_or(CommandError::UnknownResource)?;
        if idx > len {
            return Err(CommandError::MismatchedState);
        }
        let mut alloc = self
            .document
            .graph
            .detached_selectors(node)
            .ok_or(CommandError::UnknownResource)?;
        let item = Item::new(&mut alloc, list);
        self.commit(Command::ItemInserted {
            node,
            list,
            idx,
            item,
        })
    }
    pub fn remove_item(
        &mut self,
        node: NodeKey,
        list: ItemList,
        idx: usize,
    ) -> Result<(), CommandError> {
        let item = self
            .document
            .graph
            .node(node)
            .and_then(|entry| entry.payload.item(list, idx))
            .ok_or(CommandError::UnknownResource)?;
        self.commit(Command::ItemRemoved {
            node,
            list,
            idx,
            item,
        })
    }
    /// Add or drop a particle's texture block. Returns false if it already was in that state.
    pub fn assign_block(
        &mut self,
        node: NodeKey,
        block: BlockSlot,
        assigned: bool,
    ) -> Result<bool, CommandError> {
        let from = self
            .document
            .graph
            .node(node)
            .and_then(|entry| entry.payload.block(block))
            .ok_or(CommandError::UnknownResource)?
            .assigned;
        if from == assigned {
            return Ok(false);
        }
        self.commit(Command::BlockAssigned {
            node,
            block,
            from,
            to: assigned,
        })?;
        Ok(true)
    }
}
