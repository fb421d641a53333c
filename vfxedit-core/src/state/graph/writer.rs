use super::commands::Command;
use super::{Graph, GroupId, NodeKey, SelectorAlloc, SelectorKey};
use crate::commands::{CommandConsumer, CommandError, DoUndo};
use crate::queue::writer::CommandWrite;

/// Edits a graph, recording a command for each change. Commands are applied before they are written.
pub struct GraphWriter<'a, W: CommandWrite<Command>, G, P> {
    writer: W,
    graph: &'a mut Graph<G, P>,
}
impl<W: CommandWrite<Command>, G, P> std::ops::Deref for GraphWriter<'_, W, G, P> {
    type Target = Graph<G, P>;
    fn deref(&self) -> &Self::Target {
        self.graph
    }
}
impl<'a, W: CommandWrite<Command>, G: GroupId, P> GraphWriter<'a, W, G, P> {
    pub fn new(writer: W, graph: &'a mut Graph<G, P>) -> Self {
        Self { writer, graph }
    }
    fn commit(&mut self, command: Command) -> Result<(), CommandError> {
        self.graph.apply(DoUndo::Do(&command))?;
        self.writer.write(command);
        Ok(())
    }
    /// Point a selector at a node, or at nothing. Returns false if it already did.
    pub fn select(
        &mut self,
        selector: SelectorKey,
        target: Option<NodeKey>,
    ) -> Result<bool, CommandError> {
        let from = self
            .graph
            .selector(selector)
            .ok_or(CommandError::UnknownResource)?
            .selection();
        if from.target == target {
            return Ok(false);
        }
        let to = self.graph.selection_for(selector, target)?;
        self.commit(Command::Selected { selector, from, to })?;
        Ok(true)
    }
    /// Build a node and insert it into its group at `idx`.
    pub fn insert_node<F>(&mut self, group: G, idx: usize, build: F) -> Result<NodeKey, CommandError>
    where
        F: FnOnce(&mut SelectorAlloc<'_, G>) -> P,
    {
        let len = self.graph.group(group).len();
        if idx > len {
            return Err(super::GroupError::IndexOutOfBounds { idx, len }.into());
        }
        let target = self
            .graph
            .build_node(group, true, |alloc| Ok::<_, std::convert::Infallible>(build(alloc)))
            .unwrap_or_else(|never| match never {});
        self.commit(Command::NodeInserted { target, idx })?;
        Ok(target)
    }
    /// Remove a node from its group, first clearing every selector that points at it,
    /// including disabled ones that still remember it. Returns the index it had.
    pub fn remove_node(&mut self, target: NodeKey) -> Result<usize, CommandError> {
        let idx = self
            .graph
            .index_of(target)
            .ok_or(CommandError::UnknownResource)?;
        for selector in self.graph.referrers(target) {
            self.select(selector, None)?;
        }
        self.commit(Command::NodeRemoved { target, idx })?;
        Ok(idx)
    }
    /// Returns false if the node already was in that state.
    pub fn set_assigned(&mut self, target: NodeKey, assigned: bool) -> Result<bool, CommandError> {
        let from = self
            .graph
            .node(target)
            .ok_or(CommandError::UnknownResource)?
            .is_assigned();
        if from == assigned {
            return Ok(false);
        }
        self.commit(Command::NodeAssigned {
            target,
            from,
            to: assigned,
        })?;
        Ok(true)
    }
    /// Set or clear a node's display name. Returns false if it already had it.
    pub fn rename(&mut self, target: NodeKey, name: Option<String>) -> Result<bool, CommandError> {
        let from = self
            .graph
            .node(target)
            .ok_or(CommandError::UnknownResource)?
            .name()
            .map(str::to_owned);
        if from == name {
            return Ok(false);
        }
        self.commit(Command::Renamed {
            target,
            from,
            to: name,
        })?;
        Ok(true)
    }
}

impl<W: CommandWrite<Command>> GraphWriter<'_, W, crate::vfx::enums::NodeKind, crate::vfx::nodes::NodePayload> {
    /// Insert a new node with every field present at its default.
    pub fn insert_new(
        &mut self,
        kind: crate::vfx::enums::NodeKind,
        idx: usize,
    ) -> Result<NodeKey, CommandError> {
        self.insert_node(kind, idx, |alloc| {
            crate::vfx::nodes::NodePayload::new(kind, alloc, true)
        })
    }
    /// Insert a texture node whose path is taken from a loaded catalog.
    pub fn insert_texture_from_catalog(
        &mut self,
        catalog: &crate::repositories::catalog::Catalog<String>,
        entry: usize,
        idx: usize,
    ) -> Result<NodeKey, CommandError> {
        use crate::vfx::{enums::NodeKind, nodes::NodePayload};
        let path = catalog.get(entry).ok_or(CommandError::UnknownResource)?;
        self.insert_node(NodeKind::Texture, idx, |alloc| {
            let mut payload = NodePayload::new(NodeKind::Texture, alloc, true);
            if let NodePayload::Texture(texture) = &mut payload {
                texture.path.set(crate::field::FixedString::from_text(&path));
            }
            payload
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::field::Field;
    use crate::state::graph::MakeSelector;

    type Sink = smallvec::SmallVec<[crate::commands::Command; 1]>;

    #[test]
    fn remove_clears_incoming_first() {
        let mut graph = Graph::<u8, ()>::new();
        let mut selectors = Vec::new();
        for _ in 0..2 {
            graph
                .build_appended(0, true, |alloc| {
                    selectors.push(alloc.make_selector(1, Field::new("TlNo", -1), true));
                    Ok::<_, ()>(())
                })
                .unwrap();
        }
        let target = graph.build_appended(1, true, |_| Ok::<_, ()>(())).unwrap();
        graph.initialize();

        let mut sink = Sink::new();
        let mut writer = GraphWriter::new(&mut sink, &mut graph);
        for &sel in &selectors {
            assert!(writer.select(sel, Some(target)).unwrap());
        }
        assert!(!writer.select(selectors[0], Some(target)).unwrap());
        assert_eq!(writer.incoming(target).len(), 2);

        assert_eq!(writer.remove_node(target).unwrap(), 0);
        assert!(writer.group(1).is_empty());
        // Two selects, two clears, one removal.
        assert_eq!(sink.len(), 5);
        assert!(selectors
            .iter()
            .all(|&sel| graph.selector(sel).unwrap().literal().get() == Some(&-1)));
    }
    #[test]
    fn insert_past_end_is_refused() {
        let mut graph = Graph::<u8, ()>::new();
        let mut sink = Sink::new();
        let mut writer = GraphWriter::new(&mut sink, &mut graph);
        assert!(writer.insert_node(0, 1, |_| ()).is_err());
        let node = writer.insert_node(0, 0, |_| ()).unwrap();
        assert!(writer.rename(node, Some("core".into())).unwrap());
        assert!(!writer.rename(node, Some("core".into())).unwrap());
        assert!(writer.set_assigned(node, false).unwrap());
        assert_eq!(sink.len(), 3);
    }
}
