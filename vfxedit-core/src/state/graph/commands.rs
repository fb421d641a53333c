use super::{NodeKey, SelectorKey, Selection};

#[derive(Clone, PartialEq, Debug)]
pub enum Command {
    Selected {
        selector: SelectorKey,
        from: Selection,
        to: Selection,
    },
    /// A node went into its group at `idx`.
    NodeInserted { target: NodeKey, idx: usize },
    /// A node left its group from `idx`. Nothing may select it at that moment.
    NodeRemoved { target: NodeKey, idx: usize },
    NodeAssigned {
        target: NodeKey,
        from: bool,
        to: bool,
    },
    Renamed {
        target: NodeKey,
        from: Option<String>,
        to: Option<String>,
    },
}

impl<G: super::GroupId, P> crate::commands::CommandConsumer<Command> for super::Graph<G, P> {
    fn apply(
        &mut self,
        command: crate::commands::DoUndo<'_, Command>,
    ) -> Result<(), crate::commands::CommandError> {
        use crate::commands::{CommandError, DoUndo};

        match command {
            DoUndo::Do(Command::Selected { selector, from, to })
            | DoUndo::Undo(Command::Selected {
                selector,
                from: to,
                to: from,
            }) => {
                let current = self
                    .selector(*selector)
                    .ok_or(CommandError::UnknownResource)?
                    .selection();
                if current != *from {
                    return Err(CommandError::MismatchedState);
                }
                self.restore_selection(*selector, to)?;
                Ok(())
            }
            DoUndo::Do(Command::NodeInserted { target, idx })
            | DoUndo::Undo(Command::NodeRemoved { target, idx }) => {
                self.attach(*target, *idx)?;
                Ok(())
            }
            DoUndo::Undo(Command::NodeInserted { target, idx })
            | DoUndo::Do(Command::NodeRemoved { target, idx }) => {
                if self.node(*target).is_none() {
                    return Err(CommandError::UnknownResource);
                }
                // Must be exactly where the command left it.
                if self.index_of(*target) != Some(*idx) {
                    return Err(CommandError::MismatchedState);
                }
                self.detach(*target)?;
                Ok(())
            }
            DoUndo::Do(Command::NodeAssigned { target, from, to })
            | DoUndo::Undo(Command::NodeAssigned {
                target,
                from: to,
                to: from,
            }) => {
                let node = self.node(*target).ok_or(CommandError::UnknownResource)?;
                if node.is_assigned() != *from {
                    return Err(CommandError::MismatchedState);
                }
                self.set_assigned(*target, *to)?;
                Ok(())
            }
            DoUndo::Do(Command::Renamed { target, from, to })
            | DoUndo::Undo(Command::Renamed {
                target,
                from: to,
                to: from,
            }) => {
                let node = self.node(*target).ok_or(CommandError::UnknownResource)?;
                if node.name() != from.as_deref() {
                    return Err(CommandError::MismatchedState);
                }
                self.set_name(*target, to.clone());
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::commands::{CommandConsumer, CommandError, DoUndo};
    use crate::field::{Field, FieldState};
    use crate::state::graph::{Graph, MakeSelector};

    #[test]
    fn undo_restores_literal_state_exactly() {
        let mut graph = Graph::<u8, ()>::new();
        let mut sel = None;
        graph
            .build_appended(0, true, |alloc| {
                // Literal chunk absent in the source.
                sel = Some(alloc.make_selector(1, Field::unset("TlNo", -1), true));
                Ok::<_, ()>(())
            })
            .unwrap();
        let target = graph.build_appended(1, true, |_| Ok::<_, ()>(())).unwrap();
        graph.initialize();
        let sel = sel.unwrap();

        let from = graph.selector(sel).unwrap().selection();
        let to = graph.selection_for(sel, Some(target)).unwrap();
        assert_eq!(to.literal, FieldState::Value(0));
        let command = Command::Selected { selector: sel, from, to };

        graph.apply(DoUndo::Do(&command)).unwrap();
        assert_eq!(graph.incoming(target), [sel]);
        // Applying twice is a state mismatch.
        assert!(matches!(
            graph.apply(DoUndo::Do(&command)),
            Err(CommandError::MismatchedState)
        ));

        graph.apply(DoUndo::Undo(&command)).unwrap();
        assert!(graph.incoming(target).is_empty());
        assert_eq!(graph.selector(sel).unwrap().literal().state(), &FieldState::Unset);
    }
    #[test]
    fn insert_remove_round() {
        let mut graph = Graph::<u8, ()>::new();
        let a = graph.build_appended(0, true, |_| Ok::<_, ()>(())).unwrap();
        let b = graph.build_node(0, true, |_| Ok::<_, ()>(())).unwrap();
        let insert = Command::NodeInserted { target: b, idx: 0 };
        graph.apply(DoUndo::Do(&insert)).unwrap();
        assert_eq!(graph.group(0), [b, a]);

        let remove = Command::NodeRemoved { target: a, idx: 0 };
        // a is at 1, not 0.
        assert!(matches!(
            graph.apply(DoUndo::Do(&remove)),
            Err(CommandError::MismatchedState)
        ));
        graph.apply(DoUndo::Undo(&insert)).unwrap();
        assert_eq!(graph.group(0), [a]);
        graph.apply(DoUndo::Do(&remove)).unwrap();
        assert!(graph.group(0).is_empty());
        graph.apply(DoUndo::Undo(&remove)).unwrap();
        assert_eq!(graph.group(0), [a]);
    }
}
