//! # Commands
//!
//! Commands are the only way the state of an open document is modified. Every change made through a
//! [`writer`](crate::queue::writer) is recorded automatically as a command, and the [`history`] replays
//! them in either direction.

pub mod history;

pub use crate::state::graph::commands::Command as GraphCommand;
pub use crate::vfx::commands::Command as VfxCommand;

use crate::state::graph::{GroupError, SelectError};

#[derive(thiserror::Error, Debug)]
pub enum CommandError {
    #[error("command constructed for a state that does not match the current state")]
    MismatchedState,
    #[error("resource referenced by the command is not found")]
    UnknownResource,
    #[error("command makes no changes")]
    NoOp,
    #[error(transparent)]
    Select(#[from] SelectError),
    #[error(transparent)]
    Group(#[from] GroupError),
}
pub trait CommandConsumer<C> {
    /// Apply a single command. If this generates an error,
    /// the state of `self` should *not* be observably changed.
    fn apply(&mut self, command: DoUndo<'_, C>) -> Result<(), CommandError>;
}
#[derive(Clone, PartialEq, Debug)]
pub enum ScopeType {
    /// Commands are grouped because they were individual parts in part of a single, larger operation.
    Atoms,
    /// A command writer panicked mid write. The commands contained may be part of an incomplete operation,
    /// but are still tracked so the history matches the state.
    WritePanic,
}
/// Commands about commands!
#[derive(Clone, PartialEq, Debug)]
pub enum MetaCommand {
    /// Bundle many commands into one history entry. Can be nested.
    /// Done in order, undone in reverse order.
    Scope(ScopeType, Box<[Command]>),
}

#[derive(Clone, PartialEq, Debug)]
pub enum Command {
    Meta(MetaCommand),
    Graph(GraphCommand),
    Vfx(VfxCommand),
}
impl From<MetaCommand> for Command {
    fn from(value: MetaCommand) -> Self {
        Self::Meta(value)
    }
}
impl From<GraphCommand> for Command {
    fn from(value: GraphCommand) -> Self {
        Self::Graph(value)
    }
}
impl From<VfxCommand> for Command {
    fn from(value: VfxCommand) -> Self {
        Self::Vfx(value)
    }
}
impl Command {
    #[must_use]
    pub fn meta(&self) -> Option<&MetaCommand> {
        match self {
            Self::Meta(m) => Some(m),
            _ => None,
        }
    }
    #[must_use]
    pub fn graph(&self) -> Option<&GraphCommand> {
        match self {
            Self::Graph(m) => Some(m),
            _ => None,
        }
    }
    #[must_use]
    pub fn vfx(&self) -> Option<&VfxCommand> {
        match self {
            Self::Vfx(m) => Some(m),
            _ => None,
        }
    }
    /// Number of leaf commands, counting into scopes.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Meta(MetaCommand::Scope(_, commands)) => {
                commands.iter().map(Self::leaf_count).sum()
            }
            _ => 1,
        }
    }
}

#[derive(PartialEq, Eq, Debug)]
pub enum DoUndo<'c, T> {
    Do(&'c T),
    Undo(&'c T),
}
impl<'c, T> DoUndo<'c, T> {
    /// Apply a closure to the inner type T, maintaining the
    /// Do or Undo status. Returns None if the closure returns None.
    pub fn filter_map<Func, Return>(&self, f: Func) -> Option<DoUndo<'c, Return>>
    where
        Func: FnOnce(&'c T) -> Option<&'c Return>,
        Return: 'c,
    {
        match self {
            Self::Do(c) => Some(DoUndo::Do(f(c)?)),
            Self::Undo(c) => Some(DoUndo::Undo(f(c)?)),
        }
    }
    /// The same command, in the other direction.
    #[must_use]
    pub fn inverse(&self) -> Self {
        match self {
            Self::Do(c) => Self::Undo(c),
            Self::Undo(c) => Self::Do(c),
        }
    }
}

fn step(command: &Command, undo: bool) -> DoUndo<'_, Command> {
    if undo {
        DoUndo::Undo(command)
    } else {
        DoUndo::Do(command)
    }
}
/// Apply the commands of a scope, in order when doing and in reverse when undoing.
///
/// If one fails, those already applied are reverted before the error is returned.
pub fn apply_scope<S>(target: &mut S, commands: &[Command], undo: bool) -> Result<(), CommandError>
where
    S: CommandConsumer<Command> + ?Sized,
{
    let ordered: Vec<&Command> = if undo {
        commands.iter().rev().collect()
    } else {
        commands.iter().collect()
    };
    for (applied, &command) in ordered.iter().enumerate() {
        if let Err(err) = target.apply(step(command, undo)) {
            for &done in ordered[..applied].iter().rev() {
                if let Err(rollback) = target.apply(step(done, !undo)) {
                    log::error!("failed to roll back partially applied scope: {rollback}");
                }
            }
            return Err(err);
        }
    }
    Ok(())
}
