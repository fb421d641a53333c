use crate::commands::{self, Command};
use crate::state::graph::writer::GraphWriter;
use crate::vfx::{enums::NodeKind, nodes::NodePayload, writer::VfxWriter};

/// Any type which can sink commands.
pub trait CommandWrite<Command> {
    /// Inserts a command.
    fn write(&mut self, command: Command);
}
impl<Write, Command> CommandWrite<Command> for &mut Write
where
    Write: CommandWrite<Command>,
{
    fn write(&mut self, command: Command) {
        (**self).write(command);
    }
}
// Any subcommand that can be wrapped in Command can be written into any
// smallvec of Command.
impl<Subcommand, Array> CommandWrite<Subcommand> for smallvec::SmallVec<Array>
where
    Subcommand: Into<Command>,
    Array: smallvec::Array<Item = Command>,
{
    fn write(&mut self, command: Subcommand) {
        self.push(command.into());
    }
}

type Commands = smallvec::SmallVec<[Command; 1]>;

pub struct CommandQueueWriter<'a> {
    pub(super) lock: parking_lot::RwLockWriteGuard<'a, super::DocumentCommandQueueInner>,
    // Optimize for exactly one command (the most common case)
    pub(super) commands: Commands,
}
// If the writer is leaked, the state no longer matches the history, but the lock is held forever
// so nobody can observe it.
impl Drop for CommandQueueWriter<'_> {
    fn drop(&mut self) {
        let panicking = std::thread::panicking();
        // Always record exactly one entry, bundling if there are several.
        // A panicking writer is recorded as a panic scope even if it wrote only one command.
        let command = match self.commands.pop() {
            None => return,
            Some(only) if !panicking && self.commands.is_empty() => only,
            Some(last) => {
                self.commands.push(last);
                let ty = if panicking {
                    commands::ScopeType::WritePanic
                } else {
                    commands::ScopeType::Atoms
                };
                Command::Meta(commands::MetaCommand::Scope(
                    ty,
                    std::mem::take(&mut self.commands).into_boxed_slice(),
                ))
            }
        };
        log::trace!("Writing new command: {command:#?}");
        self.lock.history.push_executed(command);
    }
}
impl CommandQueueWriter<'_> {
    #[must_use]
    pub fn changed(&self) -> bool {
        !self.commands.is_empty()
    }
    /// Undo everything written so far, so nothing is recorded.
    pub(super) fn rollback(&mut self) {
        let written = std::mem::take(&mut self.commands);
        if let Err(err) = commands::apply_scope(&mut self.lock.state, &written, true) {
            // The scope re-applied what it had undone, so keep the commands to match.
            log::error!("failed to roll back a failed write: {err}");
            self.commands = written;
        }
    }
    #[must_use]
    pub fn document(&self) -> &crate::vfx::Document {
        &self.lock.state.document
    }
    #[must_use]
    pub fn info(&self) -> &crate::state::DocumentInfo {
        &self.lock.state.info
    }
    pub fn graph(&mut self) -> GraphWriter<'_, &mut Commands, NodeKind, NodePayload> {
        GraphWriter::new(&mut self.commands, &mut self.lock.state.document.graph)
    }
    pub fn vfx(&mut self) -> VfxWriter<'_, &mut Commands> {
        VfxWriter::new(&mut self.commands, &mut self.lock.state.document)
    }
}
