use crate::commands::*;
use crate::state::DocumentInfo;
use crate::vfx::Document;

pub struct State {
    pub info: DocumentInfo,
    pub document: Document,
}
impl CommandConsumer<Command> for State {
    fn apply(&mut self, action: DoUndo<Command>) -> Result<(), CommandError> {
        match action {
            DoUndo::Do(Command::Graph(command)) => self.document.graph.apply(DoUndo::Do(command)),
            DoUndo::Undo(Command::Graph(command)) => {
                self.document.graph.apply(DoUndo::Undo(command))
            }
            DoUndo::Do(Command::Vfx(command)) => self.document.apply(DoUndo::Do(command)),
            DoUndo::Undo(Command::Vfx(command)) => self.document.apply(DoUndo::Undo(command)),
            // Recursively do each of the commands in the scope, in order.
            DoUndo::Do(Command::Meta(MetaCommand::Scope(_, commands))) => {
                apply_scope(self, commands, false)
            }
            // Recursively undo each of the commands of the scope, in reverse order.
            DoUndo::Undo(Command::Meta(MetaCommand::Scope(_, commands))) => {
                apply_scope(self, commands, true)
            }
        }
    }
}
