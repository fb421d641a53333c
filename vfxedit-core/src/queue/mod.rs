//! Command Queue
//!
//! Each open document has one queue, which owns its state and its [history](crate::commands::history). The queue
//! is the ground truth for the document: every change goes through [`DocumentCommandQueue::write_with`], and
//! undo/redo replay the recorded commands.
//!
//! Documents are held by [provider]s. There is no global access, callers pass the provider around.

use std::sync::Arc;

use crate::{
    commands::{self, history::History, CommandError},
    repositories::Readiness,
    state::DocumentInfo,
    vfx::Document,
    DocumentID,
};

pub mod provider;
mod queue_state;
pub mod writer;

pub use queue_state::State;

#[derive(thiserror::Error, Debug)]
pub enum WriteError {
    /// A catalog this queue depends on is still loading.
    #[error("document is waiting on a catalog to finish loading")]
    NotReady,
    #[error(transparent)]
    Command(#[from] CommandError),
}

struct DocumentCommandQueueInner {
    history: History<commands::Command>,
    state: queue_state::State,
}
pub struct DocumentCommandQueue {
    /// Mutable inner bits.
    inner: Arc<parking_lot::RwLock<DocumentCommandQueueInner>>,
    document: DocumentID,
    gate: Option<Readiness>,
}
impl DocumentCommandQueue {
    /// Create a queue from a loaded document, without a history.
    #[must_use]
    pub fn from_document(document: Document, info: DocumentInfo, max_history: usize) -> Self {
        Self {
            inner: Arc::new(
                DocumentCommandQueueInner {
                    history: History::new(max_history),
                    state: queue_state::State { info, document },
                }
                .into(),
            ),
            document: DocumentID::default(),
            gate: None,
        }
    }
    /// Refuse writes until `gate` is ready.
    #[must_use]
    pub fn gated_on(mut self, gate: Readiness) -> Self {
        self.gate = Some(gate);
        self
    }
    #[must_use]
    pub fn id(&self) -> DocumentID {
        self.document
    }
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.gate.as_ref().map_or(true, Readiness::is_ready)
    }
    /// Locks the queue for writing commands during the span of the closure, where each modification of the state
    /// is tracked by the command queue. If multiple commands are written, they will be written in order as a
    /// single Atoms scope.
    ///
    /// If the closure returns an error, everything it wrote is undone and nothing is recorded.
    pub fn write_with<F, T>(&self, write: F) -> Result<T, WriteError>
    where
        F: FnOnce(&mut writer::CommandQueueWriter<'_>) -> Result<T, CommandError>,
    {
        if !self.is_ready() {
            return Err(WriteError::NotReady);
        }
        let lock = self.inner.write();
        let mut writer = writer::CommandQueueWriter {
            lock,
            commands: smallvec::SmallVec::new(),
        };
        // Panic safe - the writer's Drop impl records whatever was written, keeping history and state in sync.
        let result = write(&mut writer);
        if result.is_err() {
            writer.rollback();
        }
        Ok(result?)
    }
    /// Look at the current state.
    pub fn read<F, T>(&self, read: F) -> T
    where
        F: FnOnce(&queue_state::State) -> T,
    {
        read(&self.inner.read().state)
    }
    /// Revert the most recent entry. `Ok(false)` if there was nothing to undo.
    pub fn undo(&self) -> Result<bool, CommandError> {
        let mut lock = self.inner.write();
        let DocumentCommandQueueInner { history, state } = &mut *lock;
        history.undo(state)
    }
    /// Re-apply the most recently undone entry. `Ok(false)` if there was nothing to redo.
    pub fn redo(&self) -> Result<bool, CommandError> {
        let mut lock = self.inner.write();
        let DocumentCommandQueueInner { history, state } = &mut *lock;
        history.redo(state)
    }
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.inner.read().history.can_undo()
    }
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.inner.read().history.can_redo()
    }
    /// Index of the most recently applied entry, None if nothing is applied.
    #[must_use]
    pub fn cursor(&self) -> Option<usize> {
        self.inner.read().history.cursor()
    }
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.inner.read().history.len()
    }
    pub fn set_max_history(&self, max: usize) {
        self.inner.write().history.set_max(max);
    }
    /// Forget the history, leaving the document as it is.
    pub fn dispose(&self) {
        self.inner.write().history.dispose();
    }
    /// Whether anything changed since loading or the last save.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.inner.read().history.is_dirty()
    }
    /// Encode the document to `path`, then remember it as the document's path.
    pub fn save_to(&self, path: impl Into<std::path::PathBuf>) -> std::io::Result<()> {
        let path = path.into();
        let mut lock = self.inner.write();
        let bytes = lock.state.document.encode()?;
        std::fs::write(&path, &bytes)?;
        log::info!("saved {} bytes to {}", bytes.len(), path.display());
        lock.state.info = DocumentInfo::from_path(path);
        lock.history.mark_clean();
        Ok(())
    }
}
