//! # Providers
//!
//! Owners of the open documents. Each document keeps its own queue, history and graph. Values cross from one
//! document to another only by copy, see [`crate::state::clipboard`].

use super::DocumentCommandQueue;
use crate::DocumentID;

/// A provider that keeps documents in-memory.
#[derive(Default)]
pub struct InMemoryDocumentProvider {
    // Write-locked only while opening or closing a document.
    documents: parking_lot::RwLock<hashbrown::HashMap<DocumentID, std::sync::Arc<DocumentCommandQueue>>>,
}
impl InMemoryDocumentProvider {
    /// Insert a queue into this provider.
    /// If a document with this ID already exists, the untouched queue is returned as an error.
    pub fn insert(&self, queue: DocumentCommandQueue) -> Result<DocumentID, DocumentCommandQueue> {
        let id = queue.id();
        match self.documents.write().entry(id) {
            hashbrown::hash_map::Entry::Occupied(_) => return Err(queue),
            hashbrown::hash_map::Entry::Vacant(v) => {
                v.insert(std::sync::Arc::new(queue));
            }
        }
        log::debug!("opened {id}");
        Ok(id)
    }
    /// Get a handle to the document's queue, if open.
    #[must_use]
    pub fn get(&self, id: DocumentID) -> Option<std::sync::Arc<DocumentCommandQueue>> {
        self.documents.read().get(&id).cloned()
    }
    /// Call the given closure on the document queue with the given ID, if found.
    pub fn inspect<F, T>(&self, id: DocumentID, f: F) -> Option<T>
    where
        F: FnOnce(&DocumentCommandQueue) -> T,
    {
        Some(f(self.documents.read().get(&id)?))
    }
    /// Close a document. Handles obtained through [`Self::get`] stay usable.
    pub fn remove(&self, id: DocumentID) -> Option<std::sync::Arc<DocumentCommandQueue>> {
        let removed = self.documents.write().remove(&id);
        if removed.is_some() {
            log::debug!("closed {id}");
        }
        removed
    }
    /// Iterate over all the open documents, by ID.
    pub fn document_iter(&self) -> impl Iterator<Item = DocumentID> {
        let ids: Vec<_> = self.documents.read().keys().copied().collect();
        ids.into_iter()
    }
}
