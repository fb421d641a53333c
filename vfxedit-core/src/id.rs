//! # IDs
//! Every open document is addressed by a [`DocumentID`], unique within this execution of the program.
//! IDs are never persisted, and their order carries no meaning.

use std::sync::atomic::{AtomicU64, Ordering};

// Zero is never handed out, so the niche of `NonZeroU64` stays available.
static NEXT_DOCUMENT: AtomicU64 = AtomicU64::new(1);

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct DocumentID(std::num::NonZeroU64);
impl DocumentID {
    /// Get the raw numeric value of this ID.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.0.get()
    }
}
impl Default for DocumentID {
    fn default() -> Self {
        let raw = NEXT_DOCUMENT.fetch_add(1, Ordering::Relaxed);
        match std::num::NonZeroU64::new(raw) {
            Some(id) => Self(id),
            None => {
                // Wrapped around. Handing out a duplicate would alias two documents.
                log::error!("DocumentID overflow! Aborting!");
                log::logger().flush();
                std::process::abort();
            }
        }
    }
}
impl std::fmt::Display for DocumentID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Document#{}", self.0)
    }
}
impl std::fmt::Debug for DocumentID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <Self as std::fmt::Display>::fmt(self, f)
    }
}

#[cfg(test)]
mod test {
    use super::DocumentID;
    #[test]
    fn ids_unique() {
        let mut ids: Vec<_> = (0..256).map(|_| DocumentID::default()).collect();
        let before = ids.len();
        ids.sort_unstable_by_key(DocumentID::id);
        ids.dedup();
        assert_eq!(before, ids.len(), "had duplicate ids");
    }
    #[test]
    fn display() {
        let id = DocumentID::default();
        assert_eq!(id.to_string(), format!("Document#{}", id.id()));
    }
}
