//! # Repositories
//!
//! Auxiliary data that is not part of any document, loaded in the background and shared by reference.

pub mod catalog;

/// A flag raised once a background load has finished. Cheap to clone, every clone observes the same flag.
#[derive(Clone, Default, Debug)]
pub struct Readiness(std::sync::Arc<std::sync::atomic::AtomicBool>);
impl Readiness {
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.0.load(std::sync::atomic::Ordering::Acquire)
    }
    pub(crate) fn set_ready(&self) {
        self.0.store(true, std::sync::atomic::Ordering::Release);
    }
}
