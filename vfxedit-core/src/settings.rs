//! User-tunable behavior of the editor core. Missing keys take their defaults, so a settings file only needs
//! to mention what it changes.

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// How many history entries each document keeps before the oldest is baked in.
    pub max_undo_size: usize,
    /// Re-encode every document after loading and compare against the source bytes.
    pub verify_on_load: bool,
    /// Log at debug level.
    pub log_debug: bool,
}
impl Default for Settings {
    fn default() -> Self {
        Self {
            max_undo_size: 10,
            verify_on_load: true,
            log_debug: false,
        }
    }
}
impl Settings {
    /// Create an empty document queue using these settings.
    #[must_use]
    pub fn open_queue(
        &self,
        document: crate::vfx::Document,
        info: crate::state::DocumentInfo,
    ) -> crate::queue::DocumentCommandQueue {
        crate::queue::DocumentCommandQueue::from_document(document, info, self.max_undo_size)
    }
}
