//! # Catalogs
//!
//! A list of entries, such as texture paths, produced by a loader on a worker thread. Until the loader finishes
//! the catalog is empty and not [ready](super::Readiness). Queues gated on a catalog refuse writes until then.

use super::Readiness;
use std::sync::Arc;

#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("catalog loader failed: {0}")]
    Load(String),
    #[error("catalog loader panicked")]
    Panicked,
}

pub struct Catalog<T> {
    entries: Arc<parking_lot::RwLock<Vec<T>>>,
    ready: Readiness,
    worker: parking_lot::Mutex<Option<std::thread::JoinHandle<Result<usize, CatalogError>>>>,
}
impl<T: Clone + Send + Sync + 'static> Catalog<T> {
    /// Start loading on a worker thread.
    pub fn spawn<F>(name: &str, load: F) -> std::io::Result<Self>
    where
        F: FnOnce() -> Result<Vec<T>, String> + Send + 'static,
    {
        let entries = Arc::new(parking_lot::RwLock::new(Vec::new()));
        let ready = Readiness::default();
        let worker = {
            let entries = Arc::clone(&entries);
            let ready = ready.clone();
            let name = name.to_owned();
            std::thread::Builder::new()
                .name(format!("catalog {name}"))
                .spawn(move || {
                    let loaded = load().map_err(|err| {
                        log::error!("loading catalog {name} failed: {err}");
                        CatalogError::Load(err)
                    })?;
                    let count = loaded.len();
                    *entries.write() = loaded;
                    ready.set_ready();
                    log::debug!("catalog {name} ready with {count} entries");
                    Ok(count)
                })?
        };
        Ok(Self {
            entries,
            ready,
            worker: parking_lot::Mutex::new(Some(worker)),
        })
    }
    /// A catalog that is ready immediately.
    #[must_use]
    pub fn from_entries(entries: Vec<T>) -> Self {
        let ready = Readiness::default();
        ready.set_ready();
        Self {
            entries: Arc::new(parking_lot::RwLock::new(entries)),
            ready,
            worker: parking_lot::Mutex::new(None),
        }
    }
    #[must_use]
    pub fn readiness(&self) -> Readiness {
        self.ready.clone()
    }
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.is_ready()
    }
    /// An entry, or None if out of range or not loaded yet.
    #[must_use]
    pub fn get(&self, idx: usize) -> Option<T> {
        if !self.is_ready() {
            return None;
        }
        self.entries.read().get(idx).cloned()
    }
    #[must_use]
    pub fn len(&self) -> usize {
        if self.is_ready() {
            self.entries.read().len()
        } else {
            0
        }
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Block until the loader has finished, returning how many entries it produced.
    pub fn wait(&self) -> Result<usize, CatalogError> {
        match self.worker.lock().take() {
            Some(worker) => worker.join().map_err(|_| CatalogError::Panicked)?,
            None if self.is_ready() => Ok(self.entries.read().len()),
            // Joined before, and it failed then.
            None => Err(CatalogError::Load("already failed".into())),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ready_after_load() {
        let (tx, rx) = std::sync::mpsc::channel::<()>();
        let catalog = Catalog::spawn("textures", move || {
            // Hold the loader until the test has looked at the empty catalog.
            rx.recv().map_err(|err| err.to_string())?;
            Ok(vec!["vfx/common/texture/fire01.atex".to_owned()])
        })
        .unwrap();
        assert!(!catalog.is_ready());
        assert_eq!(catalog.get(0), None);

        tx.send(()).unwrap();
        assert_eq!(catalog.wait().unwrap(), 1);
        assert!(catalog.readiness().is_ready());
        assert_eq!(catalog.get(0).as_deref(), Some("vfx/common/texture/fire01.atex"));
    }
    #[test]
    fn failed_load_never_ready() {
        let catalog = Catalog::<String>::spawn("broken", || Err("no game data".into())).unwrap();
        assert!(matches!(catalog.wait(), Err(CatalogError::Load(_))));
        assert!(!catalog.is_ready());
        assert!(catalog.is_empty());
    }
}
