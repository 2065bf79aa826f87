use std::sync::{Arc, PoisonError, RwLock};

use anyhow::Result;
use log::{debug, info};

/// A lazily loaded model shared by every run that asks for it.
///
/// The first successful `get_or_init` stores the model; later calls hand out
/// the same `Arc`. A failed load leaves the slot empty so the next call
/// retries. `release` drops the slot's reference; runs already holding the
/// model keep it alive until they finish.
#[derive(Debug)]
pub struct ModelSlot<T: ?Sized> {
    name: &'static str,
    inner: RwLock<Option<Arc<T>>>,
}

impl<T: ?Sized> ModelSlot<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: RwLock::new(None),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The loaded model, loading it with `init` if the slot is empty.
    pub fn get_or_init<F>(&self, init: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Result<Arc<T>>,
    {
        if let Some(model) = self.get() {
            return Ok(model);
        }
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        // Another thread may have won the race while we waited for the lock.
        if let Some(model) = guard.as_ref() {
            return Ok(Arc::clone(model));
        }
        let model = init()?;
        info!("loaded {} model", self.name);
        *guard = Some(Arc::clone(&model));
        Ok(model)
    }

    pub fn get(&self) -> Option<Arc<T>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Empty the slot. Returns whether a model was loaded.
    pub fn release(&self) -> bool {
        let released = self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some();
        if released {
            debug!("released {} model", self.name);
        }
        released
    }

    pub fn is_loaded(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn initializes_once() {
        let slot: ModelSlot<String> = ModelSlot::new("test");
        let calls = AtomicUsize::new(0);
        let load = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new("model".to_string()))
        };
        let a = slot.get_or_init(load).unwrap();
        let b = slot
            .get_or_init(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new("other".to_string()))
            })
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_load_leaves_slot_empty() {
        let slot: ModelSlot<String> = ModelSlot::new("test");
        assert!(slot.get_or_init(|| anyhow::bail!("missing file")).is_err());
        assert!(!slot.is_loaded());
        assert!(slot.get_or_init(|| Ok(Arc::new("ok".into()))).is_ok());
        assert!(slot.is_loaded());
    }

    #[test]
    fn release_keeps_outstanding_handles_alive() {
        let slot: ModelSlot<String> = ModelSlot::new("test");
        let held = slot.get_or_init(|| Ok(Arc::new("model".into()))).unwrap();
        assert!(slot.release());
        assert!(!slot.is_loaded());
        assert!(slot.get().is_none());
        assert_eq!(held.as_str(), "model");
        assert!(!slot.release());
    }

    #[test]
    fn concurrent_callers_share_one_instance() {
        let slot: Arc<ModelSlot<String>> = Arc::new(ModelSlot::new("test"));
        let calls = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let slot = Arc::clone(&slot);
                let calls = Arc::clone(&calls);
                std::thread::spawn(move || {
                    slot.get_or_init(|| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(Arc::new("model".into()))
                    })
                    .unwrap()
                })
            })
            .collect();
        let models: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(models.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}
