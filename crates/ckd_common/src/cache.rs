//! Process-wide model cache.
//!
//! Each model source gets one initialization barrier. The first request
//! loads the artifact; every later request reuses the same `Arc`. A failed
//! load leaves the slot empty, so the next request tries again instead of
//! replaying a cached failure. A pinned digest is compared against the
//! digest recorded when the artifact was read.

use crate::error::{CkdError, Result};
use crate::loader::{check_digest, ModelLoader, ModelSource};
use crate::model::LoadedModel;
use once_cell::sync::{Lazy, OnceCell};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

type Slot = Arc<OnceCell<Arc<LoadedModel>>>;

static GLOBAL: Lazy<ModelCache> = Lazy::new(ModelCache::new);

/// The cache shared by the whole process
pub fn global() -> &'static ModelCache {
    &GLOBAL
}

#[derive(Default)]
pub struct ModelCache {
    slots: Mutex<HashMap<ModelSource, Slot>>,
}

impl ModelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached model for `source`, loading it on first use.
    /// A pinned digest is checked on every call, cached or not.
    pub fn get_or_load(
        &self,
        loader: &ModelLoader,
        source: &ModelSource,
        expected_sha256: Option<&str>,
    ) -> Result<Arc<LoadedModel>> {
        let model = self.get_or_init_with(source, || loader.load(source, expected_sha256))?;

        if let Some(expected) = expected_sha256 {
            let actual = model.sha256().ok_or_else(|| {
                CkdError::model_load(source, "cached model has no artifact digest")
            })?;
            check_digest(actual, expected).map_err(|reason| {
                warn!("Pinned digest rejected cached model for {}", source);
                CkdError::model_load(source, reason)
            })?;
        }
        Ok(model)
    }

    /// Same as [`get_or_load`](Self::get_or_load) with a caller-supplied loader
    pub fn get_or_init_with<F>(&self, source: &ModelSource, load: F) -> Result<Arc<LoadedModel>>
    where
        F: FnOnce() -> Result<LoadedModel>,
    {
        let slot = self.slot(source);

        if let Some(model) = slot.get() {
            debug!("Model cache hit for {}", source);
            return Ok(Arc::clone(model));
        }

        let model = slot
            .get_or_try_init(|| load().map(Arc::new))
            .map_err(|e| {
                warn!("Model load failed for {}: {}", source, e);
                e
            })?;
        Ok(Arc::clone(model))
    }

    pub fn get(&self, source: &ModelSource) -> Option<Arc<LoadedModel>> {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.get(source).and_then(|slot| slot.get().cloned())
    }

    pub fn is_loaded(&self, source: &ModelSource) -> bool {
        self.get(source).is_some()
    }

    /// Number of successfully loaded models
    pub fn len(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.values().filter(|slot| slot.get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // The map lock is held only while fetching the slot, never during a load.
    fn slot(&self, source: &ModelSource) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(slots.entry(source.clone()).or_default())
    }
}
