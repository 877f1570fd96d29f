//! Quick-select catalog lists persisted in the local fallback.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use andon_core::catalog::{CatalogKind, CatalogList};
use andon_events::{AndonEvent, EventBus};

use crate::error::StoreError;
use crate::local::LocalStore;

pub struct CatalogStore {
    lists: RwLock<HashMap<CatalogKind, CatalogList>>,
    local: LocalStore,
    bus: Arc<EventBus>,
}

impl CatalogStore {
    /// Load every list, using the defaults for lists never persisted or
    /// unreadable.
    pub async fn load(local: LocalStore, bus: Arc<EventBus>) -> Self {
        let mut lists = HashMap::new();

        for kind in CatalogKind::ALL {
            let list = match local.read::<CatalogList>(kind.storage_key()).await {
                Ok(Some(list)) => list,
                Ok(None) => kind.defaults(),
                Err(e) => {
                    tracing::warn!(catalog = %kind, error = %e, "Catalog unreadable, using defaults");
                    kind.defaults()
                }
            };
            lists.insert(kind, list);
        }

        Self {
            lists: RwLock::new(lists),
            local,
            bus,
        }
    }

    pub fn list(&self, kind: CatalogKind) -> CatalogList {
        self.lists
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| kind.defaults())
    }

    /// Add a value. Returns the resulting list; unchanged when the value is
    /// blank or already present.
    pub async fn add(&self, kind: CatalogKind, value: &str) -> Result<CatalogList, StoreError> {
        self.mutate(kind, |list| list.add(value)).await
    }

    /// Remove an exact match. Returns the resulting list.
    pub async fn remove(&self, kind: CatalogKind, value: &str) -> Result<CatalogList, StoreError> {
        self.mutate(kind, |list| list.remove(value)).await
    }

    async fn mutate<F>(&self, kind: CatalogKind, f: F) -> Result<CatalogList, StoreError>
    where
        F: FnOnce(&mut CatalogList) -> bool,
    {
        let (changed, list) = {
            let mut lists = self.lists.write().unwrap_or_else(PoisonError::into_inner);
            let list = lists.entry(kind).or_insert_with(|| kind.defaults());
            (f(list), list.clone())
        };

        if changed {
            self.local.write(kind.storage_key(), &list).await?;
            self.bus
                .publish(AndonEvent::catalog_changed(kind, list.clone()));
            tracing::info!(catalog = %kind, size = list.len(), "Catalog updated");
        }
        Ok(list)
    }
}
