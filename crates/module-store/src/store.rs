use recordflow_core_types::ModuleId;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::StoreError;
use crate::model::Module;

/// Ordered module list plus the monotonic id counter.
///
/// The counter only ever moves forward: removing a module does not free its
/// id for reuse, and the counter is persisted with the list so a reloaded
/// store keeps allocating fresh ids.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleStore {
    modules: Vec<Module>,
    next_id: u64,
}

impl ModuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new module with defaults and return it for editing.
    pub fn add(&mut self, name: impl Into<String>) -> &mut Module {
        let id = ModuleId(self.next_id);
        self.next_id += 1;
        let module = Module::new(id, name);
        debug!(id = %module.id, name = %module.name, "module added");
        self.modules.push(module);
        let added = self.modules.len() - 1;
        &mut self.modules[added]
    }

    pub fn get(&self, id: ModuleId) -> Option<&Module> {
        self.modules.iter().find(|m| m.id == id)
    }

    pub fn get_mut(&mut self, id: ModuleId) -> Option<&mut Module> {
        self.modules.iter_mut().find(|m| m.id == id)
    }

    /// Remove a module by id. Returns whether anything was removed; the id
    /// counter is untouched.
    pub fn remove(&mut self, id: ModuleId) -> bool {
        let before = self.modules.len();
        self.modules.retain(|m| m.id != id);
        let removed = self.modules.len() != before;
        if removed {
            debug!(id = %id, "module removed");
        }
        removed
    }

    /// Reorder as a stable partition: modules named in `ids` come first in
    /// the requested order, everything else follows in its prior relative
    /// order. Unknown ids are ignored.
    pub fn reorder(&mut self, ids: &[ModuleId]) {
        let mut remainder = std::mem::take(&mut self.modules);
        let mut ordered = Vec::with_capacity(remainder.len());

        for id in ids {
            if let Some(pos) = remainder.iter().position(|m| m.id == *id) {
                ordered.push(remainder.remove(pos));
            }
        }
        ordered.append(&mut remainder);

        debug!(named = ids.len(), total = ordered.len(), "modules reordered");
        self.modules = ordered;
    }

    /// Ordered snapshot of the current list.
    pub fn list(&self) -> Vec<Module> {
        self.modules.clone()
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Empty the list and reset the id counter.
    pub fn clear(&mut self) {
        self.modules.clear();
        self.next_id = 0;
    }

    /// Persist the full list plus the id counter as a JSON document.
    pub fn serialize(&self) -> Result<String, StoreError> {
        serde_json::to_string_pretty(self).map_err(StoreError::Serialize)
    }

    /// Restore a store previously produced by [`ModuleStore::serialize`].
    pub fn deserialize(document: &str) -> Result<Self, StoreError> {
        serde_json::from_str(document).map_err(StoreError::Deserialize)
    }
}
