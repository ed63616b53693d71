use std::collections::HashMap;

/// Per-record variable bindings.
///
/// Seeded from one record's field values, mutated only by modules writing
/// their extracted value through `output_var`, and discarded when the
/// record finishes. Never shared across records.
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    values: HashMap<String, String>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with a record's fields.
    pub fn seeded_from(record: &HashMap<String, String>) -> Self {
        Self {
            values: record.clone(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
