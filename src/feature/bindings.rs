use std::collections::BTreeMap;
use std::sync::Arc;

/// Variable environment for a single match attempt.
///
/// Variables range over symbolic features and are bound to a symbol mask the
/// first time they are unified against a concrete value. A fresh environment
/// is created per match attempt, so bindings never leak across hypotheses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableBindings {
    values: BTreeMap<Arc<str>, u64>,
}

impl VariableBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<u64> {
        self.values.get(name).copied()
    }

    pub fn bind(&mut self, name: Arc<str>, mask: u64) {
        self.values.insert(name, mask);
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.values.iter().map(|(k, v)| (k.as_ref(), *v))
    }
}
