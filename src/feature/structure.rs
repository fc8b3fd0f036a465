use super::bindings::VariableBindings;
use super::system::{FeatureId, FeatureSystem};
use super::value::FeatureValue;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// An attribute-value structure over the features of a [`FeatureSystem`].
///
/// Feature structures are plain values: every operation returns a new
/// structure and equality/hashing are structural. A feature that is absent is
/// unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureStruct {
    values: BTreeMap<FeatureId, FeatureValue>,
}

impl FeatureStruct {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn get(&self, feature: FeatureId) -> Option<&FeatureValue> {
        self.values.get(&feature)
    }

    pub fn set(&mut self, feature: FeatureId, value: FeatureValue) {
        self.values.insert(feature, value);
    }

    pub fn with(mut self, feature: FeatureId, value: FeatureValue) -> Self {
        self.set(feature, value);
        self
    }

    pub fn remove(&mut self, feature: FeatureId) -> Option<FeatureValue> {
        self.values.remove(&feature)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureId, &FeatureValue)> {
        self.values.iter().map(|(id, v)| (*id, v))
    }

    // --- Unification ---------------------------------------------------------

    /// Unify with `other` under `bindings`.
    ///
    /// Returns `None` when some feature present on both sides has no common
    /// value. `bindings` is only updated when unification succeeds.
    pub fn unify(&self, other: &FeatureStruct, bindings: &mut VariableBindings) -> Option<FeatureStruct> {
        let mut scratch = bindings.clone();
        let result = self.unify_in(other, &mut scratch)?;
        *bindings = scratch;
        Some(result)
    }

    pub(crate) fn unify_in(&self, other: &FeatureStruct, bindings: &mut VariableBindings) -> Option<FeatureStruct> {
        let mut values = self.values.clone();
        for (id, theirs) in &other.values {
            let merged = match self.values.get(id) {
                Some(ours) => ours.unify(theirs, bindings)?,
                None => theirs.clone(),
            };
            values.insert(*id, merged);
        }
        Some(FeatureStruct { values })
    }

    /// Unification test with a fresh variable environment.
    pub fn is_unifiable(&self, other: &FeatureStruct) -> bool {
        self.unify(other, &mut VariableBindings::new()).is_some()
    }

    /// True when `self` carries at least the information of `other`
    /// (every feature of `other` is present and no wider).
    pub fn subsumed_by(&self, other: &FeatureStruct) -> bool {
        other.values.iter().all(|(id, theirs)| match self.values.get(id) {
            Some(ours) => ours.unify(theirs, &mut VariableBindings::new()).as_ref() == Some(ours),
            None => false,
        })
    }

    // --- Set-like operations -------------------------------------------------

    /// Per-feature union of values; features present on one side only are kept.
    pub fn union(&self, other: &FeatureStruct) -> FeatureStruct {
        let mut values = self.values.clone();
        for (id, theirs) in &other.values {
            let merged = match self.values.get(id) {
                Some(ours) => ours.union(theirs),
                None => theirs.clone(),
            };
            values.insert(*id, merged);
        }
        FeatureStruct { values }
    }

    /// Remove `other`'s values from `self`, dropping features left empty.
    pub fn subtract(&self, other: &FeatureStruct) -> FeatureStruct {
        let mut values = BTreeMap::new();
        for (id, ours) in &self.values {
            let rest = match other.values.get(id) {
                Some(theirs) => ours.subtract(theirs),
                None => Some(ours.clone()),
            };
            if let Some(rest) = rest {
                values.insert(*id, rest);
            }
        }
        FeatureStruct { values }
    }

    /// Overwrite `self` with `other` feature by feature; nested structures are
    /// combined recursively.
    pub fn priority_union(&self, other: &FeatureStruct) -> FeatureStruct {
        let mut values = self.values.clone();
        for (id, theirs) in &other.values {
            let merged = match (self.values.get(id), theirs) {
                (Some(FeatureValue::Complex(ours)), FeatureValue::Complex(inner)) => {
                    FeatureValue::Complex(ours.priority_union(inner))
                }
                _ => theirs.clone(),
            };
            values.insert(*id, merged);
        }
        FeatureStruct { values }
    }

    // --- Variables -----------------------------------------------------------

    pub fn replace_variables(&self, bindings: &VariableBindings) -> FeatureStruct {
        let values = self.values.iter().map(|(id, v)| (*id, v.replace_variables(bindings))).collect();
        FeatureStruct { values }
    }

    pub fn has_variables(&self) -> bool {
        self.values.values().any(FeatureValue::has_variables)
    }

    /// Drop every feature still holding a variable.
    pub fn strip_variables(&self) -> FeatureStruct {
        let mut values = BTreeMap::new();
        for (id, v) in &self.values {
            match v {
                FeatureValue::Variable(_) => {}
                FeatureValue::Complex(fs) => {
                    values.insert(*id, FeatureValue::Complex(fs.strip_variables()));
                }
                _ => {
                    values.insert(*id, v.clone());
                }
            }
        }
        FeatureStruct { values }
    }

    // --- Display -------------------------------------------------------------

    /// Render in the bracketed notation accepted by [`FeatureSystem::parse`].
    pub fn to_notation(&self, system: &FeatureSystem) -> String {
        let mut out = String::from("[");
        self.write_notation(system, "", &mut out);
        out.push(']');
        out
    }

    fn write_notation(&self, system: &FeatureSystem, prefix: &str, out: &mut String) {
        for (id, value) in &self.values {
            let name = format!("{prefix}{}", system.name(*id));
            if !out.ends_with('[') {
                out.push(' ');
            }
            match value {
                FeatureValue::Symbolic(set) => {
                    let symbols = system.symbol_names(*id, set.bits());
                    match symbols.as_slice() {
                        [one] if *one == "+" || *one == "-" => {
                            let _ = write!(out, "{one}{name}");
                        }
                        _ => {
                            let _ = write!(out, "{name}={}", symbols.join("|"));
                        }
                    }
                }
                FeatureValue::Str(set) => {
                    let joined = set.values().collect::<Vec<_>>().join("|");
                    let op = if set.is_negated() { "!=" } else { "=" };
                    let _ = write!(out, "{name}{op}\"{joined}\"");
                }
                FeatureValue::Complex(inner) => inner.write_notation(system, &format!("{name}."), out),
                FeatureValue::Variable(var) => {
                    let sign = if var.agree { "" } else { "-" };
                    let _ = write!(out, "{sign}@{}:{name}", var.name);
                }
            }
        }
    }
}

impl FromIterator<(FeatureId, FeatureValue)> for FeatureStruct {
    fn from_iter<I: IntoIterator<Item = (FeatureId, FeatureValue)>>(iter: I) -> Self {
        FeatureStruct { values: iter.into_iter().collect() }
    }
}
