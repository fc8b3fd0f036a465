use super::bindings::VariableBindings;
use super::structure::FeatureStruct;
use std::collections::BTreeSet;
use std::sync::Arc;

// --- Symbolic values ---------------------------------------------------------

/// A set of symbols of one symbolic feature, stored as a bit mask.
///
/// `universe` holds every symbol the feature declares so that complements can
/// be taken without consulting the feature system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolSet {
    bits: u64,
    universe: u64,
}

impl SymbolSet {
    pub fn new(bits: u64, universe: u64) -> Self {
        Self { bits: bits & universe, universe }
    }

    pub fn bits(&self) -> u64 {
        self.bits
    }

    pub fn universe(&self) -> u64 {
        self.universe
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// True when every declared symbol is present, i.e. the value carries no information.
    pub fn is_full(&self) -> bool {
        self.bits == self.universe
    }

    pub fn intersect(&self, other: &SymbolSet) -> SymbolSet {
        SymbolSet::new(self.bits & other.bits, self.universe | other.universe)
    }

    pub fn union(&self, other: &SymbolSet) -> SymbolSet {
        SymbolSet::new(self.bits | other.bits, self.universe | other.universe)
    }

    pub fn complement(&self) -> SymbolSet {
        SymbolSet::new(!self.bits, self.universe)
    }

    pub fn minus(&self, other: &SymbolSet) -> SymbolSet {
        SymbolSet::new(self.bits & !other.bits, self.universe)
    }
}

// --- String values -----------------------------------------------------------

/// A set of strings, optionally negated ("any string except these").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StringSet {
    values: BTreeSet<String>,
    negated: bool,
}

impl StringSet {
    pub fn one(value: impl Into<String>) -> Self {
        Self { values: BTreeSet::from([value.into()]), negated: false }
    }

    pub fn excluding(values: impl IntoIterator<Item = String>) -> Self {
        Self { values: values.into_iter().collect(), negated: true }
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(String::as_str)
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    pub fn is_empty(&self) -> bool {
        !self.negated && self.values.is_empty()
    }

    pub fn intersect(&self, other: &StringSet) -> StringSet {
        match (self.negated, other.negated) {
            (false, false) => StringSet { values: self.values.intersection(&other.values).cloned().collect(), negated: false },
            (false, true) => StringSet { values: self.values.difference(&other.values).cloned().collect(), negated: false },
            (true, false) => StringSet { values: other.values.difference(&self.values).cloned().collect(), negated: false },
            (true, true) => StringSet { values: self.values.union(&other.values).cloned().collect(), negated: true },
        }
    }

    pub fn union(&self, other: &StringSet) -> StringSet {
        match (self.negated, other.negated) {
            (false, false) => StringSet { values: self.values.union(&other.values).cloned().collect(), negated: false },
            (false, true) => StringSet { values: other.values.difference(&self.values).cloned().collect(), negated: true },
            (true, false) => StringSet { values: self.values.difference(&other.values).cloned().collect(), negated: true },
            (true, true) => StringSet { values: self.values.intersection(&other.values).cloned().collect(), negated: true },
        }
    }

    pub fn complement(&self) -> StringSet {
        StringSet { values: self.values.clone(), negated: !self.negated }
    }

    pub fn minus(&self, other: &StringSet) -> StringSet {
        self.intersect(&other.complement())
    }
}

// --- Variables ---------------------------------------------------------------

/// An alpha variable over a symbolic feature.
///
/// `agree == false` is the disagreeing form (`-α`): it denotes the complement
/// of whatever the variable is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable {
    pub name: Arc<str>,
    pub agree: bool,
    pub universe: u64,
}

impl Variable {
    pub fn new(name: impl Into<Arc<str>>, agree: bool, universe: u64) -> Self {
        Self { name: name.into(), agree, universe }
    }

    /// The symbols this variable stands for under `bindings`, if bound.
    pub fn resolve(&self, bindings: &VariableBindings) -> Option<SymbolSet> {
        let mask = bindings.get(&self.name)?;
        let bits = if self.agree { mask } else { !mask };
        Some(SymbolSet::new(bits, self.universe))
    }

    /// Bind this variable so that it resolves to `observed`.
    pub fn bind_to(&self, observed: &SymbolSet, bindings: &mut VariableBindings) {
        let mask = if self.agree { observed.bits() } else { !observed.bits() & self.universe };
        bindings.bind(self.name.clone(), mask);
    }
}

// --- Feature values ----------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureValue {
    Symbolic(SymbolSet),
    Str(StringSet),
    Complex(FeatureStruct),
    Variable(Variable),
}

impl FeatureValue {
    /// Unify two values, extending `bindings` when a variable meets a concrete value.
    pub(crate) fn unify(&self, other: &FeatureValue, bindings: &mut VariableBindings) -> Option<FeatureValue> {
        use FeatureValue::*;
        match (self, other) {
            (Symbolic(a), Symbolic(b)) => {
                let set = a.intersect(b);
                (!set.is_empty()).then_some(Symbolic(set))
            }
            (Str(a), Str(b)) => {
                let set = a.intersect(b);
                (!set.is_empty()).then_some(Str(set))
            }
            (Complex(a), Complex(b)) => a.unify_in(b, bindings).map(Complex),
            (Variable(v), Symbolic(s)) | (Symbolic(s), Variable(v)) => match v.resolve(bindings) {
                Some(bound) => {
                    let set = bound.intersect(s);
                    (!set.is_empty()).then_some(Symbolic(set))
                }
                None => {
                    v.bind_to(s, bindings);
                    Some(Symbolic(*s))
                }
            },
            (Variable(a), Variable(b)) => match (a.resolve(bindings), b.resolve(bindings)) {
                (Some(x), Some(y)) => {
                    let set = x.intersect(&y);
                    (!set.is_empty()).then_some(Symbolic(set))
                }
                (Some(x), None) => {
                    b.bind_to(&x, bindings);
                    Some(Symbolic(x))
                }
                (None, Some(y)) => {
                    a.bind_to(&y, bindings);
                    Some(Symbolic(y))
                }
                (None, None) => Some(Variable(a.clone())),
            },
            _ => None,
        }
    }

    /// Combine the information of both values (set union for atomic values).
    pub(crate) fn union(&self, other: &FeatureValue) -> FeatureValue {
        use FeatureValue::*;
        match (self, other) {
            (Symbolic(a), Symbolic(b)) => Symbolic(a.union(b)),
            (Str(a), Str(b)) => Str(a.union(b)),
            (Complex(a), Complex(b)) => Complex(a.union(b)),
            _ => other.clone(),
        }
    }

    /// Remove `other`'s information; `None` when nothing is left.
    pub(crate) fn subtract(&self, other: &FeatureValue) -> Option<FeatureValue> {
        use FeatureValue::*;
        match (self, other) {
            (Symbolic(a), Symbolic(b)) => {
                let set = a.minus(b);
                (!set.is_empty()).then_some(Symbolic(set))
            }
            (Str(a), Str(b)) => {
                let set = a.minus(b);
                (!set.is_empty()).then_some(Str(set))
            }
            (Complex(a), Complex(b)) => {
                let rest = a.subtract(b);
                (!rest.is_empty()).then_some(Complex(rest))
            }
            (Variable(a), Variable(b)) if a == b => None,
            _ => Some(self.clone()),
        }
    }

    pub(crate) fn replace_variables(&self, bindings: &VariableBindings) -> FeatureValue {
        match self {
            FeatureValue::Variable(v) => match v.resolve(bindings) {
                Some(set) => FeatureValue::Symbolic(set),
                None => self.clone(),
            },
            FeatureValue::Complex(fs) => FeatureValue::Complex(fs.replace_variables(bindings)),
            _ => self.clone(),
        }
    }

    pub(crate) fn has_variables(&self) -> bool {
        match self {
            FeatureValue::Variable(_) => true,
            FeatureValue::Complex(fs) => fs.has_variables(),
            _ => false,
        }
    }
}
