//! Feature structures and the feature registry.
//!
//! Every segment, rule constraint and syntactic description in the engine is a
//! [`FeatureStruct`]: a mapping from features to values, where a value is a
//! symbol set, a string set, a nested structure, or an alpha variable.
//!
//! ```text
//! FeatureSystem (Arc, read-only)
//!   ├─ voice: {+, -}
//!   ├─ place: {labial, coronal, dorsal}
//!   └─ agr:   complex
//!
//! FeatureStruct  [+cons -voice place=labial|coronal]
//!                  │
//!                  ├─ unify            intersection, binds variables
//!                  ├─ union            per-feature set union (analysis merge)
//!                  ├─ subtract         drop the other side's values
//!                  └─ priority_union   overwrite (synthesis feature change)
//! ```
//!
//! Operations never mutate their inputs. Variables are resolved through a
//! [`VariableBindings`] environment that lives for one match attempt.

#[path = "feature/bindings.rs"]
mod bindings;
#[path = "feature/structure.rs"]
mod structure;
#[path = "feature/system.rs"]
mod system;
#[path = "feature/value.rs"]
mod value;

pub use bindings::VariableBindings;
pub use structure::FeatureStruct;
pub use system::{FeatureDef, FeatureId, FeatureKind, FeatureSystem, FeatureSystemBuilder};
pub use value::{FeatureValue, StringSet, SymbolSet, Variable};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FeatureError;
    use std::sync::Arc;

    fn system() -> Arc<FeatureSystem> {
        FeatureSystem::builder()
            .binary("cons")
            .binary("voice")
            .binary("long")
            .symbolic("place", &["labial", "coronal", "dorsal"])
            .string("gloss")
            .complex("agr")
            .symbolic("num", &["sg", "pl"])
            .build()
            .unwrap()
    }

    #[test]
    fn unification_is_commutative() {
        let sys = system();
        let pairs = [
            ("+cons place=labial|coronal", "-voice place=coronal|dorsal"),
            ("+cons", "+cons +long"),
            ("agr.num=sg gloss=\"dog\"", "agr.num=sg|pl"),
            ("gloss!=\"cat\"", "gloss=\"dog\""),
        ];
        for (a, b) in pairs {
            let a = sys.parse(a).unwrap();
            let b = sys.parse(b).unwrap();
            let ab = a.unify(&b, &mut VariableBindings::new());
            let ba = b.unify(&a, &mut VariableBindings::new());
            assert!(ab.is_some(), "{a:?} and {b:?} should unify");
            assert_eq!(ab, ba);
        }
    }

    #[test]
    fn unification_fails_on_atomic_disagreement() {
        let sys = system();
        let a = sys.parse("+cons +voice").unwrap();
        let b = sys.parse("+cons -voice").unwrap();
        assert!(a.unify(&b, &mut VariableBindings::new()).is_none());
        assert!(!sys.parse("agr.num=sg").unwrap().is_unifiable(&sys.parse("agr.num=pl").unwrap()));
        assert!(!sys.parse("gloss=\"a\"").unwrap().is_unifiable(&sys.parse("gloss=\"b\"").unwrap()));
    }

    #[test]
    fn variables_bind_and_agree() {
        let sys = system();
        let constraint = sys.parse("+cons @a:voice").unwrap();
        let node = sys.parse("+cons -voice place=labial").unwrap();
        let mut bindings = VariableBindings::new();
        assert!(constraint.unify(&node, &mut bindings).is_some());
        assert!(bindings.is_bound("a"));

        let agree = sys.parse("@a:voice").unwrap();
        let disagree = sys.parse("-@a:voice").unwrap();
        assert_eq!(agree.replace_variables(&bindings), sys.parse("-voice").unwrap());
        assert_eq!(disagree.replace_variables(&bindings), sys.parse("+voice").unwrap());
        assert!(agree.unify(&sys.parse("+voice").unwrap(), &mut bindings.clone()).is_none());
    }

    #[test]
    fn failed_unification_leaves_bindings_untouched() {
        let sys = system();
        let constraint = sys.parse("@a:voice +long").unwrap();
        let node = sys.parse("+voice -long").unwrap();
        let mut bindings = VariableBindings::new();
        assert!(constraint.unify(&node, &mut bindings).is_none());
        assert!(bindings.is_empty());
    }

    #[test]
    fn union_subtract_and_priority_union() {
        let sys = system();
        let node = sys.parse("+cons -voice +long").unwrap();
        assert_eq!(node.union(&sys.parse("+voice").unwrap()), sys.parse("+cons voice=+|- +long").unwrap());
        assert_eq!(node.subtract(&sys.parse("+long -voice").unwrap()), sys.parse("+cons").unwrap());
        assert_eq!(node.priority_union(&sys.parse("+voice").unwrap()), sys.parse("+cons +voice +long").unwrap());
    }

    #[test]
    fn notation_round_trips_through_display() {
        let sys = system();
        let fs = sys.parse("+cons place=labial|coronal agr.num=pl -@a:voice").unwrap();
        assert_eq!(sys.parse(&fs.to_notation(&sys)).unwrap(), fs);
    }

    #[test]
    fn builder_reports_first_error() {
        let err = FeatureSystem::builder().binary("voice").binary("voice").build().unwrap_err();
        assert_eq!(err, FeatureError::DuplicateFeature("voice".into()));
        let err = FeatureSystem::builder().binary("9voice").build().unwrap_err();
        assert!(matches!(err, FeatureError::InvalidIdentifier(_)));
        let sys = system();
        assert!(matches!(sys.parse("+nasal"), Err(FeatureError::UnknownFeature(_))));
        assert!(matches!(sys.parse("place=uvular"), Err(FeatureError::UnknownSymbol { .. })));
        assert!(matches!(sys.parse("%%"), Err(FeatureError::BadNotation(_))));
    }
}
