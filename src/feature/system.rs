use super::structure::FeatureStruct;
use super::value::{FeatureValue, StringSet, SymbolSet, Variable};
use crate::error::FeatureError;
use std::collections::HashMap;
use std::sync::Arc;

/// Index of a feature inside its [`FeatureSystem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureId(pub u16);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureKind {
    /// Closed inventory of symbols (at most 64).
    Symbolic { symbols: Vec<String> },
    /// Open string values.
    Str,
    /// Nested feature structure.
    Complex,
}

#[derive(Debug, Clone)]
pub struct FeatureDef {
    pub id: FeatureId,
    pub name: String,
    pub kind: FeatureKind,
}

/// The registry of legal features and their symbols.
///
/// Built once through [`FeatureSystem::builder`] and shared read-only behind an
/// `Arc` afterwards.
#[derive(Debug)]
pub struct FeatureSystem {
    features: Vec<FeatureDef>,
    by_name: HashMap<String, FeatureId>,
}

/// Collects feature declarations; the first invalid declaration is reported by [`build`](Self::build).
#[derive(Debug, Default)]
pub struct FeatureSystemBuilder {
    features: Vec<FeatureDef>,
    by_name: HashMap<String, FeatureId>,
    error: Option<FeatureError>,
}

impl FeatureSystemBuilder {
    /// Declare a symbolic feature.
    pub fn symbolic(mut self, name: &str, symbols: &[&str]) -> Self {
        if symbols.len() > 64 {
            self.fail(FeatureError::TooManySymbols { feature: name.to_string(), count: symbols.len() });
            return self;
        }
        let kind = FeatureKind::Symbolic { symbols: symbols.iter().map(|s| s.to_string()).collect() };
        self.declare(name, kind)
    }

    /// Declare a `+`/`-` feature.
    pub fn binary(self, name: &str) -> Self {
        self.symbolic(name, &["+", "-"])
    }

    pub fn string(self, name: &str) -> Self {
        self.declare(name, FeatureKind::Str)
    }

    pub fn complex(self, name: &str) -> Self {
        self.declare(name, FeatureKind::Complex)
    }

    fn declare(mut self, name: &str, kind: FeatureKind) -> Self {
        if !regex!(r"^[A-Za-z_][A-Za-z0-9_]*$").is_match(name) {
            self.fail(FeatureError::InvalidIdentifier(name.to_string()));
            return self;
        }
        if self.by_name.contains_key(name) {
            self.fail(FeatureError::DuplicateFeature(name.to_string()));
            return self;
        }
        let id = FeatureId(self.features.len() as u16);
        self.by_name.insert(name.to_string(), id);
        self.features.push(FeatureDef { id, name: name.to_string(), kind });
        self
    }

    fn fail(&mut self, err: FeatureError) {
        self.error.get_or_insert(err);
    }

    pub fn build(self) -> Result<Arc<FeatureSystem>, FeatureError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(Arc::new(FeatureSystem { features: self.features, by_name: self.by_name })),
        }
    }
}

impl FeatureSystem {
    pub fn builder() -> FeatureSystemBuilder {
        FeatureSystemBuilder::default()
    }

    pub fn features(&self) -> &[FeatureDef] {
        &self.features
    }

    pub fn id(&self, name: &str) -> Result<FeatureId, FeatureError> {
        self.by_name.get(name).copied().ok_or_else(|| FeatureError::UnknownFeature(name.to_string()))
    }

    pub fn name(&self, id: FeatureId) -> &str {
        &self.features[id.0 as usize].name
    }

    pub fn kind(&self, id: FeatureId) -> &FeatureKind {
        &self.features[id.0 as usize].kind
    }

    /// Mask with one bit per declared symbol of a symbolic feature.
    pub fn universe(&self, id: FeatureId) -> u64 {
        match self.kind(id) {
            FeatureKind::Symbolic { symbols } if symbols.len() == 64 => u64::MAX,
            FeatureKind::Symbolic { symbols } => (1u64 << symbols.len()) - 1,
            _ => 0,
        }
    }

    pub fn symbol_names(&self, id: FeatureId, bits: u64) -> Vec<&str> {
        match self.kind(id) {
            FeatureKind::Symbolic { symbols } => symbols
                .iter()
                .enumerate()
                .filter(|(i, _)| bits & (1u64 << i) != 0)
                .map(|(_, s)| s.as_str())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Symbolic value holding the named symbols of `feature`.
    pub fn symbols(&self, feature: &str, names: &[&str]) -> Result<FeatureValue, FeatureError> {
        let id = self.id(feature)?;
        let FeatureKind::Symbolic { symbols } = self.kind(id) else {
            return Err(FeatureError::NotSymbolic(feature.to_string()));
        };
        let mut bits = 0u64;
        for name in names {
            let pos = symbols.iter().position(|s| s == name).ok_or_else(|| FeatureError::UnknownSymbol {
                feature: feature.to_string(),
                symbol: name.to_string(),
            })?;
            bits |= 1u64 << pos;
        }
        Ok(FeatureValue::Symbolic(SymbolSet::new(bits, self.universe(id))))
    }

    /// Parse bracketed feature notation.
    ///
    /// ```text
    /// [+cons -voice]            binary features
    /// place=labial|coronal      symbol sets; `!=` for the complement
    /// gloss="dog"               string values; `!=` excludes
    /// agr.num=pl                paths into complex features
    /// @a:voice  -@a:voice       agreeing / disagreeing variables
    /// ```
    pub fn parse(&self, notation: &str) -> Result<FeatureStruct, FeatureError> {
        let body = notation.trim().trim_start_matches('[').trim_end_matches(']');
        let mut fs = FeatureStruct::new();
        for item in body.split_whitespace() {
            let (path, value) = self.parse_item(item)?;
            fs = self.set_path(fs, &path, value)?;
        }
        Ok(fs)
    }

    fn parse_item(&self, item: &str) -> Result<(Vec<FeatureId>, FeatureValue), FeatureError> {
        let binary = regex!(r"^([+-])([A-Za-z_][A-Za-z0-9_.]*)$");
        let variable = regex!(r"^(-?)@([A-Za-z_][A-Za-z0-9_]*):([A-Za-z_][A-Za-z0-9_.]*)$");
        let string = regex!(r#"^([A-Za-z_][A-Za-z0-9_.]*)(!?=)"([^"]*)"$"#);
        let symbols = regex!(r"^([A-Za-z_][A-Za-z0-9_.]*)(!?=)([^\s|]+(?:\|[^\s|]+)*)$");

        if let Some(caps) = binary.captures(item) {
            let path = self.resolve_path(&caps[2])?;
            let leaf = self.name(path[path.len() - 1]).to_string();
            let value = self.symbols(&leaf, &[&caps[1]])?;
            return Ok((path, value));
        }
        if let Some(caps) = variable.captures(item) {
            let path = self.resolve_path(&caps[3])?;
            let leaf = path[path.len() - 1];
            if !matches!(self.kind(leaf), FeatureKind::Symbolic { .. }) {
                return Err(FeatureError::NotSymbolic(self.name(leaf).to_string()));
            }
            let var = Variable::new(&caps[2], caps[1].is_empty(), self.universe(leaf));
            return Ok((path, FeatureValue::Variable(var)));
        }
        if let Some(caps) = string.captures(item) {
            let path = self.resolve_path(&caps[1])?;
            let set = if &caps[2] == "=" {
                StringSet::one(&caps[3])
            } else {
                StringSet::excluding([caps[3].to_string()])
            };
            return Ok((path, FeatureValue::Str(set)));
        }
        if let Some(caps) = symbols.captures(item) {
            let path = self.resolve_path(&caps[1])?;
            let leaf = self.name(path[path.len() - 1]).to_string();
            let names: Vec<&str> = caps[3].split('|').collect();
            let mut value = self.symbols(&leaf, &names)?;
            if &caps[2] == "!=" {
                if let FeatureValue::Symbolic(set) = value {
                    value = FeatureValue::Symbolic(set.complement());
                }
            }
            return Ok((path, value));
        }
        Err(FeatureError::BadNotation(item.to_string()))
    }

    fn resolve_path(&self, dotted: &str) -> Result<Vec<FeatureId>, FeatureError> {
        let path = dotted.split('.').map(|name| self.id(name)).collect::<Result<Vec<_>, _>>()?;
        for id in &path[..path.len() - 1] {
            if *self.kind(*id) != FeatureKind::Complex {
                return Err(FeatureError::BadNotation(dotted.to_string()));
            }
        }
        Ok(path)
    }

    fn set_path(&self, mut fs: FeatureStruct, path: &[FeatureId], value: FeatureValue) -> Result<FeatureStruct, FeatureError> {
        match path {
            [] => Ok(fs),
            [leaf] => {
                fs.set(*leaf, value);
                Ok(fs)
            }
            [head, rest @ ..] => {
                let inner = match fs.get(*head) {
                    Some(FeatureValue::Complex(inner)) => inner.clone(),
                    _ => FeatureStruct::new(),
                };
                let inner = self.set_path(inner, rest, value)?;
                fs.set(*head, FeatureValue::Complex(inner));
                Ok(fs)
            }
        }
    }
}
