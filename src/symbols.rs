//! Character definition tables: text ⇄ shape.
//!
//! Segmentation is longest-match over the declared symbol inventory. The
//! inventory is compiled into a single anchored alternation with the longest
//! symbols first, so `"aː"` wins over `"a"` at the same position.
//!
//! Symbols and input text are both brought to NFD first, so a precomposed
//! `ã` and `a` followed by a combining tilde spell the same segment.

use crate::error::{FeatureError, MorphError};
use crate::feature::{FeatureStruct, FeatureSystem};
use crate::shape::{NodeKind, Shape, ShapeNode};
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use unicode_normalization::UnicodeNormalization;

fn nfd(text: &str) -> String {
    text.nfd().collect()
}

/// Conversion between surface text and shapes.
pub trait SymbolTable {
    fn string_to_shape(&self, text: &str) -> Result<Shape, MorphError>;

    /// Render a shape. Boundaries are written only when `include_boundaries`;
    /// optional nodes are dropped when `skip_optional`.
    fn shape_to_string(&self, shape: &Shape, include_boundaries: bool, skip_optional: bool) -> String;

    /// Whether `surface` spells `shape`, comparing segment by segment.
    fn is_match(&self, surface: &str, shape: &Shape) -> bool;
}

#[derive(Debug, Clone)]
struct SymbolDef {
    symbol: String,
    kind: NodeKind,
    fs: FeatureStruct,
}

#[derive(Debug, Clone)]
pub struct CharacterDefinitionTable {
    symbols: Vec<SymbolDef>,
    by_symbol: HashMap<String, usize>,
    matcher: Regex,
}

pub struct CharacterDefinitionTableBuilder {
    system: Arc<FeatureSystem>,
    entries: Vec<(String, NodeKind, String)>,
}

impl CharacterDefinitionTableBuilder {
    pub fn segment(mut self, symbol: &str, notation: &str) -> Self {
        self.entries.push((symbol.to_string(), NodeKind::Segment, notation.to_string()));
        self
    }

    pub fn boundary(mut self, symbol: &str) -> Self {
        self.entries.push((symbol.to_string(), NodeKind::Boundary, String::new()));
        self
    }

    pub fn build(self) -> Result<CharacterDefinitionTable, FeatureError> {
        let mut symbols = Vec::with_capacity(self.entries.len());
        let mut by_symbol = HashMap::new();
        for (symbol, kind, notation) in self.entries {
            let symbol = nfd(&symbol);
            if symbol.is_empty() {
                return Err(FeatureError::BadNotation("empty symbol".to_string()));
            }
            if by_symbol.contains_key(&symbol) {
                return Err(FeatureError::BadNotation(format!("duplicate symbol '{symbol}'")));
            }
            let fs = self.system.parse(&notation)?;
            by_symbol.insert(symbol.clone(), symbols.len());
            symbols.push(SymbolDef { symbol, kind, fs });
        }

        let mut alternatives: Vec<&str> = symbols.iter().map(|s| s.symbol.as_str()).collect();
        alternatives.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let escaped: Vec<String> = alternatives.iter().map(|s| regex::escape(s)).collect();
        let matcher = Regex::new(&format!("^(?:{})", escaped.join("|")))
            .map_err(|e| FeatureError::BadNotation(e.to_string()))?;

        tracing::debug!(symbols = symbols.len(), "character definition table built");
        Ok(CharacterDefinitionTable { symbols, by_symbol, matcher })
    }
}

impl CharacterDefinitionTable {
    pub fn builder(system: Arc<FeatureSystem>) -> CharacterDefinitionTableBuilder {
        CharacterDefinitionTableBuilder { system, entries: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Feature structure declared for `symbol`.
    pub fn features(&self, symbol: &str) -> Option<&FeatureStruct> {
        self.by_symbol.get(&nfd(symbol)).map(|&i| &self.symbols[i].fs)
    }

    /// Node for a single declared symbol.
    pub fn node(&self, symbol: &str) -> Option<ShapeNode> {
        let def = &self.symbols[*self.by_symbol.get(&nfd(symbol))?];
        Some(match def.kind {
            NodeKind::Boundary => ShapeNode::boundary(def.fs.clone()),
            _ => ShapeNode::segment(def.fs.clone()),
        })
    }

    /// Symbol for a node: an exact match if there is one, otherwise the most
    /// specific symbol the node unifies with.
    fn symbol_for(&self, node: &ShapeNode) -> Option<&str> {
        let same_kind = || self.symbols.iter().filter(|s| s.kind == node.kind);
        if let Some(exact) = same_kind().find(|s| s.fs == node.fs) {
            return Some(&exact.symbol);
        }
        same_kind().filter(|s| s.fs.is_unifiable(&node.fs)).max_by_key(|s| s.fs.len()).map(|s| s.symbol.as_str())
    }
}

impl SymbolTable for CharacterDefinitionTable {
    /// Positions in errors are byte offsets into the NFD form of `text`.
    fn string_to_shape(&self, text: &str) -> Result<Shape, MorphError> {
        let text = nfd(text);
        let text = text.as_str();
        let mut shape = Shape::new();
        let mut pos = 0;
        while pos < text.len() {
            let Some(m) = self.matcher.find(&text[pos..]) else {
                return Err(MorphError::InvalidShape { text: text.to_string(), position: pos });
            };
            // The alternation holds no empty symbols, so every match advances.
            let node = self.node(m.as_str()).ok_or_else(|| MorphError::InvalidShape { text: text.to_string(), position: pos })?;
            shape.push(node);
            pos += m.end();
        }
        Ok(shape)
    }

    fn shape_to_string(&self, shape: &Shape, include_boundaries: bool, skip_optional: bool) -> String {
        let mut out = String::new();
        for node in shape.nodes() {
            if skip_optional && node.is_optional() {
                continue;
            }
            if node.kind == NodeKind::Boundary && !include_boundaries {
                continue;
            }
            out.push_str(self.symbol_for(node).unwrap_or("?"));
        }
        out
    }

    fn is_match(&self, surface: &str, shape: &Shape) -> bool {
        let Ok(expected) = self.string_to_shape(surface) else {
            return false;
        };
        let segments = |s: &Shape| -> Vec<FeatureStruct> {
            s.nodes().filter(|n| n.kind == NodeKind::Segment && !n.is_optional()).map(|n| n.fs.clone()).collect()
        };
        let (want, got) = (segments(&expected), segments(shape));
        want.len() == got.len() && want.iter().zip(&got).all(|(a, b)| a.is_unifiable(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CharacterDefinitionTable {
        let sys = FeatureSystem::builder().binary("cons").binary("syl").binary("long").binary("voice").build().unwrap();
        CharacterDefinitionTable::builder(sys)
            .segment("a", "-cons +syl -long")
            .segment("aː", "-cons +syl +long")
            .segment("t", "+cons -syl -voice")
            .segment("d", "+cons -syl +voice")
            .boundary("+")
            .build()
            .unwrap()
    }

    #[test]
    fn segmentation_prefers_the_longest_symbol() {
        let table = table();
        let shape = table.string_to_shape("taːd").unwrap();
        assert_eq!(shape.len(), 3);
        assert_eq!(table.shape_to_string(&shape, true, false), "taːd");
    }

    #[test]
    fn unknown_characters_report_their_position() {
        let err = table().string_to_shape("tax").unwrap_err();
        assert_eq!(err, MorphError::InvalidShape { text: "tax".to_string(), position: 2 });
    }

    #[test]
    fn boundaries_and_optional_nodes_can_be_hidden() {
        let table = table();
        let mut shape = table.string_to_shape("ta+d").unwrap();
        assert_eq!(table.shape_to_string(&shape, false, false), "tad");
        let last = shape.last();
        shape.node_mut(last).flags.insert(crate::shape::NodeFlags::OPTIONAL);
        assert_eq!(table.shape_to_string(&shape, true, true), "ta+");
    }

    #[test]
    fn nodes_without_an_exact_symbol_render_as_the_closest_one() {
        let table = table();
        let t = table.features("t").unwrap().clone();
        let long = table.features("aː").unwrap().iter().last().map(|(id, v)| (id, v.clone())).unwrap();
        let mut shape = Shape::new();
        shape.push(ShapeNode::segment(t.with(long.0, long.1)));
        assert_eq!(table.shape_to_string(&shape, false, false), "t");
    }

    #[test]
    fn composed_and_decomposed_spellings_are_the_same_segment() {
        let sys = FeatureSystem::builder().binary("cons").binary("nasal").build().unwrap();
        let table = CharacterDefinitionTable::builder(sys)
            .segment("\u{e3}", "-cons +nasal")
            .segment("a", "-cons -nasal")
            .segment("t", "+cons -nasal")
            .build()
            .unwrap();
        let composed = table.string_to_shape("t\u{e3}").unwrap();
        let decomposed = table.string_to_shape("ta\u{303}").unwrap();
        assert_eq!(composed.key(), decomposed.key());
        assert_eq!(composed.len(), 2);
        assert!(table.is_match("ta\u{303}", &composed));
        assert!(table.is_match("t\u{e3}", &decomposed));
        assert!(table.features("a\u{303}").is_some());
    }

    #[test]
    fn surface_matching_ignores_boundaries() {
        let table = table();
        let shape = table.string_to_shape("ta+d").unwrap();
        assert!(table.is_match("tad", &shape));
        assert!(!table.is_match("taːd", &shape));
    }
}
