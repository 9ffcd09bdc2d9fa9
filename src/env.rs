//! Binding environments: the per-compilation mapping from symbolic names to
//! values and deferred resource slots.
//!
//! An [`Environment`] is supplied by the rendering front-end for each
//! compilation request. Keys are the bare symbolic names used by the
//! templates (`voxValXform`, `imageTexture`, `texCoord`, ...); templates may
//! refer to them with a `param_` / `texture_` / `varying_` prefix, which the
//! expander strips after checking that the prefix agrees with the value's
//! resource kind.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// A value bound to a symbolic name for one compilation.
///
/// Scalars and vectors are compiled into the program text as literals.
/// Resource values are deferred: they allocate a hardware slot through the
/// symbol table, and the caller binds the actual texture object / parameter
/// value to that slot at render time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Compile-time boolean, used by `{% if %}` conditionals.
    Bool(bool),
    /// Numeric literal, substituted directly into the program text.
    Number(f64),
    /// Four-component vector literal, rendered as `{x, y, z, w}`.
    Vector([f64; 4]),
    /// Raw textual substitution, e.g. a register name at a call site.
    Word(String),
    /// Deferred hardware resource slot.
    Resource(ResourceRef),
}

/// A deferred resource slot. `slot` pins the allocation to a fixed index
/// (e.g. a texture that the renderer always binds on unit 0); `None` lets
/// the symbol table pick the next free slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResourceRef {
    Param {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        slot: Option<u32>,
    },
    Texture {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        slot: Option<u32>,
    },
    Varying {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        slot: Option<u32>,
    },
}

impl Value {
    /// Shorthand for an auto-allocated parameter slot.
    pub fn param() -> Self {
        Value::Resource(ResourceRef::Param { slot: None })
    }

    /// Shorthand for a texture pinned to `slot`.
    pub fn texture(slot: u32) -> Self {
        Value::Resource(ResourceRef::Texture { slot: Some(slot) })
    }

    /// Shorthand for an auto-allocated varying slot.
    pub fn varying() -> Self {
        Value::Resource(ResourceRef::Varying { slot: None })
    }

    pub fn word(text: impl Into<String>) -> Self {
        Value::Word(text.into())
    }

    /// Truthiness used by `{% if %}`: booleans are themselves, numbers are
    /// true when non-zero, words when non-empty, vectors and resource slots
    /// are always true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::Vector(_) => true,
            Value::Word(w) => !w.is_empty(),
            Value::Resource(_) => true,
        }
    }
}

/// Ordered name -> value mapping for one compilation request.
///
/// Iteration order is the key order, so two environments with the same
/// entries always behave identically regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Environment {
    entries: BTreeMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) -> &mut Self {
        self.entries.insert(name.into(), value);
        self
    }

    /// Builder-style variant of [`set`](Self::set).
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.entries.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Parse an environment from its JSON form, e.g.
    /// `{"invNumLabels": 0.1, "texture_is_2d": false,
    ///   "imageTexture": {"kind": "texture", "slot": 0}}`.
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("invalid environment json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_forms_round_trip() {
        let env = Environment::from_json_str(
            r#"{
                "invNumLabels": 0.1,
                "texture_is_2d": false,
                "outline": [0.0, 1.0, 2.0, 3.0],
                "texCoord": {"kind": "varying"},
                "imageTexture": {"kind": "texture", "slot": 0},
                "voxValXform": {"kind": "param"},
                "coordName": "fragTC"
            }"#,
        )
        .unwrap();

        assert_eq!(env.get("invNumLabels"), Some(&Value::Number(0.1)));
        assert_eq!(env.get("texture_is_2d"), Some(&Value::Bool(false)));
        assert_eq!(
            env.get("outline"),
            Some(&Value::Vector([0.0, 1.0, 2.0, 3.0]))
        );
        assert_eq!(env.get("texCoord"), Some(&Value::varying()));
        assert_eq!(env.get("imageTexture"), Some(&Value::texture(0)));
        assert_eq!(env.get("voxValXform"), Some(&Value::param()));
        assert_eq!(env.get("coordName"), Some(&Value::word("fragTC")));
    }

    #[test]
    fn truthiness() {
        assert!(Value::Bool(true).is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Number(0.5).is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(Value::Vector([0.0; 4]).is_truthy());
        assert!(Value::word("x").is_truthy());
        assert!(!Value::word("").is_truthy());
        assert!(Value::param().is_truthy());
    }

    #[test]
    fn iteration_order_is_insertion_independent() {
        let a = Environment::new()
            .with("b", Value::Bool(true))
            .with("a", Value::Number(1.0));
        let b = Environment::new()
            .with("a", Value::Number(1.0))
            .with("b", Value::Bool(true));
        assert_eq!(a, b);
        let keys: Vec<&str> = a.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
