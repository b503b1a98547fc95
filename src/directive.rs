//! Recognized directive vocabulary
//!
//! Directives are parsed into a closed tagged union with a fixed argument
//! struct per kind. Unknown directives are carried opaquely so the SDL
//! exporter can re-emit them, but nothing else interprets them.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};

/// A literal directive argument value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiteralValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl LiteralValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            LiteralValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            LiteralValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            LiteralValue::Int(n) => Some(*n as f64),
            LiteralValue::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Render the value as it appears in SDL source
    pub fn to_sdl(&self) -> String {
        match self {
            LiteralValue::String(s) => format!("{:?}", s),
            LiteralValue::Int(n) => n.to_string(),
            LiteralValue::Float(n) => n.to_string(),
            LiteralValue::Bool(b) => b.to_string(),
        }
    }
}

/// Closed set of numeric bounds shared by @range and @cardinality
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Min/max item counts for list fields
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Cardinality {
    pub min: Option<u64>,
    pub max: Option<u64>,
}

/// One attached directive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Directive {
    /// `@reference(source: "file.graphql")`, provenance
    Reference { source: String },
    /// `@instanceTag`, marks a classification-dimension object type
    InstanceTag,
    /// `@cardinality(min: Int, max: Int)`, list item counts
    Cardinality(Cardinality),
    /// `@range(min: Float, max: Float)`, numeric value bounds
    Range(Bounds),
    /// `@noDuplicates`, list behaves as a set
    NoDuplicates,
    /// `@metadata(comment: String, vssType: String)`
    Metadata {
        comment: Option<String>,
        vss_type: Option<String>,
    },
    /// `@deprecated(reason: String)`
    Deprecated { reason: Option<String> },
    /// Anything else: kept for re-emission, never interpreted
    Unknown {
        name: String,
        arguments: IndexMap<String, LiteralValue>,
    },
}

impl Directive {
    /// Build a directive from its SDL name and literal arguments.
    ///
    /// Recognized directives validate their argument schema here, so a
    /// malformed `@range` or `@cardinality` never reaches the pipeline.
    /// `element` is the type/field name used in error messages.
    pub fn from_parts(
        name: &str,
        arguments: IndexMap<String, LiteralValue>,
        element: &str,
    ) -> Result<Self> {
        let invalid = |message: String| SchemaError::InvalidDirective {
            element: element.to_string(),
            message,
        };

        match name {
            "reference" => {
                let source = arguments
                    .get("source")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| invalid("@reference requires a string 'source'".into()))?;
                Ok(Directive::Reference {
                    source: source.to_string(),
                })
            }
            "instanceTag" => {
                if !arguments.is_empty() {
                    return Err(invalid("@instanceTag takes no arguments".into()));
                }
                Ok(Directive::InstanceTag)
            }
            "cardinality" => {
                let min = match arguments.get("min") {
                    Some(v) => Some(v.as_i64().ok_or_else(|| {
                        invalid("@cardinality 'min' must be an integer".into())
                    })? as u64),
                    None => None,
                };
                let max = match arguments.get("max") {
                    Some(v) => Some(v.as_i64().ok_or_else(|| {
                        invalid("@cardinality 'max' must be an integer".into())
                    })? as u64),
                    None => None,
                };
                if let (Some(lo), Some(hi)) = (min, max) {
                    if lo > hi {
                        return Err(invalid(format!(
                            "@cardinality min {} exceeds max {}",
                            lo, hi
                        )));
                    }
                }
                Ok(Directive::Cardinality(Cardinality { min, max }))
            }
            "range" => {
                let min = match arguments.get("min") {
                    Some(v) => Some(
                        v.as_f64()
                            .ok_or_else(|| invalid("@range 'min' must be numeric".into()))?,
                    ),
                    None => None,
                };
                let max = match arguments.get("max") {
                    Some(v) => Some(
                        v.as_f64()
                            .ok_or_else(|| invalid("@range 'max' must be numeric".into()))?,
                    ),
                    None => None,
                };
                if let (Some(lo), Some(hi)) = (min, max) {
                    if lo > hi {
                        return Err(invalid(format!("@range min {} exceeds max {}", lo, hi)));
                    }
                }
                Ok(Directive::Range(Bounds { min, max }))
            }
            "noDuplicates" => Ok(Directive::NoDuplicates),
            "metadata" => Ok(Directive::Metadata {
                comment: arguments
                    .get("comment")
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
                vss_type: arguments
                    .get("vssType")
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
            }),
            "deprecated" => Ok(Directive::Deprecated {
                reason: arguments
                    .get("reason")
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
            }),
            _ => Ok(Directive::Unknown {
                name: name.to_string(),
                arguments,
            }),
        }
    }

    /// The directive name as it appears in SDL
    pub fn name(&self) -> &str {
        match self {
            Directive::Reference { .. } => "reference",
            Directive::InstanceTag => "instanceTag",
            Directive::Cardinality(_) => "cardinality",
            Directive::Range(_) => "range",
            Directive::NoDuplicates => "noDuplicates",
            Directive::Metadata { .. } => "metadata",
            Directive::Deprecated { .. } => "deprecated",
            Directive::Unknown { name, .. } => name,
        }
    }

    /// Render the directive back to SDL
    pub fn to_sdl(&self) -> String {
        fn fmt_args(pairs: Vec<(&str, String)>) -> String {
            if pairs.is_empty() {
                return String::new();
            }
            let body: Vec<String> = pairs
                .into_iter()
                .map(|(k, v)| format!("{}: {}", k, v))
                .collect();
            format!("({})", body.join(", "))
        }

        fn fmt_number(n: f64) -> String {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", n as i64)
            } else {
                n.to_string()
            }
        }

        match self {
            Directive::Reference { source } => {
                format!("@reference(source: {:?})", source)
            }
            Directive::InstanceTag => "@instanceTag".to_string(),
            Directive::Cardinality(c) => {
                let mut pairs = Vec::new();
                if let Some(min) = c.min {
                    pairs.push(("min", min.to_string()));
                }
                if let Some(max) = c.max {
                    pairs.push(("max", max.to_string()));
                }
                format!("@cardinality{}", fmt_args(pairs))
            }
            Directive::Range(b) => {
                let mut pairs = Vec::new();
                if let Some(min) = b.min {
                    pairs.push(("min", fmt_number(min)));
                }
                if let Some(max) = b.max {
                    pairs.push(("max", fmt_number(max)));
                }
                format!("@range{}", fmt_args(pairs))
            }
            Directive::NoDuplicates => "@noDuplicates".to_string(),
            Directive::Metadata { comment, vss_type } => {
                let mut pairs = Vec::new();
                if let Some(c) = comment {
                    pairs.push(("comment", format!("{:?}", c)));
                }
                if let Some(v) = vss_type {
                    pairs.push(("vssType", format!("{:?}", v)));
                }
                format!("@metadata{}", fmt_args(pairs))
            }
            Directive::Deprecated { reason } => {
                let mut pairs = Vec::new();
                if let Some(r) = reason {
                    pairs.push(("reason", format!("{:?}", r)));
                }
                format!("@deprecated{}", fmt_args(pairs))
            }
            Directive::Unknown { name, arguments } => {
                let pairs: Vec<(&str, String)> = arguments
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.to_sdl()))
                    .collect();
                format!("@{}{}", name, fmt_args(pairs))
            }
        }
    }
}

/// Ordered collection of directives attached to a schema element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectiveSet(Vec<Directive>);

impl DirectiveSet {
    pub fn new(directives: Vec<Directive>) -> Self {
        Self(directives)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Directive> {
        self.0.iter()
    }

    pub fn push(&mut self, directive: Directive) {
        self.0.push(directive);
    }

    pub fn has(&self, name: &str) -> bool {
        self.0.iter().any(|d| d.name() == name)
    }

    pub fn has_instance_tag(&self) -> bool {
        self.0.iter().any(|d| matches!(d, Directive::InstanceTag))
    }

    pub fn has_no_duplicates(&self) -> bool {
        self.0.iter().any(|d| matches!(d, Directive::NoDuplicates))
    }

    pub fn reference(&self) -> Option<&str> {
        self.0.iter().find_map(|d| match d {
            Directive::Reference { source } => Some(source.as_str()),
            _ => None,
        })
    }

    pub fn cardinality(&self) -> Option<Cardinality> {
        self.0.iter().find_map(|d| match d {
            Directive::Cardinality(c) => Some(*c),
            _ => None,
        })
    }

    pub fn range(&self) -> Option<Bounds> {
        self.0.iter().find_map(|d| match d {
            Directive::Range(b) => Some(*b),
            _ => None,
        })
    }

    pub fn metadata(&self) -> Option<(Option<&str>, Option<&str>)> {
        self.0.iter().find_map(|d| match d {
            Directive::Metadata { comment, vss_type } => {
                Some((comment.as_deref(), vss_type.as_deref()))
            }
            _ => None,
        })
    }
}
