// SPDX-License-Identifier: GPL-3.0-or-later

//! Structural type descriptors, supplied by the diagram model and consumed
//! by declaration emission and initializer decomposition.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeDescriptor {
    /// A canonical scalar type name ("int", "double", "string", "boolean", ...)
    Scalar(String),
    Array {
        #[serde(default)]
        element: Option<Box<TypeDescriptor>>,
        /// One entry per dimension; unknown bounds stay `None`.
        #[serde(default)]
        dimensions: Vec<Dimension>,
    },
    Record {
        /// Ordered: decomposition relies on component order.
        components: Vec<Component>,
    },
    Enum {
        values: Vec<EnumValue>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    #[serde(default)]
    pub min: Option<i64>,
    #[serde(default)]
    pub max: Option<i64>,
}

impl Dimension {
    /// Number of entries, if both bounds are known.
    pub fn size(&self) -> Option<i64> {
        match (self.min, self.max) {
            (Some(min), Some(max)) if max >= min => Some(max - min + 1),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    #[serde(rename = "type")]
    pub descriptor: TypeDescriptor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValue {
    pub name: String,
    #[serde(default)]
    pub ordinal: Option<i64>,
}

/// Variable/type name to descriptor mapping for one diagram.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeMap {
    #[serde(with = "serde_yaml::with::singleton_map_recursive")]
    entries: HashMap<String, TypeDescriptor>,
}

impl TypeMap {
    pub fn new(entries: HashMap<String, TypeDescriptor>) -> Self {
        Self { entries }
    }

    pub fn lookup(&self, name: &str) -> Option<&TypeDescriptor> {
        self.entries.get(name)
    }
}

/// Result of the for-each item type guess. Fallback priority: integer,
/// real, string, common declared type, generic placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferredType {
    Integer,
    Real,
    Text,
    /// All items share one declared scalar type.
    Common(String),
    /// No uniform guess; back ends use their untyped placeholder and flag it.
    Generic,
}

impl InferredType {
    pub fn is_generic(&self) -> bool {
        matches!(self, InferredType::Generic)
    }
}

fn is_integer(item: &str) -> bool {
    item.parse::<i64>().is_ok()
}

fn is_real(item: &str) -> bool {
    item.parse::<f64>().is_ok()
}

fn is_text(item: &str) -> bool {
    (item.starts_with('"') && item.ends_with('"') && item.len() >= 2)
        || (item.starts_with('\'') && item.ends_with('\'') && item.len() >= 2)
}

/// Guess a uniform element type for an explicit for-each value list.
///
/// Every item is compared against every other (a fold to a common type), so
/// a mismatch between items 2 and 3 degrades to `Generic` even when item 1
/// happens to match both.
pub fn infer_item_type(items: &[String], types: &TypeMap) -> InferredType {
    if items.is_empty() {
        return InferredType::Generic;
    }
    let items: Vec<&str> = items.iter().map(|i| i.trim()).collect();
    if items.iter().all(|i| is_integer(i)) {
        return InferredType::Integer;
    }
    if items.iter().all(|i| is_real(i)) {
        return InferredType::Real;
    }
    if items.iter().all(|i| is_text(i)) {
        return InferredType::Text;
    }
    // Declared variables with one shared scalar type
    let mut common: Option<&str> = None;
    for item in &items {
        match types.lookup(item) {
            Some(TypeDescriptor::Scalar(name)) => match common {
                None => common = Some(name),
                Some(c) if c == name => (),
                Some(_) => return InferredType::Generic,
            },
            _ => return InferredType::Generic,
        }
    }
    match common {
        Some(name) => InferredType::Common(name.to_string()),
        None => InferredType::Generic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn it_infers_item_types_in_priority_order() {
        let types = TypeMap::default();
        assert_eq!(
            infer_item_type(&strings(&["1", "2", "3"]), &types),
            InferredType::Integer
        );
        assert_eq!(
            infer_item_type(&strings(&["1", "2.5"]), &types),
            InferredType::Real
        );
        assert_eq!(
            infer_item_type(&strings(&["\"a\"", "\"b\""]), &types),
            InferredType::Text
        );
        assert_eq!(
            infer_item_type(&strings(&["1", "\"b\""]), &types),
            InferredType::Generic
        );
    }

    #[test]
    fn it_detects_divergence_after_the_first_item() {
        let mut entries = HashMap::new();
        entries.insert("a".to_string(), TypeDescriptor::Scalar("int".to_string()));
        entries.insert("b".to_string(), TypeDescriptor::Scalar("int".to_string()));
        entries.insert(
            "c".to_string(),
            TypeDescriptor::Scalar("string".to_string()),
        );
        let types = TypeMap::new(entries);
        assert_eq!(
            infer_item_type(&strings(&["a", "b"]), &types),
            InferredType::Common("int".to_string())
        );
        // item 2 vs item 3 mismatch must not be reported as "common"
        assert_eq!(
            infer_item_type(&strings(&["a", "b", "c"]), &types),
            InferredType::Generic
        );
    }

    #[test]
    fn it_sizes_dimensions() {
        assert_eq!(Dimension { min: Some(1), max: Some(10) }.size(), Some(10));
        assert_eq!(Dimension { min: Some(0), max: None }.size(), None);
    }
}
