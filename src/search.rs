//! Schema search
//!
//! Looks up types and fields by exact, substring or fuzzy match. Returns
//! `type name → matching field names` in model order.

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use indexmap::IndexMap;

use crate::model::SchemaModel;

/// Matching behavior
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchOptions {
    pub case_insensitive: bool,
    /// Whole-name match instead of substring match
    pub exact: bool,
    /// Skim-style fuzzy matching (overrides `exact`)
    pub fuzzy: bool,
}

/// Search the model for matching types and, optionally, fields.
///
/// With only `type_pattern`, every matching type maps to all its fields.
/// With `field_pattern`, only types containing a matching field appear.
pub fn search_schema(
    model: &SchemaModel,
    type_pattern: Option<&str>,
    field_pattern: Option<&str>,
    options: SearchOptions,
) -> IndexMap<String, Vec<String>> {
    let matcher = SkimMatcherV2::default();
    let matches = |name: &str, pattern: &str| -> bool {
        if options.fuzzy {
            return matcher.fuzzy_match(name, pattern).is_some();
        }
        let (name, pattern) = if options.case_insensitive {
            (name.to_lowercase(), pattern.to_lowercase())
        } else {
            (name.to_string(), pattern.to_string())
        };
        if options.exact {
            name == pattern
        } else {
            name.contains(&pattern)
        }
    };

    let mut results: IndexMap<String, Vec<String>> = IndexMap::new();
    for def in model.iter() {
        if let Some(pattern) = type_pattern {
            if !matches(&def.name, pattern) {
                continue;
            }
        }

        let field_names: Vec<String> = match field_pattern {
            Some(pattern) => def
                .fields
                .keys()
                .filter(|name| matches(name, pattern))
                .cloned()
                .collect(),
            None => def.fields.keys().cloned().collect(),
        };

        if field_pattern.is_some() && field_names.is_empty() {
            continue;
        }
        results.insert(def.name.clone(), field_names);
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldDefinition, TypeDefinition, TypeKind, TypeRef};

    fn model() -> SchemaModel {
        let mut model = SchemaModel::new();
        model.insert(
            TypeDefinition::new("Vehicle", TypeKind::Object)
                .with_field(FieldDefinition::new("averageSpeed", TypeRef::named("Float")))
                .with_field(FieldDefinition::new("vin", TypeRef::named("String"))),
        );
        model.insert(
            TypeDefinition::new("VehicleCabin", TypeKind::Object)
                .with_field(FieldDefinition::new("doorCount", TypeRef::named("Int"))),
        );
        model
    }

    #[test]
    fn test_partial_type_match() {
        let results = search_schema(&model(), Some("Vehicle"), None, SearchOptions::default());
        assert_eq!(results.len(), 2);
        assert_eq!(results["Vehicle"], vec!["averageSpeed", "vin"]);
    }

    #[test]
    fn test_exact_match() {
        let options = SearchOptions {
            exact: true,
            ..Default::default()
        };
        let results = search_schema(&model(), Some("Vehicle"), None, options);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_case_insensitive_field_search() {
        let options = SearchOptions {
            case_insensitive: true,
            ..Default::default()
        };
        let results = search_schema(&model(), None, Some("doorcount"), options);
        assert_eq!(results.len(), 1);
        assert_eq!(results["VehicleCabin"], vec!["doorCount"]);
    }

    #[test]
    fn test_fuzzy_search() {
        let options = SearchOptions {
            fuzzy: true,
            ..Default::default()
        };
        let results = search_schema(&model(), Some("vhcab"), None, options);
        assert!(results.contains_key("VehicleCabin"));
        assert!(!results.contains_key("Vehicle"));
    }
}
