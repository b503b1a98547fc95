//! Fragment composition
//!
//! Merges an ordered list of schema fragments into one model and runs the
//! configured transformation stages in their one valid order:
//! merge → naming → selection filter → root filter → expansion.
//! Filtering before expansion would prune the marker types the expander
//! still needs; expanding before filtering would filter synthetic names
//! that no selection document can mention.

pub mod expand;
pub mod naming;
pub mod rootfilter;
pub mod selection;

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::builtin::{builtin_fragment, BUILTIN_LABEL};
use crate::directive::Directive;
use crate::error::{Result, SchemaError};
use crate::model::{FieldDefinition, SchemaModel, TypeDefinition, TypeKind, TypeRef};
use crate::parser::Fragment;

pub use expand::{expand_instances, ExpandedField, ExpansionMeta};
pub use naming::{apply_naming, CaseFormat, NamingConfig};
pub use rootfilter::apply_root_filter;
pub use selection::{apply_selection, parse_selection_document, SelectionDocument};

/// Configuration for one composition run
#[derive(Debug, Default)]
pub struct ComposeOptions {
    /// Apply this naming convention after merging
    pub naming: Option<NamingConfig>,
    /// Prune to this selection document
    pub selection: Option<SelectionDocument>,
    /// Prune to the closure of this root type
    pub root_type: Option<String>,
    /// Expand instance-tagged list fields
    pub expand_instances: bool,
}

/// Result of composition: the model plus expansion metadata
#[derive(Debug)]
pub struct Composed {
    pub model: SchemaModel,
    pub expansion: ExpansionMeta,
}

/// Compose user fragments (the built-in spec fragment is merged first).
pub fn compose(fragments: &[Fragment], options: &ComposeOptions) -> Result<Composed> {
    let builtin = builtin_fragment()?;
    let common: HashSet<String> = builtin.types.iter().map(|t| t.name.clone()).collect();

    let mut model = SchemaModel::new();
    let mut origins: HashMap<String, String> = HashMap::new();

    for fragment in std::iter::once(&builtin).chain(fragments.iter()) {
        merge_fragment(&mut model, &mut origins, fragment, &common)?;
    }
    info!(
        fragments = fragments.len() + 1,
        types = model.len(),
        "merged schema fragments"
    );

    ensure_query(&mut model);
    model.resolve_references()?;

    if let Some(config) = &options.naming {
        apply_naming(&mut model, config)?;
        debug!("applied naming convention");
    }

    if let Some(document) = &options.selection {
        apply_selection(&mut model, document, options.expand_instances)?;
    }

    if let Some(root) = &options.root_type {
        // The selection filter may have renamed the root operation type;
        // the root filter applies to whatever name the caller asked for.
        apply_root_filter(&mut model, root, options.expand_instances)?;
    }

    let expansion = if options.expand_instances {
        expand_instances(&mut model, options.naming.as_ref())?
    } else {
        ExpansionMeta::default()
    };

    model.resolve_references()?;
    Ok(Composed { model, expansion })
}

fn merge_fragment(
    model: &mut SchemaModel,
    origins: &mut HashMap<String, String>,
    fragment: &Fragment,
    common: &HashSet<String>,
) -> Result<()> {
    for def in &fragment.types {
        if let Some(first) = origins.get(&def.name) {
            if common.contains(&def.name) {
                warn!(
                    name = %def.name,
                    first = %first,
                    duplicate = %fragment.label,
                    "ignoring duplicate of a common type"
                );
                continue;
            }
            return Err(SchemaError::DuplicateType {
                name: def.name.clone(),
                first: first.clone(),
                second: fragment.label.clone(),
            });
        }

        let mut def = def.clone();
        if def.directives.reference().is_none() {
            def.directives.push(Directive::Reference {
                source: fragment.label.clone(),
            });
        }
        origins.insert(def.name.clone(), fragment.label.clone());
        model.insert(def);
    }
    Ok(())
}

/// Add a generic root type when the fragments declare none, so the
/// selection filter always has something to anchor on.
fn ensure_query(model: &mut SchemaModel) {
    if model.contains("Query") {
        return;
    }
    let mut query = TypeDefinition::new("Query", TypeKind::Object)
        .with_field(FieldDefinition::new("ping", TypeRef::named("String")));
    query.directives.push(Directive::Reference {
        source: BUILTIN_LABEL.to_string(),
    });
    model.insert(query);
    debug!("added generic Query type");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_fragment;

    #[test]
    fn test_duplicate_type_names_both_fragments() {
        let a = parse_fragment("a.graphql", "type Vehicle { speed: Float }").unwrap();
        let b = parse_fragment("b.graphql", "type Vehicle { mass: Float }").unwrap();
        let err = compose(&[a, b], &ComposeOptions::default()).unwrap_err();
        match err {
            SchemaError::DuplicateType { name, first, second } => {
                assert_eq!(name, "Vehicle");
                assert_eq!(first, "a.graphql");
                assert_eq!(second, "b.graphql");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_common_type_shadowing_first_wins() {
        let fragment = parse_fragment(
            "units.graphql",
            "enum TemperatureUnitEnum { DEG_C DEG_F }",
        )
        .unwrap();
        let composed = compose(&[fragment], &ComposeOptions::default()).unwrap();
        // The built-in definition (one value) wins over the duplicate.
        let unit = composed.model.get("TemperatureUnitEnum").unwrap();
        assert_eq!(unit.value_names(), vec!["DEG_C"]);
        assert_eq!(unit.directives.reference(), Some("spec"));
    }

    #[test]
    fn test_provenance_tagging() {
        let fragment =
            parse_fragment("cabin.graphql", "type Cabin { doorCount: Int }").unwrap();
        let composed = compose(&[fragment], &ComposeOptions::default()).unwrap();
        let cabin = composed.model.get("Cabin").unwrap();
        assert_eq!(cabin.directives.reference(), Some("cabin.graphql"));
        // Built-in types carry the spec label.
        let scalar = composed.model.get("Int8").unwrap();
        assert_eq!(scalar.directives.reference(), Some("spec"));
    }

    #[test]
    fn test_existing_reference_is_kept() {
        let fragment = parse_fragment(
            "cabin.graphql",
            "type Cabin @reference(source: \"legacy.graphql\") { doorCount: Int }",
        )
        .unwrap();
        let composed = compose(&[fragment], &ComposeOptions::default()).unwrap();
        let cabin = composed.model.get("Cabin").unwrap();
        assert_eq!(cabin.directives.reference(), Some("legacy.graphql"));
    }

    #[test]
    fn test_unresolved_reference_is_fatal() {
        let fragment =
            parse_fragment("cabin.graphql", "type Cabin { engine: Engine }").unwrap();
        let err = compose(&[fragment], &ComposeOptions::default()).unwrap_err();
        assert!(matches!(err, SchemaError::UnresolvedReference { .. }));
    }

    #[test]
    fn test_generic_query_added() {
        let fragment = parse_fragment("x.graphql", "type X { y: Int }").unwrap();
        let composed = compose(&[fragment], &ComposeOptions::default()).unwrap();
        let query = composed.model.get("Query").unwrap();
        assert!(query.fields.contains_key("ping"));
    }

    #[test]
    fn test_full_pipeline_selection_then_expansion() {
        let fragment = parse_fragment(
            "cabin.graphql",
            r#"
            type Query { cabin: Cabin }
            type Cabin { doors: [Door] temperature: Float }
            type Door { isLocked: Boolean instanceTag: DoorPosition }
            type DoorPosition @instanceTag { row: TwoRowsEnum! side: TwoSidesEnum! }
            "#,
        )
        .unwrap();
        let options = ComposeOptions {
            selection: Some(
                parse_selection_document(
                    "q.graphql",
                    "query CabinState { cabin { doors } }",
                )
                .unwrap(),
            ),
            expand_instances: true,
            ..Default::default()
        };
        let composed = compose(&[fragment], &options).unwrap();
        let model = &composed.model;

        // Selection pruned the temperature field, expansion rewired doors.
        let cabin = model.get("Cabin").unwrap();
        assert!(!cabin.fields.contains_key("temperature"));
        assert!(cabin.fields.contains_key("Door"));
        assert!(model.contains("Door_Row"));
        assert!(model.contains("Door_Side"));
        assert!(!model.contains("DoorPosition"));
        assert!(model.contains("CabinState"));
        model.resolve_references().unwrap();
    }
}
