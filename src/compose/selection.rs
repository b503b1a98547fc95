//! Selection-document filtering
//!
//! A query-shaped document names the subset of the schema to retain. The
//! filter prunes everything else, keeps field arguments (with the types
//! their defaults refer to) and renames the root type to the operation's
//! declared name.

use std::collections::{HashMap, HashSet};

use async_graphql_parser::types::{
    DocumentOperations, OperationType, Selection, SelectionSet,
};
use async_graphql_parser::parse_query;
use tracing::debug;

use crate::error::{Result, SchemaError};
use crate::model::{SchemaModel, TypeKind, INSTANCE_TAG_FIELD};

/// One selected field with its nested selections
#[derive(Debug, Clone)]
pub struct SelectionNode {
    pub name: String,
    pub children: Vec<SelectionNode>,
}

/// A parsed selection document
#[derive(Debug, Clone)]
pub struct SelectionDocument {
    /// Declared operation name; becomes the root type's name
    pub operation: Option<String>,
    pub roots: Vec<SelectionNode>,
}

/// Parse a selection document. Exactly one query operation is required;
/// fragment syntax is rejected since selections must be explicit.
pub fn parse_selection_document(label: &str, source: &str) -> Result<SelectionDocument> {
    let document = parse_query(source).map_err(|e| SchemaError::Parse {
        file: label.to_string(),
        message: e.to_string(),
    })?;

    let (operation, definition) = match &document.operations {
        DocumentOperations::Single(op) => (None, &op.node),
        DocumentOperations::Multiple(ops) => {
            let mut queries: Vec<(&str, _)> = ops
                .iter()
                .filter(|(_, op)| op.node.ty == OperationType::Query)
                .map(|(name, op)| (name.as_str(), &op.node))
                .collect();
            if queries.len() != 1 {
                return Err(SchemaError::MissingOperation);
            }
            let (name, op) = queries.remove(0);
            (Some(name.to_string()), op)
        }
    };
    if definition.ty != OperationType::Query {
        return Err(SchemaError::MissingOperation);
    }

    let roots = convert_selection_set(label, &definition.selection_set.node)?;
    Ok(SelectionDocument { operation, roots })
}

fn convert_selection_set(label: &str, set: &SelectionSet) -> Result<Vec<SelectionNode>> {
    let mut nodes = Vec::with_capacity(set.items.len());
    for item in &set.items {
        match &item.node {
            Selection::Field(field) => {
                let field = &field.node;
                nodes.push(SelectionNode {
                    name: field.name.node.to_string(),
                    children: convert_selection_set(label, &field.selection_set.node)?,
                });
            }
            Selection::FragmentSpread(_) | Selection::InlineFragment(_) => {
                return Err(SchemaError::Parse {
                    file: label.to_string(),
                    message: "fragment syntax is not supported in selection documents"
                        .to_string(),
                });
            }
        }
    }
    Ok(nodes)
}

#[derive(Default)]
struct Keep {
    types: HashSet<String>,
    fields: HashMap<String, HashSet<String>>,
}

/// Prune the model down to the selected subtree.
///
/// `keep_instance_tags` preserves `instanceTag` fields and their marker
/// types on retained element types, so that a later expansion stage still
/// finds them.
pub fn apply_selection(
    model: &mut SchemaModel,
    document: &SelectionDocument,
    keep_instance_tags: bool,
) -> Result<()> {
    if !model.contains("Query") {
        return Err(SchemaError::UnknownRootType("Query".to_string()));
    }

    let mut keep = Keep::default();
    collect(model, "Query", &document.roots, keep_instance_tags, &mut keep)?;

    // A selected field without sub-selections keeps its type whole, so
    // everything that type references must survive too. Close over the
    // references of every fully-retained type.
    let mut pending: Vec<String> = keep
        .types
        .iter()
        .filter(|name| !keep.fields.contains_key(*name))
        .cloned()
        .collect();
    while let Some(name) = pending.pop() {
        let Some(def) = model.get(&name) else {
            continue;
        };
        let mut referenced: Vec<String> = Vec::new();
        for field in def.fields.values() {
            referenced.push(field.ty.name.clone());
            for arg in &field.arguments {
                referenced.push(arg.ty.name.clone());
            }
        }
        referenced.extend(def.members.iter().cloned());
        referenced.extend(def.implements.iter().cloned());
        for target in referenced {
            if keep.types.insert(target.clone()) && !keep.fields.contains_key(&target) {
                pending.push(target);
            }
        }
    }

    // Drop unselected fields from retained object/interface types.
    for (type_name, selected) in &keep.fields {
        if let Some(def) = model.get_mut(type_name) {
            def.fields.retain(|name, _| selected.contains(name));
        }
    }

    // Drop types outside the retained set.
    model.types.retain(|name, _| keep.types.contains(name));

    // The root operation type takes the operation's declared name.
    if let Some(operation) = &document.operation {
        if let Some(mut query) = model.remove("Query") {
            query.name = operation.clone();
            // Keep the root at the front of the model.
            let mut rebuilt = indexmap::IndexMap::with_capacity(model.types.len() + 1);
            rebuilt.insert(query.name.clone(), query);
            for (name, def) in std::mem::take(&mut model.types) {
                rebuilt.insert(name, def);
            }
            model.types = rebuilt;
        }
    }

    debug!(types = model.len(), "applied selection filter");
    Ok(())
}

fn collect(
    model: &SchemaModel,
    type_name: &str,
    selections: &[SelectionNode],
    keep_instance_tags: bool,
    keep: &mut Keep,
) -> Result<()> {
    let Some(def) = model.get(type_name) else {
        return Ok(());
    };
    keep.types.insert(type_name.to_string());

    if !matches!(def.kind, TypeKind::Object | TypeKind::Interface) {
        return Ok(());
    }
    let selected = keep.fields.entry(type_name.to_string()).or_default();

    if keep_instance_tags {
        if let Some(field) = def.fields.get(INSTANCE_TAG_FIELD) {
            selected.insert(INSTANCE_TAG_FIELD.to_string());
            let marker_name = field.ty.name.clone();
            keep.types.insert(marker_name.clone());
            // Dimension enums of the marker stay referenceable.
            if let Some(marker) = model.get(&marker_name) {
                for dim in marker.fields.values() {
                    keep.types.insert(dim.ty.name.clone());
                }
            }
        }
    }

    for node in selections {
        let Some(field) = def.fields.get(&node.name) else {
            return Err(SchemaError::UnknownSelection {
                parent: type_name.to_string(),
                field: node.name.clone(),
            });
        };
        keep.fields
            .get_mut(type_name)
            .map(|set| set.insert(node.name.clone()));
        keep.types.insert(field.ty.name.clone());

        // Arguments survive selection: they carry semantic defaults.
        for arg in &field.arguments {
            keep.types.insert(arg.ty.name.clone());
        }

        if !node.children.is_empty() {
            let child_type = field.ty.name.clone();
            collect(model, &child_type, &node.children, keep_instance_tags, keep)?;
        }
    }
    Ok(())
}
