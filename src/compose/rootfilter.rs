//! Root-type filtering
//!
//! Keeps only the reflexive-transitive closure of type references starting
//! at a designated root type. Unreachable types are dropped silently; this
//! stage filters, it does not diagnose.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use tracing::debug;

use crate::error::{Result, SchemaError};
use crate::model::{SchemaModel, TypeKind, ROOT_TYPE_NAMES};

/// Filter the model to the types reachable from `root`.
///
/// Instance-tag marker fields are traversed only when `traverse_markers`
/// is set (expansion still needs their dimension enums). The root types
/// `Query`/`Mutation`/`Subscription` are kept only when explicitly chosen
/// as the root.
pub fn apply_root_filter(
    model: &mut SchemaModel,
    root: &str,
    traverse_markers: bool,
) -> Result<()> {
    if !model.contains(root) {
        return Err(SchemaError::UnknownRootType(root.to_string()));
    }

    let mut graph: DiGraph<String, ()> = DiGraph::new();
    let mut indices: HashMap<String, NodeIndex> = HashMap::new();
    for name in model.types.keys() {
        let index = graph.add_node(name.clone());
        indices.insert(name.clone(), index);
    }

    for def in model.iter() {
        let from = indices[&def.name];
        let mut link = |target: &str| {
            if let Some(&to) = indices.get(target) {
                graph.add_edge(from, to, ());
            }
        };

        match def.kind {
            TypeKind::Object | TypeKind::Interface | TypeKind::Input => {
                // A marker type is kept when referenced, but its own
                // dimension fields are only traversed for expansion.
                if def.is_instance_tag_marker() && !traverse_markers {
                    continue;
                }
                for field in def.fields.values() {
                    link(&field.ty.name);
                    for arg in &field.arguments {
                        link(&arg.ty.name);
                    }
                }
                for iface in &def.implements {
                    link(iface);
                }
            }
            TypeKind::Union => {
                for member in &def.members {
                    link(member);
                }
            }
            TypeKind::Enum | TypeKind::Scalar => {}
        }
    }

    let mut reachable: std::collections::HashSet<String> = std::collections::HashSet::new();
    let mut dfs = Dfs::new(&graph, indices[root]);
    while let Some(index) = dfs.next(&graph) {
        reachable.insert(graph[index].clone());
    }

    let before = model.len();
    model.types.retain(|name, _| {
        reachable.contains(name)
            && (name == root || !ROOT_TYPE_NAMES.contains(&name.as_str()))
    });
    debug!(root, kept = model.len(), dropped = before - model.len(), "applied root filter");
    Ok(())
}
