//! SHACL exporter
//!
//! One `sh:NodeShape` per object type, with literal-valued property
//! shapes for scalar/enum fields and IRI-valued shapes for object fields.
//! `@range` lowers to `sh:minInclusive`/`sh:maxInclusive`, enum values to
//! an `sh:in` list, cardinalities to `sh:minCount`/`sh:maxCount`.

use tracing::debug;

use crate::compose::Composed;
use crate::directive::Cardinality;
use crate::error::{Result, SchemaError};
use crate::export::rdf::{RdfGraph, Term, RDFS_NS, RDF_NS, SHACL_NS, XSD_NS};
use crate::export::{format_bound, reject_nested_list, Exporter, ScalarKind};
use crate::model::{
    FieldCase, FieldDefinition, SchemaModel, TypeDefinition, TypeKind,
    INSTANCE_TAG_FIELD, ROOT_TYPE_NAMES,
};

const EXPORTER: &str = "shacl";

/// Output serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RdfFormat {
    #[default]
    Turtle,
    NTriples,
}

/// Exporter for the constraint/shape schema
#[derive(Debug)]
pub struct ShaclExporter {
    pub shapes_namespace: String,
    pub shapes_prefix: String,
    pub model_namespace: String,
    pub model_prefix: String,
    pub format: RdfFormat,
}

impl Default for ShaclExporter {
    fn default() -> Self {
        Self {
            shapes_namespace: "http://example.org/shapes#".to_string(),
            shapes_prefix: "shapes".to_string(),
            model_namespace: "http://example.org/model#".to_string(),
            model_prefix: "model".to_string(),
            format: RdfFormat::Turtle,
        }
    }
}

impl Exporter for ShaclExporter {
    fn name(&self) -> &'static str {
        EXPORTER
    }

    fn export(&self, composed: &Composed) -> Result<String> {
        let graph = self.build_graph(&composed.model)?;
        Ok(match self.format {
            RdfFormat::Turtle => graph.to_turtle(),
            RdfFormat::NTriples => graph.to_ntriples(),
        })
    }
}

impl ShaclExporter {
    fn shapes(&self, local: &str) -> Term {
        Term::iri(format!("{}{}", self.shapes_namespace, local))
    }

    fn model_iri(&self, local: &str) -> Term {
        Term::iri(format!("{}{}", self.model_namespace, local))
    }

    pub fn build_graph(&self, model: &SchemaModel) -> Result<RdfGraph> {
        let mut graph = RdfGraph::new();
        graph.bind("sh", SHACL_NS);
        graph.bind("rdfs", RDFS_NS);
        graph.bind("xsd", XSD_NS);
        graph.bind(&self.shapes_prefix, &self.shapes_namespace);
        graph.bind(&self.model_prefix, &self.model_namespace);

        for def in model.object_types() {
            if ROOT_TYPE_NAMES.contains(&def.name.as_str()) {
                debug!(name = %def.name, "skipping operation root type");
                continue;
            }
            if def.is_instance_tag_marker() {
                debug!(name = %def.name, "skipping instance-tag marker type");
                continue;
            }
            self.add_node_shape(&mut graph, model, def)?;
        }
        Ok(graph)
    }

    fn add_node_shape(
        &self,
        graph: &mut RdfGraph,
        model: &SchemaModel,
        def: &TypeDefinition,
    ) -> Result<()> {
        let shape = self.shapes(&def.name);
        graph.add(
            shape.clone(),
            format!("{}type", RDF_NS),
            Term::iri(format!("{}NodeShape", SHACL_NS)),
        );
        graph.add(
            shape.clone(),
            format!("{}name", SHACL_NS),
            Term::literal(&def.name),
        );
        graph.add(
            shape.clone(),
            format!("{}targetClass", SHACL_NS),
            self.model_iri(&def.name),
        );
        if let Some(description) = &def.description {
            graph.add(
                shape.clone(),
                format!("{}description", SHACL_NS),
                Term::literal(description),
            );
        }

        for field in def.fields.values() {
            self.add_property_shape(graph, model, def, field, &shape)?;
        }
        Ok(())
    }

    fn add_property_shape(
        &self,
        graph: &mut RdfGraph,
        model: &SchemaModel,
        parent: &TypeDefinition,
        field: &FieldDefinition,
        shape: &Term,
    ) -> Result<()> {
        if field.name == INSTANCE_TAG_FIELD
            && model
                .get(&field.ty.name)
                .map(|t| t.is_instance_tag_marker())
                .unwrap_or(false)
        {
            // Consumed by expansion; without expansion it carries no shape.
            return Ok(());
        }
        reject_nested_list(EXPORTER, &parent.name, field)?;

        let case = FieldCase::of(field);
        let cardinality = field
            .directives
            .cardinality()
            .unwrap_or_else(|| case.value_cardinality());

        let scalar = ScalarKind::of(&field.ty.name);
        let target = model.get(&field.ty.name);

        match target.map(|t| t.kind) {
            Some(kind @ (TypeKind::Union | TypeKind::Interface)) => {
                let word = if kind == TypeKind::Union {
                    "union"
                } else {
                    "interface"
                };
                return Err(SchemaError::Unsupported {
                    exporter: EXPORTER,
                    construct: format!("the {} type '{}'", word, field.ty.name),
                    field: format!("{}.{}", parent.name, field.name),
                });
            }
            Some(TypeKind::Object) => {
                let element = target.filter(|t| !t.is_instance_tag_marker());
                if let Some(element) = element {
                    if let Some(marker) = model.instance_tag_marker(element) {
                        // Unexpanded tagged lists become one property per
                        // tag path, addressable like the expanded tree.
                        for tag in marker_tag_paths(model, marker)? {
                            self.object_property(
                                graph,
                                &format!("{}.{}", element.name, tag),
                                &element.name,
                                field,
                                shape,
                                cardinality,
                            );
                        }
                        return Ok(());
                    }
                }
                self.object_property(
                    graph,
                    &field.name,
                    &field.ty.name,
                    field,
                    shape,
                    cardinality,
                );
            }
            _ => {
                // Scalars (including custom sized integers) and enums.
                let datatype = scalar_datatype(scalar);
                let property = graph.blank();
                graph.add(shape.clone(), format!("{}property", SHACL_NS), property.clone());
                graph.add(
                    property.clone(),
                    format!("{}name", SHACL_NS),
                    Term::literal(&field.name),
                );
                graph.add(
                    property.clone(),
                    format!("{}path", SHACL_NS),
                    self.model_iri(&field.name),
                );
                graph.add(
                    property.clone(),
                    format!("{}nodeKind", SHACL_NS),
                    Term::iri(format!("{}Literal", SHACL_NS)),
                );
                graph.add(
                    property.clone(),
                    format!("{}datatype", SHACL_NS),
                    Term::iri(datatype.clone()),
                );
                self.add_counts(graph, &property, cardinality);

                if let Some(enum_def) = target.filter(|t| t.kind == TypeKind::Enum) {
                    let values: Vec<Term> = enum_def
                        .values
                        .iter()
                        .map(|v| Term::literal(&v.name))
                        .collect();
                    let head = graph.add_list(values);
                    graph.add(property.clone(), format!("{}in", SHACL_NS), head);
                }

                if let Some(range) = field.directives.range() {
                    if scalar.map(|s| s.is_numeric()).unwrap_or(false) {
                        if let Some(min) = range.min {
                            graph.add(
                                property.clone(),
                                format!("{}minInclusive", SHACL_NS),
                                Term::typed(format_bound(min), datatype.clone()),
                            );
                        }
                        if let Some(max) = range.max {
                            graph.add(
                                property.clone(),
                                format!("{}maxInclusive", SHACL_NS),
                                Term::typed(format_bound(max), datatype.clone()),
                            );
                        }
                    }
                }

                if let Some(description) = &field.description {
                    graph.add(
                        property.clone(),
                        format!("{}description", SHACL_NS),
                        Term::literal(description),
                    );
                }
                if let Some((Some(comment), _)) = field.directives.metadata() {
                    graph.add(
                        property,
                        format!("{}comment", RDFS_NS),
                        Term::literal(comment),
                    );
                }
            }
        }
        Ok(())
    }

    fn object_property(
        &self,
        graph: &mut RdfGraph,
        name: &str,
        target_type: &str,
        field: &FieldDefinition,
        shape: &Term,
        cardinality: Cardinality,
    ) {
        let property = graph.blank();
        graph.add(shape.clone(), format!("{}property", SHACL_NS), property.clone());
        graph.add(
            property.clone(),
            format!("{}name", SHACL_NS),
            Term::literal(name),
        );
        graph.add(
            property.clone(),
            format!("{}path", SHACL_NS),
            self.model_iri(&format!("has{}", target_type)),
        );
        graph.add(
            property.clone(),
            format!("{}nodeKind", SHACL_NS),
            Term::iri(format!("{}IRI", SHACL_NS)),
        );
        graph.add(
            property.clone(),
            format!("{}node", SHACL_NS),
            self.shapes(target_type),
        );
        graph.add(
            property.clone(),
            format!("{}class", SHACL_NS),
            self.model_iri(target_type),
        );
        self.add_counts(graph, &property, cardinality);
        if let Some(description) = &field.description {
            graph.add(
                property,
                format!("{}description", SHACL_NS),
                Term::literal(description),
            );
        }
    }

    fn add_counts(&self, graph: &mut RdfGraph, property: &Term, cardinality: Cardinality) {
        if let Some(min) = cardinality.min.filter(|min| *min > 0) {
            graph.add(
                property.clone(),
                format!("{}minCount", SHACL_NS),
                Term::typed(min.to_string(), format!("{}integer", XSD_NS)),
            );
        }
        if let Some(max) = cardinality.max {
            graph.add(
                property.clone(),
                format!("{}maxCount", SHACL_NS),
                Term::typed(max.to_string(), format!("{}integer", XSD_NS)),
            );
        }
    }
}

fn scalar_datatype(scalar: Option<ScalarKind>) -> String {
    let local = match scalar {
        Some(kind) if kind.is_integer() => "integer",
        Some(ScalarKind::Float) => "float",
        Some(ScalarKind::Boolean) => "boolean",
        // Strings, IDs, enums and unknown custom scalars.
        _ => "string",
    };
    format!("{}{}", XSD_NS, local)
}

fn marker_tag_paths(model: &SchemaModel, marker: &TypeDefinition) -> Result<Vec<String>> {
    let mut paths = vec![String::new()];
    for field in marker.fields.values() {
        let dimension = model
            .get(&field.ty.name)
            .filter(|t| t.kind == TypeKind::Enum)
            .ok_or_else(|| SchemaError::InvalidInstanceTag {
                marker: marker.name.clone(),
                message: format!("dimension field '{}' is not an enum", field.name),
            })?;
        let mut next = Vec::with_capacity(paths.len() * dimension.values.len());
        for path in &paths {
            for value in &dimension.values {
                if path.is_empty() {
                    next.push(value.name.clone());
                } else {
                    next.push(format!("{}.{}", path, value.name));
                }
            }
        }
        paths = next;
    }
    Ok(paths)
}
