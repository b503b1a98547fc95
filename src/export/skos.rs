//! SKOS vocabulary exporter
//!
//! Emits the concept skeleton of the schema: one `skos:Collection` per
//! object type, one `skos:Concept` per field and enum, each with exactly
//! one `skos:prefLabel` and a definition inherited from the element's
//! description. The graph is validated before serialization.

use tracing::{debug, info};

use crate::compose::Composed;
use crate::error::{Result, SchemaError};
use crate::export::rdf::{RdfGraph, Term, RDFS_NS, RDF_NS, SKOS_NS};
use crate::export::Exporter;
use crate::model::{SchemaModel, TypeKind, INSTANCE_TAG_FIELD, ROOT_TYPE_NAMES};

const EXPORTER: &str = "skos";

/// Exporter for the concept vocabulary
#[derive(Debug)]
pub struct SkosExporter {
    pub namespace: String,
    pub prefix: String,
    /// BCP 47 language tag for preferred labels
    pub language: String,
    /// Re-check the generated graph before serializing
    pub validate: bool,
}

impl Default for SkosExporter {
    fn default() -> Self {
        Self {
            namespace: "http://example.org/concepts#".to_string(),
            prefix: "ns".to_string(),
            language: "en".to_string(),
            validate: true,
        }
    }
}

impl Exporter for SkosExporter {
    fn name(&self) -> &'static str {
        EXPORTER
    }

    fn export(&self, composed: &Composed) -> Result<String> {
        let graph = self.build_graph(&composed.model);

        if self.validate {
            let errors = validate_graph(&graph);
            if !errors.is_empty() {
                return Err(SchemaError::Unsupported {
                    exporter: EXPORTER,
                    construct: format!("an invalid concept graph: {}", errors.join("; ")),
                    field: String::new(),
                });
            }
            info!("SKOS validation passed");
        }

        Ok(graph.to_turtle())
    }
}

impl SkosExporter {
    fn concept(&self, local: &str) -> Term {
        Term::iri(format!("{}{}", self.namespace, local))
    }

    pub fn build_graph(&self, model: &SchemaModel) -> RdfGraph {
        let mut graph = RdfGraph::new();
        graph.bind("skos", SKOS_NS);
        graph.bind("rdfs", RDFS_NS);
        graph.bind(&self.prefix, &self.namespace);

        for def in model.iter() {
            if ROOT_TYPE_NAMES.contains(&def.name.as_str()) {
                continue;
            }
            match def.kind {
                TypeKind::Enum => {
                    self.add_concept(&mut graph, &def.name, def.description.as_deref());
                }
                TypeKind::Object => {
                    if def.is_instance_tag_marker() {
                        debug!(name = %def.name, "skipping instance-tag marker type");
                        continue;
                    }
                    self.add_collection(&mut graph, def);
                }
                _ => {}
            }
        }
        graph
    }

    fn add_collection(&self, graph: &mut RdfGraph, def: &crate::model::TypeDefinition) {
        let collection = self.concept(&def.name);
        graph.add(
            collection.clone(),
            format!("{}type", RDF_NS),
            Term::iri(format!("{}Collection", SKOS_NS)),
        );
        graph.add(
            collection.clone(),
            format!("{}prefLabel", SKOS_NS),
            Term::tagged(&def.name, &self.language),
        );
        graph.add(
            collection.clone(),
            format!("{}definition", SKOS_NS),
            Term::literal(def.description.as_deref().unwrap_or_default()),
        );

        for field in def.fields.values() {
            if field.name.eq_ignore_ascii_case("id") || field.name == INSTANCE_TAG_FIELD {
                continue;
            }
            let qualified = format!("{}.{}", def.name, field.name);
            self.add_concept(graph, &qualified, field.description.as_deref());
            graph.add(
                collection.clone(),
                format!("{}member", SKOS_NS),
                self.concept(&qualified),
            );
        }
    }

    fn add_concept(&self, graph: &mut RdfGraph, name: &str, description: Option<&str>) {
        let concept = self.concept(name);
        graph.add(
            concept.clone(),
            format!("{}type", RDF_NS),
            Term::iri(format!("{}Concept", SKOS_NS)),
        );
        graph.add(
            concept.clone(),
            format!("{}prefLabel", SKOS_NS),
            Term::tagged(name, &self.language),
        );
        graph.add(
            concept.clone(),
            format!("{}definition", SKOS_NS),
            Term::literal(description.unwrap_or_default()),
        );
        graph.add(
            concept.clone(),
            format!("{}note", SKOS_NS),
            Term::literal(format!(
                "Definition was inherited from the description of the element {}",
                name
            )),
        );
        graph.add(
            concept.clone(),
            format!("{}seeAlso", RDFS_NS),
            concept.clone(),
        );
    }
}

/// Check that every concept and collection carries exactly one prefLabel
/// and something that defines it.
pub fn validate_graph(graph: &RdfGraph) -> Vec<String> {
    let mut errors = Vec::new();
    let pref_label = format!("{}prefLabel", SKOS_NS);
    let definition = format!("{}definition", SKOS_NS);
    let note = format!("{}note", SKOS_NS);

    let mut subjects: Vec<&Term> =
        graph.subjects_of_type(&format!("{}Concept", SKOS_NS));
    subjects.extend(graph.subjects_of_type(&format!("{}Collection", SKOS_NS)));

    for subject in &subjects {
        let labels = graph.objects(subject, &pref_label);
        if labels.len() != 1 {
            errors.push(format!(
                "{:?} has {} prefLabels, expected exactly one",
                subject,
                labels.len()
            ));
        }
        if graph.objects(subject, &definition).is_empty()
            && graph.objects(subject, &note).is_empty()
        {
            errors.push(format!("{:?} has neither definition nor note", subject));
        }
    }
    errors
}
