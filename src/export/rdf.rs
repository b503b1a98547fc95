//! Minimal RDF graph with Turtle and N-Triples writers
//!
//! Just enough RDF for the constraint and vocabulary exporters: IRIs,
//! labeled blank nodes, typed/tagged literals and rdf:List construction.
//! Triples serialize in insertion order, so output is deterministic.

use std::fmt::Write as _;

pub const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const RDFS_NS: &str = "http://www.w3.org/2000/01/rdf-schema#";
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema#";
pub const SHACL_NS: &str = "http://www.w3.org/ns/shacl#";
pub const SKOS_NS: &str = "http://www.w3.org/2004/02/skos/core#";

/// One RDF term
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Iri(String),
    Blank(usize),
    Literal {
        value: String,
        datatype: Option<String>,
        language: Option<String>,
    },
}

impl Term {
    pub fn iri(value: impl Into<String>) -> Term {
        Term::Iri(value.into())
    }

    pub fn literal(value: impl Into<String>) -> Term {
        Term::Literal {
            value: value.into(),
            datatype: None,
            language: None,
        }
    }

    pub fn typed(value: impl Into<String>, datatype: impl Into<String>) -> Term {
        Term::Literal {
            value: value.into(),
            datatype: Some(datatype.into()),
            language: None,
        }
    }

    pub fn tagged(value: impl Into<String>, language: impl Into<String>) -> Term {
        Term::Literal {
            value: value.into(),
            datatype: None,
            language: Some(language.into()),
        }
    }
}

/// An insertion-ordered triple store with namespace prefixes
#[derive(Debug, Default)]
pub struct RdfGraph {
    prefixes: Vec<(String, String)>,
    triples: Vec<(Term, String, Term)>,
    blank_counter: usize,
}

impl RdfGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a namespace prefix used for Turtle compression.
    pub fn bind(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.prefixes.push((prefix.into(), namespace.into()));
    }

    /// Allocate a fresh blank node.
    pub fn blank(&mut self) -> Term {
        let term = Term::Blank(self.blank_counter);
        self.blank_counter += 1;
        term
    }

    pub fn add(&mut self, subject: Term, predicate: impl Into<String>, object: Term) {
        self.triples.push((subject, predicate.into(), object));
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn subjects_of_type(&self, type_iri: &str) -> Vec<&Term> {
        let rdf_type = format!("{}type", RDF_NS);
        self.triples
            .iter()
            .filter(|(_, p, o)| p == &rdf_type && matches!(o, Term::Iri(iri) if iri == type_iri))
            .map(|(s, _, _)| s)
            .collect()
    }

    pub fn objects(&self, subject: &Term, predicate: &str) -> Vec<&Term> {
        self.triples
            .iter()
            .filter(|(s, p, _)| s == subject && p == predicate)
            .map(|(_, _, o)| o)
            .collect()
    }

    /// Build an rdf:List from the items and return its head.
    pub fn add_list(&mut self, items: Vec<Term>) -> Term {
        let nil = Term::iri(format!("{}nil", RDF_NS));
        let first = format!("{}first", RDF_NS);
        let rest = format!("{}rest", RDF_NS);

        let mut head = nil;
        for item in items.into_iter().rev() {
            let node = self.blank();
            self.add(node.clone(), first.clone(), item);
            self.add(node.clone(), rest.clone(), head);
            head = node;
        }
        head
    }

    /// Serialize as Turtle, grouping consecutive same-subject triples.
    pub fn to_turtle(&self) -> String {
        let mut out = String::new();
        for (prefix, namespace) in &self.prefixes {
            let _ = writeln!(out, "@prefix {}: <{}> .", prefix, namespace);
        }
        if !self.prefixes.is_empty() {
            out.push('\n');
        }

        let mut i = 0;
        while i < self.triples.len() {
            let (subject, _, _) = &self.triples[i];
            let mut j = i;
            while j < self.triples.len() && &self.triples[j].0 == subject {
                j += 1;
            }

            out.push_str(&self.turtle_term(subject));
            for (k, (_, predicate, object)) in self.triples[i..j].iter().enumerate() {
                if k == 0 {
                    out.push(' ');
                } else {
                    out.push_str(" ;\n    ");
                }
                out.push_str(&self.turtle_predicate(predicate));
                out.push(' ');
                out.push_str(&self.turtle_term(object));
            }
            out.push_str(" .\n");
            i = j;
        }
        out
    }

    /// Serialize as N-Triples (no prefix compression).
    pub fn to_ntriples(&self) -> String {
        let mut out = String::new();
        for (subject, predicate, object) in &self.triples {
            let _ = writeln!(
                out,
                "{} <{}> {} .",
                ntriples_term(subject),
                predicate,
                ntriples_term(object)
            );
        }
        out
    }

    fn compress(&self, iri: &str) -> Option<String> {
        for (prefix, namespace) in &self.prefixes {
            if let Some(local) = iri.strip_prefix(namespace.as_str()) {
                if !local.is_empty()
                    && local
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
                    && !local.ends_with('.')
                {
                    return Some(format!("{}:{}", prefix, local));
                }
            }
        }
        None
    }

    fn turtle_predicate(&self, predicate: &str) -> String {
        if predicate == format!("{}type", RDF_NS) {
            return "a".to_string();
        }
        self.compress(predicate)
            .unwrap_or_else(|| format!("<{}>", predicate))
    }

    fn turtle_term(&self, term: &Term) -> String {
        match term {
            Term::Iri(iri) => self
                .compress(iri)
                .unwrap_or_else(|| format!("<{}>", iri)),
            Term::Blank(id) => format!("_:b{}", id),
            Term::Literal {
                value,
                datatype,
                language,
            } => {
                let mut out = format!("\"{}\"", escape_literal(value));
                if let Some(language) = language {
                    let _ = write!(out, "@{}", language);
                } else if let Some(datatype) = datatype {
                    let rendered = self
                        .compress(datatype)
                        .unwrap_or_else(|| format!("<{}>", datatype));
                    let _ = write!(out, "^^{}", rendered);
                }
                out
            }
        }
    }
}

fn ntriples_term(term: &Term) -> String {
    match term {
        Term::Iri(iri) => format!("<{}>", iri),
        Term::Blank(id) => format!("_:b{}", id),
        Term::Literal {
            value,
            datatype,
            language,
        } => {
            let mut out = format!("\"{}\"", escape_literal(value));
            if let Some(language) = language {
                let _ = write!(out, "@{}", language);
            } else if let Some(datatype) = datatype {
                let _ = write!(out, "^^<{}>", datatype);
            }
            out
        }
    }
}

fn escape_literal(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turtle_groups_subjects() {
        let mut graph = RdfGraph::new();
        graph.bind("sh", SHACL_NS);
        graph.bind("ex", "http://example.org/");
        let subject = Term::iri("http://example.org/Cabin");
        graph.add(
            subject.clone(),
            format!("{}type", RDF_NS),
            Term::iri(format!("{}NodeShape", SHACL_NS)),
        );
        graph.add(subject, format!("{}name", SHACL_NS), Term::literal("Cabin"));

        let turtle = graph.to_turtle();
        assert!(turtle.contains("@prefix sh: <http://www.w3.org/ns/shacl#> ."));
        assert!(turtle.contains("ex:Cabin a sh:NodeShape ;\n    sh:name \"Cabin\" ."));
    }

    #[test]
    fn test_ntriples_expands_everything() {
        let mut graph = RdfGraph::new();
        graph.bind("ex", "http://example.org/");
        graph.add(
            Term::iri("http://example.org/s"),
            "http://example.org/p",
            Term::typed("3", format!("{}integer", XSD_NS)),
        );
        let ntriples = graph.to_ntriples();
        assert_eq!(
            ntriples,
            "<http://example.org/s> <http://example.org/p> \"3\"^^<http://www.w3.org/2001/XMLSchema#integer> .\n"
        );
    }

    #[test]
    fn test_list_construction() {
        let mut graph = RdfGraph::new();
        let head = graph.add_list(vec![Term::literal("A"), Term::literal("B")]);
        assert!(matches!(head, Term::Blank(_)));
        // Two cells, each with first + rest.
        assert_eq!(graph.len(), 4);
    }

    #[test]
    fn test_literal_escaping() {
        let mut graph = RdfGraph::new();
        graph.add(
            Term::iri("http://example.org/s"),
            "http://example.org/p",
            Term::literal("say \"hi\"\nplease"),
        );
        let out = graph.to_ntriples();
        assert!(out.contains("\"say \\\"hi\\\"\\nplease\""));
    }
}
