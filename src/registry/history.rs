//! Versioned concept history
//!
//! Associates every Field/Enum concept URI with the ordered list of
//! realization IDs it has had over time. Updates append an entry only
//! when the ID actually changed, and archive the SDL definition of the
//! changed type to a history directory together with a SHA-256 checksum
//! sidecar.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use similar::TextDiff;
use tracing::{debug, info, warn};

use crate::error::{Result, SchemaError};
use crate::registry::concept::{jsonld_context, ConceptUriDocument, ConceptUriNode};

/// One realization of a concept
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(rename = "@id")]
    pub id: String,
    pub timestamp: String,
}

impl HistoryEntry {
    fn now(id: &str) -> HistoryEntry {
        HistoryEntry {
            id: id.to_string(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// A concept node enriched with its realization history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecHistoryNode {
    #[serde(flatten)]
    pub concept: ConceptUriNode,
    #[serde(rename = "specHistory", skip_serializing_if = "Option::is_none")]
    pub spec_history: Option<Vec<HistoryEntry>>,
}

impl SpecHistoryNode {
    /// Append an entry when the ID differs from the latest one.
    fn add_entry(&mut self, id: &str) -> bool {
        if !self.concept.should_have_history() {
            return false;
        }
        let history = self.spec_history.get_or_insert_with(Vec::new);
        if history.last().map(|entry| entry.id.as_str()) != Some(id) {
            history.push(HistoryEntry::now(id));
            return true;
        }
        false
    }
}

/// The versioned history document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecHistoryDocument {
    #[serde(rename = "@context")]
    pub context: serde_json::Value,
    #[serde(rename = "@graph")]
    pub graph: Vec<SpecHistoryNode>,
}

/// Initialize a history document from concept URIs and generated IDs.
pub fn init_history(
    concepts: &ConceptUriDocument,
    ids: &IndexMap<String, String>,
) -> SpecHistoryDocument {
    let mut graph = Vec::with_capacity(concepts.graph.len());
    for concept in &concepts.graph {
        let mut node = SpecHistoryNode {
            concept: concept.clone(),
            spec_history: None,
        };
        if node.concept.should_have_history() {
            match ids.get(node.concept.concept_name()) {
                Some(id) => {
                    node.spec_history = Some(vec![HistoryEntry::now(id)]);
                }
                None => warn!(concept = %node.concept.id, "no ID found for concept"),
            }
        }
        graph.push(node);
    }
    SpecHistoryDocument {
        context: jsonld_context(&concepts.namespace(), true),
        graph,
    }
}

/// Update an existing history in place. Returns the names of new
/// concepts and of concepts whose ID changed.
pub fn update_history(
    history: &mut SpecHistoryDocument,
    concepts: &ConceptUriDocument,
    ids: &IndexMap<String, String>,
) -> (Vec<String>, Vec<String>) {
    let mut new_concepts = Vec::new();
    let mut updated = Vec::new();

    for concept in &concepts.graph {
        let existing = history
            .graph
            .iter_mut()
            .find(|node| node.concept.id == concept.id);

        match existing {
            None => {
                let mut node = SpecHistoryNode {
                    concept: concept.clone(),
                    spec_history: None,
                };
                let name = node.concept.concept_name().to_string();
                if node.concept.should_have_history() {
                    if let Some(id) = ids.get(&name) {
                        node.spec_history = Some(vec![HistoryEntry::now(id)]);
                        new_concepts.push(name);
                    }
                }
                history.graph.push(node);
            }
            Some(node) if concept.should_have_history() => {
                let name = node.concept.concept_name().to_string();
                if let Some(id) = ids.get(&name) {
                    if node.add_entry(id) {
                        updated.push(name);
                    }
                }
            }
            Some(_) => {}
        }
    }

    info!(
        new = new_concepts.len(),
        updated = updated.len(),
        "updated spec history"
    );
    (new_concepts, updated)
}

/// Archives SDL type definitions of changed concepts.
pub struct HistoryArchiver {
    history_dir: PathBuf,
}

impl HistoryArchiver {
    pub fn new(history_dir: impl Into<PathBuf>) -> Self {
        Self {
            history_dir: history_dir.into(),
        }
    }

    /// Extract the `type`/`enum` definition block for `type_name`.
    pub fn extract_type_definition(content: &str, type_name: &str) -> Option<String> {
        let pattern = format!(
            r"(type|enum)\s+{}\s*\{{[^{{}}]*\}}",
            regex::escape(type_name)
        );
        let re = Regex::new(&pattern).ok()?;
        re.find(content).map(|m| m.as_str().to_string())
    }

    /// Save definitions of the given concepts. The concept name's first
    /// segment is the owning type (`Cabin.doorCount` archives `Cabin`).
    /// All files of one batch share the same timestamp.
    pub fn archive(
        &self,
        concepts: &[String],
        ids: &IndexMap<String, String>,
        schema_sdl: &str,
    ) -> Result<Vec<PathBuf>> {
        let timestamp = Utc::now();
        let mut written = Vec::new();
        std::fs::create_dir_all(&self.history_dir)?;

        for concept in concepts {
            let Some(id) = ids.get(concept) else {
                warn!(concept = %concept, "no ID for concept, skipping archive");
                continue;
            };
            let parent = concept.split('.').next().unwrap_or(concept);
            let Some(definition) = Self::extract_type_definition(schema_sdl, parent) else {
                warn!(parent, "could not extract type definition");
                continue;
            };
            written.push(self.write_snapshot(parent, id, &definition, timestamp)?);
        }
        Ok(written)
    }

    fn write_snapshot(
        &self,
        type_name: &str,
        id: &str,
        definition: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<PathBuf> {
        let filename = format!(
            "{}_{}_{}.graphql",
            type_name,
            timestamp.format("%Y%m%d%H%M%S"),
            id
        );
        let path = self.history_dir.join(&filename);

        if let Some(previous) = self.latest_snapshot(type_name)? {
            let old = std::fs::read_to_string(&previous)?;
            if old != definition {
                let diff = TextDiff::from_lines(old.as_str(), definition);
                debug!(
                    type_name,
                    "definition changed:\n{}",
                    diff.unified_diff().header("previous", "current")
                );
            }
        }

        std::fs::write(&path, definition)?;

        let digest = Sha256::digest(definition.as_bytes());
        let checksum_path = self.history_dir.join(format!("{}.sha256", filename));
        std::fs::write(&checksum_path, format!("{:x}  {}\n", digest, filename))?;

        info!(path = %path.display(), "archived type definition");
        Ok(path)
    }

    /// Most recent snapshot of a type, by the sortable timestamp in the
    /// filename.
    fn latest_snapshot(&self, type_name: &str) -> Result<Option<PathBuf>> {
        if !self.history_dir.exists() {
            return Ok(None);
        }
        let prefix = format!("{}_", type_name);
        let mut snapshots: Vec<PathBuf> = std::fs::read_dir(&self.history_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension().is_some_and(|ext| ext == "graphql")
                    && path
                        .file_name()
                        .and_then(|name| name.to_str())
                        .is_some_and(|name| name.starts_with(&prefix))
            })
            .collect();
        snapshots.sort();
        Ok(snapshots.pop())
    }
}

/// Load a history document from disk.
pub fn load_history(path: &Path) -> Result<SpecHistoryDocument> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(SchemaError::from)
}

/// Save a history document with stable formatting.
pub fn save_history(history: &SpecHistoryDocument, path: &Path) -> Result<()> {
    let mut rendered = serde_json::to_string_pretty(history)?;
    rendered.push('\n');
    std::fs::write(path, rendered)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::{compose, ComposeOptions};
    use crate::parser::parse_fragment;
    use crate::registry::concept::build_concept_uris;
    use crate::registry::id::generate_ids;

    fn concepts_and_ids(sdl: &str) -> (ConceptUriDocument, IndexMap<String, String>) {
        let fragment = parse_fragment("test.graphql", sdl).unwrap();
        let composed = compose(&[fragment], &ComposeOptions::default()).unwrap();
        let concepts =
            build_concept_uris(&composed.model, "https://example.org/vhal#", "vhal");
        let ids = generate_ids(&composed.model, false).unwrap();
        (concepts, ids)
    }

    #[test]
    fn test_init_assigns_history_to_fields_and_enums() {
        let (concepts, ids) =
            concepts_and_ids("type Vehicle { speed: Float } enum GearEnum { PARK DRIVE }");
        let history = init_history(&concepts, &ids);

        let speed = history
            .graph
            .iter()
            .find(|n| n.concept.id == "vhal:Vehicle.speed")
            .unwrap();
        let entries = speed.spec_history.as_ref().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, ids["Vehicle.speed"]);

        let vehicle = history
            .graph
            .iter()
            .find(|n| n.concept.id == "vhal:Vehicle")
            .unwrap();
        assert!(vehicle.spec_history.is_none());
    }

    #[test]
    fn test_update_appends_only_on_change() {
        let (concepts, ids) = concepts_and_ids("type Vehicle { speed: Float }");
        let mut history = init_history(&concepts, &ids);

        // Same IDs: nothing changes.
        let (new_concepts, updated) = update_history(&mut history, &concepts, &ids);
        assert!(new_concepts.is_empty());
        assert!(updated.is_empty());

        // A changed contract produces a new ID and a second entry.
        let (concepts2, ids2) =
            concepts_and_ids("type Vehicle { speed: Float @range(min: 0, max: 300) }");
        let (new_concepts, updated) = update_history(&mut history, &concepts2, &ids2);
        assert!(new_concepts.is_empty());
        assert_eq!(updated, vec!["Vehicle.speed"]);

        let speed = history
            .graph
            .iter()
            .find(|n| n.concept.id == "vhal:Vehicle.speed")
            .unwrap();
        assert_eq!(speed.spec_history.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_update_adds_new_concepts() {
        let (concepts, ids) = concepts_and_ids("type Vehicle { speed: Float }");
        let mut history = init_history(&concepts, &ids);

        let (concepts2, ids2) =
            concepts_and_ids("type Vehicle { speed: Float mass: Float }");
        let (new_concepts, _) = update_history(&mut history, &concepts2, &ids2);
        assert_eq!(new_concepts, vec!["Vehicle.mass"]);
    }

    #[test]
    fn test_extract_type_definition() {
        let sdl = "type Vehicle {\n  speed: Float\n}\n\nenum GearEnum {\n  PARK\n}\n";
        let vehicle = HistoryArchiver::extract_type_definition(sdl, "Vehicle").unwrap();
        assert!(vehicle.starts_with("type Vehicle {"));
        assert!(vehicle.ends_with('}'));
        let gear = HistoryArchiver::extract_type_definition(sdl, "GearEnum").unwrap();
        assert!(gear.starts_with("enum GearEnum {"));
        assert!(HistoryArchiver::extract_type_definition(sdl, "Missing").is_none());
    }

    #[test]
    fn test_archive_writes_snapshot_and_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let archiver = HistoryArchiver::new(dir.path());
        let (_, ids) = concepts_and_ids("type Vehicle { speed: Float }");
        let sdl = "type Vehicle {\n  speed: Float\n}\n";

        let written = archiver
            .archive(&["Vehicle.speed".to_string()], &ids, sdl)
            .unwrap();
        assert_eq!(written.len(), 1);
        let name = written[0].file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("Vehicle_"));
        assert!(name.ends_with(&format!("{}.graphql", ids["Vehicle.speed"])));

        let checksum = written[0].with_file_name(format!("{}.sha256", name));
        let recorded = std::fs::read_to_string(checksum).unwrap();
        let digest = Sha256::digest(std::fs::read(&written[0]).unwrap());
        assert!(recorded.starts_with(&format!("{:x}", digest)));
    }
}
