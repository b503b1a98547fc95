//! Identifier and history registries
//!
//! Read-only consumers of the composed model: deterministic field IDs,
//! concept URIs and the versioned history that ties the two together.

pub mod concept;
pub mod history;
pub mod id;

pub use concept::{build_concept_uris, ConceptUriDocument, ConceptUriNode};
pub use history::{
    init_history, load_history, save_history, update_history, HistoryArchiver,
    SpecHistoryDocument,
};
pub use id::{generate_ids, IdSpec};
