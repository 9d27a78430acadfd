//! # aa-core
//!
//! ATT&CK knowledge graph engine for Attack Atlas.
//!
//! This crate ingests a STIX bundle into an immutable in-memory directed
//! property graph, resolves ATT&CK ids and names, and serves bounded
//! search, traversal, tactic-listing, and detail queries plus Navigator
//! layer export. Transport, configuration, and bundle fetching live in the
//! sibling crates.

pub mod error;
pub mod graph;
pub mod limits;
pub mod navigator;
pub mod query;
pub mod resolver;
pub mod store;

pub use error::{AtlasError, AtlasResult};
pub use graph::{
    build_graph, AttackGraph, GraphEdge, GraphNode, KillChainPhase, NodeType,
    REL_REFERENCES_ANALYTIC, REL_REFERENCES_DATA_COMPONENT,
};
pub use navigator::{export_layer, LayerExport};
pub use query::{
    entity_details, explore, list_by_tactic, search, technique_detail, technique_profile,
    Direction, EntityDetails, ExploreItem, SearchHit, TacticPage, TechniqueDetail,
    TechniqueDetailKind, TechniqueProfile,
};
pub use resolver::resolve;
pub use store::{BundleProvider, KnowledgeBase};
