//! Swappable knowledge store with atomic publish-on-rebuild.
//!
//! The graph is built into a fresh structure and published with a single
//! reference swap; readers snapshot the current `Arc` and keep it for the
//! lifetime of their query, so a rebuild never changes a graph mid-query.
//! Rebuilds are serialized through an async mutex; a failed rebuild leaves
//! the previously published graph serving.

use crate::error::{AtlasError, AtlasResult};
use crate::graph::{build_graph, AttackGraph};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info};

/// Source of verified bundle bytes.
///
/// Implementations own transport and integrity concerns; bytes handed back
/// are ready to parse. The store never sees a URL or a digest.
#[async_trait]
pub trait BundleProvider: Send + Sync {
    async fn fetch_verified(&self) -> AtlasResult<Vec<u8>>;
}

/// The current graph plus rebuild coordination.
pub struct KnowledgeBase {
    provider: Arc<dyn BundleProvider>,
    current: RwLock<Option<Arc<AttackGraph>>>,
    rebuild_gate: Mutex<()>,
    last_built: RwLock<Option<DateTime<Utc>>>,
}

impl KnowledgeBase {
    pub fn new(provider: Arc<dyn BundleProvider>) -> Self {
        Self {
            provider,
            current: RwLock::new(None),
            rebuild_gate: Mutex::new(()),
            last_built: RwLock::new(None),
        }
    }

    /// Snapshot of the current graph, if one has been built.
    pub async fn snapshot(&self) -> Option<Arc<AttackGraph>> {
        self.current.read().await.clone()
    }

    /// Snapshot of the current graph, building lazily on first use.
    pub async fn graph(&self) -> AtlasResult<Arc<AttackGraph>> {
        if let Some(graph) = self.snapshot().await {
            return Ok(graph);
        }
        self.rebuild().await?;
        self.snapshot().await.ok_or(AtlasError::NotInitialized)
    }

    /// Fetches, verifies, and builds a fresh graph, then publishes it.
    ///
    /// At most one rebuild runs at a time; concurrent callers queue on the
    /// gate. Any failure before the final swap leaves the previous graph
    /// untouched and still serving.
    pub async fn rebuild(&self) -> AtlasResult<()> {
        let _gate = self.rebuild_gate.lock().await;

        info!("Rebuilding knowledge graph");
        let bytes = self.provider.fetch_verified().await.map_err(|e| {
            error!(error = %e, "Bundle fetch failed; keeping previous graph");
            e
        })?;

        let graph = build_graph(&bytes).map_err(|e| {
            error!(error = %e, "Graph build failed; keeping previous graph");
            e
        })?;

        let graph = Arc::new(graph);
        *self.current.write().await = Some(graph.clone());
        *self.last_built.write().await = Some(Utc::now());

        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Knowledge graph published"
        );
        Ok(())
    }

    /// The dataset's own modification timestamp, or `"Unknown"`.
    pub async fn dataset_version(&self) -> String {
        self.snapshot()
            .await
            .and_then(|g| g.version().map(str::to_string))
            .unwrap_or_else(|| "Unknown".to_string())
    }

    /// When the current graph was built, if ever.
    pub async fn last_built(&self) -> Option<DateTime<Utc>> {
        *self.last_built.read().await
    }
}
