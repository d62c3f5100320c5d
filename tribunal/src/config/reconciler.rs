//! Configuration reconciliation — local cache vs. authoritative remote.

use async_trait::async_trait;
use tracing::{debug, info};

use super::{ConfigError, ConfigStore, NodeConfig, StoredConfig, NODE_COUNT};

/// Authoritative remote configuration source.
#[async_trait]
pub trait RemoteConfigSource: Send + Sync {
    /// Fetch the remote node list; `None` when the remote has no opinion.
    async fn fetch(&self) -> Result<Option<Vec<NodeConfig>>, ConfigError>;
}

/// A fixed remote answer, for tests and offline embedding.
#[derive(Debug, Clone, Default)]
pub struct StaticRemote {
    nodes: Option<Vec<NodeConfig>>,
}

impl StaticRemote {
    /// A remote with no opinion.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A remote answering with the given nodes.
    pub fn with_nodes(nodes: Vec<NodeConfig>) -> Self {
        Self { nodes: Some(nodes) }
    }
}

#[async_trait]
impl RemoteConfigSource for StaticRemote {
    async fn fetch(&self) -> Result<Option<Vec<NodeConfig>>, ConfigError> {
        Ok(self.nodes.clone())
    }
}

/// Resolves the three worker identities consumed at session start.
///
/// Called once before a session opens; the resolved configuration is
/// immutable for the session's duration.
pub struct ConfigReconciler<S, R> {
    store: S,
    remote: R,
}

impl<S: ConfigStore, R: RemoteConfigSource> ConfigReconciler<S, R> {
    pub fn new(store: S, remote: R) -> Self {
        Self { store, remote }
    }

    /// Resolve the worker configuration.
    ///
    /// Merge order per slot: remote > local cache > built-in default.
    /// The reconciled result is persisted back to the store.
    pub async fn resolve_worker_config(&self) -> Result<[NodeConfig; NODE_COUNT], ConfigError> {
        let local = self
            .store
            .load()?
            .map(StoredConfig::normalize)
            .unwrap_or_else(NodeConfig::default_trio);

        let remote = self.remote.fetch().await?;

        let merged = match remote {
            Some(remote_nodes) => {
                debug!(count = remote_nodes.len(), "merging remote configuration");
                merge(local, remote_nodes)
            }
            None => local,
        };

        self.store.save(&merged)?;
        info!(
            engines = ?merged.iter().map(|n| n.engine.as_str()).collect::<Vec<_>>(),
            "worker configuration reconciled"
        );
        Ok(merged)
    }
}

/// Per-slot merge: the remote entry wins whenever it exists.
fn merge(local: [NodeConfig; NODE_COUNT], remote: Vec<NodeConfig>) -> [NodeConfig; NODE_COUNT] {
    std::array::from_fn(|i| {
        remote
            .get(i)
            .cloned()
            .map(|mut node| {
                node.id = (i + 1) as u8;
                node
            })
            .unwrap_or_else(|| local[i].clone())
    })
}
