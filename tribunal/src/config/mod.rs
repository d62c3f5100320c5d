//! Worker configuration — node identities and reconciliation.
//!
//! A session binds each of its three slots to a node (display name,
//! engine identity, optional model, persona identity). The reconciler
//! merges a locally cached configuration with the authoritative remote
//! one, remote winning on mismatch, and persists the reconciled result.
//! Storage tolerates both the legacy keyed shape (`node1`..`node3`) and
//! the normalized `nodes` array.

pub mod reconciler;
pub mod store;

use serde::{Deserialize, Serialize};

pub use reconciler::{ConfigReconciler, RemoteConfigSource, StaticRemote};
pub use store::{JsonFileStore, MemoryStore};

/// Number of worker slots in every session.
pub const NODE_COUNT: usize = 3;

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    ReadFailed(String),
    #[error("failed to write configuration: {0}")]
    WriteFailed(String),
    #[error("remote configuration unavailable: {0}")]
    RemoteFailed(String),
}

/// One worker node: the identity bound to a session slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Slot ordinal, 1-based.
    pub id: u8,
    /// Display name, also used as a worker label on the stream.
    pub name: String,
    /// Engine identity (e.g. `claude`, `gemini`, `chatgpt`).
    pub engine: String,
    /// Model override; `None` means the engine default.
    #[serde(default)]
    pub model: Option<String>,
    /// Persona identity submitted with the judgment request.
    pub persona_id: String,
}

impl NodeConfig {
    /// The built-in default trio.
    pub fn default_trio() -> [NodeConfig; NODE_COUNT] {
        let engines = ["claude", "gemini", "chatgpt"];
        std::array::from_fn(|i| NodeConfig {
            id: (i + 1) as u8,
            name: format!("NODE {}", i + 1),
            engine: engines[i].to_string(),
            model: None,
            persona_id: "neutral".to_string(),
        })
    }
}

/// Legacy per-node storage record (no name; id implied by the key).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyNode {
    pub engine: String,
    #[serde(default)]
    pub model: Option<String>,
    pub persona_id: String,
}

/// A stored configuration in either supported shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredConfig {
    /// The normalized array shape.
    Normalized { nodes: Vec<NodeConfig> },
    /// The legacy keyed shape.
    Legacy {
        node1: LegacyNode,
        node2: LegacyNode,
        node3: LegacyNode,
    },
}

impl StoredConfig {
    /// Normalize to exactly three nodes.
    ///
    /// Extra array entries are dropped; missing ones are filled from the
    /// default trio. Ids are forced to the slot ordinal and blank names
    /// get the default display name.
    pub fn normalize(self) -> [NodeConfig; NODE_COUNT] {
        let defaults = NodeConfig::default_trio();
        match self {
            Self::Normalized { nodes } => std::array::from_fn(|i| {
                nodes
                    .get(i)
                    .cloned()
                    .map(|mut node| {
                        node.id = (i + 1) as u8;
                        if node.name.trim().is_empty() {
                            node.name = defaults[i].name.clone();
                        }
                        node
                    })
                    .unwrap_or_else(|| defaults[i].clone())
            }),
            Self::Legacy {
                node1,
                node2,
                node3,
            } => {
                let legacy = [node1, node2, node3];
                std::array::from_fn(|i| NodeConfig {
                    id: (i + 1) as u8,
                    name: defaults[i].name.clone(),
                    engine: legacy[i].engine.clone(),
                    model: legacy[i].model.clone(),
                    persona_id: legacy[i].persona_id.clone(),
                })
            }
        }
    }
}

/// Store for the locally cached configuration.
pub trait ConfigStore: Send + Sync {
    /// Load the cached configuration, if any.
    fn load(&self) -> Result<Option<StoredConfig>, ConfigError>;
    /// Persist a reconciled configuration.
    fn save(&self, nodes: &[NodeConfig; NODE_COUNT]) -> Result<(), ConfigError>;
}

impl<S: ConfigStore + ?Sized> ConfigStore for &S {
    fn load(&self) -> Result<Option<StoredConfig>, ConfigError> {
        (**self).load()
    }

    fn save(&self, nodes: &[NodeConfig; NODE_COUNT]) -> Result<(), ConfigError> {
        (**self).save(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_trio() {
        let trio = NodeConfig::default_trio();
        assert_eq!(trio.len(), 3);
        assert_eq!(trio[0].id, 1);
        assert_eq!(trio[0].engine, "claude");
        assert_eq!(trio[2].name, "NODE 3");
        assert!(trio.iter().all(|n| n.model.is_none()));
    }

    #[test]
    fn test_normalize_legacy_shape() {
        let json = r#"{
            "node1": {"engine": "claude", "model": null, "persona_id": "skeptic"},
            "node2": {"engine": "gemini", "persona_id": "advocate"},
            "node3": {"engine": "chatgpt", "model": "gpt-4o", "persona_id": "neutral"}
        }"#;
        let stored: StoredConfig = serde_json::from_str(json).unwrap();
        let nodes = stored.normalize();
        assert_eq!(nodes[0].persona_id, "skeptic");
        assert_eq!(nodes[1].name, "NODE 2");
        assert_eq!(nodes[2].model.as_deref(), Some("gpt-4o"));
        assert_eq!(nodes[2].id, 3);
    }

    #[test]
    fn test_normalize_array_shape() {
        let json = r#"{"nodes": [
            {"id": 9, "name": "Primary", "engine": "claude", "persona_id": "skeptic"}
        ]}"#;
        let stored: StoredConfig = serde_json::from_str(json).unwrap();
        let nodes = stored.normalize();
        // Id forced to the slot ordinal; missing slots filled from defaults.
        assert_eq!(nodes[0].id, 1);
        assert_eq!(nodes[0].name, "Primary");
        assert_eq!(nodes[1], NodeConfig::default_trio()[1]);
        assert_eq!(nodes[2], NodeConfig::default_trio()[2]);
    }

    #[test]
    fn test_normalize_blank_name_gets_default() {
        let stored = StoredConfig::Normalized {
            nodes: vec![NodeConfig {
                id: 1,
                name: "  ".to_string(),
                engine: "claude".to_string(),
                model: None,
                persona_id: "neutral".to_string(),
            }],
        };
        assert_eq!(stored.normalize()[0].name, "NODE 1");
    }

    #[test]
    fn test_normalize_drops_extra_nodes() {
        let mut nodes = NodeConfig::default_trio().to_vec();
        nodes.push(NodeConfig {
            id: 4,
            name: "NODE 4".to_string(),
            engine: "claude".to_string(),
            model: None,
            persona_id: "neutral".to_string(),
        });
        let stored = StoredConfig::Normalized { nodes };
        assert_eq!(stored.normalize().len(), 3);
    }
}
