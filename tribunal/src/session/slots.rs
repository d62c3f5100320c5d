//! Slot identities and the worker-label lookup table.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::NodeConfig;

/// One of the three fixed worker slots in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotId {
    One,
    Two,
    Three,
}

impl SlotId {
    /// All slots in fixed order.
    pub fn all() -> [SlotId; 3] {
        [Self::One, Self::Two, Self::Three]
    }

    /// Zero-based array index.
    pub fn index(self) -> usize {
        match self {
            Self::One => 0,
            Self::Two => 1,
            Self::Three => 2,
        }
    }

    /// One-based ordinal.
    pub fn ordinal(self) -> u8 {
        self.index() as u8 + 1
    }

    /// Slot for a zero-based index.
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::One),
            1 => Some(Self::Two),
            2 => Some(Self::Three),
            _ => None,
        }
    }
}

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "slot_{}", self.ordinal())
    }
}

/// Case-insensitive worker-label lookup table, built at session start.
///
/// Each slot is reachable under its node display name, its engine
/// identity, and the generic `node N` / `ai N` aliases. Labels that miss
/// the table fall back to a normalized (lower-cased, alphanumeric-only)
/// comparison to tolerate naming drift across protocol revisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotTable {
    labels: HashMap<String, SlotId>,
    normalized: HashMap<String, SlotId>,
}

impl SlotTable {
    /// Build the table for three bound nodes.
    pub fn new(nodes: &[NodeConfig; 3]) -> Self {
        let mut labels = HashMap::new();
        let mut normalized = HashMap::new();

        for (slot, node) in SlotId::all().into_iter().zip(nodes.iter()) {
            let aliases = [
                node.name.clone(),
                node.engine.clone(),
                format!("node {}", slot.ordinal()),
                format!("ai {}", slot.ordinal()),
            ];
            for alias in aliases {
                // First binding wins so earlier slots keep shared labels.
                labels.entry(alias.trim().to_lowercase()).or_insert(slot);
                normalized.entry(normalize(&alias)).or_insert(slot);
            }
        }

        Self { labels, normalized }
    }

    /// Resolve a worker label to its slot.
    pub fn resolve(&self, label: &str) -> Option<SlotId> {
        if let Some(slot) = self.labels.get(&label.trim().to_lowercase()) {
            return Some(*slot);
        }
        self.normalized.get(&normalize(label)).copied()
    }
}

/// Lower-case and strip everything non-alphanumeric.
fn normalize(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}
