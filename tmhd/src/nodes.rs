//! Peer node bookkeeping.
//!
//! Nodes are recorded for visibility when the upstream controller reports
//! them joining or leaving. Session logic never consults this registry.

use std::collections::HashMap;
use std::sync::Arc;
use tmh_common::{NodeId, NodeInfo};
use tokio::sync::RwLock;
use tracing::info;

/// Registry of currently connected peer nodes.
#[derive(Clone, Default)]
pub struct NodeRegistry {
    nodes: Arc<RwLock<HashMap<NodeId, NodeInfo>>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly joined node.
    pub async fn add(&self, node: NodeInfo) {
        info!("Added node: {}, local: {}", node.id, node.local);
        let mut nodes = self.nodes.write().await;
        nodes.insert(node.id.clone(), node);
    }

    /// Remove a node that left or was lost.
    pub async fn remove(&self, id: &NodeId, reason: &str) {
        let mut nodes = self.nodes.write().await;
        if nodes.remove(id).is_some() {
            info!("Node {id} removed, reason: {reason}");
        }
    }

    /// Look up a node by id.
    pub async fn get(&self, id: &NodeId) -> Option<NodeInfo> {
        let nodes = self.nodes.read().await;
        nodes.get(id).cloned()
    }

    /// Number of tracked nodes.
    pub async fn len(&self) -> usize {
        let nodes = self.nodes.read().await;
        nodes.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
