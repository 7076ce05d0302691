//! Scratch walk nodes for position-based queries.

use std::rc::Rc;

use chrono::Duration;
use tracing::{debug, warn};

use crate::domain::LatLong;
use crate::graph::{CachedNodes, EdgeType, GraphError, GraphTransaction, NodeId};

/// Query nodes and walk relationships added to one transaction.
///
/// Everything added is removed again when the guard drops, whichever way the
/// query ends. Nodes whose relationships changed are evicted from the node
/// cache both when walks are added and when they are removed.
pub struct WalkNodes<'t, T: GraphTransaction + ?Sized> {
    nodes: Rc<CachedNodes<'t, T>>,
    created: Vec<NodeId<'t>>,
    touched: Vec<NodeId<'t>>,
}

impl<'t, T: GraphTransaction + ?Sized> WalkNodes<'t, T> {
    pub fn new(nodes: Rc<CachedNodes<'t, T>>) -> Self {
        Self {
            nodes,
            created: Vec::new(),
            touched: Vec::new(),
        }
    }

    /// A query node at `position` with a walk out to each station.
    pub fn walk_out(
        &mut self,
        position: LatLong,
        stations: &[(NodeId<'t>, Duration)],
    ) -> Result<NodeId<'t>, GraphError> {
        self.add(position, stations, EdgeType::WalksToStation)
    }

    /// A query node at `position` with a walk in from each station.
    pub fn walk_in(
        &mut self,
        position: LatLong,
        stations: &[(NodeId<'t>, Duration)],
    ) -> Result<NodeId<'t>, GraphError> {
        self.add(position, stations, EdgeType::WalksFromStation)
    }

    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
    }

    fn add(
        &mut self,
        position: LatLong,
        stations: &[(NodeId<'t>, Duration)],
        kind: EdgeType,
    ) -> Result<NodeId<'t>, GraphError> {
        let txn = self.nodes.txn();
        let query = txn.create_query_node(position)?;
        self.created.push(query);
        for (station, cost) in stations {
            let (from, to) = match kind {
                EdgeType::WalksFromStation => (*station, query),
                _ => (query, *station),
            };
            txn.create_walk(from, to, kind, *cost)?;
            self.nodes.invalidate(*station);
            self.touched.push(*station);
        }
        debug!(node = %query, walks = stations.len(), ?kind, "added walk node");
        Ok(query)
    }
}

impl<T: GraphTransaction + ?Sized> Drop for WalkNodes<'_, T> {
    fn drop(&mut self) {
        let txn = self.nodes.txn();
        for node in self.created.drain(..) {
            if let Err(e) = txn.delete_node(node) {
                warn!(node = %node, error = %e, "failed to remove walk node");
            }
            self.nodes.invalidate(node);
        }
        for node in self.touched.drain(..) {
            self.nodes.invalidate(node);
        }
    }
}
