//! Per-transaction node cache.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use tracing::trace;

use super::{GraphError, GraphNode, GraphTransaction, NodeId};

/// Caches node contents for the life of one query's transaction.
///
/// Never shared between queries. Anything that mutates a node (adding or
/// removing scratch walks) must call [`invalidate`](Self::invalidate).
pub struct CachedNodes<'t, T: GraphTransaction + ?Sized> {
    txn: &'t T,
    nodes: RefCell<HashMap<NodeId<'t>, GraphNode<'t>>>,
    hits: Cell<u64>,
    misses: Cell<u64>,
}

impl<'t, T: GraphTransaction + ?Sized> CachedNodes<'t, T> {
    pub fn new(txn: &'t T) -> Self {
        Self {
            txn,
            nodes: RefCell::new(HashMap::new()),
            hits: Cell::new(0),
            misses: Cell::new(0),
        }
    }

    pub fn txn(&self) -> &'t T {
        self.txn
    }

    pub fn get(&self, id: NodeId<'t>) -> Result<GraphNode<'t>, GraphError> {
        if let Some(node) = self.nodes.borrow().get(&id) {
            self.hits.set(self.hits.get() + 1);
            return Ok(node.clone());
        }
        self.misses.set(self.misses.get() + 1);
        let node = self.txn.node(id)?;
        self.nodes.borrow_mut().insert(id, node.clone());
        Ok(node)
    }

    pub fn invalidate(&self, id: NodeId<'t>) {
        if self.nodes.borrow_mut().remove(&id).is_some() {
            trace!(node = %id, "invalidated cached node");
        }
    }

    /// (hits, misses) since creation.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits.get(), self.misses.get())
    }
}
