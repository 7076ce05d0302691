//! The graph store seam.
//!
//! The search only talks to the graph through these two traits. A database
//! hands out transactions; a transaction resolves handles to node and
//! relationship contents and owns any scratch nodes a query adds.

use chrono::Duration;

use super::{Direction, EdgeType, GraphError, GraphNode, GraphRelationship, NodeId, RelationshipId};
use crate::domain::{LatLong, LocationId};

/// A graph store shared between concurrent queries.
pub trait GraphDatabase: Send + Sync {
    type Txn<'db>: GraphTransaction
    where
        Self: 'db;

    /// Begin a transaction. Each concurrent query needs its own.
    fn begin_tx(&self) -> Result<Self::Txn<'_>, GraphError>;
}

/// One transaction against a [`GraphDatabase`].
///
/// Handles returned by a transaction borrow it, so they cannot escape it.
/// Mutating operations take `&self`; they touch only state private to the
/// transaction, which makes transactions unsuitable for sharing between
/// threads.
pub trait GraphTransaction {
    /// Look up the node for a station or station group.
    fn find_node(&self, location: &LocationId) -> Result<Option<NodeId<'_>>, GraphError>;

    fn node<'a>(&'a self, id: NodeId<'a>) -> Result<GraphNode<'a>, GraphError>;

    /// Relationships attached to `node` in `direction`, restricted to `types`
    /// (all types when `types` is empty), in a stable order.
    fn relationships<'a>(
        &'a self,
        node: NodeId<'a>,
        direction: Direction,
        types: &[EdgeType],
    ) -> Result<Vec<GraphRelationship<'a>>, GraphError>;

    /// Add a scratch query node at a position.
    fn create_query_node(&self, position: LatLong) -> Result<NodeId<'_>, GraphError>;

    /// Add a scratch walk relationship.
    fn create_walk<'a>(
        &'a self,
        from: NodeId<'a>,
        to: NodeId<'a>,
        kind: EdgeType,
        cost: Duration,
    ) -> Result<RelationshipId<'a>, GraphError>;

    /// Remove a scratch node and every relationship attached to it.
    fn delete_node<'a>(&'a self, node: NodeId<'a>) -> Result<(), GraphError>;

    fn commit(self) -> Result<(), GraphError>
    where
        Self: Sized;

    fn close(self)
    where
        Self: Sized;
}
