//! Graph handle layer.
//!
//! The search walks a time-expanded transit graph through the
//! [`GraphDatabase`] / [`GraphTransaction`] traits. Node and relationship
//! handles are branded with the transaction borrow that produced them.
//! [`memory`] provides an in-memory store built from a timetable.

mod cached;
mod db;
mod element;
mod error;
mod handle;
mod labels;
pub mod memory;

pub use cached::CachedNodes;
pub use db::{GraphDatabase, GraphTransaction};
pub use element::{GraphNode, GraphRelationship, NodeProps, RelProps};
pub use error::GraphError;
pub use handle::{NodeId, RelationshipId};
pub use labels::{Direction, EdgeType, GraphLabel, Labels};
