//! Route-level interchange costs.
//!
//! Answers "how many changes at least" questions without touching the graph,
//! so the search can bound and order its branches.

mod cache;
mod costs;
mod error;
mod index;
mod matrix;

pub use cache::{MatrixCache, MatrixCacheConfig};
pub use costs::{LowestCostsForDestRoutes, NumberOfChanges, RouteToRouteCosts};
pub use error::MatrixError;
pub use index::{RouteIndex, RouteIndexPair};
pub use matrix::{MAX_DEPTH, RouteCostMatrix, UNREACHABLE};
