//! Dense route numbering for the interchange matrix.

use std::collections::HashMap;

use crate::domain::RouteId;
use crate::network::TransitData;

/// Maps each route to a dense index, ordered by route id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteIndex {
    routes: Vec<RouteId>,
    positions: HashMap<RouteId, usize>,
}

impl RouteIndex {
    pub fn from_transit(data: &TransitData) -> Self {
        Self::from_routes(data.routes().map(|r| r.id.clone()))
    }

    pub fn from_routes(routes: impl IntoIterator<Item = RouteId>) -> Self {
        let mut routes: Vec<RouteId> = routes.into_iter().collect();
        routes.sort();
        routes.dedup();
        let positions = routes
            .iter()
            .enumerate()
            .map(|(i, r)| (r.clone(), i))
            .collect();
        Self { routes, positions }
    }

    pub fn index_of(&self, route: &RouteId) -> Option<usize> {
        self.positions.get(route).copied()
    }

    pub fn route_at(&self, index: usize) -> Option<&RouteId> {
        self.routes.get(index)
    }

    pub fn pair(&self, first: &RouteId, second: &RouteId) -> Option<RouteIndexPair> {
        Some(RouteIndexPair {
            first: self.index_of(first)?,
            second: self.index_of(second)?,
        })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Route ids in index order; a saved matrix is only valid for an
    /// identical list.
    pub fn fingerprint(&self) -> Vec<String> {
        self.routes.iter().map(|r| r.as_str().to_string()).collect()
    }
}

/// An ordered pair of route indexes. Order matters: changes from `first`
/// to `second` need not equal changes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteIndexPair {
    pub first: usize,
    pub second: usize,
}

impl RouteIndexPair {
    pub fn of(first: usize, second: usize) -> Self {
        Self { first, second }
    }

    pub fn is_same(&self) -> bool {
        self.first == self.second
    }
}
