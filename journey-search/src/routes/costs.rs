//! Minimum changes between routes and between sets of stations.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use fixedbitset::FixedBitSet;
use tracing::{debug, info, warn};

use super::cache::MatrixCache;
use super::matrix::UNREACHABLE;
use super::{RouteCostMatrix, RouteIndex, RouteIndexPair};
use crate::domain::{RouteId, StationId, TimeRange, TransportMode};
use crate::network::TransitData;

/// Range of changes worth searching between two locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberOfChanges {
    pub min: u8,
    pub max: u8,
}

impl NumberOfChanges {
    pub fn new(min: u8, max: u8) -> Self {
        Self { min, max }
    }
}

impl fmt::Display for NumberOfChanges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.min, self.max)
    }
}

/// Route-level change counts backed by the interchange matrix.
///
/// Cheap to clone; the matrix and index are shared.
#[derive(Debug, Clone)]
pub struct RouteToRouteCosts {
    data: Arc<TransitData>,
    index: Arc<RouteIndex>,
    matrix: Arc<RouteCostMatrix>,
}

impl RouteToRouteCosts {
    /// Build the matrix for `data`, or load it from `cache` when a matching
    /// one was saved. A freshly built matrix is written back to the cache.
    pub fn new(data: Arc<TransitData>, max_depth: usize, cache: Option<&MatrixCache>) -> Self {
        let index = RouteIndex::from_transit(&data);

        let loaded = cache.and_then(|c| c.load(&index));
        let matrix = match loaded {
            Some(matrix) => {
                info!(routes = index.len(), depth = matrix.depth(), "loaded route interchange matrix");
                matrix
            }
            None => {
                let matrix = RouteCostMatrix::build(&data, &index, max_depth);
                if let Some(cache) = cache
                    && let Err(e) = cache.save(&index, &matrix)
                {
                    warn!(path = %cache.path().display(), error = %e, "failed to save matrix cache");
                }
                matrix
            }
        };

        Self {
            data,
            index: Arc::new(index),
            matrix: Arc::new(matrix),
        }
    }

    pub fn index(&self) -> &RouteIndex {
        &self.index
    }

    pub fn matrix(&self) -> &RouteCostMatrix {
        &self.matrix
    }

    /// Fewest changes from `a` to `b` on `date`, or [`UNREACHABLE`].
    pub fn changes_between(
        &self,
        a: &RouteId,
        b: &RouteId,
        date: NaiveDate,
        modes: &BTreeSet<TransportMode>,
    ) -> u8 {
        let Some(pair) = self.index.pair(a, b) else {
            return UNREACHABLE;
        };
        let mask = self.mask(date, modes);
        self.matrix.changes_between(pair, &mask)
    }

    /// The range of changes between any start and any destination station.
    ///
    /// Only routes picking up at a start (or dropping off at a destination)
    /// within `range` on `date` are considered. Neighbouring locations need
    /// exactly one connection. Boarding after a diversion is free, so the
    /// minimum drops by one for every diversion open on `date`. Returns
    /// `None` when no start route connects to any destination route.
    pub fn number_of_changes(
        &self,
        starts: &[StationId],
        destinations: &[StationId],
        date: NaiveDate,
        range: TimeRange,
        modes: &BTreeSet<TransportMode>,
    ) -> Option<NumberOfChanges> {
        if self.data.are_neighbours(starts, destinations) {
            debug!("start and destination are neighbours");
            return Some(NumberOfChanges::new(1, 1));
        }

        let pickups = self.routes_at(starts, modes, |s| self.data.pickup_routes_for(s, date, range));
        let dropoffs =
            self.routes_at(destinations, modes, |s| self.data.dropoff_routes_for(s, date, range));

        if pickups.is_empty() {
            warn!(%date, %range, "start stations have no matching pick-up routes");
            return None;
        }
        if dropoffs.is_empty() {
            warn!(%date, %range, "destination stations have no matching drop-off routes");
            return None;
        }

        let mask = self.mask(date, modes);
        let mut min = UNREACHABLE;
        let mut max = None;
        for start in &pickups {
            for dest in &dropoffs {
                let changes = self.matrix.changes_between(RouteIndexPair::of(*start, *dest), &mask);
                min = min.min(changes);
                if changes != UNREACHABLE {
                    max = Some(max.map_or(changes, |m: u8| m.max(changes)));
                }
            }
        }

        let discount = self.diversion_discount(date);
        let result = max.map(|max| NumberOfChanges::new(min.saturating_sub(discount), max));
        debug!(
            pickups = pickups.len(),
            dropoffs = dropoffs.len(),
            changes = ?result,
            "computed number of changes"
        );
        result
    }

    /// Ranking of routes by distance to the routes serving `destinations`.
    pub fn lowest_costs_for(
        &self,
        destinations: &[StationId],
        date: NaiveDate,
        range: TimeRange,
        modes: &BTreeSet<TransportMode>,
    ) -> LowestCostsForDestRoutes {
        let routes =
            self.routes_at(destinations, modes, |s| self.data.dropoff_routes_for(s, date, range));
        LowestCostsForDestRoutes {
            index: Arc::clone(&self.index),
            matrix: Arc::clone(&self.matrix),
            mask: self.mask(date, modes),
            destinations: routes,
            discount: self.diversion_discount(date),
        }
    }

    /// Changes a journey on `date` can save by taking diversions, at most one
    /// per open diversion.
    fn diversion_discount(&self, date: NaiveDate) -> u8 {
        u8::try_from(self.data.diversions_on(date).count()).unwrap_or(u8::MAX)
    }

    fn mask(&self, date: NaiveDate, modes: &BTreeSet<TransportMode>) -> FixedBitSet {
        self.matrix.overlap_mask_for(&self.data, &self.index, date, modes)
    }

    fn routes_at(
        &self,
        stations: &[StationId],
        modes: &BTreeSet<TransportMode>,
        routes_for: impl Fn(&StationId) -> BTreeSet<RouteId>,
    ) -> BTreeSet<usize> {
        stations
            .iter()
            .flat_map(routes_for)
            .filter(|r| self.data.route(r).is_some_and(|route| modes.contains(&route.mode)))
            .filter_map(|r| self.index.index_of(&r))
            .collect()
    }
}

/// Fewest changes from any route to the routes serving one set of
/// destinations, for one date.
#[derive(Debug, Clone)]
pub struct LowestCostsForDestRoutes {
    index: Arc<RouteIndex>,
    matrix: Arc<RouteCostMatrix>,
    mask: FixedBitSet,
    destinations: BTreeSet<usize>,
    discount: u8,
}

impl LowestCostsForDestRoutes {
    /// Number of routes dropping off at the destinations.
    pub fn destination_routes(&self) -> usize {
        self.destinations.len()
    }

    /// 0 for a destination route, else the fewest changes to reach one, or
    /// [`UNREACHABLE`]. Lowered by the changes diversions can save.
    pub fn fewest_changes(&self, route: &RouteId) -> u8 {
        let Some(start) = self.index.index_of(route) else {
            return UNREACHABLE;
        };
        if self.destinations.contains(&start) {
            return 0;
        }
        let fewest = self
            .destinations
            .iter()
            .map(|dest| self.matrix.changes_between(RouteIndexPair::of(start, *dest), &self.mask))
            .min()
            .unwrap_or(UNREACHABLE);
        if fewest == UNREACHABLE {
            fewest
        } else {
            fewest.saturating_sub(self.discount)
        }
    }

    /// Stable sort of `items` so routes closest to a destination come first.
    pub fn sort_by_destinations<T>(&self, items: &mut [T], route_of: impl Fn(&T) -> Option<&RouteId>) {
        items.sort_by_cached_key(|item| route_of(item).map_or(UNREACHABLE, |r| self.fewest_changes(r)));
    }
}
