//! Route-to-route interchange matrix.
//!
//! Degree `d` holds, for every route, the set of routes reachable with
//! exactly `d` changes and no fewer. Degree 1 comes straight from
//! interchange stations; each further degree extends the previous one by a
//! single interchange. Route calendars that never share a date are masked
//! out at every degree.
//!
//! Lookups never re-check the availability of intermediate routes, so a
//! depth is a lower bound on the true number of changes.
//!
//! The built depth is a hard limit. Pairs further apart are reported as
//! [`UNREACHABLE`] and the planner refuses them, so a query can never need
//! more changes than the matrix was built for.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use fixedbitset::FixedBitSet;
use tracing::{debug, info};

use super::{RouteIndex, RouteIndexPair};
use crate::domain::{RouteId, TransportMode};
use crate::network::TransitData;

/// Deepest degree ever built.
pub const MAX_DEPTH: usize = 5;

/// Reported for route pairs with no connection within the built depth,
/// whether or not a deeper one exists.
pub const UNREACHABLE: u8 = u8::MAX;

/// Bitset-per-degree reachability between routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteCostMatrix {
    size: usize,
    overlaps: Vec<FixedBitSet>,
    degrees: Vec<Vec<FixedBitSet>>,
}

impl RouteCostMatrix {
    /// Build the matrix up to `max_depth` degrees (capped at [`MAX_DEPTH`]).
    pub fn build(data: &TransitData, index: &RouteIndex, max_depth: usize) -> Self {
        let size = index.len();
        let max_depth = max_depth.clamp(1, MAX_DEPTH);

        let overlaps = overlap_rows(data, index);
        let first = first_degree(data, index, &overlaps);
        let mut matrix = Self {
            size,
            overlaps,
            degrees: vec![first],
        };

        // reached[a] = a itself plus everything at any degree so far
        let mut reached: Vec<FixedBitSet> = (0..size)
            .map(|a| {
                let mut row = matrix.degrees[0][a].clone();
                row.grow(size);
                row.insert(a);
                row
            })
            .collect();

        while matrix.degrees.len() < max_depth {
            let Some(next) = matrix.next_degree(&reached) else {
                break;
            };
            for (row, new) in reached.iter_mut().zip(&next) {
                row.union_with(new);
            }
            matrix.degrees.push(next);

            if reached.iter().all(|row| row.count_ones(..) == size) {
                debug!(depth = matrix.degrees.len(), "interchange matrix fully connected");
                break;
            }
        }

        info!(
            routes = size,
            depth = matrix.degrees.len(),
            "built route interchange matrix"
        );
        matrix
    }

    /// The next degree, or `None` if it adds nothing.
    fn next_degree(&self, reached: &[FixedBitSet]) -> Option<Vec<FixedBitSet>> {
        let first = &self.degrees[0];
        let previous = self.degrees.last()?;
        let mut improved = false;

        let next: Vec<FixedBitSet> = (0..self.size)
            .map(|a| {
                let mut row = FixedBitSet::with_capacity(self.size);
                for via in previous[a].ones() {
                    row.union_with(&first[via]);
                }
                row.intersect_with(&self.overlaps[a]);
                row.difference_with(&reached[a]);
                improved |= !row.is_clear();
                row
            })
            .collect();

        improved.then_some(next)
    }

    pub(crate) fn from_parts(
        size: usize,
        overlaps: Vec<FixedBitSet>,
        degrees: Vec<Vec<FixedBitSet>>,
    ) -> Self {
        Self {
            size,
            overlaps,
            degrees,
        }
    }

    pub(crate) fn overlaps(&self) -> &[FixedBitSet] {
        &self.overlaps
    }

    pub(crate) fn degrees(&self) -> &[Vec<FixedBitSet>] {
        &self.degrees
    }

    /// Number of routes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of degrees built.
    pub fn depth(&self) -> usize {
        self.degrees.len()
    }

    /// Routes available on `date` with one of `modes`.
    ///
    /// Lookups treat a route outside the mask as unreachable.
    pub fn overlap_mask_for(
        &self,
        data: &TransitData,
        index: &RouteIndex,
        date: NaiveDate,
        modes: &BTreeSet<TransportMode>,
    ) -> FixedBitSet {
        let mut mask = FixedBitSet::with_capacity(self.size);
        for route in data.routes() {
            if !modes.contains(&route.mode) || !data.route_operates_on(&route.id, date) {
                continue;
            }
            if let Some(i) = index.index_of(&route.id) {
                mask.insert(i);
            }
        }
        mask
    }

    /// Fewest changes from `pair.first` to `pair.second`.
    ///
    /// The same route is 0; a route outside `mask`, or a pair not connected
    /// within the built depth, is [`UNREACHABLE`].
    pub fn changes_between(&self, pair: RouteIndexPair, mask: &FixedBitSet) -> u8 {
        if pair.is_same() {
            return 0;
        }
        if !mask.contains(pair.first) || !mask.contains(pair.second) {
            return UNREACHABLE;
        }
        self.degrees
            .iter()
            .position(|degree| degree[pair.first].contains(pair.second))
            .map_or(UNREACHABLE, |d| (d + 1) as u8)
    }
}

/// Route pairs whose calendars share a possible operating date.
fn overlap_rows(data: &TransitData, index: &RouteIndex) -> Vec<FixedBitSet> {
    let size = index.len();
    (0..size)
        .map(|a| {
            let mut row = FixedBitSet::with_capacity(size);
            let Some(route_a) = index.route_at(a) else {
                return row;
            };
            for b in 0..size {
                let overlaps = index
                    .route_at(b)
                    .is_some_and(|route_b| data.routes_overlap(route_a, route_b));
                row.set(b, overlaps);
            }
            row
        })
        .collect()
}

/// Direct changes: drop-off route at an interchange to a pick-up route at the
/// same station or at one of its neighbours, and drop-off route at the start
/// of a diversion to a pick-up route at its end, whatever its dates.
fn first_degree(data: &TransitData, index: &RouteIndex, overlaps: &[FixedBitSet]) -> Vec<FixedBitSet> {
    let size = index.len();
    let mut rows = vec![FixedBitSet::with_capacity(size); size];
    let mut link = |dropoffs: &BTreeSet<RouteId>, pickups: &BTreeSet<RouteId>| {
        for from in dropoffs.iter().filter_map(|r| index.index_of(r)) {
            for to in pickups.iter().filter_map(|r| index.index_of(r)) {
                if from != to && overlaps[from].contains(to) {
                    rows[from].insert(to);
                }
            }
        }
    };

    for station in data.interchanges() {
        let mut pickups = data.pickup_routes(station);
        for neighbour in data.neighbours(station) {
            pickups.extend(data.pickup_routes(&neighbour.station));
        }
        link(&data.dropoff_routes(station), &pickups);
    }
    for diversion in data.diversions() {
        link(
            &data.dropoff_routes(&diversion.from),
            &data.pickup_routes(&diversion.to),
        );
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DateRange, DaysOfWeek, RouteId, ServiceCalendar};
    use crate::network::TimetableBuilder;
    use chrono::Duration;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn rid(s: &str) -> RouteId {
        RouteId::parse(s).unwrap()
    }

    /// A chain of routes R1..R5, each meeting the next at one station, plus
    /// a weekend-only route RW crossing R1 that never overlaps the weekday
    /// routes.
    pub(crate) fn chain() -> TransitData {
        let march = DateRange::of(date(1), date(31)).unwrap();
        let weekdays = ServiceCalendar::new(march, DaysOfWeek::WEEKDAYS);
        let weekend = ServiceCalendar::new(march, DaysOfWeek::WEEKEND);
        let mut builder = TimetableBuilder::new();
        for s in ["S0", "S1", "S2", "S3", "S4", "S5", "W1"] {
            builder.station(s, s);
        }
        for (i, (from, to)) in [("S0", "S1"), ("S1", "S2"), ("S2", "S3"), ("S3", "S4"), ("S4", "S5")]
            .iter()
            .enumerate()
        {
            let route = format!("R{}", i + 1);
            let service = format!("SV{}", i + 1);
            let trip = format!("T{}", i + 1);
            builder
                .route(&route, &route, TransportMode::Tram)
                .service(&service, &route, weekdays.clone())
                .trip(&trip, &service, &[(from, "08:00"), (to, "08:10")]);
        }
        builder
            .route("RW", "Weekend", TransportMode::Tram)
            .service("SVW", "RW", weekend)
            .trip("TW", "SVW", &[("S1", "09:00"), ("W1", "09:10")]);
        builder.build().unwrap()
    }

    fn all_modes() -> BTreeSet<TransportMode> {
        TransportMode::VEHICLES.into_iter().collect()
    }

    #[test]
    fn chain_depths() {
        let data = chain();
        let index = RouteIndex::from_transit(&data);
        let matrix = RouteCostMatrix::build(&data, &index, MAX_DEPTH);
        let mask = matrix.overlap_mask_for(&data, &index, date(15), &all_modes());

        let changes = |a: &str, b: &str| {
            matrix.changes_between(index.pair(&rid(a), &rid(b)).unwrap(), &mask)
        };
        assert_eq!(changes("R1", "R1"), 0);
        assert_eq!(changes("R1", "R2"), 1);
        assert_eq!(changes("R1", "R3"), 2);
        assert_eq!(changes("R1", "R4"), 3);
        assert_eq!(changes("R1", "R5"), 4);
        // direction matters: nothing drops off where R1 picks up
        assert_eq!(changes("R2", "R1"), UNREACHABLE);
    }

    #[test]
    fn non_overlapping_calendars_never_connect() {
        let data = chain();
        let index = RouteIndex::from_transit(&data);
        let matrix = RouteCostMatrix::build(&data, &index, MAX_DEPTH);
        let mut everything = FixedBitSet::with_capacity(index.len());
        everything.insert_range(..);
        let pair = index.pair(&rid("R1"), &rid("RW")).unwrap();
        assert_eq!(matrix.changes_between(pair, &everything), UNREACHABLE);
    }

    #[test]
    fn mask_excludes_routes_not_running() {
        let data = chain();
        let index = RouteIndex::from_transit(&data);
        let matrix = RouteCostMatrix::build(&data, &index, MAX_DEPTH);
        // Saturday: only the weekend route runs
        let mask = matrix.overlap_mask_for(&data, &index, date(16), &all_modes());
        assert!(mask.contains(index.index_of(&rid("RW")).unwrap()));
        assert!(!mask.contains(index.index_of(&rid("R1")).unwrap()));
        let pair = index.pair(&rid("R1"), &rid("R2")).unwrap();
        assert_eq!(matrix.changes_between(pair, &mask), UNREACHABLE);

        let buses = BTreeSet::from([TransportMode::Bus]);
        let mask = matrix.overlap_mask_for(&data, &index, date(15), &buses);
        assert!(mask.is_clear());
    }

    #[test]
    fn depth_is_capped() {
        let data = chain();
        let index = RouteIndex::from_transit(&data);
        let matrix = RouteCostMatrix::build(&data, &index, 2);
        assert_eq!(matrix.depth(), 2);
        let mask = matrix.overlap_mask_for(&data, &index, date(15), &all_modes());
        let pair = index.pair(&rid("R1"), &rid("R4")).unwrap();
        assert_eq!(matrix.changes_between(pair, &mask), UNREACHABLE);
    }

    #[test]
    fn stops_when_no_improvement() {
        let data = chain();
        let index = RouteIndex::from_transit(&data);
        let matrix = RouteCostMatrix::build(&data, &index, MAX_DEPTH);
        // R1 -> R5 needs four degrees; a fifth adds nothing
        assert_eq!(matrix.depth(), 4);
    }

    #[test]
    fn neighbours_link_routes() {
        let march = DateRange::of(date(1), date(31)).unwrap();
        let daily = ServiceCalendar::daily(march);
        let mut builder = TimetableBuilder::new();
        builder
            .station("A", "A")
            .station("B", "B")
            .station("C", "C")
            .station("D", "D")
            .route("X", "X", TransportMode::Tram)
            .route("Y", "Y", TransportMode::Bus)
            .service("SX", "X", daily.clone())
            .service("SY", "Y", daily)
            .trip("TX", "SX", &[("A", "08:00"), ("B", "08:10")])
            .trip("TY", "SY", &[("C", "08:20"), ("D", "08:30")])
            .neighbours("B", "C", Duration::minutes(3));
        let data = builder.build().unwrap();
        let index = RouteIndex::from_transit(&data);
        let matrix = RouteCostMatrix::build(&data, &index, MAX_DEPTH);
        let mask = matrix.overlap_mask_for(&data, &index, date(15), &all_modes());
        let pair = index.pair(&rid("X"), &rid("Y")).unwrap();
        assert_eq!(matrix.changes_between(pair, &mask), 1);
    }

    #[test]
    fn diversions_link_routes() {
        let march = DateRange::of(date(1), date(31)).unwrap();
        let daily = ServiceCalendar::daily(march);
        let mut builder = TimetableBuilder::new();
        for s in ["A", "X", "Y", "D"] {
            builder.station(s, s);
        }
        builder
            .route("R1", "R1", TransportMode::Tram)
            .route("R2", "R2", TransportMode::Tram)
            .service("S1", "R1", daily.clone())
            .service("S2", "R2", daily)
            .trip("T1", "S1", &[("A", "08:00"), ("X", "08:10")])
            .trip("T2", "S2", &[("Y", "08:20"), ("D", "08:30")])
            // only open on the 20th; the matrix ignores dates
            .diversion("X", "Y", Duration::minutes(5), DateRange::single(date(20)));
        let data = builder.build().unwrap();
        let index = RouteIndex::from_transit(&data);
        let matrix = RouteCostMatrix::build(&data, &index, MAX_DEPTH);
        let mask = matrix.overlap_mask_for(&data, &index, date(15), &all_modes());
        let pair = index.pair(&rid("R1"), &rid("R2")).unwrap();
        assert_eq!(matrix.changes_between(pair, &mask), 1);
        let back = index.pair(&rid("R2"), &rid("R1")).unwrap();
        assert_eq!(matrix.changes_between(back, &mask), UNREACHABLE);
    }
}
