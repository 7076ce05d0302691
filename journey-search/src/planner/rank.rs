//! Journey ranking for search results.
//!
//! Path requests for different start times and change limits often find
//! the same journey, or journeys strictly worse than another one found.

use chrono::Duration;

use super::journey::Journey;
use crate::domain::TramTime;

fn key(journey: &Journey) -> (TramTime, u32, Duration) {
    (journey.arrival, journey.changes, journey.duration)
}

fn criteria(journey: &Journey) -> (TramTime, TramTime, u32) {
    (journey.departure, journey.arrival, journey.changes)
}

/// True if `a` leaves no earlier, arrives no later and changes no more often
/// than `b`, and differs from it in at least one of those.
fn dominates(a: &Journey, b: &Journey) -> bool {
    a.departure >= b.departure
        && a.arrival <= b.arrival
        && a.changes <= b.changes
        && criteria(a) != criteria(b)
}

/// Sort journeys best first.
///
/// Journeys are ranked by:
/// 1. Arrival time (earlier is better)
/// 2. Number of changes (fewer is better)
/// 3. Total duration (shorter is better)
pub fn rank_journeys(mut journeys: Vec<Journey>) -> Vec<Journey> {
    journeys.sort_by_key(key);
    journeys
}

/// Remove journeys another journey dominates.
pub fn remove_dominated(journeys: Vec<Journey>) -> Vec<Journey> {
    if journeys.len() <= 1 {
        return journeys;
    }

    let mut result: Vec<Journey> = Vec::with_capacity(journeys.len());
    for journey in journeys {
        if result.iter().any(|existing| dominates(existing, &journey)) {
            continue;
        }
        result.retain(|existing| !dominates(&journey, existing));
        result.push(journey);
    }
    result
}

/// Keep one journey per (arrival, departure, changes), the shortest.
pub fn deduplicate(mut journeys: Vec<Journey>) -> Vec<Journey> {
    if journeys.len() <= 1 {
        return journeys;
    }

    journeys.sort_by(|a, b| {
        (a.arrival, a.departure, a.changes, a.duration).cmp(&(
            b.arrival,
            b.departure,
            b.changes,
            b.duration,
        ))
    });
    journeys.dedup_by_key(|j| (j.arrival, j.departure, j.changes));
    journeys
}

/// Deduplicate, drop dominated journeys, rank and keep the best `max`.
pub fn select_best(journeys: Vec<Journey>, max: usize) -> Vec<Journey> {
    let mut ranked = rank_journeys(remove_dominated(deduplicate(journeys)));
    ranked.truncate(max);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{StationId, TramTime};

    fn t(s: &str) -> TramTime {
        TramTime::parse_hhmm(s).unwrap()
    }

    fn journey(departure: &str, arrival: &str, changes: u32) -> Journey {
        let (departure, arrival) = (t(departure), t(arrival));
        Journey {
            query_time: departure,
            departure,
            arrival,
            duration: arrival.signed_duration_since(departure),
            changes,
            walking_connections: 0,
            call_points: vec![StationId::parse("A").unwrap(), StationId::parse("B").unwrap()],
            routes: Vec::new(),
            trips: Vec::new(),
            max_changes: changes,
        }
    }

    #[test]
    fn rank_by_arrival() {
        let ranked = rank_journeys(vec![journey("10:15", "10:40", 0), journey("10:00", "10:30", 0)]);
        assert_eq!(ranked[0].arrival, t("10:30"));
        assert_eq!(ranked[1].arrival, t("10:40"));
    }

    #[test]
    fn rank_by_changes_when_same_arrival() {
        let ranked = rank_journeys(vec![journey("10:00", "11:30", 1), journey("10:00", "11:30", 0)]);
        assert_eq!(ranked[0].changes, 0);
        assert_eq!(ranked[1].changes, 1);
    }

    #[test]
    fn remove_dominated_keeps_pareto_optimal() {
        let a = journey("10:00", "10:30", 0);
        let b = journey("09:55", "10:40", 0);
        let c = journey("09:45", "10:25", 1);
        let later = journey("10:10", "10:40", 0);
        let result = remove_dominated(vec![b, a.clone(), c.clone(), later.clone()]);
        assert_eq!(result, vec![a, c, later]);
    }

    #[test]
    fn deduplicate_same_times() {
        let mut other_route = journey("10:00", "10:30", 0);
        other_route.query_time = t("09:48");
        let result = deduplicate(vec![journey("10:00", "10:30", 0), other_route]);
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn select_best_truncates() {
        let journeys = (0..6)
            .map(|i| {
                // later arrivals are shorter, so none is dominated
                let dep = TramTime::of(10, i * 5).unwrap();
                let arr = TramTime::of(10, 40 + i * 3).unwrap();
                journey(&dep.to_string(), &arr.to_string(), 0)
            })
            .collect();
        let best = select_best(journeys, 3);
        assert_eq!(best.len(), 3);
        assert_eq!(best[0].arrival, t("10:40"));
        assert_eq!(best[2].arrival, t("10:46"));
    }

    #[test]
    fn empty_input() {
        assert!(rank_journeys(vec![]).is_empty());
        assert!(remove_dominated(vec![]).is_empty());
        assert!(deduplicate(vec![]).is_empty());
        assert!(select_best(vec![], 5).is_empty());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::domain::TramTime;
    use chrono::Duration;
    use proptest::prelude::*;

    fn make_journey(dep_mins: u32, duration_mins: u32, changes: u32) -> Journey {
        let departure = TramTime::from_minutes(dep_mins).unwrap();
        let arrival = departure
            .checked_add(Duration::minutes(i64::from(duration_mins)))
            .unwrap();
        Journey {
            query_time: departure,
            departure,
            arrival,
            duration: Duration::minutes(i64::from(duration_mins)),
            changes,
            walking_connections: 0,
            call_points: Vec::new(),
            routes: Vec::new(),
            trips: Vec::new(),
            max_changes: changes,
        }
    }

    /// Journeys inside one busy hour, so arrivals collide often.
    fn journey_strategy(change_bias: f64) -> impl Strategy<Value = Journey> {
        (
            480u32..540,
            10u32..60,
            prop::bool::weighted(change_bias),
            0u32..3,
        )
            .prop_map(|(dep, duration, has_change, extra)| {
                let changes = if has_change { 1 + extra } else { 0 };
                make_journey(dep, duration, changes)
            })
    }

    /// Fuzz over the share of journeys with changes as well.
    fn journeys_strategy() -> impl Strategy<Value = Vec<Journey>> {
        (0.0f64..1.0).prop_flat_map(|bias| prop::collection::vec(journey_strategy(bias), 0..15))
    }

    proptest! {
        #[test]
        fn rank_journeys_is_sorted(journeys in journeys_strategy()) {
            let ranked = rank_journeys(journeys);
            for window in ranked.windows(2) {
                prop_assert!(key(&window[0]) <= key(&window[1]));
            }
        }

        #[test]
        fn rank_journeys_preserves_elements(journeys in journeys_strategy()) {
            let len = journeys.len();
            prop_assert_eq!(rank_journeys(journeys).len(), len);
        }

        #[test]
        fn remove_dominated_no_internal_domination(journeys in journeys_strategy()) {
            let result = remove_dominated(journeys);
            for (i, a) in result.iter().enumerate() {
                for (j, b) in result.iter().enumerate() {
                    prop_assert!(i == j || !dominates(a, b), "{} dominates {}", i, j);
                }
            }
        }

        #[test]
        fn every_removed_journey_is_dominated(journeys in journeys_strategy()) {
            let result = remove_dominated(journeys.clone());
            for journey in &journeys {
                let kept = result.iter().any(|r| criteria(r) == criteria(journey));
                let beaten = result.iter().any(|r| dominates(r, journey));
                prop_assert!(kept || beaten);
            }
        }

        #[test]
        fn select_best_is_bounded_and_sorted(
            journeys in journeys_strategy(),
            max in 0usize..6,
        ) {
            let best = select_best(journeys, max);
            prop_assert!(best.len() <= max);
            for window in best.windows(2) {
                prop_assert!(key(&window[0]) <= key(&window[1]));
            }
        }
    }

    #[test]
    fn remove_dominated_distribution() {
        use proptest::test_runner::{Config, TestRunner};
        use std::cell::Cell;

        let mut runner = TestRunner::new(Config::with_cases(500));
        let removed = Cell::new(0u32);
        let total = Cell::new(0u32);

        let _ = runner.run(&journeys_strategy(), |journeys| {
            let len = journeys.len();
            if remove_dominated(journeys).len() < len {
                removed.set(removed.get() + 1);
            }
            total.set(total.get() + 1);
            Ok(())
        });

        assert!(
            removed.get() > 0 || total.get() < 10,
            "never removed a dominated journey in {} cases",
            total.get()
        );
    }
}
