//! Which branch to expand next.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;

use serde::Serialize;

use super::journey_state::JourneyState;
use crate::domain::{StationId, TramTime};
use crate::network::TransitData;

/// Exploration order for a path request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum BranchOrdering {
    /// Last in, first out; the first outbound relationship goes deepest
    /// first.
    DepthFirst,
    /// Nearest the destination, then earliest clock, then oldest.
    #[default]
    CostOrdered,
}

/// Ordering key of a queued branch: proximity rank, then journey clock.
pub type SelectorKey = (u64, TramTime);

struct Queued<T> {
    key: SelectorKey,
    seq: u64,
    item: T,
}

impl<T> Queued<T> {
    fn order(&self) -> (u64, TramTime, u64) {
        (self.key.0, self.key.1, self.seq)
    }
}

impl<T> PartialEq for Queued<T> {
    fn eq(&self, other: &Self) -> bool {
        self.order() == other.order()
    }
}

impl<T> Eq for Queued<T> {}

impl<T> PartialOrd for Queued<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Queued<T> {
    // reversed: BinaryHeap pops the greatest, we want the smallest key
    fn cmp(&self, other: &Self) -> Ordering {
        other.order().cmp(&self.order())
    }
}

enum Frontier<T> {
    Stack(Vec<T>),
    Heap { heap: BinaryHeap<Queued<T>>, seq: u64 },
}

/// The frontier of a traversal.
pub struct BranchSelector<T> {
    frontier: Frontier<T>,
}

impl<T> BranchSelector<T> {
    pub fn new(ordering: BranchOrdering) -> Self {
        let frontier = match ordering {
            BranchOrdering::DepthFirst => Frontier::Stack(Vec::new()),
            BranchOrdering::CostOrdered => Frontier::Heap {
                heap: BinaryHeap::new(),
                seq: 0,
            },
        };
        Self { frontier }
    }

    /// Queue the children of one branch, in their preferred order.
    pub fn push_children(&mut self, children: Vec<(SelectorKey, T)>) {
        match &mut self.frontier {
            Frontier::Stack(stack) => {
                stack.extend(children.into_iter().rev().map(|(_, item)| item));
            }
            Frontier::Heap { heap, seq } => {
                for (key, item) in children {
                    heap.push(Queued {
                        key,
                        seq: *seq,
                        item,
                    });
                    *seq += 1;
                }
            }
        }
    }

    pub fn pop(&mut self) -> Option<T> {
        match &mut self.frontier {
            Frontier::Stack(stack) => stack.pop(),
            Frontier::Heap { heap, .. } => heap.pop().map(|q| q.item),
        }
    }

    pub fn len(&self) -> usize {
        match &self.frontier {
            Frontier::Stack(stack) => stack.len(),
            Frontier::Heap { heap, .. } => heap.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Squared grid distance from a branch's last station to the nearest
/// destination, memoised per station.
pub struct ProximityRanks {
    data: Arc<TransitData>,
    targets: Vec<(i64, i64)>,
    ranks: HashMap<StationId, u64>,
}

impl ProximityRanks {
    pub fn new<'a>(data: Arc<TransitData>, destinations: impl IntoIterator<Item = &'a StationId>) -> Self {
        let targets = destinations
            .into_iter()
            .filter_map(|s| data.station(s).and_then(|s| s.position))
            .map(|p| p.grid())
            .collect();
        Self {
            data,
            targets,
            ranks: HashMap::new(),
        }
    }

    /// 0 before the journey has begun or where no coordinates are known.
    pub fn rank(&mut self, journey: &JourneyState) -> u64 {
        if !journey.has_begun() || self.targets.is_empty() {
            return 0;
        }
        let Some(station) = journey.approx_station() else {
            return 0;
        };
        if let Some(rank) = self.ranks.get(station) {
            return *rank;
        }
        let rank = self
            .data
            .station(station)
            .and_then(|s| s.position)
            .map(|p| {
                let (x, y) = p.grid();
                self.targets
                    .iter()
                    .map(|(tx, ty)| {
                        let (dx, dy) = (x.abs_diff(*tx), y.abs_diff(*ty));
                        dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))
                    })
                    .min()
                    .unwrap_or(0)
            })
            .unwrap_or(0);
        self.ranks.insert(station.clone(), rank);
        rank
    }
}
