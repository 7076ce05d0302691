//! The best arrival found so far by one path request.

use chrono::Duration;

use super::journey_state::JourneyState;

/// Lowest elapsed time and its number of changes over all arrivals so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LowestCostSeen {
    lowest: Option<(Duration, u32)>,
}

impl LowestCostSeen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn any_arrived(&self) -> bool {
        self.lowest.is_some()
    }

    pub fn lowest_cost(&self) -> Option<Duration> {
        self.lowest.map(|(cost, _)| cost)
    }

    pub fn lowest_changes(&self) -> Option<u32> {
        self.lowest.map(|(_, changes)| changes)
    }

    /// True if an arrival in `state` beats every arrival so far: sooner, or
    /// as soon with fewer changes.
    pub fn is_lower(&self, state: &JourneyState) -> bool {
        let Some((cost, changes)) = self.lowest else {
            return true;
        };
        let elapsed = state.elapsed();
        elapsed < cost || (elapsed <= cost && state.number_of_changes() < changes)
    }

    pub fn set_lowest(&mut self, state: &JourneyState) {
        self.lowest = Some((state.elapsed(), state.number_of_changes()));
    }
}
