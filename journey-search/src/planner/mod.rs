//! Journey planning on top of the graph search.
//!
//! This module answers: "what are the best ways from here to there, leaving
//! around this time?"
//!
//! A query resolves its locations, asks the route interchange matrix how many
//! changes are worth trying, and runs one path request per start time and
//! change limit. Accepted paths become owned [`Journey`] summaries, which are
//! deduplicated and ranked.

mod calculator;
mod journey;
mod rank;
mod request;
mod walks;

pub use calculator::{JourneyStream, RouteCalculator};
pub use journey::{Journey, JourneyResponse};
pub use rank::{deduplicate, rank_journeys, remove_dominated, select_best};
pub use request::{JourneyRequest, Location};
pub use walks::WalkNodes;
