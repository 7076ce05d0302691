//! Time-dependent journey search over a multi-modal transit network.
//!
//! Answers: "what are the best ways from here to there, leaving around
//! this time?"
//!
//! A [`network::TransitData`] timetable is laid out as a time-expanded
//! graph ([`graph`]), walked by a best-first search ([`search`]) that is
//! pruned by a route interchange matrix ([`routes`]). [`planner`] turns
//! requests into path requests and ranks the journeys they find.

pub mod config;
pub mod domain;
pub mod error;
pub mod graph;
pub mod network;
pub mod planner;
pub mod routes;
pub mod search;
