//! The expansion loop for one path request.
//!
//! [`NetworkTraverser::next_arrival`] pulls branches from the selector,
//! evaluates each candidate child, applies its transition and queues its
//! children, until a branch arrives or the frontier runs dry. Branches
//! share their ancestry through `Rc`, so a child costs one journey state
//! clone.

use std::collections::BTreeSet;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{Duration, NaiveDate};
use tracing::debug;

use super::constraints::JourneyConstraints;
use super::diagnostics::DiagnosticsSink;
use super::evaluator::{Candidate, RouteEvaluator};
use super::heuristics::ServiceHeuristics;
use super::journey_state::JourneyState;
use super::previous_visits::PreviousVisits;
use super::reason::Evaluation;
use super::selector::{BranchOrdering, BranchSelector, ProximityRanks};
use super::traversal::{TraversalError, TraversalOps, TraversalState};
use crate::config::SearchConfig;
use crate::domain::{TramTime, TransportMode};
use crate::graph::{CachedNodes, EdgeType, GraphRelationship, GraphTransaction, NodeId};
use crate::network::TransitData;

/// Cooperative cancellation shared by every path request of a query.
#[derive(Debug, Clone)]
pub struct Running(Arc<AtomicBool>);

impl Running {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Ask every traversal holding a clone to stop at its next node.
    pub fn stop(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

impl Default for Running {
    fn default() -> Self {
        Self::new()
    }
}

/// One traversal: a start node, a start time and a change limit.
#[derive(Debug, Clone)]
pub struct PathRequest<'t> {
    pub start: NodeId<'t>,
    pub destinations: Vec<NodeId<'t>>,
    pub date: NaiveDate,
    pub query_time: TramTime,
    pub max_changes: u32,
    pub max_initial_wait: Duration,
    pub modes: BTreeSet<TransportMode>,
    pub ordering: BranchOrdering,
    /// Recording diagnostics; switches off the previous-visit cache so the
    /// trail shows every real rejection.
    pub diagnostics: bool,
}

/// A path that reached a destination.
#[derive(Debug, Clone)]
pub struct FoundPath<'t> {
    pub nodes: Vec<NodeId<'t>>,
    pub relationships: Vec<GraphRelationship<'t>>,
    pub state: JourneyState,
    pub query_time: TramTime,
    pub max_changes: u32,
}

struct Branch<'t> {
    parent: Option<Rc<Branch<'t>>>,
    via: Option<GraphRelationship<'t>>,
    node: NodeId<'t>,
    length: usize,
    traversal: TraversalState<'t>,
    journey: JourneyState,
}

impl<'t> Branch<'t> {
    fn ancestry(&self) -> impl Iterator<Item = &Branch<'t>> {
        std::iter::successors(Some(self), |b| b.parent.as_deref())
    }

    fn raw_path(&self, last: NodeId<'t>) -> Vec<u64> {
        let mut path: Vec<u64> = self.ancestry().map(|b| b.node.index()).collect();
        path.reverse();
        path.push(last.index());
        path
    }
}

/// A relationship waiting to be followed from its parent branch.
struct Pending<'t> {
    parent: Rc<Branch<'t>>,
    rel: GraphRelationship<'t>,
}

/// Traverses the graph for one [`PathRequest`].
pub struct NetworkTraverser<'t, T: GraphTransaction + ?Sized> {
    nodes: Rc<CachedNodes<'t, T>>,
    ops: TraversalOps<'t, T>,
    evaluator: RouteEvaluator,
    selector: BranchSelector<Pending<'t>>,
    ranks: ProximityRanks,
    request: PathRequest<'t>,
    started: bool,
    finished: bool,
    expanded: u64,
    arrivals: u64,
}

impl<'t, T: GraphTransaction + ?Sized> NetworkTraverser<'t, T> {
    pub fn new(
        nodes: Rc<CachedNodes<'t, T>>,
        constraints: Arc<JourneyConstraints>,
        data: Arc<TransitData>,
        config: &SearchConfig,
        request: PathRequest<'t>,
        running: Running,
    ) -> Self {
        let depth_first = request.ordering == BranchOrdering::DepthFirst;
        let heuristics = ServiceHeuristics::new(
            Arc::clone(&constraints),
            &request.modes,
            request.max_changes,
            config.max_wait(),
            request.max_initial_wait,
            depth_first,
        );
        let previous = if depth_first || request.diagnostics {
            PreviousVisits::disabled()
        } else {
            PreviousVisits::new(config.previous_visits_capacity)
        };
        let evaluator = RouteEvaluator::new(
            heuristics,
            previous,
            running,
            request.start,
            config.calc_timeout(),
        );
        let ranks = ProximityRanks::new(data, constraints.destinations());
        let ops = TraversalOps::new(nodes.txn(), constraints, request.destinations.iter().copied());
        Self {
            nodes,
            ops,
            evaluator,
            selector: BranchSelector::new(request.ordering),
            ranks,
            request,
            started: false,
            finished: false,
            expanded: 0,
            arrivals: 0,
        }
    }

    pub fn request(&self) -> &PathRequest<'t> {
        &self.request
    }

    /// Expand until the next arrival. `None` once the search space is
    /// exhausted, cancelled or timed out.
    pub fn next_arrival<D: DiagnosticsSink>(
        &mut self,
        sink: &mut D,
    ) -> Result<Option<FoundPath<'t>>, TraversalError> {
        if self.finished {
            return Ok(None);
        }
        if !self.started {
            self.started = true;
            self.start()?;
        }

        while let Some(Pending { parent, rel }) = self.selector.pop() {
            self.expanded += 1;
            let node = self.nodes.get(rel.end())?;

            let mut journey = parent.journey.clone();
            let total = parent.traversal.total_cost() + rel.cost();
            if rel.cost() > Duration::zero() {
                journey.update_total_cost(total)?;
            }
            if rel.kind() == EdgeType::Diversion
                && let Some(station) = node.station()
            {
                journey.begin_diversion(station)?;
            }

            let length = parent.length + 1;
            let candidate = Candidate {
                node: &node,
                via: &rel,
                journey: &journey,
                path_length: length,
                state: parent.traversal.kind(),
                is_destination: self.ops.is_destination(node.id()),
            };
            let evaluation = self
                .evaluator
                .evaluate(&candidate, sink, || parent.raw_path(node.id()));
            if evaluation == Evaluation::Prune {
                continue;
            }

            let mut traversal =
                parent
                    .traversal
                    .next_state(&self.ops, Some(&rel), &node, &mut journey, total)?;
            let outbound = traversal.take_outbound();
            let branch = Rc::new(Branch {
                parent: Some(parent),
                via: Some(rel),
                node: node.id(),
                length,
                traversal,
                journey,
            });

            if evaluation == Evaluation::Arrived {
                self.arrivals += 1;
                return Ok(Some(self.found(&branch)));
            }
            self.queue(branch, outbound);
        }

        self.finish();
        Ok(None)
    }

    fn start(&mut self) -> Result<(), TraversalError> {
        let node = self.nodes.get(self.request.start)?;
        let mut journey = JourneyState::new(self.request.query_time);
        let mut traversal = TraversalState::not_started().next_state(
            &self.ops,
            None,
            &node,
            &mut journey,
            Duration::zero(),
        )?;
        let outbound = traversal.take_outbound();
        let root = Rc::new(Branch {
            parent: None,
            via: None,
            node: node.id(),
            length: 1,
            traversal,
            journey,
        });
        self.queue(root, outbound);
        Ok(())
    }

    fn queue(&mut self, branch: Rc<Branch<'t>>, outbound: Vec<GraphRelationship<'t>>) {
        let rank = self.ranks.rank(&branch.journey);
        let clock = branch.journey.clock();
        let children = outbound
            .into_iter()
            .map(|rel| {
                let at = clock.checked_add(rel.cost()).unwrap_or(clock);
                (
                    (rank, at),
                    Pending {
                        parent: Rc::clone(&branch),
                        rel,
                    },
                )
            })
            .collect();
        self.selector.push_children(children);
    }

    fn found(&self, branch: &Branch<'t>) -> FoundPath<'t> {
        let mut nodes = Vec::with_capacity(branch.length);
        let mut relationships = Vec::with_capacity(branch.length);
        for b in branch.ancestry() {
            nodes.push(b.node);
            if let Some(rel) = &b.via {
                relationships.push(rel.clone());
            }
        }
        nodes.reverse();
        relationships.reverse();
        FoundPath {
            nodes,
            relationships,
            state: branch.journey.clone(),
            query_time: self.request.query_time,
            max_changes: self.request.max_changes,
        }
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        debug!(
            query_time = %self.request.query_time,
            max_changes = self.request.max_changes,
            expanded = self.expanded,
            arrivals = self.arrivals,
            "path request complete"
        );
        self.evaluator.report();
    }
}
