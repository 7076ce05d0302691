//! Query orchestration.
//!
//! A [`RouteCalculator`] turns a [`JourneyRequest`] into path requests: one
//! per candidate change limit and start time, change limits outermost. The
//! route interchange matrix bounds the change limits before any traversal
//! runs. Path requests run lazily in order through a [`JourneyStream`], or
//! all at once on blocking worker threads.

use std::collections::{BTreeSet, VecDeque};
use std::rc::Rc;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::journey::{Journey, JourneyResponse};
use super::rank::select_best;
use super::request::{JourneyRequest, Location};
use super::walks::WalkNodes;
use crate::config::SearchConfig;
use crate::domain::{LatLong, LocationId, StationId, TimeRange, TramTime, TransportMode};
use crate::error::SearchError;
use crate::graph::{CachedNodes, GraphDatabase, GraphTransaction, NodeId};
use crate::network::TransitData;
use crate::routes::RouteToRouteCosts;
use crate::search::{
    BranchOrdering, DiagnosticsReport, JourneyConstraints, NetworkTraverser, NoDiagnostics,
    PathRequest, RecordingDiagnostics, Running,
};

/// Rejected nodes listed in a diagnostics report.
const MOST_VISITED: usize = 10;

/// One end of a query, resolved against the network.
#[derive(Debug, Clone)]
enum Endpoint {
    /// A station or group node, and the stations it stands for.
    Node {
        location: LocationId,
        stations: Vec<StationId>,
    },
    /// A position, with the walk to or from each nearby station.
    Walk {
        position: LatLong,
        walks: Vec<(StationId, Duration)>,
    },
}

impl Endpoint {
    fn stations(&self) -> Vec<StationId> {
        match self {
            Endpoint::Node { stations, .. } => stations.clone(),
            Endpoint::Walk { walks, .. } => walks.iter().map(|(s, _)| s.clone()).collect(),
        }
    }

    fn start_node<'t, T: GraphTransaction + ?Sized>(
        &self,
        txn: &'t T,
        walks: &mut WalkNodes<'t, T>,
    ) -> Result<NodeId<'t>, SearchError> {
        match self {
            Endpoint::Node { location, .. } => node_for(txn, location.clone()),
            Endpoint::Walk { position, walks: to } => {
                let stations = walk_nodes(txn, to)?;
                Ok(walks.walk_out(*position, &stations)?)
            }
        }
    }

    /// Arriving at any station of a group counts as arriving at the group.
    fn end_nodes<'t, T: GraphTransaction + ?Sized>(
        &self,
        txn: &'t T,
        walks: &mut WalkNodes<'t, T>,
    ) -> Result<Vec<NodeId<'t>>, SearchError> {
        match self {
            Endpoint::Node { stations, .. } => stations
                .iter()
                .map(|s| node_for(txn, LocationId::Station(s.clone())))
                .collect(),
            Endpoint::Walk { position, walks: from } => {
                let stations = walk_nodes(txn, from)?;
                Ok(vec![walks.walk_in(*position, &stations)?])
            }
        }
    }
}

fn node_for<T: GraphTransaction + ?Sized>(
    txn: &T,
    location: LocationId,
) -> Result<NodeId<'_>, SearchError> {
    txn.find_node(&location)?
        .ok_or(SearchError::UnknownLocation(location))
}

fn walk_nodes<'t, T: GraphTransaction + ?Sized>(
    txn: &'t T,
    walks: &[(StationId, Duration)],
) -> Result<Vec<(NodeId<'t>, Duration)>, SearchError> {
    walks
        .iter()
        .map(|(s, cost)| Ok((node_for(txn, LocationId::Station(s.clone()))?, *cost)))
        .collect()
}

/// A start time and change limit for one path request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Attempt {
    max_changes: u32,
    query_time: TramTime,
}

/// The transaction-independent part of a query, shared with workers.
#[derive(Debug)]
struct QueryPlan {
    start: Endpoint,
    end: Endpoint,
    date: NaiveDate,
    modes: BTreeSet<TransportMode>,
    max_initial_wait: Duration,
    ordering: BranchOrdering,
    diagnostics: bool,
    constraints: Arc<JourneyConstraints>,
    attempts: Vec<Attempt>,
}

/// Answers journey queries against one network.
pub struct RouteCalculator<G> {
    db: Arc<G>,
    data: Arc<TransitData>,
    costs: Arc<RouteToRouteCosts>,
    config: Arc<SearchConfig>,
}

impl<G: GraphDatabase> RouteCalculator<G> {
    pub fn new(
        db: Arc<G>,
        data: Arc<TransitData>,
        costs: Arc<RouteToRouteCosts>,
        config: SearchConfig,
    ) -> Self {
        Self {
            db,
            data,
            costs,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Run every path request in order on one transaction and rank what
    /// they find.
    pub fn calculate(&self, request: &JourneyRequest) -> Result<JourneyResponse, SearchError> {
        let txn = self.db.begin_tx()?;
        let response = self.calculate_in(&txn, request);
        txn.close();
        response
    }

    /// As [`calculate`](Self::calculate), but each path request runs on its
    /// own blocking worker with its own transaction.
    pub async fn calculate_parallel(
        &self,
        request: &JourneyRequest,
    ) -> Result<JourneyResponse, SearchError>
    where
        G: 'static,
    {
        let Some(plan) = self.plan(request)? else {
            return Ok(JourneyResponse::empty());
        };
        let plan = Arc::new(plan);
        let running = Running::new();

        let workers = plan
            .attempts
            .iter()
            .map(|attempt| {
                let db = Arc::clone(&self.db);
                let data = Arc::clone(&self.data);
                let config = Arc::clone(&self.config);
                let plan = Arc::clone(&plan);
                let attempts = vec![*attempt];
                let running = running.clone();
                tokio::task::spawn_blocking(move || -> Result<_, SearchError> {
                    let txn = db.begin_tx()?;
                    let result = run_attempts(&txn, data, config, plan, attempts, running);
                    txn.close();
                    result
                })
            })
            .collect();
        let results = gather(workers, &running).await?;

        let mut journeys = Vec::new();
        let mut diagnostics = plan.diagnostics.then(RecordingDiagnostics::new);
        for (found, recorded) in results {
            journeys.extend(found);
            if let (Some(all), Some(recorded)) = (diagnostics.as_mut(), recorded) {
                all.merge(recorded);
            }
        }

        let found = journeys.len();
        let journeys = select_best(journeys, self.config.max_results);
        debug!(
            path_requests = plan.attempts.len(),
            found,
            journeys = journeys.len(),
            "parallel query complete"
        );
        Ok(JourneyResponse {
            journeys,
            diagnostics: diagnostics.map(|d| d.report(MOST_VISITED)),
        })
    }
}

impl<G> RouteCalculator<G> {
    /// Run a query on a caller-owned transaction.
    pub fn calculate_in<T: GraphTransaction + ?Sized>(
        &self,
        txn: &T,
        request: &JourneyRequest,
    ) -> Result<JourneyResponse, SearchError> {
        let mut stream = self.stream(txn, request)?;
        let journeys = stream.by_ref().collect::<Result<Vec<_>, _>>()?;
        let found = journeys.len();
        let journeys = select_best(journeys, self.config.max_results);
        debug!(
            path_requests = stream.path_requests(),
            found,
            journeys = journeys.len(),
            "query complete"
        );
        Ok(JourneyResponse {
            journeys,
            diagnostics: stream.diagnostics(),
        })
    }

    /// Lazily yield journeys, path request by path request.
    ///
    /// Unranked, and possibly repeating a journey found under a different
    /// start time or change limit. Scratch walk nodes live as long as the
    /// stream.
    pub fn stream<'t, T: GraphTransaction + ?Sized>(
        &self,
        txn: &'t T,
        request: &JourneyRequest,
    ) -> Result<JourneyStream<'t, T>, SearchError> {
        let running = Running::new();
        match self.plan(request)? {
            Some(plan) => {
                let attempts = plan.attempts.clone();
                JourneyStream::open(
                    txn,
                    Arc::clone(&self.data),
                    Arc::clone(&self.config),
                    Arc::new(plan),
                    attempts,
                    running,
                )
            }
            None => Ok(JourneyStream::empty(
                txn,
                Arc::clone(&self.data),
                Arc::clone(&self.config),
                running,
            )),
        }
    }

    /// `None` when the query cannot have any journeys.
    fn plan(&self, request: &JourneyRequest) -> Result<Option<QueryPlan>, SearchError> {
        let modes = request.modes_or(&self.config.transport_modes);
        request.validate(&modes)?;

        let Some(start) = self.resolve(&request.from)? else {
            debug!(from = %request.from, "no stations near start");
            return Ok(None);
        };
        let Some(end) = self.resolve(&request.to)? else {
            debug!(to = %request.to, "no stations near destination");
            return Ok(None);
        };
        let starts = start.stations();
        let destinations = end.stations();
        if starts.iter().any(|s| destinations.contains(s)) {
            debug!(from = %request.from, to = %request.to, "start is a destination");
            return Ok(None);
        }

        let range = TimeRange::around(request.time, Duration::zero(), self.config.max_journey());
        let Some(computed) =
            self.costs
                .number_of_changes(&starts, &destinations, request.date, range, &modes)
        else {
            debug!(from = %request.from, to = %request.to, "destination unreachable");
            return Ok(None);
        };

        let requested = request.max_changes;
        if u32::from(computed.min) > requested {
            warn!(
                min = computed.min,
                requested, "fewest possible changes exceeds the requested maximum"
            );
        }
        let fewest = u32::from(computed.min).min(requested);
        let most = u32::from(computed.max).min(requested);

        let times = self.query_times(request.time);
        let attempts: Vec<Attempt> = (fewest..=most)
            .flat_map(|max_changes| {
                times.iter().map(move |query_time| Attempt {
                    max_changes,
                    query_time: *query_time,
                })
            })
            .collect();

        let lowest = self
            .costs
            .lowest_costs_for(&destinations, request.date, range, &modes);
        let constraints = Arc::new(JourneyConstraints::new(
            &self.config,
            &self.data,
            request.date,
            &modes,
            &destinations,
            lowest,
        ));

        debug!(
            from = %request.from,
            to = %request.to,
            date = %request.date,
            time = %request.time,
            changes = %computed,
            path_requests = attempts.len(),
            "planned query"
        );
        Ok(Some(QueryPlan {
            start,
            end,
            date: request.date,
            max_initial_wait: self.config.max_initial_wait(&modes),
            modes,
            ordering: if self.config.depth_first {
                BranchOrdering::DepthFirst
            } else {
                BranchOrdering::CostOrdered
            },
            diagnostics: request.diagnostics,
            constraints,
            attempts,
        }))
    }

    fn resolve(&self, location: &Location) -> Result<Option<Endpoint>, SearchError> {
        let endpoint = match location {
            Location::Station(id) => {
                let location = LocationId::Station(id.clone());
                if self.data.station(id).is_none() {
                    return Err(SearchError::UnknownLocation(location));
                }
                Endpoint::Node {
                    location,
                    stations: vec![id.clone()],
                }
            }
            Location::Group(id) => {
                let Some(group) = self.data.group(id) else {
                    return Err(SearchError::UnknownLocation(LocationId::Group(id.clone())));
                };
                if group.stations.is_empty() {
                    return Ok(None);
                }
                Endpoint::Node {
                    location: LocationId::Group(id.clone()),
                    stations: group.stations.clone(),
                }
            }
            Location::Position(position) => {
                let nearest = self.data.nearest_stations(
                    position,
                    self.config.nearest_stops_range_km,
                    self.config.max_walk_stations,
                );
                if nearest.is_empty() {
                    return Ok(None);
                }
                Endpoint::Walk {
                    position: *position,
                    walks: nearest
                        .into_iter()
                        .map(|(station, km)| (station, self.config.walking_time(km)))
                        .collect(),
                }
            }
        };
        Ok(Some(endpoint))
    }

    /// `number_queries` start times from `time`, `query_interval` apart.
    fn query_times(&self, time: TramTime) -> Vec<TramTime> {
        (0..self.config.number_queries)
            .map_while(|i| {
                let offset = Duration::minutes(self.config.query_interval_mins * i as i64);
                time.checked_add(offset)
            })
            .collect()
    }
}

/// Await every worker, keeping results in spawn order.
///
/// The first failure stops the rest through `running`. They are still
/// awaited, so each closes its transaction before this returns.
async fn gather<R>(
    workers: Vec<JoinHandle<Result<R, SearchError>>>,
    running: &Running,
) -> Result<Vec<R>, SearchError> {
    let mut pending: FuturesUnordered<_> = workers
        .into_iter()
        .enumerate()
        .map(|(slot, handle)| handle.map(move |joined| (slot, joined)))
        .collect();
    let mut results: Vec<Option<R>> = std::iter::repeat_with(|| None).take(pending.len()).collect();
    let mut failure = None;

    while let Some((slot, joined)) = pending.next().await {
        let result = joined
            .map_err(|e| SearchError::Worker(e.to_string()))
            .and_then(|result| result);
        match result {
            Ok(value) => results[slot] = Some(value),
            Err(e) if failure.is_none() => {
                warn!(error = %e, "path request failed, stopping the others");
                running.stop();
                failure = Some(e);
            }
            Err(e) => debug!(error = %e, "path request failed after stop"),
        }
    }

    match failure {
        Some(e) => Err(e),
        None => Ok(results.into_iter().flatten().collect()),
    }
}

/// Run `attempts` on `txn` to exhaustion.
fn run_attempts<T: GraphTransaction + ?Sized>(
    txn: &T,
    data: Arc<TransitData>,
    config: Arc<SearchConfig>,
    plan: Arc<QueryPlan>,
    attempts: Vec<Attempt>,
    running: Running,
) -> Result<(Vec<Journey>, Option<RecordingDiagnostics>), SearchError> {
    let mut stream = JourneyStream::open(txn, data, config, plan, attempts, running)?;
    let journeys = stream.by_ref().collect::<Result<Vec<_>, _>>()?;
    Ok((journeys, stream.sink.take()))
}

/// Journeys from a query's path requests, in the order they are found.
///
/// Dropping the stream abandons the remaining path requests and removes any
/// scratch walk nodes.
pub struct JourneyStream<'t, T: GraphTransaction + ?Sized> {
    // dropped before `walks`, which removes nodes the traverser refers to
    current: Option<NetworkTraverser<'t, T>>,
    pending: VecDeque<PathRequest<'t>>,
    nodes: Rc<CachedNodes<'t, T>>,
    walks: WalkNodes<'t, T>,
    plan: Option<Arc<QueryPlan>>,
    data: Arc<TransitData>,
    config: Arc<SearchConfig>,
    running: Running,
    sink: Option<RecordingDiagnostics>,
    started: usize,
    found: usize,
    failed: bool,
}

impl<'t, T: GraphTransaction + ?Sized> JourneyStream<'t, T> {
    fn empty(
        txn: &'t T,
        data: Arc<TransitData>,
        config: Arc<SearchConfig>,
        running: Running,
    ) -> Self {
        let nodes = Rc::new(CachedNodes::new(txn));
        Self {
            current: None,
            pending: VecDeque::new(),
            walks: WalkNodes::new(Rc::clone(&nodes)),
            nodes,
            plan: None,
            data,
            config,
            running,
            sink: None,
            started: 0,
            found: 0,
            failed: false,
        }
    }

    fn open(
        txn: &'t T,
        data: Arc<TransitData>,
        config: Arc<SearchConfig>,
        plan: Arc<QueryPlan>,
        attempts: Vec<Attempt>,
        running: Running,
    ) -> Result<Self, SearchError> {
        let mut stream = Self::empty(txn, data, config, running);
        let start = plan.start.start_node(txn, &mut stream.walks)?;
        let destinations = plan.end.end_nodes(txn, &mut stream.walks)?;
        stream.pending = attempts
            .into_iter()
            .map(|attempt| PathRequest {
                start,
                destinations: destinations.clone(),
                date: plan.date,
                query_time: attempt.query_time,
                max_changes: attempt.max_changes,
                max_initial_wait: plan.max_initial_wait,
                modes: plan.modes.clone(),
                ordering: plan.ordering,
                diagnostics: plan.diagnostics,
            })
            .collect();
        stream.sink = plan.diagnostics.then(RecordingDiagnostics::new);
        stream.plan = Some(plan);
        Ok(stream)
    }

    /// Cancels every remaining path request when stopped.
    pub fn running(&self) -> Running {
        self.running.clone()
    }

    /// Path requests started so far.
    pub fn path_requests(&self) -> usize {
        self.started
    }

    /// Rejections recorded so far, when the request asked for them.
    pub fn diagnostics(&self) -> Option<DiagnosticsReport> {
        self.sink.as_ref().map(|sink| sink.report(MOST_VISITED))
    }

    fn next_traverser(&mut self) -> Option<NetworkTraverser<'t, T>> {
        let plan = self.plan.as_ref()?;
        let request = self.pending.pop_front()?;
        self.started += 1;
        Some(NetworkTraverser::new(
            Rc::clone(&self.nodes),
            Arc::clone(&plan.constraints),
            Arc::clone(&self.data),
            &self.config,
            request,
            self.running.clone(),
        ))
    }
}

impl<T: GraphTransaction + ?Sized> Iterator for JourneyStream<'_, T> {
    type Item = Result<Journey, SearchError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            if self.current.is_none() {
                self.current = Some(self.next_traverser()?);
            }
            let traverser = self.current.as_mut()?;
            let next = match self.sink.as_mut() {
                Some(sink) => traverser.next_arrival(sink),
                None => traverser.next_arrival(&mut NoDiagnostics),
            };
            match next {
                Ok(Some(path)) => {
                    self.found += 1;
                    return Some(Ok(Journey::from_path(&path)));
                }
                Ok(None) => self.current = None,
                Err(e) => {
                    self.failed = true;
                    self.current = None;
                    self.pending.clear();
                    return Some(Err(e.into()));
                }
            }
        }
    }
}

impl<T: GraphTransaction + ?Sized> Drop for JourneyStream<'_, T> {
    fn drop(&mut self) {
        self.current = None;
        debug!(
            path_requests = self.started,
            abandoned = self.pending.len(),
            found = self.found,
            "journey stream closed"
        );
    }
}

#[cfg(test)]
#[path = "calculator_tests.rs"]
mod tests;
