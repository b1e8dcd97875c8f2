//! Batch delineation over many query points
//!
//! The network graph and catchment store are built once and shared
//! read-only by every query. Items are processed either lazily on the
//! caller's thread ([`BatchRunner::iter`]) or on a rayon pool with results
//! streamed back over a channel as they complete ([`BatchRunner::stream`]).
//! Every item carries its input position and query, so consumers never
//! depend on completion order.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{unbounded, Receiver, Sender};
use cuenca_algorithms::hydrology::{delineate_with, DelineateParams, WatershedResult};
use cuenca_core::{Error, GeometryResolver, NetworkGraph, NodeKey, Result};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::strategy::ProcessingMode;

/// One site to delineate. `source` is the network segment the site was
/// snapped to upstream of this crate; `None` means the site could not be
/// placed on the network.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPoint<Q, K> {
    pub label: Q,
    pub source: Option<K>,
}

impl<Q, K> QueryPoint<Q, K> {
    pub fn new(label: Q, source: K) -> Self {
        Self {
            label,
            source: Some(source),
        }
    }

    pub fn unresolved(label: Q) -> Self {
        Self { label, source: None }
    }
}

/// Cooperative stop signal shared between a running batch and its owner.
///
/// Items that have not started when the token fires come back as
/// [`BatchOutcome::Cancelled`]; items already running finish normally.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of one query point
#[derive(Debug)]
pub enum BatchOutcome<K> {
    Delineated(WatershedResult<K>),
    /// The query had no source segment
    Unresolved,
    /// Per-item failure, typically [`Error::UnknownNode`]
    Failed(Error),
    Cancelled,
}

impl<K> BatchOutcome<K> {
    pub fn is_delineated(&self) -> bool {
        matches!(self, BatchOutcome::Delineated(_))
    }

    /// Delineated, but some upstream segments had no catchment
    pub fn is_partial(&self) -> bool {
        matches!(self, BatchOutcome::Delineated(ws) if ws.coverage_warning.is_some())
    }

    pub fn watershed(&self) -> Option<&WatershedResult<K>> {
        match self {
            BatchOutcome::Delineated(ws) => Some(ws),
            _ => None,
        }
    }
}

/// A processed query point together with its input position
#[derive(Debug)]
pub struct BatchItem<Q, K> {
    pub index: usize,
    pub query: QueryPoint<Q, K>,
    pub outcome: BatchOutcome<K>,
}

/// Outcome counts of a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchTally {
    pub total: usize,
    pub delineated: usize,
    /// Subset of `delineated` that carried a coverage warning
    pub partial: usize,
    pub unresolved: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl BatchTally {
    pub fn record<K>(&mut self, outcome: &BatchOutcome<K>) {
        self.total += 1;
        match outcome {
            BatchOutcome::Delineated(ws) => {
                self.delineated += 1;
                if ws.coverage_warning.is_some() {
                    self.partial += 1;
                }
            }
            BatchOutcome::Unresolved => self.unresolved += 1,
            BatchOutcome::Failed(_) => self.failed += 1,
            BatchOutcome::Cancelled => self.cancelled += 1,
        }
    }

    /// Emit the final tally to the log
    pub fn log(&self) {
        info!("{}", self);
        if self.failed > 0 || self.unresolved > 0 {
            warn!(
                "{} of {} query points produced no watershed",
                self.failed + self.unresolved,
                self.total
            );
        }
    }
}

impl fmt::Display for BatchTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} query points: {} delineated ({} partial coverage), {} unresolved, {} failed, {} cancelled",
            self.total, self.delineated, self.partial, self.unresolved, self.failed, self.cancelled
        )
    }
}

/// Every item of a finished batch, in input order
#[derive(Debug)]
pub struct BatchReport<Q, K> {
    pub items: Vec<BatchItem<Q, K>>,
    pub tally: BatchTally,
}

/// Runs watershed delineation for a sequence of query points against a
/// shared network and catchment store.
pub struct BatchRunner<K: NodeKey, S> {
    graph: Arc<NetworkGraph<K>>,
    store: Arc<S>,
    params: DelineateParams,
    mode: ProcessingMode,
    cancel: CancelToken,
}

impl<K, S> BatchRunner<K, S>
where
    K: NodeKey,
    S: GeometryResolver<K> + 'static,
{
    pub fn new(graph: Arc<NetworkGraph<K>>, store: Arc<S>) -> Self {
        Self {
            graph,
            store,
            params: DelineateParams::default(),
            mode: ProcessingMode::default(),
            cancel: CancelToken::new(),
        }
    }

    /// Set delineation parameters, rejecting invalid ones before any item runs.
    pub fn with_params(mut self, params: DelineateParams) -> Result<Self> {
        params.validate()?;
        self.params = params;
        Ok(self)
    }

    pub fn with_mode(mut self, mode: ProcessingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that stops this runner
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Lazy, sequential, single pass over `queries`.
    pub fn iter<Q, I>(&self, queries: I) -> BatchIter<'_, K, S, I::IntoIter>
    where
        Q: fmt::Display,
        I: IntoIterator<Item = QueryPoint<Q, K>>,
    {
        BatchIter {
            runner: self,
            queries: queries.into_iter(),
            next_index: 0,
        }
    }

    /// Process `queries` on worker threads and yield items as they complete.
    pub fn stream<Q, I>(&self, queries: I) -> BatchStream<Q, K>
    where
        Q: fmt::Display + Send + 'static,
        I: IntoIterator<Item = QueryPoint<Q, K>>,
    {
        let queries: Vec<QueryPoint<Q, K>> = queries.into_iter().collect();
        let (tx, rx) = unbounded();

        let graph = Arc::clone(&self.graph);
        let store = Arc::clone(&self.store);
        let params = self.params.clone();
        let cancel = self.cancel.clone();
        let mode = self.mode;

        debug!("streaming {} query points ({:?})", queries.len(), mode);
        let handle = std::thread::spawn(move || {
            let job = Job {
                graph: &graph,
                store: store.as_ref(),
                params: &params,
                cancel: &cancel,
            };
            if mode.is_sequential() {
                for (index, query) in queries.into_iter().enumerate() {
                    if !send(&tx, job.process(index, query)) {
                        break;
                    }
                }
                Ok(())
            } else {
                mode.install(|| {
                    queries
                        .into_par_iter()
                        .enumerate()
                        .for_each_with(tx, |tx, (index, query)| {
                            send(tx, job.process(index, query));
                        })
                })
            }
        });

        BatchStream {
            items: rx,
            handle: Some(handle),
        }
    }

    /// Process every query and collect the items back into input order.
    pub fn run<Q, I>(&self, queries: I) -> Result<BatchReport<Q, K>>
    where
        Q: fmt::Display + Send + 'static,
        I: IntoIterator<Item = QueryPoint<Q, K>>,
    {
        let mut stream = self.stream(queries);
        let mut items: Vec<BatchItem<Q, K>> = stream.by_ref().collect();
        stream.finish()?;

        items.sort_by_key(|item| item.index);
        let mut tally = BatchTally::default();
        for item in &items {
            tally.record(&item.outcome);
        }
        tally.log();
        Ok(BatchReport { items, tally })
    }

    fn job(&self) -> Job<'_, K, S> {
        Job {
            graph: &self.graph,
            store: self.store.as_ref(),
            params: &self.params,
            cancel: &self.cancel,
        }
    }
}

/// Sends an item; `false` once the consumer has hung up
fn send<Q, K>(tx: &Sender<BatchItem<Q, K>>, item: BatchItem<Q, K>) -> bool {
    tx.send(item).is_ok()
}

/// Borrowed view of everything one item needs
struct Job<'a, K: NodeKey, S> {
    graph: &'a NetworkGraph<K>,
    store: &'a S,
    params: &'a DelineateParams,
    cancel: &'a CancelToken,
}

impl<K, S> Job<'_, K, S>
where
    K: NodeKey,
    S: GeometryResolver<K>,
{
    fn process<Q: fmt::Display>(&self, index: usize, query: QueryPoint<Q, K>) -> BatchItem<Q, K> {
        let outcome = if self.cancel.is_cancelled() {
            BatchOutcome::Cancelled
        } else {
            self.delineate(&query)
        };
        BatchItem {
            index,
            query,
            outcome,
        }
    }

    fn delineate<Q: fmt::Display>(&self, query: &QueryPoint<Q, K>) -> BatchOutcome<K> {
        let Some(source) = &query.source else {
            warn!("{}: not snapped to the network, skipped", query.label);
            return BatchOutcome::Unresolved;
        };

        match delineate_with(source, self.graph, self.store, self.params) {
            Ok(ws) => {
                info!(
                    "{}: source {}, {} of {} catchments matched ({:.1}%)",
                    query.label,
                    source,
                    ws.matched_count,
                    ws.upstream_count,
                    ws.match_percent()
                );
                if let Some(warning) = &ws.coverage_warning {
                    warn!("{}: {}", query.label, warning);
                }
                BatchOutcome::Delineated(ws)
            }
            Err(e) => {
                warn!("{}: {}", query.label, e);
                BatchOutcome::Failed(e)
            }
        }
    }
}

/// Sequential, lazily evaluated batch. See [`BatchRunner::iter`].
pub struct BatchIter<'r, K: NodeKey, S, I> {
    runner: &'r BatchRunner<K, S>,
    queries: I,
    next_index: usize,
}

impl<Q, K, S, I> Iterator for BatchIter<'_, K, S, I>
where
    Q: fmt::Display,
    K: NodeKey,
    S: GeometryResolver<K> + 'static,
    I: Iterator<Item = QueryPoint<Q, K>>,
{
    type Item = BatchItem<Q, K>;

    fn next(&mut self) -> Option<Self::Item> {
        let query = self.queries.next()?;
        let index = self.next_index;
        self.next_index += 1;
        Some(self.runner.job().process(index, query))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.queries.size_hint()
    }
}

/// Items of a concurrent batch in completion order. See [`BatchRunner::stream`].
pub struct BatchStream<Q, K> {
    items: Receiver<BatchItem<Q, K>>,
    handle: Option<JoinHandle<Result<()>>>,
}

impl<Q, K> BatchStream<Q, K> {
    /// Wait for the workers to stop and surface any pool failure.
    ///
    /// Items not yet received are discarded.
    pub fn finish(mut self) -> Result<()> {
        self.join()
    }

    fn join(&mut self) -> Result<()> {
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| Error::Other("batch worker thread panicked".into()))?,
            None => Ok(()),
        }
    }
}

impl<Q, K> Iterator for BatchStream<Q, K> {
    type Item = BatchItem<Q, K>;

    fn next(&mut self) -> Option<Self::Item> {
        self.items.recv().ok()
    }
}
