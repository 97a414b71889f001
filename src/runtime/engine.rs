use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use thiserror::Error;
use tracing::{debug, info};

use crate::compute::{
    lfa_paths, rlfa_paths, shortest_paths, tilfa_paths, RlfaParams, TopologyView,
};
use crate::model::repository::{GenerateKind, PathRepository, PathsView, QueryError};
use crate::model::PairRecord;
use crate::model::topology::{NodeId, Topology};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("path generation cancelled")]
    Cancelled,
}

/// Cooperative cancellation flag, checked between per-source tasks. Clones
/// share the flag, so one handed to a signal handler stops a generation
/// run in progress.
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

#[derive(Debug, Clone, Default)]
pub struct EngineParams {
    pub rlfa: RlfaParams,
    /// Worker threads for generation. Defaults to the available
    /// parallelism, capped by the number of source nodes.
    pub workers: Option<NonZeroUsize>,
}

/// Owns the topology and the path repository; every generation and query
/// operation goes through it. Construct once per topology.
pub struct FrrEngine {
    topology: Topology,
    repository: PathRepository,
    params: EngineParams,
}

impl FrrEngine {
    pub fn new(topology: Topology) -> Self {
        Self::with_params(topology, EngineParams::default())
    }

    pub fn with_params(topology: Topology, params: EngineParams) -> Self {
        let repository = PathRepository::new(&topology);
        FrrEngine {
            topology,
            repository,
            params,
        }
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn repository(&self) -> &PathRepository {
        &self.repository
    }

    pub fn is_generated(&self, kind: GenerateKind) -> bool {
        self.repository.is_generated(kind)
    }

    /// Recompute and overwrite every pair's entries for `kind`. The repair
    /// kinds need the pre-failure shortest paths in place, so generating
    /// one of them first generates `Spt` when it has not run yet.
    ///
    /// A cancelled run leaves the repository untouched for the kind being
    /// generated.
    pub fn generate_all(
        &mut self,
        kind: GenerateKind,
        cancel: Option<&CancelToken>,
    ) -> Result<(), EngineError> {
        if kind != GenerateKind::Spt && !self.repository.is_generated(GenerateKind::Spt) {
            self.run_generation(GenerateKind::Spt, cancel)?;
        }
        self.run_generation(kind, cancel)
    }

    fn run_generation(
        &mut self,
        kind: GenerateKind,
        cancel: Option<&CancelToken>,
    ) -> Result<(), EngineError> {
        let results = self.compute_all(kind, cancel)?;
        self.repository.clear_generation(kind);
        for ((src, dst), partial) in results {
            if let Some(record) = self.repository.record_mut(src, dst) {
                merge_record(record, kind, partial);
            }
        }
        self.repository.mark_generated(kind);
        Ok(())
    }

    /// Per-source computations are independent and write disjoint pair
    /// keys, so sources are fanned out over a bounded worker pool.
    fn compute_all(
        &self,
        kind: GenerateKind,
        cancel: Option<&CancelToken>,
    ) -> Result<Vec<((NodeId, NodeId), PairRecord)>, EngineError> {
        let sources: Vec<NodeId> = self.topology.nodes().collect();
        let workers = self
            .params
            .workers
            .map(NonZeroUsize::get)
            .or_else(|| thread::available_parallelism().ok().map(NonZeroUsize::get))
            .unwrap_or(1)
            .min(sources.len())
            .max(1);
        info!(
            kind = kind.as_str(),
            sources = sources.len(),
            workers,
            "generating paths"
        );

        let next = AtomicUsize::new(0);
        let results: Mutex<Vec<((NodeId, NodeId), PairRecord)>> =
            Mutex::new(Vec::new());

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    if cancel.is_some_and(CancelToken::is_cancelled) {
                        break;
                    }
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    let Some(&src) = sources.get(index) else { break };
                    debug!(
                        kind = kind.as_str(),
                        src = self.topology.node_name(src),
                        "computing source"
                    );
                    let batch =
                        compute_source(&self.topology, &self.params.rlfa, kind, src);
                    let mut guard = match results.lock() {
                        Ok(guard) => guard,
                        Err(poison) => poison.into_inner(),
                    };
                    guard.extend(batch);
                });
            }
        });

        if cancel.is_some_and(CancelToken::is_cancelled) {
            return Err(EngineError::Cancelled);
        }

        let mut out = match results.into_inner() {
            Ok(out) => out,
            Err(poison) => poison.into_inner(),
        };
        // Keys are disjoint, ordering only matters for determinism of the
        // merged repository's internal state.
        out.sort_by_key(|(key, _)| *key);
        Ok(out)
    }

    pub fn get_paths(
        &self,
        src: Option<&str>,
        dst: Option<&str>,
    ) -> Result<PathsView, QueryError> {
        let src = src.map(|name| self.resolve(name)).transpose()?;
        let dst = dst.map(|name| self.resolve(name)).transpose()?;
        Ok(self.repository.get_paths(&self.topology, src, dst))
    }

    pub fn get_paths_via(&self, via: &str) -> Result<PathsView, QueryError> {
        let via = self.resolve(via)?;
        Ok(self.repository.get_paths_via(&self.topology, via))
    }

    fn resolve(&self, name: &str) -> Result<NodeId, QueryError> {
        self.topology
            .node_id(name)
            .ok_or_else(|| QueryError::UnknownNode(name.to_string()))
    }
}

fn compute_source(
    topo: &Topology,
    rlfa: &RlfaParams,
    kind: GenerateKind,
    src: NodeId,
) -> Vec<((NodeId, NodeId), PairRecord)> {
    let view = TopologyView::full(topo);
    let mut out = Vec::new();
    for dst in topo.nodes() {
        if dst == src {
            continue;
        }
        let mut partial = PairRecord::default();
        match kind {
            GenerateKind::Spt => {
                partial.cost = shortest_paths(&view, src, dst);
            }
            GenerateKind::Lfa => {
                let lfas = lfa_paths(topo, src, dst);
                partial.lfas_link = lfas.link;
                partial.lfas_dstream = lfas.downstream;
                partial.lfas_node = lfas.node;
            }
            GenerateKind::Rlfa => {
                let rlfas = rlfa_paths(topo, src, dst, *rlfa);
                partial.rlfas_link = rlfas.link;
                partial.rlfas_node = rlfas.node;
            }
            GenerateKind::Tilfa => {
                let tilfas = tilfa_paths(topo, src, dst);
                partial.tilfa_link = tilfas.link;
                partial.tilfa_node = tilfas.node;
            }
        }
        out.push(((src, dst), partial));
    }
    out
}

fn merge_record(record: &mut PairRecord, kind: GenerateKind, partial: PairRecord) {
    match kind {
        GenerateKind::Spt => record.cost = partial.cost,
        GenerateKind::Lfa => {
            record.lfas_link = partial.lfas_link;
            record.lfas_dstream = partial.lfas_dstream;
            record.lfas_node = partial.lfas_node;
        }
        GenerateKind::Rlfa => {
            record.rlfas_link = partial.rlfas_link;
            record.rlfas_node = partial.rlfas_node;
        }
        GenerateKind::Tilfa => {
            record.tilfa_link = partial.tilfa_link;
            record.tilfa_node = partial.tilfa_node;
        }
    }
}
