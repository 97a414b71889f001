use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::spf::{shortest_distances, shortest_paths, TopologyView};
use crate::model::path::{Path, RepairCandidate};
use crate::model::topology::{NodeId, Topology};

/// Knobs for RFC 7490 candidate selection.
#[derive(Debug, Clone, Copy)]
pub struct RlfaParams {
    /// Widen the search to extended P-space, the repairing router's own
    /// P-space unioned with its neighbors' P-spaces.
    pub use_ep_space: bool,
    /// Admit repair tunnels whose PQ-to-destination leg re-crosses a node
    /// already traversed on the way to the PQ node.
    pub allow_trombone: bool,
}

impl Default for RlfaParams {
    fn default() -> Self {
        RlfaParams {
            use_ep_space: true,
            allow_trombone: false,
        }
    }
}

/// RFC 7490 classification result for one (source, destination) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RlfaPaths {
    pub link: Vec<RepairCandidate>,
    pub node: Vec<RepairCandidate>,
}

/// Lazily computed per-root distance tables over the unmasked topology.
struct DistCache<'a> {
    view: TopologyView<'a>,
    maps: BTreeMap<NodeId, BTreeMap<NodeId, u64>>,
}

impl<'a> DistCache<'a> {
    fn new(topo: &'a Topology) -> Self {
        DistCache {
            view: TopologyView::full(topo),
            maps: BTreeMap::new(),
        }
    }

    fn dist(&mut self, from: NodeId, to: NodeId) -> Option<u64> {
        if !self.maps.contains_key(&from) {
            let map = shortest_distances(&self.view, from);
            self.maps.insert(from, map);
        }
        self.maps.get(&from).and_then(|m| m.get(&to).copied())
    }

    /// Unreachable pairs rank as infinitely far.
    fn dist_or_max(&mut self, from: NodeId, to: NodeId) -> u64 {
        self.dist(from, to).unwrap_or(u64::MAX)
    }

    fn paths(&self, from: NodeId, to: NodeId) -> Vec<Path> {
        shortest_paths(&self.view, from, to)
    }
}

/// Compute the remote LFA repair candidates for traffic from `src` to `dst`.
pub fn rlfa_paths(
    topo: &Topology,
    src: NodeId,
    dst: NodeId,
    params: RlfaParams,
) -> RlfaPaths {
    let mut rlfas = RlfaPaths::default();
    let mut cache = DistCache::new(topo);

    let primary_paths = cache.paths(src, dst);
    if primary_paths.is_empty() {
        return rlfas;
    }
    let primary_hops: BTreeSet<NodeId> =
        primary_paths.iter().filter_map(Path::first_hop).collect();

    let inner_space = if params.use_ep_space {
        extended_p_space(topo, &mut cache, src, dst)
    } else {
        p_space(topo, &mut cache, src, src, dst)
    };
    let q = q_space(topo, &mut cache, src, dst);
    let pq_nodes: BTreeSet<NodeId> =
        inner_space.intersection(&q).copied().collect();
    debug!(
        src = topo.node_name(src),
        dst = topo.node_name(dst),
        pq = pq_nodes.len(),
        "pq candidate set"
    );

    rlfas.link = link_candidates(
        &mut cache,
        &pq_nodes,
        &primary_hops,
        src,
        dst,
        params.allow_trombone,
    );
    rlfas.node = node_candidates(topo, &rlfas.link, &primary_hops);
    rlfas
}

/// P-space of `root` with respect to the first-hop link(s) of `src` toward
/// `dst`. For the repairing router itself `root == src`; for extended
/// P-space `root` is one of its neighbors.
fn p_space(
    topo: &Topology,
    cache: &mut DistCache<'_>,
    root: NodeId,
    src: NodeId,
    dst: NodeId,
) -> BTreeSet<NodeId> {
    let mut space = BTreeSet::new();

    let root_paths = cache.paths(root, dst);
    if root_paths.is_empty() {
        return space;
    }
    let mut fh_nodes = BTreeSet::new();
    let mut fh_cost = u64::MAX;
    for path in &root_paths {
        let Some(hop) = path.first_hop() else { continue };
        if let Some(weight) = topo.link_weight(root, hop) {
            fh_cost = fh_cost.min(weight);
        }
        fh_nodes.insert(hop);
    }

    for candidate in topo.nodes() {
        if candidate == dst || candidate == root {
            continue;
        }

        // Excise nodes whose own best paths toward dst run back through
        // the repairing router, ECMP members included.
        let toward_dst = cache.paths(candidate, dst);
        if toward_dst.iter().any(|p| p.hops[1..].contains(&src)) {
            continue;
        }

        // A neighbor's candidate may only be reached from src via the
        // protected direction; drop it when every tunnel path would cross
        // the destination side.
        let from_src = cache.paths(src, candidate);
        if from_src.iter().any(|p| p.contains(dst)) {
            continue;
        }

        // Cost form: dist(root, P) < dist(root, E) + dist(E, P), taken
        // against the cheapest first hop.
        let root_cost = cache.dist_or_max(root, candidate);
        let via_fh = fh_nodes
            .iter()
            .map(|fh| cache.dist_or_max(*fh, candidate))
            .min()
            .unwrap_or(u64::MAX);
        if root_cost < fh_cost.saturating_add(via_fh) {
            space.insert(candidate);
        }
    }

    space
}

/// The repairing router's own P-space plus the P-spaces of its neighbors,
/// the latter admitted in cost terms
/// dist(N, P) < dist(N, S) + dist(S, D) + dist(D, P).
fn extended_p_space(
    topo: &Topology,
    cache: &mut DistCache<'_>,
    src: NodeId,
    dst: NodeId,
) -> BTreeSet<NodeId> {
    let mut space = p_space(topo, cache, src, src, dst);
    let neighbors: Vec<NodeId> =
        topo.neighbors(src).map(|(nei, _)| nei).collect();

    for nei in neighbors {
        if nei == dst {
            continue;
        }
        for candidate in p_space(topo, cache, nei, src, dst) {
            if candidate == src || space.contains(&candidate) {
                continue;
            }
            let n_p = cache.dist_or_max(nei, candidate);
            let n_s = cache.dist_or_max(nei, src);
            let s_d = cache.dist_or_max(src, dst);
            let d_p = cache.dist_or_max(dst, candidate);
            if n_p < n_s.saturating_add(s_d).saturating_add(d_p) {
                space.insert(candidate);
            }
        }
    }

    space
}

/// Q-space of `dst` with respect to the protected link from `src`, in cost
/// terms dist(N, D) < dist(N, S) + dist(S, D).
fn q_space(
    topo: &Topology,
    cache: &mut DistCache<'_>,
    src: NodeId,
    dst: NodeId,
) -> BTreeSet<NodeId> {
    let mut space = BTreeSet::new();
    let s_d = cache.dist_or_max(src, dst);

    for node in topo.nodes() {
        if node == src || node == dst {
            continue;
        }
        let Some(n_d) = cache.dist(node, dst) else { continue };
        let n_s = cache.dist_or_max(node, src);
        if n_d < n_s.saturating_add(s_d) {
            space.insert(node);
        }
    }

    space
}

/// Keep the minimal total tunnel cost set of PQ endpoints, tied candidates
/// retained, each as a (src to PQ, PQ to dst) pair of ECMP path lists.
fn link_candidates(
    cache: &mut DistCache<'_>,
    pq_nodes: &BTreeSet<NodeId>,
    primary_hops: &BTreeSet<NodeId>,
    src: NodeId,
    dst: NodeId,
    allow_trombone: bool,
) -> Vec<RepairCandidate> {
    let mut best: Vec<RepairCandidate> = Vec::new();
    let mut best_cost = u64::MAX;

    for &pq in pq_nodes {
        // A first hop can sit in PQ-space, but with the protected link down
        // it is no longer a usable tunnel endpoint.
        if primary_hops.contains(&pq) {
            continue;
        }

        let to_repair = cache.paths(src, pq);
        let from_repair = cache.paths(pq, dst);
        if to_repair.is_empty() || from_repair.is_empty() {
            continue;
        }

        if !allow_trombone && trombones(&to_repair, &from_repair) {
            debug!(pq = pq.index(), "skipping trombone rlfa candidate");
            continue;
        }

        let tunnel_cost = cache
            .dist_or_max(src, pq)
            .saturating_add(cache.dist_or_max(pq, dst));
        let candidate = RepairCandidate {
            to_repair,
            from_repair,
        };
        if tunnel_cost < best_cost {
            best_cost = tunnel_cost;
            best = vec![candidate];
        } else if tunnel_cost == best_cost {
            best.push(candidate);
        }
    }

    best
}

/// A tunnel trombones when the leg from the PQ node back toward the
/// destination revisits a node already crossed on the way out.
fn trombones(to_repair: &[Path], from_repair: &[Path]) -> bool {
    to_repair.iter().any(|out| {
        let outbound = out.hops.len().saturating_sub(1);
        out.hops.iter().take(outbound).any(|hop| {
            from_repair
                .iter()
                .any(|back| back.hops.get(1..).is_some_and(|tail| tail.contains(hop)))
        })
    })
}

/// RFC 7490 node failure handling, option 2: a candidate is node protecting
/// only when no pre-convergence primary first hop appears on any path from
/// the repair endpoint to the destination.
fn node_candidates(
    topo: &Topology,
    link_candidates: &[RepairCandidate],
    primary_hops: &BTreeSet<NodeId>,
) -> Vec<RepairCandidate> {
    link_candidates
        .iter()
        .filter(|candidate| {
            let overlap = primary_hops.iter().any(|fh| {
                candidate
                    .from_repair
                    .iter()
                    .any(|path| path.contains(*fh))
            });
            if overlap {
                debug!(
                    repair = candidate
                        .repair_node()
                        .map(|n| topo.node_name(n))
                        .unwrap_or(""),
                    "candidate not node protecting"
                );
            }
            !overlap
        })
        .cloned()
        .collect()
}
