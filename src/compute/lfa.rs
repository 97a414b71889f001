use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::spf::{shortest_distances, shortest_paths, TopologyView};
use crate::model::path::Path;
use crate::model::topology::{NodeId, Topology};

/// RFC 5286 classification result for one (source, destination) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LfaPaths {
    /// Inequality 1 holds, inequality 3 does not: link protecting only.
    pub link: Vec<Path>,
    /// Inequality 2 (downstream path criterion). Recorded independently;
    /// the RFC leaves its deployment preference ambiguous, so callers pick.
    pub downstream: Vec<Path>,
    /// Inequality 3 holds against every ECMP primary next hop.
    pub node: Vec<Path>,
}

/// Classify every neighbor of `src` as a loop-free alternate toward `dst`.
///
/// The primary next-hop set may hold several nodes (ECMP primaries); the
/// inequalities are evaluated per (S, E, D) triple and an alternate only
/// counts as node protecting when it clears inequality 3 for all of them.
pub fn lfa_paths(topo: &Topology, src: NodeId, dst: NodeId) -> LfaPaths {
    let mut lfas = LfaPaths::default();
    let view = TopologyView::full(topo);

    let primary_paths = shortest_paths(&view, src, dst);
    if primary_paths.is_empty() {
        return lfas;
    }
    let primary_hops: BTreeSet<NodeId> =
        primary_paths.iter().filter_map(Path::first_hop).collect();

    let dist_from_src = shortest_distances(&view, src);
    let Some(s_d_cost) = dist_from_src.get(&dst).copied() else {
        return lfas;
    };

    // Distances from each primary next hop, needed by inequality 3.
    let primary_dists: BTreeMap<NodeId, BTreeMap<NodeId, u64>> = primary_hops
        .iter()
        .map(|hop| (*hop, shortest_distances(&view, *hop)))
        .collect();

    for (neighbor, _) in topo.neighbors(src) {
        if neighbor == dst || primary_hops.contains(&neighbor) {
            continue;
        }

        let dist_from_nei = shortest_distances(&view, neighbor);
        let (Some(n_d_cost), Some(n_s_cost)) = (
            dist_from_nei.get(&dst).copied(),
            dist_from_nei.get(&src).copied(),
        ) else {
            continue;
        };

        // Inequality 1, loop-free criterion:
        // dist(N, D) < dist(N, S) + dist(S, D)
        let link_prot = n_d_cost < n_s_cost.saturating_add(s_d_cost);

        // Inequality 2, downstream path criterion:
        // dist(N, D) < dist(S, D)
        let down_prot = n_d_cost < s_d_cost;

        // Inequality 3, per ECMP primary E:
        // dist(N, D) < dist(N, E) + dist(E, D)
        let node_prot = link_prot
            && primary_hops.iter().all(|primary| {
                let (Some(n_e_cost), Some(e_d_cost)) = (
                    dist_from_nei.get(primary).copied(),
                    primary_dists
                        .get(primary)
                        .and_then(|dist| dist.get(&dst))
                        .copied(),
                ) else {
                    return false;
                };
                n_d_cost < n_e_cost.saturating_add(e_d_cost)
            });

        if !link_prot && !down_prot {
            continue;
        }

        debug!(
            src = topo.node_name(src),
            dst = topo.node_name(dst),
            alternate = topo.node_name(neighbor),
            link_prot,
            down_prot,
            node_prot,
            "classified lfa alternate"
        );

        // The alternate path set is the neighbor's own ECMP best paths,
        // each prefixed with the repairing router.
        let alternate_paths: Vec<Path> = shortest_paths(&view, neighbor, dst)
            .into_iter()
            .filter_map(|path| {
                let mut hops = Vec::with_capacity(path.hops.len() + 1);
                hops.push(src);
                hops.extend(path.hops);
                let cost = super::spf::path_cost(topo, &hops)?;
                Some(Path { hops, cost })
            })
            .collect();

        // Protecting the pre-failure ECMP set also requires the alternate
        // paths themselves to steer clear of every primary first hop.
        let avoids_primaries = alternate_paths
            .iter()
            .all(|path| !primary_hops.iter().any(|hop| path.contains(*hop)));

        // Link and node classes are mutually exclusive; downstream is an
        // independent record.
        let fully_node_prot = node_prot && avoids_primaries;
        for path in alternate_paths {
            if down_prot {
                lfas.downstream.push(path.clone());
            }
            if fully_node_prot {
                lfas.node.push(path);
            } else if link_prot {
                lfas.link.push(path);
            }
        }
    }

    lfas
}
