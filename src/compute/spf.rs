use std::collections::{BTreeMap, BTreeSet};

use super::frontier::DistanceFrontier;
use crate::model::path::Path;
use crate::model::topology::{NodeId, Topology};

/// Read-only view of a topology with failed links and/or nodes masked out.
/// The FRR engines use this to model the post-failure network without ever
/// mutating the graph itself.
#[derive(Debug, Clone)]
pub struct TopologyView<'a> {
    topo: &'a Topology,
    blocked_nodes: BTreeSet<NodeId>,
    blocked_links: BTreeSet<(NodeId, NodeId)>,
}

impl<'a> TopologyView<'a> {
    pub fn full(topo: &'a Topology) -> Self {
        Self {
            topo,
            blocked_nodes: BTreeSet::new(),
            blocked_links: BTreeSet::new(),
        }
    }

    /// Mask a set of undirected links. Both traversal directions of each
    /// link are blocked.
    pub fn without_links(topo: &'a Topology, links: &[(NodeId, NodeId)]) -> Self {
        let mut blocked_links = BTreeSet::new();
        for (u, v) in links {
            blocked_links.insert((*u, *v));
            blocked_links.insert((*v, *u));
        }
        Self {
            topo,
            blocked_nodes: BTreeSet::new(),
            blocked_links,
        }
    }

    pub fn without_nodes(topo: &'a Topology, nodes: &[NodeId]) -> Self {
        Self {
            topo,
            blocked_nodes: nodes.iter().copied().collect(),
            blocked_links: BTreeSet::new(),
        }
    }

    pub fn topology(&self) -> &'a Topology {
        self.topo
    }

    pub fn neighbors(&self, node: NodeId) -> impl Iterator<Item = (NodeId, u64)> + '_ {
        self.topo.neighbors(node).filter(move |(next, _)| {
            !self.blocked_nodes.contains(next) && !self.blocked_links.contains(&(node, *next))
        })
    }

    pub fn is_blocked(&self, node: NodeId) -> bool {
        self.blocked_nodes.contains(&node)
    }
}

/// Dijkstra distances from `root` to every reachable node. Unreachable
/// nodes are simply absent from the result; `dist[root] == 0`.
pub fn shortest_distances(view: &TopologyView<'_>, root: NodeId) -> BTreeMap<NodeId, u64> {
    let mut dist: BTreeMap<NodeId, u64> = BTreeMap::new();
    let mut settled: BTreeSet<NodeId> = BTreeSet::new();
    let mut frontier = DistanceFrontier::new();

    if view.is_blocked(root) {
        return dist;
    }
    dist.insert(root, 0);
    frontier.push(root, 0);

    loop {
        let Some((u, cost_u)) = frontier.pop_min(|node, cost| {
            if settled.contains(&node) {
                return true;
            }
            match dist.get(&node) {
                Some(best) => cost > *best,
                None => true,
            }
        }) else {
            break;
        };
        settled.insert(u);

        for (v, link_cost) in view.neighbors(u) {
            let candidate = cost_u.saturating_add(link_cost);
            let best = dist.get(&v).copied().unwrap_or(u64::MAX);
            if candidate < best {
                dist.insert(v, candidate);
                frontier.push(v, candidate);
            }
        }
    }

    dist
}

/// The complete set of tied minimum-cost simple paths from `src` to `dst`,
/// in lexicographic node order. ECMP sets must be enumerated exactly, so
/// every shortest path is produced, not a sample. Unreachable or invalid
/// pairs yield an empty set.
pub fn shortest_paths(view: &TopologyView<'_>, src: NodeId, dst: NodeId) -> Vec<Path> {
    if src == dst || view.is_blocked(src) || view.is_blocked(dst) {
        return Vec::new();
    }

    let dist_from_src = shortest_distances(view, src);
    let Some(best_cost) = dist_from_src.get(&dst).copied() else {
        return Vec::new();
    };
    // Undirected graph: distances from dst double as distances *to* dst.
    let dist_from_dst = shortest_distances(view, dst);

    // A node lies on some shortest path iff its two distances sum to the
    // best cost; a link (u, v) lies on one iff it additionally relaxes
    // exactly. DFS over that DAG enumerates every tied path once.
    let mut paths = Vec::new();
    let mut stack = vec![src];
    collect_paths(
        view,
        src,
        dst,
        best_cost,
        &dist_from_src,
        &dist_from_dst,
        &mut stack,
        &mut paths,
    );
    paths
}

#[allow(clippy::too_many_arguments)]
fn collect_paths(
    view: &TopologyView<'_>,
    current: NodeId,
    dst: NodeId,
    best_cost: u64,
    dist_from_src: &BTreeMap<NodeId, u64>,
    dist_from_dst: &BTreeMap<NodeId, u64>,
    stack: &mut Vec<NodeId>,
    paths: &mut Vec<Path>,
) {
    if current == dst {
        paths.push(Path {
            hops: stack.clone(),
            cost: best_cost,
        });
        return;
    }

    let Some(here) = dist_from_src.get(&current).copied() else {
        return;
    };
    for (next, link_cost) in view.neighbors(current) {
        let Some(tail) = dist_from_dst.get(&next) else {
            continue;
        };
        if here.saturating_add(link_cost).saturating_add(*tail) == best_cost {
            stack.push(next);
            collect_paths(
                view,
                next,
                dst,
                best_cost,
                dist_from_src,
                dist_from_dst,
                stack,
                paths,
            );
            stack.pop();
        }
    }
}

/// Cost of an explicit path through the (unmasked) topology; `None` if any
/// consecutive pair is not linked.
pub fn path_cost(topo: &Topology, hops: &[NodeId]) -> Option<u64> {
    let mut cost: u64 = 0;
    for pair in hops.windows(2) {
        cost = cost.saturating_add(topo.link_weight(pair[0], pair[1])?);
    }
    Some(cost)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::topology::Topology;

    fn square() -> Topology {
        // R1 - R2
        //  |    |
        // R4 - R3    all weights 1
        Topology::builder()
            .node("R1")
            .node("R2")
            .node("R3")
            .node("R4")
            .link("R1", "R2", 1)
            .link("R2", "R3", 1)
            .link("R3", "R4", 1)
            .link("R4", "R1", 1)
            .build()
            .expect("valid topology")
    }

    fn id(topo: &Topology, name: &str) -> NodeId {
        topo.node_id(name).expect("node exists")
    }

    #[test]
    fn distances_include_zero_self_distance() {
        let topo = square();
        let view = TopologyView::full(&topo);
        let dist = shortest_distances(&view, id(&topo, "R1"));
        assert_eq!(dist[&id(&topo, "R1")], 0);
        assert_eq!(dist[&id(&topo, "R3")], 2);
    }

    #[test]
    fn enumerates_all_tied_paths() {
        let topo = square();
        let view = TopologyView::full(&topo);
        let paths = shortest_paths(&view, id(&topo, "R1"), id(&topo, "R3"));
        assert_eq!(paths.len(), 2);
        assert_eq!(
            paths[0].hops,
            vec![id(&topo, "R1"), id(&topo, "R2"), id(&topo, "R3")]
        );
        assert_eq!(
            paths[1].hops,
            vec![id(&topo, "R1"), id(&topo, "R4"), id(&topo, "R3")]
        );
        assert!(paths.iter().all(|p| p.cost == 2));
    }

    #[test]
    fn unreachable_destination_is_empty_not_error() {
        let topo = Topology::builder()
            .node("R1")
            .node("R2")
            .node("R3")
            .link("R1", "R2", 1)
            .build()
            .expect("valid topology");
        let view = TopologyView::full(&topo);
        assert!(shortest_paths(&view, id(&topo, "R1"), id(&topo, "R3")).is_empty());
        assert!(!shortest_distances(&view, id(&topo, "R1")).contains_key(&id(&topo, "R3")));
    }

    #[test]
    fn masked_link_forces_the_long_way_around() {
        let topo = square();
        let r1 = id(&topo, "R1");
        let r2 = id(&topo, "R2");
        let view = TopologyView::without_links(&topo, &[(r1, r2)]);
        let paths = shortest_paths(&view, r1, r2);
        assert_eq!(paths.len(), 1);
        assert_eq!(
            paths[0].hops,
            vec![r1, id(&topo, "R4"), id(&topo, "R3"), r2]
        );
        assert_eq!(paths[0].cost, 3);
    }

    #[test]
    fn masked_node_is_unreachable_and_untraversable() {
        let topo = square();
        let r1 = id(&topo, "R1");
        let r3 = id(&topo, "R3");
        let r2 = id(&topo, "R2");
        let view = TopologyView::without_nodes(&topo, &[r2]);
        let paths = shortest_paths(&view, r1, r3);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].hops, vec![r1, id(&topo, "R4"), r3]);
        assert!(shortest_paths(&view, r1, r2).is_empty());
    }

    #[test]
    fn maximum_weight_chain_accumulates_exactly() {
        let max = Topology::MAX_LINK_WEIGHT;
        let topo = Topology::builder()
            .node("A")
            .node("B")
            .node("C")
            .node("D")
            .link("A", "B", max)
            .link("B", "C", max)
            .link("C", "D", max)
            .build()
            .expect("valid topology");
        let view = TopologyView::full(&topo);

        let dist = shortest_distances(&view, id(&topo, "A"));
        assert_eq!(dist[&id(&topo, "D")], 3 * max);

        let paths = shortest_paths(&view, id(&topo, "A"), id(&topo, "D"));
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].cost, 3 * max);
        assert_eq!(path_cost(&topo, &paths[0].hops), Some(3 * max));
    }

    #[test]
    fn explicit_path_cost_detects_missing_links() {
        let topo = square();
        let hops = vec![id(&topo, "R1"), id(&topo, "R2"), id(&topo, "R3")];
        assert_eq!(path_cost(&topo, &hops), Some(2));
        let broken = vec![id(&topo, "R1"), id(&topo, "R3")];
        assert_eq!(path_cost(&topo, &broken), None);
    }
}
