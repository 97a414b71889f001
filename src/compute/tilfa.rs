use std::collections::BTreeSet;

use tracing::debug;

use super::spf::{path_cost, shortest_paths, TopologyView};
use crate::model::path::{Path, RepairCandidate, Segment, TiLfaRepair};
use crate::model::topology::{NodeId, Topology};

/// TI-LFA repair sets for one (source, destination) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TiLfaPaths {
    pub link: Vec<TiLfaRepair>,
    pub node: Vec<TiLfaRepair>,
}

/// The resource whose failure the repair list must steer around.
#[derive(Debug, Clone)]
enum Resource {
    Links(BTreeSet<(NodeId, NodeId)>),
    Nodes(BTreeSet<NodeId>),
}

impl Resource {
    fn blocks_path(&self, path: &Path) -> bool {
        match self {
            Resource::Links(links) => path
                .links()
                .any(|(u, v)| links.contains(&(u, v)) || links.contains(&(v, u))),
            Resource::Nodes(nodes) => {
                nodes.iter().any(|node| path.contains(*node))
            }
        }
    }
}

/// Compute TI-LFA link and node protecting repairs for `src` toward `dst`.
///
/// Each protection variant masks the failed resource out of the topology,
/// takes the post-convergence shortest path set, and encodes every post
/// path as a segment list per the draft's repair cases: empty list for a
/// direct neighbor in PQ, one node segment for a remote PQ node, node plus
/// adjacency segment for an adjacent P-Q pair. Post paths needing a longer
/// explicit route (distant P and Q) are dropped, that computation is out
/// of scope. Survivors are reduced to the minimal segment count; cost is
/// already tied across the post-convergence set.
pub fn tilfa_paths(topo: &Topology, src: NodeId, dst: NodeId) -> TiLfaPaths {
    let mut tilfas = TiLfaPaths::default();
    let view = TopologyView::full(topo);

    let primary_paths = shortest_paths(&view, src, dst);
    if primary_paths.is_empty() {
        return tilfas;
    }
    let primary_hops: BTreeSet<NodeId> =
        primary_paths.iter().filter_map(Path::first_hop).collect();

    let failed_links: Vec<(NodeId, NodeId)> =
        primary_hops.iter().map(|hop| (src, *hop)).collect();
    let link_view = TopologyView::without_links(topo, &failed_links);
    tilfas.link = repairs_for(
        topo,
        &link_view,
        Resource::Links(failed_links.into_iter().collect()),
        src,
        dst,
    );

    // A primary next hop that is the destination itself cannot be treated
    // as a failed node.
    if !primary_hops.contains(&dst) {
        let failed_nodes: Vec<NodeId> =
            primary_hops.iter().copied().collect();
        let node_view = TopologyView::without_nodes(topo, &failed_nodes);
        tilfas.node = repairs_for(
            topo,
            &node_view,
            Resource::Nodes(primary_hops),
            src,
            dst,
        );
    }

    tilfas
}

fn repairs_for(
    topo: &Topology,
    masked: &TopologyView<'_>,
    resource: Resource,
    src: NodeId,
    dst: NodeId,
) -> Vec<TiLfaRepair> {
    let post_paths = shortest_paths(masked, src, dst);
    if post_paths.is_empty() {
        return Vec::new();
    }

    let p = p_space(topo, &resource, src, dst);
    let q = q_space(topo, &resource, src, dst);

    let mut repairs: Vec<TiLfaRepair> = Vec::new();
    for path in &post_paths {
        match encode_repair(topo, &p, &q, path) {
            Some(repair) => repairs.push(repair),
            None => debug!(
                src = topo.node_name(src),
                dst = topo.node_name(dst),
                "post path needs distant P-Q segments, skipped"
            ),
        }
    }

    // Secondary reduction: among the tied-cost survivors keep only those
    // expressible with the fewest segments.
    let Some(min_segments) =
        repairs.iter().map(|r| r.segments.len()).min()
    else {
        return repairs;
    };
    repairs.retain(|r| r.segments.len() == min_segments);
    repairs
}

/// Nodes every one of whose pre-failure shortest paths from `src` avoids
/// the failed resource, ECMP members included.
fn p_space(
    topo: &Topology,
    resource: &Resource,
    src: NodeId,
    dst: NodeId,
) -> BTreeSet<NodeId> {
    let view = TopologyView::full(topo);
    let mut space = BTreeSet::new();
    for node in topo.nodes() {
        if node == src || node == dst {
            continue;
        }
        let paths = shortest_paths(&view, src, node);
        if !paths.is_empty()
            && paths.iter().all(|path| !resource.blocks_path(path))
        {
            space.insert(node);
        }
    }
    space
}

/// Nodes whose pre-failure shortest paths toward `dst` all avoid the
/// failed resource.
fn q_space(
    topo: &Topology,
    resource: &Resource,
    src: NodeId,
    dst: NodeId,
) -> BTreeSet<NodeId> {
    let view = TopologyView::full(topo);
    let mut space = BTreeSet::new();
    for node in topo.nodes() {
        if node == src || node == dst {
            continue;
        }
        let paths = shortest_paths(&view, node, dst);
        if !paths.is_empty()
            && paths.iter().all(|path| !resource.blocks_path(path))
        {
            space.insert(node);
        }
    }
    space
}

/// Encode one post-convergence path as a repair list.
///
/// P membership is anchored at the path head (the repairing router is
/// trivially in its own P-space) and Q membership at the tail (the
/// destination trivially reaches itself). `None` means the P and Q
/// anchors sit more than one hop apart on this path.
fn encode_repair(
    topo: &Topology,
    p: &BTreeSet<NodeId>,
    q: &BTreeSet<NodeId>,
    path: &Path,
) -> Option<TiLfaRepair> {
    let last = path.hops.len().checked_sub(1)?;
    let in_p = |i: usize| i == 0 || p.contains(&path.hops[i]);
    let in_q = |i: usize| i == last || q.contains(&path.hops[i]);

    let q_idx = (1..=last).find(|i| in_q(*i))?;
    let p_idx = (0..=q_idx).rev().find(|i| in_p(*i))?;

    let segments = if q_idx == 1 && q_idx == last {
        // The post path is a surviving direct link to the destination;
        // a plain next-hop swap delivers without any stack.
        Vec::new()
    } else if p_idx == q_idx {
        if q_idx == 1 {
            // Direct neighbor in P and Q: plain next-hop swap, no stack.
            Vec::new()
        } else {
            vec![Segment::Node(path.hops[q_idx])]
        }
    } else if q_idx == p_idx + 1 {
        let p_node = path.hops[p_idx];
        let q_node = path.hops[q_idx];
        if p_idx == 0 {
            vec![Segment::Adjacency(p_node, q_node)]
        } else {
            vec![Segment::Node(p_node), Segment::Adjacency(p_node, q_node)]
        }
    } else {
        return None;
    };

    let to_hops = path.hops.get(..=q_idx)?.to_vec();
    let from_hops = path.hops.get(q_idx..)?.to_vec();
    let to_repair = Path {
        cost: path_cost(topo, &to_hops)?,
        hops: to_hops,
    };
    let from_repair = Path {
        cost: path_cost(topo, &from_hops)?,
        hops: from_hops,
    };
    Some(TiLfaRepair {
        candidate: RepairCandidate {
            to_repair: vec![to_repair],
            from_repair: vec![from_repair],
        },
        segments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::topology::Topology;

    fn id(topo: &Topology, name: &str) -> NodeId {
        topo.node_id(name).expect("node exists")
    }

    fn names(topo: &Topology, path: &Path) -> Vec<String> {
        path.hops
            .iter()
            .map(|n| topo.node_name(*n).to_string())
            .collect()
    }

    #[test]
    fn direct_neighbor_repair_needs_no_segments() {
        let topo = Topology::builder()
            .node("R1")
            .node("R2")
            .node("R3")
            .link("R1", "R2", 10)
            .link("R2", "R3", 10)
            .link("R3", "R1", 10)
            .build()
            .expect("valid topology");
        let tilfas = tilfa_paths(&topo, id(&topo, "R1"), id(&topo, "R2"));

        assert_eq!(tilfas.link.len(), 1);
        let repair = &tilfas.link[0];
        assert!(repair.segments.is_empty());
        assert_eq!(names(&topo, &repair.candidate.to_repair[0]), ["R1", "R3"]);
        assert_eq!(
            names(&topo, &repair.candidate.from_repair[0]),
            ["R3", "R2"]
        );
        // The failing next hop is the destination, no node protection.
        assert!(tilfas.node.is_empty());
    }

    #[test]
    fn remote_pq_node_takes_one_node_segment() {
        let topo = Topology::builder()
            .node("S")
            .node("E")
            .node("D")
            .node("A")
            .node("B")
            .link("S", "E", 1)
            .link("E", "D", 1)
            .link("S", "A", 1)
            .link("A", "B", 1)
            .link("B", "D", 2)
            .build()
            .expect("valid topology");
        let tilfas = tilfa_paths(&topo, id(&topo, "S"), id(&topo, "D"));

        // Post path S-A-B-D. A's own best paths to D tie through the
        // failed link, so the first Q node along the path is B.
        assert_eq!(tilfas.link.len(), 1);
        let repair = &tilfas.link[0];
        assert_eq!(repair.segments, vec![Segment::Node(id(&topo, "B"))]);
        assert_eq!(
            names(&topo, &repair.candidate.to_repair[0]),
            ["S", "A", "B"]
        );
        assert_eq!(names(&topo, &repair.candidate.from_repair[0]), ["B", "D"]);

        // Node protection masks E instead and lands on the same repair.
        assert_eq!(tilfas.node.len(), 1);
        assert_eq!(
            tilfas.node[0].segments,
            vec![Segment::Node(id(&topo, "B"))]
        );
    }

    #[test]
    fn surviving_direct_link_needs_no_segments() {
        // The best path S-E-D fails but an expensive direct S-D link
        // survives. Forwarding straight to the destination needs no
        // adjacency segment.
        let topo = Topology::builder()
            .node("S")
            .node("E")
            .node("D")
            .link("S", "E", 1)
            .link("E", "D", 1)
            .link("S", "D", 10)
            .build()
            .expect("valid topology");
        let tilfas = tilfa_paths(&topo, id(&topo, "S"), id(&topo, "D"));

        assert_eq!(tilfas.link.len(), 1);
        let repair = &tilfas.link[0];
        assert!(repair.segments.is_empty());
        assert_eq!(names(&topo, &repair.candidate.to_repair[0]), ["S", "D"]);
        assert_eq!(repair.candidate.to_repair[0].cost, 10);

        assert_eq!(tilfas.node.len(), 1);
        assert!(tilfas.node[0].segments.is_empty());
    }

    #[test]
    fn adjacent_p_and_q_take_node_plus_adjacency_segments() {
        let topo = Topology::builder()
            .node("S")
            .node("E")
            .node("D")
            .node("A")
            .node("B")
            .link("S", "E", 1)
            .link("E", "D", 1)
            .link("S", "A", 1)
            .link("A", "B", 4)
            .link("B", "D", 1)
            .build()
            .expect("valid topology");
        let tilfas = tilfa_paths(&topo, id(&topo, "S"), id(&topo, "D"));

        // B's best path from S runs through the failed link, so B is not
        // in P-space; A is not in Q-space. They are adjacent on the post
        // path S-A-B-D.
        assert_eq!(tilfas.link.len(), 1);
        let a = id(&topo, "A");
        let b = id(&topo, "B");
        assert_eq!(
            tilfas.link[0].segments,
            vec![Segment::Node(a), Segment::Adjacency(a, b)]
        );
    }

    #[test]
    fn sid_annotated_topology_yields_numeric_label_stack() {
        use crate::model::path::{EntryView, PathEntry};

        let topo = Topology::builder()
            .node("S")
            .node("E")
            .node("D")
            .node_with("A", None, Some(16001))
            .node("B")
            .link("S", "E", 1)
            .link("E", "D", 1)
            .link("S", "A", 1)
            .link_with_sid("A", "B", 4, Some(24001))
            .link("B", "D", 1)
            .build()
            .expect("valid topology");
        let tilfas = tilfa_paths(&topo, id(&topo, "S"), id(&topo, "D"));

        assert_eq!(tilfas.link.len(), 1);
        let entry = PathEntry::SegmentRepair(tilfas.link[0].clone());
        let EntryView::Repair {
            segments: Some(segments),
            ..
        } = EntryView::from_entry(&topo, &entry)
        else {
            panic!("tilfa repair renders as a repair view");
        };
        assert_eq!(segments, ["node-sid(16001)", "adj-sid(24001)"]);
    }

    #[test]
    fn unreachable_destination_yields_no_repairs() {
        let topo = Topology::builder()
            .node("A")
            .node("B")
            .node("C")
            .link("A", "B", 1)
            .build()
            .expect("valid topology");
        let tilfas = tilfa_paths(&topo, id(&topo, "A"), id(&topo, "C"));
        assert_eq!(tilfas, TiLfaPaths::default());
    }
}
