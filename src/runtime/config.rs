use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::model::topology::Topology;

#[derive(Debug, Deserialize)]
struct RawNode {
    id: String,
    label: Option<String>,
    node_sid: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawLink {
    source: String,
    target: String,
    weight: i64,
    adj_sid: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawTopology {
    #[serde(default)]
    nodes: Vec<RawNode>,
    #[serde(default)]
    links: Vec<RawLink>,
}

/// Load a topology from a node-link file, JSON or YAML by extension.
///
/// Malformed graphs (negative, zero, or oversized weights, self-loops,
/// parallel links, unknown endpoints, duplicate SIDs) are rejected here,
/// before any engine sees them.
pub fn load_topology(path: &Path) -> Result<Topology> {
    let raw_text = fs::read_to_string(path)
        .with_context(|| format!("failed to read topology file {}", path.display()))?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let raw: RawTopology = if is_json {
        serde_json::from_str(&raw_text).context("failed to parse topology json")?
    } else {
        serde_yaml::from_str(&raw_text).context("failed to parse topology yaml")?
    };

    build_topology(raw)
}

fn build_topology(raw: RawTopology) -> Result<Topology> {
    let mut builder = Topology::builder();

    for node in raw.nodes {
        builder = builder.node_with(node.id, node.label, node.node_sid);
    }

    for link in raw.links {
        if link.weight <= 0 {
            bail!(
                "link {}-{} has non-positive weight {}",
                link.source,
                link.target,
                link.weight
            );
        }
        builder = builder.link_with_sid(
            link.source,
            link.target,
            link.weight as u64,
            link.adj_sid,
        );
    }

    builder.build().context("invalid topology")
}
