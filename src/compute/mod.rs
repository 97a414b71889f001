//! Path-computation engines: all-pairs SPF with full ECMP enumeration,
//! RFC 5286 LFA classification, RFC 7490 remote LFA selection, and TI-LFA
//! segment-stack reduction. All engines are pure functions over an
//! immutable [`Topology`](crate::model::Topology).

pub mod frontier;
pub mod lfa;
pub mod rlfa;
pub mod spf;
pub mod tilfa;

pub use frontier::DistanceFrontier;
pub use lfa::{lfa_paths, LfaPaths};
pub use rlfa::{rlfa_paths, RlfaParams, RlfaPaths};
pub use spf::{path_cost, shortest_distances, shortest_paths, TopologyView};
pub use tilfa::{tilfa_paths, TiLfaPaths};
