pub mod config;
pub mod engine;

pub use config::load_topology;
pub use engine::{CancelToken, EngineError, EngineParams, FrrEngine};
