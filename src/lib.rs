pub mod compute;
pub mod model;
pub mod runtime;
