//! Orchestration: the pipeline, its outcomes and the submission cooldown

pub mod cooldown;
pub mod outcome;
pub mod pipeline;

pub use cooldown::*;
pub use outcome::*;
pub use pipeline::*;
