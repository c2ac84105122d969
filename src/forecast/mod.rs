pub mod artifact;
pub mod boosting;
pub mod error;
pub mod features;
pub mod orchestrator;
pub mod predict;
pub mod trainer;
