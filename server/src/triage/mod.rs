pub mod digest;
pub mod orchestrator;
pub mod rules;
pub mod runner;
pub mod schedule;
