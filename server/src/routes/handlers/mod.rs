pub mod common;
pub mod cron;
pub mod digest;
pub mod rules;
pub mod settings;
pub mod triage;
