pub mod account;
pub mod email_log;
pub mod labels;
pub mod response;
pub mod rule;
pub mod run_history;
pub mod settings;
