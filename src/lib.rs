pub mod agents;
pub mod chat;
pub mod cli;
pub mod config;
pub mod doctor;
pub mod error;
pub mod pii;
pub mod pipeline;
pub mod profiles;
pub mod provider;
pub mod runner;
pub mod schema;
pub mod session;
pub mod streaming;
pub mod telemetry;
pub mod tools;
pub mod triage;
