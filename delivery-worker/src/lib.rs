#![deny(clippy::all, clippy::pedantic, clippy::nursery, dead_code)]

pub mod clients;
pub mod health;
pub mod journey;
pub mod notify;
pub mod orchestrator;
pub mod poller;
pub mod types;
