// Common library shared between the rotator service and the test crates

pub mod config;
pub mod db;
pub mod errors;
pub mod gateway;
pub mod models;
pub mod registry;
pub mod rotation;
pub mod schedule;
pub mod scheduler;
pub mod stores;
pub mod telemetry;
pub mod template;
