// src/models/mod.rs

//! Domain models for the monitor.
//!
//! Job definitions, persisted state, and configuration.

mod config;
mod job;
mod state;

// Re-export all public types
pub use config::{
    Config, FetcherConfig, FetcherKind, LoggingConfig, MonitorConfig, NotifierConfig,
    NotifierKind, StoreBackend, StoreConfig,
};
pub use job::{DetectionMode, Detector, Job, JobSpec, Trigger};
pub use state::{FetchedContent, Observation, PersistedState};
