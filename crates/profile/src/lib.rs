//! Event-sourced profile state engine.
//!
//! This crate provides:
//! - [`EventRecorder`]: turns profile changes into versioned log entries and
//!   backfills logs for profiles that predate them
//! - [`ReplayService`]: rebuilds current or historical [`ProfileState`] and
//!   maintains snapshots
//! - [`ProfileService`]: the mutation/read workflow built on both

pub mod aggregate;
pub mod config;
pub mod error;
pub mod recorder;
pub mod replay;
pub mod service;
pub mod state;

pub use aggregate::Profile;
pub use config::{EngineConfig, RetryPolicy, SnapshotPolicy};
pub use error::DomainError;
pub use recorder::EventRecorder;
pub use replay::ReplayService;
pub use service::{FieldChange, ProfileService};
pub use state::ProfileState;
