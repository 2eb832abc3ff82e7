//! Append-only, per-profile event log.
//!
//! Every profile owns an ordered stream of [`EventEnvelope`]s whose versions
//! run 1, 2, 3, ... without gaps. Snapshots are ordinary entries in the same
//! stream. [`EventStore`] is the persistence boundary; [`InMemoryEventStore`]
//! and [`PostgresEventStore`] implement it.

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::{ActorId, ProfileId};
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventId, ProfileEvent, ProfileField, Version};
pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use store::{EventStore, EventStoreExt};
