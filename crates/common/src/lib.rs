//! Identifier types shared across the profile event log crates.

mod types;

pub use types::{ActorId, ProfileId};
