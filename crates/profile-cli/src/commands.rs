//! Subcommands of `profile-log` and their execution against a store.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::Subcommand;
use common::{ActorId, ProfileId};
use event_store::{EventEnvelope, EventStore, ProfileEvent, ProfileField};
use profile::aggregate::validate_field_value;
use profile::{FieldChange, Profile, ProfileService};

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Apply pending database migrations
    Migrate,
    /// Print the reconstructed state of a profile as JSON
    Show {
        /// Profile ID
        profile_id: ProfileId,
        /// Reconstruct the state as of this RFC 3339 timestamp instead of now
        #[arg(long)]
        as_of: Option<DateTime<Utc>>,
    },
    /// List the recorded changes of a profile, oldest first
    History {
        /// Profile ID
        profile_id: ProfileId,
    },
    /// Write a snapshot if the log has grown past the threshold
    Snapshot {
        /// Profile ID
        profile_id: ProfileId,
    },
    /// Change one field of a profile
    Set {
        /// Profile ID
        profile_id: ProfileId,
        /// Field to change (display_name or birthday)
        field: ProfileField,
        /// New value; omit to clear an optional field
        value: Option<String>,
    },
    /// Record a synthetic creation event for a profile that predates the log
    Backfill {
        /// Profile ID
        profile_id: ProfileId,
        /// Current display name of the profile
        #[arg(long)]
        display_name: String,
        /// Current birthday of the profile (YYYY-MM-DD)
        #[arg(long)]
        birthday: Option<NaiveDate>,
    },
}

/// Runs one subcommand, writing its result to stdout.
pub async fn execute<S: EventStore>(
    command: Command,
    service: &ProfileService<S>,
    actor: ActorId,
) -> Result<()> {
    match command {
        Command::Migrate => {
            tracing::info!("in-memory store has no schema to migrate");
        }
        Command::Show { profile_id, as_of } => {
            let state = match as_of {
                Some(as_of) => service.get_profile_at(profile_id, as_of).await?,
                None => service.get_profile(profile_id).await?,
            };
            match state {
                Some(state) => println!("{}", serde_json::to_string_pretty(&state)?),
                None => println!("profile {profile_id} has no recorded state"),
            }
        }
        Command::History { profile_id } => {
            for envelope in service.history(profile_id).await? {
                println!("{}", format_history_line(&envelope));
            }
        }
        Command::Snapshot { profile_id } => {
            let written = service
                .recorder()
                .replay()
                .create_snapshot_if_needed(profile_id, actor)
                .await?;
            if written {
                println!("snapshot written for profile {profile_id}");
            } else {
                println!("no snapshot due for profile {profile_id}");
            }
        }
        Command::Set {
            profile_id,
            field,
            value,
        } => {
            let state = service.get_profile(profile_id).await?.with_context(|| {
                format!("profile {profile_id} has no events; run `backfill` first")
            })?;
            let mut profile =
                Profile::from_parts(profile_id, state.display_name(), state.birthday());

            match service.update_field(&mut profile, actor, field, value).await? {
                FieldChange::Recorded(version) => {
                    println!("recorded {field} change at version {version}")
                }
                FieldChange::Unchanged => println!("{field} already has that value"),
            }
        }
        Command::Backfill {
            profile_id,
            display_name,
            birthday,
        } => {
            validate_field_value(ProfileField::DisplayName, Some(&display_name))?;
            let profile = Profile::from_parts(profile_id, display_name, birthday);

            if service
                .recorder()
                .ensure_events_exist(&profile, actor)
                .await?
            {
                println!("backfilled profile {profile_id}");
            } else {
                println!("profile {profile_id} already has events");
            }
        }
    }
    Ok(())
}

fn format_history_line(envelope: &EventEnvelope) -> String {
    let change = match &envelope.event {
        ProfileEvent::Created {
            display_name,
            birthday,
        } => format!(
            "created display_name={display_name:?} birthday={}",
            birthday.as_deref().unwrap_or("-")
        ),
        ProfileEvent::FieldUpdated {
            field_name,
            old_value,
            new_value,
        } => format!(
            "{field_name}: {} -> {}",
            old_value.as_deref().unwrap_or("-"),
            new_value.as_deref().unwrap_or("-")
        ),
        ProfileEvent::Snapshot { .. } => "snapshot".to_string(),
    };

    format!(
        "v{}\t{}\t{}\t{}",
        envelope.version,
        envelope.occurred_at.to_rfc3339(),
        envelope.changed_by,
        change
    )
}
