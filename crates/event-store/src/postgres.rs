use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    ActorId, EventEnvelope, EventId, EventStoreError, ProfileEvent, ProfileId, Result, Version,
    store::{EventStore, ensure_next_version},
};

const SELECT_COLUMNS: &str =
    "SELECT id, profile_id, version, event_type, occurred_at, changed_by, payload FROM profile_events";

/// PostgreSQL-backed event store implementation.
///
/// The `unique_profile_version` constraint is the last line of defence
/// against two writers landing on the same version.
#[derive(Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    /// Creates a new PostgreSQL event store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `database_url` and creates a store over a fresh pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_event(row: PgRow) -> Result<EventEnvelope> {
        let payload: serde_json::Value = row.try_get("payload")?;
        let event: ProfileEvent = serde_json::from_value(payload)?;

        Ok(EventEnvelope {
            event_id: EventId::from_uuid(row.try_get::<Uuid, _>("id")?),
            profile_id: ProfileId::from_uuid(row.try_get::<Uuid, _>("profile_id")?),
            version: Version::new(row.try_get("version")?),
            occurred_at: row.try_get("occurred_at")?,
            changed_by: ActorId::from_uuid(row.try_get::<Uuid, _>("changed_by")?),
            event,
        })
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    async fn append_event(&self, event: EventEnvelope) -> Result<Version> {
        let profile_id = event.profile_id;
        let payload = serde_json::to_value(&event.event)?;

        let mut tx = self.pool.begin().await?;

        let current: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM profile_events WHERE profile_id = $1")
                .bind(profile_id.as_uuid())
                .fetch_one(&mut *tx)
                .await?;
        ensure_next_version(
            profile_id,
            Version::new(current.unwrap_or(0)),
            event.version,
        )?;

        sqlx::query(
            r#"
            INSERT INTO profile_events (id, profile_id, version, event_type, occurred_at, changed_by, payload)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(event.event_id.as_uuid())
        .bind(profile_id.as_uuid())
        .bind(event.version.as_i64())
        .bind(event.event_type())
        .bind(event.occurred_at)
        .bind(event.changed_by.as_uuid())
        .bind(payload)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            // A concurrent writer committed the same version between our
            // MAX(version) read and this insert.
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("unique_profile_version")
            {
                return EventStoreError::VersionConflict {
                    profile_id,
                    expected: event.version,
                    actual: event.version,
                };
            }
            EventStoreError::StorageUnavailable(e)
        })?;

        tx.commit().await?;
        tracing::trace!(
            %profile_id,
            version = %event.version,
            event_type = event.event_type(),
            "appended event"
        );
        Ok(event.version)
    }

    async fn current_version(&self, profile_id: ProfileId) -> Result<Version> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM profile_events WHERE profile_id = $1")
                .bind(profile_id.as_uuid())
                .fetch_one(&self.pool)
                .await?;

        Ok(Version::new(version.unwrap_or(0)))
    }

    async fn has_events(&self, profile_id: ProfileId) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM profile_events WHERE profile_id = $1)",
        )
        .bind(profile_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn events_from_version(
        &self,
        profile_id: ProfileId,
        from_version: Version,
    ) -> Result<Vec<EventEnvelope>> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE profile_id = $1 AND version > $2 ORDER BY version ASC"
        ))
        .bind(profile_id.as_uuid())
        .bind(from_version.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_event).collect()
    }

    async fn latest_snapshot(&self, profile_id: ProfileId) -> Result<Option<EventEnvelope>> {
        let row: Option<PgRow> = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE profile_id = $1 AND event_type = $2 ORDER BY version DESC LIMIT 1"
        ))
        .bind(profile_id.as_uuid())
        .bind("ProfileSnapshot")
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_event).transpose()
    }
}
