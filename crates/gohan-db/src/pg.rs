//! Postgres implementation of the database collaborator (§6), including the
//! transactional outbox writer (C1): creates/updates/deletes append a single
//! event row in the same transaction as the underlying mutation, following
//! the version-capture rules of §4.1.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gohan_schemas::{EventRow, EventType, IsolationLevel, Resource, ResourceState, Schema};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Row, Transaction};

use crate::error::DbError;
use crate::notifier::CommitNotifier;
use crate::traits::{OutboxStore, StateStore, StateUpdateTxn};

pub const ENV_DB_URL: &str = "GOHAN_DATABASE_URL";

/// Postgres-backed handle for the database collaborator. Owns the commit
/// notifier (C2, §4.2) alongside the pool so every commit made through this
/// handle's create/update/delete methods can poke the pump the moment an
/// event-producing transaction lands, instead of leaving it to the 30s poll
/// tick.
#[derive(Clone)]
pub struct PgDb {
    pool: PgPool,
    notifier: CommitNotifier,
}

impl PgDb {
    /// Connect with a fresh, unshared [`CommitNotifier`]. Most callers should
    /// use [`PgDb::connect_with_notifier`] instead, passing the same instance
    /// wired into the pump (C3, §4.3) so this writer's commits actually wake
    /// it; this constructor exists for call sites (the CLI, ad hoc scripts)
    /// that have no pump to wake.
    pub async fn connect(database_url: &str) -> Result<Self, DbError> {
        Self::connect_with_notifier(database_url, CommitNotifier::new()).await
    }

    /// Connect, wiring `notifier` as the commit signal every event-producing
    /// transaction posts to on commit (§4.2).
    pub async fn connect_with_notifier(database_url: &str, notifier: CommitNotifier) -> Result<Self, DbError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool, notifier })
    }

    pub async fn connect_from_env() -> Result<Self, DbError> {
        let url = std::env::var(ENV_DB_URL).map_err(|_| DbError::MissingEnvVar(ENV_DB_URL.to_string()))?;
        Self::connect(&url).await
    }

    pub async fn migrate(&self) -> Result<(), DbError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// C1, create path: insert the resource row, seed `resource_state` for
    /// versioned schemas at `config_version=1`, and append a `create` event
    /// with `version=1` unless the schema suppresses sync.
    pub async fn create_resource(&self, schema: &Schema, resource: &Resource) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "insert into resources (schema_id, resource_id, path, body) values ($1, $2, $3, $4)",
        )
        .bind(&resource.schema_id)
        .bind(&resource.id)
        .bind(&resource.path)
        .bind(&resource.body)
        .execute(&mut *tx)
        .await?;

        if schema.state_versioning {
            sqlx::query(
                r#"
                insert into resource_state (schema_id, resource_id, config_version)
                values ($1, $2, 1)
                on conflict (schema_id, resource_id) do update set config_version = 1
                "#,
            )
            .bind(&resource.schema_id)
            .bind(&resource.id)
            .execute(&mut *tx)
            .await?;
        }

        let emitted_event = !schema.nosync;
        if emitted_event {
            insert_event(&mut tx, EventType::Create, &resource.path, 1, &resource.body).await?;
        }

        tx.commit().await?;
        if emitted_event {
            self.notifier.notify();
        }
        Ok(())
    }

    /// C1, update path: overwrite the resource body. For a versioned schema,
    /// bump `config_version` and capture the post-mutation value as the event
    /// version; for a non-versioned schema the event version is always `0`.
    pub async fn update_resource(&self, schema: &Schema, resource: &Resource) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("update resources set path = $3, body = $4 where schema_id = $1 and resource_id = $2")
            .bind(&resource.schema_id)
            .bind(&resource.id)
            .bind(&resource.path)
            .bind(&resource.body)
            .execute(&mut *tx)
            .await?;

        let version = if schema.state_versioning {
            let row: (i64,) = sqlx::query_as(
                r#"
                update resource_state
                   set config_version = config_version + 1
                 where schema_id = $1 and resource_id = $2
                returning config_version
                "#,
            )
            .bind(&resource.schema_id)
            .bind(&resource.id)
            .fetch_one(&mut *tx)
            .await?;
            row.0
        } else {
            0
        };

        let emitted_event = !schema.nosync;
        if emitted_event {
            insert_event(&mut tx, EventType::Update, &resource.path, version, &resource.body).await?;
        }

        tx.commit().await?;
        if emitted_event {
            self.notifier.notify();
        }
        Ok(())
    }

    /// C1, delete path: for a versioned schema, read `config_version` before
    /// deleting (the event version is `config_version + 1`) and capture the
    /// pre-delete body; for a non-versioned schema the event version is `0`.
    pub async fn delete_resource(
        &self,
        schema: &Schema,
        schema_id: &str,
        resource_id: &str,
    ) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "select path, body from resources where schema_id = $1 and resource_id = $2",
        )
        .bind(schema_id)
        .bind(resource_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Err(DbError::ResourceNotFound {
                schema_id: schema_id.to_string(),
                resource_id: resource_id.to_string(),
            });
        };
        let path: String = row.try_get("path")?;
        let body: serde_json::Value = row.try_get("body")?;

        let version = if schema.state_versioning {
            let existing: Option<(i64,)> = sqlx::query_as(
                "select config_version from resource_state where schema_id = $1 and resource_id = $2",
            )
            .bind(schema_id)
            .bind(resource_id)
            .fetch_optional(&mut *tx)
            .await?;
            existing.map(|(v,)| v).unwrap_or(0) + 1
        } else {
            0
        };

        sqlx::query("delete from resource_state where schema_id = $1 and resource_id = $2")
            .bind(schema_id)
            .bind(resource_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("delete from resources where schema_id = $1 and resource_id = $2")
            .bind(schema_id)
            .bind(resource_id)
            .execute(&mut *tx)
            .await?;

        let emitted_event = !schema.nosync;
        if emitted_event {
            insert_event(&mut tx, EventType::Delete, &path, version, &body).await?;
        }

        tx.commit().await?;
        if emitted_event {
            self.notifier.notify();
        }
        Ok(())
    }
}

async fn insert_event(
    tx: &mut Transaction<'_, Postgres>,
    event_type: EventType,
    path: &str,
    version: i64,
    body: &serde_json::Value,
) -> Result<(), DbError> {
    let body_str = body.to_string();
    sqlx::query(
        r#"
        insert into outbox_events (event_type, path, version, body)
        values ($1, $2, $3, $4)
        "#,
    )
    .bind(event_type.as_str())
    .bind(path)
    .bind(version)
    .bind(body_str)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait]
impl OutboxStore for PgDb {
    async fn read_batch(&self, limit: i64) -> Result<Vec<EventRow>, DbError> {
        let rows = sqlx::query(
            r#"
            select id, event_type, path, version, body, ts_utc
            from outbox_events
            order by id asc
            limit $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let event_type_str: String = row.try_get("event_type")?;
            let event_type = EventType::parse(&event_type_str).unwrap_or(EventType::Update);
            let ts: DateTime<Utc> = row.try_get("ts_utc")?;
            out.push(EventRow {
                id: row.try_get("id")?,
                event_type,
                path: row.try_get("path")?,
                version: row.try_get("version")?,
                body: row.try_get("body")?,
                timestamp: ts,
            });
        }
        Ok(out)
    }

    async fn delete_event(&self, id: i64) -> Result<(), DbError> {
        sqlx::query("delete from outbox_events where id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl StateStore for PgDb {
    /// §4.5: open a transaction at `isolation`, then `SELECT ... FOR UPDATE`
    /// the resource's state record so the fetch-decide-apply sequence in
    /// `gohan-reconcile` can't lose an update to a concurrent report for the
    /// same resource (the row lock holds until `commit`/rollback regardless
    /// of `isolation`).
    async fn begin_state_update(
        &self,
        schema_id: &str,
        resource_id: &str,
        isolation: IsolationLevel,
    ) -> Result<Box<dyn StateUpdateTxn>, DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!("set transaction isolation level {}", isolation.as_sql()))
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query(
            r#"
            select config_version, state_version, state, error, monitoring
            from resource_state
            where schema_id = $1 and resource_id = $2
            for update
            "#,
        )
        .bind(schema_id)
        .bind(resource_id)
        .fetch_optional(&mut *tx)
        .await?;

        let current = match row {
            Some(row) => Some(ResourceState {
                config_version: row.try_get("config_version")?,
                state_version: row.try_get("state_version")?,
                state: row.try_get("state")?,
                error: row.try_get("error")?,
                monitoring: row.try_get("monitoring")?,
            }),
            None => None,
        };

        Ok(Box::new(PgStateUpdateTxn {
            tx,
            schema_id: schema_id.to_string(),
            resource_id: resource_id.to_string(),
            current,
        }))
    }
}

/// Open `state_update` transaction handle (§4.5), holding the row lock taken
/// by `PgDb::begin_state_update` until [`PgStateUpdateTxn::commit`] runs (or
/// the handle is dropped, rolling back).
struct PgStateUpdateTxn {
    tx: Transaction<'static, Postgres>,
    schema_id: String,
    resource_id: String,
    current: Option<ResourceState>,
}

#[async_trait]
impl StateUpdateTxn for PgStateUpdateTxn {
    fn current(&self) -> Option<&ResourceState> {
        self.current.as_ref()
    }

    async fn commit(mut self: Box<Self>, new_state: ResourceState) -> Result<(), DbError> {
        sqlx::query(
            r#"
            update resource_state
               set state_version = $3,
                   state          = $4,
                   error          = $5,
                   monitoring     = $6
             where schema_id = $1 and resource_id = $2
            "#,
        )
        .bind(&self.schema_id)
        .bind(&self.resource_id)
        .bind(new_state.state_version)
        .bind(new_state.state)
        .bind(new_state.error)
        .bind(new_state.monitoring)
        .execute(&mut *self.tx)
        .await?;

        self.tx.commit().await?;
        Ok(())
    }
}
