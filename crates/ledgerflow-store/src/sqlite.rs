use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ledgerflow_config::FlowDefinition;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use crate::{FlowRun, FlowStore, RunStatus, RunStore, StoreError, TriggeredBy};

/// SQLite-based store implementation.
///
/// Definitions, logs and events are stored as JSON text next to the columns
/// used for filtering.
pub struct SqliteStore {
  pool: SqlitePool,
}

impl SqliteStore {
  /// Create a new SQLite store with the given connection pool.
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }

  /// Open (creating if missing) the database at `url` and run migrations.
  pub async fn connect(url: &str) -> Result<Self, StoreError> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    let store = Self::new(pool);
    store.migrate().await?;
    Ok(store)
  }

  /// A migrated store backed by a single in-memory connection.
  pub async fn in_memory() -> Result<Self, StoreError> {
    let pool = SqlitePoolOptions::new()
      .max_connections(1)
      .idle_timeout(None)
      .max_lifetime(None)
      .connect("sqlite::memory:")
      .await?;
    let store = Self::new(pool);
    store.migrate().await?;
    Ok(store)
  }

  /// Run database migrations.
  pub async fn migrate(&self) -> Result<(), StoreError> {
    sqlx::migrate!("../../migrations").run(&self.pool).await?;
    Ok(())
  }

  /// Insert or replace a flow definition.
  pub async fn save_flow(&self, flow: &FlowDefinition) -> Result<(), StoreError> {
    let definition = serde_json::to_string(flow)?;
    sqlx::query(
      r#"
            INSERT INTO flows (flow_id, org_id, name, status, deleted_at, definition)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (flow_id) DO UPDATE SET
              org_id = excluded.org_id,
              name = excluded.name,
              status = excluded.status,
              deleted_at = excluded.deleted_at,
              definition = excluded.definition
            "#,
    )
    .bind(&flow.id)
    .bind(&flow.org_id)
    .bind(&flow.name)
    .bind(flow.status.as_str())
    .bind(flow.deleted_at)
    .bind(definition)
    .execute(&self.pool)
    .await?;

    Ok(())
  }
}

fn flow_from_row(row: &SqliteRow) -> Result<FlowDefinition, StoreError> {
  let definition: String = row.try_get("definition")?;
  let mut flow: FlowDefinition = serde_json::from_str(&definition)?;
  flow.deleted_at = row.try_get("deleted_at")?;
  Ok(flow)
}

fn run_from_row(row: &SqliteRow) -> Result<FlowRun, StoreError> {
  let triggered_by: String = row.try_get("triggered_by")?;
  let status: String = row.try_get("status")?;
  let trigger_event: String = row.try_get("trigger_event")?;
  let log: String = row.try_get("log")?;
  let pending: String = row.try_get("pending")?;

  Ok(FlowRun {
    id: row.try_get("run_id")?,
    flow_id: row.try_get("flow_id")?,
    org_id: row.try_get("org_id")?,
    triggered_by: TriggeredBy::from_str(&triggered_by)?,
    trigger_event: serde_json::from_str(&trigger_event)?,
    status: RunStatus::from_str(&status)?,
    started_at: row.try_get::<DateTime<Utc>, _>("started_at")?,
    completed_at: row.try_get::<Option<DateTime<Utc>>, _>("completed_at")?,
    log: serde_json::from_str(&log)?,
    pending: serde_json::from_str(&pending)?,
  })
}

#[async_trait]
impl FlowStore for SqliteStore {
  async fn get_flow(
    &self,
    org_id: &str,
    flow_id: &str,
  ) -> Result<Option<FlowDefinition>, StoreError> {
    let row = sqlx::query(
      r#"
            SELECT definition, deleted_at
            FROM flows
            WHERE flow_id = ? AND org_id = ? AND deleted_at IS NULL
            "#,
    )
    .bind(flow_id)
    .bind(org_id)
    .fetch_optional(&self.pool)
    .await?;

    row.as_ref().map(flow_from_row).transpose()
  }

  async fn list_active_flows(&self, org_id: &str) -> Result<Vec<FlowDefinition>, StoreError> {
    let rows = sqlx::query(
      r#"
            SELECT definition, deleted_at
            FROM flows
            WHERE org_id = ? AND status = 'ACTIVE' AND deleted_at IS NULL
            ORDER BY rowid ASC
            "#,
    )
    .bind(org_id)
    .fetch_all(&self.pool)
    .await?;

    rows.iter().map(flow_from_row).collect()
  }
}

#[async_trait]
impl RunStore for SqliteStore {
  async fn record_run(&self, run: &FlowRun) -> Result<(), StoreError> {
    sqlx::query(
            r#"
            INSERT INTO flow_runs (run_id, flow_id, org_id, triggered_by, trigger_event, status, started_at, completed_at, log, pending)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&run.id)
        .bind(&run.flow_id)
        .bind(&run.org_id)
        .bind(run.triggered_by.as_str())
        .bind(serde_json::to_string(&run.trigger_event)?)
        .bind(run.status.as_str())
        .bind(run.started_at)
        .bind(run.completed_at)
        .bind(serde_json::to_string(&run.log)?)
        .bind(serde_json::to_string(&run.pending)?)
        .execute(&self.pool)
        .await?;

    Ok(())
  }

  async fn get_run(&self, run_id: &str) -> Result<FlowRun, StoreError> {
    let row = sqlx::query(
            r#"
            SELECT run_id, flow_id, org_id, triggered_by, trigger_event, status, started_at, completed_at, log, pending
            FROM flow_runs
            WHERE run_id = ?
            "#,
        )
        .bind(run_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(run_id.to_string()))?;

    run_from_row(&row)
  }

  async fn update_run(&self, run: &FlowRun, prior_steps: usize) -> Result<(), StoreError> {
    let prior_steps = i64::try_from(prior_steps)
      .map_err(|_| StoreError::InvalidRecord(format!("log too long: {prior_steps}")))?;
    let result = sqlx::query(
      r#"
            UPDATE flow_runs
            SET status = ?, completed_at = ?, log = ?, pending = ?
            WHERE run_id = ? AND status = 'WAITING' AND json_array_length(log) = ?
            "#,
    )
    .bind(run.status.as_str())
    .bind(run.completed_at)
    .bind(serde_json::to_string(&run.log)?)
    .bind(serde_json::to_string(&run.pending)?)
    .bind(&run.id)
    .bind(prior_steps)
    .execute(&self.pool)
    .await?;

    if result.rows_affected() == 0 {
      // Missing, terminal, or extended by someone else.
      let stored = self.get_run(&run.id).await?;
      if stored.status != RunStatus::Waiting {
        return Err(StoreError::NotWaiting(run.id.clone()));
      }
      return Err(StoreError::Conflict(run.id.clone()));
    }

    Ok(())
  }

  async fn list_runs(&self, flow_id: &str) -> Result<Vec<FlowRun>, StoreError> {
    let rows = sqlx::query(
            r#"
            SELECT run_id, flow_id, org_id, triggered_by, trigger_event, status, started_at, completed_at, log, pending
            FROM flow_runs
            WHERE flow_id = ?
            ORDER BY started_at ASC, rowid ASC
            "#,
        )
        .bind(flow_id)
        .fetch_all(&self.pool)
        .await?;

    rows.iter().map(run_from_row).collect()
  }
}
