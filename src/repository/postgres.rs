//! PostgreSQL lending store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, Pool, Postgres};

use super::LendingStore;
use crate::{
    error::{AppError, AppResult},
    models::{
        hardware_type::{CreateHardwareType, HardwareType, InventoryCounts, UpdateHardwareType},
        policy::LendingPolicy,
        request::{HardwareRequest, RequestFilter, RequestScope, Transition, TransitionOutcome},
    },
};

const ACTIVE: &str = "pickup_time IS NOT NULL AND return_time IS NULL";

/// Hardware type row joined with its request counts
#[derive(FromRow)]
struct InventoryRow {
    #[sqlx(flatten)]
    hardware: HardwareType,
    active_count: i64,
    not_available_count: i64,
}

impl InventoryRow {
    fn into_parts(self) -> (HardwareType, InventoryCounts) {
        let counts = InventoryCounts {
            total_count: self.hardware.total_count as i64,
            active_count: self.active_count,
            not_available_count: self.not_available_count,
        };
        (self.hardware, counts)
    }
}

#[derive(Clone)]
pub struct PgLendingStore {
    pool: Pool<Postgres>,
}

impl PgLendingStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Count the requests of one type, inside the caller's transaction
    async fn count_for_type(
        conn: &mut PgConnection,
        type_id: i32,
        total_count: i32,
        cutoff: DateTime<Utc>,
    ) -> AppResult<InventoryCounts> {
        let (active_count, not_available_count): (i64, i64) = sqlx::query_as(&format!(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE {ACTIVE}) AS active_count,
                COUNT(*) FILTER (WHERE ({ACTIVE}) OR (pickup_time IS NULL AND created_at >= $2)) AS not_available_count
            FROM hardware_requests
            WHERE type_id = $1
            "#
        ))
        .bind(type_id)
        .bind(cutoff)
        .fetch_one(&mut *conn)
        .await?;

        Ok(InventoryCounts {
            total_count: total_count as i64,
            active_count,
            not_available_count,
        })
    }

    /// Read a type's total and optionally hold its row lock until commit
    async fn type_total(conn: &mut PgConnection, type_id: i32, lock: bool) -> AppResult<i32> {
        let query = if lock {
            "SELECT total_count FROM hardware_types WHERE id = $1 FOR UPDATE"
        } else {
            "SELECT total_count FROM hardware_types WHERE id = $1"
        };
        sqlx::query_scalar::<_, i32>(query)
            .bind(type_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Hardware type {} not found", type_id)))
    }

    /// Whether the scope compares `created_at` against the expiry cutoff
    fn uses_cutoff(scope: RequestScope) -> bool {
        !matches!(scope, RequestScope::Active)
    }

    /// Build the WHERE clause for a request filter. Placeholders follow the
    /// bind order: cutoff when the scope uses it, then requestor.
    fn filter_clause(filter: &RequestFilter) -> String {
        let mut conditions = Vec::new();
        let mut idx = 1;

        match filter.scope {
            RequestScope::Pending => {
                conditions.push(format!("(pickup_time IS NULL AND created_at >= ${})", idx));
                idx += 1;
            }
            RequestScope::Historic => {
                conditions.push(format!(
                    "((pickup_time IS NULL AND created_at >= ${}) OR pickup_time IS NOT NULL)",
                    idx
                ));
                idx += 1;
            }
            RequestScope::Active => conditions.push(format!("({ACTIVE})")),
        }
        if filter.requestor_id.is_some() {
            conditions.push(format!("requestor_id = ${}", idx));
        }

        format!("WHERE {}", conditions.join(" AND "))
    }

    fn map_unique_violation(e: sqlx::Error, name: &str) -> AppError {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict(format!("Hardware type '{}' already exists", name))
            }
            _ => AppError::Database(e),
        }
    }
}

#[async_trait]
impl LendingStore for PgLendingStore {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_types(&self) -> AppResult<Vec<HardwareType>> {
        let rows = sqlx::query_as::<_, HardwareType>("SELECT * FROM hardware_types ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn get_type(&self, id: i32) -> AppResult<HardwareType> {
        sqlx::query_as::<_, HardwareType>("SELECT * FROM hardware_types WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Hardware type {} not found", id)))
    }

    async fn get_types(&self, ids: &[i32]) -> AppResult<Vec<HardwareType>> {
        let rows = sqlx::query_as::<_, HardwareType>(
            "SELECT * FROM hardware_types WHERE id = ANY($1) ORDER BY name",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn create_type(&self, data: &CreateHardwareType) -> AppResult<HardwareType> {
        sqlx::query_as::<_, HardwareType>(
            r#"
            INSERT INTO hardware_types (name, description, image, total_count)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&data.name)
        .bind(&data.description)
        .bind(&data.image)
        .bind(data.total_count)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Self::map_unique_violation(e, &data.name))
    }

    async fn update_type(&self, id: i32, data: &UpdateHardwareType) -> AppResult<HardwareType> {
        let now = Utc::now();
        let mut sets = vec!["updated_at = $2".to_string()];
        let mut idx = 3;

        macro_rules! add_field {
            ($field:expr, $name:expr) => {
                if $field.is_some() {
                    sets.push(format!("{} = ${}", $name, idx));
                    idx += 1;
                }
            };
        }

        add_field!(data.name, "name");
        add_field!(data.description, "description");
        add_field!(data.image, "image");
        add_field!(data.total_count, "total_count");

        let query = format!(
            "UPDATE hardware_types SET {} WHERE id = $1 RETURNING *",
            sets.join(", ")
        );

        let mut builder = sqlx::query_as::<_, HardwareType>(&query).bind(id).bind(now);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(data.name);
        bind_field!(data.description);
        bind_field!(data.image);
        bind_field!(data.total_count);

        let name = data.name.as_deref().unwrap_or_default();
        builder
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Self::map_unique_violation(e, name))?
            .ok_or_else(|| AppError::NotFound(format!("Hardware type {} not found", id)))
    }

    async fn delete_type(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM hardware_types WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Hardware type {} not found", id)));
        }
        Ok(())
    }

    async fn inventory(
        &self,
        type_id: i32,
        policy: &LendingPolicy,
        now: DateTime<Utc>,
    ) -> AppResult<InventoryCounts> {
        let mut conn = self.pool.acquire().await?;
        let total_count = Self::type_total(&mut conn, type_id, false).await?;
        Self::count_for_type(&mut conn, type_id, total_count, policy.expiry_cutoff(now)).await
    }

    async fn inventories(
        &self,
        policy: &LendingPolicy,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<(HardwareType, InventoryCounts)>> {
        let rows = sqlx::query_as::<_, InventoryRow>(
            r#"
            SELECT t.*,
                COUNT(r.id) FILTER (
                    WHERE r.pickup_time IS NOT NULL AND r.return_time IS NULL
                ) AS active_count,
                COUNT(r.id) FILTER (
                    WHERE (r.pickup_time IS NOT NULL AND r.return_time IS NULL)
                       OR (r.pickup_time IS NULL AND r.created_at >= $1)
                ) AS not_available_count
            FROM hardware_types t
            LEFT JOIN hardware_requests r ON r.type_id = t.id
            GROUP BY t.id
            ORDER BY t.name
            "#,
        )
        .bind(policy.expiry_cutoff(now))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(InventoryRow::into_parts).collect())
    }

    async fn get_request(&self, id: i32) -> AppResult<HardwareRequest> {
        sqlx::query_as::<_, HardwareRequest>("SELECT * FROM hardware_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Request {} not found", id)))
    }

    async fn get_requests(&self, ids: &[i32]) -> AppResult<Vec<HardwareRequest>> {
        let rows = sqlx::query_as::<_, HardwareRequest>(
            "SELECT * FROM hardware_requests WHERE id = ANY($1) ORDER BY id",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_requests(
        &self,
        filter: &RequestFilter,
        policy: &LendingPolicy,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<HardwareRequest>> {
        let query = format!(
            "SELECT * FROM hardware_requests {} ORDER BY created_at, id",
            Self::filter_clause(filter)
        );
        let mut builder = sqlx::query_as::<_, HardwareRequest>(&query);
        if Self::uses_cutoff(filter.scope) {
            builder = builder.bind(policy.expiry_cutoff(now));
        }
        if let Some(requestor_id) = filter.requestor_id {
            builder = builder.bind(requestor_id);
        }
        let rows = builder.fetch_all(&self.pool).await?;
        tracing::debug!("Listed {} requests for {:?}", rows.len(), filter);
        Ok(rows)
    }

    async fn count_requests(
        &self,
        filter: &RequestFilter,
        policy: &LendingPolicy,
        now: DateTime<Utc>,
    ) -> AppResult<i64> {
        let query = format!(
            "SELECT COUNT(*) FROM hardware_requests {}",
            Self::filter_clause(filter)
        );
        let mut builder = sqlx::query_scalar::<_, i64>(&query);
        if Self::uses_cutoff(filter.scope) {
            builder = builder.bind(policy.expiry_cutoff(now));
        }
        if let Some(requestor_id) = filter.requestor_id {
            builder = builder.bind(requestor_id);
        }
        Ok(builder.fetch_one(&self.pool).await?)
    }

    async fn create_request(
        &self,
        type_id: i32,
        requestor_id: i32,
        policy: &LendingPolicy,
        now: DateTime<Utc>,
    ) -> AppResult<Option<HardwareRequest>> {
        let mut tx = self.pool.begin().await?;

        let total_count = Self::type_total(&mut tx, type_id, true).await?;
        let counts =
            Self::count_for_type(&mut tx, type_id, total_count, policy.expiry_cutoff(now)).await?;
        if !counts.can_allocate() {
            tracing::debug!("No unit of type {} left for user {}", type_id, requestor_id);
            return Ok(None);
        }

        let request = sqlx::query_as::<_, HardwareRequest>(
            r#"
            INSERT INTO hardware_requests (requestor_id, type_id, created_at)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(requestor_id)
        .bind(type_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(request))
    }

    async fn apply_transition(
        &self,
        request_id: i32,
        transition: Transition,
        policy: &LendingPolicy,
        now: DateTime<Utc>,
    ) -> AppResult<TransitionOutcome> {
        let not_found = || AppError::NotFound(format!("Request {} not found", request_id));
        let mut tx = self.pool.begin().await?;

        // Lock order is hardware type, then request, as in create_request.
        let type_id: i32 =
            sqlx::query_scalar("SELECT type_id FROM hardware_requests WHERE id = $1")
                .bind(request_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(not_found)?;
        let total_count = Self::type_total(&mut tx, type_id, transition.reserves_inventory()).await?;

        let request = sqlx::query_as::<_, HardwareRequest>(
            "SELECT * FROM hardware_requests WHERE id = $1 FOR UPDATE",
        )
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(not_found)?;

        let counts =
            Self::count_for_type(&mut tx, type_id, total_count, policy.expiry_cutoff(now)).await?;
        let outcome = transition.apply(request, &counts, policy, now)?;

        match &outcome {
            TransitionOutcome::Updated(request) => {
                sqlx::query(
                    r#"
                    UPDATE hardware_requests
                    SET pickup_time = $2, return_time = $3, borrowed_by = $4, returned_to = $5
                    WHERE id = $1
                    "#,
                )
                .bind(request.id)
                .bind(request.pickup_time)
                .bind(request.return_time)
                .bind(request.borrowed_by)
                .bind(request.returned_to)
                .execute(&mut *tx)
                .await?;
            }
            TransitionOutcome::Cancelled(request) => {
                sqlx::query("DELETE FROM hardware_requests WHERE id = $1")
                    .bind(request.id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(outcome)
    }
}
