//! Repository for the `activity_logs` table.

use buildwatch_core::types::Timestamp;
use sqlx::PgPool;

use crate::models::activity_log::{ActivityLog, ActivityLogQuery, CreateActivityLog};

const COLUMNS: &str = "id, user_id, action, entity_type, entity_id, details, ip_address, \
    user_agent, level, module, status, metadata, created_at, updated_at";

/// Default and maximum page sizes for log queries.
const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 500;

/// Insert and query operations for the activity log.
pub struct ActivityLogRepo;

impl ActivityLogRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateActivityLog,
    ) -> Result<ActivityLog, sqlx::Error> {
        let query = format!(
            "INSERT INTO activity_logs (user_id, action, entity_type, entity_id, details,
                                        ip_address, user_agent, level, module, status, metadata)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ActivityLog>(&query)
            .bind(input.user_id)
            .bind(&input.action)
            .bind(&input.entity_type)
            .bind(input.entity_id)
            .bind(&input.details)
            .bind(&input.ip_address)
            .bind(&input.user_agent)
            .bind(input.level.as_str())
            .bind(&input.module)
            .bind(input.status.as_str())
            .bind(&input.metadata)
            .fetch_one(pool)
            .await
    }

    /// Query logs with filtering and pagination, newest first.
    pub async fn query(
        pool: &PgPool,
        params: &ActivityLogQuery,
    ) -> Result<Vec<ActivityLog>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = params.offset.unwrap_or(0).max(0);

        let (where_clause, bind_values, bind_idx) = build_filter(params);
        let query = format!(
            "SELECT {COLUMNS} FROM activity_logs {where_clause} \
             ORDER BY created_at DESC, id DESC \
             LIMIT ${bind_idx} OFFSET ${}",
            bind_idx + 1
        );

        let mut q = sqlx::query_as::<_, ActivityLog>(&query);
        for val in &bind_values {
            q = match val {
                BindValue::BigInt(v) => q.bind(*v),
                BindValue::Text(v) => q.bind(v.as_str()),
                BindValue::Timestamp(v) => q.bind(*v),
            };
        }
        q.bind(limit).bind(offset).fetch_all(pool).await
    }

    /// Count logs matching the filter (for pagination metadata).
    pub async fn count(pool: &PgPool, params: &ActivityLogQuery) -> Result<i64, sqlx::Error> {
        let (where_clause, bind_values, _) = build_filter(params);
        let query = format!("SELECT COUNT(*)::BIGINT FROM activity_logs {where_clause}");

        let mut q = sqlx::query_scalar::<_, i64>(&query);
        for val in &bind_values {
            q = match val {
                BindValue::BigInt(v) => q.bind(*v),
                BindValue::Text(v) => q.bind(v.as_str()),
                BindValue::Timestamp(v) => q.bind(*v),
            };
        }
        q.fetch_one(pool).await
    }
}

// ---------------------------------------------------------------------------
// Dynamic filter
// ---------------------------------------------------------------------------

enum BindValue {
    BigInt(i64),
    Text(String),
    Timestamp(Timestamp),
}

fn build_filter(params: &ActivityLogQuery) -> (String, Vec<BindValue>, u32) {
    let mut conditions: Vec<String> = Vec::new();
    let mut bind_values: Vec<BindValue> = Vec::new();
    let mut bind_idx = 1u32;

    let mut push = |column: &str, op: &str, value: BindValue| {
        conditions.push(format!("{column} {op} ${bind_idx}"));
        bind_values.push(value);
        bind_idx += 1;
    };

    if let Some(user_id) = params.user_id {
        push("user_id", "=", BindValue::BigInt(user_id));
    }
    if let Some(ref action) = params.action {
        push("action", "=", BindValue::Text(action.clone()));
    }
    if let Some(ref entity_type) = params.entity_type {
        push("entity_type", "=", BindValue::Text(entity_type.clone()));
    }
    if let Some(entity_id) = params.entity_id {
        push("entity_id", "=", BindValue::BigInt(entity_id));
    }
    if let Some(ref module) = params.module {
        push("module", "=", BindValue::Text(module.clone()));
    }
    if let Some(level) = params.level {
        push("level", "=", BindValue::Text(level.as_str().to_string()));
    }
    if let Some(from) = params.from {
        push("created_at", ">=", BindValue::Timestamp(from));
    }
    if let Some(to) = params.to {
        push("created_at", "<=", BindValue::Timestamp(to));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    (where_clause, bind_values, bind_idx)
}
