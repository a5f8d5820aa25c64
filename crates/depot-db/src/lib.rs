//! PostgreSQL persistence for the depot ledgers.
//!
//! Connection comes from `DEPOT_DATABASE_URL`; schema is managed by the
//! embedded sqlx migrations. [`PgStockStore`] / [`PgOrderStore`] implement
//! the depot-engine store traits over the `stock` / `orders` tables.
//!
//! Legacy depots renamed the stock quantity/price columns, so the stock
//! queries are built from a [`SchemaCaps`] descriptor instead of hardcoding
//! column names. Identifiers are validated at construction; values are
//! always bound, never interpolated.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use depot_engine::{OrderStore, StockStore, StoreError};
use depot_schemas::{OrderRecord, OrderStatus, RequiredSet, ResourceKey, StockRow};
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

pub const ENV_DB_URL: &str = "DEPOT_DATABASE_URL";

/// Connect to Postgres using DEPOT_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url =
        std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Simple status query (connectivity + schema presence).
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;
    let ok = one == 1;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='orders'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok,
        has_orders_table: exists,
    })
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_orders_table: bool,
}

/// Count orders currently holding a reservation (`ready`). CLI guardrails
/// use this to prevent accidental migration of a depot with live holds.
pub async fn count_reserved_orders(pool: &PgPool) -> Result<i64> {
    // If schema doesn't exist yet, treat as 0 (safe) rather than failing.
    let st = status(pool).await?;
    if !st.has_orders_table {
        return Ok(0);
    }

    let (n,): (i64,) = sqlx::query_as::<_, (i64,)>(
        "select count(*)::bigint from orders where status = 'ready'",
    )
    .fetch_one(pool)
    .await
    .context("count_reserved_orders failed")?;

    Ok(n)
}

/// Upsert the configured seed rows by `(category, name)`.
pub async fn seed_stock(pool: &PgPool, caps: &SchemaCaps, rows: &[StockRow]) -> Result<()> {
    for row in rows {
        sqlx::query(&format!(
            r#"
            insert into stock (category, name, {q}, {p})
            values ($1, $2, $3, $4)
            on conflict (category, name)
            do update set {q} = excluded.{q}, {p} = excluded.{p}
            "#,
            q = caps.quantity_column(),
            p = caps.price_column(),
        ))
        .bind(row.key.category.as_str())
        .bind(&row.key.name)
        .bind(row.quantity)
        .bind(row.unit_price_micros)
        .execute(pool)
        .await
        .with_context(|| format!("seed stock row {}", row.key))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// SchemaCaps
// ---------------------------------------------------------------------------

/// Column names of the stock table, validated as SQL identifiers.
#[derive(Debug, Clone)]
pub struct SchemaCaps {
    quantity_column: String,
    price_column: String,
}

impl SchemaCaps {
    pub fn new(quantity_column: &str, price_column: &str) -> Result<Self> {
        validate_identifier(quantity_column)?;
        validate_identifier(price_column)?;
        Ok(Self {
            quantity_column: quantity_column.to_string(),
            price_column: price_column.to_string(),
        })
    }

    pub fn quantity_column(&self) -> &str {
        &self.quantity_column
    }

    pub fn price_column(&self) -> &str {
        &self.price_column
    }
}

impl Default for SchemaCaps {
    fn default() -> Self {
        Self {
            quantity_column: "quantity".to_string(),
            price_column: "unit_price_micros".to_string(),
        }
    }
}

fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let head_ok = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    let tail_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !(head_ok && tail_ok) {
        anyhow::bail!("invalid sql identifier: {name:?}");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// PgStockStore
// ---------------------------------------------------------------------------

/// Stock ledger over the `stock` table.
#[derive(Debug, Clone)]
pub struct PgStockStore {
    pool: PgPool,
    caps: SchemaCaps,
}

impl PgStockStore {
    pub fn new(pool: PgPool, caps: SchemaCaps) -> Self {
        Self { pool, caps }
    }
}

/// PostgreSQL SQLSTATE 23514 (check_violation).
fn is_check_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        db_err.code().as_deref() == Some("23514")
    } else {
        false
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::backend(err.to_string())
}

#[async_trait]
impl StockStore for PgStockStore {
    async fn rows(&self) -> Result<Vec<StockRow>, StoreError> {
        let rows: Vec<(String, String, i64, i64)> = sqlx::query_as(&format!(
            "select category, name, {q}, {p} from stock order by category, name",
            q = self.caps.quantity_column(),
            p = self.caps.price_column(),
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        let mut out = Vec::with_capacity(rows.len());
        for (category, name, quantity, unit_price_micros) in rows {
            let category = depot_schemas::ResourceCategory::parse(&category)
                .ok_or_else(|| StoreError::backend(format!("unknown stock category {category:?}")))?;
            out.push(StockRow::new(
                ResourceKey { category, name },
                quantity,
                unit_price_micros,
            ));
        }
        Ok(out)
    }

    async fn quantity(&self, key: &ResourceKey) -> Result<Option<i64>, StoreError> {
        let row: Option<(i64,)> = sqlx::query_as(&format!(
            "select {q} from stock where category = $1 and name = $2",
            q = self.caps.quantity_column(),
        ))
        .bind(key.category.as_str())
        .bind(&key.name)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        Ok(row.map(|(q,)| q))
    }

    async fn apply_delta(&self, key: &ResourceKey, delta_units: i64) -> Result<(), StoreError> {
        let result = sqlx::query(&format!(
            "update stock set {q} = {q} + $1 where category = $2 and name = $3",
            q = self.caps.quantity_column(),
        ))
        .bind(delta_units)
        .bind(key.category.as_str())
        .bind(&key.name)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => {
                Err(StoreError::not_found(format!("stock row {key}")))
            }
            Ok(_) => Ok(()),
            Err(err) if is_check_violation(&err) => {
                let available = self.quantity(key).await?.unwrap_or(0);
                Err(StoreError::WouldGoNegative {
                    resource: key.clone(),
                    delta_units,
                    available,
                })
            }
            Err(err) => Err(backend(err)),
        }
    }

    async fn upsert_row(&self, row: StockRow) -> Result<(), StoreError> {
        sqlx::query(&format!(
            r#"
            insert into stock (category, name, {q}, {p})
            values ($1, $2, $3, $4)
            on conflict (category, name)
            do update set {q} = excluded.{q}, {p} = excluded.{p}
            "#,
            q = self.caps.quantity_column(),
            p = self.caps.price_column(),
        ))
        .bind(row.key.category.as_str())
        .bind(&row.key.name)
        .bind(row.quantity)
        .bind(row.unit_price_micros)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PgOrderStore
// ---------------------------------------------------------------------------

/// Order ledger over the `orders` table. `required` is stored as jsonb.
#[derive(Debug, Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

type OrderTuple = (Uuid, i64, serde_json::Value, String, DateTime<Utc>);

fn decode_order(tuple: OrderTuple) -> Result<OrderRecord, StoreError> {
    let (id, seq, required, status, created_at) = tuple;
    let required: RequiredSet = serde_json::from_value(required)
        .map_err(|e| StoreError::backend(format!("order {id} required decode: {e}")))?;
    let status = OrderStatus::parse(&status)
        .ok_or_else(|| StoreError::backend(format!("order {id} unknown status {status:?}")))?;
    Ok(OrderRecord {
        id,
        seq: seq as u64,
        required,
        status,
        created_at,
    })
}

const ORDER_COLUMNS: &str = "id, seq, required, status, created_at";

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn insert(&self, required: RequiredSet) -> Result<OrderRecord, StoreError> {
        let id = Uuid::new_v4();
        let required_json = serde_json::to_value(&required)
            .map_err(|e| StoreError::backend(format!("required encode: {e}")))?;

        let (seq, created_at): (i64, DateTime<Utc>) = sqlx::query_as(
            r#"
            insert into orders (id, required, status)
            values ($1, $2, 'pending')
            returning seq, created_at
            "#,
        )
        .bind(id)
        .bind(required_json)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        Ok(OrderRecord {
            id,
            seq: seq as u64,
            required,
            status: OrderStatus::Pending,
            created_at,
        })
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<OrderRecord>, StoreError> {
        let row: Option<OrderTuple> = sqlx::query_as(&format!(
            "select {ORDER_COLUMNS} from orders where id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        row.map(decode_order).transpose()
    }

    async fn list(&self) -> Result<Vec<OrderRecord>, StoreError> {
        let rows: Vec<OrderTuple> = sqlx::query_as(&format!(
            "select {ORDER_COLUMNS} from orders order by created_at, seq"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        rows.into_iter().map(decode_order).collect()
    }

    async fn pending_fifo(&self) -> Result<Vec<OrderRecord>, StoreError> {
        let rows: Vec<OrderTuple> = sqlx::query_as(&format!(
            "select {ORDER_COLUMNS} from orders where status = 'pending' order by created_at, seq"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        rows.into_iter().map(decode_order).collect()
    }

    async fn write_state(
        &self,
        id: Uuid,
        status: OrderStatus,
        required: &RequiredSet,
    ) -> Result<(), StoreError> {
        let required_json = serde_json::to_value(required)
            .map_err(|e| StoreError::backend(format!("required encode: {e}")))?;

        let done = sqlx::query("update orders set status = $1, required = $2 where id = $3")
            .bind(status.as_str())
            .bind(required_json)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        if done.rows_affected() == 0 {
            return Err(StoreError::not_found(format!("order {id}")));
        }
        Ok(())
    }

    async fn remove(&self, id: Uuid) -> Result<(), StoreError> {
        let done = sqlx::query("delete from orders where id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        if done.rows_affected() == 0 {
            return Err(StoreError::not_found(format!("order {id}")));
        }
        Ok(())
    }
}
