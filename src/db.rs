use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

#[derive(thiserror::Error, Debug)]
pub enum DbError {
    #[error("{0}")]
    Sqlx(#[from] sqlx::Error),
}

pub type DbResult<T> = Result<T, DbError>;

/// A row rendered column by column, in select order.
pub type Record = Vec<Value>;

/// Runs raw SQL text exactly as given. Nothing is bound or escaped.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn fetch_one(&self, sql: &str) -> DbResult<Option<Record>>;
    async fn fetch_all(&self, sql: &str) -> DbResult<Vec<Record>>;
    /// Returns the number of affected rows.
    async fn execute(&self, sql: &str) -> DbResult<u64>;
}

#[derive(Clone)]
pub struct SqliteExecutor {
    pool: SqlitePool,
}

impl SqliteExecutor {
    pub fn new(pool: SqlitePool) -> Self { Self { pool } }

    fn options() -> SqlitePoolOptions {
        // a single long-lived connection keeps `sqlite::memory:` databases alive
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    }

    /// Pool that opens its connection on first use.
    pub fn lazy(url: &str) -> DbResult<Self> {
        Ok(Self::new(Self::options().connect_lazy(url)?))
    }

    pub async fn connect(url: &str) -> DbResult<Self> {
        Ok(Self::new(Self::options().connect(url).await?))
    }
}

fn render_row(row: &SqliteRow) -> Record {
    (0..row.len())
        .map(|i| {
            if let Ok(v) = row.try_get::<Option<i64>, _>(i) {
                return v.map(Value::from).unwrap_or(Value::Null);
            }
            if let Ok(v) = row.try_get::<Option<f64>, _>(i) {
                return v.map(Value::from).unwrap_or(Value::Null);
            }
            if let Ok(v) = row.try_get::<Option<String>, _>(i) {
                return v.map(Value::from).unwrap_or(Value::Null);
            }
            match row.try_get::<Option<Vec<u8>>, _>(i) {
                Ok(Some(bytes)) => Value::from(String::from_utf8_lossy(&bytes).into_owned()),
                _ => Value::Null,
            }
        })
        .collect()
}

#[async_trait]
impl QueryExecutor for SqliteExecutor {
    async fn fetch_one(&self, sql: &str) -> DbResult<Option<Record>> {
        let row = sqlx::query(sql).fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(render_row))
    }

    async fn fetch_all(&self, sql: &str) -> DbResult<Vec<Record>> {
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(render_row).collect())
    }

    async fn execute(&self, sql: &str) -> DbResult<u64> {
        let done = sqlx::query(sql).execute(&self.pool).await?;
        Ok(done.rows_affected())
    }
}
