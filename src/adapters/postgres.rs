// PostgreSQLデータベースアダプター
//
// sqlxの接続プールを使用したPostgreSQL接続の管理とクエリ実行を行います。
// 行の値はカラム名をキーとするJSON値のマップに変換されます。

use crate::adapters::connection_string::clean_postgres_url;
use crate::adapters::database::{Database, QueryRow};
use crate::core::config::DatabaseType;
use crate::core::error::DatabaseError;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Column, Row};
use std::time::Duration;
use tracing::{error, info};

/// PostgreSQLデータベース
pub struct PostgresDatabase {
    connection_url: String,
    pool: Option<PgPool>,
    connected: bool,
}

impl PostgresDatabase {
    /// 新しいPostgresDatabaseを作成（接続は initialize で行う）
    pub fn new(connection_url: String) -> Self {
        Self {
            connection_url,
            pool: None,
            connected: false,
        }
    }

    fn pool(&self) -> Result<&PgPool, DatabaseError> {
        self.pool.as_ref().ok_or(DatabaseError::NotInitialized)
    }

    /// 行をカラム名 -> JSON値のマップに変換
    ///
    /// 整数、浮動小数点、真偽値、文字列の順でデコードを試み、
    /// いずれでもデコードできない型はNULLとして扱います。
    fn row_to_map(row: &PgRow) -> QueryRow {
        let mut map = QueryRow::new();
        for (index, column) in row.columns().iter().enumerate() {
            let value = if let Ok(v) = row.try_get::<Option<i16>, _>(index) {
                v.map(|n| Value::from(n as i64)).unwrap_or(Value::Null)
            } else if let Ok(v) = row.try_get::<Option<i32>, _>(index) {
                v.map(|n| Value::from(n as i64)).unwrap_or(Value::Null)
            } else if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
                v.map(Value::from).unwrap_or(Value::Null)
            } else if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
                v.map(Value::from).unwrap_or(Value::Null)
            } else if let Ok(v) = row.try_get::<Option<bool>, _>(index) {
                v.map(Value::from).unwrap_or(Value::Null)
            } else if let Ok(v) = row.try_get::<Option<String>, _>(index) {
                v.map(Value::from).unwrap_or(Value::Null)
            } else {
                Value::Null
            };
            map.insert(column.name().to_string(), value);
        }
        map
    }
}

#[async_trait]
impl Database for PostgresDatabase {
    async fn initialize(&mut self) -> Result<(), DatabaseError> {
        // sqlxが解釈しないドライバー固有パラメーターを除去
        let cleaned_url = clean_postgres_url(&self.connection_url);

        info!("Creating PostgreSQL connection pool...");
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&cleaned_url)
            .await
            .map_err(|e| {
                error!("Failed to initialize PostgreSQL connection: {}", e);
                DatabaseError::Connection {
                    message: "Failed to create PostgreSQL connection pool".to_string(),
                    cause: e.to_string(),
                }
            })?;

        self.pool = Some(pool);

        if !self.test_connection().await {
            self.pool = None;
            return Err(DatabaseError::Connection {
                message: "PostgreSQL connection test failed".to_string(),
                cause: "probe query did not succeed".to_string(),
            });
        }

        self.connected = true;
        info!("PostgreSQL connection initialized successfully");
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), DatabaseError> {
        if let Some(pool) = self.pool.take() {
            info!("Shutting down PostgreSQL connection...");
            pool.close().await;
            self.connected = false;
            info!("PostgreSQL connection closed successfully");
        }
        Ok(())
    }

    async fn execute_query(&self, query: &str) -> Result<Vec<QueryRow>, DatabaseError> {
        let pool = self.pool()?;

        let rows = sqlx::query(query)
            .fetch_all(pool)
            .await
            .map_err(|e| DatabaseError::Query {
                message: e.to_string(),
                sql: Some(query.to_string()),
            })?;

        Ok(rows.iter().map(Self::row_to_map).collect())
    }

    async fn test_connection(&self) -> bool {
        match self.pool() {
            Ok(pool) => match sqlx::query("SELECT 1").execute(pool).await {
                Ok(_) => {
                    info!("PostgreSQL connection test successful");
                    true
                }
                Err(e) => {
                    error!("PostgreSQL connection test failed: {}", e);
                    false
                }
            },
            Err(_) => false,
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn database_type(&self) -> DatabaseType {
        DatabaseType::PostgreSQL
    }
}
