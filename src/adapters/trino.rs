// Trinoデータベースアダプター
//
// TrinoのREST API（/v1/statement）を使用したクエリ実行を行います。
// ステートメントをPOSTした後、レスポンスの nextUri を辿って
// 結果ページをすべて取得します。

use crate::adapters::connection_string::parse_database_url;
use crate::adapters::database::{Database, QueryRow};
use crate::core::config::DatabaseType;
use crate::core::error::DatabaseError;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{error, info};

/// Trinoデータベース
pub struct TrinoDatabase {
    host: String,
    port: u16,
    user: String,
    catalog: String,
    schema: String,
    client: Option<reqwest::Client>,
    connected: bool,
}

impl TrinoDatabase {
    /// 接続URLからTrinoDatabaseを作成（接続は initialize で行う）
    ///
    /// `trino://user@host:port?catalog=...&schema=...` 形式を受け付けます。
    /// catalog と schema が未指定の場合は "default" / "public" を使用します。
    pub fn new(connection_url: &str) -> Result<Self, DatabaseError> {
        let parsed = parse_database_url(connection_url).ok_or_else(|| DatabaseError::Connection {
            message: "Invalid Trino connection URL".to_string(),
            cause: connection_url.to_string(),
        })?;

        let host = parsed.host.clone().ok_or_else(|| DatabaseError::Connection {
            message: "Trino connection URL is missing a host".to_string(),
            cause: connection_url.to_string(),
        })?;

        // ユーザー名はURLの認証部を優先し、なければ user パラメーターを参照
        let user = parsed
            .user
            .clone()
            .or_else(|| parsed.param("user").map(str::to_string))
            .unwrap_or_else(|| "trino".to_string());

        Ok(Self {
            host,
            port: parsed.port.unwrap_or(8080),
            user,
            catalog: parsed.param("catalog").unwrap_or("default").to_string(),
            schema: parsed.param("schema").unwrap_or("public").to_string(),
            client: None,
            connected: false,
        })
    }

    fn client(&self) -> Result<&reqwest::Client, DatabaseError> {
        self.client.as_ref().ok_or(DatabaseError::NotInitialized)
    }

    fn statement_url(&self) -> String {
        format!("http://{}:{}/v1/statement", self.host, self.port)
    }

    /// 現在のカタログとスキーマを取得
    pub fn current_schema(&self) -> (&str, &str) {
        (&self.catalog, &self.schema)
    }

    /// 1ページ分のレスポンスを処理して行を蓄積
    fn collect_page(
        page: &Value,
        columns: &mut Vec<String>,
        rows: &mut Vec<QueryRow>,
    ) -> Result<(), String> {
        if let Some(err) = page.get("error") {
            let message = err
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown Trino error");
            return Err(message.to_string());
        }

        if columns.is_empty() {
            if let Some(cols) = page.get("columns").and_then(Value::as_array) {
                *columns = cols
                    .iter()
                    .filter_map(|c| c.get("name").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect();
            }
        }

        if let Some(data) = page.get("data").and_then(Value::as_array) {
            for raw in data {
                let Some(values) = raw.as_array() else {
                    continue;
                };
                let row = columns
                    .iter()
                    .cloned()
                    .zip(values.iter().cloned())
                    .collect();
                rows.push(row);
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Database for TrinoDatabase {
    async fn initialize(&mut self) -> Result<(), DatabaseError> {
        info!("Creating Trino connection to {}:{}", self.host, self.port);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DatabaseError::Connection {
                message: "Failed to create Trino HTTP client".to_string(),
                cause: e.to_string(),
            })?;
        self.client = Some(client);

        if !self.test_connection().await {
            self.client = None;
            return Err(DatabaseError::Connection {
                message: "Trino connection test failed".to_string(),
                cause: "probe query did not succeed".to_string(),
            });
        }

        self.connected = true;
        info!("Trino connection initialized successfully");
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), DatabaseError> {
        if self.client.take().is_some() {
            info!("Shutting down Trino connection...");
            self.connected = false;
        }
        Ok(())
    }

    async fn execute_query(&self, query: &str) -> Result<Vec<QueryRow>, DatabaseError> {
        let client = self.client()?;

        let to_query_error = |message: String| DatabaseError::Query {
            message,
            sql: Some(query.to_string()),
        };

        let mut page: Value = client
            .post(self.statement_url())
            .header("X-Trino-User", &self.user)
            .header("X-Trino-Catalog", &self.catalog)
            .header("X-Trino-Schema", &self.schema)
            .body(query.to_string())
            .send()
            .await
            .map_err(|e| to_query_error(e.to_string()))?
            .json()
            .await
            .map_err(|e| to_query_error(e.to_string()))?;

        let mut columns: Vec<String> = Vec::new();
        let mut rows: Vec<QueryRow> = Vec::new();

        Self::collect_page(&page, &mut columns, &mut rows).map_err(&to_query_error)?;

        // nextUriがなくなるまで結果ページを辿る
        while let Some(next_uri) = page.get("nextUri").and_then(Value::as_str) {
            page = client
                .get(next_uri)
                .header("X-Trino-User", &self.user)
                .send()
                .await
                .map_err(|e| to_query_error(e.to_string()))?
                .json()
                .await
                .map_err(|e| to_query_error(e.to_string()))?;

            Self::collect_page(&page, &mut columns, &mut rows).map_err(&to_query_error)?;
        }

        Ok(rows)
    }

    async fn test_connection(&self) -> bool {
        match self.execute_query("SELECT 1").await {
            Ok(rows) => {
                let ok = rows
                    .first()
                    .and_then(|row| row.values().next())
                    .and_then(Value::as_i64)
                    == Some(1);
                if ok {
                    info!("Trino connection test successful");
                } else {
                    error!("Trino connection test returned an unexpected result");
                }
                ok
            }
            Err(e) => {
                error!("Trino connection test failed: {}", e);
                false
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn database_type(&self) -> DatabaseType {
        DatabaseType::Trino
    }
}
