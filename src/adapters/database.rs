// データベース接続アダプター
//
// PostgreSQLとTrinoに対応した統一されたデータベースインターフェースを
// 提供します。接続URLのスキームに応じて起動時に一度だけ実装が選択されます。

use crate::adapters::postgres::PostgresDatabase;
use crate::adapters::trino::TrinoDatabase;
use crate::core::config::DatabaseType;
use crate::core::error::DatabaseError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// クエリ結果の1行（カラム名 -> 値）
pub type QueryRow = HashMap<String, Value>;

/// データベースインターフェース
///
/// スキーマリフレクションとクエリ実行に必要な最小限の能力を抽象化します。
/// 接続のライフサイクル（initialize/shutdown）は所有者が管理します。
#[async_trait]
pub trait Database: Send + Sync {
    /// データベース接続を初期化
    async fn initialize(&mut self) -> Result<(), DatabaseError>;

    /// データベース接続を閉じる
    async fn shutdown(&mut self) -> Result<(), DatabaseError>;

    /// クエリを実行して結果を返す
    async fn execute_query(&self, query: &str) -> Result<Vec<QueryRow>, DatabaseError>;

    /// 接続が機能しているかを確認（プローブクエリを実行）
    async fn test_connection(&self) -> bool;

    /// 接続済みかどうか
    fn is_connected(&self) -> bool;

    /// データベース種別を取得
    fn database_type(&self) -> DatabaseType;
}

/// 接続URLのスキームに応じたデータベース実装を作成
///
/// `postgresql` で始まるスキームはPostgreSQL、`trino` はTrinoに
/// マッピングされます。それ以外はエラーになります。
pub fn create_database(url: &str) -> Result<Box<dyn Database>, DatabaseError> {
    let scheme = url.split("://").next().unwrap_or("");

    if scheme.starts_with("postgresql") {
        Ok(Box::new(PostgresDatabase::new(url.to_string())))
    } else if scheme == "trino" {
        TrinoDatabase::new(url).map(|db| Box::new(db) as Box<dyn Database>)
    } else {
        Err(DatabaseError::UnsupportedScheme {
            scheme: scheme.to_string(),
        })
    }
}
