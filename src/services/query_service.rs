// クエリオーケストレーションサービス
//
// メタデータ取得 → SQL生成 → SQL検証の一連の流れを実行します。
// HTTPレイヤーはこのサービスの結果をステータスコードへマッピング
// するだけの薄い層に保ちます。

use crate::adapters::database::Database;
use crate::core::error::MetadataError;
use crate::services::metadata_cache::MetadataCache;
use crate::services::sql_generator::SqlGenerator;
use crate::services::sql_validator::SqlValidator;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

/// クエリ処理のエラー
///
/// HTTPレイヤーでのステータスコード判定に使用されます。
/// Generation / Validation はクライアント起因（400相当）、
/// Metadata はサーバー起因（500相当）です。
#[derive(Debug, Error)]
pub enum QueryError {
    /// SQL生成の失敗
    #[error("{0}")]
    Generation(String),

    /// SQL検証の失敗
    #[error("{0}")]
    Validation(String),

    /// メタデータ取得の失敗
    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

impl QueryError {
    /// クライアント起因のエラーかどうか
    pub fn is_client_error(&self) -> bool {
        matches!(self, QueryError::Generation(_) | QueryError::Validation(_))
    }
}

/// クエリオーケストレーター
pub struct QueryService {
    db: Arc<dyn Database>,
    cache: Arc<MetadataCache>,
    generator: SqlGenerator,
    validator: SqlValidator,
}

impl QueryService {
    /// 新しいQueryServiceを作成
    pub fn new(
        db: Arc<dyn Database>,
        cache: Arc<MetadataCache>,
        generator: SqlGenerator,
        validator: SqlValidator,
    ) -> Self {
        Self {
            db,
            cache,
            generator,
            validator,
        }
    }

    /// 接続が機能しているかを確認
    pub async fn test_connection(&self) -> bool {
        self.db.test_connection().await
    }

    /// 自然言語の質問を検証済みSQLへ変換
    pub async fn process(
        &self,
        query: &str,
        context: Option<&Value>,
        tables: Option<&[String]>,
    ) -> Result<String, QueryError> {
        // メタデータ取得（キャッシュ経由）
        let metadata = self.cache.get_schema(self.db.as_ref(), tables).await?;

        // SQL生成
        let candidate = self
            .generator
            .generate_sql(query, &metadata, self.db.database_type(), context)
            .await
            .map_err(|e| {
                error!("SQL generation failed: {}", e);
                QueryError::Generation(e.to_string())
            })?;

        // SQL検証
        let verdict = self.validator.validate(&candidate, &metadata);
        if !verdict.is_success() {
            let message = verdict
                .error
                .unwrap_or_else(|| "SQL validation failed".to_string());
            error!("SQL validation failed: {}", message);
            return Err(QueryError::Validation(message));
        }

        // 検証済みSQL（入力のまま）を返す
        Ok(verdict.sql.unwrap_or(candidate))
    }
}
