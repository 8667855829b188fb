// APIリクエスト/レスポンスモデル

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// クエリ変換リクエスト
#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    /// 自然言語の質問
    pub query: String,
    /// プロンプトに追加する任意のコンテキスト
    #[serde(default)]
    pub context: Option<Value>,
    /// メタデータを限定するテーブル名リスト（省略時は全テーブル）
    #[serde(default)]
    pub tables: Option<Vec<String>>,
}

/// クエリ変換レスポンス
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryResponse {
    /// 成功レスポンスを作成
    pub fn ok(sql: String) -> Self {
        Self {
            success: true,
            sql: Some(sql),
            error: None,
        }
    }

    /// 失敗レスポンスを作成
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            sql: None,
            error: Some(error.into()),
        }
    }
}

/// ヘルスチェックレスポンス
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
}
