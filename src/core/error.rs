// エラー型定義
//
// アプリケーション全体で使用されるカスタムエラー型を提供します。
// thiserrorを使用して、MetadataError, DatabaseError, ProviderError を定義します。
//
// SQL検証の失敗はエラーではなく通常の結果値（ValidationVerdict）として
// 表現されるため、ここには含まれません。

use thiserror::Error;

/// メタデータエラー
///
/// スキーマリフレクション時に発生するエラーを表現します。
/// リフレクション失敗に対する有効な「負の結果」は存在しないため、
/// キャッシュは常にこのエラーを呼び出し元へ伝播します。
#[derive(Debug, Error)]
pub enum MetadataError {
    /// Reflection error
    #[error("Failed to retrieve metadata: {cause}")]
    Reflection {
        /// エラー原因
        cause: String,
    },
}

impl MetadataError {
    /// リフレクションエラーかどうか
    pub fn is_reflection(&self) -> bool {
        matches!(self, MetadataError::Reflection { .. })
    }
}

/// データベースエラー
///
/// データベース操作時に発生するエラーを表現します。
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Connection error
    #[error("Database connection error: {message} (cause: {cause})")]
    Connection {
        /// エラーメッセージ
        message: String,
        /// エラー原因
        cause: String,
    },

    /// Query execution error
    #[error("Query execution error: {message}")]
    Query {
        /// エラーメッセージ
        message: String,
        /// 失敗したSQL
        sql: Option<String>,
    },

    /// Database not initialized
    #[error("Database not initialized")]
    NotInitialized,

    /// Unsupported database scheme
    #[error("Unsupported database type: {scheme}")]
    UnsupportedScheme {
        /// 接続URLのスキーム
        scheme: String,
    },
}

impl DatabaseError {
    /// 接続エラーかどうか
    pub fn is_connection(&self) -> bool {
        matches!(self, DatabaseError::Connection { .. })
    }

    /// クエリエラーかどうか
    pub fn is_query(&self) -> bool {
        matches!(self, DatabaseError::Query { .. })
    }

    /// 未初期化エラーかどうか
    pub fn is_not_initialized(&self) -> bool {
        matches!(self, DatabaseError::NotInitialized)
    }
}

/// LLMプロバイダーエラー
///
/// SQL生成プロバイダーの初期化・呼び出し時に発生するエラーを表現します。
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Initialization error
    #[error("Failed to initialize provider: {message} (cause: {cause})")]
    Initialization {
        /// エラーメッセージ
        message: String,
        /// エラー原因
        cause: String,
    },

    /// Generation error
    #[error("Failed to generate SQL: {message}")]
    Generation {
        /// エラーメッセージ
        message: String,
    },

    /// Invalid response from the model
    #[error("Invalid provider response: {message}")]
    InvalidResponse {
        /// エラーメッセージ
        message: String,
    },
}

impl ProviderError {
    /// 初期化エラーかどうか
    pub fn is_initialization(&self) -> bool {
        matches!(self, ProviderError::Initialization { .. })
    }

    /// 生成エラーかどうか
    pub fn is_generation(&self) -> bool {
        matches!(self, ProviderError::Generation { .. })
    }

    /// 不正レスポンスエラーかどうか
    pub fn is_invalid_response(&self) -> bool {
        matches!(self, ProviderError::InvalidResponse { .. })
    }
}
