// LLMプロバイダーアダプター
//
// 自然言語からSQL候補を生成する外部モデルへのアクセスを抽象化します。
// OpenAIとOllamaの2実装を提供し、設定で選択されたバックエンドを
// 起動時に一度だけ生成します。

pub mod ollama;
pub mod openai;

use crate::core::config::{DatabaseType, LlmBackend, LlmConfig};
use crate::core::error::ProviderError;
use crate::core::schema::SchemaSnapshot;
use async_trait::async_trait;
use std::collections::HashMap;

pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

/// LLMプロバイダーインターフェース
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// プロバイダーを初期化
    async fn initialize(&mut self) -> Result<(), ProviderError>;

    /// プロバイダーのリソースを解放
    async fn shutdown(&mut self);

    /// 自然言語プロンプトからSQL候補を生成
    ///
    /// スキーマメタデータとデータベース種別でプロンプトを補強した上で
    /// モデルを呼び出し、候補SQL文字列を返します。候補の安全性・参照
    /// 妥当性の検証は呼び出し側（SqlValidator）の責任です。
    async fn generate_sql(
        &self,
        prompt: &str,
        metadata: &SchemaSnapshot,
        database_type: DatabaseType,
    ) -> Result<String, ProviderError>;
}

/// 設定に応じたプロバイダーを作成
pub fn create_provider(config: &LlmConfig) -> Box<dyn LlmProvider> {
    match config.provider {
        LlmBackend::OpenAi => Box::new(OpenAiProvider::new(config.clone())),
        LlmBackend::Ollama => Box::new(OllamaProvider::new(config.clone())),
    }
}

/// sql_generationテンプレート用の変数を構築
pub(crate) fn build_prompt_variables(
    prompt: &str,
    metadata: &SchemaSnapshot,
    database_type: DatabaseType,
) -> Result<HashMap<String, String>, ProviderError> {
    let metadata_json =
        serde_json::to_string(metadata).map_err(|e| ProviderError::Generation {
            message: format!("Failed to serialize schema metadata: {}", e),
        })?;

    let mut variables = HashMap::new();
    variables.insert("query".to_string(), prompt.to_string());
    variables.insert("metadata".to_string(), metadata_json);
    variables.insert("database_type".to_string(), database_type.to_string());
    variables.insert(
        "context".to_string(),
        format!(
            "Generate a {} query based on the following request.",
            database_type
        ),
    );
    Ok(variables)
}
