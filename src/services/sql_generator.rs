// SQL生成サービス
//
// 自然言語の質問からLLMプロバイダー経由でSQL候補を生成します。
// 候補の検証はSqlValidatorが行い、このサービスは生成のみを担当します。

use crate::adapters::llm::LlmProvider;
use crate::core::config::DatabaseType;
use crate::core::error::ProviderError;
use crate::core::schema::SchemaSnapshot;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// SQL生成サービス
pub struct SqlGenerator {
    provider: Arc<dyn LlmProvider>,
}

impl SqlGenerator {
    /// 新しいSqlGeneratorを作成
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    /// 自然言語の質問からSQL候補を生成
    pub async fn generate_sql(
        &self,
        query: &str,
        metadata: &SchemaSnapshot,
        database_type: DatabaseType,
        context: Option<&Value>,
    ) -> Result<String, ProviderError> {
        let prompt = build_prompt(query, context);
        debug!("Generating SQL for prompt: {}", prompt);
        self.provider
            .generate_sql(&prompt, metadata, database_type)
            .await
    }
}

/// 質問と追加コンテキストからプロンプトを構築
fn build_prompt(query: &str, context: Option<&Value>) -> String {
    let prompt = format!("Convert this question to SQL: {}", query);
    match context {
        Some(context) => format!("{}\nAdditional context: {}", prompt, context),
        None => prompt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_prompt_without_context() {
        let prompt = build_prompt("list all users", None);
        assert_eq!(prompt, "Convert this question to SQL: list all users");
    }

    #[test]
    fn test_build_prompt_with_context() {
        let context = json!({"team": "analytics"});
        let prompt = build_prompt("list all users", Some(&context));
        assert!(prompt.starts_with("Convert this question to SQL: list all users"));
        assert!(prompt.contains("Additional context:"));
        assert!(prompt.contains("analytics"));
    }
}
