// OpenAIプロバイダー
//
// OpenAIのchat completions APIを使用してSQL候補を生成します。
// レスポンスはJSONモードで要求し、{"sql": "..."} 形式から抽出します。

use crate::adapters::llm::{build_prompt_variables, LlmProvider};
use crate::core::config::{DatabaseType, LlmConfig};
use crate::core::error::ProviderError;
use crate::core::prompts::PromptManager;
use crate::core::schema::SchemaSnapshot;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAIプロバイダー
pub struct OpenAiProvider {
    config: LlmConfig,
    base_url: String,
    client: Option<reqwest::Client>,
    prompt_manager: PromptManager,
}

impl OpenAiProvider {
    /// 新しいOpenAiProviderを作成（クライアントは initialize で構築）
    pub fn new(config: LlmConfig) -> Self {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| OPENAI_BASE_URL.to_string());
        Self {
            config,
            base_url,
            client: None,
            prompt_manager: PromptManager::new(),
        }
    }

    fn client(&self) -> Result<&reqwest::Client, ProviderError> {
        self.client.as_ref().ok_or(ProviderError::Generation {
            message: "OpenAI client not initialized".to_string(),
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn initialize(&mut self) -> Result<(), ProviderError> {
        info!("Initializing OpenAI provider...");
        info!("Using OpenAI model: {}", self.config.model);

        if self.config.api_key.as_deref().unwrap_or("").is_empty() {
            return Err(ProviderError::Initialization {
                message: "Failed to initialize OpenAI provider".to_string(),
                cause: "API key is not set".to_string(),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.config.timeout))
            .build()
            .map_err(|e| ProviderError::Initialization {
                message: "Failed to initialize OpenAI provider".to_string(),
                cause: e.to_string(),
            })?;

        self.client = Some(client);
        info!("OpenAI provider initialized successfully");
        Ok(())
    }

    async fn shutdown(&mut self) {
        info!("Shutting down OpenAI provider");
        self.client = None;
    }

    async fn generate_sql(
        &self,
        prompt: &str,
        metadata: &SchemaSnapshot,
        database_type: DatabaseType,
    ) -> Result<String, ProviderError> {
        let client = self.client()?;

        let variables = build_prompt_variables(prompt, metadata, database_type)?;
        let rendered_prompt = self
            .prompt_manager
            .render_prompt("sql_generation", &variables)
            .ok_or_else(|| ProviderError::Generation {
                message: "Prompt template 'sql_generation' not found".to_string(),
            })?;

        debug!("Sending request to OpenAI with prompt: {}", prompt);
        let body = json!({
            "model": self.config.model,
            "messages": [{"role": "user", "content": rendered_prompt}],
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
            "response_format": {"type": "json_object"},
        });

        let api_key = self.config.api_key.as_deref().unwrap_or("");
        let response = client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Generation {
                message: format!("OpenAI API call failed: {}", e),
            })?;

        if !response.status().is_success() {
            return Err(ProviderError::Generation {
                message: format!("OpenAI API error: {}", response.status()),
            });
        }

        let response_json: Value = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse {
                message: format!("Failed to parse OpenAI response: {}", e),
            }
        })?;

        let content = response_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| ProviderError::InvalidResponse {
                message: "No content in OpenAI response".to_string(),
            })?;

        let parsed: Value =
            serde_json::from_str(content).map_err(|e| ProviderError::InvalidResponse {
                message: format!("OpenAI response is not valid JSON: {}", e),
            })?;

        let sql = parsed["sql"]
            .as_str()
            .ok_or_else(|| ProviderError::InvalidResponse {
                message: "No 'sql' key in OpenAI response".to_string(),
            })?;

        info!("Successfully generated SQL query");
        debug!("Generated SQL: {}", sql);
        Ok(sql.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::LlmBackend;

    fn sample_config() -> LlmConfig {
        LlmConfig {
            provider: LlmBackend::OpenAi,
            model: "gpt-4o".to_string(),
            api_key: Some("test-key".to_string()),
            base_url: None,
            temperature: 0.1,
            max_tokens: 1000,
            timeout: 30,
        }
    }

    #[tokio::test]
    async fn test_initialize_requires_api_key() {
        let mut config = sample_config();
        config.api_key = None;
        let mut provider = OpenAiProvider::new(config);
        let result = provider.initialize().await;
        assert!(matches!(
            result,
            Err(ProviderError::Initialization { .. })
        ));
    }

    #[tokio::test]
    async fn test_generate_before_initialize() {
        let provider = OpenAiProvider::new(sample_config());
        let result = provider
            .generate_sql("count users", &SchemaSnapshot::new(), DatabaseType::PostgreSQL)
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_default_base_url() {
        let provider = OpenAiProvider::new(sample_config());
        assert_eq!(provider.base_url, OPENAI_BASE_URL);
    }
}
