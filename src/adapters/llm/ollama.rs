// Ollamaプロバイダー
//
// ローカルで動作するOllamaの生成APIを使用してSQL候補を生成します。
// レスポンス本文に埋め込まれたJSONオブジェクトから sql キーを抽出し、
// 見つからない場合は本文全体をSQLとして扱います。

use crate::adapters::llm::{build_prompt_variables, LlmProvider};
use crate::core::config::{DatabaseType, LlmConfig};
use crate::core::error::ProviderError;
use crate::core::prompts::PromptManager;
use crate::core::schema::SchemaSnapshot;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Ollamaプロバイダー
pub struct OllamaProvider {
    config: LlmConfig,
    base_url: String,
    client: Option<reqwest::Client>,
    prompt_manager: PromptManager,
}

impl OllamaProvider {
    /// 新しいOllamaProviderを作成（クライアントは initialize で構築）
    pub fn new(config: LlmConfig) -> Self {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            config,
            base_url,
            client: None,
            prompt_manager: PromptManager::new(),
        }
    }

    fn client(&self) -> Result<&reqwest::Client, ProviderError> {
        self.client.as_ref().ok_or(ProviderError::Generation {
            message: "Ollama client not initialized".to_string(),
        })
    }

    /// レスポンス本文からSQLを抽出
    ///
    /// まず本文中の最初の `{` から最後の `}` までをJSONとして解釈し
    /// sql キーを探します。失敗した場合は本文全体をトリムして返します。
    fn extract_sql(response_text: &str) -> String {
        let start = response_text.find('{');
        let end = response_text.rfind('}');
        if let (Some(start), Some(end)) = (start, end) {
            if end > start {
                if let Ok(parsed) = serde_json::from_str::<Value>(&response_text[start..=end]) {
                    if let Some(sql) = parsed.get("sql").and_then(Value::as_str) {
                        if !sql.is_empty() {
                            return sql.to_string();
                        }
                    }
                }
            }
        }
        response_text.trim().to_string()
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn initialize(&mut self) -> Result<(), ProviderError> {
        info!("Initializing Ollama provider...");
        info!("Using Ollama model: {}", self.config.model);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.config.timeout))
            .build()
            .map_err(|e| ProviderError::Initialization {
                message: "Failed to initialize Ollama provider".to_string(),
                cause: e.to_string(),
            })?;

        // バージョンエンドポイントで接続を確認
        let response = client
            .get(format!("{}/api/version", self.base_url))
            .send()
            .await
            .map_err(|e| ProviderError::Initialization {
                message: "Failed to connect to Ollama service".to_string(),
                cause: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(ProviderError::Initialization {
                message: "Failed to connect to Ollama service".to_string(),
                cause: format!("status {}", response.status()),
            });
        }

        self.client = Some(client);
        info!("Ollama provider initialized successfully");
        Ok(())
    }

    async fn shutdown(&mut self) {
        info!("Shutting down Ollama provider");
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

        debug!("Sending request to Ollama with prompt: {}", prompt);
        let body = json!({
            "model": self.config.model,
            "prompt": rendered_prompt,
            "stream": false,
            "options": {
                "temperature": self.config.temperature,
            },
        });

        let response = client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Generation {
                message: format!("Ollama API call failed: {}", e),
            })?;

        if !response.status().is_success() {
            return Err(ProviderError::Generation {
                message: format!("Ollama API error: {}", response.status()),
            });
        }

        let result: Value = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse {
                message: format!("Failed to parse Ollama response: {}", e),
            }
        })?;

        let response_text = result
            .get("response")
            .and_then(Value::as_str)
            .unwrap_or("");

        if response_text.trim().is_empty() {
            return Err(ProviderError::InvalidResponse {
                message: "Empty response from Ollama".to_string(),
            });
        }

        let sql = Self::extract_sql(response_text);
        info!("Successfully generated SQL query");
        debug!("Generated SQL: {}", sql);
        Ok(sql)
    }
}
