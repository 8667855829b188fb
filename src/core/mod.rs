// Core Domain
// スキーマモデル、検証結果、設定、エラー型の純粋なドメインロジック

pub mod config;
pub mod error;
pub mod prompts;
pub mod schema;
pub mod verdict;
