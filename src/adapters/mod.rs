// Adapters
// データベースとLLMプロバイダーへのアクセスを抽象化

pub mod connection_string;
pub mod database;
pub mod introspector;
pub mod llm;
pub mod postgres;
pub mod trino;
