// Services Layer
// メタデータキャッシュ、SQL検証、SQL生成、クエリオーケストレーション

pub mod metadata_cache;
pub mod query_service;
pub mod sql_generator;
pub mod sql_validator;
