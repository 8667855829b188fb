// HTTPルーティング
//
// エラーマッピング方針:
//   - 生成/検証エラー（クライアント起因） → 400
//   - メタデータ取得エラー（サーバー起因） → 500

use crate::api::models::{HealthResponse, QueryRequest, QueryResponse};
use crate::services::query_service::{QueryError, QueryService};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tracing::info;

/// アプリケーション共有状態
pub struct AppState {
    pub query_service: QueryService,
}

/// ルーターを構築
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/query", post(process_query))
        .with_state(state)
}

/// ヘルスチェック
///
/// データベース接続が機能していれば200、そうでなければ500を返します。
async fn health(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    if state.query_service.test_connection().await {
        (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                database: "connected",
            }),
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(HealthResponse {
                status: "unhealthy",
                database: "disconnected",
            }),
        )
    }
}

/// 自然言語の質問を検証済みSQLへ変換
async fn process_query(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> (StatusCode, Json<QueryResponse>) {
    info!("Processing query: {}", request.query);

    let result = state
        .query_service
        .process(
            &request.query,
            request.context.as_ref(),
            request.tables.as_deref(),
        )
        .await;

    match result {
        Ok(sql) => (StatusCode::OK, Json(QueryResponse::ok(sql))),
        Err(e) => {
            let status = if e.is_client_error() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, Json(QueryResponse::fail(e.to_string())))
        }
    }
}
