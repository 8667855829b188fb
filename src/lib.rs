// text2sqlライブラリのエントリーポイント
//
// モジュール構造:
// - api: HTTPレイヤー（リクエストの受付とレスポンスへのマッピング）
// - core: コアドメインロジック（スキーマモデル、検証結果、設定、エラー型）
// - adapters: データベースとLLMプロバイダーへのアクセスを抽象化
// - services: メタデータキャッシュ、SQL検証、SQL生成のサービス層

pub mod api;
pub mod core;
pub mod adapters;
pub mod services;
