use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use text2sql::adapters::database::{create_database, Database};
use text2sql::adapters::llm::{create_provider, LlmProvider};
use text2sql::api::routes::{build_router, AppState};
use text2sql::core::config::AppConfig;
use text2sql::services::metadata_cache::MetadataCache;
use text2sql::services::query_service::QueryService;
use text2sql::services::sql_generator::SqlGenerator;
use text2sql::services::sql_validator::SqlValidator;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 自然言語の質問を検証済みSQLへ変換するHTTPサービス
#[derive(Debug, Parser)]
#[command(name = "text2sql", version, about)]
struct Cli {
    /// 設定ファイル（YAML）のパス。省略時は環境変数から構築
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// バインドするホスト（設定より優先）
    #[arg(long)]
    host: Option<String>,

    /// バインドするポート（設定より優先）
    #[arg(long)]
    port: Option<u16>,
}

fn main() {
    // CLIをパースして実行
    let cli = Cli::parse();

    // ログの初期化（RUST_LOG未設定時はinfo）
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // 非同期ランタイムを作成して実行
    let runtime = tokio::runtime::Runtime::new().expect("Failed to create Tokio runtime");

    if let Err(e) = runtime.block_on(run_server(cli)) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// サーバーを起動する
async fn run_server(cli: Cli) -> Result<()> {
    // 設定の読み込み
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    // データベース接続の初期化
    let mut db = create_database(&config.database.url)?;
    db.initialize().await?;
    info!("Database initialized: {}", db.database_type());
    let db: Arc<dyn Database> = Arc::from(db);

    // LLMプロバイダーの初期化
    let mut provider = create_provider(&config.llm);
    provider.initialize().await?;
    info!("LLM provider initialized: {}", config.llm.model);
    let provider: Arc<dyn LlmProvider> = Arc::from(provider);

    // サービスの組み立て
    let cache = Arc::new(MetadataCache::new(db.database_type()));
    let query_service = QueryService::new(
        db,
        cache,
        SqlGenerator::new(provider),
        SqlValidator::new(),
    );
    let state = Arc::new(AppState { query_service });

    // HTTPサーバーの起動
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| "Invalid server address")?;
    info!("Listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(build_router(state).into_make_service())
        .await
        .with_context(|| "Server error")?;

    Ok(())
}

/// 設定を読み込む
///
/// 設定ファイルが指定された場合はファイルから、指定がなければ
/// 環境変数から構築します。
fn load_config(path: Option<&std::path::Path>) -> Result<AppConfig> {
    match path {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            contents.parse()
        }
        None => AppConfig::from_env(),
    }
}
