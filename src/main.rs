use coretax_reconcile::config::StorageBackend;
use coretax_reconcile::{
    api, create_pool, AppConfig, InvoiceStore, Matcher, MemoryInvoiceStore, PgInvoiceStore,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载配置
    let config = AppConfig::load()?;

    // 初始化日志 - 本地时间格式, RUST_LOG 优先于 logging.level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    info!("Starting server with config: {:?}", config);

    let store: Arc<dyn InvoiceStore> = match config.storage.backend {
        StorageBackend::Postgres => {
            let pool = create_pool(&config.database).await?;
            info!("Database pool created");
            Arc::new(PgInvoiceStore::new(pool))
        }
        StorageBackend::Memory => {
            info!("Using in-memory invoice store");
            Arc::new(MemoryInvoiceStore::new())
        }
    };

    let matcher = Matcher::new(store).with_concurrency(config.matcher.concurrency);
    let app = api::router(api::AppState::new(matcher), config.server.max_upload_bytes);

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST /api/coretax/reconcile  - reconcile Coretax export");
    info!("  POST /api/coretax/chains     - amendment chains from Coretax export");
    info!("  POST /api/chains             - amendment chains from relations");
    info!("  POST /api/chains/export      - amendment chains as CSV");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
