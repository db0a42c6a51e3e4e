use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use predmarket::api::router::create_router;
use predmarket::api::ws_types::WsMessage;
use predmarket::config::AppConfig;
use predmarket::{db, metrics, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    let addr = format!("{}:{}", config.host, config.port);

    tracing::info!("Connecting to database...");
    let pool = db::init_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    tracing::info!("Database connected, migrations applied");

    let metrics_handle = metrics::init_metrics();
    let (ws_tx, _) = broadcast::channel::<WsMessage>(1024);

    let state = AppState {
        db: pool,
        config,
        ws_tx,
        metrics_handle,
    };

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Trading engine listening");
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("predmarket=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
