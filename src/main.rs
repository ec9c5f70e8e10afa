use delivery_verification::{api, create_pool, AppConfig, PgOrderRepository, VerificationService};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    let config = AppConfig::from_env()?;
    info!("Starting server with config: {:?}", config);

    let pool = create_pool(&config.database).await?;
    info!("Database pool created");

    let repo = Arc::new(PgOrderRepository::new(pool));
    let service = Arc::new(VerificationService::new(repo, config.matching));
    let app = api::router(service);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST /api/verification/compare  - classify a list against a delivery");
    info!("  POST /api/verification/preview  - plan approved corrections");
    info!("  POST /api/verification/apply    - apply approved corrections");
    info!("  POST /api/verification/report   - text/CSV difference report");
    info!("Disambiguation strategy: {:?}", config.matching.disambiguation);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
