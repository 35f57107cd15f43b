use clap::Parser as _;
use hashscreen_service::config::ServiceConfig;
use hashscreen_service::ScreeningService;
use tracing_subscriber::EnvFilter;

fn install_tracing(default_directives: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_tracing("hashscreen=debug,info");
    let config = ServiceConfig::parse();
    tracing::info!("starting hashscreen-service with config: {config:#?}");
    hashscreen_service::metrics::describe_metrics();

    let service = ScreeningService::init(&config)?;
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, service.router())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down..");
        })
        .await?;
    Ok(())
}
