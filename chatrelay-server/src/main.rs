use chatrelay_server::api;
use chatrelay_server::api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,chatrelay_server=debug".into()),
        )
        .with_target(false)
        .init();

    tracing::info!("Starting chatrelay server v{}", chatrelay_core::version());

    let state = AppState::from_env();
    let app = api::router(state);

    let addr =
        std::env::var("CHATRELAY_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("chatrelay listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
