use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use llm_chat_service::{AppConfig, ChatHandler, ModelProvider, build_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(?config, "starting chat service");

    // Loading blocks for as long as the download and device upload take.
    let load_config = config.clone();
    let capability = tokio::task::spawn_blocking(move || ModelProvider::load(&load_config)).await?;
    if capability.is_none() {
        tracing::warn!("serving without a model; chat requests will fail");
    }

    let handler = ChatHandler::new(capability, config.generation_timeout);
    let router = build_router(handler);

    let listener = TcpListener::bind(config.listen_addr).await?;
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "REST server ready");

    axum::serve(listener, router).await?;

    Ok(())
}

fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,hyper=warn,axum::rejection=trace".into());
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
