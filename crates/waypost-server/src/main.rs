use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, Level};
use waypost_storage::{InMemoryStore, Store};

mod routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_env_filter("info")
        .init();

    let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
    let app = routes::router(store);

    let addr: SocketAddr = std::env::var("BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8000".into())
        .parse()?;
    info!("http listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
