use std::sync::Arc;

use mock_server::Instance;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,mock_server=debug".into()),
        )
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("127.0.0.1:{port}");

    let instance = match (std::env::var("MOCK_USERNAME"), std::env::var("MOCK_PASSWORD")) {
        (Ok(username), Ok(password)) => Instance::with_credentials(username, password),
        _ => Instance::new(),
    };
    let hibernating = std::env::var("MOCK_HIBERNATING")
        .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);
    instance.set_hibernating(hibernating);

    let listener = TcpListener::bind(&addr).await?;
    mock_server::run_with(listener, Arc::new(instance)).await
}
