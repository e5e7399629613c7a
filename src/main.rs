use quartermaster::config::Config;
use quartermaster::server;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quartermaster=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    tracing::info!("Starting Quartermaster on {}", config.address());

    let (_state, app) = server::build_app(config.clone()).expect("Failed to build application");

    let (port, handle) = server::serve(app, &config.host, config.port)
        .await
        .expect("Failed to bind address");

    tracing::info!("Listening on http://{}:{}", config.host, port);

    handle.await.expect("Server task failed");
}
