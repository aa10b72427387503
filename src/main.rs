use std::net::SocketAddr;

use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tuya_device_gateway::api::{self, GatewayState};
use tuya_device_gateway::config::Config;
use tuya_device_gateway::gateway::DeviceGateway;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tuya_device_gateway=info,tower_http=debug".into()),
        )
        .init();

    tracing::info!("Starting tuya-device-gateway...");

    // Load configuration
    let config = Config::load()?;
    tracing::info!("Configuration loaded: {:?}", config.tuya);

    // Credentials, region and device are validated here; any problem is fatal
    let gateway = DeviceGateway::from_config(&config.tuya)?;
    let state = GatewayState::new(gateway);

    let cors = CorsLayer::permissive();

    let app = api::routes().with_state(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors),
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
