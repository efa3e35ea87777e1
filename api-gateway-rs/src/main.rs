// api-gateway-rs/src/main.rs
// API Gateway - public entry point of the image report chain
// Port 5000 - HTTP entry point for external clients
//
// Validates uploads, hands them to the Detection stage and relays the
// final envelope.

use std::sync::Arc;

use api_gateway::ApiGateway;
use config_rs::ServiceConfig;
use shared_types_rs::StageName;
use stage_sdk::{serve, HopClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    config_rs::load_dotenv();

    let service_config = ServiceConfig::new("GATEWAY");
    error_handling_rs::init(&service_config.display_name())?;
    config_rs::check_hop_timeout_order();

    let detection = HopClient::from_config(&service_config, StageName::Detection)?;
    tracing::info!(
        detection_url = %detection.endpoint_url(),
        timeout_secs = detection.timeout().as_secs(),
        "Using Detection stage"
    );

    let gateway = Arc::new(ApiGateway::new(detection, service_config.get_max_upload_bytes()));

    let addr = service_config.get_bind_address();
    tracing::info!("API Gateway starting on {}", addr);
    serve(gateway.create_router(), addr).await?;

    tracing::info!("API Gateway stopped");
    Ok(())
}
