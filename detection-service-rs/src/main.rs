// detection-service-rs/src/main.rs
// Detection Service - first stage of the image report chain
// Port 5001 - POST /detect-image, GET /health

use std::sync::Arc;

use config_rs::ServiceConfig;
use detection_service::DetectionService;
use shared_types_rs::StageName;
use stage_sdk::capability::FixedClassifier;
use stage_sdk::{serve, Classifier, HopClient, Lifecycle};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    config_rs::load_dotenv();

    let service_config = ServiceConfig::new("DETECTION");
    error_handling_rs::init(&service_config.display_name())?;
    config_rs::check_hop_timeout_order();

    let analysis = HopClient::from_config(&service_config, StageName::Analysis)?;
    tracing::info!(
        analysis_url = %analysis.endpoint_url(),
        timeout_secs = analysis.timeout().as_secs(),
        "Using Analysis stage"
    );

    let classifier = Arc::new(FixedClassifier::from_env());
    classifier.initialize().await?;
    tracing::info!(provider = classifier.name(), "Classifier ready");

    let service = Arc::new(DetectionService::new(
        classifier.clone() as Arc<dyn Classifier>,
        analysis,
        service_config.get_max_upload_bytes(),
    ));

    let addr = service_config.get_bind_address();
    tracing::info!("Detection Service starting on {}", addr);
    serve(service.create_router(), addr).await?;

    classifier.shutdown().await;
    tracing::info!("Detection Service stopped");
    Ok(())
}
