// analysis-service-rs/src/main.rs
// Analysis Service - diagnostic stage of the image report chain
// Port 5002 - POST /process-image, GET /health

use std::sync::Arc;

use analysis_service::AnalysisService;
use config_rs::ServiceConfig;
use shared_types_rs::StageName;
use stage_sdk::capability::PendingAnalyzer;
use stage_sdk::{serve, Analyzer, HopClient, Lifecycle};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    config_rs::load_dotenv();

    let service_config = ServiceConfig::new("ANALYSIS");
    error_handling_rs::init(&service_config.display_name())?;
    config_rs::check_hop_timeout_order();

    let feedback = HopClient::from_config(&service_config, StageName::Feedback)?;
    tracing::info!(
        feedback_url = %feedback.endpoint_url(),
        timeout_secs = feedback.timeout().as_secs(),
        "Using Feedback stage"
    );

    let analyzer = Arc::new(PendingAnalyzer);
    analyzer.initialize().await?;
    tracing::info!(provider = analyzer.name(), "Analyzer ready");

    let service = Arc::new(AnalysisService::new(
        analyzer.clone() as Arc<dyn Analyzer>,
        feedback,
        service_config.get_max_upload_bytes(),
    ));

    let addr = service_config.get_bind_address();
    tracing::info!("Analysis Service starting on {}", addr);
    serve(service.create_router(), addr).await?;

    analyzer.shutdown().await;
    tracing::info!("Analysis Service stopped");
    Ok(())
}
