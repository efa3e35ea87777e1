// feedback-service-rs/src/main.rs
// Feedback Service - terminal stage of the image report chain
// Port 5003 - POST /generate-feedback, GET /health

use std::sync::Arc;

use config_rs::ServiceConfig;
use feedback_service::FeedbackService;
use stage_sdk::capability::TemplateSummarizer;
use stage_sdk::{serve, Lifecycle, Summarizer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    config_rs::load_dotenv();

    let service_config = ServiceConfig::new("FEEDBACK");
    error_handling_rs::init(&service_config.display_name())?;

    let summarizer = Arc::new(TemplateSummarizer);
    summarizer.initialize().await?;
    tracing::info!(provider = summarizer.name(), "Summarizer ready");

    let service = Arc::new(FeedbackService::new(
        summarizer.clone() as Arc<dyn Summarizer>,
        service_config.get_max_upload_bytes(),
    ));

    let addr = service_config.get_bind_address();
    tracing::info!("Feedback Service starting on {}", addr);
    serve(service.create_router(), addr).await?;

    summarizer.shutdown().await;
    tracing::info!("Feedback Service stopped");
    Ok(())
}
