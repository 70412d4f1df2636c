//! Storyteller API server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use storyteller_api::config::AppConfig;
use storyteller_api::error::AppError;
use storyteller_api::routes;
use storyteller_api::state::AppState;
use storyteller_api::telemetry;
use storyteller_core::clock::{Clock, SystemClock};
use storyteller_core::ids::{IdGenerator, RandomIds};
use storyteller_core::speech::{SpeechSynthesizer, VoiceProfile};
use storyteller_narration::application::turn_handler::TurnOrchestrator;
use storyteller_narration::domain::story_tool::StoryTool;
use storyteller_providers::blob::LocalBlobStore;
use storyteller_providers::deepgram::DeepgramSpeechClient;
use storyteller_providers::xai::XaiChatModel;
use storyteller_speech::SpeechSynthesisAdapter;
use storyteller_store::{MIGRATOR, PgChatStore};

/// URL path synthesized audio is served under.
const AUDIO_ROUTE: &str = "/audio";

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let telemetry = telemetry::init()?;

    tracing::info!("Starting Storyteller API server");

    let config = AppConfig::from_env()?;

    // Create database connection pool and bring the schema up to date.
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    MIGRATOR.run(&pool).await?;

    // Wire collaborators.
    let store = Arc::new(PgChatStore::new(pool));
    let http = reqwest::Client::new();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let ids: Arc<dyn IdGenerator> = Arc::new(RandomIds);

    let synthesizer: Arc<dyn SpeechSynthesizer> = Arc::new(SpeechSynthesisAdapter::new(
        Arc::new(DeepgramSpeechClient::new(http.clone(), config.deepgram.clone())),
        Arc::new(LocalBlobStore::new(&config.audio_dir, AUDIO_ROUTE)),
        clock.clone(),
        VoiceProfile::default(),
    ));
    let orchestrator = TurnOrchestrator::new(
        store.clone(),
        store,
        Arc::new(XaiChatModel::new(http, config.xai.clone())),
        Arc::new(StoryTool::new(synthesizer.clone(), ids.clone())),
        clock,
        ids,
        config.quota,
    );

    let app = routes::app(
        AppState::new(Arc::new(orchestrator), synthesizer),
        &config.audio_dir,
    );

    // Start server.
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(error) = tokio::signal::ctrl_c().await {
                tracing::warn!(%error, "failed to listen for shutdown signal");
            }
        })
        .await?;

    telemetry.shutdown();
    Ok(())
}
