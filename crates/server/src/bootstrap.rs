use std::sync::Arc;
use std::time::Duration;

use glassdesk_agent::answers::{LlmAnswerGenerator, RuleBasedAnswerGenerator};
use glassdesk_agent::escalation::InMemoryEscalationService;
use glassdesk_agent::formatter::{FormatterError, ResponseFormatter};
use glassdesk_agent::llm::{OpenAiCompatibleClient, OLLAMA_BASE_URL, OPENAI_BASE_URL};
use glassdesk_agent::lookup::{FixtureStatusLookup, HttpStatusLookup};
use glassdesk_agent::{
    ActionOrchestrator, AnswerGenerator, CollaboratorError, CollaboratorTimeouts, Collaborators,
    StatusLookup,
};
use glassdesk_core::config::{
    AppConfig, ConfigError, LlmProvider, LoadOptions, LookupMode, SessionBackend,
};
use glassdesk_db::{
    connect_with_settings, migrations, DbPool, SessionStore, SqlSessionRepository,
};
use glassdesk_whatsapp::{
    default_dispatcher, CloudApiMessenger, EventDispatcher, LogOnlyMessenger, Messenger,
    OrchestratorConversation, TransportError,
};
use thiserror::Error;
use tracing::info;

const WHATSAPP_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Fully wired service: every collaborator is resolved here, once.
pub struct Application {
    pub config: AppConfig,
    pub db_pool: Option<DbPool>,
    pub store: SessionStore,
    pub orchestrator: Arc<ActionOrchestrator>,
    pub dispatcher: Arc<EventDispatcher>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("status lookup setup failed: {0}")]
    Lookup(#[from] CollaboratorError),
    #[error("llm client setup failed: {0}")]
    Llm(String),
    #[error("reply templates failed to load: {0}")]
    Templates(#[from] FormatterError),
    #[error("whatsapp messenger setup failed: {0}")]
    Messenger(#[from] TransportError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        session_key = "unknown",
        "starting application bootstrap"
    );

    let (store, db_pool) = session_store(&config).await?;
    let collaborators = Collaborators {
        lookup: status_lookup(&config)?,
        answers: answer_generator(&config)?,
        escalation: Arc::new(InMemoryEscalationService::new()),
        formatter: ResponseFormatter::new()?,
    };
    let orchestrator = Arc::new(ActionOrchestrator::new(
        store.clone(),
        collaborators,
        CollaboratorTimeouts::from_config(&config),
    ));

    let dispatcher = Arc::new(default_dispatcher(
        OrchestratorConversation::new(orchestrator.clone()),
        messenger(&config)?,
    ));

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        session_key = "unknown",
        session_backend = ?config.session.backend,
        lookup_mode = ?config.lookup.mode,
        llm_provider = ?config.llm.provider,
        whatsapp_delivery = config.whatsapp_delivery_enabled(),
        "application wired"
    );

    Ok(Application { config, db_pool, store, orchestrator, dispatcher })
}

async fn session_store(
    config: &AppConfig,
) -> Result<(SessionStore, Option<DbPool>), BootstrapError> {
    let ttl = Duration::from_secs(config.session.ttl_secs);
    match config.session.backend {
        SessionBackend::Memory => Ok((SessionStore::in_memory(ttl), None)),
        SessionBackend::Sqlite => {
            let pool = connect_with_settings(
                &config.database.url,
                config.database.max_connections,
                config.database.timeout_secs,
            )
            .await
            .map_err(BootstrapError::DatabaseConnect)?;
            info!(
                event_name = "system.bootstrap.database_connected",
                correlation_id = "bootstrap",
                session_key = "unknown",
                "database connection established"
            );

            migrations::run_pending(&pool).await.map_err(BootstrapError::Migration)?;
            info!(
                event_name = "system.bootstrap.migrations_applied",
                correlation_id = "bootstrap",
                session_key = "unknown",
                "database migrations applied"
            );

            let repository = Arc::new(SqlSessionRepository::new(pool.clone()));
            Ok((SessionStore::new(repository, ttl), Some(pool)))
        }
    }
}

fn status_lookup(config: &AppConfig) -> Result<Arc<dyn StatusLookup>, BootstrapError> {
    match config.lookup.mode {
        LookupMode::Fixture => Ok(Arc::new(FixtureStatusLookup::new())),
        LookupMode::Http => {
            // validation already rejects http mode without a base url
            let base_url = config.lookup.base_url.as_deref().unwrap_or_default();
            let lookup = HttpStatusLookup::new(
                base_url,
                Duration::from_secs(config.lookup.timeout_secs),
            )?;
            Ok(Arc::new(lookup))
        }
    }
}

fn answer_generator(config: &AppConfig) -> Result<Arc<dyn AnswerGenerator>, BootstrapError> {
    let default_base_url = match config.llm.provider {
        LlmProvider::Rules => return Ok(Arc::new(RuleBasedAnswerGenerator::new())),
        LlmProvider::OpenAi => OPENAI_BASE_URL,
        LlmProvider::Ollama => OLLAMA_BASE_URL,
    };

    let client = OpenAiCompatibleClient::new(
        config.llm.base_url.as_deref().unwrap_or(default_base_url),
        config.llm.api_key.clone(),
        config.llm.model.as_str(),
        Duration::from_secs(config.llm.timeout_secs),
    )
    .map_err(|error| BootstrapError::Llm(error.to_string()))?;
    Ok(Arc::new(LlmAnswerGenerator::new(client)))
}

fn messenger(config: &AppConfig) -> Result<Arc<dyn Messenger>, BootstrapError> {
    let whatsapp = &config.whatsapp;
    match (&whatsapp.access_token, &whatsapp.phone_number_id) {
        (Some(access_token), Some(phone_number_id)) if config.whatsapp_delivery_enabled() => {
            let messenger = CloudApiMessenger::new(
                &whatsapp.api_version,
                phone_number_id,
                access_token.clone(),
                WHATSAPP_SEND_TIMEOUT,
            )?;
            Ok(Arc::new(messenger))
        }
        _ => {
            info!(
                event_name = "system.bootstrap.whatsapp_log_only",
                correlation_id = "bootstrap",
                session_key = "unknown",
                "whatsapp credentials absent, replies will only be logged"
            );
            Ok(Arc::new(LogOnlyMessenger))
        }
    }
}
