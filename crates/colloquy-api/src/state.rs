//! Application state wiring all services together.
//!
//! AppState holds the command router and its supporting services, pinned
//! to the concrete infra implementations: SQLite session storage, the
//! OpenAI-compatible model resolver, and file-backed knowledge sources.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use colloquy_core::admin::{AdminGate, JobTrigger};
use colloquy_core::engine::plain::PlainEngineFactory;
use colloquy_core::engine::registry::ModeRegistry;
use colloquy_core::engine::roleplay::RoleplayEngineFactory;
use colloquy_core::llm::ModelResolver;
use colloquy_core::news::scheduler::NewsScheduler;
use colloquy_core::news::{NewsJob, NewsService};
use colloquy_core::push::SharedPusher;
use colloquy_core::retrieval::SharedRetriever;
use colloquy_core::roles::RoleRegistry;
use colloquy_core::router::CommandRouter;
use colloquy_core::session::SessionManager;
use colloquy_infra::config::{data_dir, load_global_config};
use colloquy_infra::knowledge::{BackgroundRetriever, ChunkRetriever, FileRoleRegistry};
use colloquy_infra::llm::LlmClientFactory;
use colloquy_infra::news::HttpFeedFetcher;
use colloquy_infra::sqlite::{DatabasePool, SqliteSessionRepository, default_database_url};
use colloquy_types::config::GlobalConfig;
use colloquy_types::identity::UserId;

/// Concrete type aliases for the service generics pinned to infra
/// implementations.
pub type ConcreteSessionManager = SessionManager<SqliteSessionRepository>;
pub type ConcreteRouter = CommandRouter<SqliteSessionRepository>;

/// Shared application state used by both the CLI chat loop and the
/// REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<ConcreteRouter>,
    pub config: GlobalConfig,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
    scheduler: Option<NewsScheduler>,
}

impl AppState {
    /// Initialize the application state: load config, connect to the
    /// database, wire services, and start the news scheduler when the
    /// news push is enabled.
    ///
    /// `pusher` is the sink scheduled pushes are delivered through; the
    /// caller picks one appropriate for the front end (terminal or log).
    pub async fn init(pusher: SharedPusher) -> anyhow::Result<Self> {
        let data_dir = data_dir();

        // Ensure the data directory exists before the database opens in it.
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_global_config(&data_dir).await;

        let db_pool = DatabasePool::new(&default_database_url()).await?;
        let repo = SqliteSessionRepository::new(db_pool.clone());

        let timeout = Duration::from_secs(config.collaborator_timeout_secs);
        let resolver: Arc<dyn ModelResolver> = Arc::new(LlmClientFactory::new(
            config.deepseek_api_key.clone(),
            config.ollama_base_url.clone(),
            timeout,
        ));

        // Knowledge sources. Missing files degrade to empty registries
        // and the loaders log the reason.
        let roles: Arc<dyn RoleRegistry> = Arc::new(
            FileRoleRegistry::load(&resolve_path(&data_dir, &config.roles_path)).await,
        );
        let dialog_retriever = SharedRetriever::new(
            ChunkRetriever::load(&resolve_path(&data_dir, &config.chunks_path)).await,
        );
        let background_retriever = SharedRetriever::new(
            BackgroundRetriever::load(&resolve_path(&data_dir, &config.background_path)).await,
        );

        let mut registry = ModeRegistry::new();
        registry.register(PlainEngineFactory::new(
            resolver.clone(),
            config.default_model.clone(),
        ));
        registry.register(RoleplayEngineFactory::new(
            roles.clone(),
            dialog_retriever,
            background_retriever,
            resolver.clone(),
            config.default_model.clone(),
        ));

        let sessions = Arc::new(SessionManager::new(
            repo,
            Arc::new(registry),
            roles,
            resolver,
            config.engine_cache_capacity,
        ));

        // A session persisted under a mode with no factory would fail on
        // every message; refuse to start instead.
        sessions.verify_persisted_modes().await?;

        let gate = AdminGate::new(
            config
                .admin_user_ids
                .iter()
                .map(|id| UserId::new(id.clone())),
        );

        let (news_job, scheduler) = if config.news.enabled {
            let service = NewsService::new(HttpFeedFetcher::new(timeout), config.news.clone());
            let job: Arc<dyn JobTrigger> = Arc::new(NewsJob::new(service, pusher));

            let scheduler = NewsScheduler::new();
            scheduler.start().await?;
            scheduler
                .schedule_daily(config.news.hour, config.news.minute, job.clone())
                .await?;
            (Some(job), Some(scheduler))
        } else {
            (None, None)
        };

        let router = Arc::new(CommandRouter::new(sessions, gate, news_job));

        Ok(Self {
            router,
            config,
            data_dir,
            db_pool,
            scheduler,
        })
    }

    /// Stop the news scheduler, if one is running. Called before exit so
    /// the cron runtime shuts down cleanly.
    pub async fn shutdown(&self) {
        if let Some(scheduler) = &self.scheduler {
            if let Err(e) = scheduler.stop().await {
                tracing::warn!(error = %e, "news scheduler did not stop cleanly");
            }
        }
    }
}

/// Resolve a configured path against the data directory unless it is
/// already absolute.
fn resolve_path(data_dir: &Path, value: &str) -> PathBuf {
    let path = Path::new(value);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        data_dir.join(path)
    }
}
