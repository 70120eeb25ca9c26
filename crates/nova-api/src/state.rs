//! Application state wiring all services together.
//!
//! The relay and badge checker are generic over repository/provider
//! traits; AppState pins them to the concrete infra implementations.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use secrecy::SecretString;

use nova_core::badge::BadgeChecker;
use nova_core::relay::{ChatRelay, RelayConfig};
use nova_infra::config::load_gateway_config;
use nova_infra::llm::gemini::GeminiProvider;
use nova_infra::paths::resolve_data_dir;
use nova_infra::sqlite::pool::{database_url, DatabasePool};
use nova_infra::sqlite::profile::SqliteProfileRepository;
use nova_infra::sqlite::turn::SqliteTurnRepository;
use nova_infra::sqlite::usage::SqliteUsageRepository;

/// Concrete type aliases for the generics pinned to infra implementations.
pub type ConcreteRelay = ChatRelay<
    SqliteTurnRepository,
    SqliteProfileRepository,
    SqliteUsageRepository,
    GeminiProvider,
>;

pub type ConcreteBadgeChecker =
    BadgeChecker<SqliteTurnRepository, SqliteProfileRepository, GeminiProvider>;

/// Shared application state holding all services.
///
/// Used by both CLI commands and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<ConcreteRelay>,
    pub badges: Arc<ConcreteBadgeChecker>,
    pub turns: Arc<SqliteTurnRepository>,
    pub profiles: Arc<SqliteProfileRepository>,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: connect to DB, wire services.
    ///
    /// `require_gateway` is false for CLI commands that never talk to the
    /// model, so `nova create-user` works without a `GEMINI_API_KEY`.
    pub async fn init(require_gateway: bool) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();

        // Ensure data directory exists
        tokio::fs::create_dir_all(&data_dir).await?;

        let db_pool = DatabasePool::new(&database_url(&data_dir)).await?;

        let gateway = load_gateway_config(&data_dir).await;

        let api_key = match std::env::var("GEMINI_API_KEY") {
            Ok(key) => SecretString::from(key),
            Err(_) if !require_gateway => SecretString::from(String::new()),
            Err(_) => anyhow::bail!(
                "GEMINI_API_KEY is not set. Export your Gemini API key before starting the server."
            ),
        };

        let mut provider = GeminiProvider::new(api_key, gateway.model.clone())
            .context("failed to construct Gemini provider")?;
        if let Some(base_url) = gateway.base_url.clone() {
            provider = provider.with_base_url(base_url);
        }
        let provider = Arc::new(provider);

        let turns = Arc::new(SqliteTurnRepository::new(db_pool.clone()));
        let profiles = Arc::new(SqliteProfileRepository::new(db_pool.clone()));
        let usage = Arc::new(SqliteUsageRepository::new(db_pool.clone()));

        let relay = Arc::new(ChatRelay::new(
            Arc::clone(&turns),
            Arc::clone(&profiles),
            usage,
            Arc::clone(&provider),
            RelayConfig {
                model: gateway.model.clone(),
                temperature: gateway.temperature,
                max_tokens: gateway.max_tokens,
            },
        ));

        let badges = Arc::new(BadgeChecker::new(
            Arc::clone(&turns),
            Arc::clone(&profiles),
            provider,
            gateway.model,
        ));

        Ok(Self {
            relay,
            badges,
            turns,
            profiles,
            data_dir,
            db_pool,
        })
    }
}
