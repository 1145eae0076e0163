//! Application state wiring the core to its infrastructure.
//!
//! The core is generic over its ports; AppState pins them to SQLite storage,
//! the WebSocket hub and the built-in translation tables.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use randchat_core::directory::Directory;
use randchat_core::gateway::Gateway;
use randchat_core::lifecycle::Lifecycle;
use randchat_core::locks::CandidateLocks;
use randchat_infra::config::load_global_config;
use randchat_infra::filesystem::{ensure_data_dir, resolve_data_dir};
use randchat_infra::i18n::StaticLocalizer;
use randchat_infra::sqlite::pool::{DatabasePool, database_url};
use randchat_infra::sqlite::talk::SqliteTalkRepository;
use randchat_infra::sqlite::user::SqliteUserRepository;
use randchat_types::config::GlobalConfig;

use crate::http::hub::WsHub;

pub type ConcreteLifecycle = Lifecycle<SqliteUserRepository, SqliteTalkRepository, WsHub>;
pub type ConcreteGateway = Gateway<SqliteUserRepository, SqliteTalkRepository, WsHub>;

/// Shared application state, used by CLI commands and HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<ConcreteGateway>,
    pub hub: Arc<WsHub>,
    pub config: Arc<GlobalConfig>,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize from the resolved data directory.
    pub async fn init() -> anyhow::Result<Self> {
        Self::init_at(&resolve_data_dir()).await
    }

    /// Connect to the database under `data_dir` and wire the core.
    pub async fn init_at(data_dir: &Path) -> anyhow::Result<Self> {
        ensure_data_dir(data_dir).await?;
        let config = Arc::new(load_global_config(data_dir).await);
        let db_pool = DatabasePool::new(&database_url(data_dir)).await?;

        let hub = Arc::new(WsHub::new());
        let directory = Arc::new(Directory::new(Arc::new(SqliteUserRepository::new(
            db_pool.clone(),
        ))));
        let lifecycle = Arc::new(Lifecycle::new(
            directory,
            Arc::new(SqliteTalkRepository::new(db_pool.clone())),
            hub.clone(),
            Arc::new(StaticLocalizer),
            config.clone(),
        ));
        let gateway = Arc::new(Gateway::new(lifecycle, CandidateLocks::new()));

        Ok(Self {
            gateway,
            hub,
            config,
            data_dir: data_dir.to_path_buf(),
            db_pool,
        })
    }

    pub fn lifecycle(&self) -> &Arc<ConcreteLifecycle> {
        self.gateway.lifecycle()
    }
}
