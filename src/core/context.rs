//! Explicit application context handed to every handler and task.

use crate::ai::ContentGenerator;
use crate::config::settings::AppConfig;
use crate::core::panel::Messenger;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Shared collaborators, built once at start-up.
#[derive(Clone)]
pub struct AppContext {
    /// Pooled database connection
    pub db: DatabaseConnection,
    /// Chat platform
    pub messenger: Arc<dyn Messenger>,
    /// Text and image generation
    pub ai: Arc<dyn ContentGenerator>,
    /// Application settings
    pub config: Arc<AppConfig>,
}

impl AppContext {
    /// Bundles the collaborators.
    pub fn new(
        db: DatabaseConnection,
        messenger: Arc<dyn Messenger>,
        ai: Arc<dyn ContentGenerator>,
        config: AppConfig,
    ) -> Self {
        Self {
            db,
            messenger,
            ai,
            config: Arc::new(config),
        }
    }

    /// Platform id that always has super rights.
    pub fn operator_id(&self) -> i64 {
        self.config.bot.operator_id
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
