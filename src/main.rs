use gift_buddy::ai::{ContentGenerator, DisabledGenerator, OpenAiClient};
use gift_buddy::bot::{self, DiscordMessenger};
use gift_buddy::config::{database, settings};
use gift_buddy::core::birthday::BirthdayEngine;
use gift_buddy::core::context::AppContext;
use gift_buddy::core::scheduler::{Scheduler, StoredTriggers, SystemClock};
use gift_buddy::errors::{Error, Result};
use poise::serenity_prelude as serenity;
use std::{env, sync::Arc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn build_ai(config: &settings::AiSettings) -> Arc<dyn ContentGenerator> {
    if !config.enabled {
        info!("AI generation disabled, using canned texts");
        return Arc::new(DisabledGenerator);
    }
    match env::var("OPENAI_API_KEY") {
        Ok(key) => match OpenAiClient::new(key, config.clone()) {
            Ok(client) => Arc::new(client),
            Err(e) => {
                error!("Could not build the AI client, using canned texts: {e}");
                Arc::new(DisabledGenerator)
            }
        },
        Err(_) => {
            warn!("AI is enabled but OPENAI_API_KEY is not set, using canned texts");
            Arc::new(DisabledGenerator)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, non-fatal since variables can be set externally
    dotenvy::dotenv().ok();

    // 3. Settings and database
    let config = settings::load_default_config()
        .inspect_err(|e| error!("Critical error loading application configuration: {e}"))?;
    if config.bot.operator_id == 0 {
        warn!("bot.operator_id is not set, nobody has super rights until one is promoted");
    }
    if env::var("DATABASE_URL").is_err() {
        std::fs::create_dir_all("data")?;
    }
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {e}"))?;

    // 4. Collaborators
    let token = env::var("DISCORD_BOT_TOKEN")
        .inspect_err(|e| error!("DISCORD_BOT_TOKEN not found: {e}"))
        .map_err(Error::EnvVar)?;
    let http = Arc::new(serenity::Http::new(&token));
    let ai = build_ai(&config.ai);
    let scheduler_settings = config.scheduler.clone();
    let app = AppContext::new(db.clone(), Arc::new(DiscordMessenger::new(http)), ai, config);

    // 5. Scheduler
    let scheduler = Scheduler::new(
        Arc::new(SystemClock),
        Arc::new(StoredTriggers::new(db, scheduler_settings.clone())),
        Arc::new(BirthdayEngine::new(app.clone())),
        &scheduler_settings,
    )
    .spawn();

    // 6. Run the bot until it stops or Ctrl-C; a running task finishes first
    let outcome = tokio::select! {
        result = bot::run_bot(&token, app) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown requested");
            Ok(())
        }
    };
    scheduler.stop().await;
    outcome
}
