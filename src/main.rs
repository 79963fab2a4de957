use anyhow::Result;
use std::env;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use recipes::bot::{bot_commands, message_handler, TelegramSink};
use recipes::flow::ReplySink;
use recipes::localization::{LocalizationManager, Localizer};
use recipes::{
    AppConfig, FlowController, FlowDependencies, FlowSettings, GoogleTranslateClient, MealDbClient,
    PassthroughTranslator, RecipeDirectory, SessionStore, Translator,
};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "recipes=info,teloxide=warn".into());
    let json = env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    init_tracing();
    info!("Starting Recipes Telegram Bot");

    let config = AppConfig::from_env()?;
    info!(
        language = %config.flow.language,
        directory = %config.directory.base_url,
        translation_enabled = config.translation.enabled,
        "Configuration loaded"
    );

    let localization = Arc::new(LocalizationManager::new()?);
    if !localization.supports(&config.flow.language) {
        warn!(language = %config.flow.language, "No catalog for language, messages fall back to English");
    }

    let directory: Arc<dyn RecipeDirectory> = Arc::new(MealDbClient::new(&config.directory)?);
    let translator: Arc<dyn Translator> = if config.translation.enabled {
        Arc::new(GoogleTranslateClient::new(&config.translation)?)
    } else {
        Arc::new(PassthroughTranslator)
    };

    let store = Arc::new(SessionStore::new(config.flow.session_ttl()));
    let _sweeper = Arc::clone(&store).spawn_sweeper(config.flow.session_sweep_interval());

    let bot = Bot::new(&config.telegram_bot_token);
    let sink: Arc<dyn ReplySink> = Arc::new(TelegramSink::new(bot.clone()));

    let commands = bot_commands(Localizer::new(&localization, &config.flow.language));
    if let Err(e) = bot.set_my_commands(commands).await {
        warn!(error = %e, "Failed to register bot commands");
    }

    let controller = Arc::new(FlowController::new(
        FlowDependencies {
            directory,
            translator,
            store,
            sink,
            localization,
        },
        FlowSettings::from(&config.flow),
    ));

    info!("Bot initialized, starting dispatcher");

    let handler = Update::filter_message().endpoint(message_handler);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![controller])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
