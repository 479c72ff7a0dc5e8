use std::sync::Arc;

use arch_bot_commons::retry::{retry_with_backoff, RetryError};
use teloxide::{
    dptree::deps, error_handlers::LoggingErrorHandler, prelude::*, update_listeners::Polling,
    RequestError,
};

use crate::{
    config::{Config, ConfigError},
    handlers::{self, commands::Command},
    status::{BotState, StatusBoard},
    web::{self, WebState},
};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("could not connect to Telegram: {0}")]
    Connect(#[from] RetryError<RequestError>),
}

/// Start the web server and the bot, and run until interrupted.
///
/// # Errors
///
/// Fails before touching the network if the config is broken,
/// or if Telegram could not be reached within the retry budget.
pub async fn entry() -> Result<(), StartupError> {
    let config = Config::from_env()?;
    log::info!("Token found: {}...", config.token_preview());
    log::debug!("{:?}", config);

    let status = Arc::new(StatusBoard::new());

    let web_state = WebState {
        status: status.clone(),
        page_style: config.status_page,
    };
    let port = config.port;
    tokio::spawn(async move {
        // The bot is still useful without it.
        if let Err(e) = web::serve(port, web_state).await {
            log::error!("Web server on port {} failed: {}", port, e);
        }
    });

    log::info!("Connecting to Telegram...");

    let bot = Bot::new(&config.token);

    let connected = retry_with_backoff(&config.retry, |_| {
        let bot = bot.clone();
        async move { bot.get_me().await }
    })
    .await;

    let me = match connected {
        Ok(connected) => connected.handle,
        Err(e) => {
            status.set_state(BotState::Unhealthy);
            return Err(e.into());
        }
    };

    log::info!("Logged in as @{}", me.username());

    if let Err(e) = bot
        .set_my_commands(Command::generate_bot_commands())
        .await
    {
        log::warn!("Failed to set bot commands: {}", e);
    }

    status.set_state(BotState::Running);

    log::info!("Creating the handler...");

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    let mut polling = Polling::builder(bot.clone());
    if config.drop_pending_updates {
        polling = polling.drop_pending_updates();
    }
    let listener = polling.build();

    log::info!("Dispatching the dispatcher!");

    Dispatcher::builder(bot, handler)
        .default_handler(|_| async {})
        .dependencies(deps![status])
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("An error from the update listener"),
        )
        .await;

    log::info!("it appears we have been bonked.");

    Ok(())
}
