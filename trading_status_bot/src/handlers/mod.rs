pub mod commands;

use std::sync::Arc;

use arch_bot_commons::useful_methods::BotStuff;
use chrono::Local;
use teloxide::{
    payloads::SendMessageSetters,
    requests::Requester,
    sugar::request::RequestReplyExt,
    types::{Me, Message, ParseMode},
    Bot, RequestError,
};

use crate::status::StatusBoard;

use self::commands::{Command, CommandCall, CommandContext, Reply, Ret, MENU_BUTTONS};

/// What to do about a text message.
#[derive(Debug)]
pub enum Outcome {
    /// A command or a menu button. Reply with the result.
    Handled(Ret),
    /// Plain text we don't understand. Point the user at the menu.
    Hint,
    /// Not for us.
    Ignored,
}

pub const HINT: &str = "Use /menu to see the options.";

/// Figure out the response to `text`.
///
/// `base` is the context the command will run with, save for the params.
pub fn respond(text: &str, bot_username: &str, base: &CommandContext) -> Outcome {
    let text = text.trim();

    if text.starts_with('/') {
        let Some(call) = CommandCall::parse(text, bot_username) else {
            return Outcome::Ignored;
        };
        let Some(command) = Command::find(call.callname) else {
            // Unknown commands might be for other bots in the chat.
            return Outcome::Ignored;
        };
        let context = CommandContext {
            params: call.params,
            ..*base
        };
        return Outcome::Handled((command.function)(&context));
    }

    if let Some((_, command, params)) = MENU_BUTTONS.iter().find(|(label, _, _)| *label == text) {
        let context = CommandContext {
            params: *params,
            ..*base
        };
        return Outcome::Handled((command.function)(&context));
    }

    Outcome::Hint
}

pub async fn handle_message(
    bot: Bot,
    me: Me,
    message: Message,
    status: Arc<StatusBoard>,
) -> Result<(), RequestError> {
    let Some(text) = message.text() else {
        return Ok(());
    };

    let sender = message.from.as_ref();
    // Bot ignores messages made by itself.
    if sender.is_some_and(|x| x.id == me.id) {
        return Ok(());
    }

    let base = CommandContext {
        status: &status,
        first_name: sender.map(|x| x.first_name.as_str()).unwrap_or("there"),
        params: "",
        now: Local::now(),
    };

    let result = match respond(text, me.username(), &base) {
        Outcome::Handled(result) => result,
        Outcome::Hint => {
            // In groups this would answer every single message. No thanks.
            if message.chat.is_private() {
                bot.send_message(message.chat.id, HINT)
                    .reply_to(message.id)
                    .await?;
            }
            return Ok(());
        }
        Outcome::Ignored => return Ok(()),
    };

    status.record_command(sender.map(|x| x.id));

    match result {
        Ok(reply) => send_reply(&bot, &message, reply).await?,
        Err(e) => {
            log::warn!("Command {:?} failed: {}", text, e);
            bot.send_message(message.chat.id, e.user_message())
                .reply_to(message.id)
                .await?;
        }
    }

    Ok(())
}

async fn send_reply(bot: &Bot, message: &Message, reply: Reply) -> Result<(), RequestError> {
    if reply.typing {
        if let Err(e) = bot.typing(message.chat.id).await {
            log::debug!("Failed to send typing action: {}", e);
        }
    }

    let request = bot
        .send_message(message.chat.id, reply.text)
        .parse_mode(ParseMode::Html)
        .reply_to(message.id);

    match reply.keyboard {
        Some(keyboard) => request.reply_markup(keyboard).await?,
        None => request.await?,
    };

    Ok(())
}
