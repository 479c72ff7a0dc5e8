use chrono::{DateTime, Local};
use html_escape::encode_text;
use teloxide::types::{BotCommand, KeyboardButton, KeyboardMarkup};

use crate::{
    price::{Asset, Quote, UnknownAsset, Usd},
    status::{BotState, StatusBoard},
};

pub const COMMANDS: &[Command] = &[START, HELP, PRICE, PRECIO, MENU, STATUS, TEST];

pub type Ret = Result<Reply, CommandError>;

/// What a command has to say back.
#[derive(Debug)]
pub struct Reply {
    /// HTML.
    pub text: String,
    pub keyboard: Option<KeyboardMarkup>,
    /// Show "typing..." before replying.
    pub typing: bool,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Reply {
        Reply {
            text: text.into(),
            keyboard: None,
            typing: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    UnknownAsset(#[from] UnknownAsset),
}

impl CommandError {
    /// Short plain text message to show in the chat.
    pub fn user_message(&self) -> String {
        match self {
            CommandError::UnknownAsset(UnknownAsset(asset)) => {
                let known = Asset::ALL
                    .iter()
                    .map(|x| x.ticker().to_lowercase())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("⚠️ Error getting the price of \"{asset}\". Try one of: {known}")
            }
        }
    }
}

pub struct CommandContext<'a> {
    pub status: &'a StatusBoard,
    /// Who we're talking to. Not escaped.
    pub first_name: &'a str,
    /// Everything after the command itself.
    pub params: &'a str,
    pub now: DateTime<Local>,
}

/// A command as sent by the user, like `/price@Some_Bot eth`.
#[derive(Debug, PartialEq, Eq)]
pub struct CommandCall<'a> {
    /// `/price`
    pub callname: &'a str,
    /// `eth`
    pub params: &'a str,
}

impl<'a> CommandCall<'a> {
    /// Returns `None` if this is not a command, or if it's a command for another bot.
    pub fn parse(text: &'a str, bot_username: &str) -> Option<CommandCall<'a>> {
        if !text.starts_with('/') {
            return None;
        }

        let command = text.split_whitespace().next()?;

        if !command.is_ascii() {
            // Telegram commands must be ASCII.
            // See https://core.telegram.org/bots/api#botcommand
            return None;
        }

        let params = text[command.len()..].trim_start();

        // "/price@Some_Bot" -> "/price", if we're Some_Bot.
        let callname = if let Some(username_start) = command.find('@') {
            if !command[username_start + '@'.len_utf8()..].eq_ignore_ascii_case(bot_username) {
                return None;
            }
            &command[..username_start]
        } else {
            command
        };

        Some(CommandCall { callname, params })
    }
}

pub struct Command {
    pub callname: &'static str,
    pub description: &'static str,
    pub function: fn(&CommandContext) -> Ret,
    hidden: bool,
}

impl Command {
    pub fn find(callname: &str) -> Option<&'static Command> {
        COMMANDS
            .iter()
            .find(|x| x.callname.eq_ignore_ascii_case(callname))
    }

    pub fn generate_command_list() -> String {
        let mut response = String::new();
        for command in COMMANDS.iter().filter(|x| !x.hidden) {
            response += "• ";
            response += command.callname;
            response += " - ";
            response += command.description;
            response += "\n";
        }
        response.pop();
        response
    }

    pub fn generate_bot_commands() -> Vec<BotCommand> {
        COMMANDS
            .iter()
            .filter(|x| !x.hidden)
            .map(|command| BotCommand {
                // Cut off the /
                command: command.callname[1..].to_string(),
                description: command.description.to_string(),
            })
            .collect()
    }
}

/// Buttons of the `/menu` keyboard, with what pressing them does.
pub const MENU_BUTTONS: &[(&str, &Command, &str)] = &[
    ("💰 Price BTC", &PRICE, "btc"),
    ("💎 Price ETH", &PRICE, "eth"),
    ("☀️ Price SOL", &PRICE, "sol"),
    ("🚀 Status", &STATUS, ""),
    ("🛠️ Help", &HELP, ""),
    ("✅ Test", &TEST, ""),
];

pub fn menu_keyboard() -> KeyboardMarkup {
    let rows = MENU_BUTTONS
        .chunks(2)
        .map(|row| {
            row.iter()
                .map(|(label, _, _)| KeyboardButton::new(*label))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    KeyboardMarkup::new(rows).resize_keyboard()
}

const START: Command = Command {
    callname: "/start",
    description: "Greeting and a list of commands",
    function: |ctx| {
        Ok(Reply::text(format!(
            concat!(
                "👋 Hi {}!\n\n",
                "🤖 <b>Trading bot is up</b>\n\n",
                "✨ Available commands:\n",
                "{}\n\n",
                "🚀 <b>Running 24/7</b>"
            ),
            encode_text(ctx.first_name),
            Command::generate_command_list()
        )))
    },
    hidden: false,
};

const HELP: Command = Command {
    callname: "/help",
    description: "This help",
    function: |_| {
        Ok(Reply::text(format!(
            concat!(
                "📋 <b>AVAILABLE COMMANDS</b>\n\n",
                "{}\n\n",
                "Supported assets for /price: {}\n\n",
                "Prices are simulated, this is not financial advice."
            ),
            Command::generate_command_list(),
            Asset::ALL
                .iter()
                .map(|x| x.ticker())
                .collect::<Vec<_>>()
                .join(", ")
        )))
    },
    hidden: false,
};

fn price(ctx: &CommandContext) -> Ret {
    let asset = match ctx.params.split_whitespace().next() {
        None => Asset::Bitcoin,
        Some(x) => x.parse::<Asset>()?,
    };

    let quote = Quote::generate(asset);
    let mut reply = Reply::text(format_quote(&quote, ctx.now));
    reply.typing = true;
    Ok(reply)
}

pub fn format_quote(quote: &Quote, now: DateTime<Local>) -> String {
    let (emoji, trend) = if quote.is_bullish() {
        ("📈", "BULLISH 🚀")
    } else {
        ("📉", "BEARISH 🔻")
    };
    format!(
        concat!(
            "💰 <b>{} PRICE</b>\n\n",
            "• Price: {}\n",
            "• 24h change: {:+.2}% {}\n",
            "• Trend: {}\n\n",
            "⏰ {}"
        ),
        quote.asset.name().to_uppercase(),
        Usd(quote.price),
        quote.change_percent,
        emoji,
        trend,
        now.format("%H:%M")
    )
}

const PRICE: Command = Command {
    callname: "/price",
    description: "Simulated price of an asset (btc by default)",
    function: price,
    hidden: false,
};

const PRECIO: Command = Command {
    callname: "/precio",
    description: "",
    function: price,
    hidden: true,
};

const MENU: Command = Command {
    callname: "/menu",
    description: "Interactive menu",
    function: |_| {
        Ok(Reply {
            text: "📱 <b>MAIN MENU</b>\n\nPick an option:".to_string(),
            keyboard: Some(menu_keyboard()),
            typing: false,
        })
    },
    hidden: false,
};

const STATUS: Command = Command {
    callname: "/status",
    description: "Bot status",
    function: |ctx| {
        let status = ctx.status.snapshot();
        let state = match status.status {
            BotState::Running => "✅ ONLINE",
            BotState::Initializing => "⏳ STARTING",
            BotState::Unhealthy => "❌ UNHEALTHY",
        };
        Ok(Reply::text(format!(
            concat!(
                "📊 <b>BOT STATUS</b>\n\n",
                "• State: {}\n",
                "• Uptime: {}h {}m\n",
                "• Commands processed: {}\n",
                "• Users: {}\n",
                "• RAM: {:.1}%"
            ),
            state,
            status.uptime / 3600,
            status.uptime % 3600 / 60,
            status.commands_processed,
            status.users_active,
            ctx.status.host().memory_percent()
        )))
    },
    hidden: false,
};

const TEST: Command = Command {
    callname: "/test",
    description: "Check that the bot responds",
    function: |ctx| {
        Ok(Reply::text(format!(
            concat!(
                "✅ <b>TEST PASSED</b>\n\n",
                "• Bot: working\n",
                "• Time: {}\n",
                "• Status: 🟢 ONLINE"
            ),
            ctx.now.format("%H:%M:%S")
        )))
    },
    hidden: false,
};
