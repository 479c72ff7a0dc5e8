use std::future::Future;

use teloxide::{
    requests::Requester,
    types::{ChatAction, ChatId},
    Bot, RequestError,
};

pub trait BotStuff {
    /// Show the "typing..." status in the chat.
    fn typing(&self, to_where: ChatId) -> impl Future<Output = Result<(), RequestError>> + Send;
}

impl BotStuff for Bot {
    async fn typing(&self, to_where: ChatId) -> Result<(), RequestError> {
        self.send_chat_action(to_where, ChatAction::Typing).await?;
        Ok(())
    }
}
