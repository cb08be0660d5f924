use parley::prelude::*;

pub fn register(bot: &Bot) -> anyhow::Result<()> {
    bot.command("lunch")
        .help("lunch", "Suggest a place to eat")
        .handle(lunch_suggestion);
    Ok(())
}

async fn lunch_suggestion(chat: Chat) -> HandlerResult {
    chat.reply("How about Chipotle?").await?;
    chat.react("burrito").await?;
    Ok(())
}
