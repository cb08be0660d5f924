//! `!help` and `!help <query>`.

use parley::prelude::*;

pub fn register(bot: &Bot) -> anyhow::Result<()> {
    bot.command("!help$")
        .name("help")
        .help("!help", "Get help for commands")
        .handle(help);
    bot.command("!help (.*)")
        .name("help query")
        .help("!help <query>", "Get help for commands matching a query")
        .handle(help_query);
    Ok(())
}

async fn help(chat: Chat) -> HandlerResult {
    reply_with_help(&chat, None).await
}

async fn help_query(chat: Chat) -> HandlerResult {
    let query = chat.group(1).unwrap_or_default().trim().to_string();
    reply_with_help(&chat, Some(&query)).await
}

async fn reply_with_help(chat: &Chat, query: Option<&str>) -> HandlerResult {
    let text = chat.bot().help().render(query);
    if text.is_empty() {
        chat.reply("No matching commands.").await?;
    } else {
        chat.reply(&text).await?;
    }
    Ok(())
}
