//! A short conversation: `coffee`, then a size.

use std::time::Duration;

use parley::prelude::*;

const ANSWER_TIMEOUT: Duration = Duration::from_secs(60);

pub fn register(bot: &Bot) -> anyhow::Result<()> {
    bot.command("coffee")
        .help("coffee", "Order a coffee")
        .handle(order_coffee);
    Ok(())
}

async fn order_coffee(chat: Chat) -> HandlerResult {
    chat.reply("What size? (small, medium or large)").await?;

    match chat
        .listen_for_timeout("(small|medium|large)\\b", ANSWER_TIMEOUT)
        .await
    {
        Ok(answer) => {
            let size = answer.group(1).unwrap_or("medium");
            chat.reply(&format!("One {size} coffee coming up, <@{}>!", chat.user()))
                .await?;
        }
        Err(WaitError::TimedOut(_)) => {
            chat.reply("Never mind then.").await?;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley::framework::Dispatcher;
    use parley::framework::testing::ScriptedEngine;

    #[tokio::test]
    async fn test_order_waits_for_size_from_same_user() {
        let (bot, engine, _feed) = ScriptedEngine::bot();
        register(&bot).unwrap();
        let dispatcher = Dispatcher::new(bot.clone());

        let order = dispatcher.dispatch(Event::message("coffee", "U1", "C1"));
        assert!(engine.wait_for_sent(1, Duration::from_secs(2)).await);

        // The command plus the pending answer.
        tokio::time::timeout(Duration::from_secs(2), async {
            while bot.registry().len() < 2 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        dispatcher.dispatch(Event::message("large please", "U2", "C1"));
        dispatcher.dispatch(Event::message("large please", "U1", "C1"));
        for handle in order {
            handle.await.unwrap();
        }

        assert_eq!(
            engine.sent_texts(),
            vec![
                "What size? (small, medium or large)".to_string(),
                "One large coffee coming up, <@U1>!".to_string(),
            ]
        );
        assert_eq!(bot.registry().len(), 1);
    }
}
