//! `random number`: picks a number and remembers the previous one.

use parley::prelude::*;
use rand::Rng;

const LAST_NUMBER: &str = "random.last_number";

pub fn register(bot: &Bot) -> anyhow::Result<()> {
    bot.command("random number")
        .help("random number", "Pick a number from 1 to 10")
        .handle(random_number);
    Ok(())
}

async fn random_number(chat: Chat) -> HandlerResult {
    let memory = chat.bot().memory();
    let previous: Option<u32> = memory.load(LAST_NUMBER).await?;

    let number: u32 = rand::rng().random_range(1..=10);
    memory.store(LAST_NUMBER, &number).await?;

    chat.reply(&format!("Random number is {number}")).await?;
    if let Some(previous) = previous {
        chat.reply(&format!("Last time it was {previous}")).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley::framework::Dispatcher;
    use parley::framework::testing::ScriptedEngine;

    fn number_in(text: &str, prefix: &str) -> u32 {
        let n: u32 = text.strip_prefix(prefix).unwrap().parse().unwrap();
        assert!((1..=10).contains(&n), "{n} out of range");
        n
    }

    #[tokio::test]
    async fn test_second_call_mentions_previous_number() {
        let (bot, engine, _feed) = ScriptedEngine::bot();
        register(&bot).unwrap();
        let dispatcher = Dispatcher::new(bot.clone());

        for handle in dispatcher.dispatch(Event::message("random number", "U1", "C1")) {
            handle.await.unwrap();
        }
        let sent = engine.sent_texts();
        assert_eq!(sent.len(), 1);
        let first = number_in(&sent[0], "Random number is ");

        for handle in dispatcher.dispatch(Event::message("random number", "U1", "C1")) {
            handle.await.unwrap();
        }
        let sent = engine.sent_texts();
        assert_eq!(sent.len(), 3);
        let second = number_in(&sent[1], "Random number is ");
        assert_eq!(number_in(&sent[2], "Last time it was "), first);

        let stored: Option<u32> = bot.memory().load(LAST_NUMBER).await.unwrap();
        assert_eq!(stored, Some(second));
        assert!(engine.sent().iter().all(|m| m.to == "C1"));
    }

    #[tokio::test]
    async fn test_other_text_is_ignored() {
        let (bot, engine, _feed) = ScriptedEngine::bot();
        register(&bot).unwrap();

        let handles = Dispatcher::new(bot).dispatch(Event::message("a random number", "U1", "C1"));
        assert!(handles.is_empty());
        assert!(engine.sent_texts().is_empty());
    }
}
