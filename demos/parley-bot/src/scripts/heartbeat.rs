use parley::prelude::*;
use tracing::info;

pub fn register(bot: &Bot) -> anyhow::Result<()> {
    bot.on_schedule(CronFields::new().second("0"))
        .name("heartbeat")
        .handle(heartbeat)?;
    Ok(())
}

/// Logs the listener count once a minute.
async fn heartbeat(bot: Bot) -> HandlerResult {
    info!(
        engine = %bot.engine().name(),
        listeners = bot.registry().len(),
        "Heartbeat"
    );
    Ok(())
}
