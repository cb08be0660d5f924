//! Scripts: units of listener registration.
//!
//! A script is a named group of registrations (commands, listeners, start
//! hooks, schedules) run once against the bot before the dispatch loop
//! starts. Loading continues past a failing script: its error is logged and
//! reported, and the remaining scripts still load.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::bot::Bot;
use crate::error::ScriptError;

/// A named unit of registration.
pub trait Script: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Registers the script's listeners on `bot`.
    fn register(&self, bot: &Bot) -> anyhow::Result<()>;
}

/// A shared script trait object.
pub type BoxedScript = Arc<dyn Script>;

/// A [`Script`] backed by a function.
pub struct FnScript<F> {
    name: String,
    register: F,
}

impl<F> Script for FnScript<F>
where
    F: Fn(&Bot) -> anyhow::Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn register(&self, bot: &Bot) -> anyhow::Result<()> {
        (self.register)(bot)
    }
}

impl<F> fmt::Debug for FnScript<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnScript").field("name", &self.name).finish()
    }
}

/// Wraps a registration function as a script.
///
/// ```rust,ignore
/// let lunch = script("lunch", |bot| {
///     bot.command("lunch").handle(suggest_lunch);
///     Ok(())
/// });
/// ```
pub fn script<F>(name: impl Into<String>, register: F) -> BoxedScript
where
    F: Fn(&Bot) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(FnScript {
        name: name.into(),
        register,
    })
}

/// Outcome of [`load_scripts`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptReport {
    /// Names of scripts that registered successfully.
    pub loaded: Vec<String>,
    /// Scripts that failed, in load order.
    pub failed: Vec<ScriptError>,
}

impl ScriptReport {
    /// Returns `true` if every script loaded.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs every script's registration against `bot`, in order.
///
/// Failures and panics are contained per script.
pub fn load_scripts(bot: &Bot, scripts: &[BoxedScript]) -> ScriptReport {
    let mut report = ScriptReport::default();
    if scripts.is_empty() {
        warn!("No scripts to load");
        return report;
    }

    for script in scripts {
        let name = script.name().to_string();
        let outcome = catch_unwind(AssertUnwindSafe(|| script.register(bot)));
        let failure = match outcome {
            Ok(Ok(())) => {
                info!(script = %name, "Loaded script");
                report.loaded.push(name);
                continue;
            }
            Ok(Err(e)) => ScriptError::Failed {
                name,
                reason: format!("{e:#}"),
            },
            Err(_) => ScriptError::Panicked { name },
        };
        error!(error = %failure, "Failed to load script");
        report.failed.push(failure);
    }

    info!(
        loaded = report.loaded.len(),
        failed = report.failed.len(),
        "Scripts loaded"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::Chat;
    use crate::handler::HandlerResult;
    use crate::testing::ScriptedEngine;

    async fn pong(chat: Chat) -> HandlerResult {
        chat.reply("pong").await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_failing_script_does_not_stop_loading() {
        let (bot, _engine, _feed) = ScriptedEngine::bot();
        let scripts = vec![
            script("broken", |_bot| anyhow::bail!("missing setting")),
            script("ping", |bot| {
                bot.command("ping").handle(pong);
                Ok(())
            }),
            script("panicky", |_bot| panic!("bad script")),
        ];

        let report = load_scripts(&bot, &scripts);

        assert_eq!(report.loaded, vec!["ping".to_string()]);
        assert_eq!(report.failed.len(), 2);
        assert_eq!(report.failed[0].name(), "broken");
        assert!(report.failed[0].to_string().contains("missing setting"));
        assert_eq!(
            report.failed[1],
            ScriptError::Panicked {
                name: "panicky".into()
            }
        );
        assert!(!report.is_clean());
        assert_eq!(bot.registry().len(), 1);
    }

    #[tokio::test]
    async fn test_no_scripts_is_empty_report() {
        let (bot, _engine, _feed) = ScriptedEngine::bot();
        let report = load_scripts(&bot, &[]);
        assert!(report.loaded.is_empty());
        assert!(report.is_clean());
    }
}
