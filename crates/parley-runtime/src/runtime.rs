//! Runtime orchestration.
//!
//! [`ParleyRuntime`] owns the configuration and the catalogue of engines,
//! memory backends and scripts known to the binary. Running it:
//!
//! 1. builds the configured memory backend and calls its `setup`;
//! 2. builds the configured engine and calls its `setup`;
//! 3. creates the [`Bot`] and loads the selected scripts;
//! 4. runs start hooks and scheduled jobs;
//! 5. runs the dispatch loop until a shutdown signal or an engine failure.
//!
//! ```rust,ignore
//! let mut runtime = ParleyRuntime::builder().config_file("parley.toml").build()?;
//! runtime
//!     .register_engine::<ConsoleEngine>()
//!     .register_engine::<SlackEngine>()
//!     .register_script(lunch_script());
//! runtime.run().await?;
//! ```

use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use figment::value::Value;
use serde::de::DeserializeOwned;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use parley_core::{
    BoxedEngine, BoxedMemory, ConfigurableEngine, ConfigurableMemory, EngineResult, MemoryResult,
};
use parley_framework::{Bot, BoxedScript, load_scripts};
use parley_memory::MemoryDict;

use crate::config::{ConfigLoader, ParleyConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

type EngineFactory = Box<dyn Fn(Option<&Value>) -> RuntimeResult<BoxedEngine> + Send + Sync>;
type MemoryFactory = Box<dyn Fn(Option<&Value>) -> RuntimeResult<BoxedMemory> + Send + Sync>;

/// The Parley runtime.
pub struct ParleyRuntime {
    config: ParleyConfig,
    engines: BTreeMap<&'static str, EngineFactory>,
    memories: BTreeMap<&'static str, MemoryFactory>,
    scripts: Vec<BoxedScript>,
}

impl ParleyRuntime {
    /// Creates a runtime builder.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from a loaded configuration and installs logging.
    ///
    /// The `dict` memory backend is always available, and `redis` is too
    /// with the `redis-memory` feature.
    pub fn from_config(config: ParleyConfig) -> Self {
        logging::init_from_config(&config.logging);

        let mut runtime = Self {
            config,
            engines: BTreeMap::new(),
            memories: BTreeMap::new(),
            scripts: Vec::new(),
        };
        runtime.register_memory::<MemoryDict>();
        #[cfg(feature = "redis-memory")]
        runtime.register_memory::<parley_memory::RedisMemory>();

        info!(
            engine = %runtime.config.engine,
            memory = %runtime.config.memory,
            log_level = %runtime.config.logging.level,
            "Runtime initialized from configuration"
        );
        runtime
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ParleyConfig {
        &self.config
    }

    /// Makes an engine selectable by its [`ConfigurableEngine::NAME`].
    ///
    /// Its configuration is read from `engines.<NAME>`, falling back to the
    /// config type's default.
    pub fn register_engine<E: ConfigurableEngine>(&mut self) -> &mut Self {
        let factory: EngineFactory = Box::new(|value: Option<&Value>| -> RuntimeResult<BoxedEngine> {
            let config: E::Config = component_config(E::NAME, value)?;
            let engine: BoxedEngine = Arc::new(E::from_config(config)?);
            Ok(engine)
        });
        self.add_engine(E::NAME, factory)
    }

    /// Makes an engine built by `factory` selectable as `name`.
    pub fn register_engine_with<F>(&mut self, name: &'static str, factory: F) -> &mut Self
    where
        F: Fn() -> EngineResult<BoxedEngine> + Send + Sync + 'static,
    {
        self.add_engine(
            name,
            Box::new(move |_: Option<&Value>| -> RuntimeResult<BoxedEngine> { Ok(factory()?) }),
        )
    }

    fn add_engine(&mut self, name: &'static str, factory: EngineFactory) -> &mut Self {
        if self.engines.insert(name, factory).is_some() {
            warn!(engine = name, "Engine registered twice, keeping the last");
        }
        debug!(engine = name, "Registered engine");
        self
    }

    /// Makes a memory backend selectable by its [`ConfigurableMemory::NAME`].
    pub fn register_memory<M: ConfigurableMemory>(&mut self) -> &mut Self {
        let factory: MemoryFactory = Box::new(|value: Option<&Value>| -> RuntimeResult<BoxedMemory> {
            let config: M::Config = component_config(M::NAME, value)?;
            let memory: BoxedMemory = Arc::new(M::from_config(config)?);
            Ok(memory)
        });
        self.add_memory(M::NAME, factory)
    }

    /// Makes a memory backend built by `factory` selectable as `name`.
    pub fn register_memory_with<F>(&mut self, name: &'static str, factory: F) -> &mut Self
    where
        F: Fn() -> MemoryResult<BoxedMemory> + Send + Sync + 'static,
    {
        self.add_memory(
            name,
            Box::new(move |_: Option<&Value>| -> RuntimeResult<BoxedMemory> { Ok(factory()?) }),
        )
    }

    fn add_memory(&mut self, name: &'static str, factory: MemoryFactory) -> &mut Self {
        if self.memories.insert(name, factory).is_some() {
            warn!(memory = name, "Memory backend registered twice, keeping the last");
        }
        debug!(memory = name, "Registered memory backend");
        self
    }

    /// Adds a script. Scripts load in registration order.
    pub fn register_script(&mut self, script: BoxedScript) -> &mut Self {
        self.scripts.push(script);
        self
    }

    /// Adds several scripts.
    pub fn register_scripts(&mut self, scripts: impl IntoIterator<Item = BoxedScript>) -> &mut Self {
        self.scripts.extend(scripts);
        self
    }

    /// Names of the registered engines, sorted.
    pub fn engine_names(&self) -> Vec<&'static str> {
        self.engines.keys().copied().collect()
    }

    /// Names of the registered memory backends, sorted.
    pub fn memory_names(&self) -> Vec<&'static str> {
        self.memories.keys().copied().collect()
    }

    fn build_engine(&self) -> RuntimeResult<BoxedEngine> {
        let name = self.config.engine.as_str();
        let factory = self
            .engines
            .get(name)
            .ok_or_else(|| RuntimeError::UnknownEngine {
                name: name.to_string(),
                available: self.engine_names().join(", "),
            })?;
        factory(self.config.engines.get(name))
    }

    fn build_memory(&self) -> RuntimeResult<BoxedMemory> {
        let name = self.config.memory.as_str();
        let factory = self
            .memories
            .get(name)
            .ok_or_else(|| RuntimeError::UnknownMemory {
                name: name.to_string(),
                available: self.memory_names().join(", "),
            })?;
        factory(self.config.memories.get(name))
    }

    /// Scripts enabled by `scripts` in the configuration, in its order.
    fn selected_scripts(&self) -> Vec<BoxedScript> {
        if self.config.scripts.is_empty() {
            return self.scripts.clone();
        }
        self.config
            .scripts
            .iter()
            .filter_map(|wanted| {
                let found = self.scripts.iter().find(|s| s.name() == wanted.as_str()).cloned();
                if found.is_none() {
                    warn!(script = %wanted, "Configured script is not registered");
                }
                found
            })
            .collect()
    }

    /// Sets up memory and engine, then creates the bot and loads scripts.
    ///
    /// Nothing is dispatched yet.
    pub async fn prepare(&self) -> RuntimeResult<Bot> {
        let memory = self.build_memory()?;
        memory.setup().await?;
        info!(memory = %self.config.memory, "Memory ready");

        let engine = self.build_engine()?;
        engine.setup().await?;
        info!(engine = %engine.name(), "Engine ready");

        let bot = Bot::new(engine, memory);
        let report = load_scripts(&bot, &self.selected_scripts());
        for failure in &report.failed {
            error!(script = %failure.name(), error = %failure, "Script not loaded");
        }
        Ok(bot)
    }

    /// Runs until `shutdown` resolves or the engine fails.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        let bot = self.prepare().await?;
        let token = CancellationToken::new();
        let tasks = bot.start(&token);

        let run = bot.run(token.clone());
        tokio::pin!(run, shutdown);
        let result = tokio::select! {
            result = &mut run => result,
            () = &mut shutdown => {
                info!("Shutdown requested");
                token.cancel();
                run.await
            }
        };

        token.cancel();
        for task in tasks {
            task.abort();
        }
        bot.engine().shutdown().await;

        match &result {
            Ok(()) => info!("Runtime stopped"),
            Err(e) => error!(error = %e, "Engine failed, runtime stopped"),
        }
        result.map_err(RuntimeError::from)
    }

    /// Runs until Ctrl+C, SIGTERM or an engine failure.
    pub async fn run(&self) -> RuntimeResult<()> {
        #[cfg(unix)]
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .map_err(RuntimeError::Signal)?;

        let shutdown = async move {
            #[cfg(unix)]
            tokio::select! {
                result = signal::ctrl_c() => match result {
                    Ok(()) => info!("Received Ctrl+C"),
                    Err(e) => error!(error = %e, "Ctrl+C handler failed"),
                },
                _ = sigterm.recv() => info!("Received SIGTERM"),
            }

            #[cfg(not(unix))]
            match signal::ctrl_c().await {
                Ok(()) => info!("Received Ctrl+C"),
                Err(e) => error!(error = %e, "Ctrl+C handler failed"),
            }
        };

        info!("Parley is running. Press Ctrl+C to stop.");
        self.run_until(shutdown).await
    }
}

fn component_config<C: DeserializeOwned + Default>(
    name: &str,
    value: Option<&Value>,
) -> RuntimeResult<C> {
    match value {
        Some(value) => value
            .deserialize()
            .map_err(|e| RuntimeError::ComponentConfig {
                name: name.to_string(),
                reason: e.to_string(),
            }),
        None => {
            debug!(component = name, "No configuration section, using defaults");
            Ok(C::default())
        }
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Loads and validates configuration, then creates the runtime.
///
/// ```rust,ignore
/// let runtime = ParleyRuntime::builder()
///     .config_file("deploy/parley.toml")
///     .profile("production")
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    loader: ConfigLoader,
    overrides: Vec<Box<dyn FnOnce(&mut ParleyConfig)>>,
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            loader: ConfigLoader::new(),
            overrides: Vec::new(),
        }
    }

    /// Loads this file instead of searching for one.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.loader = self.loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.loader = self.loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.loader = self.loader.search_path(path);
        self
    }

    pub fn without_env(mut self) -> Self {
        self.loader = self.loader.without_env();
        self
    }

    /// Merges configuration below files and environment.
    pub fn merge(mut self, config: ParleyConfig) -> Self {
        self.loader = self.loader.merge(config);
        self
    }

    /// Applies `f` to the loaded configuration, above every other source.
    ///
    /// Command-line flags go here.
    pub fn override_with(mut self, f: impl FnOnce(&mut ParleyConfig) + 'static) -> Self {
        self.overrides.push(Box::new(f));
        self
    }

    /// Loads, overrides and validates the configuration.
    pub fn build(self) -> RuntimeResult<ParleyRuntime> {
        let mut config = self.loader.load()?;
        for apply in self.overrides {
            apply(&mut config);
        }
        validate_config(&config)?;
        Ok(ParleyRuntime::from_config(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use parley_core::{Event, TransportError};
    use parley_framework::testing::{EngineFeed, ScriptedEngine};
    use parley_framework::{Chat, HandlerResult, script};
    use tokio::sync::oneshot;

    async fn pong(chat: Chat) -> HandlerResult {
        chat.reply("pong").await?;
        Ok(())
    }

    fn ping_script() -> BoxedScript {
        script("ping", |bot: &Bot| {
            bot.command("ping").handle(pong);
            Ok(())
        })
    }

    fn broken_script() -> BoxedScript {
        script("broken", |_bot: &Bot| Err(anyhow::anyhow!("missing API key")))
    }

    fn runtime_with(config: ParleyConfig) -> (ParleyRuntime, Arc<ScriptedEngine>, EngineFeed) {
        let (engine, feed) = ScriptedEngine::new();
        let mut runtime = ParleyRuntime::from_config(config);
        let shared = engine.clone();
        runtime.register_engine_with("scripted", move || Ok(shared.clone() as BoxedEngine));
        (runtime, engine, feed)
    }

    fn scripted_config() -> ParleyConfig {
        ParleyConfig {
            engine: "scripted".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_unknown_engine_lists_available() {
        let (runtime, _engine, _feed) = runtime_with(ParleyConfig {
            engine: "irc".into(),
            ..Default::default()
        });
        let err = runtime.prepare().await.unwrap_err();
        assert_eq!(err.to_string(), "unknown engine 'irc' (available: scripted)");
    }

    #[tokio::test]
    async fn test_unknown_memory() {
        let (runtime, _engine, _feed) = runtime_with(ParleyConfig {
            memory: "redis".into(),
            ..scripted_config()
        });
        assert!(matches!(
            runtime.prepare().await,
            Err(RuntimeError::UnknownMemory { .. })
        ));
    }

    #[tokio::test]
    async fn test_malformed_component_section() {
        let mut config = scripted_config();
        config.memories.insert("dict".into(), Value::from("oops"));
        let (runtime, _engine, _feed) = runtime_with(config);

        let err = runtime.prepare().await.unwrap_err();
        assert!(matches!(err, RuntimeError::ComponentConfig { name, .. } if name == "dict"));
    }

    #[tokio::test]
    async fn test_configured_scripts_are_selected() {
        let (mut runtime, _engine, _feed) = runtime_with(ParleyConfig {
            scripts: vec!["ping".into(), "absent".into()],
            ..scripted_config()
        });
        runtime.register_scripts([broken_script(), ping_script()]);

        let bot = runtime.prepare().await.unwrap();
        assert_eq!(bot.registry().len(), 1);
    }

    #[tokio::test]
    async fn test_run_dispatches_until_shutdown() {
        let (mut runtime, engine, feed) = runtime_with(scripted_config());
        runtime.register_scripts([broken_script(), ping_script()]);

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let driver = async {
            feed.push(Event::message("ping", "U1", "C1"));
            assert!(engine.wait_for_sent(1, Duration::from_secs(2)).await);
            stop_tx.send(()).unwrap();
        };
        let shutdown = async {
            let _ = stop_rx.await;
        };

        let (result, ()) = tokio::join!(runtime.run_until(shutdown), driver);
        result.unwrap();
        assert_eq!(engine.sent_texts(), vec!["pong".to_string()]);
    }

    #[tokio::test]
    async fn test_engine_failure_ends_run() {
        let (runtime, _engine, feed) = runtime_with(scripted_config());
        feed.close();

        let result = tokio::time::timeout(
            Duration::from_secs(2),
            runtime.run_until(std::future::pending()),
        )
        .await
        .unwrap();
        assert!(matches!(
            result,
            Err(RuntimeError::Transport(TransportError::ConnectionClosed { .. }))
        ));
    }

    #[test]
    fn test_builder_overrides_win_and_are_validated() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = ParleyRuntime::builder()
            .search_path(dir.path())
            .without_env()
            .override_with(|config| config.engine = "slack".into())
            .build()
            .unwrap();
        assert_eq!(runtime.config().engine, "slack");
        assert!(runtime.memory_names().contains(&"dict"));

        let err = ParleyRuntime::builder()
            .search_path(dir.path())
            .without_env()
            .override_with(|config| config.logging.level = "loud".into())
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, RuntimeError::Config(_)));
    }
}
