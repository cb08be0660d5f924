//! Parley Bot
//!
//! A sample bot showing commands, memory, reactions, conversations and
//! schedules.
//!
//! # Usage
//!
//! ```bash
//! # Talk to it in the terminal
//! cargo run --package parley-bot
//!
//! # Run on Slack with the remote memory store and only two scripts
//! SLACK_TOKEN=xoxb-... cargo run --package parley-bot -- -e slack -m http -S lunch -S help
//! ```

mod scripts;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use parley::prelude::*;

#[derive(Debug, Parser)]
#[command(name = "parley-bot", version, about = "A sample Parley chat bot")]
struct Cli {
    /// Configuration file (default: search for parley.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Engine to run: cli or slack
    #[arg(short, long)]
    engine: Option<String>,

    /// Memory backend: dict or http
    #[arg(short, long)]
    memory: Option<String>,

    /// Script to load; repeat for several (default: all)
    #[arg(short = 'S', long = "scripts")]
    scripts: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let Cli {
        config,
        engine,
        memory,
        scripts,
    } = Cli::parse();

    let mut builder = ParleyRuntime::builder();
    if let Some(path) = config {
        builder = builder.config_file(path);
    }
    let builder = builder.override_with(move |config| {
        if let Some(engine) = engine {
            config.engine = engine;
        }
        if let Some(memory) = memory {
            config.memory = memory;
        }
        if !scripts.is_empty() {
            config.scripts = scripts;
        }
    });

    let mut runtime = builder.build()?;
    runtime
        .register_engine::<ConsoleEngine>()
        .register_engine::<SlackEngine>()
        .register_scripts(scripts::all())
        .register_script(slack_script());

    runtime.run().await?;
    Ok(())
}
