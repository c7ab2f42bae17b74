//! quill - conversational coding agent CLI

mod config;
mod prompts;
mod sandbox;
mod session;
mod skills;
mod state;
mod tools;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use clap::Parser;

use quill_agent::{ConversationBuffer, TurnEngine};
use quill_ai::OpenAiCompatClient;

use crate::config::Config;
use crate::sandbox::Sandbox;
use crate::session::{RESTART_EXIT_CODE, Session, SessionExit};
use crate::skills::SkillCatalogue;
use crate::state::StateStore;

/// quill - conversational coding agent
#[derive(Parser, Debug)]
#[command(name = "quill")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Model to use (overrides config)
    #[arg(short, long)]
    model: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint (overrides config)
    #[arg(long)]
    base_url: Option<String>,

    /// Enable voice output for the speak tool
    #[arg(long)]
    voice: bool,

    /// Working directory
    #[arg(short, long)]
    working_dir: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Write a default config file and exit
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("quill=debug")
            .init();
    }

    if args.init_config {
        let config = Config::default();
        match config.save() {
            Ok(()) => {
                println!("Config file created at: {}", Config::config_path().display());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    if let Some(ref dir) = args.working_dir {
        std::env::set_current_dir(dir)?;
    }

    // CLI args take precedence over the config file
    let mut config = Config::load();
    if let Some(model) = args.model {
        config.model = model;
    }
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }
    if args.voice {
        config.voice = true;
    }

    let Some(api_key) = config.api_key() else {
        eprintln!("Error: no API key found");
        eprintln!("Set your API key with: export {}=your-key", config.api_key_env);
        eprintln!("Or point api_key_env at a different variable: quill --init-config");
        std::process::exit(1);
    };

    let root = std::env::current_dir()?;
    let sandbox = Sandbox::new(&root);
    let store = StateStore::new(&root);
    let catalogue = Arc::new(SkillCatalogue::load(Path::new(&config.skills_dir)));
    let restart_flag = Arc::new(AtomicBool::new(false));

    let system_prompt = prompts::build_system_prompt(&root, &config, &catalogue);
    let buffer = ConversationBuffer::new(system_prompt);

    let client = Arc::new(OpenAiCompatClient::new(
        api_key,
        config.base_url.clone(),
        config.model.clone(),
        config.max_tokens,
    ));
    let registry = tools::build_registry(
        &sandbox,
        &store,
        catalogue,
        restart_flag.clone(),
        root.join(&config.prompts_dir),
        config.voice,
    );
    let engine = TurnEngine::new(client, registry);

    println!("quill ({}) in {}", config.model, root.display());
    println!("Type /quit to exit, /reset to clear, /compact to summarize.");
    println!();

    let mut session = Session::new(engine, buffer, store, config, restart_flag);
    match session.run().await? {
        SessionExit::Quit => Ok(()),
        SessionExit::Restart => std::process::exit(RESTART_EXIT_CODE),
    }
}
