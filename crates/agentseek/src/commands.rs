//! agentseek command implementations

use anyhow::{Context, Result};
use std::io::Write;
use std::sync::Arc;
use tracing::{info, warn};

use agentseek_agent::trading::MarketClient;
use agentseek_agent::{
    AgentFactory, AgentRole, FixedRouter, Interaction, QueryAnswer, QueryOutcome, StdinConfirmer,
};
use agentseek_config::paths::ensure_dir;
use agentseek_config::{self, Config};
use agentseek_memory::MemoryStore;
use agentseek_provider::OpenAiProvider;

/// Write the default config and create the data directories
pub async fn init_command() -> Result<()> {
    println!("◆ Initializing agentseek...");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = agentseek_config::init()
        .await
        .context("Failed to initialize configuration")?;

    for dir in [agentseek_config::prompts_dir(), agentseek_config::memory_dir()] {
        ensure_dir(&dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    println!("Config:    {}", agentseek_config::config_path().display());
    println!("Work dir:  {}", config.work_dir().display());
    println!("\n◆ agentseek initialized");
    println!("\nNext steps:");
    println!("  1. Add your API key to the config or set OPENAI_API_KEY");
    println!("  2. Start chatting: agentseek engage -m \"Hello!\"");

    Ok(())
}

fn print_answer(answer: &QueryAnswer) {
    if let Some(reasoning) = &answer.reasoning {
        println!("\n◆ {} reasoning:\n{}", answer.agent, reasoning);
    }
    println!("\n◆ {}: {}", answer.agent, answer.answer);
}

/// Build the agent session from config
async fn build_interaction(config: Config, agent: Option<String>) -> Result<Interaction> {
    let api_key = config
        .api_key()
        .context("No API key configured. Set provider.api_key or OPENAI_API_KEY")?;
    let provider = OpenAiProvider::new(
        api_key,
        config.provider.api_base.clone(),
        Some(config.provider.model.clone()),
    );

    let save_session = config.agent.save_session;
    let recover = config.agent.recover_last_session;

    let prompts = agentseek_config::prompts_dir();
    let mut factory = AgentFactory::new(Arc::new(provider), config, Arc::new(StdinConfirmer));
    if prompts.is_dir() {
        factory = factory.with_prompt_dir(prompts);
    }

    let mut interaction = Interaction::new(factory.roster()?)?;

    if let Some(name) = agent {
        let role: AgentRole = name.parse().map_err(anyhow::Error::msg)?;
        interaction = interaction.with_router(FixedRouter(role));
    }

    if save_session || recover {
        let store = MemoryStore::new(agentseek_config::memory_dir());
        interaction = interaction.with_store(store, save_session);
        if recover {
            let restored = interaction.recover_sessions().await;
            info!("◆ restored {} saved sessions", restored);
        }
    }

    Ok(interaction)
}

/// Talk to the agents, once or interactively
pub async fn engage_command(message: Option<String>, agent: Option<String>) -> Result<()> {
    let config = Config::load().await?;
    let interaction = build_interaction(config, agent).await?;

    if let Some(msg) = message {
        match interaction.think(&msg).await {
            QueryOutcome::Answered(answer) => {
                print_answer(&answer);
                if !answer.success {
                    anyhow::bail!("{} did not complete the request", answer.agent);
                }
            }
            QueryOutcome::Busy => anyhow::bail!("Session is busy"),
        }
        return Ok(());
    }

    println!("◆ Interactive mode (type 'exit' to quit)");
    println!("◆ Agents: {}", interaction.agent_names().join(", "));
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    loop {
        print!("◆ ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        if std::io::stdin().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        if input == "exit" || input == "quit" {
            break;
        }

        match interaction.think(input).await {
            QueryOutcome::Answered(answer) => {
                print_answer(&answer);
                println!();
            }
            QueryOutcome::Busy => warn!("◆ still working on the previous request"),
        }
    }

    Ok(())
}

/// Print the moving-average signal for a symbol
pub async fn signal_command(symbol: String) -> Result<()> {
    let config = Config::load().await?;
    let client = MarketClient::from_config(&config);
    let symbol = symbol.to_uppercase();

    let report = client
        .analyze(&symbol)
        .await
        .with_context(|| format!("Failed to compute signal for {}", symbol))?;

    println!("◆ {}", symbol);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Price:   {} USDT", report.price);
    println!("Average: {:.4} USDT", report.average);
    println!("Signal:  {}", report.signal);

    Ok(())
}

fn flag(set: bool) -> &'static str {
    if set {
        "[Set]"
    } else {
        "[Missing]"
    }
}

fn presence(path: &std::path::Path) -> &'static str {
    if path.exists() {
        "[OK]"
    } else {
        "[Missing]"
    }
}

/// Show configuration status
pub async fn status_command() -> Result<()> {
    let config_path = agentseek_config::config_path();
    let config = Config::load().await?;
    let work_dir = config.work_dir();

    println!("◆ agentseek Status");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!("Config:    {} {}", config_path.display(), presence(&config_path));
    println!("Work dir:  {} {}", work_dir.display(), presence(&work_dir));
    println!("Model:     {}", config.provider.model);
    println!("API Key:   {}", flag(config.has_api_key()));

    let (key, secret) = config.trading_credentials();
    println!("Binance:   {}", flag(key.is_some() && secret.is_some()));
    println!("Search:    {}", flag(config.searxng_url().is_some()));
    println!("Flights:   {}", flag(config.flight_api_key().is_some()));
    println!(
        "Safety:    {}",
        if config.agent.safety { "On" } else { "Off" }
    );

    println!("\n◆ Ready");

    Ok(())
}
