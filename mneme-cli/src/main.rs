//! Mneme CLI - chat, inspect, and compare memory policies

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use mneme_core::prelude::*;

#[derive(Parser)]
#[command(name = "mneme")]
#[command(about = "Context-window memory engine CLI", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to a configuration file (defaults to mneme.toml + MNEME_* env)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat with persistent memory
    Chat {
        /// Session name (a timestamped name is generated when omitted)
        #[arg(short, long)]
        session: Option<String>,

        /// Override the configured policy (stuffing, trimming, summarization)
        #[arg(short, long)]
        policy: Option<String>,
    },
    /// List stored sessions
    Sessions,
    /// Show messages from a session
    Show {
        /// Session id
        session: String,

        /// Only show the last N messages
        #[arg(long)]
        last: Option<usize>,
    },
    /// Run the same questions under all three policies and compare cost
    Compare {
        /// File with one question per line
        #[arg(short, long)]
        questions: PathBuf,

        /// Prefix for the per-policy session ids
        #[arg(long, default_value = "compare")]
        session_prefix: String,
    },
    /// Version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => MnemeConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => MnemeConfig::load().context("loading configuration")?,
    };

    match cli.command {
        Commands::Version => {
            println!("mneme {}", env!("CARGO_PKG_VERSION"));
            println!("mneme-core {}", mneme_core::VERSION);
        }
        Commands::Sessions => {
            let store = build_store(&config).await?;
            let sessions = store.list_sessions().await?;
            if sessions.is_empty() {
                println!("No stored sessions.");
            } else {
                for id in sessions {
                    println!("{id}");
                }
            }
        }
        Commands::Show { session, last } => {
            let store = build_store(&config).await?;
            show_session(store.as_ref(), &session, last).await?;
        }
        Commands::Chat { session, policy } => {
            run_chat(&config, session, policy).await?;
        }
        Commands::Compare {
            questions,
            session_prefix,
        } => {
            run_compare(&config, &questions, &session_prefix).await?;
        }
    }

    Ok(())
}

async fn build_store(config: &MnemeConfig) -> Result<Arc<dyn ConversationStore>> {
    Ok(match &config.store {
        StoreConfig::Memory => Arc::new(InMemoryStore::new()),
        StoreConfig::Sqlite { db_path } => Arc::new(SqliteStore::open(db_path).await?),
    })
}

fn build_provider(config: &MnemeConfig) -> Result<Arc<dyn LLMProvider>> {
    match &config.llm {
        Some(llm) => Ok(LLMProviderFactory::create(llm)?),
        // No provider configured: default to Groq via environment
        None => Ok(Arc::new(GroqProvider::from_env(None::<String>)?)),
    }
}

fn resolve_policy(config: &MnemeConfig, override_name: Option<&str>) -> Result<MemoryPolicy> {
    let policy = match override_name {
        Some(name) => {
            let mut policy_config = config.policy.clone();
            policy_config.active = name.to_string();
            policy_config.to_policy()?
        }
        None => config.policy.to_policy()?,
    };
    Ok(policy)
}

async fn show_session(
    store: &dyn ConversationStore,
    session_id: &str,
    last: Option<usize>,
) -> Result<()> {
    let mut messages = store.full_history(session_id).await?;

    if messages.is_empty() {
        println!("No messages found in session: {session_id}");
        return Ok(());
    }

    println!("Messages in session: {session_id}");
    if let Some(n) = last {
        if messages.len() > n {
            println!("Showing last {n} of {} messages:", messages.len());
            messages = messages.split_off(messages.len() - n);
        } else {
            println!("Total messages: {}", messages.len());
        }
    } else {
        println!("Total messages: {}", messages.len());
    }
    println!("{}", "-".repeat(50));

    for message in &messages {
        let mut content = message.content.trim().to_string();
        if content.chars().count() > 200 {
            content = content.chars().take(200).collect();
            content.push_str("...");
        }
        println!("{:3}. {}: {}", message.sequence, message.role.label(), content);
    }

    Ok(())
}

async fn run_chat(
    config: &MnemeConfig,
    session_name: Option<String>,
    policy_override: Option<String>,
) -> Result<()> {
    let store = build_store(config).await?;
    let llm = build_provider(config)?;
    let policy = resolve_policy(config, policy_override.as_deref())?;

    let session_id = session_name.unwrap_or_else(generate_session_id);

    let session = ConversationSession::builder(session_id.clone(), store.clone(), llm)
        .policy(policy)
        .system_prompt(config.session.system_prompt.clone())
        .request_timeout(config.session.request_timeout)
        .summarizer_timeout(config.session.summarizer_timeout)
        .build()?;

    let existing = session.start().await?;
    if existing > 0 {
        println!("Loaded existing session '{session_id}' with {existing} messages");
    } else {
        println!("Started new session '{session_id}'");
    }

    println!("Chatting with policy: {}", policy.name());
    println!("Commands: 'quit', 'sessions', 'history', 'view <session>'");
    println!("{}", "-".repeat(40));

    let stdin = std::io::stdin();
    loop {
        print!("\nYou: ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();

        if input.is_empty() {
            continue;
        }

        match input {
            "quit" => break,
            "sessions" => {
                let sessions = store.list_sessions().await?;
                println!(
                    "All sessions: {}",
                    if sessions.is_empty() {
                        "None".to_string()
                    } else {
                        sessions.join(", ")
                    }
                );
            }
            "history" => {
                show_session(store.as_ref(), &session_id, None).await?;
            }
            _ => {
                if let Some(other) = input.strip_prefix("view ") {
                    show_session(store.as_ref(), other.trim(), Some(10)).await?;
                    continue;
                }

                match session.ask(input).await {
                    Ok(response) => println!("AI: {response}"),
                    Err(err) => eprintln!("Error: {err}"),
                }
            }
        }
    }

    session.close().await;
    println!("Goodbye!");
    Ok(())
}

async fn run_compare(
    config: &MnemeConfig,
    questions_path: &PathBuf,
    session_prefix: &str,
) -> Result<()> {
    let questions: Vec<String> = std::fs::read_to_string(questions_path)
        .with_context(|| format!("reading questions from {}", questions_path.display()))?
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();

    if questions.is_empty() {
        anyhow::bail!("no questions found in {}", questions_path.display());
    }

    let store = build_store(config).await?;
    let llm = build_provider(config)?;
    let metrics = Arc::new(MetricsRecorder::new());
    let accountant = TokenAccountant::new();

    println!(
        "Running comparison: {} questions x 3 policies ({} counting)",
        questions.len(),
        accountant.mode().as_str()
    );

    let policies = ["stuffing", "trimming", "summarization"];
    let run_id = uuid::Uuid::new_v4().simple().to_string();

    for name in policies {
        let policy = resolve_policy(config, Some(name))?;
        let session_id = format!("{session_prefix}-{name}-{run_id}");

        let session = ConversationSession::builder(session_id.clone(), store.clone(), llm.clone())
            .policy(policy)
            .system_prompt(config.session.system_prompt.clone())
            .accountant(accountant.clone())
            .metrics(metrics.clone())
            .request_timeout(config.session.request_timeout)
            .summarizer_timeout(config.session.summarizer_timeout)
            .build()?;

        session.start().await?;

        println!("\nPolicy: {name}");
        for (i, question) in questions.iter().enumerate() {
            session.ask(question).await?;
            if (i + 1) % 5 == 0 {
                let turns = metrics.turns(&session_id, name).await;
                let latest = turns.last().map(|t| t.prompt_tokens).unwrap_or(0);
                println!("  {} questions done, current prompt: {} tokens", i + 1, latest);
            }
        }

        // Final-prompt rendering for inspection
        let view = session.preview(questions.last().unwrap()).await?;
        println!(
            "  final view: {} messages{}",
            view.messages.len(),
            if view.summarized { " (summarized)" } else { "" }
        );
        tracing::debug!(
            "final prompt for {name}:\n{}",
            render_transcript(&view.messages)
        );

        session.close().await;
    }

    println!("\nComparison results:");
    println!(
        "{:<15} {:>15} {:>17} {:>13}",
        "Policy", "Prompt tokens", "Response tokens", "Total"
    );
    for name in policies {
        let totals = metrics.totals(name).await;
        println!(
            "{:<15} {:>15} {:>17} {:>13}",
            name, totals.prompt_tokens, totals.response_tokens, totals.total
        );
    }

    for name in ["trimming", "summarization"] {
        let savings = metrics.savings("stuffing", name).await;
        println!("{name} vs stuffing: {savings:.1}% token savings");
    }

    Ok(())
}
