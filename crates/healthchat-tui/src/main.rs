use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tracing_subscriber::EnvFilter;

use healthchat_core::{
    ChatRole, Config, ConfigUpdate, ConversationEngine, ReplyClient, SymptomClient,
};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

const LOG_ENV: &str = "HEALTHCHAT_LOG";

#[derive(Parser)]
#[command(name = "healthchat")]
#[command(about = "Chat with an AI health consultant from the terminal")]
struct Cli {
    /// Reply service URL (overrides the config file and HEALTHCHAT_REPLY_URL)
    #[arg(long, global = true)]
    endpoint: Option<String>,
    /// Milliseconds between revealed characters
    #[arg(long, global = true)]
    delay_ms: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive chat (default)
    Chat,
    /// Ask a single question and print the reply
    Ask {
        /// Your question
        #[arg(required = true)]
        question: Vec<String>,
    },
    /// Predict likely conditions from a list of symptoms
    Predict {
        /// Symptoms, e.g. itching skin_rash
        #[arg(required = true)]
        symptoms: Vec<String>,
    },
    /// Show the config file location and resolved settings, optionally saving new ones
    Config {
        /// Store a reply service URL
        #[arg(long)]
        set_reply_endpoint: Option<String>,
        /// Store a prediction service URL
        #[arg(long)]
        set_predict_endpoint: Option<String>,
        /// Store the milliseconds between revealed characters
        #[arg(long)]
        set_delay_ms: Option<u64>,
        /// Store the reply request timeout in seconds
        #[arg(long)]
        set_timeout_secs: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Chat);

    init_logging(matches!(command, Commands::Chat))?;

    if let Commands::Config {
        set_reply_endpoint,
        set_predict_endpoint,
        set_delay_ms,
        set_timeout_secs,
    } = &command
    {
        let update = ConfigUpdate {
            reply_endpoint: set_reply_endpoint.clone(),
            predict_endpoint: set_predict_endpoint.clone(),
            reveal_delay_ms: *set_delay_ms,
            fetch_timeout_secs: *set_timeout_secs,
        };
        if !update.is_empty() {
            // Setters edit the stored file; a broken file is an error here
            let mut config = Config::load()?;
            if config.apply(update) {
                config.save()?;
                println!("{}", "Configuration saved".green());
            }
        }
    }

    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        Config::new()
    });

    let mut settings = config.engine_settings();
    if let Some(delay_ms) = cli.delay_ms {
        settings.reveal_delay = Duration::from_millis(delay_ms);
    }
    let endpoint = cli.endpoint.unwrap_or_else(|| config.reply_endpoint());
    tracing::info!(%endpoint, "using reply service");

    let engine = ConversationEngine::new(Arc::new(ReplyClient::new(&endpoint)), settings);

    match command {
        Commands::Chat => run_chat(engine).await,
        Commands::Ask { question } => ask(engine, &question.join(" ")).await,
        Commands::Predict { symptoms } => predict(&config.predict_endpoint(), &symptoms).await,
        Commands::Config { .. } => show_config(&config, &endpoint),
    }
}

/// The chat owns the terminal, so its logs go to a file next to the config
fn init_logging(to_file: bool) -> Result<()> {
    if to_file {
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
        let log_dir = Config::config_dir()?;
        fs::create_dir_all(&log_dir)?;
        let log_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_dir.join("healthchat.log"))?;

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(log_file))
            .init();
    } else {
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }
    Ok(())
}

async fn run_chat(engine: ConversationEngine) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = run_loop(&mut terminal, App::new(engine)).await;

    tui::restore()?;
    result
}

async fn run_loop(terminal: &mut Tui, mut app: App) -> Result<()> {
    let mut events = EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        tokio::select! {
            Some(event) = events.next() => handler::handle_event(&mut app, event),
            Some(step) = app.engine.next_step() => app.apply_step(step),
            else => break,
        }

        app.sync_scroll();
    }

    Ok(())
}

/// Print the reply as it is revealed
async fn ask(mut engine: ConversationEngine, question: &str) -> Result<()> {
    if engine.submit(question).is_none() {
        bail!("Question is empty");
    }

    let mut stdout = io::stdout();
    let mut printed = 0;

    println!("{} {}", "You:".bold().cyan(), question.trim());
    print!("{} ", "AI:".bold().magenta());
    stdout.flush()?;

    while engine.is_busy() {
        let Some(step) = engine.next_step().await else {
            break;
        };
        if !engine.apply(step) {
            continue;
        }
        if let Some(entry) = engine
            .entries()
            .last()
            .filter(|entry| entry.role == ChatRole::Assistant)
        {
            let fresh: String = entry.text.chars().skip(printed).collect();
            printed += fresh.chars().count();
            print!("{}", fresh);
            stdout.flush()?;
        }
    }
    println!();

    Ok(())
}

async fn predict(endpoint: &str, symptoms: &[String]) -> Result<()> {
    let client = SymptomClient::new(endpoint);

    println!("🔍 Checking symptoms: {}", symptoms.join(", ").bold().cyan());

    let predictions = match client.predict(symptoms).await {
        Ok(predictions) => predictions,
        Err(e) => {
            println!("{}: {}", "Error querying prediction service".red(), e);
            return Err(e);
        }
    };

    if predictions.is_empty() {
        println!("{}", "No predictions returned".yellow());
        return Ok(());
    }

    for (i, prediction) in predictions.iter().enumerate() {
        println!(
            "\n{}. {} ({})",
            (i + 1).to_string().bold().blue(),
            prediction.name.bold().yellow(),
            format!("{:.1}%", prediction.confidence * 100.0).dimmed()
        );
        println!("   {}", prediction.description);
        for precaution in &prediction.precautions {
            println!("   • {}", precaution);
        }
    }

    println!("\n{}", "This is not a diagnosis. Consult a medical professional.".dimmed());
    Ok(())
}

fn show_config(config: &Config, endpoint: &str) -> Result<()> {
    let settings = config.engine_settings();

    println!("{} {}", "Config file:".bold(), Config::get_config_path()?.display());
    println!("{} {}", "Reply endpoint:".bold(), endpoint.green());
    println!("{} {}", "Predict endpoint:".bold(), config.predict_endpoint().green());
    println!("{} {:?}", "Reveal delay:".bold(), settings.reveal_delay);
    println!("{} {:?}", "Fetch timeout:".bold(), settings.fetch_timeout);
    Ok(())
}
