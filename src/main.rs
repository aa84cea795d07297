use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use tracing::info;

mod api;
mod app;
mod config;
mod handler;
mod logging;
mod tui;
mod ui;

use api::ApiClient;
use app::{describe_error, validate_submission, App};
use config::Config;

#[derive(Parser)]
#[command(name = "workspace-ask")]
#[command(about = "Ask questions against chat workspaces on a remote LLM backend")]
#[command(version)]
struct Cli {
    /// API base URL (overrides BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// API bearer token (overrides CHAVE_API)
    #[arg(long, global = true)]
    api_key: Option<String>,
    /// Directory for log files
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available workspaces
    Workspaces,
    /// Ask a single question and print the answer
    Ask {
        /// Workspace name
        workspace: String,
        /// Your question
        question: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; real environment variables win over it
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let _log_guard = logging::init(cli.log_dir.as_deref())?;

    let config = Config::from_env().with_overrides(cli.base_url, cli.api_key);
    info!(?config, "starting");

    match cli.command {
        None => run_tui(config).await,
        Some(Commands::Workspaces) => list_workspaces(config).await,
        Some(Commands::Ask { workspace, question }) => ask(config, &workspace, &question).await,
    }
}

async fn run_tui(config: Config) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let mut app = App::new(config);
    app.refresh_workspaces();

    let result = event_loop(&mut terminal, &mut app).await;

    tui::restore()?;
    info!("exiting");
    result
}

async fn event_loop(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    let mut events = tui::EventHandler::new(tui::TICK_RATE);

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }
        app.poll_tasks().await;
    }
    Ok(())
}

async fn list_workspaces(config: Config) -> Result<()> {
    let client = ApiClient::new(config);

    println!("\n{}", "Available Workspaces".bold().blue());
    println!("{}", "=".repeat(30).dimmed());

    match client.list_workspaces().await {
        Ok(workspaces) => {
            if workspaces.is_empty() {
                println!("{}", "No workspaces found.".yellow());
            }
            for workspace in workspaces {
                println!("  • {}", workspace.name().green());
            }
        }
        Err(e) => println!("{}", describe_error(&e).red()),
    }

    Ok(())
}

async fn ask(config: Config, workspace: &str, question: &str) -> Result<()> {
    let workspace = match validate_submission(question, Some(workspace).filter(|w| !w.is_empty())) {
        Ok(workspace) => workspace,
        Err(e) => {
            println!("{}", e.to_string().yellow());
            return Ok(());
        }
    };

    let client = ApiClient::new(config);
    println!("Asking {}...\n", workspace.bold().magenta());

    match client.ask(workspace, question).await {
        Ok(response) => {
            println!("{}", "Response:".bold().green());
            println!("{}", response.text_or_fallback());
        }
        Err(e) => println!("{}", describe_error(&e).red()),
    }

    Ok(())
}
