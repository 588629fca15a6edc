//! Spectre CLI - terminal chat loop over the engine.
//!
//! The transcript owns stdout; logs go to `~/.spectre/logs/spectre.log`.
//! Ctrl-C during a turn cancels the in-flight model request (a tool call
//! that has already started still runs to completion).

mod markdown;

use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Result;
use crossterm::style::Stylize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use spectre_engine::{Session, SpectreConfig, TurnEvent};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::try_new("warn").expect("warn filter is valid"));

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && fs::create_dir_all(parent).is_err()
        {
            continue;
        }
        if let Ok(file) = OpenOptions::new().create(true).append(true).open(&candidate) {
            tracing_subscriber::registry()
                .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                .with(env_filter)
                .init();
            tracing::info!(path = %candidate.display(), "logging initialized");
            return;
        }
    }

    // No writable log location: prefer silence over corrupting the
    // transcript on stdout.
    tracing_subscriber::registry().with(env_filter).init();
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.spectre/logs/spectre.log, next to the config file.
    if let Some(config_path) = SpectreConfig::path()
        && let Some(config_dir) = config_path.parent()
    {
        candidates.push(config_dir.join("logs").join("spectre.log"));
    }

    // Fallback: ./.spectre/logs/spectre.log for constrained environments.
    candidates.push(PathBuf::from(".spectre").join("logs").join("spectre.log"));

    candidates
}

fn print_banner(session: &Session) {
    println!("{}", "SPECTRE".magenta().bold());
    println!(
        "{}",
        format!(
            "model {} via {} | {} tools | /help for commands",
            session.settings().api.model,
            session.settings().api.base_url,
            session.tool_definitions().len()
        )
        .dark_grey()
    );
    println!();
}

fn print_help() {
    println!("  /help   show this help");
    println!("  /tools  list the available tools");
    println!("  /clear  start a fresh conversation");
    println!("  /quit   exit");
    println!();
}

fn print_tools(session: &Session) {
    for def in session.tool_definitions() {
        println!("  {}  {}", def.name.clone().cyan(), def.description);
    }
    println!();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let settings = match SpectreConfig::load() {
        Ok(Some(config)) => config.into_settings(),
        Ok(None) => SpectreConfig::default().into_settings(),
        Err(err) => {
            eprintln!("{} {err}", "config error:".red());
            tracing::error!(%err, "falling back to default configuration");
            SpectreConfig::default().into_settings()
        }
    };

    let mut session = Session::new(settings)?;
    print_banner(&session);

    if let Err(err) = spectre_providers::test_connection(&session.settings().api).await {
        println!(
            "{}",
            format!(
                "warning: {} is not answering ({err}); requests will fail until it does",
                session.settings().api.base_url
            )
            .yellow()
        );
        println!();
    }

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", "you ❯".green().bold());
        std::io::stdout().flush()?;

        let Some(line) = input.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line {
            "/quit" | "/exit" => break,
            "/help" => {
                print_help();
                continue;
            }
            "/tools" => {
                print_tools(&session);
                continue;
            }
            "/clear" => {
                session.clear();
                println!("{}", "conversation cleared".dark_grey());
                println!();
                continue;
            }
            _ => {}
        }

        let turn = session.run_turn(line, |event| match event {
            TurnEvent::ToolStarted { name } => {
                println!("{}", format!("  ⚙ {name}").dark_grey());
            }
            TurnEvent::ToolFinished { name, is_error } => {
                if is_error {
                    println!("{}", format!("  ✗ {name} failed").dark_yellow());
                }
            }
        });
        tokio::pin!(turn);

        tokio::select! {
            outcome = &mut turn => match outcome {
                Ok(outcome) => {
                    println!();
                    println!("{}", markdown::render(&outcome.reply));
                    if outcome.hit_iteration_cap {
                        println!("{}", "(tool iteration limit reached)".dark_yellow());
                    }
                    println!();
                }
                Err(err) => {
                    tracing::error!(%err, "turn failed");
                    println!("{} {err:#}", "error:".red());
                    println!();
                }
            },
            _ = tokio::signal::ctrl_c() => {
                println!();
                println!("{}", "cancelled".dark_yellow());
                println!();
            }
        }
    }

    Ok(())
}
