//! Portfolio research REPL
//!
//! Connects to WRDS, loads CRSP daily returns for a set of tickers, samples
//! random portfolios and charts them, and answers questions about the data
//! with an LLM assistant.
//!
//! # Usage
//!
//! ```bash
//! export WRDS_USERNAME="jdoe"
//! export OPENAI_API_KEY="sk-..."
//!
//! cargo run --bin portfolio -- --trials 10000 --renderer terminal
//! ```

mod commands;
mod config;
mod observer;
mod session;

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use clap::Parser;
use portfolio_core::{FrontierSampler, PortfolioError, Result};
use portfolio_data::Credentials;
use tracing::{debug, info};

use crate::commands::Command;
use crate::config::{AppConfig, Args};
use crate::observer::ConsoleObserver;
use crate::session::{OpenAIAgentFactory, Session};

const PROMPT: &str = "portfolio> ";

enum Flow {
    Continue,
    Exit,
}

fn print_banner(config: &AppConfig) {
    println!("Portfolio research assistant");
    println!("  WRDS:      {}", config.wrds.endpoint());
    println!(
        "  Assistant: {}",
        if config.openai.is_some() {
            config.executor.model.as_str()
        } else {
            "unavailable (OPENAI_API_KEY not set)"
        }
    );
    println!("Type /help for commands.\n");
}

fn read_line(stdin: &io::Stdin, prompt: &str) -> io::Result<Option<String>> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    if stdin.lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Username from the command, the flags or a prompt; password from WRDS_PASSWORD or a prompt
fn credentials(
    stdin: &io::Stdin,
    config: &AppConfig,
    username: Option<String>,
) -> Result<Credentials> {
    let io_failure = |e: io::Error| PortfolioError::InvalidInput(e.to_string());
    let cancelled = || PortfolioError::InvalidInput("login cancelled".to_string());

    let username = match username.or_else(|| config.username.clone()) {
        Some(user) => user,
        None => read_line(stdin, "WRDS username: ")
            .map_err(io_failure)?
            .ok_or_else(cancelled)?,
    };
    let password = password(config.password.as_deref(), |prompt| {
        rpassword::prompt_password(prompt)
    })?;
    Ok(Credentials::new(username, password))
}

/// The configured password, else one read through `prompt` without echo
fn password(
    configured: Option<&str>,
    prompt: impl FnOnce(&str) -> io::Result<String>,
) -> Result<String> {
    if let Some(password) = configured {
        return Ok(password.to_string());
    }
    match prompt("WRDS password: ") {
        Ok(password) => Ok(password),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(PortfolioError::InvalidInput(
            "login cancelled".to_string(),
        )),
        Err(e) => Err(PortfolioError::InvalidInput(format!(
            "failed to read password: {e}"
        ))),
    }
}

async fn execute(
    session: &mut Session,
    command: Command,
    stdin: &io::Stdin,
    config: &AppConfig,
) -> Result<(Flow, String)> {
    let message = match command {
        Command::Connect { username } => {
            let credentials = credentials(stdin, config, username)?;
            println!("Connecting to {} ...", config.wrds.endpoint());
            session.connect(credentials).await?
        }
        Command::Fetch { tickers, start, end } => session.fetch(&tickers, &start, &end).await?,
        Command::Frontier => session.plot_frontier()?,
        Command::Sharpe => session.plot_sharpe()?,
        Command::Returns => session.plot_returns()?,
        Command::Ask { question } => session.ask(&question).await?,
        Command::Status => session.status(),
        Command::Help => Command::help_text().trim().to_string(),
        Command::Exit => return Ok((Flow::Exit, "Goodbye!".to_string())),
    };
    Ok((Flow::Continue, message))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    portfolio_utils::load_dotenv();
    let args = Args::parse();
    portfolio_utils::init_tracing(args.log_format)?;

    let config = AppConfig::from_args(args)?;
    config.validate()?;
    debug!(?config, "Configuration loaded");

    print_banner(&config);

    let factory = OpenAIAgentFactory::new(
        config.openai.clone(),
        config.executor.clone(),
        Arc::new(ConsoleObserver::stdout()),
    );
    let mut session = Session::new(
        config.wrds.clone(),
        FrontierSampler::new(config.sampler),
        config.build_renderer(),
        Box::new(factory),
    );

    info!("Session started");
    let stdin = io::stdin();
    loop {
        let input = match read_line(&stdin, PROMPT) {
            Ok(Some(input)) => input,
            Ok(None) => {
                println!("\nGoodbye!");
                break;
            }
            Err(e) => {
                eprintln!("error: failed to read input: {e}");
                continue;
            }
        };
        if input.is_empty() {
            continue;
        }

        let outcome = match Command::parse(&input) {
            Ok(command) => execute(&mut session, command, &stdin, &config).await,
            Err(e) => Err(e),
        };
        match outcome {
            Ok((Flow::Exit, message)) => {
                println!("{message}");
                break;
            }
            Ok((Flow::Continue, message)) => println!("{message}\n"),
            Err(e) => println!("error: {e}\n"),
        }
    }

    Ok(())
}
