mod api;
mod chat;
mod cli;
mod config;
mod error;
mod error_ext;
mod repl;
mod session;
mod ui;

use api::HttpSessionClient;
use clap::Parser;
use cli::Cli;
use colored::Colorize;
use error::Result;
use repl::Repl;
use std::env;
use ui::UI;

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    if let Err(e) = run(cli) {
        UI::print_error_with_hint(&e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let token = match cli.get_token() {
        Ok(token) => token,
        Err(e) => {
            UI::print_error(&e);
            eprintln!();
            eprintln!("Please set your session token:");
            eprintln!("  export CONCIERGE_TOKEN='your-token'");
            eprintln!("Or use the --token flag:");
            eprintln!("  concierge --token 'your-token'");
            std::process::exit(1);
        }
    };

    let workspace = env::current_dir().map_err(|e| {
        error::ChatError::Config(format!("Failed to get current directory: {}", e))
    })?;

    let mut config = config::load_config(&workspace)?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }

    println!("{} {}", "Backend:".bright_cyan(), config.base_url.dimmed());

    let client = HttpSessionClient::new(&config.base_url, &token)?;
    let mut repl = Repl::new(client, &config)?;

    if let Err(e) = repl.refresh_sessions() {
        UI::print_warning(&format!("Could not load your chats: {}", e));
    }
    println!();

    if cli.resume {
        repl.resume()?;
        println!();
    } else if let Some(id) = cli.session {
        repl.open_by_id(id)?;
    }

    if let Some(prompt) = cli.prompt {
        repl.process_single_prompt(&prompt)?;
    } else {
        repl.run()?;
    }

    Ok(())
}
