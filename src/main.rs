//! Binary entry point: a single-user line REPL over the session router.
//!
//! The REPL is the reference transport. Lines starting with `/` are
//! commands, a bare number picks a button from the last menu, anything else
//! is freeform text for the router to interpret.

use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use tradevault::agent::{MenuButton, Router, UserEvent};
use tradevault::config::Config;
use tradevault::executor::PaperExecutor;
use tradevault::gateway::HttpPriceGateway;
use tradevault::store::RecordStore;

#[derive(Parser)]
#[command(
    name = "tradevault",
    version,
    about = "Encrypted per-user trading session agent"
)]
struct Cli {
    /// User identity this REPL session acts as.
    #[arg(long, default_value = "local")]
    user: String,

    /// Override the per-user record directory.
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Override the price gateway base URL.
    #[arg(long, value_name = "URL")]
    gateway_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tradevault=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::resolve().context("resolving configuration")?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(url) = cli.gateway_url {
        config.gateway_base_url = url;
    }
    tracing::info!(
        data_dir = %config.data_dir.display(),
        gateway = %config.gateway_base_url,
        gateway_timeout_ms = config.gateway_timeout.as_millis() as u64,
        master_key_source = "env",
        "starting tradevault"
    );

    let store = Arc::new(
        RecordStore::open(&config.data_dir, config.master_key).context("opening record store")?,
    );
    let gateway = Arc::new(
        HttpPriceGateway::new(config.gateway_base_url, config.gateway_timeout)
            .context("building price gateway")?,
    );
    let executor = Arc::new(PaperExecutor::new(gateway.clone()));
    let router = Router::new(store, gateway, executor);

    run_repl(&router, &cli.user).await
}

async fn run_repl(router: &Router, user: &str) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_menu: Vec<MenuButton> = Vec::new();

    println!("tradevault session for '{user}'. Type /help, or 'quit' to leave.");
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }

        let event = if line.starts_with('/') {
            UserEvent::Command(line)
        } else if let Some(button) = menu_pick(&last_menu, &line) {
            UserEvent::Action(button.action.clone())
        } else {
            UserEvent::Text(line)
        };

        let reply = router.handle(user, event).await;
        println!("{}", reply.text);
        for (i, button) in reply.menu.iter().enumerate() {
            println!("  [{}] {}", i + 1, button.label);
        }
        last_menu = reply.menu;
    }
    Ok(())
}

/// A bare 1-based index into the last rendered menu, if the input is one.
fn menu_pick<'a>(menu: &'a [MenuButton], input: &str) -> Option<&'a MenuButton> {
    let index = input.parse::<usize>().ok()?;
    menu.get(index.checked_sub(1)?)
}
