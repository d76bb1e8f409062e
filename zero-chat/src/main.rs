//! Zero Chat - Main entry point.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use zero_chat::{cli, ChatService, CompatibleProvider, Dispatcher};
use zero_common::config::Config;
use zero_common::logging::init_logging;

const CHANNEL_CAPACITY: usize = 64;

/// Chat bot that answers mentions, commands and the occasional group message.
#[derive(Parser, Debug)]
#[command(name = "zero-chat")]
#[command(author = "theonlyhennygod")]
#[command(version)]
#[command(about = "Conversational reply engine over stdin/stdout.", long_about = None)]
struct Cli {
    /// Path to the config file (default: ~/.codecoder/chat.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Log output format: pretty or json
    #[arg(long)]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let mut config = Config::load_and_validate(args.config.as_deref())?;
    if args.verbose {
        config.observability.verbose = true;
    }
    if let Some(format) = args.log_format {
        config.observability.log_format = format;
    }

    init_logging(
        config.observability.effective_log_level(),
        &config.observability.log_format,
    );

    tracing::info!("Zero Chat v{}", env!("CARGO_PKG_VERSION"));

    let provider = CompatibleProvider::from_config(&config.completion, config.proxy.as_ref())
        .context("Failed to create completion provider")?;
    tracing::info!(
        endpoint = provider.api_url(),
        model = %config.completion.model,
        max_messages = config.session.max_messages,
        "Completion provider ready"
    );

    let service = Arc::new(ChatService::new(&config, Arc::new(provider)));

    let (inbound_tx, inbound_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (reply_tx, reply_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let dispatcher = Dispatcher::new(service, reply_tx);

    let listener = tokio::spawn(cli::listen(inbound_tx));
    let printer = tokio::spawn(cli::print_replies(reply_rx));

    tokio::select! {
        () = dispatcher.run(inbound_rx) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, shutting down");
            listener.abort();
        }
    }

    match listener.await {
        Ok(result) => result?,
        Err(e) if e.is_cancelled() => {}
        Err(e) => return Err(e.into()),
    }

    // Workers exit once their queues close; the printer drains what they sent.
    drop(dispatcher);
    printer.await??;
    Ok(())
}
