mod client;
mod input;
mod markdown;
mod protocol;
mod session;
mod transcript;
mod ui;
mod widget;

use clap::Parser;
use client::ChatClient;
use markdown::TerminalMarkdown;
use session::SessionId;
use std::path::PathBuf;
use std::sync::Arc;
use transcript::{Transcript, Welcome};
use widget::ChatWidget;

const DEFAULT_QUICK_REPLIES: [&str; 3] = [
    "Hi there!",
    "What services do you offer?",
    "I want to get started",
];

#[derive(Parser)]
#[command(version, about = "Terminal chat client for a JSON chat endpoint")]
struct Args {
    /// Chat endpoint receiving `{"message", "session_id"}` posts.
    #[arg(
        long,
        env = "PARLEY_ENDPOINT",
        default_value = "http://localhost:8000/api/chat"
    )]
    endpoint: String,

    /// Canned message sent with F1..F9. Repeat for more than one.
    #[arg(
        long = "quick-reply",
        value_name = "TEXT",
        env = "PARLEY_QUICK_REPLIES",
        value_delimiter = ','
    )]
    quick_replies: Vec<String>,

    #[arg(long, env = "PARLEY_LOG_FILE", default_value = "parley.log")]
    log_file: PathBuf,

    /// Log at debug level.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // The terminal belongs to the UI, so logs go to a file.
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&args.log_file)?;
    tracing_subscriber::fmt()
        .with_writer(Arc::new(log_file))
        .with_ansi(false)
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    let quick_replies: Vec<String> = if args.quick_replies.is_empty() {
        DEFAULT_QUICK_REPLIES.iter().map(|s| s.to_string()).collect()
    } else {
        args.quick_replies
            .into_iter()
            .map(|reply| reply.trim().to_string())
            .filter(|reply| !reply.is_empty())
            .take(9)
            .collect()
    };

    let client = ChatClient::new(&args.endpoint)?;
    let session_id = SessionId::generate();

    let welcome = Welcome {
        title: "👋 Welcome! Ask me anything to get started.".to_string(),
        quick_replies: quick_replies.clone(),
    };
    let transcript = Transcript::new(Box::new(TerminalMarkdown), Some(welcome));
    let widget = ChatWidget::new(transcript, quick_replies);

    ui::run_tui(ui::App::new(widget, client, session_id))
}
