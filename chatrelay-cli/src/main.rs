//! Terminal stream consumer for the chatrelay server
//!
//! One turn is in flight at a time: the prompt only returns once the
//! previous reply has finished streaming, so submits are inherently
//! serialized.

use anyhow::Result;
use chatrelay_core::session::{send_turn, Session};
use clap::Parser;
use std::io::{self, BufRead, Write};

#[derive(Parser)]
#[command(name = "chatrelay", about = "Chat with the relay from your terminal")]
struct Args {
    /// Base URL of the relay server
    #[arg(long, default_value = "http://localhost:3000")]
    url: String,

    /// Wait for the complete reply instead of streaming it
    #[arg(long)]
    no_stream: bool,

    /// Send a single message and exit instead of starting a chat loop
    message: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    let client = reqwest::Client::new();
    let mut session = Session::new();
    let streaming = !args.no_stream;

    if let Some(message) = args.message {
        run_turn(&client, &args.url, &mut session, message, streaming).await;
        return Ok(());
    }

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if text == "exit" || text == "quit" {
            break;
        }

        run_turn(&client, &args.url, &mut session, text.to_string(), streaming).await;
    }

    Ok(())
}

async fn run_turn(
    client: &reqwest::Client,
    url: &str,
    session: &mut Session,
    text: String,
    streaming: bool,
) {
    let outcome = send_turn(client, url, session, text, streaming, |fragment| {
        // Fragments are rendered the moment they arrive.
        print!("{}", fragment);
        let _ = io::stdout().flush();
    })
    .await;

    if outcome.streamed {
        if let Some(error) = &outcome.error {
            print!("\nError: {}", error);
        }
    } else if let Some(reply) = session.last_reply() {
        print!("{}", reply);
    }
    println!();
}
