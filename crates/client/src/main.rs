//! docflow-client - upload a file and watch its progress.

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use docflow_client::{DocflowClient, DEFAULT_PING_INTERVAL};
use docflow_core::progress::{ProgressEvent, ProgressStage};
use docflow_core::types::ClientId;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "docflow-client")]
#[command(about = "Upload a document and stream its processing progress", long_about = None)]
struct Args {
    /// File to upload
    file: PathBuf,

    /// Server base URL
    #[arg(long, env = "DOCFLOW_SERVER", default_value = "http://localhost:8000")]
    server: String,

    /// Client id used for both the stream and the upload
    #[arg(long, env = "DOCFLOW_CLIENT_ID", default_value = "client123")]
    client_id: String,

    /// Seconds between keep-alive frames
    #[arg(long, default_value_t = DEFAULT_PING_INTERVAL.as_secs())]
    ping_interval_secs: u64,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docflow_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(Some(event)) if event.stage == ProgressStage::Completed => {
            println!("Processing completed. Disconnecting...");
        }
        Ok(Some(event)) => {
            eprintln!("Processing failed: {}", event.message);
            process::exit(1);
        }
        Ok(None) => {
            eprintln!("Stream closed before the job finished");
            process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(1);
        }
    }
}

async fn run(args: Args) -> anyhow::Result<Option<ProgressEvent>> {
    let client_id = ClientId::parse(args.client_id).context("Invalid client id")?;
    let client = DocflowClient::new(&args.server, client_id)?;

    // The stream must be open before the upload or early events are lost.
    let stream = client.connect().await?;
    println!("Connected to server...");

    let ping_interval = Duration::from_secs(args.ping_interval_secs.max(1));
    let follower = tokio::spawn(stream.follow(ping_interval, print_event));

    let accepted = client
        .upload(&args.file)
        .await
        .with_context(|| format!("Uploading {}", args.file.display()));
    let accepted = match accepted {
        Ok(accepted) => accepted,
        Err(e) => {
            follower.abort();
            return Err(e);
        }
    };
    println!("Upload response: {} (job {})", accepted.message, accepted.job_id);

    let terminal = follower.await.context("Stream task panicked")??;
    Ok(terminal)
}

fn print_event(event: &ProgressEvent) {
    println!();
    println!("Stage: {}", event.stage.as_str());
    println!("Message: {}", event.message);
    match event.progress {
        Some(percent) => println!("Progress: {percent}%"),
        None => println!("Progress: -"),
    }
}
