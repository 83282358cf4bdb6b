use anyhow::Result;
use clap::Parser;
use server::build_app;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

/// HTTP API over a soft-cosine corpus: document similarity, match explanations and
/// background graph generation with pollable progress.
#[derive(Parser)]
#[command(name = "server", long_about = None)]
struct Args {
    /// Corpus JSON served from the start. Without it, requests answer 412 until one is POSTed to /corpus
    #[arg(long)]
    corpus: Option<String>,
    /// Interface the API listens on
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port the API listens on
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let corpus_given = args.corpus.is_some();
    let app = build_app(args.corpus)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, corpus_given, "similarity api listening");
    axum::serve(listener, app).await?;
    Ok(())
}
