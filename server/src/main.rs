use anyhow::Result;
use clap::Parser;
use server::{build_app, snapshot_summary};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "server")]
#[command(about = "Serve game recommendations from a built snapshot", long_about = None)]
struct Args {
    /// Snapshot directory written by `builder build`
    #[arg(long, default_value = "./snapshot")]
    snapshot: String,
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    snapshot_summary(&args.snapshot)?;
    let app = build_app(args.snapshot)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "recommendation server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
