//! CLI argument parsing using clap

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// MouseHunt profile facade
#[derive(Parser, Debug)]
#[command(name = "mh-api", about = "Serve MouseHunt profile facts over HTTP", version)]
pub struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:8787")]
    pub bind: SocketAddr,

    /// MouseHunt base URL
    #[arg(long, default_value = mh_http_client::DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Timeout for each upstream request (e.g. "30s", "1m")
    #[arg(long, default_value = "30s", value_parser = humantime::parse_duration)]
    pub timeout: Duration,

    /// Identity store file (defaults to the user data directory)
    #[arg(long, conflicts_with = "memory_store")]
    pub store: Option<PathBuf>,

    /// Keep identity links in memory only
    #[arg(long)]
    pub memory_store: bool,

    /// Body text the game uses for an expired session
    #[arg(long)]
    pub expired_marker: Option<String>,
}
