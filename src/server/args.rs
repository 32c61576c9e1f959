use std::net::SocketAddr;

use clap::Parser;

use crate::config::ConfigArgs;

#[derive(Parser, Debug, Clone)]
#[command(name = "sitetime-server", version, about = "Aggregation service for sitetime trackers")]
pub struct ServerArgs {
    /// Stay attached to the terminal instead of daemonizing.
    #[arg(long)]
    pub force: bool,
    #[command(flatten)]
    pub config: ConfigArgs,
    #[command(flatten)]
    pub serve: ServeArgs,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, help = "Address to listen on")]
    pub listen: Option<SocketAddr>,
    #[arg(long, help = "User record requests are applied to")]
    pub user: Option<String>,
    #[arg(long = "in-memory", help = "Keep aggregates in memory only")]
    pub in_memory: bool,
}
