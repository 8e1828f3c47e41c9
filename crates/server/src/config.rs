//! Command-line and environment configuration.

use std::net::IpAddr;
use std::time::Duration;

use clap::Parser;

use crate::{DEFAULT_HOST, DEFAULT_PORT, OUTBOUND_QUEUE_CAPACITY, SEND_TIMEOUT_MS, ServerConfig};

#[derive(Debug, Parser)]
#[command(
    name = "noughts-server",
    version,
    about = "Two-player grid game server with spectators"
)]
pub struct Cli {
    /// Address to listen on.
    #[arg(long, env = "NOUGHTS_HOST", default_value_t = DEFAULT_HOST)]
    pub host: IpAddr,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Outbound messages buffered per connection before it is dropped.
    #[arg(long, env = "NOUGHTS_OUTBOUND_QUEUE", default_value_t = OUTBOUND_QUEUE_CAPACITY)]
    pub outbound_queue: usize,

    /// Milliseconds a single socket send may take before the connection is dropped.
    #[arg(long, env = "NOUGHTS_SEND_TIMEOUT_MS", default_value_t = SEND_TIMEOUT_MS)]
    pub send_timeout_ms: u64,
}

impl From<Cli> for ServerConfig {
    fn from(cli: Cli) -> Self {
        Self {
            host: cli.host,
            port: cli.port,
            outbound_queue_capacity: cli.outbound_queue,
            send_timeout: Duration::from_millis(cli.send_timeout_ms),
        }
    }
}
