use std::net::{IpAddr, SocketAddr};

use clap::Parser;

/// Server settings. Every flag can also come from the environment.
#[derive(Parser, Debug, Clone)]
#[command(name = "draughts-server", version, about = "Two-player Russian draughts over WebSocket")]
pub struct Config {
    /// Address to listen on.
    #[arg(long, env = "DRAUGHTS_BIND", default_value = "0.0.0.0")]
    pub bind: IpAddr,

    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Inbound intents buffered per match before senders wait.
    #[arg(long, env = "DRAUGHTS_QUEUE_DEPTH", default_value_t = 64)]
    pub queue_depth: usize,

    /// Room used when a join message does not name one.
    #[arg(long, env = "DRAUGHTS_DEFAULT_ROOM", default_value = "main")]
    pub default_room: String,
}

impl Config {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}
