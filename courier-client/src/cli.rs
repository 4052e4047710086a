//! Command-line argument parsing for courier-probe

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use courier_protocol::{ClientKind, DispatcherId};
use courier_utils::{LogConfig, LogOutput};

/// courier-probe - hold a dispatcher connection open and log what arrives
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Config file path (defaults to the XDG config location)
    #[arg(long, short = 'c', env = "COURIER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Dispatcher id to connect to
    #[arg(long, short = 'd', default_value_t = 1)]
    pub dispatcher: DispatcherId,

    /// Which endpoint to identify as
    #[arg(long, value_enum, default_value_t = Kind::Game)]
    pub kind: Kind,

    /// Gate or game id sent in the handshake
    #[arg(long, default_value_t = 1)]
    pub id: u16,

    /// Mark the game as restoring from a snapshot
    #[arg(long, default_value_t = false)]
    pub restore: bool,

    /// Send an application packet at this interval (0 disables)
    #[arg(long, default_value_t = 0)]
    pub ping_interval_ms: u64,

    /// Where to write logs
    #[arg(long, value_enum, default_value_t = LogTarget::Stderr)]
    pub log_output: LogTarget,

    /// Log file name under the courier log directory
    #[arg(long)]
    pub log_file: Option<String>,

    /// Debug-level logs with source locations
    #[arg(long, short = 'v', default_value_t = false)]
    pub verbose: bool,

    /// Print the default configuration and exit
    #[arg(long, default_value_t = false)]
    pub print_default_config: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Gate,
    Game,
}

impl From<Kind> for ClientKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Gate => ClientKind::Gate,
            Kind::Game => ClientKind::Game,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File,
    Both,
}

impl From<LogTarget> for LogOutput {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::Stderr => LogOutput::Stderr,
            LogTarget::File => LogOutput::File,
            LogTarget::Both => LogOutput::Both,
        }
    }
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn log_config(&self) -> LogConfig {
        let mut config = LogConfig::probe().with_output(self.log_output.into());
        if let Some(name) = &self.log_file {
            config = config.with_file_name(name.clone());
        }
        if self.verbose {
            config = config.verbose();
        }
        config
    }

    pub fn ping_interval(&self) -> Option<std::time::Duration> {
        (self.ping_interval_ms > 0).then(|| std::time::Duration::from_millis(self.ping_interval_ms))
    }
}
