use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::app_context::RunMode;

/// parkd: parking slot occupancy service and status display
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// YAML config file path (default: $PARKD_CONFIG, ~/.config/parkd/config.yml, /etc/parkd/config.yml)
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Detach from the terminal and log to syslog
    #[arg(short = 'd', long = "daemonize", default_value = "false", global = true)]
    pub daemonize: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Serve slot state over HTTP (default)
    Serve,
    /// Run only the status display against a remote state service
    Display,
}

impl Cli {
    pub fn mode(&self) -> RunMode {
        match self.command {
            None | Some(Command::Serve) => RunMode::Serve,
            Some(Command::Display) => RunMode::Display,
        }
    }

    /// Pins the config path (`--config`, else `$PARKD_CONFIG`) to the current
    /// directory. Must run before daemonizing, which moves the process to `/`.
    pub fn resolve_config_path(&mut self) -> std::io::Result<()> {
        let path = self
            .config
            .take()
            .or_else(|| std::env::var_os("PARKD_CONFIG").map(PathBuf::from));
        self.config = path.map(std::path::absolute).transpose()?;
        Ok(())
    }
}
