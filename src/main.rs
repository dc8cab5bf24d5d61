use std::fs::File;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use daemonize::Daemonize;
use log::{LevelFilter, info};
use syslog::{BasicLogger, Facility, Formatter3164};

use parkd::{application::Application, cli::Cli, config::ConfigManager};

const DAEMON_LOG: &str = "/var/tmp/parkd.log";

fn init_syslog() -> Result<()> {
    syslog::unix(Formatter3164 {
        facility: Facility::LOG_USER,
        hostname: None,
        process: "parkd".into(),
        pid: std::process::id(),
    })
    .map_err(|e| anyhow!("{e}"))
    .and_then(|logger| {
        log::set_boxed_logger(Box::new(BasicLogger::new(logger)))
            .map(|_| log::set_max_level(LevelFilter::Info))
            .map_err(|e| anyhow!("{e}"))
    })
}

fn init_console_log() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn into_daemon() -> Result<()> {
    File::create(DAEMON_LOG)
        .and_then(|out| Ok((out.try_clone()?, out)))
        .map_err(|e| anyhow!("{e}"))
        .and_then(|(stderr, stdout)| {
            Daemonize::new()
                .stdout(stdout)
                .stderr(stderr)
                .start()
                .map_err(|e| anyhow!("{e}"))
        })
}

fn main() -> Result<()> {
    let mut cli = Cli::parse();
    cli.resolve_config_path().context("Failed to resolve config path")?;

    // Fork before the runtime spawns its worker threads.
    if cli.daemonize {
        into_daemon()?;
        init_syslog()?;
    } else {
        init_console_log();
    }

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    info!("parkd {} starting", env!("CARGO_PKG_VERSION"));

    let config_manager = ConfigManager::load(cli.config.clone()).await?;

    Application::builder()
        .with_config_manager(config_manager)
        .with_mode(cli.mode())
        .build()
        .await?
        .run()
        .await
}
