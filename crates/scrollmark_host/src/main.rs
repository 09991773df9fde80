use std::io;

use log::LevelFilter;
use scrollmark_host::{serve, HostConfig};
use scrollmark_logging::{scrollmark_error, scrollmark_info};

fn main() -> anyhow::Result<()> {
    let config = HostConfig::load()?;

    // Stdout carries frames; logs must never go there.
    if let Err(err) = scrollmark_engine::ensure_data_dir(&config.data_dir) {
        eprintln!("Warning: data directory {:?}: {}", config.data_dir, err);
    }
    scrollmark_logging::initialize(
        config.log_destination.into(),
        LevelFilter::Info,
        &config.log_path(),
    );
    scrollmark_info!("Starting scrollmark_host {}", env!("CARGO_PKG_VERSION"));

    let result = serve(&config, io::stdin().lock(), io::stdout().lock());
    if let Err(err) = &result {
        scrollmark_error!("Host stopped: {:#}", err);
    }
    result
}
