use std::process;

use clap::Parser;
use colored::*;
use env_logger::Builder;
use log::{debug, info, LevelFilter};

use bgpctl::cli::{query_bgpctl, Args, Command, RunOptions};
use bgpctl::{config, serve, ServerConfig};

async fn run(options: &RunOptions) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &options.config_path {
        Some(path) => {
            let config = config::from_file(path)?;
            debug!("Loaded config from {}", path.display());
            config
        }
        None => ServerConfig::default(),
    };
    if let Some(listen) = options.listen {
        config.listen = listen;
    }
    serve(config).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let (bgpctl_level, other_level) = match args.verbose {
        0 => (LevelFilter::Info, LevelFilter::Warn),
        1 => (LevelFilter::Debug, LevelFilter::Warn),
        2 => (LevelFilter::Trace, LevelFilter::Warn),
        _ => (LevelFilter::Trace, LevelFilter::Trace),
    };
    // Logs stay on stderr, stdout can be the speaker command stream
    Builder::new()
        .filter(Some("bgpctl"), bgpctl_level)
        .filter(None, other_level)
        .init();

    match &args.cmd {
        Command::Run(options) => {
            info!("Logging at levels {}/{}", bgpctl_level, other_level);
            if let Err(err) = run(options).await {
                eprintln!("{}", err.to_string().red());
                process::exit(1);
            }
        }
        _ => {
            if query_bgpctl(&args).await.is_err() {
                process::exit(1);
            }
        }
    }
}
