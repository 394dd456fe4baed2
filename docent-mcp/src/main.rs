use anyhow::Result;
use clap::{Arg, Command};
use docent_mcp::{ServerConfig, run_server};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the protocol
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let matches = Command::new("docent-mcp")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Docent knowledge base Model Context Protocol server")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("TOML configuration file")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("database")
                .short('d')
                .long("database")
                .value_name("FILE")
                .help("Database file, overriding the configuration")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .get_matches();

    let config = ServerConfig {
        config_path: matches.get_one::<PathBuf>("config").cloned(),
        database: matches.get_one::<PathBuf>("database").cloned(),
    };

    run_server(config).await
}
