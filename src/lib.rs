pub mod cli;
pub mod convert;
pub mod descriptor;
pub mod error;
pub mod inspect;
pub mod io_utils;
pub mod kind;
pub mod normalize;
pub mod pipeline;
pub mod profile;
pub mod table;
pub mod transport;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use crate::cli::{Cli, Commands};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("survey_ingest", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Inspect(args) => inspect::execute(&args),
        Commands::Convert(args) => convert::execute(&args),
        Commands::Ingest(args) => pipeline::execute(&args),
    }
}
