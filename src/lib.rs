// melodeck - music library player
// Module declarations
pub mod audio;
pub mod cli;
pub mod commands;
pub mod db;
pub mod error;
pub mod events;
pub mod library;
pub mod logging;
pub mod metadata;
pub mod queue;
pub mod settings;
pub mod state;

use clap::Parser;

use cli::Args;
use commands::AppContext;

pub async fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init_logging(args.verbose)?;

    let ctx = AppContext::open(args.data_dir, args.user)?;
    commands::dispatch(ctx, args.command).await
}
