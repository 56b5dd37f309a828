//! Rotation simulator command-line client.
//!
//! Loads a job definition, a simulation config and optional party-buff
//! windows, then either plays a list of skills as fast as the rules allow,
//! replays a saved action record, or only validates the inputs.
//!
//! ```bash
//! # Play a sequence with the bundled sample job and save it
//! rotation play fire_iii enochian fire fire --save opener
//!
//! # Replay it in auto-paused real time at 4x speed
//! rotation replay --name opener --mode auto-pause --speed 4
//! ```

mod cli;
mod commands;
mod content;
mod logging;
mod report;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = logging::setup_logging(cli.log_dir.as_deref(), cli.verbose)?;

    match cli.command {
        Command::Play(args) => commands::play::execute(args),
        Command::Replay(args) => commands::replay::execute(args).await,
        Command::Check(args) => commands::check::execute(args),
    }
}
