use clap::{Parser, Subcommand};

use self::{evolve::EvolveArg, play::PlayArg, roster::RosterArg};
use crate::logging;

mod evolve;
mod play;
mod roster;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Log level used when `RUST_LOG` is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    /// What mode to run the program in
    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Evolve a population of agents through self-play tournaments
    Evolve(#[clap(flatten)] EvolveArg),
    /// Play a game against another human or an evolved agent
    Play(#[clap(flatten)] PlayArg),
    /// Show the ranking of a saved roster
    Roster(#[clap(flatten)] RosterArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    let _logger = logging::init(&args.log_level)?;
    match args.mode.unwrap_or(Mode::Play(PlayArg::default())) {
        Mode::Evolve(arg) => evolve::run(&arg)?,
        Mode::Play(arg) => play::run(&arg)?,
        Mode::Roster(arg) => roster::run(&arg)?,
    }
    Ok(())
}
