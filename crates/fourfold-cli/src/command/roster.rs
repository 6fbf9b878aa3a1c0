use std::path::PathBuf;

use fourfold_training::population::{PopulationEntry, SelectionCriterion, Status};

use crate::util;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct RosterArg {
    /// Roster file (JSON)
    path: PathBuf,
    /// Include deceased agents
    #[arg(long)]
    all: bool,
    /// Only show the best K agents
    #[arg(long)]
    top: Option<usize>,
    /// Ranking key: score, generation or winlossratio
    #[arg(long, default_value = "score")]
    by: SelectionCriterion,
}

fn format_ratio(entry: &PopulationEntry) -> String {
    let ratio = entry.fitness().win_loss_ratio();
    if ratio.is_infinite() {
        "inf".to_owned()
    } else {
        format!("{ratio:.2}")
    }
}

fn format_row(rank: usize, entry: &PopulationEntry) -> String {
    let fitness = entry.fitness();
    let status = match entry.status() {
        Status::Alive => "alive",
        Status::Deceased => "deceased",
    };
    format!(
        "{rank:>4}  {:<24} {:>4} {:<8} {:>6} {:>6} {:>5} {:>6} {:>6} {:>6}",
        entry.name(),
        entry.generation(),
        status,
        fitness.score,
        fitness.max_score,
        fitness.wins,
        fitness.losses,
        format_ratio(entry),
        fitness.plays,
    )
}

pub(crate) fn run(arg: &RosterArg) -> anyhow::Result<()> {
    let RosterArg {
        path,
        all,
        top,
        by,
    } = arg;

    let population = util::read_roster_file(path)?;
    let ranking = population
        .ranking(*by)
        .into_iter()
        .filter(|entry| *all || entry.is_alive())
        .take(top.unwrap_or(usize::MAX));

    println!(
        "{:>4}  {:<24} {:>4} {:<8} {:>6} {:>6} {:>5} {:>6} {:>6} {:>6}",
        "rank", "name", "gen", "status", "score", "max", "wins", "losses", "ratio", "plays"
    );
    for (i, entry) in ranking.enumerate() {
        println!("{}", format_row(i + 1, entry));
    }
    eprintln!(
        "{} agents in roster, {} alive, newest generation {}",
        population.len(),
        population.alive().count(),
        population.max_generation()
    );
    Ok(())
}
