use std::{
    io,
    path::{Path, PathBuf},
    thread,
};

use anyhow::Context as _;
use chrono::Utc;
use fourfold_training::{
    config::EvolutionConfig,
    evolution::{CancelToken, EvolutionDriver, EvolutionError, History, RunReport},
    names::NamePool,
    population::Population,
    roster::Roster,
};

use crate::util;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct EvolveArg {
    /// Evolution config file (JSON); defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,
    /// Roster to resume from; a fresh population is spawned when omitted
    #[arg(long)]
    roster: Option<PathBuf>,
    /// Output roster file path
    #[arg(long)]
    output: Option<PathBuf>,
    /// Tournament history file path; an existing file is continued when resuming
    #[arg(long)]
    history: Option<PathBuf>,
    /// Number of generations to run
    #[arg(long)]
    generations: Option<u32>,
    /// Number of survivors per generation (half the alive population)
    #[arg(long)]
    population: Option<usize>,
    /// RNG seed
    #[arg(long)]
    seed: Option<u64>,
    /// Worker threads used to play each round
    #[arg(long)]
    threads: Option<usize>,
    /// Name list file (one name per line)
    #[arg(long)]
    names: Option<PathBuf>,
}

impl EvolveArg {
    fn load_config(&self) -> anyhow::Result<EvolutionConfig> {
        let mut config = match &self.config {
            Some(path) => util::read_config_file(path)?,
            None => EvolutionConfig::default(),
        };
        if let Some(generations) = self.generations {
            config.generations = generations;
        }
        if let Some(population) = self.population {
            config.population = population;
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        config.validate().context("Invalid evolution settings")?;
        Ok(config)
    }

    fn load_state(&self) -> anyhow::Result<(Population, History)> {
        let Some(roster_path) = &self.roster else {
            return Ok((Population::new(), History::new()));
        };
        let population = util::read_roster_file(roster_path)?;
        let history = match &self.history {
            Some(path) if path.exists() => util::read_history_file(path)?,
            _ => History::new(),
        };
        eprintln!(
            "Resuming {} agents ({} alive) and {} recorded games",
            population.len(),
            population.alive().count(),
            history.len()
        );
        Ok((population, history))
    }
}

/// Cancels `cancel` once a line reading `stop` arrives on stdin.
fn watch_for_stop(cancel: CancelToken) {
    thread::spawn(move || {
        for line in io::stdin().lines() {
            let Ok(line) = line else {
                break;
            };
            if line.trim().eq_ignore_ascii_case("stop") {
                log::warn!("stop requested; finishing after the current game");
                cancel.cancel();
                break;
            }
        }
    });
}

pub(crate) fn run(arg: &EvolveArg) -> anyhow::Result<()> {
    let config = arg.load_config()?;
    let names = match &arg.names {
        Some(path) => util::read_name_file(path)?,
        None => NamePool::default(),
    };
    let (population, history) = arg.load_state()?;

    let generations = config.generations;
    let mut driver = EvolutionDriver::resume(config, names, population, history)
        .context("Failed to set up evolution")?;

    let cancel = CancelToken::new();
    watch_for_stop(cancel.clone());
    eprintln!("Running {generations} generation(s); type `stop` and press enter to cancel");

    let started_at = Utc::now();
    let result = driver.run(generations, &cancel);
    let elapsed = Utc::now() - started_at;

    let report = save_outcome(driver, result, arg.output.clone(), arg.history.as_deref())?;
    eprintln!(
        "{} {} generation(s) in {} ms",
        if report.cancelled { "Stopped after" } else { "Completed" },
        report.summaries.len(),
        elapsed.num_milliseconds()
    );
    if let Some(last) = report.summaries.last() {
        eprintln!("Last generation: {last}");
    }
    Ok(())
}

/// Saves the committed roster and history, then surfaces the run's error, if any.
///
/// Generations completed before a failure are written out as well.
fn save_outcome(
    driver: EvolutionDriver,
    result: Result<RunReport, EvolutionError>,
    output: Option<PathBuf>,
    history_path: Option<&Path>,
) -> anyhow::Result<RunReport> {
    let (population, history) = driver.into_parts();
    util::save_json(&Roster::from_population(&population), output)?;
    if let Some(path) = history_path {
        util::save_json(&history, Some(path.to_path_buf()))?;
    }
    result.context("Evolution failed; generations completed before the failure were saved")
}

#[cfg(test)]
mod tests {
    use std::{env, fs, process};

    use fourfold_training::{config::ConfigError, evolution::CancelToken};

    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("fourfold-{name}-{}", process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn small_driver() -> EvolutionDriver {
        let config = EvolutionConfig {
            population: 2,
            rows: 4,
            columns: 4,
            hidden: 2,
            seed: Some(3),
            ..EvolutionConfig::default()
        };
        EvolutionDriver::new(config, NamePool::default()).unwrap()
    }

    #[test]
    fn test_failed_run_still_saves_committed_generations() {
        let dir = scratch_dir("failed-run");
        let roster_path = dir.join("roster.json");
        let history_path = dir.join("history.json");

        let mut driver = small_driver();
        driver.step(&CancelToken::new()).unwrap();
        let population = driver.population().clone();
        let history = driver.history().clone();

        let failure = Err(EvolutionError::Config(ConfigError::Validation(
            "board vanished".to_owned(),
        )));
        let err = save_outcome(driver, failure, Some(roster_path.clone()), Some(&history_path))
            .unwrap_err();
        assert!(err.to_string().contains("saved"));

        assert_eq!(util::read_roster_file(&roster_path).unwrap(), population);
        assert_eq!(util::read_history_file(&history_path).unwrap(), history);
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_successful_run_returns_report() {
        let dir = scratch_dir("successful-run");
        let roster_path = dir.join("roster.json");

        let mut driver = small_driver();
        let result = driver.run(2, &CancelToken::new());
        let report = save_outcome(driver, result, Some(roster_path.clone()), None).unwrap();
        assert_eq!(report.summaries.len(), 2);
        assert!(!report.cancelled);
        assert_eq!(util::read_roster_file(&roster_path).unwrap().max_generation(), 3);
        fs::remove_dir_all(dir).unwrap();
    }
}
