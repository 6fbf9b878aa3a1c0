use std::{
    fmt,
    fs::{self, File},
    io::{self, BufReader, BufWriter, StdoutLock, Write},
    path::{Path, PathBuf},
};

use anyhow::Context;
use fourfold_training::{
    config::EvolutionConfig, evolution::History, names::NamePool, population::Population,
    roster::Roster,
};

/// Where a JSON document goes: a file, or stdout when no path is given.
#[derive(Debug)]
enum Output {
    Stdout(StdoutLock<'static>),
    File { writer: BufWriter<File>, path: PathBuf },
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Stdout(_) => f.write_str("stdout"),
            Output::File { path, .. } => write!(f, "{}", path.display()),
        }
    }
}

impl Output {
    fn create(path: Option<PathBuf>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Output::Stdout(io::stdout().lock()));
        };
        let file = File::create(&path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        Ok(Output::File {
            writer: BufWriter::new(file),
            path,
        })
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Output::Stdout(writer) => writer,
            Output::File { writer, .. } => writer,
        }
    }

    fn write_json<T>(mut self, value: &T) -> anyhow::Result<()>
    where
        T: serde::Serialize + ?Sized,
    {
        let destination = self.to_string();
        let writer = self.writer();
        serde_json::to_writer_pretty(&mut *writer, value)
            .with_context(|| format!("Failed to write JSON to {destination}"))?;
        writeln!(writer)
            .and_then(|()| writer.flush())
            .with_context(|| format!("Failed to finish writing {destination}"))
    }
}

/// Pretty-prints `value` as JSON to `path`, or to stdout when `path` is `None`.
pub fn save_json<T>(value: &T, path: Option<PathBuf>) -> anyhow::Result<()>
where
    T: serde::Serialize + ?Sized,
{
    Output::create(path)?.write_json(value)
}

pub fn read_json_file<T>(file_kind: &str, path: &Path) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let file = File::open(path)
        .with_context(|| format!("Failed to open {file_kind} file: {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse {file_kind} file: {}", path.display()))
}

/// Reads a roster file and validates it into a population.
pub fn read_roster_file(path: &Path) -> anyhow::Result<Population> {
    let roster: Roster = read_json_file("roster", path)?;
    roster
        .into_population()
        .with_context(|| format!("Invalid roster file: {}", path.display()))
}

pub fn read_history_file(path: &Path) -> anyhow::Result<History> {
    read_json_file("history", path)
}

/// Reads an evolution config and validates it.
pub fn read_config_file(path: &Path) -> anyhow::Result<EvolutionConfig> {
    let config: EvolutionConfig = read_json_file("config", path)?;
    config
        .validate()
        .with_context(|| format!("Invalid config file: {}", path.display()))?;
    Ok(config)
}

/// Reads a name list: one name per line, blank lines and `#` comments skipped.
pub fn read_name_file(path: &Path) -> anyhow::Result<NamePool> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read name file: {}", path.display()))?;
    NamePool::from_lines(&text)
        .with_context(|| format!("Name file contains no names: {}", path.display()))
}
