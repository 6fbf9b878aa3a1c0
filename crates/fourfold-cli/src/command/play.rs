use std::{
    io::{self, BufRead as _, Write as _},
    path::PathBuf,
};

use anyhow::{Context as _, bail};
use fourfold_engine::{BoardSize, Game, GameStatus, Player};
use fourfold_training::{
    encoding::encode,
    policy::rank_columns,
    population::{AgentId, PopulationEntry},
};

use crate::util;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct PlayArg {
    /// Roster to take the opponent agent from
    #[arg(long, requires = "agent")]
    roster: Option<PathBuf>,
    /// Id of the opponent agent in the roster
    #[arg(long, requires = "roster")]
    agent: Option<u32>,
    /// Let the agent make the first move
    #[arg(long, requires = "agent")]
    agent_first: bool,
    /// Board rows for a human-only game (defaults to 6)
    #[arg(long, conflicts_with = "agent")]
    rows: Option<usize>,
    /// Board columns for a human-only game (defaults to 7)
    #[arg(long, conflicts_with = "agent")]
    columns: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("invalid input {input:?}: enter a column number between 1 and {columns}")]
struct InvalidInput {
    input: String,
    columns: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Column(usize),
    Stop,
}

/// Parses a prompt answer: a 1-based column number or `stop`.
fn parse_command(line: &str, columns: usize) -> Result<Command, InvalidInput> {
    let line = line.trim();
    if line.eq_ignore_ascii_case("stop") {
        return Ok(Command::Stop);
    }
    match line.parse::<usize>() {
        Ok(column @ 1..) if column <= columns => Ok(Command::Column(column - 1)),
        _ => Err(InvalidInput {
            input: line.to_owned(),
            columns,
        }),
    }
}

fn board_size_for(entry: &PopulationEntry) -> anyhow::Result<BoardSize> {
    let shape = entry.agent().shape();
    if shape.outputs == 0 || shape.inputs % shape.outputs != 0 {
        bail!("Agent {} has no board layout: {shape}", entry.id());
    }
    BoardSize::new(shape.inputs / shape.outputs, shape.outputs)
        .with_context(|| format!("Agent {} was trained on an unsupported board", entry.id()))
}

/// Plays the agent's best open column and returns it.
fn agent_move(game: &mut Game, entry: &PopulationEntry) -> anyhow::Result<usize> {
    let scores = entry
        .agent()
        .forward(&encode(game.board(), game.to_move()))?;
    for column in rank_columns(&scores) {
        if game.play(column).is_ok() {
            return Ok(column);
        }
    }
    bail!("Agent {} found no legal move", entry.id())
}

/// Prompts until the human enters a playable column. Returns `false` on `stop`
/// or end of input.
fn human_move(game: &mut Game) -> anyhow::Result<bool> {
    let player = game.to_move();
    let columns = game.board().columns();
    let mut stdin = io::stdin().lock();
    loop {
        print!("{player} ({}), column [1-{columns}] or `stop`: ", player.symbol());
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            return Ok(false);
        }
        match parse_command(&line, columns) {
            Ok(Command::Stop) => return Ok(false),
            Ok(Command::Column(column)) => match game.play(column) {
                Ok(_) => return Ok(true),
                Err(err) => println!("{err}"),
            },
            Err(err) => println!("{err}"),
        }
    }
}

pub(crate) fn run(arg: &PlayArg) -> anyhow::Result<()> {
    let opponent = match (&arg.roster, arg.agent) {
        (Some(path), Some(id)) => {
            let population = util::read_roster_file(path)?;
            let id = AgentId::new(id);
            let entry = population
                .entry(id)
                .with_context(|| format!("Agent {id} is not in {}", path.display()))?
                .clone();
            Some(entry)
        }
        _ => None,
    };

    let size = match &opponent {
        Some(entry) => board_size_for(entry)?,
        None => BoardSize::new(
            arg.rows.unwrap_or(BoardSize::STANDARD.rows()),
            arg.columns.unwrap_or(BoardSize::STANDARD.columns()),
        )?,
    };
    let agent_player = opponent.as_ref().map(|entry| {
        println!("Playing against {}", entry.name());
        if arg.agent_first { Player::A } else { Player::B }
    });

    let mut game = Game::new(size);
    while game.status() == GameStatus::InProgress {
        println!("{}", game.board());
        match &opponent {
            Some(entry) if agent_player == Some(game.to_move()) => {
                let column = agent_move(&mut game, entry)?;
                println!("{} plays column {}", entry.name(), column + 1);
            }
            _ => {
                if !human_move(&mut game)? {
                    println!("Game stopped");
                    return Ok(());
                }
            }
        }
    }

    println!("{}", game.board());
    match game.status() {
        GameStatus::Won(player) => println!("{player} wins!"),
        GameStatus::Tie => println!("It's a tie"),
        GameStatus::InProgress => {}
    }
    Ok(())
}
