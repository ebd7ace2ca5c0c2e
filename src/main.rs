use anyhow::Context;
use bughouse_pgn::bpgn::log;
use bughouse_pgn::{
    CompressionMode, Game, MoveTrail, ReadOptions, check_move_order, open_games, populate_states,
};
use clap::Parser;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Read bughouse PGN logs and print every well-formed game with its states
#[derive(Parser)]
#[command(name = "bpgn")]
#[command(version)]
struct Args {
    /// A .bpgn/.bpgn.zst file, or a directory searched recursively for them
    #[arg(value_name = "PATH")]
    path: PathBuf,

    /// State every game starts from (defaults to both boards in the start position)
    #[arg(long, value_name = "STATE")]
    initial_state: Option<String>,

    /// Decoder for game files: plain or zstd (default: from the extension)
    #[arg(long, value_name = "MODE", value_parser = parse_compression)]
    compression: Option<CompressionMode>,

    /// Print one JSON document per accepted game
    #[arg(long)]
    json: bool,

    /// Only print the final tally
    #[arg(short, long)]
    quiet: bool,
}

fn parse_compression(raw: &str) -> Result<CompressionMode, String> {
    CompressionMode::parse(raw).map_err(|e| e.to_string())
}

fn bughouse_start() -> String {
    format!("{} | {}", START_FEN, START_FEN)
}

fn write_game<W: Write>(out: &mut W, game: &Game, json: bool) -> io::Result<()> {
    if json {
        return writeln!(out, "{}", game.to_json());
    }

    write!(out, "{}", game)?;
    for state in &game.states {
        writeln!(out, "{}", state)?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    log::init();
    let args = Args::parse();

    let mut options = ReadOptions::new(args.initial_state.unwrap_or_else(bughouse_start));
    if let Some(compression) = args.compression {
        options = options.with_compression(compression);
    }

    let games = open_games(&args.path, options)
        .with_context(|| format!("cannot read games from '{}'", args.path.display()))?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut total = 0usize;
    let mut good = 0usize;

    for game in games {
        let mut game = game?;
        total += 1;

        if let Err(e) = check_move_order(&game) {
            if e.is_recoverable() {
                tracing::warn!(game = total, event = game.tag("Event"), "skipping game: {}", e);
                continue;
            }
            return Err(e.into());
        }

        populate_states(&mut game, &mut MoveTrail)
            .with_context(|| format!("cannot compute states of game {}", total))?;

        if !args.quiet {
            write_game(&mut out, &game, args.json)?;
        }
        good += 1;
    }

    writeln!(out, "{}/{} games are good", good, total)?;
    out.flush()?;
    Ok(())
}
