mod assemble;
mod error;
pub mod log;
mod movetext;
mod moves;
mod reader;
mod types;

pub use assemble::{LineReader, read_game};
pub use error::{BpgnError, Result, SourcePos};
pub use movetext::{Lexeme, Lexer, RESULT_MARKERS, Token, has_result_marker, parse_movetext};
pub use moves::{MoveApplier, MoveTrail, check_move_order, populate_states};
pub use reader::{
    CompressionMode, DirectoryGames, FileGames, Games, PLAIN_SUFFIX, ReadOptions, ZSTD_SUFFIX,
    open_games,
};
pub use types::{Board, Color, Game, Move, MoveComments, MoveLabel, Player};
