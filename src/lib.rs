//! Reader for bughouse PGN (BPGN) game logs.
//!
//! Games are pulled lazily from a file or a directory tree with
//! [`open_games`], checked with [`check_move_order`], and given per-ply
//! states with [`populate_states`] and a caller-supplied [`MoveApplier`].

pub mod bpgn;

pub use bpgn::{
    BpgnError, CompressionMode, Game, Games, Move, MoveApplier, MoveLabel, MoveTrail, Player,
    ReadOptions, Result, check_move_order, open_games, populate_states,
};
