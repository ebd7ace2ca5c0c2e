use super::error::{BpgnError, Result};
use super::types::{Board, Game, MoveLabel, Player};

use std::collections::HashSet;

/// Computes the state that follows a move.
///
/// States are opaque to this crate; the applier is the only place where game
/// rules live. An `Err` carries the reason the move was rejected.
pub trait MoveApplier {
    fn apply(
        &mut self,
        state: &str,
        player: Player,
        notation: &str,
    ) -> std::result::Result<String, String>;
}

impl<F> MoveApplier for F
where
    F: FnMut(&str, Player, &str) -> std::result::Result<String, String>,
{
    fn apply(
        &mut self,
        state: &str,
        player: Player,
        notation: &str,
    ) -> std::result::Result<String, String> {
        self(state, player, notation)
    }
}

/// Applier whose state is the start state followed by every applied move,
/// e.g. `"<start> A:e4 a:e5"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveTrail;

impl MoveApplier for MoveTrail {
    fn apply(
        &mut self,
        state: &str,
        player: Player,
        notation: &str,
    ) -> std::result::Result<String, String> {
        if notation.is_empty() {
            return Err("empty notation".to_string());
        }
        Ok(format!("{} {}:{}", state, player, notation))
    }
}

/// Check that the game has moves and that each board's labels run
/// `1A, 1a, 2A, 2a, ...` (resp. `B`/`b`) with no gaps.
///
/// The two boards may interleave in any order.
pub fn check_move_order(game: &Game) -> Result<()> {
    if game.moves.is_empty() {
        return Err(BpgnError::EmptyGame);
    }

    let mut expect_a = MoveLabel::first(Board::A);
    let mut expect_b = MoveLabel::first(Board::B);

    for m in &game.moves {
        if m.label == expect_a {
            expect_a = expect_a.next();
        } else if m.label == expect_b {
            expect_b = expect_b.next();
        } else {
            return Err(BpgnError::OutOfOrderMoves {
                expected_a: expect_a,
                expected_b: expect_b,
                got: m.label,
            });
        }
    }

    Ok(())
}

/// Rebuild `game.states` by applying every move in order.
///
/// A move whose `"<label>. <notation>"` was already seen in this game is a
/// re-logged duplicate (servers repeat the last move on a time forfeit): its
/// state is a copy of the previous one and the applier is not called.
pub fn populate_states<A>(game: &mut Game, applier: &mut A) -> Result<()>
where
    A: MoveApplier + ?Sized,
{
    let mut seen: HashSet<String> = HashSet::with_capacity(game.moves.len());
    let mut states = Vec::with_capacity(game.moves.len() + 1);
    states.push(game.initial_state.clone());

    for m in &game.moves {
        let prior = states.last().map(String::as_str).unwrap_or_default();
        let full_move = m.full_move();

        let next = if seen.contains(&full_move) {
            tracing::debug!(%full_move, "skipping re-logged move");
            prior.to_string()
        } else {
            let next = applier
                .apply(prior, m.player(), &m.notation)
                .map_err(|reason| BpgnError::MoveRejected {
                    label: m.label,
                    notation: m.notation.clone(),
                    prior_state: prior.to_string(),
                    reason,
                })?;
            seen.insert(full_move);
            next
        };

        states.push(next);
    }

    game.states = states;
    Ok(())
}
