use serde_json::{Value, json};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;

/// Comments attached to a single move; almost always zero or one.
pub type MoveComments = SmallVec<[String; 2]>;

/// One of the two synchronized boards of a bughouse match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Board {
    A,
    B,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    White,
    Black,
}

/// The player who made a ply: the board plus the colour on that board.
///
/// In movetext this is a single letter: `A`/`B` for White, `a`/`b` for Black.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Player {
    pub board: Board,
    pub color: Color,
}

impl Player {
    pub const fn new(board: Board, color: Color) -> Self {
        Self { board, color }
    }

    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'A' => Some(Self::new(Board::A, Color::White)),
            'a' => Some(Self::new(Board::A, Color::Black)),
            'B' => Some(Self::new(Board::B, Color::White)),
            'b' => Some(Self::new(Board::B, Color::Black)),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        match (self.board, self.color) {
            (Board::A, Color::White) => 'A',
            (Board::A, Color::Black) => 'a',
            (Board::B, Color::White) => 'B',
            (Board::B, Color::Black) => 'b',
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// A move-number label such as `12a`: the ply number shared by both colours of
/// a board, plus the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MoveLabel {
    pub ply: u32,
    pub player: Player,
}

impl MoveLabel {
    pub const fn new(ply: u32, player: Player) -> Self {
        Self { ply, player }
    }

    /// First label expected on `board`: White's first move.
    pub const fn first(board: Board) -> Self {
        Self::new(1, Player::new(board, Color::White))
    }

    /// The label that follows this one on the same board: `NA -> Na -> (N+1)A`.
    pub fn next(self) -> Self {
        let Player { board, color } = self.player;
        match color {
            Color::White => Self::new(self.ply, Player::new(board, Color::Black)),
            Color::Black => Self::new(self.ply + 1, Player::new(board, Color::White)),
        }
    }
}

impl fmt::Display for MoveLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.ply, self.player)
    }
}

/// One recorded ply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Move {
    pub label: MoveLabel,
    pub notation: String,
    pub comments: MoveComments,
}

impl Move {
    pub fn new(label: MoveLabel, notation: impl Into<String>) -> Self {
        Self {
            label,
            notation: notation.into(),
            comments: MoveComments::new(),
        }
    }

    pub fn player(&self) -> Player {
        self.label.player
    }

    /// `"12a. Nxf7+"`: label and notation without comments.
    pub fn full_move(&self) -> String {
        format!("{}. {}", self.label, self.notation)
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.label, self.notation)?;
        for comment in &self.comments {
            write!(f, " {{{}}}", comment)?;
        }
        Ok(())
    }
}

/// One complete recorded match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    pub initial_state: String,
    pub tags: HashMap<String, String>,
    pub moves: Vec<Move>,
    pub comments: Vec<String>,
    /// `states[0]` is the initial state; `states[i + 1]` follows `moves[i]`.
    /// Holds only the initial state until the states are populated.
    pub states: Vec<String>,
}

impl Game {
    pub fn new(initial_state: impl Into<String>) -> Self {
        let initial_state = initial_state.into();
        Self {
            states: vec![initial_state.clone()],
            initial_state,
            tags: HashMap::new(),
            moves: Vec::new(),
            comments: Vec::new(),
        }
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn result(&self) -> Option<&str> {
        self.tag("Result")
    }

    fn player_summary(&self, name: &str) -> String {
        let elo_key = format!("{}Elo", name);
        format!(
            "{}[{}]",
            self.tag(name).unwrap_or("?"),
            self.tag(&elo_key).unwrap_or("?")
        )
    }

    pub fn to_json(&self) -> Value {
        let moves: Vec<Value> = self
            .moves
            .iter()
            .map(|m| {
                json!({
                    "ply": m.label.ply,
                    "player": m.player().letter().to_string(),
                    "notation": m.notation,
                    "comments": m.comments.as_slice(),
                })
            })
            .collect();

        json!({
            "tags": self.tags,
            "comments": self.comments,
            "moves": moves,
            "states": self.states,
        })
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{},{} vs {},{}",
            self.player_summary("WhiteA"),
            self.player_summary("BlackA"),
            self.player_summary("WhiteB"),
            self.player_summary("BlackB"),
        )?;

        writeln!(f, "TAGS:")?;
        let mut tags: Vec<_> = self.tags.iter().collect();
        tags.sort();
        for (key, value) in tags {
            writeln!(f, "{}: \"{}\"", key, value)?;
        }

        writeln!(f, "COMMENTS:")?;
        for comment in &self.comments {
            writeln!(f, "{}", comment)?;
        }

        writeln!(f, "MOVES ({} total):", self.moves.len())?;
        for m in &self.moves {
            writeln!(f, "{}", m)?;
        }
        Ok(())
    }
}
