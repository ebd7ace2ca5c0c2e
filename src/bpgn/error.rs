use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::types::MoveLabel;

/// Where in the input a parse error was raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePos {
    pub path: PathBuf,
    pub line: usize,
}

impl SourcePos {
    pub fn new(path: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            path: path.into(),
            line,
        }
    }

    /// Position used when movetext is lexed on its own, outside of any file.
    pub fn detached() -> Self {
        Self::new("<movetext>", 0)
    }
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path.display(), self.line)
    }
}

#[derive(Error, Debug)]
pub enum BpgnError {
    #[error("expected Event tag at {0}")]
    MissingEventTag(SourcePos),

    #[error("expected game movetext at {0}")]
    MissingMovetext(SourcePos),

    #[error("don't know how to proceed with remaining movetext '{remainder}' at {pos}")]
    UnrecognizedToken { remainder: String, pos: SourcePos },

    #[error("move {label} has no notation at {pos}")]
    MissingNotation { label: MoveLabel, pos: SourcePos },

    #[error("Result tag '{}' doesn't match movetext result '{movetext}' at {pos}", .tag.as_deref().unwrap_or("<missing>"))]
    ResultMismatch {
        tag: Option<String>,
        movetext: String,
        pos: SourcePos,
    },

    #[error("no moves recorded")]
    EmptyGame,

    #[error("expected move {expected_a} or {expected_b} (got instead {got})")]
    OutOfOrderMoves {
        expected_a: MoveLabel,
        expected_b: MoveLabel,
        got: MoveLabel,
    },

    #[error("path '{}' is neither a file nor a directory", .0.display())]
    InvalidPath(PathBuf),

    #[error("move {label}. {notation} rejected from state '{prior_state}': {reason}")]
    MoveRejected {
        label: MoveLabel,
        notation: String,
        prior_state: String,
        reason: String,
    },

    #[error("Invalid compression value '{0}'. Supported values: 'plain' or 'zstd'.")]
    InvalidCompression(String),

    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl BpgnError {
    /// Whether a consumer may skip the offending game and keep reading.
    ///
    /// Only the move-order checks are recoverable; every other kind means the
    /// input itself is malformed or unreadable.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::EmptyGame | Self::OutOfOrderMoves { .. })
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = BpgnError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bpgn::types::{Board, Color, Player};

    #[test]
    fn test_source_pos_display() {
        let pos = SourcePos::new("games/2004.bpgn", 17);
        assert_eq!(pos.to_string(), "games/2004.bpgn:17");
        assert_eq!(SourcePos::detached().to_string(), "<movetext>:0");
    }

    #[test]
    fn test_only_move_order_errors_are_recoverable() {
        let label = MoveLabel::new(1, Player::new(Board::A, Color::White));
        assert!(BpgnError::EmptyGame.is_recoverable());
        assert!(
            BpgnError::OutOfOrderMoves {
                expected_a: label,
                expected_b: label,
                got: label,
            }
            .is_recoverable()
        );
        assert!(!BpgnError::MissingEventTag(SourcePos::detached()).is_recoverable());
        assert!(
            !BpgnError::ResultMismatch {
                tag: Some("1-0".to_string()),
                movetext: "0-1".to_string(),
                pos: SourcePos::detached(),
            }
            .is_recoverable()
        );
        assert!(!BpgnError::InvalidPath("nowhere".into()).is_recoverable());
    }

    #[test]
    fn test_result_mismatch_message_marks_missing_tag() {
        let err = BpgnError::ResultMismatch {
            tag: None,
            movetext: "1-0".to_string(),
            pos: SourcePos::new("a.bpgn", 3),
        };
        assert_eq!(
            err.to_string(),
            "Result tag '<missing>' doesn't match movetext result '1-0' at a.bpgn:3"
        );
    }
}
